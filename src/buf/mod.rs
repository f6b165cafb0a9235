//! Byte-level cursors used by the value codec.
//!
//! [`OwnedBuf`] is the write side and [`ReadBuf`] the read side. Containers
//! are opened through guards ([`ArrayWriter`], [`StructWriter`],
//! [`VariantWriter`]) which close the container when they go out of scope, so
//! an encoder bailing out with `?` halfway through a container still leaves a
//! well-formed buffer behind.

#[cfg(test)]
mod tests;

pub use self::read_buf::ReadBuf;
mod read_buf;

pub use self::owned_buf::OwnedBuf;
mod owned_buf;

pub use self::array_writer::ArrayWriter;
mod array_writer;

pub use self::array_reader::ArrayReader;
mod array_reader;

pub use self::struct_writer::{StructWriter, VariantWriter};
mod struct_writer;

/// The maximum length of an array in bytes.
pub(crate) const MAX_ARRAY_LENGTH: u32 = 1u32 << 26;

/// Calculate padding with the assumption that alignment is a power of two.
#[inline(always)]
pub(crate) fn padding_to(len: usize, align: usize) -> usize {
    let mask = align - 1;
    (align - (len & mask)) & mask
}
