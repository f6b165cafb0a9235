use std::ops::{Deref, DerefMut};

use crate::buf::OwnedBuf;

/// Helper to write a struct or dict entry into a buffer.
///
/// See [`OwnedBuf::write_struct`].
#[must_use = "Structs must be finalized using StructWriter::finish"]
pub struct StructWriter<'a> {
    buf: &'a mut OwnedBuf,
}

impl<'a> StructWriter<'a> {
    #[inline]
    pub(super) fn new(buf: &'a mut OwnedBuf) -> Self {
        buf.align_mut(8);
        Self { buf }
    }

    /// Finish writing the struct.
    ///
    /// Structs carry no trailer on the wire, this only ends the borrow.
    #[inline]
    pub fn finish(self) {}
}

impl Deref for StructWriter<'_> {
    type Target = OwnedBuf;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.buf
    }
}

impl DerefMut for StructWriter<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf
    }
}

/// Helper to write a variant into a buffer.
///
/// The embedded signature is written when the variant is opened.
///
/// See [`OwnedBuf::write_variant`].
#[must_use = "Variants must be finalized using VariantWriter::finish"]
pub struct VariantWriter<'a> {
    buf: &'a mut OwnedBuf,
}

impl<'a> VariantWriter<'a> {
    #[inline]
    pub(super) fn new(buf: &'a mut OwnedBuf, signature: &str) -> Self {
        buf.store_signature(signature);
        Self { buf }
    }

    /// Finish writing the variant.
    #[inline]
    pub fn finish(self) {}
}

impl Deref for VariantWriter<'_> {
    type Target = OwnedBuf;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.buf
    }
}

impl DerefMut for VariantWriter<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf
    }
}
