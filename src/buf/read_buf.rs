use std::fmt;
use std::str::from_utf8;

use crate::buf::{padding_to, ArrayReader};
use crate::error::{ErrorKind, Result};
use crate::frame::Frame;
use crate::{Endianness, Error, Read};

/// A read cursor over marshalled bytes.
///
/// Alignment is tracked against the start of the underlying slice, so a
/// cursor limited to the inside of a container still pads correctly.
///
/// # Examples
///
/// ```
/// use dynbus::{Result, ReadBuf};
///
/// fn read(buf: &mut ReadBuf<'_>) -> Result<()> {
///     assert_eq!(buf.load::<u32>()?, 7u32);
///     assert_eq!(buf.load::<u8>()?, b'f');
///     assert_eq!(buf.load::<u8>()?, b'o');
///     assert_eq!(buf.get(), &[b'o', b' ', b'b', b'a', b'r', 0]);
///     Ok(())
/// }
/// # read(&mut ReadBuf::from_slice_le(b"\x07\x00\x00\x00foo bar\x00"))?;
/// # Ok::<_, dynbus::Error>(())
/// ```
#[derive(Clone)]
pub struct ReadBuf<'a> {
    data: &'a [u8],
    read: usize,
    end: usize,
    endianness: Endianness,
}

impl<'a> ReadBuf<'a> {
    /// Construct a read buffer over a slice.
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self {
            data,
            read: 0,
            end: data.len(),
            endianness,
        }
    }

    /// Construct a little endian read buffer from a slice.
    #[doc(hidden)]
    pub fn from_slice_le(data: &'a [u8]) -> Self {
        Self::new(data, Endianness::LITTLE)
    }

    /// Get the endianness of the buffer.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Get the remaining unread bytes.
    pub fn get(&self) -> &'a [u8] {
        &self.data[self.read..self.end]
    }

    /// Test if every byte has been read.
    pub fn is_empty(&self) -> bool {
        self.read >= self.end
    }

    /// The number of unread bytes.
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.read)
    }

    /// Read a length-prefixed value from the buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::ReadBuf;
    ///
    /// let mut buf = ReadBuf::from_slice_le(b"\x03\x00\x00\x00foo\x00");
    /// assert_eq!(buf.read::<str>()?, "foo");
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn read<T>(&mut self) -> Result<&'a T, Error>
    where
        T: ?Sized + Read,
    {
        T::read_from(self)
    }

    /// Read a signature string, which carries a single byte length prefix.
    pub fn read_signature(&mut self) -> Result<&'a str> {
        let len = self.load::<u8>()? as usize;
        let bytes = self.load_slice_nul(len)?;
        Ok(from_utf8(bytes)?)
    }

    /// Open an array whose elements align to `element_alignment`.
    pub fn read_array(&mut self, element_alignment: usize) -> Result<ArrayReader<'a>> {
        ArrayReader::new(self, element_alignment)
    }

    /// Move past the padding which precedes a struct or dict entry.
    pub fn read_struct(&mut self) -> Result<()> {
        self.align(8)
    }

    /// Split off a cursor over the next `len` bytes and advance past them.
    pub(crate) fn read_until(&mut self, len: usize) -> Result<ReadBuf<'a>> {
        if self.read + len > self.end {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        let sub = Self {
            data: self.data,
            read: self.read,
            end: self.read + len,
            endianness: self.endianness,
        };

        self.read += len;
        Ok(sub)
    }

    /// Load a fixed-width value.
    ///
    /// This advances the read cursor past the alignment and the size of the
    /// type. The value is adjusted to the endianness of the buffer.
    ///
    /// # Errors
    ///
    /// Errors if the underlying buffer does not have enough space to represent
    /// the type `T`.
    pub fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        self.align(T::SIZE)?;

        if self.read + T::SIZE > self.end {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        let value = T::load_from(&self.data[self.read..self.read + T::SIZE], self.endianness);
        self.read += T::SIZE;
        Ok(value)
    }

    /// Align the read side of the buffer.
    pub(crate) fn align(&mut self, align: usize) -> Result<()> {
        let padding = padding_to(self.read, align);

        if self.read + padding > self.end {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        self.read += padding;
        Ok(())
    }

    /// Load a slice ending with a NUL byte, excluding the NUL byte.
    pub(crate) fn load_slice_nul(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.read + len + 1 > self.end {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        if self.data[self.read + len] != 0 {
            return Err(Error::new(ErrorKind::NotNullTerminated));
        }

        let slice = &self.data[self.read..self.read + len];
        self.read += len + 1;
        Ok(slice)
    }
}

impl fmt::Debug for ReadBuf<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadBuf")
            .field("read", &self.read)
            .field("end", &self.end)
            .field("endianness", &self.endianness)
            .finish()
    }
}
