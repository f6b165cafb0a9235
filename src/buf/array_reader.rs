use crate::buf::MAX_ARRAY_LENGTH;
use crate::error::ErrorKind;
use crate::{Error, ReadBuf, Result};

/// Read an array from a buffer.
///
/// See [`ReadBuf::read_array`].
pub struct ArrayReader<'de> {
    buf: ReadBuf<'de>,
}

impl<'de> ArrayReader<'de> {
    #[inline]
    pub(super) fn new(buf: &mut ReadBuf<'de>, element_alignment: usize) -> Result<Self> {
        let bytes = buf.load::<u32>()?;

        if bytes > MAX_ARRAY_LENGTH {
            return Err(Error::new(ErrorKind::ArrayTooLong(bytes)));
        }

        buf.align(element_alignment)?;

        Ok(Self {
            buf: buf.read_until(bytes as usize)?,
        })
    }

    /// Test if there are no more elements in the array.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Access the cursor over the remaining elements.
    pub fn buf_mut(&mut self) -> &mut ReadBuf<'de> {
        &mut self.buf
    }
}
