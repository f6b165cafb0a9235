use std::mem::ManuallyDrop;
use std::ops::{Deref, DerefMut};

use crate::buf::owned_buf::Alloc;
use crate::buf::OwnedBuf;

/// An open array inside of an [`OwnedBuf`].
///
/// The length prefix is patched in when the writer is finished or dropped, so
/// the array is closed even if encoding its elements fails midway.
///
/// See [`OwnedBuf::write_array`].
#[must_use = "Arrays must be finalized using ArrayWriter::finish"]
pub struct ArrayWriter<'a> {
    start: usize,
    len: Alloc<u32>,
    buf: &'a mut OwnedBuf,
}

impl<'a> ArrayWriter<'a> {
    pub(super) fn new(buf: &'a mut OwnedBuf, element_alignment: usize) -> Self {
        let len = buf.alloc::<u32>();
        // Padding to the first element is not counted in the length, and is
        // present even if the array is empty.
        buf.align_mut(element_alignment);
        let start = buf.len();
        Self { start, len, buf }
    }

    /// Finish writing the array.
    pub fn finish(self) {
        ManuallyDrop::new(self).finalize();
    }

    /// Number of bytes written to the array so far, not counting the length
    /// prefix or the padding before the first element.
    pub(crate) fn array_len(&self) -> usize {
        self.buf.len() - self.start
    }

    #[inline(always)]
    fn finalize(&mut self) {
        // Oversized arrays are rejected by the encoder before they're closed.
        let len = u32::try_from(self.array_len()).unwrap_or(u32::MAX);
        self.buf.store_at(self.len, len);
    }
}

impl Deref for ArrayWriter<'_> {
    type Target = OwnedBuf;

    #[inline]
    fn deref(&self) -> &Self::Target {
        self.buf
    }
}

impl DerefMut for ArrayWriter<'_> {
    #[inline]
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.buf
    }
}

impl Drop for ArrayWriter<'_> {
    fn drop(&mut self) {
        self.finalize();
    }
}
