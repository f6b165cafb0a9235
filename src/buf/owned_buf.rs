use std::fmt;
use std::marker::PhantomData;

use crate::buf::{padding_to, ArrayWriter, ReadBuf, StructWriter, VariantWriter};
use crate::frame::Frame;
use crate::protocol::Endianness;
use crate::Write;

/// An allocated location in the buffer that can be written to later.
pub(crate) struct Alloc<T>(usize, PhantomData<T>);

impl<T> Clone for Alloc<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Alloc<T> {}

/// A growable buffer which values are marshalled into.
///
/// Alignment is computed relative to the start of the buffer, which
/// corresponds to the start of a message body on the wire.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnedBuf {
    data: Vec<u8>,
    endianness: Endianness,
}

impl OwnedBuf {
    /// Construct a new empty buffer.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::OwnedBuf;
    ///
    /// let buf = OwnedBuf::new();
    /// assert!(buf.is_empty());
    /// ```
    pub fn new() -> Self {
        Self::with_endianness(Endianness::NATIVE)
    }

    /// Construct a new buffer with the specified endianness.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Endianness, OwnedBuf};
    ///
    /// let buf = OwnedBuf::with_endianness(Endianness::BIG);
    /// assert_eq!(buf.endianness(), Endianness::BIG);
    /// ```
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self {
            data: Vec::new(),
            endianness,
        }
    }

    /// Wrap already marshalled bytes.
    pub fn from_vec(data: Vec<u8>, endianness: Endianness) -> Self {
        Self { data, endianness }
    }

    /// Get the endianness of the buffer.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// Get the bytes written so far.
    pub fn get(&self) -> &[u8] {
        &self.data
    }

    /// The number of bytes written.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Test if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Get a read cursor over the written bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Endianness, OwnedBuf};
    ///
    /// let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    /// buf.write("foo");
    ///
    /// let mut read = buf.read();
    /// assert_eq!(read.read::<str>()?, "foo");
    /// assert!(read.is_empty());
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn read(&self) -> ReadBuf<'_> {
        ReadBuf::new(&self.data, self.endianness)
    }

    /// Write a length-prefixed value into the buffer.
    pub fn write<T>(&mut self, value: &T)
    where
        T: ?Sized + Write,
    {
        value.write_to(self);
    }

    /// Open an array whose elements align to `element_alignment`.
    ///
    /// The length prefix is patched when the returned writer is dropped.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Endianness, OwnedBuf};
    ///
    /// let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    ///
    /// let mut array = buf.write_array(4);
    /// array.store(1u32);
    /// array.finish();
    ///
    /// assert_eq!(buf.get(), &[4, 0, 0, 0, 1, 0, 0, 0]);
    /// ```
    pub fn write_array(&mut self, element_alignment: usize) -> ArrayWriter<'_> {
        ArrayWriter::new(self, element_alignment)
    }

    /// Open a struct or dict entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::{Endianness, OwnedBuf};
    ///
    /// let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    /// buf.store(10u8);
    ///
    /// let mut st = buf.write_struct();
    /// st.store(1u32);
    /// st.finish();
    ///
    /// assert_eq!(buf.get(), &[10, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]);
    /// ```
    pub fn write_struct(&mut self) -> StructWriter<'_> {
        StructWriter::new(self)
    }

    /// Open a variant carrying a value of the given signature.
    pub fn write_variant(&mut self, signature: &str) -> VariantWriter<'_> {
        VariantWriter::new(self, signature)
    }

    /// Store a fixed-width value, padding to its alignment first.
    pub fn store<T>(&mut self, value: T)
    where
        T: Frame,
    {
        self.align_mut(T::SIZE);
        value.store_to(&mut self.data, self.endianness);
    }

    /// Pad the buffer with zeros up to `align`.
    pub(crate) fn align_mut(&mut self, align: usize) {
        let padding = padding_to(self.data.len(), align);
        self.data.resize(self.data.len() + padding, 0);
    }

    /// Allocate an aligned slot which is filled in later with
    /// [`OwnedBuf::store_at`].
    pub(crate) fn alloc<T>(&mut self) -> Alloc<T>
    where
        T: Frame,
    {
        self.align_mut(T::SIZE);
        let at = self.data.len();
        self.data.resize(at + T::SIZE, 0);
        Alloc(at, PhantomData)
    }

    /// Fill in a previously allocated slot.
    pub(crate) fn store_at<T>(&mut self, at: Alloc<T>, value: T)
    where
        T: Frame,
    {
        let mut bytes = Vec::with_capacity(T::SIZE);
        value.store_to(&mut bytes, self.endianness);
        self.data[at.0..at.0 + T::SIZE].copy_from_slice(&bytes);
    }

    /// Extend the buffer with a slice followed by a NUL byte.
    pub(crate) fn extend_from_slice_nul(&mut self, bytes: &[u8]) {
        self.data.reserve(bytes.len() + 1);
        self.data.extend_from_slice(bytes);
        self.data.push(0);
    }

    /// Store a signature, which carries a single byte length prefix.
    pub(crate) fn store_signature(&mut self, signature: &str) {
        self.store(signature.len() as u8);
        self.extend_from_slice_nul(signature.as_bytes());
    }

    /// Take the written bytes out of the buffer.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl Default for OwnedBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for OwnedBuf {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnedBuf")
            .field("len", &self.data.len())
            .field("endianness", &self.endianness)
            .finish()
    }
}
