use crate::OwnedBuf;

mod sealed {
    use crate::ObjectPath;

    pub trait Sealed {}

    impl Sealed for [u8] {}
    impl<const N: usize> Sealed for [u8; N] {}
    impl Sealed for str {}
    impl Sealed for ObjectPath {}
}

/// An element that can be serialized to a buffer with a length prefix.
pub trait Write: self::sealed::Sealed {
    /// Write `self` into `buf`.
    fn write_to(&self, buf: &mut OwnedBuf);
}

/// Write a length-prefixed string to the buffer.
///
/// # Examples
///
/// ```
/// use dynbus::{Endianness, OwnedBuf};
///
/// let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
/// buf.write(&b"foo"[..]);
///
/// assert_eq!(buf.get(), &[3, 0, 0, 0, 102, 111, 111, 0])
/// ```
impl Write for [u8] {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        buf.store(self.len() as u32);
        buf.extend_from_slice_nul(self);
    }
}

/// Write a length-prefixed string to the buffer.
///
/// # Examples
///
/// ```
/// use dynbus::{Endianness, OwnedBuf};
///
/// let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
/// buf.write("foo");
///
/// assert_eq!(buf.get(), &[3, 0, 0, 0, 102, 111, 111, 0])
/// ```
impl Write for str {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        self.as_bytes().write_to(buf);
    }
}

impl<const N: usize> Write for [u8; N] {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        self[..].write_to(buf)
    }
}

/// Object paths are marshalled like strings.
impl Write for crate::ObjectPath {
    #[inline]
    fn write_to(&self, buf: &mut OwnedBuf) {
        self.as_str().write_to(buf);
    }
}
