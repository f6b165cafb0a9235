use std::str::from_utf8;

use crate::{Error, ReadBuf};

mod sealed {
    pub trait Sealed {}
    impl Sealed for [u8] {}
    impl Sealed for str {}
}

/// An element that can be deserialized from a buffer.
pub trait Read: self::sealed::Sealed {
    /// Read the type from the given buffer.
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self, Error>;
}

impl Read for [u8] {
    #[inline]
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self, Error> {
        let len = buf.load::<u32>()? as usize;
        buf.load_slice_nul(len)
    }
}

impl Read for str {
    #[inline]
    fn read_from<'de>(buf: &mut ReadBuf<'de>) -> Result<&'de Self, Error> {
        let bytes = <[u8]>::read_from(buf)?;
        Ok(from_utf8(bytes)?)
    }
}
