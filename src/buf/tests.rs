use crate::error::Result;
use crate::{Endianness, OwnedBuf, ReadBuf};

#[test]
fn array_length_is_patched_on_drop() -> Result<()> {
    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);

    {
        let mut array = buf.write_array(8);
        array.store(1u64);
        array.store(2u64);
        // Dropped without finish.
    }

    assert_eq!(buf.len(), 24);
    assert_eq!(buf.read().load::<u32>()?, 16);
    Ok(())
}

#[test]
fn empty_array_is_padded() -> Result<()> {
    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    buf.write_array(8).finish();
    assert_eq!(buf.get(), &[0, 0, 0, 0, 0, 0, 0, 0]);

    let mut read = buf.read();
    assert!(read.read_array(8)?.is_empty());
    assert!(read.is_empty());
    Ok(())
}

#[test]
fn nested_cursor_keeps_alignment() -> Result<()> {
    let mut buf = OwnedBuf::with_endianness(Endianness::BIG);
    buf.store(1u8);

    let mut array = buf.write_array(8);
    array.store(7u64);
    array.finish();

    let mut read = buf.read();
    assert_eq!(read.load::<u8>()?, 1);

    let mut array = read.read_array(8)?;
    assert_eq!(array.buf_mut().load::<u64>()?, 7);
    assert!(array.is_empty());
    assert!(read.is_empty());
    Ok(())
}

#[test]
fn underflow() {
    let mut read = ReadBuf::from_slice_le(&[1, 2, 3]);
    assert!(read.load::<u32>().is_err());

    let mut read = ReadBuf::from_slice_le(b"\x05\x00\x00\x00abc");
    assert!(read.read::<str>().is_err());
}

#[test]
fn not_null_terminated() {
    let mut read = ReadBuf::from_slice_le(b"\x03\x00\x00\x00abcd");
    let error = read.read::<str>().unwrap_err();
    assert_eq!(error.to_string(), "String is not null terminated");
}

#[test]
fn signature_prefix() -> Result<()> {
    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    buf.store_signature("a{sv}");
    assert_eq!(buf.get(), b"\x05a{sv}\x00");
    assert_eq!(buf.read().read_signature()?, "a{sv}");
    Ok(())
}
