use std::collections::BTreeMap;

use crate::error::Result;
use crate::{Endianness, OwnedBuf, Signature, Value};

use super::{decode, decode_all, encode, encode_all};

fn round_trip(endianness: Endianness, signature: &str, value: &Value) -> Result<Value> {
    let signature = Signature::new(signature)?;
    let node = &signature.nodes()[0];

    let mut buf = OwnedBuf::with_endianness(endianness);
    encode(&mut buf, value, node)?;

    let mut read = buf.read();
    let decoded = decode(&mut read, node)?;
    assert!(read.is_empty(), "trailing bytes after {signature}");
    Ok(decoded)
}

#[test]
fn basic_round_trip() -> Result<()> {
    let cases = [
        ("y", Value::UInt64(0)),
        ("y", Value::UInt64(255)),
        ("b", Value::Bool(true)),
        ("b", Value::Bool(false)),
        ("n", Value::Int64(i16::MIN.into())),
        ("n", Value::Int64(i16::MAX.into())),
        ("q", Value::UInt64(u16::MAX.into())),
        ("i", Value::Int64(i32::MIN.into())),
        ("i", Value::Int64(-1)),
        ("u", Value::UInt64(u32::MAX.into())),
        ("x", Value::Int64(i64::MIN)),
        ("t", Value::UInt64(u64::MAX)),
        ("d", Value::Float64(1.5)),
        ("d", Value::Float64(f64::MIN)),
        ("s", Value::from("")),
        ("s", Value::from("hello world")),
        ("o", Value::ObjectPath(crate::ObjectPath::new("/org/example")?)),
        ("g", Value::Signature(Signature::new("a{sv}")?)),
    ];

    for endianness in [Endianness::LITTLE, Endianness::BIG] {
        for (signature, value) in &cases {
            assert_eq!(
                round_trip(endianness, signature, value)?,
                *value,
                "{signature} ({endianness:?})"
            );
        }
    }

    Ok(())
}

#[test]
fn exact_widths() -> Result<()> {
    let signature = Signature::new("nqy")?;
    let values = [Value::from(-2i16), Value::from(3u16), Value::from(4u8)];

    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    encode_all(&mut buf, &signature, &values)?;
    assert_eq!(buf.get(), &[0xfe, 0xff, 3, 0, 4]);

    let decoded = decode_all(&mut buf.read(), &signature)?;
    assert_eq!(decoded, [Value::Int64(-2), Value::UInt64(3), Value::UInt64(4)]);
    Ok(())
}

#[test]
fn big_endian_layout() -> Result<()> {
    let signature = Signature::new("u")?;
    let mut buf = OwnedBuf::with_endianness(Endianness::BIG);
    encode(&mut buf, &Value::from(1u32), &signature.nodes()[0])?;
    assert_eq!(buf.get(), &[0, 0, 0, 1]);
    Ok(())
}

#[test]
fn string_array_preserves_order() -> Result<()> {
    let strings = ["first", "second", "third", "fourth"]
        .into_iter()
        .map(Value::from)
        .collect::<Vec<_>>();

    let decoded = round_trip(Endianness::LITTLE, "as", &Value::Sequence(strings.clone()))?;
    assert_eq!(decoded, Value::Sequence(strings));
    Ok(())
}

#[test]
fn empty_array_of_structs() -> Result<()> {
    let decoded = round_trip(Endianness::LITTLE, "a(ii)", &Value::Sequence(Vec::new()))?;
    assert_eq!(decoded, Value::Sequence(Vec::new()));
    Ok(())
}

#[test]
fn mapping_round_trip() -> Result<()> {
    let mut map = BTreeMap::new();
    map.insert(String::from("a"), Value::from(1i32));
    map.insert(String::from("b"), Value::from(2i32));

    let decoded = round_trip(Endianness::LITTLE, "a{si}", &Value::Mapping(map.clone()))?;
    assert_eq!(decoded, Value::Mapping(map));
    Ok(())
}

#[test]
fn object_path_keys() -> Result<()> {
    let mut map = BTreeMap::new();
    map.insert(String::from("/org/example"), Value::from(true));

    let decoded = round_trip(Endianness::LITTLE, "a{ov}", &Value::Mapping(map.clone()))?;
    assert_eq!(decoded, Value::Mapping(map));

    let mut invalid = BTreeMap::new();
    invalid.insert(String::from("not a path"), Value::from(true));
    let signature = Signature::new("a{ov}")?;
    let mut buf = OwnedBuf::new();
    assert!(encode(&mut buf, &Value::Mapping(invalid), &signature.nodes()[0]).is_err());
    Ok(())
}

#[test]
fn struct_round_trip() -> Result<()> {
    let value = Value::Struct(vec![Value::from(42i32), Value::from("answer")]);
    assert_eq!(round_trip(Endianness::LITTLE, "(is)", &value)?, value);

    // Sequences are accepted as the positional fields of a struct.
    let fields = Value::Sequence(vec![Value::from(42i32), Value::from("answer")]);
    assert_eq!(round_trip(Endianness::BIG, "(is)", &fields)?, value);
    Ok(())
}

#[test]
fn variant_is_unwrapped() -> Result<()> {
    assert_eq!(round_trip(Endianness::LITTLE, "v", &Value::from(true))?, Value::Bool(true));
    assert_eq!(
        round_trip(Endianness::LITTLE, "v", &Value::variant(true))?,
        Value::Bool(true)
    );
    Ok(())
}

#[test]
fn nested_variant() -> Result<()> {
    let signature = Signature::new("v")?;
    let value = Value::variant(Value::variant(5i32));

    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    encode(&mut buf, &value, &signature.nodes()[0])?;
    assert_eq!(buf.get(), &[1, b'v', 0, 1, b'i', 0, 0, 0, 5, 0, 0, 0]);

    assert_eq!(decode(&mut buf.read(), &signature.nodes()[0])?, Value::Int64(5));
    Ok(())
}

#[test]
fn variant_inference() -> Result<()> {
    let mixed = Value::Sequence(vec![Value::from(1u32), Value::from("one")]);
    assert_eq!(round_trip(Endianness::LITTLE, "v", &mixed)?, mixed);

    let mut map = BTreeMap::new();
    map.insert(String::from("key"), Value::from(-7i64));
    let decoded = round_trip(Endianness::LITTLE, "v", &Value::Mapping(map.clone()))?;
    assert_eq!(decoded, Value::Mapping(map));

    let empty = Value::Struct(Vec::new());
    let signature = Signature::new("v")?;
    let mut buf = OwnedBuf::new();
    assert!(encode(&mut buf, &empty, &signature.nodes()[0])
        .unwrap_err()
        .is_encode_mismatch());
    Ok(())
}

#[test]
fn variant_depth_is_bounded_on_encode() -> Result<()> {
    let signature = Signature::new("v")?;

    let mut value = Value::from(1u32);

    for _ in 0..32 {
        value = Value::Sequence(vec![value]);
    }

    let mut buf = OwnedBuf::new();
    encode(&mut buf, &value, &signature.nodes()[0])?;
    assert_eq!(decode(&mut buf.read(), &signature.nodes()[0])?, value);

    let value = Value::Sequence(vec![value]);

    let mut buf = OwnedBuf::new();
    let error = encode(&mut buf, &value, &signature.nodes()[0]).unwrap_err();
    assert!(error.is_malformed_signature());
    assert!(buf.is_empty());
    Ok(())
}

#[test]
fn array_length_is_bounded_on_encode() -> Result<()> {
    let signature = Signature::new("as")?;
    let chunk = Value::from("x".repeat(1 << 20));

    // 63 one MiB strings and their headers fit under the limit.
    let fits = Value::Sequence(vec![chunk.clone(); 63]);
    let mut buf = OwnedBuf::new();
    encode(&mut buf, &fits, &signature.nodes()[0])?;

    let mut read = buf.read();
    let Value::Sequence(decoded) = decode(&mut read, &signature.nodes()[0])? else {
        panic!("expected a sequence");
    };
    assert_eq!(decoded.len(), 63);

    let oversized = Value::Sequence(vec![chunk; 64]);
    let mut buf = OwnedBuf::new();
    let error = encode(&mut buf, &oversized, &signature.nodes()[0]).unwrap_err();
    assert!(error.to_string().contains("too long"), "{error}");
    Ok(())
}

#[test]
fn encode_mismatches() -> Result<()> {
    let cases = [
        ("i", Value::from("nope")),
        ("i", Value::Int64(i64::MAX)),
        ("y", Value::Int64(-1)),
        ("u", Value::Int64(-1)),
        ("d", Value::Int64(1)),
        ("b", Value::UInt64(1)),
        ("s", Value::from("nul\0byte")),
        ("as", Value::Mapping(BTreeMap::new())),
        ("a{sv}", Value::Sequence(Vec::new())),
        ("(is)", Value::Struct(vec![Value::from(1i32)])),
        ("(is)", Value::from(1i32)),
    ];

    for (signature, value) in &cases {
        let signature = Signature::new(signature)?;
        let mut buf = OwnedBuf::new();
        let error = encode(&mut buf, value, &signature.nodes()[0]).unwrap_err();
        assert!(error.is_encode_mismatch(), "{signature}: {error}");
    }

    Ok(())
}

#[test]
fn argument_count_mismatch() -> Result<()> {
    let signature = Signature::new("is")?;
    let mut buf = OwnedBuf::new();

    let error = encode_all(&mut buf, &signature, &[Value::from(1i32)]).unwrap_err();
    assert!(error.is_argument_count_mismatch());
    assert!(buf.is_empty());
    Ok(())
}

#[test]
fn unsupported_types() -> Result<()> {
    let fd = Signature::new("h")?;
    let mut buf = OwnedBuf::new();
    assert!(encode(&mut buf, &Value::from(0u32), &fd.nodes()[0])
        .unwrap_err()
        .is_unsupported_type());
    assert!(decode(&mut crate::ReadBuf::from_slice_le(&[0; 4]), &fd.nodes()[0])
        .unwrap_err()
        .is_unsupported_type());

    let mut map = BTreeMap::new();
    map.insert(String::from("1"), Value::from(true));
    let int_keys = Signature::new("a{iv}")?;
    assert!(encode(&mut buf, &Value::Mapping(map), &int_keys.nodes()[0])
        .unwrap_err()
        .is_unsupported_type());

    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    let mut array = buf.write_array(8);
    let mut entry = array.write_struct();
    entry.store(1i32);
    let mut variant = entry.write_variant("b");
    variant.store(1u32);
    variant.finish();
    entry.finish();
    array.finish();

    assert!(decode(&mut buf.read(), &int_keys.nodes()[0])
        .unwrap_err()
        .is_unsupported_type());
    Ok(())
}

#[test]
fn invalid_wire_values() -> Result<()> {
    let signature = Signature::new("b")?;
    let error = decode(&mut crate::ReadBuf::from_slice_le(&[2, 0, 0, 0]), &signature.nodes()[0])
        .unwrap_err();
    assert_eq!(error.to_string(), "Invalid boolean value 2");

    let signature = Signature::new("(ii)")?;
    assert!(decode(&mut crate::ReadBuf::from_slice_le(&[1, 0, 0, 0]), &signature.nodes()[0]).is_err());

    let signature = Signature::new("v")?;
    let error = decode(&mut crate::ReadBuf::from_slice_le(b"\x02ii\x00"), &signature.nodes()[0])
        .unwrap_err();
    assert!(error.is_malformed_signature());
    Ok(())
}

#[test]
fn failed_struct_leaves_buffer_usable() -> Result<()> {
    let signature = Signature::new("(is)s")?;
    let broken = Value::Struct(vec![Value::from(1i32), Value::from(true)]);

    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    assert!(encode(&mut buf, &broken, &signature.nodes()[0])
        .unwrap_err()
        .is_encode_mismatch());

    encode(&mut buf, &Value::from("after"), &signature.nodes()[1])?;
    assert_eq!(
        buf.get(),
        &[1, 0, 0, 0, 5, 0, 0, 0, b'a', b'f', b't', b'e', b'r', 0]
    );
    Ok(())
}

#[test]
fn failed_array_element_closes_array() -> Result<()> {
    let signature = Signature::new("a(is)s")?;
    let broken = Value::Sequence(vec![
        Value::Struct(vec![Value::from(1i32), Value::from("one")]),
        Value::Struct(vec![Value::from(2i32), Value::from(true)]),
    ]);

    let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
    assert!(encode(&mut buf, &broken, &signature.nodes()[0]).is_err());
    encode(&mut buf, &Value::from("after"), &signature.nodes()[1])?;

    let mut read = buf.read();
    // First element spans 8..20, the second got as far as its int at 24..28.
    assert_eq!(read.clone().load::<u32>()?, 20);
    let _ = read.read_array(8)?;
    assert_eq!(read.read::<str>()?, "after");
    assert!(read.is_empty());
    Ok(())
}
