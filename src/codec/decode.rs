use std::collections::BTreeMap;

use crate::error::{ErrorKind, Result};
use crate::protocol::Type;
use crate::{BasicType, Error, ObjectPath, ReadBuf, Signature, SignatureNode, Value};

use super::MAX_NESTING;

/// Decode a single value described by `node`.
///
/// Variants are unwrapped, the decoded value is the value they carry.
///
/// # Examples
///
/// ```
/// use dynbus::{codec, ReadBuf, Signature, Value};
///
/// let signature = Signature::new("q")?;
/// let mut buf = ReadBuf::from_slice_le(&[0x39, 0x05]);
///
/// let value = codec::decode(&mut buf, &signature.nodes()[0])?;
/// assert_eq!(value, Value::UInt64(1337));
/// # Ok::<_, dynbus::Error>(())
/// ```
pub fn decode(buf: &mut ReadBuf<'_>, node: &SignatureNode) -> Result<Value> {
    decode_node(buf, node, 0)
}

/// Decode one value for each complete type in `signature`.
pub fn decode_all(buf: &mut ReadBuf<'_>, signature: &Signature) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(signature.len());

    for node in signature.nodes() {
        values.push(decode_node(buf, node, 0)?);
    }

    Ok(values)
}

fn decode_node(buf: &mut ReadBuf<'_>, node: &SignatureNode, depth: usize) -> Result<Value> {
    if depth > MAX_NESTING {
        return Err(Error::new(ErrorKind::NestingTooDeep));
    }

    match node {
        SignatureNode::Basic(basic) => decode_basic(buf, *basic),
        SignatureNode::Array(element) => {
            let mut array = buf.read_array(element.alignment())?;

            if let SignatureNode::DictEntry(key, value) = &**element {
                let mut map = BTreeMap::new();

                while !array.is_empty() {
                    let buf = array.buf_mut();
                    buf.read_struct()?;
                    let key = decode_key(buf, *key)?;
                    let value = decode_node(buf, value, depth + 1)?;
                    map.insert(key, value);
                }

                return Ok(Value::Mapping(map));
            }

            let mut values = Vec::new();

            while !array.is_empty() {
                values.push(decode_node(array.buf_mut(), element, depth + 1)?);
            }

            Ok(Value::Sequence(values))
        }
        SignatureNode::Struct(fields) => {
            buf.read_struct()?;
            let mut values = Vec::with_capacity(fields.len());

            for field in fields {
                values.push(decode_node(buf, field, depth + 1)?);
            }

            Ok(Value::Struct(values))
        }
        SignatureNode::DictEntry(..) => Err(Error::new(ErrorKind::UnsupportedType(Type::OPEN_BRACE))),
        SignatureNode::Variant => {
            let signature = buf.read_signature()?;
            let inner = Signature::single(signature)?;
            decode_node(buf, &inner, depth + 1)
        }
    }
}

fn decode_key(buf: &mut ReadBuf<'_>, key: BasicType) -> Result<String> {
    if !key.is_string_like() {
        return Err(Error::new(ErrorKind::UnsupportedType(key.ty())));
    }

    match decode_basic(buf, key)? {
        Value::Str(string) => Ok(string),
        Value::ObjectPath(path) => Ok(path.as_str().to_owned()),
        Value::Signature(signature) => Ok(signature.as_str().to_owned()),
        _ => Err(Error::new(ErrorKind::UnsupportedType(key.ty()))),
    }
}

fn decode_basic(buf: &mut ReadBuf<'_>, basic: BasicType) -> Result<Value> {
    let value = match basic {
        BasicType::Byte => Value::UInt64(buf.load::<u8>()?.into()),
        BasicType::Boolean => match buf.load::<u32>()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(Error::new(ErrorKind::InvalidBool(other))),
        },
        BasicType::Int16 => Value::Int64(buf.load::<i16>()?.into()),
        BasicType::UInt16 => Value::UInt64(buf.load::<u16>()?.into()),
        BasicType::Int32 => Value::Int64(buf.load::<i32>()?.into()),
        BasicType::UInt32 => Value::UInt64(buf.load::<u32>()?.into()),
        BasicType::Int64 => Value::Int64(buf.load::<i64>()?),
        BasicType::UInt64 => Value::UInt64(buf.load::<u64>()?),
        BasicType::Double => Value::Float64(buf.load::<f64>()?),
        BasicType::String => Value::Str(buf.read::<str>()?.to_owned()),
        BasicType::ObjectPath => Value::ObjectPath(ObjectPath::new(buf.read::<str>()?)?),
        BasicType::Signature => Value::Signature(Signature::new(buf.read_signature()?)?),
        BasicType::UnixFd => return Err(Error::new(ErrorKind::UnsupportedType(basic.ty()))),
    };

    Ok(value)
}
