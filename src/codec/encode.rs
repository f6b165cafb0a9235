use std::fmt;

use crate::buf::{ArrayWriter, MAX_ARRAY_LENGTH};
use crate::error::{ErrorKind, Result};
use crate::protocol::Type;
use crate::{BasicType, Error, ObjectPath, OwnedBuf, Signature};
use crate::{SignatureNode, Value};

use super::{infer, MAX_NESTING};

/// Encode a single value against `node`.
///
/// A failure partway through a container still closes the container, so the
/// buffer remains well-formed and encoding can continue after it.
///
/// # Examples
///
/// ```
/// use dynbus::{codec, Endianness, OwnedBuf, Signature, Value};
///
/// let signature = Signature::new("(ys)")?;
/// let value = Value::Struct(vec![Value::from(7u8), Value::from("hi")]);
///
/// let mut buf = OwnedBuf::with_endianness(Endianness::LITTLE);
/// codec::encode(&mut buf, &value, &signature.nodes()[0])?;
/// assert_eq!(buf.get(), &[7, 0, 0, 0, 2, 0, 0, 0, b'h', b'i', 0]);
/// # Ok::<_, dynbus::Error>(())
/// ```
pub fn encode(buf: &mut OwnedBuf, value: &Value, node: &SignatureNode) -> Result<()> {
    encode_node(buf, value, node, 0)
}

/// Encode an argument list against `signature`, one value per complete type.
///
/// # Errors
///
/// Errors if the number of values differs from the number of complete types
/// in the signature, before anything is written.
pub fn encode_all(buf: &mut OwnedBuf, signature: &Signature, values: &[Value]) -> Result<()> {
    if values.len() != signature.len() {
        return Err(Error::new(ErrorKind::ArgumentCountMismatch {
            expected: signature.len(),
            actual: values.len(),
        }));
    }

    for (node, value) in signature.nodes().iter().zip(values) {
        encode_node(buf, value, node, 0)?;
    }

    Ok(())
}

fn encode_node(buf: &mut OwnedBuf, value: &Value, node: &SignatureNode, depth: usize) -> Result<()> {
    if depth > MAX_NESTING {
        return Err(Error::new(ErrorKind::NestingTooDeep));
    }

    match node {
        SignatureNode::Basic(basic) => encode_basic(buf, value, *basic),
        SignatureNode::Array(element) => {
            if let SignatureNode::DictEntry(key, inner) = &**element {
                let Value::Mapping(map) = value else {
                    return Err(mismatch(node, value));
                };

                let mut array = buf.write_array(8);

                for (k, v) in map {
                    let mut entry = array.write_struct();
                    encode_str(&mut entry, k, *key)?;
                    encode_node(&mut entry, v, inner, depth + 1)?;
                    entry.finish();
                    check_array_length(&array)?;
                }

                array.finish();
                return Ok(());
            }

            let Value::Sequence(values) = value else {
                return Err(mismatch(node, value));
            };

            let mut array = buf.write_array(element.alignment());

            for value in values {
                encode_node(&mut array, value, element, depth + 1)?;
                check_array_length(&array)?;
            }

            array.finish();
            Ok(())
        }
        SignatureNode::Struct(fields) => {
            let (Value::Struct(values) | Value::Sequence(values)) = value else {
                return Err(mismatch(node, value));
            };

            if values.len() != fields.len() {
                return Err(mismatch(node, value));
            }

            let mut st = buf.write_struct();

            for (field, value) in fields.iter().zip(values) {
                encode_node(&mut st, value, field, depth + 1)?;
            }

            st.finish();
            Ok(())
        }
        SignatureNode::DictEntry(..) => Err(Error::new(ErrorKind::UnsupportedType(Type::OPEN_BRACE))),
        SignatureNode::Variant => {
            let inner = match value {
                Value::Variant(inner) => &**inner,
                value => value,
            };

            // Inference only bounds total nesting, the embedded signature is
            // held to the same length and depth limits as any other.
            let text = infer(inner)?.to_string();
            let signature = Signature::single(&text)?;

            let mut variant = buf.write_variant(&text);
            encode_node(&mut variant, inner, &signature, depth + 1)?;
            variant.finish();
            Ok(())
        }
    }
}

fn check_array_length(array: &ArrayWriter<'_>) -> Result<()> {
    let len = array.array_len();

    if len > MAX_ARRAY_LENGTH as usize {
        return Err(Error::new(ErrorKind::ArrayTooLong(
            u32::try_from(len).unwrap_or(u32::MAX),
        )));
    }

    Ok(())
}

fn encode_basic(buf: &mut OwnedBuf, value: &Value, basic: BasicType) -> Result<()> {
    match basic {
        BasicType::Byte => buf.store(integer::<u8>(value, basic)?),
        BasicType::Boolean => {
            let Value::Bool(b) = *value else {
                return Err(mismatch(SignatureNode::Basic(basic), value));
            };

            buf.store(u32::from(b));
        }
        BasicType::Int16 => buf.store(integer::<i16>(value, basic)?),
        BasicType::UInt16 => buf.store(integer::<u16>(value, basic)?),
        BasicType::Int32 => buf.store(integer::<i32>(value, basic)?),
        BasicType::UInt32 => buf.store(integer::<u32>(value, basic)?),
        BasicType::Int64 => buf.store(integer::<i64>(value, basic)?),
        BasicType::UInt64 => buf.store(integer::<u64>(value, basic)?),
        BasicType::Double => {
            let Value::Float64(f) = *value else {
                return Err(mismatch(SignatureNode::Basic(basic), value));
            };

            buf.store(f);
        }
        BasicType::String => {
            let Some(string) = value.as_str() else {
                return Err(mismatch(SignatureNode::Basic(basic), value));
            };

            encode_str(buf, string, basic)?;
        }
        BasicType::ObjectPath => match value {
            Value::ObjectPath(path) => buf.write(path),
            Value::Str(string) => encode_str(buf, string, basic)?,
            value => return Err(mismatch(SignatureNode::Basic(basic), value)),
        },
        BasicType::Signature => match value {
            Value::Signature(signature) => buf.store_signature(signature.as_str()),
            Value::Str(string) => encode_str(buf, string, basic)?,
            value => return Err(mismatch(SignatureNode::Basic(basic), value)),
        },
        BasicType::UnixFd => return Err(Error::new(ErrorKind::UnsupportedType(basic.ty()))),
    }

    Ok(())
}

/// Encode a string as one of the string-like basic types, validating it for
/// the type.
fn encode_str(buf: &mut OwnedBuf, string: &str, basic: BasicType) -> Result<()> {
    match basic {
        BasicType::String => {
            if string.contains('\0') {
                return Err(Error::new(ErrorKind::EncodeMismatch {
                    expected: "s".into(),
                    actual: "string with a nul byte",
                }));
            }

            buf.write(string);
        }
        BasicType::ObjectPath => {
            let path = ObjectPath::new(string)?;
            buf.write(&path);
        }
        BasicType::Signature => {
            let signature = Signature::new(string)?;
            buf.store_signature(signature.as_str());
        }
        basic => return Err(Error::new(ErrorKind::UnsupportedType(basic.ty()))),
    }

    Ok(())
}

fn integer<T>(value: &Value, basic: BasicType) -> Result<T>
where
    T: TryFrom<i64> + TryFrom<u64>,
{
    let converted = match *value {
        Value::Int64(v) => <T as TryFrom<i64>>::try_from(v).ok(),
        Value::UInt64(v) => <T as TryFrom<u64>>::try_from(v).ok(),
        _ => None,
    };

    match converted {
        Some(converted) => Ok(converted),
        None => Err(mismatch(SignatureNode::Basic(basic), value)),
    }
}

fn mismatch<E>(expected: E, value: &Value) -> Error
where
    E: fmt::Display,
{
    Error::new(ErrorKind::EncodeMismatch {
        expected: expected.to_string().into(),
        actual: value.kind(),
    })
}
