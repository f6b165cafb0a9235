use crate::error::{ErrorKind, Result};
use crate::{BasicType, Error, SignatureNode, Value};

use super::MAX_NESTING;

/// Infer the signature a value is marshalled with when it is wrapped in a
/// variant.
///
/// This is best-effort: integers pick the narrowest of `i`/`x` or `u`/`t`
/// that fits, sequences whose elements disagree become `av`, and mappings
/// become `a{sv}`. A value decoded from a variant is not guaranteed to infer
/// back to the signature it was sent with.
///
/// # Examples
///
/// ```
/// use dynbus::{codec, Value};
///
/// assert_eq!(codec::infer(&Value::from(true))?.to_string(), "b");
/// assert_eq!(codec::infer(&Value::from(1i64 << 40))?.to_string(), "x");
///
/// let mixed = Value::Sequence(vec![Value::from(1u32), Value::from("one")]);
/// assert_eq!(codec::infer(&mixed)?.to_string(), "av");
/// # Ok::<_, dynbus::Error>(())
/// ```
pub fn infer(value: &Value) -> Result<SignatureNode> {
    infer_node(value, 0)
}

fn infer_node(value: &Value, depth: usize) -> Result<SignatureNode> {
    if depth > MAX_NESTING {
        return Err(Error::new(ErrorKind::NestingTooDeep));
    }

    let node = match value {
        Value::Bool(..) => SignatureNode::Basic(BasicType::Boolean),
        Value::Int64(v) => {
            if i32::try_from(*v).is_ok() {
                SignatureNode::Basic(BasicType::Int32)
            } else {
                SignatureNode::Basic(BasicType::Int64)
            }
        }
        Value::UInt64(v) => {
            if u32::try_from(*v).is_ok() {
                SignatureNode::Basic(BasicType::UInt32)
            } else {
                SignatureNode::Basic(BasicType::UInt64)
            }
        }
        Value::Float64(..) => SignatureNode::Basic(BasicType::Double),
        Value::Str(..) => SignatureNode::Basic(BasicType::String),
        Value::ObjectPath(..) => SignatureNode::Basic(BasicType::ObjectPath),
        Value::Signature(..) => SignatureNode::Basic(BasicType::Signature),
        Value::Sequence(values) => {
            let mut common = None;

            for value in values {
                let node = infer_node(value, depth + 1)?;

                match &common {
                    None => common = Some(node),
                    Some(existing) if *existing == node => {}
                    Some(..) => {
                        common = Some(SignatureNode::Variant);
                        break;
                    }
                }
            }

            SignatureNode::Array(Box::new(common.unwrap_or(SignatureNode::Variant)))
        }
        Value::Mapping(..) => SignatureNode::Array(Box::new(SignatureNode::DictEntry(
            BasicType::String,
            Box::new(SignatureNode::Variant),
        ))),
        Value::Struct(values) => {
            if values.is_empty() {
                return Err(Error::new(ErrorKind::EncodeMismatch {
                    expected: "(..)".into(),
                    actual: "empty struct",
                }));
            }

            let mut fields = Vec::with_capacity(values.len());

            for value in values {
                fields.push(infer_node(value, depth + 1)?);
            }

            SignatureNode::Struct(fields)
        }
        Value::Variant(..) => SignatureNode::Variant,
    };

    Ok(node)
}
