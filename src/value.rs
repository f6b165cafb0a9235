use std::collections::BTreeMap;
use std::fmt;

use crate::{ObjectPath, Signature};

/// A dynamically typed value which can be marshalled against any signature.
///
/// Decoding produces values with the widest representation of their kind,
/// every signed integer becomes [`Value::Int64`] and every unsigned integer
/// becomes [`Value::UInt64`], while encoding checks that the value fits the
/// width the signature asks for.
///
/// # Examples
///
/// ```
/// use std::collections::BTreeMap;
///
/// use dynbus::Value;
///
/// let mut map = BTreeMap::new();
/// map.insert(String::from("answer"), Value::from(42i32));
///
/// let value = Value::Struct(vec![Value::from("hello"), Value::Mapping(map)]);
/// assert_eq!(value.kind(), "struct");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int64(i64),
    UInt64(u64),
    Float64(f64),
    Str(String),
    ObjectPath(ObjectPath),
    Signature(Signature),
    Sequence(Vec<Value>),
    Mapping(BTreeMap<String, Value>),
    Struct(Vec<Value>),
    Variant(Box<Value>),
}

impl Value {
    /// Wrap a value in an explicit variant.
    pub fn variant<T>(value: T) -> Self
    where
        T: Into<Value>,
    {
        Value::Variant(Box::new(value.into()))
    }

    /// A short name describing the kind of value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(..) => "bool",
            Value::Int64(..) => "int64",
            Value::UInt64(..) => "uint64",
            Value::Float64(..) => "float64",
            Value::Str(..) => "string",
            Value::ObjectPath(..) => "object path",
            Value::Signature(..) => "signature",
            Value::Sequence(..) => "sequence",
            Value::Mapping(..) => "mapping",
            Value::Struct(..) => "struct",
            Value::Variant(..) => "variant",
        }
    }

    /// Access the value as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Bool(value) => Some(value),
            _ => None,
        }
    }

    /// Access an integer value as a signed integer, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Value::Int64(value) => Some(value),
            Value::UInt64(value) => i64::try_from(value).ok(),
            _ => None,
        }
    }

    /// Access an integer value as an unsigned integer, if it fits.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::Int64(value) => u64::try_from(value).ok(),
            Value::UInt64(value) => Some(value),
            _ => None,
        }
    }

    /// Access the value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            Value::Float64(value) => Some(value),
            _ => None,
        }
    }

    /// Access any string-like value as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(value) => Some(value),
            Value::ObjectPath(value) => Some(value.as_str()),
            Value::Signature(value) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Access the elements of a sequence or the fields of a struct.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Sequence(values) | Value::Struct(values) => Some(values),
            _ => None,
        }
    }

    /// Access the value as a mapping.
    pub fn as_mapping(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Value::Mapping(map) => Some(map),
            _ => None,
        }
    }
}

macro_rules! from_signed {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::Int64(i64::from(value))
                }
            }
        )*
    };
}

macro_rules! from_unsigned {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::UInt64(u64::from(value))
                }
            }
        )*
    };
}

from_signed!(i16, i32, i64);
from_unsigned!(u8, u16, u32, u64);

impl From<bool> for Value {
    #[inline]
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    #[inline]
    fn from(value: f64) -> Self {
        Value::Float64(value)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Str(value.to_owned())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::Str(value)
    }
}

impl From<ObjectPath> for Value {
    #[inline]
    fn from(value: ObjectPath) -> Self {
        Value::ObjectPath(value)
    }
}

impl From<Signature> for Value {
    #[inline]
    fn from(value: Signature) -> Self {
        Value::Signature(value)
    }
}

impl From<Vec<Value>> for Value {
    #[inline]
    fn from(values: Vec<Value>) -> Self {
        Value::Sequence(values)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    #[inline]
    fn from(map: BTreeMap<String, Value>) -> Self {
        Value::Mapping(map)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(value) => value.fmt(f),
            Value::Int64(value) => value.fmt(f),
            Value::UInt64(value) => value.fmt(f),
            Value::Float64(value) => value.fmt(f),
            Value::Str(value) => write!(f, "{value:?}"),
            Value::ObjectPath(value) => write!(f, "{value}"),
            Value::Signature(value) => write!(f, "<{value}>"),
            Value::Sequence(values) => {
                f.debug_list().entries(values.iter().map(Displayed)).finish()
            }
            Value::Mapping(map) => f
                .debug_map()
                .entries(map.iter().map(|(k, v)| (k, Displayed(v))))
                .finish(),
            Value::Struct(values) => {
                let mut tuple = f.debug_tuple("");

                for value in values {
                    tuple.field(&Displayed(value));
                }

                tuple.finish()
            }
            Value::Variant(value) => write!(f, "variant({value})"),
        }
    }
}

struct Displayed<'a>(&'a Value);

impl fmt::Debug for Displayed<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self.0, f)
    }
}
