use std::fmt;

use crate::protocol::Type;

/// A basic (non-container) type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum BasicType {
    Byte,
    Boolean,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Double,
    String,
    ObjectPath,
    Signature,
    UnixFd,
}

impl BasicType {
    /// Map a type code to a basic type.
    pub fn from_type(ty: Type) -> Option<Self> {
        let basic = match ty {
            Type::BYTE => BasicType::Byte,
            Type::BOOLEAN => BasicType::Boolean,
            Type::INT16 => BasicType::Int16,
            Type::UINT16 => BasicType::UInt16,
            Type::INT32 => BasicType::Int32,
            Type::UINT32 => BasicType::UInt32,
            Type::INT64 => BasicType::Int64,
            Type::UINT64 => BasicType::UInt64,
            Type::DOUBLE => BasicType::Double,
            Type::STRING => BasicType::String,
            Type::OBJECT_PATH => BasicType::ObjectPath,
            Type::SIGNATURE => BasicType::Signature,
            Type::UNIX_FD => BasicType::UnixFd,
            _ => return None,
        };

        Some(basic)
    }

    /// The type code of the basic type.
    pub fn ty(self) -> Type {
        match self {
            BasicType::Byte => Type::BYTE,
            BasicType::Boolean => Type::BOOLEAN,
            BasicType::Int16 => Type::INT16,
            BasicType::UInt16 => Type::UINT16,
            BasicType::Int32 => Type::INT32,
            BasicType::UInt32 => Type::UINT32,
            BasicType::Int64 => Type::INT64,
            BasicType::UInt64 => Type::UINT64,
            BasicType::Double => Type::DOUBLE,
            BasicType::String => Type::STRING,
            BasicType::ObjectPath => Type::OBJECT_PATH,
            BasicType::Signature => Type::SIGNATURE,
            BasicType::UnixFd => Type::UNIX_FD,
        }
    }

    /// The wire alignment of the type.
    pub fn alignment(self) -> usize {
        match self {
            BasicType::Byte | BasicType::Signature => 1,
            BasicType::Int16 | BasicType::UInt16 => 2,
            BasicType::Boolean
            | BasicType::Int32
            | BasicType::UInt32
            | BasicType::String
            | BasicType::ObjectPath
            | BasicType::UnixFd => 4,
            BasicType::Int64 | BasicType::UInt64 | BasicType::Double => 8,
        }
    }

    /// Test if the type is marshalled as a string.
    pub fn is_string_like(self) -> bool {
        matches!(
            self,
            BasicType::String | BasicType::ObjectPath | BasicType::Signature
        )
    }
}

/// A single complete type in a signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignatureNode {
    /// A basic type.
    Basic(BasicType),
    /// An array of the given element.
    Array(Box<SignatureNode>),
    /// A struct with the given ordered fields.
    Struct(Vec<SignatureNode>),
    /// A dict entry, only valid as the element of an array.
    DictEntry(BasicType, Box<SignatureNode>),
    /// A variant carrying its own signature.
    Variant,
}

impl SignatureNode {
    /// The wire alignment of the node.
    ///
    /// # Examples
    ///
    /// ```
    /// use dynbus::Signature;
    ///
    /// let signature = Signature::new("ya{sv}(y)v")?;
    /// let alignments = signature.nodes().iter().map(|n| n.alignment()).collect::<Vec<_>>();
    /// assert_eq!(alignments, [1, 4, 8, 1]);
    /// # Ok::<_, dynbus::Error>(())
    /// ```
    pub fn alignment(&self) -> usize {
        match self {
            SignatureNode::Basic(basic) => basic.alignment(),
            SignatureNode::Array(..) => 4,
            SignatureNode::Struct(..) | SignatureNode::DictEntry(..) => 8,
            SignatureNode::Variant => 1,
        }
    }

    /// Test if this node is a dict entry.
    pub fn is_dict_entry(&self) -> bool {
        matches!(self, SignatureNode::DictEntry(..))
    }
}

impl From<BasicType> for SignatureNode {
    #[inline]
    fn from(basic: BasicType) -> Self {
        SignatureNode::Basic(basic)
    }
}

impl fmt::Display for SignatureNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;

        match self {
            SignatureNode::Basic(basic) => f.write_char(basic.ty().code() as char),
            SignatureNode::Array(element) => write!(f, "a{element}"),
            SignatureNode::Struct(fields) => {
                f.write_char('(')?;

                for field in fields {
                    field.fmt(f)?;
                }

                f.write_char(')')
            }
            SignatureNode::DictEntry(key, value) => {
                write!(f, "{{{}{value}}}", key.ty().code() as char)
            }
            SignatureNode::Variant => f.write_char('v'),
        }
    }
}
