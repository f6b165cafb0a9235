use std::fmt;
use std::sync::Arc;

use super::{Parser, SignatureError, SignatureNode};

/// A parsed D-Bus signature.
///
/// The signature text is validated and parsed once on construction. Cloning
/// is cheap, the parsed nodes are shared.
///
/// # Examples
///
/// ```
/// use dynbus::{BasicType, Signature, SignatureNode};
///
/// let signature = Signature::new("sa{sv}")?;
/// assert_eq!(signature.len(), 2);
/// assert_eq!(signature.nodes()[0], SignatureNode::Basic(BasicType::String));
/// assert_eq!(signature.to_string(), "sa{sv}");
/// # Ok::<_, dynbus::Error>(())
/// ```
#[derive(Clone)]
pub struct Signature {
    text: Arc<str>,
    nodes: Arc<[SignatureNode]>,
}

impl Signature {
    /// Parse a signature.
    ///
    /// # Errors
    ///
    /// Errors with a [`SignatureError`] if the text is not a valid signature.
    pub fn new<S>(text: S) -> Result<Self, SignatureError>
    where
        S: AsRef<str>,
    {
        let text = text.as_ref();
        let nodes = Parser::new(text.as_bytes())?.parse_all()?;

        Ok(Self {
            text: text.into(),
            nodes: nodes.into(),
        })
    }

    /// The empty signature.
    pub fn empty() -> Self {
        Self {
            text: "".into(),
            nodes: Arc::new([]),
        }
    }

    /// Construct a signature from already parsed nodes.
    pub fn from_nodes(nodes: Vec<SignatureNode>) -> Self {
        let text = nodes.iter().map(ToString::to_string).collect::<String>();

        Self {
            text: text.into(),
            nodes: nodes.into(),
        }
    }

    /// Parse a signature which must hold exactly one complete type, as the
    /// signature embedded in a variant does.
    pub fn single<S>(text: S) -> Result<SignatureNode, SignatureError>
    where
        S: AsRef<str>,
    {
        let mut nodes = Parser::new(text.as_ref().as_bytes())?.parse_all()?;

        match (nodes.pop(), nodes.is_empty()) {
            (Some(node), true) => Ok(node),
            _ => Err(SignatureError::NotSingleCompleteType),
        }
    }

    /// The signature text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The complete types making up the signature.
    pub fn nodes(&self) -> &[SignatureNode] {
        &self.nodes
    }

    /// The number of complete types in the signature.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Test if the signature is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Default for Signature {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for Signature {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl Eq for Signature {}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

impl fmt::Debug for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.text.fmt(f)
    }
}

impl AsRef<str> for Signature {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl TryFrom<&str> for Signature {
    type Error = SignatureError;

    #[inline]
    fn try_from(text: &str) -> Result<Self, Self::Error> {
        Self::new(text)
    }
}
