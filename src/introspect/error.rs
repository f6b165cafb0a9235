use std::fmt;

use crate::SignatureError;

/// An error raised while parsing an introspection document.
///
/// Carries the element path the error was raised at, like
/// `node/interface/method`.
#[derive(Debug)]
pub struct IntrospectError {
    path: Box<str>,
    kind: IntrospectErrorKind,
}

impl IntrospectError {
    #[inline]
    pub(super) fn new<P, K>(path: P, kind: K) -> Self
    where
        P: AsRef<str>,
        IntrospectErrorKind: From<K>,
    {
        Self {
            path: path.as_ref().into(),
            kind: IntrospectErrorKind::from(kind),
        }
    }

    /// The element path the error was raised at.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for IntrospectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            self.kind.fmt(f)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl std::error::Error for IntrospectError {
    #[inline]
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            IntrospectErrorKind::Xml(error) => Some(error),
            IntrospectErrorKind::Signature(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub(super) enum IntrospectErrorKind {
    #[error("Malformed document: {0}")]
    Xml(#[from] xmlparser::Error),
    #[error("Invalid argument type: {0}")]
    Signature(#[from] SignatureError),
    #[error("Unsupported element `{0}`")]
    UnsupportedElementStart(Box<str>),
    #[error("Unsupported element end")]
    UnsupportedElementEnd,
    #[error("Unsupported attribute `{0}`")]
    UnsupportedAttribute(Box<str>),
    #[error("Unsupported text")]
    UnsupportedText,
    #[error("Expected end of `{expected}` but got `{actual}`")]
    MismatchingEnd { expected: Box<str>, actual: Box<str> },
    #[error("Missing root node")]
    MissingNode,
    #[error("Element is never closed")]
    UnclosedElement,
    #[error("Missing name")]
    MissingName,
    #[error("Missing type")]
    MissingType,
    #[error("Missing access")]
    MissingAccess,
    #[error("Missing annotation value")]
    MissingValue,
    #[error("Unsupported direction `{0}`")]
    UnsupportedDirection(Box<str>),
    #[error("Unsupported access `{0}`")]
    UnsupportedAccess(Box<str>),
}
