/// An error constructing an object path.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid D-Bus object path {0:?}")]
#[non_exhaustive]
pub struct ObjectPathError(pub(crate) Box<str>);
