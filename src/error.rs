use std::error;
use std::io;
use std::str::Utf8Error;

use crate::connection::ConnectionState;
use crate::introspect::IntrospectError;
use crate::protocol::Type;
use crate::{ObjectPath, ObjectPathError, SignatureError};

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug, thiserror::Error)]
#[error(transparent)]
pub struct Error {
    #[from]
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    /// Wrap a failure raised by a [`Transport`] implementation.
    ///
    /// [`Transport`]: crate::Transport
    pub fn transport<E>(error: E) -> Self
    where
        E: Into<Box<dyn error::Error + Send + Sync>>,
    {
        Self::new(ErrorKind::Transport(error.into()))
    }

    /// Test if the error was raised because a signature is malformed.
    pub fn is_malformed_signature(&self) -> bool {
        matches!(self.kind, ErrorKind::Signature(..))
    }

    /// Test if the error was raised because a type can't be marshalled.
    pub fn is_unsupported_type(&self) -> bool {
        matches!(self.kind, ErrorKind::UnsupportedType(..))
    }

    /// Test if the error was raised because a value didn't match the
    /// signature it was encoded against.
    pub fn is_encode_mismatch(&self) -> bool {
        matches!(self.kind, ErrorKind::EncodeMismatch { .. })
    }

    /// Test if the error was raised because the number of arguments didn't
    /// match the signature.
    pub fn is_argument_count_mismatch(&self) -> bool {
        matches!(self.kind, ErrorKind::ArgumentCountMismatch { .. })
    }

    /// Test if the error was raised by the underlying transport.
    pub fn is_transport_failure(&self) -> bool {
        matches!(self.kind, ErrorKind::Io(..) | ErrorKind::Transport(..))
    }

    /// Test if the error was raised because the connection isn't connected.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self.kind, ErrorKind::InvalidState(..))
    }

    /// Test if the error was raised because an introspection document could
    /// not be parsed.
    pub fn is_malformed_introspection(&self) -> bool {
        matches!(self.kind, ErrorKind::Introspect(..))
    }

    /// Test if the error was raised because an introspected object lacks the
    /// requested interface, method or signal.
    pub fn is_unknown_member(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::UnknownInterface(..) | ErrorKind::UnknownMethod(..) | ErrorKind::UnknownSignal(..)
        )
    }

    /// The name of the error reply this error was raised from, like
    /// `org.freedesktop.DBus.Error.NoReply`.
    pub fn error_name(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Reply { name, .. } => Some(name),
            _ => None,
        }
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<ObjectPathError> for Error {
    #[inline]
    fn from(error: ObjectPathError) -> Self {
        Self::new(ErrorKind::ObjectPath(error))
    }
}

impl From<IntrospectError> for Error {
    #[inline]
    fn from(error: IntrospectError) -> Self {
        Self::new(ErrorKind::Introspect(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        Self::new(ErrorKind::Io(error))
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8Error(error))
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum ErrorKind {
    #[error(transparent)]
    Io(io::Error),
    #[error(transparent)]
    Signature(SignatureError),
    #[error(transparent)]
    ObjectPath(ObjectPathError),
    #[error(transparent)]
    Utf8Error(Utf8Error),
    #[error("Transport failure: {0}")]
    Transport(Box<dyn error::Error + Send + Sync>),
    #[error("Unsupported type {0:?}")]
    UnsupportedType(Type),
    #[error("Expected a value matching `{expected}` but got {actual}")]
    EncodeMismatch {
        expected: Box<str>,
        actual: &'static str,
    },
    #[error("Signature expects {expected} arguments but {actual} were provided")]
    ArgumentCountMismatch { expected: usize, actual: usize },
    #[error("Buffer underflow")]
    BufferUnderflow,
    #[error("String is not null terminated")]
    NotNullTerminated,
    #[error("Invalid boolean value {0}")]
    InvalidBool(u32),
    #[error("Array of length {0} is too long (max is 67108864)")]
    ArrayTooLong(u32),
    #[error("Values are nested too deeply")]
    NestingTooDeep,
    #[error("Invalid connection state `{0}`")]
    InvalidState(ConnectionState),
    #[error("Connection is already being driven")]
    AlreadyRunning,
    #[error("Missing bus address")]
    MissingBus,
    #[error("Invalid d-bus address")]
    InvalidAddress,
    #[error("Connection must be used inside of a Tokio runtime")]
    MissingRuntime,
    #[error("Object path `{0}` already has a handler")]
    ObjectPathInUse(ObjectPath),
    #[error("Message has not been assigned a serial")]
    MissingSerial,
    #[error("Handler panicked: {0}")]
    HandlerPanicked(Box<str>),
    #[error(transparent)]
    Introspect(IntrospectError),
    #[error("Object does not implement interface `{0}`")]
    UnknownInterface(Box<str>),
    #[error("Interface has no method `{0}`")]
    UnknownMethod(Box<str>),
    #[error("Interface has no signal `{0}`")]
    UnknownSignal(Box<str>),
    #[error("Call failed with `{name}`: {}", .message.as_deref().unwrap_or("no description"))]
    Reply {
        name: Box<str>,
        message: Option<Box<str>>,
    },
    #[error("Unexpected reply with signature `{0}`")]
    UnexpectedReply(Box<str>),
}
