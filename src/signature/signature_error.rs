use crate::protocol::Type;

/// Detailed errors raised when validation of a [`Signature`] fails.
///
/// [`Signature`]: crate::Signature
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SignatureError {
    #[error("Unknown type code: {0:?}")]
    UnknownTypeCode(Type),
    #[error("Signature too long")]
    SignatureTooLong,
    #[error("Missing array element type")]
    MissingArrayElementType,
    #[error("Struct ended but not started")]
    StructEndedButNotStarted,
    #[error("Dict ended but not started")]
    DictEndedButNotStarted,
    #[error("Struct started but not ended")]
    StructStartedButNotEnded,
    #[error("Dict started but not ended")]
    DictStartedButNotEnded,
    #[error("Struct has no fields")]
    StructHasNoFields,
    #[error("Dict key must be basic type")]
    DictKeyMustBeBasicType,
    #[error("Dict entry has no fields")]
    DictEntryHasNoFields,
    #[error("Dict entry has only one field")]
    DictEntryHasOnlyOneField,
    #[error("Dict entry not inside array")]
    DictEntryNotInsideArray,
    #[error("Exceeded maximum array recursion")]
    ExceededMaximumArrayRecursion,
    #[error("Exceeded maximum struct recursion")]
    ExceededMaximumStructRecursion,
    #[error("Exceeded maximum dict recursion")]
    ExceededMaximumDictRecursion,
    #[error("Dict entry has too many fields")]
    DictEntryHasTooManyFields,
    #[error("Expected a single complete type")]
    NotSingleCompleteType,
}
