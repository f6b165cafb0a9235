//! Conversion between [`Value`] trees and marshalled bytes.
//!
//! Both directions walk a parsed [`SignatureNode`] tree, so the signature text
//! is never re-scanned while a value is being processed.
//!
//! [`Value`]: crate::Value
//! [`SignatureNode`]: crate::SignatureNode

pub use self::decode::{decode, decode_all};
mod decode;

pub use self::encode::{encode, encode_all};
mod encode;

pub use self::infer::infer;
mod infer;

#[cfg(test)]
mod tests;

/// The maximum number of nested containers, variants included, accepted while
/// decoding or encoding a single value.
pub(crate) const MAX_NESTING: usize = 64;
