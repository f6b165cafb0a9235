//! The parsed form of D-Bus signatures.
//!
//! A [`Signature`] is parsed once into a sequence of [`SignatureNode`] trees
//! which the codec then walks, instead of re-scanning the signature text for
//! every nested value.

pub use self::signature::Signature;
mod signature;

pub use self::node::{BasicType, SignatureNode};
mod node;

pub use self::signature_error::SignatureError;
mod signature_error;

pub use self::cache::SignatureCache;
mod cache;

use self::parser::Parser;
mod parser;


/// The maximum length of a signature.
pub(crate) const MAX_SIGNATURE: usize = 255;

/// The maximum nesting of arrays, structs or dict entries respectively.
pub(crate) const MAX_DEPTH: usize = 32;
