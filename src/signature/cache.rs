use std::collections::HashMap;

use super::{Signature, SignatureError};

/// A registry of parsed signatures.
///
/// Each connection owns one, so a signature used repeatedly on that
/// connection is only parsed once.
///
/// # Examples
///
/// ```
/// use dynbus::SignatureCache;
///
/// let mut cache = SignatureCache::new();
/// let a = cache.get("a{sv}")?;
/// let b = cache.get("a{sv}")?;
/// assert_eq!(a, b);
/// assert_eq!(cache.len(), 1);
/// # Ok::<_, dynbus::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct SignatureCache {
    entries: HashMap<Box<str>, Signature>,
}

impl SignatureCache {
    /// Construct an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the parsed form of `text`, parsing it if it hasn't been seen.
    ///
    /// Invalid signatures are not cached.
    pub fn get(&mut self, text: &str) -> Result<Signature, SignatureError> {
        if let Some(signature) = self.entries.get(text) {
            return Ok(signature.clone());
        }

        let signature = Signature::new(text)?;
        self.entries.insert(text.into(), signature.clone());
        Ok(signature)
    }

    /// The number of cached signatures.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Test if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every cached signature.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
