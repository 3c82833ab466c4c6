//! Identifier newtypes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Content-derived document identifier.
///
/// Derived once at creation from the content hash and creation context,
/// then treated as opaque.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique signatory identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SignatoryId(pub String);

impl SignatoryId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SignatoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Capability token bound 1:1 to a signatory.
///
/// The sole authentication mechanism for the signer-facing workflow,
/// equivalent to a bearer credential. Display deliberately truncates so
/// the full token never reaches logs.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessToken(pub String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(8).collect();
        write!(f, "token({prefix}…)")
    }
}

/// Opaque handle into the blob store.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlobRef(pub String);

impl BlobRef {
    pub fn new(r: impl Into<String>) -> Self {
        Self(r.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlobRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_display_truncates() {
        let token = AccessToken::new("0123456789abcdef0123456789abcdef");
        assert_eq!(token.to_string(), "token(01234567…)");
    }

    #[test]
    fn token_display_survives_multibyte_content() {
        let token = AccessToken::new("ação-assinatura-2024");
        assert_eq!(token.to_string(), "token(ação-ass…)");

        let short = AccessToken::new("açã");
        assert_eq!(short.to_string(), "token(açã…)");
    }

    #[test]
    fn signatory_ids_are_unique() {
        assert_ne!(SignatoryId::generate(), SignatoryId::generate());
    }
}
