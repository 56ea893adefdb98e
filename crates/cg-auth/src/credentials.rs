//! Credential lookup.
//!
//! The login flow (outside this crate) writes the token; this crate only
//! reads it. Older releases of the dashboard stored it under different key
//! names, so lookup walks an ordered list with the canonical key first.
//!
//! Token values are redacted in Debug output.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::storage::KeyValueStore;

/// Canonical storage key for the credential token.
pub const CANONICAL_TOKEN_KEY: &str = "auth_token";

/// Key names used by earlier releases, in lookup order after the canonical key.
pub const LEGACY_TOKEN_KEYS: &[&str] = &["authToken", "token", "access_token"];

/// An opaque bearer credential.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a token. Surrounding whitespace is trimmed; a blank token is
    /// treated as absent.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        let trimmed = value.trim();
        let trimmed = trimmed.strip_prefix("Bearer ").unwrap_or(trimmed).trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken([REDACTED])")
    }
}

/// Ordered list of storage keys that may hold the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialKeys {
    keys: Vec<String>,
}

impl CredentialKeys {
    /// Lookup order: `canonical`, then `legacy` in the given order.
    pub fn new(canonical: impl Into<String>, legacy: &[&str]) -> Self {
        let mut keys = vec![canonical.into()];
        for key in legacy {
            if !keys.iter().any(|k| k == key) {
                keys.push((*key).to_string());
            }
        }
        Self { keys }
    }

    pub fn canonical(&self) -> &str {
        &self.keys[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl Default for CredentialKeys {
    fn default() -> Self {
        Self::new(CANONICAL_TOKEN_KEY, LEGACY_TOKEN_KEYS)
    }
}

/// Reads the credential token from a [`KeyValueStore`].
#[derive(Debug, Clone)]
pub struct CredentialSource {
    store: Arc<dyn KeyValueStore>,
    keys: CredentialKeys,
}

impl CredentialSource {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_keys(store, CredentialKeys::default())
    }

    pub fn with_keys(store: Arc<dyn KeyValueStore>, keys: CredentialKeys) -> Self {
        Self { store, keys }
    }

    pub fn keys(&self) -> &CredentialKeys {
        &self.keys
    }

    /// Find the current token, if any.
    ///
    /// Never fails: storage errors are logged and treated as "no token",
    /// since a missing credential only matters if the server says so.
    pub fn token(&self) -> Option<BearerToken> {
        for key in self.keys.iter() {
            match self.store.get(key) {
                Ok(Some(value)) => {
                    if let Some(token) = BearerToken::new(value) {
                        if key != self.keys.canonical() {
                            debug!(key, "Credential found under legacy key");
                        }
                        return Some(token);
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    warn!(key, error = %err, "Could not read credential from storage");
                }
            }
        }
        None
    }
}
