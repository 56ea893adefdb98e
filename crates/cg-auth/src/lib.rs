//! # campusgate-auth
//!
//! Credential handling for the campus dashboard API.
//!
//! ## Security
//!
//! - Token values are redacted in Debug output
//! - Log lines never include the token, only whether one was attached
//! - The storage file is written with owner-only permissions on Unix
//!
//! ## What lives here
//!
//! - **KeyValueStore** - client-local persistent storage (file or memory)
//! - **CredentialSource** - reads the token under the canonical key or a
//!   legacy key name
//! - **AuthInterceptor** - attaches the token as a bearer credential to every
//!   outbound request, never failing when it is absent
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use campusgate_auth::{AuthInterceptor, CredentialSource, FileStore};
//! use campusgate_client::{ApiClient, EndpointCandidate, PageContext};
//!
//! let store = Arc::new(FileStore::new()?);
//! let auth = Arc::new(AuthInterceptor::new(CredentialSource::new(store)));
//! let candidate = EndpointCandidate::parse("https://api.campus.edu")?;
//! let client = ApiClient::new(candidate, PageContext::secure())?.with_interceptor(auth);
//! ```

mod credentials;
mod error;
mod interceptor;
mod storage;

pub use credentials::{
    BearerToken, CredentialKeys, CredentialSource, CANONICAL_TOKEN_KEY, LEGACY_TOKEN_KEYS,
};
pub use error::{Error, ErrorKind, Result};
pub use interceptor::AuthInterceptor;
pub use storage::{default_storage_dir, default_storage_path, FileStore, KeyValueStore, MemoryStore};
