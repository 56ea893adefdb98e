//! # campusgate
//!
//! API resilience layer for the campus dashboard.
//!
//! The dashboard talks to a backend whose location and transport are not
//! always known up front: a page served over HTTPS cannot reach a plain HTTP
//! backend, servers are sometimes slow, and demos have to work with no
//! backend at all. This library decides which endpoint to use, attaches
//! credentials, classifies failures, and falls back to synthetic data when
//! asked to.
//!
//! ## Security
//!
//! - Tokens are redacted in Debug output
//! - Log lines record whether a request carried a credential, never the value
//! - Error messages are sanitized of bearer tokens
//!
//! ## Crates
//!
//! - **campusgate-client** - HTTP transport, endpoint candidates, request
//!   client and error classifier
//! - **campusgate-auth** - Key-value storage, credential lookup and the auth
//!   interceptor
//! - **campusgate-fallback** - Protocol resolver, connection prober, mode
//!   switch, demo catalogue and the fallback policy
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use campusgate::{FallbackPolicy, FileStore, ResilienceConfig, School};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(FileStore::new()?);
//!     let policy = FallbackPolicy::new(ResilienceConfig::from_env()?, store)?;
//!
//!     let schools = policy.get::<Vec<School>>("/schools").await;
//!     match schools.data {
//!         Some(list) => println!("{} schools ({:?})", list.len(), schools.source),
//!         None => eprintln!("{}", schools.error.map(|e| e.to_string()).unwrap_or_default()),
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "auth")]
pub use campusgate_auth as auth;
#[cfg(feature = "client")]
pub use campusgate_client as client;
#[cfg(feature = "fallback")]
pub use campusgate_fallback as fallback;

// Re-export commonly used types at the top level
#[cfg(feature = "auth")]
pub use campusgate_auth::{AuthInterceptor, CredentialSource, FileStore, KeyValueStore, MemoryStore};
#[cfg(feature = "client")]
pub use campusgate_client::{
    ApiClient, ClassifiedError, ClientConfig, EndpointCandidate, FailureKind, PageContext,
    RequestMethod, Scheme,
};
#[cfg(feature = "fallback")]
pub use campusgate_fallback::{
    ApiResponse, CandidatePlan, ConnectionProber, ConnectionStatus, DataSource, DemoCatalog,
    FallbackPolicy, ModeSwitch, ProbeConfig, ProbeReport, ProtocolResolver, ResilienceConfig,
    School,
};
