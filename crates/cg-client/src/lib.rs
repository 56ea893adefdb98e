//! # campusgate-client
//!
//! HTTP transport for the campus dashboard API.
//!
//! This crate provides:
//! - Endpoint candidates and the page transport context
//! - A raw HTTP client with a fixed timeout and default JSON headers
//! - An endpoint-bound client with an interceptor chain
//! - Classification of every failure into a small closed taxonomy
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     FallbackPolicy                          │
//! │  (campusgate-fallback: live / degraded / demo decisions)    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ApiClient                             │
//! │  - Bound to one EndpointCandidate                           │
//! │  - Interceptors: auth injection, then logging               │
//! │  - Failures leave as ClassifiedError                        │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HttpClient                             │
//! │  - One attempt per call, timeout, default headers           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use campusgate_client::{ApiClient, EndpointCandidate, PageContext};
//!
//! let candidate = EndpointCandidate::parse("https://api.campus.edu/api")?;
//! let client = ApiClient::new(candidate, PageContext::secure())?;
//!
//! match client.get_json::<serde_json::Value>("/schools").await {
//!     Ok(schools) => println!("{schools}"),
//!     Err(failure) => eprintln!("{} ({:?})", failure.message, failure.kind),
//! }
//! ```

use std::time::Duration;

mod api_client;
mod classify;
mod client;
mod config;
mod endpoint;
mod error;
mod interceptor;
mod request;
mod response;

pub use api_client::ApiClient;
pub use classify::{
    classify, sanitize_message, ClassifiedError, ClassifyContext, FailureKind,
    MIXED_CONTENT_REMEDIATION,
};
pub use client::HttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use endpoint::{EndpointCandidate, PageContext, Scheme};
pub use error::{Error, ErrorKind, Result};
pub use interceptor::{LoggingInterceptor, RequestInterceptor};
pub use request::{RequestBuilder, RequestMethod};
pub use response::Response;

/// Timeout for regular API requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for a single reachability probe.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("campusgate/", env!("CARGO_PKG_VERSION"));
