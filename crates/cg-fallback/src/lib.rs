//! # campusgate-fallback
//!
//! Connectivity resilience for the campus dashboard API.
//!
//! ## Pipeline
//!
//! ```text
//!   ResilienceConfig ─▶ ProtocolResolver ─▶ CandidatePlan
//!                                              │
//!                                              ▼
//!                                      ConnectionProber ─▶ ProbeReport
//!                                              │
//!                                              ▼
//!   request ─▶ FallbackPolicy ─┬─ Demo ──────▶ DemoSource
//!                              ├─ Live ──────▶ ApiClient (+ AuthInterceptor)
//!                              │                 └─ connectivity failure ─▶ alternate
//!                              └─ Degraded ──▶ ClassifiedError (or flagged demo data)
//! ```
//!
//! Every request resolves to an [`ApiResponse`]; nothing is raised.
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use campusgate_auth::FileStore;
//! use campusgate_fallback::{FallbackPolicy, ResilienceConfig, School};
//!
//! let policy = FallbackPolicy::new(ResilienceConfig::from_env()?, Arc::new(FileStore::new()?))?;
//! let schools = policy.get::<Vec<School>>("/schools").await;
//! if let Some(error) = &schools.error {
//!     eprintln!("{}", error);
//! }
//! ```

mod config;
mod demo;
mod error;
mod mode;
mod policy;
mod prober;
mod resolver;
mod response;
mod retry;
mod session;

pub use config::{
    ProbeConfig, ResilienceConfig, ResilienceConfigBuilder, ResolverConfig, DEMO_MODE_KEY,
    ENV_API_BASE_PATH, ENV_API_HOST, ENV_API_SCHEME, ENV_API_URL, ENV_DEMO_WHEN_DEGRADED,
    ENV_FALLBACK_URLS, ENV_PAGE_SCHEME,
};
pub use demo::{Course, DashboardSummary, DemoCatalog, DemoSource, School, UserAccount, UserRole};
pub use error::{Error, ErrorKind, Result};
pub use mode::ModeSwitch;
pub use policy::{ConnectionStatus, FallbackPolicy};
pub use prober::{ConnectionProber, ProbeReport, ProbeResult};
pub use resolver::{CandidatePlan, ProtocolResolver};
pub use response::{ApiResponse, DataSource};
pub use retry::{BackoffStrategy, FailoverBudget, FailoverConfig};
pub use session::SessionConfig;
