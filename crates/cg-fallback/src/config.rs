//! Configuration for resolution, probing and failover.

use std::time::Duration;

use campusgate_client::{
    ClientConfig, EndpointCandidate, PageContext, Scheme, DEFAULT_PROBE_TIMEOUT,
};

use crate::error::{Error, ErrorKind, Result};
use crate::retry::FailoverConfig;

/// Environment variable holding an explicit base URL override.
pub const ENV_API_URL: &str = "CAMPUSGATE_API_URL";
/// Environment variable holding the target host (with optional port).
pub const ENV_API_HOST: &str = "CAMPUSGATE_API_HOST";
/// Environment variable holding the target's configured scheme.
pub const ENV_API_SCHEME: &str = "CAMPUSGATE_API_SCHEME";
/// Environment variable holding the API base path.
pub const ENV_API_BASE_PATH: &str = "CAMPUSGATE_API_BASE_PATH";
/// Environment variable holding comma-separated secondary base URLs.
pub const ENV_FALLBACK_URLS: &str = "CAMPUSGATE_FALLBACK_URLS";
/// Environment variable holding the scheme the page is served over.
pub const ENV_PAGE_SCHEME: &str = "CAMPUSGATE_PAGE_SCHEME";
/// Environment variable enabling demo data while degraded.
pub const ENV_DEMO_WHEN_DEGRADED: &str = "CAMPUSGATE_DEMO_WHEN_DEGRADED";

/// Storage key of the persisted demo-mode flag.
pub const DEMO_MODE_KEY: &str = "campusgate.demo_mode";

/// Where the backend is expected to live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Host, optionally with port.
    pub host: String,
    /// Scheme the target is configured with.
    pub scheme: Scheme,
    /// Path prefix of the API.
    pub base_path: String,
    /// Explicit base URL; skips negotiation entirely.
    pub override_url: Option<String>,
    /// Secondary base URLs, tried after the primary target.
    pub fallback_urls: Vec<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            host: "localhost:8000".to_string(),
            scheme: Scheme::Http,
            base_path: "/api".to_string(),
            override_url: None,
            fallback_urls: Vec::new(),
        }
    }
}

impl ResolverConfig {
    /// Configure the primary target from a full base URL.
    pub fn target(base_url: &str) -> Result<Self> {
        let candidate = EndpointCandidate::parse(base_url)?;
        Ok(Self {
            host: candidate.host().to_string(),
            scheme: candidate.scheme(),
            base_path: candidate.base_path().to_string(),
            ..Default::default()
        })
    }

    pub fn with_override(mut self, url: impl Into<String>) -> Self {
        self.override_url = Some(url.into());
        self
    }

    pub fn with_fallback_url(mut self, url: impl Into<String>) -> Self {
        self.fallback_urls.push(url.into());
        self
    }

    /// The primary target as configured.
    pub fn primary(&self) -> EndpointCandidate {
        EndpointCandidate::new(self.scheme, self.host.clone(), self.base_path.clone())
    }
}

/// Reachability probe settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeConfig {
    /// Per-attempt timeout, independent of the request timeout.
    pub timeout: Duration,
    /// Path probed under each candidate's base URL.
    pub health_path: String,
    /// Probe every candidate instead of stopping at the first success.
    pub exhaustive: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_PROBE_TIMEOUT,
            health_path: "/health".to_string(),
            exhaustive: false,
        }
    }
}

impl ProbeConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_health_path(mut self, path: impl Into<String>) -> Self {
        self.health_path = path.into();
        self
    }

    pub fn exhaustive(mut self, exhaustive: bool) -> Self {
        self.exhaustive = exhaustive;
        self
    }
}

/// Everything the fallback policy needs to know at startup.
#[derive(Debug, Clone)]
pub struct ResilienceConfig {
    pub page: PageContext,
    pub resolver: ResolverConfig,
    pub client: ClientConfig,
    pub probe: ProbeConfig,
    pub failover: FailoverConfig,
    /// Serve demo data (flagged as such) while degraded instead of failing.
    pub serve_demo_when_degraded: bool,
    /// Storage key of the demo-mode flag.
    pub demo_mode_key: String,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        Self {
            page: PageContext::default(),
            resolver: ResolverConfig::default(),
            client: ClientConfig::default(),
            probe: ProbeConfig::default(),
            failover: FailoverConfig::default(),
            serve_demo_when_degraded: false,
            demo_mode_key: DEMO_MODE_KEY.to_string(),
        }
    }
}

impl ResilienceConfig {
    /// Create a builder.
    pub fn builder() -> ResilienceConfigBuilder {
        ResilienceConfigBuilder::default()
    }

    /// Read configuration from `CAMPUSGATE_*` environment variables.
    ///
    /// Unset variables keep their defaults; set but unusable ones are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(scheme) = var(ENV_PAGE_SCHEME) {
            config.page = PageContext {
                scheme: parse_scheme(ENV_PAGE_SCHEME, &scheme)?,
            };
        }
        if let Some(host) = var(ENV_API_HOST) {
            config.resolver.host = host;
        }
        if let Some(scheme) = var(ENV_API_SCHEME) {
            config.resolver.scheme = parse_scheme(ENV_API_SCHEME, &scheme)?;
        }
        if let Some(base_path) = var(ENV_API_BASE_PATH) {
            config.resolver.base_path = base_path;
        }
        if let Some(url) = var(ENV_API_URL) {
            EndpointCandidate::parse(&url).map_err(|e| env_error(ENV_API_URL, e))?;
            config.resolver.override_url = Some(url);
        }
        if let Some(urls) = var(ENV_FALLBACK_URLS) {
            for url in urls.split(',').map(str::trim).filter(|u| !u.is_empty()) {
                EndpointCandidate::parse(url).map_err(|e| env_error(ENV_FALLBACK_URLS, e))?;
                config.resolver.fallback_urls.push(url.to_string());
            }
        }
        if let Some(flag) = var(ENV_DEMO_WHEN_DEGRADED) {
            config.serve_demo_when_degraded = parse_flag(&flag).ok_or_else(|| {
                Error::new(ErrorKind::EnvVar {
                    name: ENV_DEMO_WHEN_DEGRADED.to_string(),
                    message: format!("expected true or false, got '{flag}'"),
                })
            })?;
        }

        Ok(config)
    }
}

/// Builder for [`ResilienceConfig`].
#[derive(Debug, Default)]
pub struct ResilienceConfigBuilder {
    config: ResilienceConfig,
}

impl ResilienceConfigBuilder {
    /// Set the transport of the calling page.
    pub fn with_page(mut self, page: PageContext) -> Self {
        self.config.page = page;
        self
    }

    pub fn with_resolver(mut self, resolver: ResolverConfig) -> Self {
        self.config.resolver = resolver;
        self
    }

    /// Set the HTTP configuration for API requests.
    pub fn with_client(mut self, client: ClientConfig) -> Self {
        self.config.client = client;
        self
    }

    pub fn with_probe(mut self, probe: ProbeConfig) -> Self {
        self.config.probe = probe;
        self
    }

    pub fn with_failover(mut self, failover: FailoverConfig) -> Self {
        self.config.failover = failover;
        self
    }

    pub fn serve_demo_when_degraded(mut self, enabled: bool) -> Self {
        self.config.serve_demo_when_degraded = enabled;
        self
    }

    pub fn with_demo_mode_key(mut self, key: impl Into<String>) -> Self {
        self.config.demo_mode_key = key.into();
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ResilienceConfig {
        self.config
    }
}

pub(crate) fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_scheme(name: &str, value: &str) -> Result<Scheme> {
    value
        .to_ascii_lowercase()
        .parse()
        .map_err(|e| env_error(name, e))
}

fn env_error(name: &str, err: campusgate_client::Error) -> Error {
    let message = err.kind.to_string();
    Error::with_source(
        ErrorKind::EnvVar {
            name: name.to_string(),
            message,
        },
        err,
    )
}
