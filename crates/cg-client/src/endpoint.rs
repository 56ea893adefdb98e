//! Endpoint candidates and the calling page's transport context.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, ErrorKind, Result};

/// Transport scheme of a page or an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    /// Returns true for the TLS-protected transport.
    pub fn is_secure(&self) -> bool {
        matches!(self, Scheme::Https)
    }

    /// The scheme as it appears in a URL.
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    /// The other transport.
    pub fn flipped(&self) -> Scheme {
        match self {
            Scheme::Http => Scheme::Https,
            Scheme::Https => Scheme::Http,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_end_matches(':').to_ascii_lowercase().as_str() {
            "http" => Ok(Scheme::Http),
            "https" => Ok(Scheme::Https),
            other => Err(Error::new(ErrorKind::InvalidUrl(format!(
                "unsupported scheme '{other}'"
            )))),
        }
    }
}

/// The transport the calling page itself was served over.
///
/// Browsers refuse requests from a secure page to an insecure endpoint
/// ("mixed content"); the page context is what lets the resolver, the prober
/// and the classifier reason about that rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContext {
    pub scheme: Scheme,
}

impl PageContext {
    /// A page served over HTTPS.
    pub fn secure() -> Self {
        Self {
            scheme: Scheme::Https,
        }
    }

    /// A page served over plain HTTP (typical for local development).
    pub fn insecure() -> Self {
        Self {
            scheme: Scheme::Http,
        }
    }

    /// Returns true if the page is served over HTTPS.
    pub fn is_secure(&self) -> bool {
        self.scheme.is_secure()
    }

    /// Returns true if a request from this page to `candidate` would be
    /// blocked as mixed content.
    pub fn blocks(&self, candidate: &EndpointCandidate) -> bool {
        self.is_secure() && !candidate.scheme().is_secure()
    }
}

impl Default for PageContext {
    fn default() -> Self {
        Self::secure()
    }
}

/// One possible backend location.
///
/// Candidates are immutable once built; the resolver ranks them and the
/// prober tests them, nobody edits them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EndpointCandidate {
    scheme: Scheme,
    host: String,
    base_path: String,
}

impl EndpointCandidate {
    /// Create a candidate. `host` may carry a port (`localhost:8080`).
    pub fn new(scheme: Scheme, host: impl Into<String>, base_path: impl Into<String>) -> Self {
        Self {
            scheme,
            host: host.into().trim_end_matches('/').to_string(),
            base_path: normalize_base_path(&base_path.into()),
        }
    }

    /// Parse a full base URL such as `https://api.example.edu/api`.
    pub fn parse(base_url: &str) -> Result<Self> {
        let url = Url::parse(base_url)?;
        let scheme: Scheme = url.scheme().parse()?;
        let host = url.host_str().ok_or_else(|| {
            Error::new(ErrorKind::InvalidUrl(format!("no host in '{base_url}'")))
        })?;
        let host = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        Ok(Self::new(scheme, host, url.path()))
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// The same host and path over a different transport.
    pub fn with_scheme(&self, scheme: Scheme) -> Self {
        Self {
            scheme,
            host: self.host.clone(),
            base_path: self.base_path.clone(),
        }
    }

    /// Render the base URL, without a trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}{}", self.scheme, self.host, self.base_path)
    }

    /// Join a request path onto the base URL.
    ///
    /// Absolute URLs are passed through unchanged.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        if path.is_empty() {
            return self.base_url();
        }
        let path = path.trim_start_matches('/');
        format!("{}/{}", self.base_url(), path)
    }
}

impl fmt::Display for EndpointCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_url())
    }
}

fn normalize_base_path(path: &str) -> String {
    let trimmed = path.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}
