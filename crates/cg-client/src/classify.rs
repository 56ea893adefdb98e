//! Failure classification.
//!
//! Every transport or HTTP failure is mapped into a small closed taxonomy
//! ([`FailureKind`]) carrying a human-readable message and, where it helps,
//! remediation text. Structured information (error kind, status code) drives
//! the mapping; message inspection is a last resort confined to
//! [`kind_from_message`].

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

use crate::endpoint::{EndpointCandidate, PageContext};
use crate::error::{Error, ErrorKind};

/// Remediation offered when a secure page targets an insecure backend.
pub const MIXED_CONTENT_REMEDIATION: &str = "The page is served over HTTPS but the API endpoint \
uses plain HTTP, which browsers block as mixed content. Configure TLS on the API server, put \
an HTTPS reverse proxy in front of it, or serve the page over HTTP for local development. \
Demo mode remains available in the meantime.";

const MAX_MESSAGE_LENGTH: usize = 500;

static BEARER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)bearer\s+[A-Za-z0-9\-._~+/]+=*").expect("valid regex"));

static TOKEN_PARAM_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(token|access_token|auth_token)=[^&\s]+").expect("valid regex")
});

static MIXED_CONTENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mixed[\s_-]?content").expect("valid regex"));

static TIMEOUT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)timed?\s?out|timeout|deadline").expect("valid regex"));

static NETWORK_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)certificate|tls|ssl|handshake|dns|resolve|refused|reset|unreachable|network|connect",
    )
    .expect("valid regex")
});

/// The closed failure taxonomy surfaced to the fallback policy and the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    NetworkOrTls,
    MixedContentBlocked,
    Unauthorized,
    ServerError,
    Unknown,
}

impl FailureKind {
    /// Failures that say nothing about the request itself, only about the
    /// path to the server. These are the ones worth retrying elsewhere.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            FailureKind::Timeout | FailureKind::NetworkOrTls | FailureKind::MixedContentBlocked
        )
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::NetworkOrTls => "network or TLS failure",
            FailureKind::MixedContentBlocked => "mixed content blocked",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::ServerError => "server error",
            FailureKind::Unknown => "unknown failure",
        };
        f.write_str(label)
    }
}

/// A failure labelled with its [`FailureKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: FailureKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate: Option<EndpointCandidate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remediation: Option<String>,
}

impl ClassifiedError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            candidate: None,
            status: None,
            remediation: None,
        }
    }

    pub fn with_candidate(mut self, candidate: EndpointCandidate) -> Self {
        self.candidate = Some(candidate);
        self
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    /// The failure a secure page sees for an insecure candidate, without any
    /// network attempt having been made.
    pub fn mixed_content(candidate: &EndpointCandidate) -> Self {
        Self::new(
            FailureKind::MixedContentBlocked,
            format!(
                "Request to {} blocked: insecure endpoint from a secure page",
                candidate.base_url()
            ),
        )
        .with_candidate(candidate.clone())
        .with_remediation(MIXED_CONTENT_REMEDIATION)
    }

    /// A response body that could not be decoded into the expected shape.
    pub fn malformed(message: impl fmt::Display) -> Self {
        Self::new(
            FailureKind::Unknown,
            sanitize_message(&format!("Malformed response: {message}")),
        )
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for ClassifiedError {}

/// What the classifier knows about the failed attempt.
#[derive(Debug, Clone)]
pub struct ClassifyContext {
    pub page: PageContext,
    pub candidate: Option<EndpointCandidate>,
}

impl ClassifyContext {
    pub fn new(page: PageContext, candidate: Option<EndpointCandidate>) -> Self {
        Self { page, candidate }
    }

    fn base_url(&self) -> String {
        self.candidate
            .as_ref()
            .map(|c| c.base_url())
            .unwrap_or_else(|| "<unresolved endpoint>".to_string())
    }

    fn is_mixed_content(&self) -> bool {
        self.candidate
            .as_ref()
            .is_some_and(|c| self.page.blocks(c))
    }
}

/// Map a transport error into the failure taxonomy. Pure.
pub fn classify(error: &Error, ctx: &ClassifyContext) -> ClassifiedError {
    let base_url = ctx.base_url();

    let classified = match &error.kind {
        ErrorKind::Timeout => ClassifiedError::new(
            FailureKind::Timeout,
            format!(
                "Request to {base_url} timed out; the server may be slow rather than down"
            ),
        ),
        ErrorKind::InsecureTarget(_) => return mixed_content_for(ctx, &base_url),
        ErrorKind::Connection(detail) | ErrorKind::Tls(detail) => {
            if ctx.is_mixed_content() {
                return mixed_content_for(ctx, &base_url);
            }
            network_failure(&base_url, detail)
        }
        ErrorKind::Http { status, message } => classify_status(*status, message, &base_url),
        ErrorKind::Json(detail) => ClassifiedError::malformed(detail),
        ErrorKind::InvalidUrl(detail) | ErrorKind::Config(detail) | ErrorKind::Other(detail) => {
            match kind_from_message(detail) {
                Some(FailureKind::Timeout) => ClassifiedError::new(
                    FailureKind::Timeout,
                    format!(
                        "Request to {base_url} timed out; the server may be slow rather than down"
                    ),
                ),
                Some(FailureKind::MixedContentBlocked) => {
                    return mixed_content_for(ctx, &base_url)
                }
                Some(FailureKind::NetworkOrTls) if ctx.is_mixed_content() => {
                    return mixed_content_for(ctx, &base_url)
                }
                Some(FailureKind::NetworkOrTls) => network_failure(&base_url, detail),
                _ => ClassifiedError::new(FailureKind::Unknown, sanitize_message(detail)),
            }
        }
    };

    match &ctx.candidate {
        Some(candidate) => classified.with_candidate(candidate.clone()),
        None => classified,
    }
}

fn mixed_content_for(ctx: &ClassifyContext, base_url: &str) -> ClassifiedError {
    match &ctx.candidate {
        Some(candidate) => ClassifiedError::mixed_content(candidate),
        None => ClassifiedError::new(
            FailureKind::MixedContentBlocked,
            format!("Request to {base_url} blocked: insecure endpoint from a secure page"),
        )
        .with_remediation(MIXED_CONTENT_REMEDIATION),
    }
}

fn network_failure(base_url: &str, detail: &str) -> ClassifiedError {
    ClassifiedError::new(
        FailureKind::NetworkOrTls,
        format!(
            "Could not reach {base_url}: {}",
            sanitize_message(detail)
        ),
    )
}

fn classify_status(status: u16, message: &str, base_url: &str) -> ClassifiedError {
    let kind = match status {
        401 | 403 => FailureKind::Unauthorized,
        500..=599 => FailureKind::ServerError,
        _ => FailureKind::Unknown,
    };
    let message = match kind {
        FailureKind::Unauthorized => format!(
            "{base_url} rejected the credential (HTTP {status}): {}",
            sanitize_message(message)
        ),
        FailureKind::ServerError => format!(
            "{base_url} failed with HTTP {status}: {}",
            sanitize_message(message)
        ),
        _ => sanitize_message(message),
    };
    ClassifiedError::new(kind, message).with_status(status)
}

/// Last-resort heuristic for errors that carry no structured signal.
fn kind_from_message(message: &str) -> Option<FailureKind> {
    if MIXED_CONTENT_PATTERN.is_match(message) {
        Some(FailureKind::MixedContentBlocked)
    } else if TIMEOUT_PATTERN.is_match(message) {
        Some(FailureKind::Timeout)
    } else if NETWORK_PATTERN.is_match(message) {
        Some(FailureKind::NetworkOrTls)
    } else {
        None
    }
}

/// Strip credentials from a diagnostic and cap its length.
pub fn sanitize_message(message: &str) -> String {
    let mut sanitized = BEARER_PATTERN
        .replace_all(message, "Bearer [REDACTED]")
        .to_string();
    sanitized = TOKEN_PARAM_PATTERN
        .replace_all(&sanitized, "$1=[REDACTED]")
        .to_string();

    if sanitized.len() > MAX_MESSAGE_LENGTH {
        let mut cut = MAX_MESSAGE_LENGTH;
        while !sanitized.is_char_boundary(cut) {
            cut -= 1;
        }
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
