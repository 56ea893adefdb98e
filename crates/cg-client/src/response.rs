//! HTTP response wrapper.

use serde::de::DeserializeOwned;

use crate::classify::sanitize_message;
use crate::error::{Error, ErrorKind, Result};

/// Wrapper around an HTTP response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response) -> Self {
        Self { inner }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.inner.status().as_u16()
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        self.inner.status().is_success()
    }

    /// Deserialize the response body as JSON.
    ///
    /// An empty body decodes as JSON `null`, so `()`/`Option<T>` targets work
    /// for `204 No Content`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.inner.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return serde_json::from_value(serde_json::Value::Null).map_err(Into::into);
        }
        serde_json::from_slice(&body).map_err(Into::into)
    }

    /// Turn a non-success response into an [`ErrorKind::Http`] error.
    pub async fn error_for_status(self) -> Result<Response> {
        if self.is_success() {
            return Ok(self);
        }
        let status = self.status();
        let body = self.inner.text().await.unwrap_or_default();
        Err(Error::new(ErrorKind::Http {
            status,
            message: error_message(status, &body),
        }))
    }
}

/// Pull a readable message out of an error body.
///
/// Backends answer with `{"message": ...}`, `{"error": ...}` or
/// `{"detail": ...}`; anything else is passed through sanitized.
fn error_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        for key in ["message", "error", "detail"] {
            match value.get(key) {
                Some(serde_json::Value::String(s)) => return sanitize_message(s),
                Some(serde_json::Value::Object(obj)) => {
                    if let Some(serde_json::Value::String(s)) = obj.get("message") {
                        return sanitize_message(s);
                    }
                }
                _ => {}
            }
        }
    }

    if body.trim().is_empty() {
        reqwest::StatusCode::from_u16(status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or("error")
            .to_string()
    } else {
        sanitize_message(body.trim())
    }
}
