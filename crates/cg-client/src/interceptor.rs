//! Request interception.
//!
//! Interceptors run in registration order on every outbound request. The
//! [`ApiClient`](crate::ApiClient) registers caller-supplied interceptors
//! (auth injection) first and always appends [`LoggingInterceptor`] last, so
//! the log line reflects the request exactly as it goes on the wire.

use std::fmt::Debug;

use tracing::debug;

use crate::request::RequestBuilder;

/// A hook that may amend a request before it is sent.
///
/// Interceptors must not fail: anything they cannot do (a missing
/// credential, say) is logged and the request proceeds.
pub trait RequestInterceptor: Send + Sync + Debug {
    /// Amend the outbound request in place.
    fn intercept(&self, request: &mut RequestBuilder);
}

/// Logs every outbound request with its resolved absolute URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

impl RequestInterceptor for LoggingInterceptor {
    fn intercept(&self, request: &mut RequestBuilder) {
        debug!(
            request_id = %request.id(),
            method = %request.method(),
            url = %request.url(),
            authenticated = request.has_bearer(),
            "Sending request"
        );
    }
}
