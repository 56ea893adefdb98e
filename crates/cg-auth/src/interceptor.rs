//! Bearer-token injection.

use std::sync::atomic::{AtomicBool, Ordering};

use campusgate_client::{RequestBuilder, RequestInterceptor};
use tracing::warn;

use crate::credentials::CredentialSource;

/// Attaches `Authorization: Bearer <token>` to every outbound request that
/// does not already carry a credential. A credential set by the caller wins.
///
/// A missing token is not a failure: the request goes out unauthenticated
/// (some endpoints are public) and a warning is logged.
#[derive(Debug)]
pub struct AuthInterceptor {
    source: CredentialSource,
    last_authenticated: AtomicBool,
}

impl AuthInterceptor {
    pub fn new(source: CredentialSource) -> Self {
        Self {
            source,
            last_authenticated: AtomicBool::new(false),
        }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    /// Whether the request intercepted most recently carried a credential.
    ///
    /// This is one flag shared by every request through this interceptor, so
    /// with requests in flight concurrently it reflects whichever ran its
    /// interceptor last. For a specific request, check
    /// [`RequestBuilder::has_bearer`] after interception.
    pub fn last_request_authenticated(&self) -> bool {
        self.last_authenticated.load(Ordering::SeqCst)
    }
}

impl RequestInterceptor for AuthInterceptor {
    fn intercept(&self, request: &mut RequestBuilder) {
        if request.has_bearer() {
            self.last_authenticated.store(true, Ordering::SeqCst);
            return;
        }

        match self.source.token() {
            Some(token) => {
                request.set_bearer(token.as_str());
                self.last_authenticated.store(true, Ordering::SeqCst);
            }
            None => {
                self.last_authenticated.store(false, Ordering::SeqCst);
                warn!(
                    request_id = %request.id(),
                    url = %request.url(),
                    "No credential found in storage; sending request unauthenticated"
                );
            }
        }
    }
}
