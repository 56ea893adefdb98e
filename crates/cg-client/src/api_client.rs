//! Request client bound to one resolved endpoint.
//!
//! `ApiClient` combines an [`HttpClient`] with a base URL, the calling
//! page's transport and an interceptor chain. Its boundary is the point
//! where raw transport errors stop: everything it returns on failure is a
//! [`ClassifiedError`].
//!
//! ```text
//!   outbound:  caller interceptors (auth) ─▶ LoggingInterceptor ─▶ HttpClient
//!   inbound:   2xx ─▶ pass-through
//!              otherwise ─▶ classify() ─▶ ClassifiedError
//! ```

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use tracing::{instrument, warn};

use crate::classify::{classify, ClassifiedError, ClassifyContext};
use crate::client::HttpClient;
use crate::config::ClientConfig;
use crate::endpoint::{EndpointCandidate, PageContext};
use crate::error::{Error, ErrorKind, Result};
use crate::interceptor::{LoggingInterceptor, RequestInterceptor};
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::Response;

/// HTTP client bound to a single endpoint candidate.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: HttpClient,
    candidate: EndpointCandidate,
    page: PageContext,
    interceptors: Vec<Arc<dyn RequestInterceptor>>,
}

impl ApiClient {
    /// Create a client for `candidate` as seen from `page`.
    pub fn new(candidate: EndpointCandidate, page: PageContext) -> Result<Self> {
        Self::with_config(candidate, page, ClientConfig::default())
    }

    /// Create a client with custom HTTP configuration.
    pub fn with_config(
        candidate: EndpointCandidate,
        page: PageContext,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self::from_http(HttpClient::new(config)?, candidate, page))
    }

    /// Bind an existing transport to `candidate`.
    pub fn from_http(http: HttpClient, candidate: EndpointCandidate, page: PageContext) -> Self {
        Self {
            http,
            candidate,
            page,
            interceptors: vec![Arc::new(LoggingInterceptor)],
        }
    }

    /// Register an interceptor. It runs after previously registered ones and
    /// before the built-in logging interceptor.
    pub fn with_interceptor(mut self, interceptor: Arc<dyn RequestInterceptor>) -> Self {
        let at = self.interceptors.len().saturating_sub(1);
        self.interceptors.insert(at, interceptor);
        self
    }

    pub fn candidate(&self) -> &EndpointCandidate {
        &self.candidate
    }

    pub fn page(&self) -> PageContext {
        self.page
    }

    /// Get the base URL.
    pub fn base_url(&self) -> String {
        self.candidate.base_url()
    }

    /// Build the full URL for a path.
    pub fn url(&self, path: &str) -> String {
        self.candidate.url_for(path)
    }

    /// Create a request builder for `path` under the base URL.
    pub fn request(&self, method: RequestMethod, path: &str) -> RequestBuilder {
        RequestBuilder::new(method, self.url(path))
    }

    fn context(&self) -> ClassifyContext {
        ClassifyContext::new(self.page, Some(self.candidate.clone()))
    }

    /// Run interceptors, send once and classify any failure.
    pub async fn execute(
        &self,
        mut request: RequestBuilder,
    ) -> std::result::Result<Response, ClassifiedError> {
        if self.page.blocks(&self.candidate) {
            let err = Error::new(ErrorKind::InsecureTarget(self.base_url()));
            warn!(
                request_id = %request.id(),
                url = %request.url(),
                "Refusing insecure request from secure page"
            );
            return Err(classify(&err, &self.context()));
        }

        for interceptor in &self.interceptors {
            interceptor.intercept(&mut request);
        }

        let request_id = request.id();
        self.http.execute(request).await.map_err(|err| {
            let classified = classify(&err, &self.context());
            warn!(
                request_id = %request_id,
                kind = %classified.kind,
                error = %classified.message,
                "Request failed"
            );
            classified
        })
    }

    /// Send a JSON request to `path` and decode the JSON response.
    #[instrument(skip(self, body), fields(base_url = %self.candidate))]
    pub async fn send_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
    ) -> std::result::Result<T, ClassifiedError> {
        let mut request = self.request(method, path);
        if let Some(body) = body {
            request = request
                .json(body)
                .map_err(|e| ClassifiedError::malformed(format!("request body: {e}")))?;
        }

        let response = self.execute(request).await?;
        response
            .json()
            .await
            .map_err(|err| classify(&err, &self.context()))
    }

    /// GET request with JSON response deserialization.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
    ) -> std::result::Result<T, ClassifiedError> {
        self.send_json::<T, ()>(RequestMethod::Get, path, None).await
    }

    /// POST request with JSON body and response.
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> std::result::Result<T, ClassifiedError> {
        self.send_json(RequestMethod::Post, path, Some(body)).await
    }
}
