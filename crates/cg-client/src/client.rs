//! Raw HTTP transport.
//!
//! `HttpClient` owns the connection pool and timeout policy and does exactly
//! one attempt per call. Retrying and failover are decided further up.

use std::time::Instant;

use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::{Error, ErrorKind, Result};
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::Response;

/// HTTP client with a fixed timeout and default JSON headers.
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
    config: ClientConfig,
}

impl HttpClient {
    /// Create a new HTTP client with the given configuration.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let builder = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(config.accept_compressed)
            .deflate(config.accept_compressed);

        let inner = builder
            .build()
            .map_err(|e| Error::with_source(ErrorKind::Config(e.to_string()), e))?;

        Ok(Self { inner, config })
    }

    /// Create a new HTTP client with default configuration.
    pub fn default_client() -> Result<Self> {
        Self::new(ClientConfig::default())
    }

    /// Get the client configuration.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a GET request builder.
    pub fn get(&self, url: impl Into<String>) -> RequestBuilder {
        RequestBuilder::new(RequestMethod::Get, url)
    }

    /// Send a request once. Non-success statuses come back as
    /// [`ErrorKind::Http`].
    pub async fn execute(&self, mut request: RequestBuilder) -> Result<Response> {
        for (name, value) in &self.config.default_headers {
            request.default_header(name, value);
        }

        let url = request_url(&request)?;
        let mut req = self
            .inner
            .request(request.method.to_reqwest(), url)
            .header("X-Request-Id", request.id.to_string());

        if let Some(ref token) = request.bearer_token {
            req = req.bearer_auth(token);
        }

        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        if let Some(ref body) = request.body {
            req = req.body(serde_json::to_vec(body)?);
        }

        let started = Instant::now();
        let response = req.send().await?;

        if self.config.enable_tracing {
            let status = response.status().as_u16();
            let elapsed_ms = started.elapsed().as_millis() as u64;

            if response.status().is_success() {
                debug!(request_id = %request.id, status, elapsed_ms, "Response received");
            } else {
                info!(request_id = %request.id, status, elapsed_ms, "Non-success response");
            }
        }

        Response::new(response).error_for_status().await
    }

    /// Send a request and deserialize the JSON response.
    pub async fn send_json<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T> {
        let response = self.execute(request).await?;
        response.json().await
    }
}

/// Parse the request URL and append its query parameters.
fn request_url(request: &RequestBuilder) -> Result<url::Url> {
    let mut url = url::Url::parse(&request.url)?;
    if !request.query_params.is_empty() {
        url.query_pairs_mut().extend_pairs(
            request
                .query_params
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
    }
    Ok(url)
}
