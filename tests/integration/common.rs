use std::sync::Arc;
use std::time::Duration;

use campusgate::fallback::{BackoffStrategy, FailoverConfig, ResolverConfig};
use campusgate::{
    ClientConfig, FallbackPolicy, KeyValueStore, MemoryStore, PageContext, ProbeConfig,
    ResilienceConfig,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Request timeout used throughout the suite; stands in for 30 s.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(300);

/// Delay that outlasts [`REQUEST_TIMEOUT`]; stands in for a 40 s response.
pub const SLOW_RESPONSE: Duration = Duration::from_millis(1500);

/// Base URL of the API on a mock server.
pub fn api_url(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

/// Scaled-down configuration for `resolver` seen from `page`.
pub fn config(resolver: ResolverConfig, page: PageContext) -> ResilienceConfig {
    ResilienceConfig::builder()
        .with_page(page)
        .with_resolver(resolver)
        .with_client(ClientConfig::builder().with_timeout(REQUEST_TIMEOUT).build())
        .with_probe(ProbeConfig::default().with_timeout(REQUEST_TIMEOUT))
        .with_failover(
            FailoverConfig::default()
                .with_backoff(BackoffStrategy::Constant)
                .with_initial_delay(Duration::from_millis(1)),
        )
        .build()
}

/// A policy targeting `server` from an insecure (local development) page.
pub fn local_policy(server: &MockServer, store: Arc<dyn KeyValueStore>) -> FallbackPolicy {
    let resolver = ResolverConfig::target(&api_url(server)).expect("valid mock server URL");
    FallbackPolicy::new(config(resolver, PageContext::insecure()), store)
        .expect("policy construction")
}

pub fn empty_store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

/// Answer the health probe with 200.
pub async fn mount_health(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

/// A school listing as the real backend serves it.
pub fn live_schools() -> Value {
    json!([
        {
            "id": "31",
            "name": "Westbrook Primary",
            "district": "Lakes Region",
            "city": "Westbrook",
            "studentCount": 287,
            "active": true
        },
        {
            "id": "32",
            "name": "Eastgate Secondary",
            "district": "Lakes Region",
            "city": "Eastgate",
            "studentCount": 941,
            "active": false
        }
    ])
}
