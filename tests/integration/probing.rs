use campusgate::fallback::ResolverConfig;
use campusgate::{
    ApiResponse, ConnectionStatus, DataSource, FailureKind, FallbackPolicy, PageContext, School,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{api_url, config, empty_store, live_schools, mount_health, SLOW_RESPONSE};

#[tokio::test]
async fn test_slow_first_candidate_then_second_is_live() {
    let slow = MockServer::start().await;
    let healthy = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(SLOW_RESPONSE))
        .expect(1)
        .mount(&slow)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&healthy)
        .await;

    let resolver = ResolverConfig::target(&api_url(&slow))
        .unwrap()
        .with_fallback_url(api_url(&healthy));
    let policy =
        FallbackPolicy::new(config(resolver, PageContext::insecure()), empty_store()).unwrap();

    let status = policy.connect().await;
    match status {
        ConnectionStatus::Live { candidate } => assert_eq!(candidate.base_url(), api_url(&healthy)),
        other => panic!("expected live status, got {other:?}"),
    }
    assert_eq!(
        policy.prober().last_known_good().map(|c| c.base_url()),
        Some(api_url(&healthy))
    );
}

#[tokio::test]
async fn test_live_request_after_probe() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(live_schools()))
        .expect(1)
        .mount(&server)
        .await;

    let policy = crate::common::local_policy(&server, empty_store());
    let response: ApiResponse<Vec<School>> = policy.get("/schools").await;

    assert!(response.success);
    assert_eq!(response.source, DataSource::Live);
    assert_eq!(response.data.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_backend_degrades_with_reason() {
    // Port 9 (discard) is not listening.
    let resolver = ResolverConfig::target("http://127.0.0.1:9/api").unwrap();
    let policy =
        FallbackPolicy::new(config(resolver, PageContext::insecure()), empty_store()).unwrap();

    let status = policy.connect().await;
    assert!(status.is_degraded());
    assert_eq!(status.error().unwrap().kind, FailureKind::NetworkOrTls);

    let plan = policy.plan().unwrap();
    assert_eq!(plan.len(), 2);
    assert!(!plan.is_override());
}
