use campusgate::fallback::ResolverConfig;
use campusgate::{
    ApiResponse, ConnectionStatus, DataSource, FailureKind, FallbackPolicy, PageContext,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{api_url, config, empty_store, live_schools, mount_health, SLOW_RESPONSE};

async fn mount_slow_schools(server: &MockServer, expected: u64) {
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(live_schools())
                .set_delay(SLOW_RESPONSE),
        )
        .expect(expected)
        .mount(server)
        .await;
}

fn policy_with_backup(primary: &MockServer, backup: &MockServer) -> FallbackPolicy {
    let resolver = ResolverConfig::target(&api_url(primary))
        .unwrap()
        .with_fallback_url(api_url(backup));
    FallbackPolicy::new(config(resolver, PageContext::insecure()), empty_store()).unwrap()
}

#[tokio::test]
async fn test_slow_server_retries_once_then_degrades() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_health(&primary).await;
    mount_slow_schools(&primary, 1).await;
    mount_slow_schools(&backup, 1).await;

    let policy = policy_with_backup(&primary, &backup);
    let response: ApiResponse<Value> = policy.get("/schools").await;

    assert!(!response.success);
    let error = response.error.unwrap();
    assert_eq!(error.kind, FailureKind::Timeout);
    assert!(error.message.contains("server may be slow"));

    let status = policy.status();
    assert!(status.is_degraded());
    assert_eq!(status.error().unwrap().kind, FailureKind::Timeout);
}

#[tokio::test]
async fn test_degraded_policy_stops_calling_out() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_health(&primary).await;
    mount_slow_schools(&primary, 1).await;
    mount_slow_schools(&backup, 1).await;

    let policy = policy_with_backup(&primary, &backup);
    let _: ApiResponse<Value> = policy.get("/schools").await;
    let again: ApiResponse<Value> = policy.get("/schools").await;

    assert_eq!(again.source, DataSource::None);
    assert_eq!(again.error.unwrap().kind, FailureKind::Timeout);
}

#[tokio::test]
async fn test_server_error_is_not_a_failover_trigger() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_health(&primary).await;
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&backup)
        .await;

    let policy = policy_with_backup(&primary, &backup);
    let response: ApiResponse<Value> = policy.get("/schools").await;

    let error = response.error.unwrap();
    assert_eq!(error.kind, FailureKind::ServerError);
    assert_eq!(error.status, Some(500));
    assert!(policy.status().is_live());
}

#[tokio::test]
async fn test_failover_rebinds_and_retry_starts_from_backup() {
    let primary = MockServer::start().await;
    let backup = MockServer::start().await;
    mount_health(&primary).await;
    mount_slow_schools(&primary, 1).await;
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(live_schools()))
        .expect(1)
        .mount(&backup)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&backup)
        .await;

    let policy = policy_with_backup(&primary, &backup);
    let response: ApiResponse<Value> = policy.get("/schools").await;
    assert!(response.success);

    match policy.status() {
        ConnectionStatus::Live { candidate } => {
            assert_eq!(candidate.base_url(), api_url(&backup))
        }
        other => panic!("expected live status, got {other:?}"),
    }
    assert_eq!(policy.session().unwrap().base_url, api_url(&backup));

    // The endpoint that just served live traffic is probed first.
    match policy.retry_connection().await {
        ConnectionStatus::Live { candidate } => {
            assert_eq!(candidate.base_url(), api_url(&backup))
        }
        other => panic!("expected live status, got {other:?}"),
    }
}
