use campusgate::fallback::ResolverConfig;
use campusgate::{
    ApiClient, ApiResponse, ConnectionStatus, DataSource, EndpointCandidate, FailureKind,
    FallbackPolicy, PageContext, School,
};
use serde_json::Value;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{api_url, config, empty_store};

/// A server that fails the test if anything reaches it.
async fn untouchable_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn test_insecure_override_from_secure_page_degrades_without_network() {
    let server = untouchable_server().await;

    let resolver = ResolverConfig::default().with_override(api_url(&server));
    let policy =
        FallbackPolicy::new(config(resolver, PageContext::secure()), empty_store()).unwrap();

    let status = policy.connect().await;
    match &status {
        ConnectionStatus::Degraded {
            error,
            demo_available,
        } => {
            assert_eq!(error.kind, FailureKind::MixedContentBlocked);
            assert!(error.remediation.is_some());
            assert!(*demo_available);
        }
        other => panic!("expected degraded status, got {other:?}"),
    }

    let plan = policy.plan().unwrap();
    assert!(plan.is_override());
    assert!(plan.demo_fallback());

    let response: ApiResponse<Value> = policy.get("/schools").await;
    assert_eq!(
        response.error.unwrap().kind,
        FailureKind::MixedContentBlocked
    );

    // The offered way out.
    policy.set_demo_mode(true);
    let demo: ApiResponse<Vec<School>> = policy.get("/schools").await;
    assert!(demo.success);
    assert_eq!(demo.source, DataSource::Demo);
}

#[tokio::test]
async fn test_secure_page_tries_secure_variant_first() {
    let server = untouchable_server().await;

    // The mock server speaks plain HTTP, so the secure variant fails at the
    // TLS handshake and the insecure original is never contacted.
    let resolver = ResolverConfig::target(&api_url(&server)).unwrap();
    let policy =
        FallbackPolicy::new(config(resolver, PageContext::secure()), empty_store()).unwrap();

    let status = policy.connect().await;
    assert!(status.is_degraded());
    assert_eq!(status.error().unwrap().kind, FailureKind::MixedContentBlocked);

    let plan = policy.plan().unwrap();
    assert!(plan.candidates()[0].scheme().is_secure());
    assert!(plan.is_blocked(&plan.candidates()[1]));
}

#[tokio::test]
async fn test_request_client_refuses_mixed_content() {
    let server = untouchable_server().await;

    let client = ApiClient::new(
        EndpointCandidate::parse(&api_url(&server)).unwrap(),
        PageContext::secure(),
    )
    .unwrap();
    let error = client.get_json::<Value>("/schools").await.unwrap_err();

    assert_eq!(error.kind, FailureKind::MixedContentBlocked);
    assert!(error.message.contains(&api_url(&server)));
}
