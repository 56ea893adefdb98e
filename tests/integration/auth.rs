use std::sync::Arc;

use campusgate::{ApiResponse, FailureKind, FileStore, KeyValueStore, MemoryStore};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{header, header_exists, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{local_policy, mount_health};

#[tokio::test]
async fn test_missing_credential_does_not_block_public_endpoints() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let policy = local_policy(&server, Arc::new(MemoryStore::new()));
    let response: ApiResponse<Vec<Value>> = policy.get("/schools").await;

    assert!(response.success);
    assert!(!policy.auth().last_request_authenticated());
}

#[tokio::test]
async fn test_missing_credential_is_unauthorized_only_on_401() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header_exists("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"message": "Bearer token required"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let policy = local_policy(&server, Arc::new(MemoryStore::new()));
    let response: ApiResponse<Vec<Value>> = policy.get("/users").await;

    let error = response.error.unwrap();
    assert_eq!(error.kind, FailureKind::Unauthorized);
    assert_eq!(error.status, Some(401));
    assert!(policy.status().is_live());
}

#[tokio::test]
async fn test_token_written_after_login_is_used_next_request() {
    let temp_dir = TempDir::new().unwrap();
    let path_on_disk = temp_dir.path().join("storage.json");
    let server = MockServer::start().await;
    mount_health(&server).await;

    Mock::given(method("GET"))
        .and(path("/api/users"))
        .and(header("authorization", "Bearer fresh-login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "11"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/users"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::with_path(&path_on_disk));
    let policy = local_policy(&server, store);

    let before: ApiResponse<Vec<Value>> = policy.get("/users").await;
    assert_eq!(before.error.unwrap().kind, FailureKind::Unauthorized);

    // The login flow writes through its own handle to the same file.
    FileStore::with_path(&path_on_disk)
        .set("auth_token", "fresh-login")
        .unwrap();

    let after: ApiResponse<Vec<Value>> = policy.get("/users").await;
    assert!(after.success);
    assert!(policy.auth().last_request_authenticated());
}

#[tokio::test]
async fn test_legacy_key_is_honoured() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("DELETE"))
        .and(path("/api/courses/101"))
        .and(header("authorization", "Bearer legacy"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let store = Arc::new(MemoryStore::with_entries([("access_token", "legacy")]));
    let policy = local_policy(&server, store);
    let response: ApiResponse<()> = policy.delete("/courses/101").await;

    assert!(response.success);
}
