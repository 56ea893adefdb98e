use std::collections::BTreeSet;
use std::sync::Arc;

use campusgate::fallback::DashboardSummary;
use campusgate::{
    ApiResponse, ConnectionStatus, DataSource, FileStore, KeyValueStore, MemoryStore, School,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{empty_store, live_schools, local_policy, mount_health};

fn field_names(record: &Value) -> BTreeSet<String> {
    record
        .as_object()
        .map(|fields| fields.keys().cloned().collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_demo_toggle_issues_no_network_calls() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&server)
        .await;

    let policy = local_policy(&server, empty_store());
    policy.set_demo_mode(true);

    let schools: ApiResponse<Vec<School>> = policy.get("/schools").await;
    let summary: ApiResponse<DashboardSummary> = policy.get("/dashboard/summary").await;
    let created: ApiResponse<Value> = policy
        .post("/schools", &json!({"name": "Pop-up Campus"}))
        .await;

    assert_eq!(schools.source, DataSource::Demo);
    assert_eq!(summary.source, DataSource::Demo);
    assert_eq!(created.source, DataSource::Demo);
    assert_eq!(created.data.unwrap()["name"], "Pop-up Campus");
    assert_eq!(policy.status(), ConnectionStatus::Demo);
}

#[tokio::test]
async fn test_demo_and_live_share_a_schema() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(live_schools()))
        .mount(&server)
        .await;

    let policy = local_policy(&server, empty_store());

    let live: ApiResponse<Vec<School>> = policy.get("/schools").await;
    assert_eq!(live.source, DataSource::Live);

    policy.set_demo_mode(true);
    let demo: ApiResponse<Vec<School>> = policy.get("/schools").await;
    assert_eq!(demo.source, DataSource::Demo);

    // Same endpoint, untyped, to compare field sets.
    policy.set_demo_mode(false);
    let live_raw: ApiResponse<Vec<Value>> = policy.get("/schools").await;
    policy.set_demo_mode(true);
    let demo_raw: ApiResponse<Vec<Value>> = policy.get("/schools").await;

    let live_fields = field_names(&live_raw.data.unwrap()[0]);
    let demo_fields = field_names(&demo_raw.data.unwrap()[0]);
    assert_eq!(live_fields, demo_fields);
}

#[tokio::test]
async fn test_toggle_mid_session_takes_effect_next_request() {
    let server = MockServer::start().await;
    mount_health(&server).await;
    Mock::given(method("GET"))
        .and(path("/api/schools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(live_schools()))
        .expect(2)
        .mount(&server)
        .await;

    let policy = local_policy(&server, empty_store());
    let mut badge = policy.subscribe_status();

    let first: ApiResponse<Vec<School>> = policy.get("/schools").await;
    assert_eq!(first.source, DataSource::Live);
    assert!(badge.borrow_and_update().is_live());

    policy.mode().set_demo(true);
    assert!(badge.has_changed().unwrap());
    assert_eq!(*badge.borrow_and_update(), ConnectionStatus::Demo);
    let second: ApiResponse<Vec<School>> = policy.get("/schools").await;
    assert_eq!(second.source, DataSource::Demo);

    policy.set_demo_mode(false);
    assert!(policy.status().is_live());
    let third: ApiResponse<Vec<School>> = policy.get("/schools").await;
    assert_eq!(third.source, DataSource::Live);
}

#[tokio::test]
async fn test_demo_flag_persists_across_sessions() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("storage.json");
    let server = MockServer::start().await;

    {
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::with_path(&path));
        let policy = local_policy(&server, store);
        policy.set_demo_mode(true);
    }

    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::with_path(&path));
    let policy = local_policy(&server, store);
    assert_eq!(policy.status(), ConnectionStatus::Demo);

    let reloaded = FileStore::with_path(&path);
    assert_eq!(
        reloaded.get("campusgate.demo_mode").unwrap(),
        Some("true".to_string())
    );
}

#[tokio::test]
async fn test_memory_store_demo_flag_is_ephemeral() {
    let server = MockServer::start().await;
    local_policy(&server, Arc::new(MemoryStore::new())).set_demo_mode(true);

    let fresh = local_policy(&server, Arc::new(MemoryStore::new()));
    assert_eq!(fresh.status(), ConnectionStatus::Probing);
}
