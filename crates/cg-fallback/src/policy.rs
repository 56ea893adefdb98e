//! The fallback policy: one place that decides between live data, failover
//! and demo data.
//!
//! ```text
//!              connect() / first request
//!   Probing ───────────────────────────────▶ Live(candidate)
//!      │                                       │  connectivity failure,
//!      │ nothing reachable                     │  alternate also fails
//!      ▼                                       ▼
//!   Degraded(reason) ◀─────────────────────────┘
//!      │
//!      └── retry_connection() ──▶ Probing
//!
//!   Demo overrides every state while the mode switch is on.
//! ```
//!
//! Policy state sits behind a `std::sync::Mutex` that is only held for
//! short, synchronous sections; network calls happen with the lock
//! released. Every live binding carries a generation number so that a
//! failure reported by an old binding cannot degrade a newer one.

use std::sync::{Arc, Mutex, MutexGuard};

use campusgate_auth::{AuthInterceptor, CredentialSource, KeyValueStore};
use campusgate_client::{
    ApiClient, ClassifiedError, EndpointCandidate, FailureKind, HttpClient, RequestMethod,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::ResilienceConfig;
use crate::demo::{DemoCatalog, DemoSource};
use crate::error::Result;
use crate::mode::ModeSwitch;
use crate::prober::{ConnectionProber, ProbeReport};
use crate::resolver::{CandidatePlan, ProtocolResolver};
use crate::response::ApiResponse;
use crate::retry::FailoverBudget;
use crate::session::SessionConfig;

/// Connection state as shown to the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Looking for a reachable endpoint, or not looked yet.
    Probing,
    /// Bound to a reachable endpoint.
    Live { candidate: EndpointCandidate },
    /// No endpoint is usable. Demo data can be switched on.
    Degraded {
        error: ClassifiedError,
        demo_available: bool,
    },
    /// Serving synthetic data.
    Demo,
}

impl ConnectionStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, ConnectionStatus::Live { .. })
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ConnectionStatus::Degraded { .. })
    }

    pub fn is_demo(&self) -> bool {
        matches!(self, ConnectionStatus::Demo)
    }

    /// The failure behind a degraded state.
    pub fn error(&self) -> Option<&ClassifiedError> {
        match self {
            ConnectionStatus::Degraded { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// One live binding: a client for one candidate plus its session settings.
#[derive(Debug)]
struct Binding {
    generation: u64,
    client: ApiClient,
    session: SessionConfig,
}

#[derive(Debug, Clone)]
enum Link {
    Unprobed,
    Probing,
    Live(Arc<Binding>),
    Degraded(ClassifiedError),
}

#[derive(Debug)]
struct PolicyState {
    link: Link,
    plan: Option<CandidatePlan>,
    generation: u64,
}

fn link_status(link: &Link, demo: bool) -> ConnectionStatus {
    if demo {
        return ConnectionStatus::Demo;
    }
    match link {
        Link::Unprobed | Link::Probing => ConnectionStatus::Probing,
        Link::Live(binding) => ConnectionStatus::Live {
            candidate: binding.client.candidate().clone(),
        },
        Link::Degraded(error) => ConnectionStatus::Degraded {
            error: error.clone(),
            demo_available: true,
        },
    }
}

fn publish_status(tx: &watch::Sender<ConnectionStatus>, status: ConnectionStatus) {
    tx.send_if_modified(|current| {
        if *current == status {
            false
        } else {
            *current = status;
            true
        }
    });
}

/// Resilient entry point for every API call.
///
/// Never returns `Err` and never panics on a request: failures come back as
/// an [`ApiResponse`] whose `error` is a [`ClassifiedError`].
#[derive(Debug)]
pub struct FallbackPolicy {
    config: ResilienceConfig,
    resolver: ProtocolResolver,
    prober: ConnectionProber,
    http: HttpClient,
    auth: Arc<AuthInterceptor>,
    mode: ModeSwitch,
    demo: Arc<dyn DemoSource>,
    state: Arc<Mutex<PolicyState>>,
    status_tx: Arc<watch::Sender<ConnectionStatus>>,
    connect_lock: tokio::sync::Mutex<()>,
}

impl FallbackPolicy {
    /// Create a policy. Credentials and the demo flag are read from `store`.
    ///
    /// Nothing touches the network until [`connect`](Self::connect) or the
    /// first request.
    pub fn new(config: ResilienceConfig, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let resolver = ProtocolResolver::new(&config.resolver)?;
        let prober = ConnectionProber::new(config.page, config.probe.clone())?;
        let http = HttpClient::new(config.client.clone())?;
        let auth = Arc::new(AuthInterceptor::new(CredentialSource::new(store.clone())));
        let mode = ModeSwitch::with_key(store, config.demo_mode_key.clone());

        let initial = if mode.is_demo() {
            ConnectionStatus::Demo
        } else {
            ConnectionStatus::Probing
        };
        let (status_tx, _) = watch::channel(initial);
        let status_tx = Arc::new(status_tx);
        let state = Arc::new(Mutex::new(PolicyState {
            link: Link::Unprobed,
            plan: None,
            generation: 0,
        }));

        // Toggles made through any clone of the switch reach subscribers.
        let weak_state = Arc::downgrade(&state);
        let weak_tx = Arc::downgrade(&status_tx);
        mode.on_change(move |demo| {
            let (Some(state), Some(tx)) = (weak_state.upgrade(), weak_tx.upgrade()) else {
                return;
            };
            let status = {
                let guard = state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                link_status(&guard.link, demo)
            };
            publish_status(&tx, status);
        });

        Ok(Self {
            config,
            resolver,
            prober,
            http,
            auth,
            mode,
            demo: Arc::new(DemoCatalog::new()),
            state,
            status_tx,
            connect_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Replace the built-in demo catalogue.
    pub fn with_demo_source(mut self, source: Arc<dyn DemoSource>) -> Self {
        self.demo = source;
        self
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn mode(&self) -> &ModeSwitch {
        &self.mode
    }

    pub fn auth(&self) -> &AuthInterceptor {
        &self.auth
    }

    pub fn prober(&self) -> &ConnectionProber {
        &self.prober
    }

    fn state(&self) -> MutexGuard<'_, PolicyState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_link(&self) -> Link {
        self.state().link.clone()
    }

    /// Current status. Demo mode wins over the underlying connection state.
    pub fn status(&self) -> ConnectionStatus {
        let demo = self.mode.is_demo();
        link_status(&self.state().link, demo)
    }

    /// Watch status transitions.
    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_tx.subscribe()
    }

    fn publish(&self) {
        publish_status(&self.status_tx, self.status());
    }

    /// The plan from the most recent probing cycle.
    pub fn plan(&self) -> Option<CandidatePlan> {
        self.state().plan.clone()
    }

    /// Session settings of the current live binding.
    pub fn session(&self) -> Option<SessionConfig> {
        match &self.state().link {
            Link::Live(binding) => Some(binding.session.clone()),
            _ => None,
        }
    }

    /// Switch demo mode on or off. Takes effect on the next request.
    pub fn set_demo_mode(&self, demo: bool) -> ConnectionStatus {
        self.mode.set_demo(demo);
        self.status()
    }

    /// Probe once if no probing cycle has run yet.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> ConnectionStatus {
        let _guard = self.connect_lock.lock().await;
        let unprobed = matches!(self.current_link(), Link::Unprobed);
        if unprobed {
            self.run_probe_cycle().await;
        }
        self.status()
    }

    /// Resolve and probe again, regardless of the current state.
    #[instrument(skip(self))]
    pub async fn retry_connection(&self) -> ConnectionStatus {
        let _guard = self.connect_lock.lock().await;
        info!("Retrying connection");
        self.run_probe_cycle().await;
        self.status()
    }

    async fn run_probe_cycle(&self) {
        let plan = self.resolver.resolve(self.config.page);
        {
            let mut state = self.state();
            state.link = Link::Probing;
            state.plan = Some(plan.clone());
        }
        self.publish();

        let report = self.prober.probe(plan.candidates()).await;
        match report.selected() {
            Some(candidate) => {
                let binding = self.install(candidate.clone());
                info!(
                    candidate = %candidate,
                    generation = binding.generation,
                    "Connected to live endpoint"
                );
            }
            None => {
                let reason = degraded_reason(&plan, &report);
                info!(
                    kind = %reason.kind,
                    demo_fallback = plan.demo_fallback(),
                    "No live endpoint; degraded"
                );
                self.state().link = Link::Degraded(reason);
            }
        }
        self.publish();
    }

    fn client_for(&self, candidate: EndpointCandidate) -> ApiClient {
        ApiClient::from_http(self.http.clone(), candidate, self.config.page)
            .with_interceptor(self.auth.clone())
    }

    /// Bind to `candidate` under a fresh generation.
    fn install(&self, candidate: EndpointCandidate) -> Arc<Binding> {
        let session = SessionConfig::new(&candidate, self.config.client.timeout, self.mode.clone());
        let client = self.client_for(candidate);

        let mut state = self.state();
        state.generation += 1;
        let binding = Arc::new(Binding {
            generation: state.generation,
            client,
            session,
        });
        state.link = Link::Live(binding.clone());
        binding
    }

    fn is_current(&self, binding: &Binding) -> bool {
        matches!(
            &self.state().link,
            Link::Live(current) if current.generation == binding.generation
        )
    }

    /// Move the binding to `candidate`, unless `stale` was already replaced.
    fn promote(&self, stale: &Binding, candidate: EndpointCandidate) {
        if !self.is_current(stale) {
            debug!(generation = stale.generation, "Ignoring failover from stale binding");
            return;
        }
        self.prober.remember(&candidate);
        let binding = self.install(candidate);
        info!(
            from = %stale.client.candidate(),
            to = %binding.client.candidate(),
            generation = binding.generation,
            "Failed over to alternate endpoint"
        );
        self.publish();
    }

    /// Degrade, unless `stale` was already replaced.
    fn degrade(&self, stale: &Binding, reason: ClassifiedError) {
        {
            let mut state = self.state();
            let current = matches!(
                &state.link,
                Link::Live(current) if current.generation == stale.generation
            );
            if !current {
                debug!(generation = stale.generation, "Ignoring failure from stale binding");
                return;
            }
            info!(
                candidate = %stale.client.candidate(),
                kind = %reason.kind,
                "Live endpoint lost; degraded"
            );
            state.link = Link::Degraded(reason);
        }
        self.publish();
    }

    /// Send a request through the policy.
    #[instrument(skip_all, fields(method = %method, path = %path))]
    pub async fn request<T, B>(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
    ) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        if self.mode.is_demo() {
            return self.serve_demo(method, path, body, None);
        }

        let mut link = self.current_link();
        if matches!(link, Link::Unprobed | Link::Probing) {
            self.connect().await;
            link = self.current_link();
            if self.mode.is_demo() {
                return self.serve_demo(method, path, body, None);
            }
        }

        match link {
            Link::Live(binding) => self.send_live(binding, method, path, body).await,
            Link::Degraded(reason) => self.degraded_response(method, path, body, reason),
            Link::Unprobed | Link::Probing => ApiResponse::failure(ClassifiedError::new(
                FailureKind::Unknown,
                "Connection is being re-established; try again shortly",
            )),
        }
    }

    async fn send_live<T, B>(
        &self,
        binding: Arc<Binding>,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
    ) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        match binding.client.send_json(method, path, body).await {
            Ok(data) => ApiResponse::live(data),
            Err(error) if error.kind.is_connectivity() => {
                self.fail_over(&binding, error, method, path, body).await
            }
            // Auth, server and unknown failures say nothing about the path
            // to the server; pass them through untouched.
            Err(error) => ApiResponse::failure(error),
        }
    }

    async fn fail_over<T, B>(
        &self,
        binding: &Binding,
        error: ClassifiedError,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
    ) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let alternates = self
            .plan()
            .map(|plan| plan.alternates(binding.client.candidate()))
            .unwrap_or_default();
        let mut budget = FailoverBudget::new(self.config.failover.clone());

        for candidate in alternates {
            let Some(delay) = budget.next_delay() else {
                break;
            };
            debug!(candidate = %candidate, ?delay, "Trying alternate endpoint");
            tokio::time::sleep(delay).await;

            let client = self.client_for(candidate.clone());
            match client.send_json(method, path, body).await {
                Ok(data) => {
                    self.promote(binding, candidate);
                    return ApiResponse::live(data);
                }
                Err(alt_error) if alt_error.kind.is_connectivity() => {
                    warn!(
                        candidate = %candidate,
                        kind = %alt_error.kind,
                        "Alternate endpoint failed"
                    );
                }
                // The alternate answered, so it is reachable.
                Err(alt_error) => {
                    self.promote(binding, candidate);
                    return ApiResponse::failure(alt_error);
                }
            }
        }

        self.degrade(binding, error.clone());
        self.degraded_response(method, path, body, error)
    }

    fn degraded_response<T, B>(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
        reason: ClassifiedError,
    ) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        if self.config.serve_demo_when_degraded {
            self.serve_demo(method, path, body, Some(reason))
        } else {
            ApiResponse::failure(reason)
        }
    }

    fn serve_demo<T, B>(
        &self,
        method: RequestMethod,
        path: &str,
        body: Option<&B>,
        reason: Option<ClassifiedError>,
    ) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = match body.map(serde_json::to_value).transpose() {
            Ok(body) => body,
            Err(e) => {
                return ApiResponse::failure(ClassifiedError::malformed(format!(
                    "request body: {e}"
                )))
            }
        };

        debug!(method = %method, path, "Serving demo data");
        match self.demo.respond(method, path, body.as_ref()) {
            Some(value) => match serde_json::from_value(value) {
                Ok(data) => ApiResponse::demo(data, reason),
                Err(e) => ApiResponse::failure(ClassifiedError::malformed(e)),
            },
            None => ApiResponse::failure(
                ClassifiedError::new(
                    FailureKind::Unknown,
                    format!("Demo data has no record for {method} {path}"),
                )
                .with_status(404),
            ),
        }
    }

    /// GET `path`.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request::<T, ()>(RequestMethod::Get, path, None).await
    }

    /// POST `body` to `path`.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestMethod::Post, path, Some(body)).await
    }

    /// PUT `body` to `path`.
    pub async fn put<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestMethod::Put, path, Some(body)).await
    }

    /// PATCH `path` with `body`.
    pub async fn patch<T, B>(&self, path: &str, body: &B) -> ApiResponse<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        self.request(RequestMethod::Patch, path, Some(body)).await
    }

    /// DELETE `path`.
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ApiResponse<T> {
        self.request::<T, ()>(RequestMethod::Delete, path, None).await
    }
}

fn degraded_reason(plan: &CandidatePlan, report: &ProbeReport) -> ClassifiedError {
    match report.primary_failure() {
        Some(failure) => failure.clone(),
        None if plan.is_empty() => {
            ClassifiedError::new(FailureKind::Unknown, "No endpoint candidates configured")
        }
        None => ClassifiedError::new(FailureKind::Unknown, "No endpoint answered the probe"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProbeConfig, ResolverConfig};
    use crate::demo::School;
    use crate::response::DataSource;
    use crate::retry::{BackoffStrategy, FailoverConfig};
    use campusgate_auth::MemoryStore;
    use campusgate_client::{ClientConfig, PageContext};
    use serde_json::{json, Value};
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn target(server: &MockServer) -> String {
        format!("{}/api", server.uri())
    }

    fn config(resolver: ResolverConfig, page: PageContext) -> ResilienceConfig {
        ResilienceConfig::builder()
            .with_page(page)
            .with_resolver(resolver)
            .with_client(
                ClientConfig::builder()
                    .with_timeout(Duration::from_millis(300))
                    .build(),
            )
            .with_probe(ProbeConfig::default().with_timeout(Duration::from_millis(300)))
            .with_failover(
                FailoverConfig::default()
                    .with_backoff(BackoffStrategy::Constant)
                    .with_initial_delay(Duration::from_millis(1)),
            )
            .build()
    }

    fn policy_for(server: &MockServer) -> FallbackPolicy {
        let resolver = ResolverConfig::target(&target(server)).unwrap();
        FallbackPolicy::new(
            config(resolver, PageContext::insecure()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap()
    }

    async fn mount_health(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(server)
            .await;
    }

    fn schools_body() -> Value {
        json!([{
            "id": "7",
            "name": "Harbor High",
            "district": "Coastal",
            "city": "Port Ellis",
            "studentCount": 900,
            "active": true
        }])
    }

    #[tokio::test]
    async fn test_first_request_connects_lazily() {
        let server = MockServer::start().await;
        mount_health(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/schools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schools_body()))
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        assert_eq!(policy.status(), ConnectionStatus::Probing);

        let response: ApiResponse<Vec<School>> = policy.get("/schools").await;
        assert!(response.success);
        assert_eq!(response.source, DataSource::Live);
        assert_eq!(response.data.unwrap()[0].name, "Harbor High");
        assert!(policy.status().is_live());

        let session = policy.session().unwrap();
        assert_eq!(session.base_url, target(&server));
        assert_eq!(session.timeout, Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_demo_mode_makes_no_network_calls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        assert_eq!(policy.set_demo_mode(true), ConnectionStatus::Demo);

        let response: ApiResponse<Vec<School>> = policy.get("/schools").await;
        assert!(response.success);
        assert_eq!(response.source, DataSource::Demo);
        assert!(!response.data.unwrap().is_empty());

        // Back to the underlying state, which has not been probed yet.
        assert_eq!(policy.set_demo_mode(false), ConnectionStatus::Probing);
    }

    #[tokio::test]
    async fn test_toggle_through_mode_switch_reaches_subscribers() {
        let server = MockServer::start().await;
        mount_health(&server).await;

        let policy = policy_for(&server);
        policy.connect().await;
        let mut status = policy.subscribe_status();
        assert!(status.borrow_and_update().is_live());

        policy.mode().set_demo(true);
        assert!(status.has_changed().unwrap());
        assert_eq!(*status.borrow_and_update(), ConnectionStatus::Demo);

        // A clone held elsewhere (the session config) publishes too.
        let session = policy.session().unwrap();
        session.mode.toggle();
        assert!(status.has_changed().unwrap());
        assert!(status.borrow_and_update().is_live());
    }

    #[tokio::test]
    async fn test_demo_flag_is_loaded_from_store() {
        let server = MockServer::start().await;
        let store = Arc::new(MemoryStore::with_entries([("campusgate.demo_mode", "true")]));
        let resolver = ResolverConfig::target(&target(&server)).unwrap();
        let policy = FallbackPolicy::new(config(resolver, PageContext::insecure()), store).unwrap();

        assert_eq!(policy.status(), ConnectionStatus::Demo);
        assert_eq!(*policy.subscribe_status().borrow(), ConnectionStatus::Demo);
    }

    #[tokio::test]
    async fn test_unauthorized_passes_through_without_state_change() {
        let server = MockServer::start().await;
        mount_health(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "login required"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        let response: ApiResponse<Value> = policy.get("/users").await;

        assert!(!response.success);
        let error = response.error.unwrap();
        assert_eq!(error.kind, FailureKind::Unauthorized);
        assert!(policy.status().is_live());
        assert!(!policy.auth().last_request_authenticated());
    }

    #[tokio::test]
    async fn test_token_is_attached() {
        let server = MockServer::start().await;
        mount_health(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/users"))
            .and(header("authorization", "Bearer tok-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemoryStore::with_entries([("token", "tok-123")]));
        let resolver = ResolverConfig::target(&target(&server)).unwrap();
        let policy = FallbackPolicy::new(config(resolver, PageContext::insecure()), store).unwrap();

        let response: ApiResponse<Vec<Value>> = policy.get("/users").await;
        assert!(response.success);
        assert!(policy.auth().last_request_authenticated());
    }

    #[tokio::test]
    async fn test_malformed_body_is_reported() {
        let server = MockServer::start().await;
        mount_health(&server).await;
        Mock::given(method("GET"))
            .and(path("/api/schools"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        let response: ApiResponse<Vec<School>> = policy.get("/schools").await;

        let error = response.error.unwrap();
        assert_eq!(error.kind, FailureKind::Unknown);
        assert!(error.message.contains("Malformed response"));
        assert!(policy.status().is_live());
    }

    #[tokio::test]
    async fn test_timeout_fails_over_to_alternate() {
        let slow = MockServer::start().await;
        let backup = MockServer::start().await;
        mount_health(&slow).await;
        Mock::given(method("GET"))
            .and(path("/api/schools"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .expect(1)
            .mount(&slow)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/schools"))
            .respond_with(ResponseTemplate::new(200).set_body_json(schools_body()))
            .expect(1)
            .mount(&backup)
            .await;

        let resolver = ResolverConfig::target(&target(&slow))
            .unwrap()
            .with_fallback_url(target(&backup));
        let policy = FallbackPolicy::new(
            config(resolver, PageContext::insecure()),
            Arc::new(MemoryStore::new()),
        )
        .unwrap();

        let response: ApiResponse<Vec<School>> = policy.get("/schools").await;
        assert!(response.success);
        assert_eq!(response.source, DataSource::Live);

        match policy.status() {
            ConnectionStatus::Live { candidate } => {
                assert_eq!(candidate.base_url(), target(&backup))
            }
            other => panic!("expected live status, got {other:?}"),
        }
        assert_eq!(
            policy.prober().last_known_good().map(|c| c.base_url()),
            Some(target(&backup))
        );
    }

    #[tokio::test]
    async fn test_stale_binding_cannot_degrade_newer_one() {
        let server = MockServer::start().await;
        mount_health(&server).await;

        let policy = policy_for(&server);
        policy.connect().await;
        let old = match policy.current_link() {
            Link::Live(binding) => binding,
            other => panic!("expected live link, got {other:?}"),
        };

        policy.retry_connection().await;
        policy.degrade(&old, ClassifiedError::new(FailureKind::Timeout, "late failure"));
        assert!(policy.status().is_live());

        let current = match policy.current_link() {
            Link::Live(binding) => binding,
            other => panic!("expected live link, got {other:?}"),
        };
        assert!(current.generation > old.generation);

        policy.degrade(&current, ClassifiedError::new(FailureKind::Timeout, "real failure"));
        assert!(policy.status().is_degraded());
    }

    #[tokio::test]
    async fn test_nothing_reachable_degrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        let status = policy.connect().await;

        assert!(status.is_degraded());
        assert_eq!(status.error().unwrap().kind, FailureKind::ServerError);
        assert!(policy.session().is_none());
    }

    #[tokio::test]
    async fn test_degraded_requests_stay_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/schools"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        let first: ApiResponse<Value> = policy.get("/schools").await;
        let second: ApiResponse<Value> = policy.get("/schools").await;

        assert_eq!(first.error.unwrap().kind, FailureKind::ServerError);
        assert_eq!(second.source, DataSource::None);
    }

    #[tokio::test]
    async fn test_serve_demo_when_degraded() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let resolver = ResolverConfig::target(&target(&server)).unwrap();
        let mut config = config(resolver, PageContext::insecure());
        config.serve_demo_when_degraded = true;
        let policy = FallbackPolicy::new(config, Arc::new(MemoryStore::new())).unwrap();

        let response: ApiResponse<Vec<School>> = policy.get("/schools").await;
        assert!(response.success);
        assert_eq!(response.source, DataSource::Demo);
        assert_eq!(response.error.unwrap().kind, FailureKind::ServerError);
        assert!(policy.status().is_degraded());
    }

    #[tokio::test]
    async fn test_retry_connection_recovers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_health(&server).await;

        let policy = policy_for(&server);
        let mut status = policy.subscribe_status();

        assert!(policy.connect().await.is_degraded());
        assert!(status.borrow_and_update().is_degraded());

        assert!(policy.retry_connection().await.is_live());
        assert!(status.has_changed().unwrap());
        assert!(status.borrow_and_update().is_live());
    }

    #[tokio::test]
    async fn test_connect_probes_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let policy = policy_for(&server);
        policy.connect().await;
        policy.connect().await;
        assert!(policy.status().is_live());
    }

    #[tokio::test]
    async fn test_demo_record_missing() {
        let server = MockServer::start().await;
        let policy = policy_for(&server);
        policy.set_demo_mode(true);

        let response: ApiResponse<School> = policy.get("/schools/999").await;
        let error = response.error.unwrap();
        assert_eq!(error.kind, FailureKind::Unknown);
        assert_eq!(error.status, Some(404));
    }
}
