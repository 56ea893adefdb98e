//! Reachability probing.
//!
//! Candidates are tried one at a time in plan order with a short timeout of
//! their own. Insecure candidates seen from a secure page are never sent:
//! the browser would refuse them, so the prober records the refusal instead.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use campusgate_client::{
    classify, ClassifiedError, ClassifyContext, ClientConfig, EndpointCandidate, FailureKind,
    HttpClient, PageContext,
};
use tracing::{debug, info, instrument, warn};

use crate::config::ProbeConfig;
use crate::error::Result;

/// Outcome of probing one candidate.
#[derive(Debug, Clone)]
pub struct ProbeResult {
    pub candidate: EndpointCandidate,
    pub reachable: bool,
    /// Round-trip time, when a request was actually sent.
    pub latency: Option<Duration>,
    /// HTTP status of the probe response, if one arrived.
    pub status: Option<u16>,
    pub error: Option<ClassifiedError>,
}

impl ProbeResult {
    fn reachable(candidate: EndpointCandidate, latency: Duration, status: u16) -> Self {
        Self {
            candidate,
            reachable: true,
            latency: Some(latency),
            status: Some(status),
            error: None,
        }
    }

    fn failed(
        candidate: EndpointCandidate,
        latency: Option<Duration>,
        error: ClassifiedError,
    ) -> Self {
        Self {
            candidate,
            reachable: false,
            latency,
            status: error.status,
            error: Some(error),
        }
    }

    /// Returns true if the candidate was skipped without a network attempt.
    pub fn was_skipped(&self) -> bool {
        self.latency.is_none()
    }
}

/// Ordered results of one probing cycle.
#[derive(Debug, Clone, Default)]
pub struct ProbeReport {
    results: Vec<ProbeResult>,
}

impl ProbeReport {
    pub fn results(&self) -> &[ProbeResult] {
        &self.results
    }

    /// The first reachable candidate, if any.
    pub fn selected(&self) -> Option<&EndpointCandidate> {
        self.results
            .iter()
            .find(|r| r.reachable)
            .map(|r| &r.candidate)
    }

    /// Returns true if some candidate answered.
    pub fn is_live(&self) -> bool {
        self.selected().is_some()
    }

    /// Every recorded failure, in probe order.
    pub fn failures(&self) -> impl Iterator<Item = &ClassifiedError> {
        self.results.iter().filter_map(|r| r.error.as_ref())
    }

    /// The failure that best explains why nothing answered.
    ///
    /// A mixed-content refusal is preferred since it carries a remediation
    /// and no other candidate can fix it from this page.
    pub fn primary_failure(&self) -> Option<&ClassifiedError> {
        self.failures()
            .find(|e| e.kind == FailureKind::MixedContentBlocked)
            .or_else(|| self.failures().next())
    }

    /// Number of candidates that cost a network round trip.
    pub fn network_attempts(&self) -> usize {
        self.results.iter().filter(|r| !r.was_skipped()).count()
    }
}

/// Sequential reachability prober.
#[derive(Debug)]
pub struct ConnectionProber {
    http: HttpClient,
    page: PageContext,
    config: ProbeConfig,
    last_known_good: Mutex<Option<EndpointCandidate>>,
}

impl ConnectionProber {
    /// Create a prober for pages served over `page`'s transport.
    pub fn new(page: PageContext, config: ProbeConfig) -> Result<Self> {
        let http = HttpClient::new(ClientConfig::for_probe(config.timeout))?;
        Ok(Self {
            http,
            page,
            config,
            last_known_good: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// The candidate that answered most recently, if any.
    pub fn last_known_good(&self) -> Option<EndpointCandidate> {
        self.last_known_good
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Forget the last-known-good hint.
    pub fn reset(&self) {
        *self
            .last_known_good
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }

    /// Record `candidate` as the last known good endpoint, e.g. after a
    /// live request succeeded on it outside a probing cycle.
    pub fn remember(&self, candidate: &EndpointCandidate) {
        *self
            .last_known_good
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(candidate.clone());
    }

    /// Probe order: the last-known-good candidate first when it is part of
    /// `candidates` and usable from this page, the rest unchanged.
    fn order(&self, candidates: &[EndpointCandidate]) -> Vec<EndpointCandidate> {
        let mut ordered = candidates.to_vec();
        if let Some(hint) = self.last_known_good() {
            if !self.page.blocks(&hint) {
                if let Some(pos) = ordered.iter().position(|c| *c == hint) {
                    let hint = ordered.remove(pos);
                    ordered.insert(0, hint);
                }
            }
        }
        ordered
    }

    /// Probe `candidates` in order.
    ///
    /// Stops at the first reachable candidate unless the config asks for an
    /// exhaustive run.
    #[instrument(skip(self, candidates), fields(count = candidates.len()))]
    pub async fn probe(&self, candidates: &[EndpointCandidate]) -> ProbeReport {
        let mut report = ProbeReport::default();

        for candidate in self.order(candidates) {
            let result = self.probe_one(&candidate).await;
            let reachable = result.reachable;
            report.results.push(result);

            if reachable {
                self.remember(&candidate);
                if !self.config.exhaustive {
                    break;
                }
            }
        }

        match report.selected() {
            Some(selected) => info!(candidate = %selected, "Probe found a reachable endpoint"),
            None => warn!(
                attempts = report.results.len(),
                "No candidate endpoint is reachable"
            ),
        }

        report
    }

    /// Probe a single candidate.
    pub async fn probe_one(&self, candidate: &EndpointCandidate) -> ProbeResult {
        if self.page.blocks(candidate) {
            debug!(candidate = %candidate, "Skipping insecure candidate on secure page");
            return ProbeResult::failed(
                candidate.clone(),
                None,
                ClassifiedError::mixed_content(candidate),
            );
        }

        let url = candidate.url_for(&self.config.health_path);
        let started = Instant::now();
        let outcome = self.http.execute(self.http.get(url.as_str())).await;
        let latency = started.elapsed();

        match outcome {
            Ok(response) => {
                debug!(url = %url, status = response.status(), ?latency, "Probe succeeded");
                ProbeResult::reachable(candidate.clone(), latency, response.status())
            }
            // The server is up; it only wants a credential.
            Err(err) if matches!(err.status(), Some(401 | 403)) => {
                let status = err.status().unwrap_or(401);
                debug!(url = %url, status, "Probe reached an authenticated endpoint");
                ProbeResult::reachable(candidate.clone(), latency, status)
            }
            Err(err) => {
                let classified = classify(
                    &err,
                    &ClassifyContext::new(self.page, Some(candidate.clone())),
                );
                warn!(
                    url = %url,
                    kind = %classified.kind,
                    error = %classified.message,
                    "Probe failed"
                );
                ProbeResult::failed(candidate.clone(), Some(latency), classified)
            }
        }
    }
}
