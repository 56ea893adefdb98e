//! Per-binding session settings.

use std::time::Duration;

use campusgate_client::EndpointCandidate;

use crate::mode::ModeSwitch;

/// Settings of one live binding. Built once when the policy binds to a
/// candidate and replaced wholesale on failover, never edited in place.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub mode: ModeSwitch,
}

impl SessionConfig {
    pub fn new(candidate: &EndpointCandidate, timeout: Duration, mode: ModeSwitch) -> Self {
        Self {
            base_url: candidate.base_url(),
            timeout,
            mode,
        }
    }

    /// Current demo flag; re-read on every call.
    pub fn demo_mode(&self) -> bool {
        self.mode.is_demo()
    }
}
