//! Failover budget with backoff and jitter.
//!
//! The fallback policy allows a small number of attempts on alternate
//! candidates after a connectivity failure. This module decides how many and
//! how long to wait between them.

use std::time::Duration;

use rand::Rng;

/// Configuration for failover behavior.
#[derive(Debug, Clone)]
pub struct FailoverConfig {
    /// Maximum number of attempts on alternate candidates.
    pub max_attempts: u32,
    /// Delay before the first alternate attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts.
    pub max_delay: Duration,
    /// Backoff strategy to use.
    pub backoff: BackoffStrategy,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff: BackoffStrategy::ExponentialWithJitter { factor: 2.0 },
        }
    }
}

impl FailoverConfig {
    /// Set the maximum number of alternate attempts.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the delay before the first alternate attempt.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Set the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Set the backoff strategy.
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Degrade on the first connectivity failure.
    pub fn no_failover() -> Self {
        Self {
            max_attempts: 0,
            ..Default::default()
        }
    }
}

/// How the wait before each alternate attempt grows.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Always wait `initial_delay`.
    Constant,
    /// Multiply the wait by `factor` per attempt.
    Exponential { factor: f64 },
    /// Exponential, plus up to one extra base delay chosen at random so
    /// concurrent callers do not hit the alternate in lockstep.
    ExponentialWithJitter { factor: f64 },
}

impl BackoffStrategy {
    /// Wait before attempt `attempt` (0-based), capped at `max_delay`.
    pub fn delay(&self, attempt: u32, initial_delay: Duration, max_delay: Duration) -> Duration {
        let scaled = |factor: f64| initial_delay.as_secs_f64() * factor.powi(attempt as i32);

        let secs = match *self {
            BackoffStrategy::Constant => initial_delay.as_secs_f64(),
            BackoffStrategy::Exponential { factor } => scaled(factor),
            BackoffStrategy::ExponentialWithJitter { factor } => {
                let base = scaled(factor);
                base + base * rand::rng().random::<f64>()
            }
        };

        Duration::from_secs_f64(secs).min(max_delay)
    }
}

/// Tracks the failover attempts spent on one failed request.
#[derive(Debug, Clone)]
pub struct FailoverBudget {
    config: FailoverConfig,
    attempt: u32,
}

impl FailoverBudget {
    /// Create a new budget from config.
    pub fn new(config: FailoverConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Returns the number of attempts spent so far.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Returns true if another alternate attempt is allowed.
    pub fn can_retry(&self) -> bool {
        self.attempt < self.config.max_attempts
    }

    /// Spend one attempt and return the delay to wait before it.
    /// Returns None once the budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if !self.can_retry() {
            return None;
        }

        let delay = self.config.backoff.delay(
            self.attempt,
            self.config.initial_delay,
            self.config.max_delay,
        );

        self.attempt += 1;
        Some(delay)
    }
}
