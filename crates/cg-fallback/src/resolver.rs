//! Protocol resolution.
//!
//! Turns the configured target plus the page's own transport into a ranked
//! list of candidates. No I/O happens here; whether a candidate is actually
//! reachable is the prober's business.

use campusgate_client::{EndpointCandidate, PageContext, Scheme};
use tracing::debug;

use crate::config::ResolverConfig;
use crate::error::Result;

/// Ranked candidates for one page context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidatePlan {
    page: PageContext,
    candidates: Vec<EndpointCandidate>,
    overridden: bool,
}

impl CandidatePlan {
    pub fn page(&self) -> PageContext {
        self.page
    }

    /// Candidates in preference order.
    pub fn candidates(&self) -> &[EndpointCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Returns true if an explicit base URL replaced negotiation.
    pub fn is_override(&self) -> bool {
        self.overridden
    }

    /// Returns true if `candidate` can never be reached from this page.
    pub fn is_blocked(&self, candidate: &EndpointCandidate) -> bool {
        self.page.blocks(candidate)
    }

    /// Returns true if the plan already knows some candidate is unreachable
    /// from this page, making demo data the only guaranteed fallback.
    pub fn demo_fallback(&self) -> bool {
        self.candidates.iter().any(|c| self.is_blocked(c))
    }

    /// Candidates worth trying after `current` failed, in plan order.
    ///
    /// Blocked candidates are never alternates. When nothing else is left
    /// the failed candidate itself is offered once more, unless it is blocked.
    pub fn alternates(&self, current: &EndpointCandidate) -> Vec<EndpointCandidate> {
        let others: Vec<EndpointCandidate> = self
            .candidates
            .iter()
            .filter(|c| *c != current && !self.is_blocked(c))
            .cloned()
            .collect();

        if others.is_empty() && !self.is_blocked(current) {
            vec![current.clone()]
        } else {
            others
        }
    }
}

/// Computes candidate plans from a [`ResolverConfig`].
#[derive(Debug, Clone)]
pub struct ProtocolResolver {
    primary: EndpointCandidate,
    secondaries: Vec<EndpointCandidate>,
    override_target: Option<EndpointCandidate>,
}

impl ProtocolResolver {
    /// Create a resolver. Fails if the override or a secondary URL does not
    /// parse.
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let override_target = config
            .override_url
            .as_deref()
            .map(EndpointCandidate::parse)
            .transpose()?;
        let secondaries = config
            .fallback_urls
            .iter()
            .map(|url| EndpointCandidate::parse(url))
            .collect::<campusgate_client::Result<Vec<_>>>()?;

        Ok(Self {
            primary: config.primary(),
            secondaries,
            override_target,
        })
    }

    /// Rank candidates for a page served over `page`'s transport.
    pub fn resolve(&self, page: PageContext) -> CandidatePlan {
        if let Some(target) = &self.override_target {
            debug!(target = %target, "Using explicit base URL override");
            return CandidatePlan {
                page,
                candidates: vec![target.clone()],
                overridden: true,
            };
        }

        let mut candidates = Vec::new();
        for target in std::iter::once(&self.primary).chain(&self.secondaries) {
            for candidate in variants(target, page) {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }

        // Stable: preferred transport first, configuration order otherwise.
        let preferred = page.scheme;
        candidates.sort_by_key(|c| c.scheme() != preferred);

        debug!(
            page = %page.scheme,
            candidates = ?candidates.iter().map(|c| c.base_url()).collect::<Vec<_>>(),
            "Resolved candidate plan"
        );

        CandidatePlan {
            page,
            candidates,
            overridden: false,
        }
    }
}

/// The transports worth considering for one configured target.
fn variants(target: &EndpointCandidate, page: PageContext) -> Vec<EndpointCandidate> {
    match (page.is_secure(), target.scheme().is_secure()) {
        // The insecure original stays in the plan so the failure can be
        // reported, but only after the secure variant.
        (true, false) => vec![target.with_scheme(Scheme::Https), target.clone()],
        (true, true) => vec![target.clone()],
        (false, _) => vec![
            target.with_scheme(Scheme::Http),
            target.with_scheme(Scheme::Https),
        ],
    }
}
