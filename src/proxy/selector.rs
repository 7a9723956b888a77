//! Selection of verified proxies against user criteria

use crate::proxy::models::{Candidate, ProxyType, Verdict, VerifiedProxy};

/// What the caller wants back from a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterCriteria {
    /// ISO 3166 alpha-2 code compared verbatim with the claimed country
    pub country: String,
    pub proxy_type: ProxyType,
    /// Maximum number of proxies to return
    pub limit: usize,
    /// Keep proxies that forward our real address
    pub allow_not_anonymous: bool,
}

impl FilterCriteria {
    pub fn new(country: &str, proxy_type: ProxyType, limit: usize) -> Self {
        Self {
            country: country.trim().to_uppercase(),
            proxy_type,
            limit,
            allow_not_anonymous: false,
        }
    }

    pub fn with_allow_not_anonymous(mut self, allow: bool) -> Self {
        self.allow_not_anonymous = allow;
        self
    }

    /// Whether the candidate's claimed country and type match
    pub fn matches(&self, candidate: &Candidate) -> bool {
        candidate.country == self.country && candidate.proxy_type == self.proxy_type
    }

    fn accepts(&self, verified: &VerifiedProxy) -> bool {
        match verified.verdict {
            Verdict::Dead => false,
            Verdict::LiveNotAnonymous if !self.allow_not_anonymous => false,
            Verdict::LiveNotAnonymous | Verdict::LiveElite | Verdict::LiveAnonymous => {
                self.matches(&verified.candidate)
            }
        }
    }
}

/// Keep live, policy-compliant, matching proxies in arrival order, capped at `limit`
pub fn select(verified: Vec<VerifiedProxy>, criteria: &FilterCriteria) -> Vec<VerifiedProxy> {
    verified
        .into_iter()
        .filter(|v| criteria.accepts(v))
        .take(criteria.limit)
        .collect()
}

/// Drop candidates that could never pass [`select`], before spending probes on them
pub fn prefilter(candidates: Vec<Candidate>, criteria: &FilterCriteria) -> Vec<Candidate> {
    candidates
        .into_iter()
        .filter(|c| criteria.matches(c))
        .collect()
}
