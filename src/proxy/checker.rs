//! Proxy checker: probes every unique candidate once and classifies it

use crate::proxy::aggregator::aggregate;
use crate::proxy::error::{ProbeError, VerifyError};
use crate::proxy::models::{Anonymity, Candidate, CandidateKey, Verdict, VerifiedProxy};
use crate::proxy::oracle::{
    AddressOracle, IdentOracle, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_ORACLE_URL,
    DEFAULT_REQUEST_TIMEOUT_SECS,
};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::collections::HashSet;
use std::net::IpAddr;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default number of probes in flight at once
const DEFAULT_CONCURRENCY: usize = 64;

/// Default probe start rate, one start every 10ms
const DEFAULT_PROBES_PER_SECOND: u32 = 100;

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Total timeout for each oracle query
    pub timeout: Duration,
    /// Connect and handshake timeout for each oracle query
    pub connect_timeout: Duration,
    /// Upper bound on probes in flight, also the depth of the result queue
    pub concurrency: usize,
    /// Probe start rate, with starts spaced evenly and no burst; zero disables pacing
    pub probes_per_second: u32,
    /// Deadline for a whole run, after which unfinished probes count as dead
    pub run_timeout: Option<Duration>,
    /// Address-echo endpoint
    pub oracle_url: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            concurrency: DEFAULT_CONCURRENCY,
            probes_per_second: DEFAULT_PROBES_PER_SECOND,
            run_timeout: None,
            oracle_url: DEFAULT_ORACLE_URL.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_probes_per_second(mut self, rate: u32) -> Self {
        self.probes_per_second = rate;
        self
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = Some(timeout);
        self
    }

    pub fn with_oracle_url(mut self, url: String) -> Self {
        self.oracle_url = url;
        self
    }

    fn oracle(&self) -> IdentOracle {
        IdentOracle::new(self.oracle_url.clone())
            .with_connect_timeout(self.connect_timeout)
            .with_request_timeout(self.timeout)
    }
}

/// Proxy checker for verifying candidates against an address oracle
pub struct ProxyChecker<O = IdentOracle> {
    config: CheckerConfig,
    oracle: Arc<O>,
    limiter: Option<Arc<Limiter>>,
}

impl ProxyChecker<IdentOracle> {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::with_config(CheckerConfig::default())
    }

    /// Create a new proxy checker backed by the HTTP oracle from `config`
    pub fn with_config(config: CheckerConfig) -> Self {
        let oracle = config.oracle();
        Self::with_oracle(config, oracle)
    }
}

impl Default for ProxyChecker<IdentOracle> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O> Clone for ProxyChecker<O> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            oracle: Arc::clone(&self.oracle),
            limiter: self.limiter.clone(),
        }
    }
}

impl<O: AddressOracle> ProxyChecker<O> {
    pub fn with_oracle(config: CheckerConfig, oracle: O) -> Self {
        let limiter = NonZeroU32::new(config.probes_per_second).map(|rate| {
            let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);
            Arc::new(RateLimiter::direct(quota))
        });

        Self {
            config,
            oracle: Arc::new(oracle),
            limiter,
        }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Verify every unique candidate exactly once
    ///
    /// Returns one [`VerifiedProxy`] per unique candidate in completion
    /// order. The only error is a failed baseline query; every per-candidate
    /// failure is recorded as [`Verdict::Dead`].
    pub async fn verify(
        &self,
        candidates: Vec<Candidate>,
        cancel: &CancellationToken,
    ) -> Result<Vec<VerifiedProxy>, VerifyError> {
        let cancel = cancel.child_token();
        // Cancels the run token on return so the deadline task winds down
        let _run_guard = cancel.clone().drop_guard();

        if let Some(limit) = self.config.run_timeout {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = token.cancelled() => {}
                    _ = tokio::time::sleep(limit) => {
                        warn!(timeout = ?limit, "Verification deadline reached, cancelling probes");
                        token.cancel();
                    }
                }
            });
        }

        let baseline = self.baseline(&cancel).await?;
        let candidates = aggregate(std::iter::once(candidates));
        let expected = candidates.len();

        info!(
            baseline = %baseline,
            candidates = expected,
            concurrency = self.config.concurrency,
            "Verifying candidates"
        );

        if expected == 0 {
            return Ok(Vec::new());
        }

        let submitted = candidates.clone();
        let capacity = self.config.concurrency.max(1);
        let (tx, mut rx) = mpsc::channel::<VerifiedProxy>(capacity);
        let dispatcher = self.dispatch(candidates, Arc::from(baseline), cancel.clone(), tx);

        let mut results = Vec::with_capacity(expected);
        while results.len() < expected {
            match rx.recv().await {
                Some(verified) => results.push(verified),
                None => break,
            }
        }

        if let Err(e) = dispatcher.await {
            warn!(error = %e, "Probe dispatcher stopped abnormally");
        }

        if results.len() < expected {
            let reported: HashSet<CandidateKey> =
                results.iter().map(|r| r.candidate.key()).collect();
            for candidate in submitted {
                if !reported.contains(&candidate.key()) {
                    warn!(proxy = %candidate.key(), "Probe lost without a result, marking dead");
                    results.push(VerifiedProxy::dead(candidate));
                }
            }
        }

        let live = results.iter().filter(|r| r.is_live()).count();
        info!(checked = results.len(), live, dead = results.len() - live, "Verification finished");

        Ok(results)
    }

    async fn baseline(&self, cancel: &CancellationToken) -> Result<String, VerifyError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = self.oracle.baseline() => result,
        };

        let baseline = result.map_err(VerifyError::OracleUnavailable)?;
        if baseline.parse::<IpAddr>().is_err() {
            return Err(VerifyError::OracleUnavailable(ProbeError::Unreachable(
                format!("oracle answered with a non-address: {:?}", baseline),
            )));
        }

        Ok(baseline)
    }

    /// Spawn one probe task per candidate, at most `concurrency` at a time
    fn dispatch(
        &self,
        candidates: Vec<Candidate>,
        baseline: Arc<str>,
        cancel: CancellationToken,
        tx: mpsc::Sender<VerifiedProxy>,
    ) -> tokio::task::JoinHandle<()> {
        let checker = self.clone();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        tokio::spawn(async move {
            for candidate in candidates {
                // The semaphore is never closed
                let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                    break;
                };

                let checker = checker.clone();
                let baseline = Arc::clone(&baseline);
                let cancel = cancel.clone();
                let tx = tx.clone();

                tokio::spawn(async move {
                    let verified = checker.probe(candidate, &baseline, &cancel).await;
                    drop(permit);
                    let _ = tx.send(verified).await;
                });
            }
        })
    }

    async fn probe(
        &self,
        candidate: Candidate,
        baseline: &str,
        cancel: &CancellationToken,
    ) -> VerifiedProxy {
        if let Some(limiter) = &self.limiter {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return classify(candidate, Err(ProbeError::Cancelled), baseline, 0);
                }
                _ = limiter.until_ready() => {}
            }
        }

        let start = Instant::now();
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProbeError::Cancelled),
            result = self.oracle.probe(&candidate) => result,
        };
        let elapsed = start.elapsed().as_millis() as u64;

        classify(candidate, result, baseline, elapsed)
    }
}

/// Turn one probe result into a verdict
///
/// Elite and Anonymous cannot be told apart from the echoed address alone,
/// so a live proxy that hides us keeps the class its source claimed.
pub fn classify(
    candidate: Candidate,
    probe: Result<String, ProbeError>,
    baseline: &str,
    elapsed_ms: u64,
) -> VerifiedProxy {
    let seen = match probe {
        Ok(seen) => seen,
        Err(ProbeError::TransportConstruction { proxy, reason }) => {
            debug!(proxy = %proxy, reason = %reason, "Cannot build proxied client");
            return VerifiedProxy::dead(candidate);
        }
        Err(ProbeError::Timeout(after)) => {
            debug!(proxy = %candidate.key(), timeout = ?after, "Probe timed out");
            return VerifiedProxy::dead(candidate);
        }
        Err(ProbeError::Unreachable(reason)) => {
            debug!(proxy = %candidate.key(), reason = %reason, "Probe failed");
            return VerifiedProxy::dead(candidate);
        }
        Err(ProbeError::Cancelled) => {
            debug!(proxy = %candidate.key(), "Probe cancelled");
            return VerifiedProxy::dead(candidate);
        }
    };

    if seen.parse::<IpAddr>().is_err() {
        debug!(proxy = %candidate.key(), "Proxy answered with something other than an address");
        return VerifiedProxy::dead(candidate);
    }

    let verdict = if seen == baseline {
        Verdict::LiveNotAnonymous
    } else {
        match candidate.anonymity {
            Anonymity::Elite => Verdict::LiveElite,
            Anonymity::Anonymous | Anonymity::Unspecified => Verdict::LiveAnonymous,
        }
    };

    debug!(proxy = %candidate.key(), verdict = %verdict, elapsed_ms, "Probe answered");
    VerifiedProxy::live(candidate, verdict, elapsed_ms)
}
