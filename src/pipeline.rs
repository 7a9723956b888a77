//! One full run: harvest, aggregate, verify, select

use crate::providers::ProviderRegistry;
use crate::proxy::aggregator::aggregate;
use crate::proxy::checker::ProxyChecker;
use crate::proxy::error::VerifyError;
use crate::proxy::models::{Candidate, VerifiedProxy};
use crate::proxy::oracle::AddressOracle;
use crate::proxy::selector::{prefilter, select, FilterCriteria};
use crate::Result;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// What a run produced
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Raw candidates across all sources, duplicates included
    pub harvested: usize,
    /// Candidates left after deduplication
    pub unique: usize,
    /// Candidates actually probed
    pub checked: usize,
    /// Final filtered and capped proxies, in arrival order
    pub selected: Vec<VerifiedProxy>,
}

/// Aggregate raw source lists, verify them and select the result
///
/// Fails only when the oracle baseline cannot be established.
pub async fn sieve<O: AddressOracle>(
    lists: Vec<Vec<Candidate>>,
    checker: &ProxyChecker<O>,
    criteria: &FilterCriteria,
    prefilter_candidates: bool,
    cancel: &CancellationToken,
) -> std::result::Result<RunOutcome, VerifyError> {
    let harvested: usize = lists.iter().map(Vec::len).sum();
    let candidates = aggregate(lists);
    let unique = candidates.len();

    let candidates = if prefilter_candidates {
        prefilter(candidates, criteria)
    } else {
        candidates
    };
    let checked = candidates.len();

    info!(
        harvested,
        unique,
        to_check = checked,
        "Candidates ready for verification"
    );

    let verified = checker.verify(candidates, cancel).await?;
    let selected = select(verified, criteria);

    info!(
        selected = selected.len(),
        limit = criteria.limit,
        "Selection finished"
    );

    Ok(RunOutcome {
        harvested,
        unique,
        checked,
        selected,
    })
}

/// Harvest every registered source, then [`sieve`] the results
pub async fn run<O: AddressOracle>(
    registry: &ProviderRegistry,
    checker: &ProxyChecker<O>,
    criteria: &FilterCriteria,
    prefilter_candidates: bool,
    cancel: &CancellationToken,
) -> Result<RunOutcome> {
    let reports = registry.harvest_all(cancel).await;
    let lists = reports.into_iter().map(|r| r.candidates).collect();

    let outcome = sieve(lists, checker, criteria, prefilter_candidates, cancel).await?;
    Ok(outcome)
}
