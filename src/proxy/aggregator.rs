//! Merging of harvested candidate lists into a unique set

use crate::proxy::models::{Candidate, CandidateKey};
use std::collections::HashSet;
use tracing::debug;

/// Deduplicating accumulator keyed by [`CandidateKey`]
///
/// The first candidate seen for a key wins. Later duplicates are dropped even
/// when their claimed country, type or anonymity differ.
#[derive(Debug, Default)]
pub struct Aggregator {
    seen: HashSet<CandidateKey>,
    candidates: Vec<Candidate>,
    duplicates: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one candidate, returning `false` if its key was already present
    pub fn push(&mut self, candidate: Candidate) -> bool {
        if self.seen.insert(candidate.key()) {
            self.candidates.push(candidate);
            true
        } else {
            self.duplicates += 1;
            false
        }
    }

    /// Add every candidate of one source list
    pub fn extend<I>(&mut self, list: I) -> usize
    where
        I: IntoIterator<Item = Candidate>,
    {
        let mut added = 0;
        for candidate in list {
            if self.push(candidate) {
                added += 1;
            }
        }
        added
    }

    pub fn contains(&self, key: &CandidateKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Number of candidates dropped as duplicates so far
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn into_candidates(self) -> Vec<Candidate> {
        self.candidates
    }
}

/// Merge per-source lists into a unique sequence in first-occurrence order
pub fn aggregate<L>(lists: L) -> Vec<Candidate>
where
    L: IntoIterator<Item = Vec<Candidate>>,
{
    let mut aggregator = Aggregator::new();
    for list in lists {
        aggregator.extend(list);
    }

    debug!(
        unique = aggregator.len(),
        duplicates = aggregator.duplicates(),
        "Aggregated harvested candidates"
    );

    aggregator.into_candidates()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::{Anonymity, ProxyType};

    fn candidate(host: &str, port: u16, proxy_type: ProxyType, country: &str) -> Candidate {
        Candidate::new(host, port, proxy_type).with_country(country)
    }

    #[test]
    fn test_duplicate_address_collapses() {
        let a = candidate("1.1.1.1", 1080, ProxyType::Socks5, "FR");
        let b = candidate("2.2.2.2", 8080, ProxyType::Http, "DE");
        let a_dup = candidate("1.1.1.1", 1080, ProxyType::Socks5, "FR");

        let unique = aggregate(vec![vec![a.clone(), b.clone(), a_dup]]);
        assert_eq!(unique, vec![a, b]);
    }

    #[test]
    fn test_first_occurrence_wins_across_sources() {
        let first = candidate("1.1.1.1", 1080, ProxyType::Socks5, "FR")
            .with_anonymity(Anonymity::Elite);
        let conflicting = candidate("1.1.1.1", 1080, ProxyType::Http, "US");

        let unique = aggregate(vec![vec![first.clone()], vec![], vec![conflicting]]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0], first);
    }

    #[test]
    fn test_same_host_different_port_is_distinct() {
        let unique = aggregate(vec![
            vec![candidate("1.1.1.1", 1080, ProxyType::Socks5, "FR")],
            vec![candidate("1.1.1.1", 1081, ProxyType::Socks5, "FR")],
        ]);
        assert_eq!(unique.len(), 2);
    }

    #[test]
    fn test_empty_sources() {
        let unique = aggregate(Vec::<Vec<Candidate>>::new());
        assert!(unique.is_empty());

        let unique = aggregate(vec![vec![], vec![]]);
        assert!(unique.is_empty());
    }

    #[test]
    fn test_aggregator_counts() {
        let mut aggregator = Aggregator::new();
        let added = aggregator.extend(vec![
            candidate("1.1.1.1", 80, ProxyType::Http, "FR"),
            candidate("1.1.1.1", 80, ProxyType::Http, "FR"),
            candidate("3.3.3.3", 80, ProxyType::Http, "FR"),
        ]);
        assert_eq!(added, 2);
        assert_eq!(aggregator.len(), 2);
        assert_eq!(aggregator.duplicates(), 1);
        assert!(aggregator.contains(&CandidateKey::new("3.3.3.3", 80)));
    }

    #[test]
    fn test_no_two_entries_share_a_key() {
        let lists: Vec<Vec<Candidate>> = (0..5)
            .map(|source| {
                (0..20)
                    .map(|i| candidate(&format!("10.0.0.{}", (i + source) % 12), 3128, ProxyType::Http, "DE"))
                    .collect()
            })
            .collect();

        let unique = aggregate(lists);
        let keys: HashSet<_> = unique.iter().map(Candidate::key).collect();
        assert_eq!(keys.len(), unique.len());
        assert_eq!(unique.len(), 12);
    }
}
