//! Approximate matching of a request against indexed configurations.
//!
//! | Component | Points |
//! |-----------|--------|
//! | same mapping strategy | 50 |
//! | circle count | `max(0, 25 − 5·|Δcircles|)` |
//! | segment count | `max(0, 25 − 2·|Δsegments|)` |
//!
//! The best candidate is accepted only if its score is strictly greater than
//! the resolver's minimum (30 by default). Candidates with equal scores keep
//! index order, so the first-indexed one wins.
//!
//! # Examples
//!
//! ```
//! use primemap::{Configuration, MappingStrategy};
//! use primemap::resolver::similarity_score;
//!
//! let want = Configuration::new(10, 24, MappingStrategy::Linear)?;
//! let have = Configuration::new(11, 20, MappingStrategy::Linear)?;
//! assert_eq!(similarity_score(&want, &want), 100);
//! assert_eq!(similarity_score(&want, &have), 50 + 20 + 17);
//! # Ok::<(), primemap::Error>(())
//! ```

use tracing::debug;

use crate::configuration::Configuration;
use crate::index::IndexEntry;

/// Default acceptance threshold. Scores must be strictly above it.
pub const DEFAULT_MIN_SCORE: u32 = 30;

/// Score of an exact match.
pub const MAX_SCORE: u32 = 100;

/// Similarity of `candidate` to `requested`, `0..=100`.
pub fn similarity_score(requested: &Configuration, candidate: &Configuration) -> u32 {
    let mapping = if requested.mapping() == candidate.mapping() {
        50
    } else {
        0
    };
    let dc = u64::from(requested.circle_count().abs_diff(candidate.circle_count()));
    let ds = u64::from(
        requested
            .segments_per_circle()
            .abs_diff(candidate.segments_per_circle()),
    );
    let circles = 25u64.saturating_sub(dc.saturating_mul(5));
    let segments = 25u64.saturating_sub(ds.saturating_mul(2));
    mapping + circles as u32 + segments as u32
}

/// A scored candidate.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    /// The indexed entry.
    pub entry: IndexEntry,
    /// Its similarity to the request.
    pub score: u32,
}

/// Picks stored datasets that can stand in for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchResolver {
    min_score: u32,
}

impl Default for MatchResolver {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SCORE)
    }
}

impl MatchResolver {
    /// Resolver accepting scores strictly above `min_score`.
    pub const fn new(min_score: u32) -> Self {
        Self { min_score }
    }

    /// The acceptance threshold.
    pub const fn min_score(&self) -> u32 {
        self.min_score
    }

    /// True if `score` qualifies.
    #[inline]
    pub const fn accepts(&self, score: u32) -> bool {
        score > self.min_score
    }

    /// The best acceptable candidate, if any.
    pub fn best(&self, requested: &Configuration, entries: &[IndexEntry]) -> Option<Match> {
        self.ranked(requested, entries).into_iter().next()
    }

    /// Every acceptable candidate, best first, one per key.
    ///
    /// Entries sharing a key collapse to the most recent one, ranked at the
    /// position of the first. The sort is stable, so ties keep index order.
    pub fn ranked(&self, requested: &Configuration, entries: &[IndexEntry]) -> Vec<Match> {
        let mut candidates: Vec<Match> = Vec::new();
        for entry in entries {
            if let Some(existing) = candidates.iter_mut().find(|m| m.entry.key == entry.key) {
                existing.entry = entry.clone();
                continue;
            }
            let score = similarity_score(requested, &entry.configuration);
            candidates.push(Match {
                entry: entry.clone(),
                score,
            });
        }
        candidates.retain(|m| self.accepts(m.score));
        candidates.sort_by(|a, b| b.score.cmp(&a.score));
        debug!(
            requested_circles = requested.circle_count(),
            requested_segments = requested.segments_per_circle(),
            accepted = candidates.len(),
            best = candidates.first().map(|m| m.score),
            "candidates scored"
        );
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::ConfigurationKey;
    use crate::mapping::MappingStrategy;
    use std::path::PathBuf;

    fn config(c: u32, s: u32, m: MappingStrategy) -> Configuration {
        Configuration::new(c, s, m).unwrap()
    }

    fn entry(c: u32, s: u32, m: MappingStrategy) -> IndexEntry {
        let configuration = config(c, s, m);
        IndexEntry {
            key: ConfigurationKey::of(&configuration),
            element_count: configuration.limit(),
            configuration,
            prime_count: 0,
            density: 0.0,
            file: PathBuf::new(),
            size_bytes: 0,
            created_at: 0,
        }
    }

    #[test]
    fn identical_scores_max() {
        let c = config(10, 24, MappingStrategy::Linear);
        assert_eq!(similarity_score(&c, &c), MAX_SCORE);
    }

    #[test]
    fn mapping_difference_caps_at_fifty() {
        let a = config(10, 24, MappingStrategy::Linear);
        for m in MappingStrategy::ALL.into_iter().skip(1) {
            assert_eq!(similarity_score(&a, &config(10, 24, m)), 50);
        }
    }

    #[test]
    fn components_floor_at_zero() {
        let a = config(10, 24, MappingStrategy::Linear);
        assert_eq!(similarity_score(&a, &config(15, 24, MappingStrategy::Linear)), 75);
        assert_eq!(similarity_score(&a, &config(100, 24, MappingStrategy::Linear)), 75);
        assert_eq!(similarity_score(&a, &config(10, 37, MappingStrategy::Linear)), 75);
        assert_eq!(similarity_score(&a, &config(10_000, 1_300, MappingStrategy::Logarithmic)), 0);
    }

    #[test]
    fn threshold_is_strict() {
        let r = MatchResolver::new(75);
        let want = config(10, 24, MappingStrategy::Linear);
        assert!(r.best(&want, &[entry(15, 24, MappingStrategy::Linear)]).is_none());
        let m = r.best(&want, &[entry(14, 24, MappingStrategy::Linear)]).unwrap();
        assert_eq!(m.score, 80);
    }

    #[test]
    fn default_rejects_far_candidates() {
        let want = config(10, 24, MappingStrategy::Linear);
        let far = entry(1_000, 1_000, MappingStrategy::Linear);
        // 50 + 0 + 0 is accepted: same mapping alone clears 30.
        assert_eq!(MatchResolver::default().best(&want, &[far]).unwrap().score, 50);
        let other = entry(1_000, 1_000, MappingStrategy::Logarithmic);
        assert!(MatchResolver::default().best(&want, &[other]).is_none());
        let near_other = entry(10, 24, MappingStrategy::Logarithmic);
        assert_eq!(MatchResolver::default().best(&want, &[near_other]).unwrap().score, 50);
    }

    #[test]
    fn ties_keep_index_order() {
        let want = config(10, 24, MappingStrategy::Linear);
        let first = entry(11, 24, MappingStrategy::Linear);
        let second = entry(9, 24, MappingStrategy::Linear);
        let best = MatchResolver::default()
            .best(&want, &[first.clone(), second])
            .unwrap();
        assert_eq!(best.entry, first);
    }

    #[test]
    fn ranking_is_descending_and_deduplicated() {
        let want = config(10, 24, MappingStrategy::Linear);
        let a = entry(12, 24, MappingStrategy::Linear);
        let b = entry(10, 24, MappingStrategy::Linear);
        let mut a_again = a.clone();
        a_again.size_bytes = 9;
        let ranked = MatchResolver::default().ranked(&want, &[a, b.clone(), a_again]);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].entry, b);
        assert_eq!(ranked[1].entry.size_bytes, 9);
        assert!(ranked[0].score >= ranked[1].score);
    }
}
