//! Final citation selection: floor, ordering, cap.

use crate::profile::SelectorConfig;
use crate::types::{Citation, ScoredCandidate};

/// Selector output: the bounded, ordered citation list plus an explicit
/// confidence signal. Under-filling is preferred to padding with weak
/// matches, and it is reported, not hidden.
#[derive(Debug, Clone)]
pub struct Selection {
    pub citations: Vec<Citation>,
    pub low_confidence: bool,
}

/// Order and cap the scored candidates.
///
/// Primary key: evidence weight descending. Secondary: relevance score
/// descending. Tertiary: year descending. Determinism comes from these
/// keys alone, never from source-completion order.
pub fn select(scored: Vec<ScoredCandidate>, config: &SelectorConfig) -> Selection {
    let mut survivors: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|s| s.in_domain && s.relevance_score >= config.relevance_floor)
        .collect();

    survivors.sort_by(|a, b| {
        b.evidence_weight
            .cmp(&a.evidence_weight)
            .then_with(|| {
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| b.merged.record.year.cmp(&a.merged.record.year))
    });

    let low_confidence = survivors.len() < config.min_confident_results;

    let citations = survivors
        .iter()
        .take(config.max_citations)
        .map(Citation::from_scored)
        .collect();

    Selection {
        citations,
        low_confidence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Candidate, EvidenceTier, MergedCandidate, Source};

    fn scored(title: &str, tier: EvidenceTier, score: f64, year: Option<i32>) -> ScoredCandidate {
        let mut c = Candidate::new(Source::PubMed, title, 1);
        if let Some(y) = year {
            c = c.with_year(y);
        }
        ScoredCandidate {
            merged: MergedCandidate::singleton(c),
            relevance_score: score,
            in_domain: true,
            evidence_tier: tier,
            evidence_weight: tier.weight(),
        }
    }

    fn config() -> SelectorConfig {
        SelectorConfig::default()
    }

    #[test]
    fn test_tier_dominates_relevance() {
        let selection = select(
            vec![
                scored("cohort, very relevant", EvidenceTier::Cohort, 0.95, None),
                scored("review, less relevant", EvidenceTier::SystematicReview, 0.5, None),
            ],
            &config(),
        );
        assert_eq!(selection.citations[0].title, "review, less relevant");
    }

    #[test]
    fn test_score_breaks_ties_within_tier() {
        let selection = select(
            vec![
                scored("weaker", EvidenceTier::RandomizedTrial, 0.5, None),
                scored("stronger", EvidenceTier::RandomizedTrial, 0.8, None),
            ],
            &config(),
        );
        assert_eq!(selection.citations[0].title, "stronger");
    }

    #[test]
    fn test_recency_breaks_remaining_ties() {
        let selection = select(
            vec![
                scored("older", EvidenceTier::Cohort, 0.6, Some(2015)),
                scored("newer", EvidenceTier::Cohort, 0.6, Some(2023)),
            ],
            &config(),
        );
        assert_eq!(selection.citations[0].title, "newer");
    }

    #[test]
    fn test_cap_respected_for_any_input_size() {
        let many: Vec<ScoredCandidate> = (0..50)
            .map(|i| scored(&format!("paper {}", i), EvidenceTier::Cohort, 0.6, None))
            .collect();
        let selection = select(many, &config());
        assert!(selection.citations.len() <= config().max_citations);
    }

    #[test]
    fn test_floor_excludes_weak_matches_without_padding() {
        let selection = select(
            vec![
                scored("strong", EvidenceTier::Cohort, 0.7, None),
                scored("weak", EvidenceTier::SystematicReview, 0.1, None),
            ],
            &config(),
        );
        // The weak review is dropped even though the cap has room.
        assert_eq!(selection.citations.len(), 1);
        assert_eq!(selection.citations[0].title, "strong");
        assert!(selection.low_confidence);
    }

    #[test]
    fn test_out_of_domain_never_selected() {
        let mut out = scored("off-domain", EvidenceTier::SystematicReview, 0.9, None);
        out.in_domain = false;
        let selection = select(vec![out], &config());
        assert!(selection.citations.is_empty());
        assert!(selection.low_confidence);
    }

    #[test]
    fn test_enough_survivors_is_confident() {
        let selection = select(
            vec![
                scored("a", EvidenceTier::Cohort, 0.6, None),
                scored("b", EvidenceTier::Cohort, 0.6, None),
                scored("c", EvidenceTier::Cohort, 0.6, None),
            ],
            &config(),
        );
        assert!(!selection.low_confidence);
    }
}
