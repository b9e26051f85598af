//! Evidence-hierarchy classification.
//!
//! Keyword/pattern matching over title, venue and abstract, checked from
//! the strongest study design down so mixed signals resolve upward
//! ("systematic review of randomized trials" classifies as review).

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Candidate, EvidenceTier};

/// Phrase table per tier, strongest first. Versioned alongside the vocab
/// tables; order within a tier does not matter.
const TIER_PATTERNS: &[(EvidenceTier, &[&str])] = &[
    (
        EvidenceTier::SystematicReview,
        &[
            "systematic review",
            "meta-analysis",
            "meta analysis",
            "metaanalysis",
            "pooled analysis",
            "umbrella review",
            "cochrane",
        ],
    ),
    (
        EvidenceTier::Guideline,
        &[
            "guideline",
            "guidelines",
            "consensus statement",
            "practice parameter",
            "position statement",
            "recommendations for",
        ],
    ),
    (
        EvidenceTier::RandomizedTrial,
        &[
            "randomized controlled trial",
            "randomised controlled trial",
            "randomized clinical trial",
            "randomised clinical trial",
            "randomized trial",
            "randomised trial",
            "placebo-controlled",
            "double-blind",
            "open-label trial",
        ],
    ),
    (
        EvidenceTier::Cohort,
        &[
            "cohort study",
            "cohort",
            "case-control",
            "longitudinal study",
            "prospective study",
            "retrospective study",
            "follow-up study",
        ],
    ),
    (
        EvidenceTier::CrossSectional,
        &[
            "cross-sectional",
            "prevalence study",
            "survey of",
            "questionnaire study",
        ],
    ),
    (
        EvidenceTier::CaseReport,
        &[
            "case report",
            "case series",
            "expert opinion",
            "editorial",
            "letter to the editor",
        ],
    ),
];

/// Trial-registry identifiers count as randomized-trial evidence even
/// when the title never says "randomized".
static TRIAL_REGISTRY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(NCT\d{8}|ISRCTN\d{8}|EudraCT)\b").expect("registry regex"));

/// Classify one candidate. Unclassifiable records fall to the lowest
/// tier rather than erroring.
pub fn classify(candidate: &Candidate) -> EvidenceTier {
    let haystack = format!(
        "{} {} {}",
        candidate.title,
        candidate.journal.as_deref().unwrap_or(""),
        candidate.abstract_text.as_deref().unwrap_or("")
    )
    .to_lowercase();

    for (tier, phrases) in TIER_PATTERNS {
        if phrases.iter().any(|p| haystack.contains(p)) {
            return *tier;
        }
    }

    let registry_haystack = format!(
        "{} {}",
        candidate.external_id.as_deref().unwrap_or(""),
        candidate.abstract_text.as_deref().unwrap_or("")
    );
    if TRIAL_REGISTRY_RE.is_match(&registry_haystack) {
        return EvidenceTier::RandomizedTrial;
    }

    EvidenceTier::CaseReport
}
