//! Relevance scoring: domain gate, lexical overlap, specificity gate,
//! intent bonus, clamp.

use std::collections::HashSet;

use crate::profile::ScoringConfig;
use crate::query::{contains_phrase, QueryPlan};
use crate::types::MergedCandidate;
use crate::vocab::{QueryIntent, DESCRIPTIVE_TERMS, DOMAIN_TERMS, INTENT_MATCH_TERMS};

/// Outcome of scoring one merged candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceAssessment {
    /// Clamped to [0, 1]; forced to 0 when `in_domain` is false.
    pub score: f64,
    pub in_domain: bool,
}

impl RelevanceAssessment {
    fn out_of_domain() -> Self {
        Self {
            score: 0.0,
            in_domain: false,
        }
    }
}

/// Score one candidate against the query plan.
pub fn assess(
    merged: &MergedCandidate,
    plan: &QueryPlan,
    config: &ScoringConfig,
) -> RelevanceAssessment {
    let record = &merged.record;
    let title = record.title.to_lowercase();
    let abstract_text = record
        .abstract_text
        .as_deref()
        .unwrap_or("")
        .to_lowercase();
    let full_text = format!("{} {}", title, abstract_text);

    let title_tokens = tokenize(&title);
    let full_tokens = tokenize(&full_text);

    // 1. Domain gate. Zero domain vocabulary always excludes; below the
    // threshold, a query term present in the title overrides the gate so
    // a precisely-on-topic paper with sparse vocabulary survives.
    let domain_hits = DOMAIN_TERMS
        .iter()
        .filter(|t| full_tokens.contains(**t))
        .count();
    let title_override = plan.terms.iter().any(|t| title_tokens.contains(t.as_str()));
    if domain_hits == 0 || (domain_hits < config.min_domain_hits && !title_override) {
        return RelevanceAssessment::out_of_domain();
    }

    if plan.terms.is_empty() {
        // Nothing to match against; domain membership alone is not
        // relevance.
        return RelevanceAssessment {
            score: 0.0,
            in_domain: true,
        };
    }

    // 2. Lexical overlap, title matches weighted above abstract matches.
    let total = plan.terms.len() as f64;
    let title_matches = plan
        .terms
        .iter()
        .filter(|t| title_tokens.contains(t.as_str()))
        .count();
    let any_matches = plan
        .terms
        .iter()
        .filter(|t| full_tokens.contains(t.as_str()))
        .count();
    let abstract_only_matches = any_matches - title_matches;

    let mut score = config.title_term_weight * (title_matches as f64 / total)
        + config.abstract_term_weight * (abstract_only_matches as f64 / total);

    // 3. Specificity gate: too few matched terms means same-domain but
    // off-topic; cap hard rather than letting bonuses rescue it.
    let matched_ratio = any_matches as f64 / total;
    let gated = matched_ratio < config.specificity_min_ratio && !plan.relaxed_specificity;
    if gated {
        score = score.min(config.specificity_cap);
    }

    // 4. Intent bonus / descriptive penalty.
    if let Some(intent) = plan.intent {
        if matches_intent(&full_text, intent) {
            if !gated {
                score += config.intent_bonus;
            }
        } else if is_interventional(intent) && is_descriptive(&full_text) {
            score *= config.descriptive_penalty;
        }
    }

    // 5. Clamp.
    RelevanceAssessment {
        score: score.clamp(0.0, 1.0),
        in_domain: true,
    }
}

fn matches_intent(text: &str, intent: QueryIntent) -> bool {
    INTENT_MATCH_TERMS
        .iter()
        .find(|(i, _)| *i == intent)
        .map(|(_, terms)| terms.iter().any(|t| contains_phrase(text, t)))
        .unwrap_or(false)
}

fn is_interventional(intent: QueryIntent) -> bool {
    matches!(intent, QueryIntent::Treatment | QueryIntent::Prevention)
}

fn is_descriptive(text: &str) -> bool {
    DESCRIPTIVE_TERMS.iter().any(|t| contains_phrase(text, t))
}

fn tokenize(text: &str) -> HashSet<&str> {
    text.split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|t| t.trim_matches('-'))
        .filter(|t| !t.is_empty())
        .collect()
}
