//! Query planning: turns one free-text question into per-source search
//! strings, with bounded synonym expansion and intent detection.

use crate::types::Source;
use crate::vocab::{
    QueryIntent, INTENT_TRIGGERS, MAX_ALTERNATES_PER_CONCEPT, STOP_WORDS, SYNONYMS,
};

/// A concept found in the query plus its bounded synonym alternates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConceptExpansion {
    pub phrase: String,
    pub alternates: Vec<String>,
}

/// The per-request query plan consumed by the fan-out coordinator.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    /// Verbatim user input, whitespace-collapsed.
    pub raw: String,

    /// Meaningful tokens after lowercasing and stop-word removal. Used by
    /// the relevance scorer as the term set to match against.
    pub terms: Vec<String>,

    /// Concepts with synonym alternates, used by boolean-capable sources.
    pub concepts: Vec<ConceptExpansion>,

    pub intent: Option<QueryIntent>,

    /// True when the query has fewer than 3 meaningful tokens; the scorer
    /// relaxes its specificity gate to avoid zero-result starvation.
    pub relaxed_specificity: bool,
}

impl QueryPlan {
    /// Search string for one source. Boolean syntax where the upstream
    /// supports it, cleaned free text otherwise. Falls back to the
    /// verbatim input whenever expansion produced nothing usable.
    pub fn query_for(&self, source: Source) -> String {
        match source {
            Source::PubMed | Source::EuropePmc => self.boolean_query(),
            _ => self.free_text_query(),
        }
    }

    fn boolean_query(&self) -> String {
        if self.concepts.is_empty() && self.terms.is_empty() {
            return self.raw.clone();
        }

        let mut clauses: Vec<String> = Vec::new();
        let mut covered: Vec<&str> = Vec::new();

        for concept in &self.concepts {
            if concept.alternates.is_empty() {
                clauses.push(concept.phrase.clone());
            } else {
                let mut alts: Vec<String> = vec![quote_if_phrase(&concept.phrase)];
                alts.extend(concept.alternates.iter().map(|a| quote_if_phrase(a)));
                clauses.push(format!("({})", alts.join(" OR ")));
            }
            for word in concept.phrase.split_whitespace() {
                covered.push(word);
            }
        }

        // Terms not already covered by a concept clause join with AND.
        for term in &self.terms {
            if !covered.iter().any(|c| c == term) {
                clauses.push(term.clone());
            }
        }

        if clauses.is_empty() {
            self.raw.clone()
        } else {
            clauses.join(" AND ")
        }
    }

    fn free_text_query(&self) -> String {
        if self.terms.is_empty() {
            self.raw.clone()
        } else {
            self.terms.join(" ")
        }
    }
}

fn quote_if_phrase(s: &str) -> String {
    if s.contains(' ') {
        format!("\"{}\"", s)
    } else {
        s.to_string()
    }
}

/// Build the plan for one request. Never fails: a query the expansion
/// logic cannot classify degrades to verbatim free text for every source.
pub fn build_plan(raw: &str) -> QueryPlan {
    let raw = collapse_whitespace(raw);
    let lowered = raw.to_lowercase();

    let terms = meaningful_terms(&lowered);
    let concepts = detect_concepts(&lowered);
    let intent = detect_intent(&lowered);
    let relaxed_specificity = terms.len() < 3;

    QueryPlan {
        raw,
        terms,
        concepts,
        intent,
        relaxed_specificity,
    }
}

/// Lowercased tokens with punctuation stripped and stop words removed.
pub fn meaningful_terms(lowered: &str) -> Vec<String> {
    lowered
        .split(|c: char| !c.is_alphanumeric() && c != '-')
        .map(|t| t.trim_matches('-'))
        .filter(|t| t.len() > 1)
        .filter(|t| !STOP_WORDS.contains(t))
        .map(|t| t.to_string())
        .collect()
}

/// Longest-match concept detection against the synonym table. A concept
/// phrase that is a substring of an already-matched phrase is skipped so
/// "diabetes" does not re-trigger inside "diabetes mellitus".
fn detect_concepts(lowered: &str) -> Vec<ConceptExpansion> {
    let mut hits: Vec<(&str, &[&str])> = SYNONYMS
        .iter()
        .filter(|(phrase, _)| contains_phrase(lowered, phrase))
        .map(|(phrase, alts)| (*phrase, *alts))
        .collect();

    // Longest phrases first, then drop phrases contained in a kept one.
    hits.sort_by_key(|(phrase, _)| std::cmp::Reverse(phrase.len()));
    let mut kept: Vec<(&str, &[&str])> = Vec::new();
    for (phrase, alts) in hits {
        if !kept.iter().any(|(k, _)| k.contains(phrase)) {
            kept.push((phrase, alts));
        }
    }
    kept.sort_by_key(|(phrase, _)| lowered.find(*phrase).unwrap_or(usize::MAX));

    kept.into_iter()
        .map(|(phrase, alts)| ConceptExpansion {
            phrase: phrase.to_string(),
            alternates: alts
                .iter()
                .take(MAX_ALTERNATES_PER_CONCEPT)
                .map(|a| a.to_string())
                .collect(),
        })
        .collect()
}

/// Word-boundary phrase containment; avoids "flu" matching inside
/// "influence".
pub(crate) fn contains_phrase(text: &str, phrase: &str) -> bool {
    let mut start = 0;
    while let Some(pos) = text[start..].find(phrase) {
        let abs = start + pos;
        let before_ok = abs == 0
            || !text[..abs]
                .chars()
                .next_back()
                .is_some_and(|c| c.is_alphanumeric());
        let after = abs + phrase.len();
        let after_ok = after >= text.len()
            || !text[after..].chars().next().is_some_and(|c| c.is_alphanumeric());
        if before_ok && after_ok {
            return true;
        }
        start = abs + phrase.len().max(1);
        if start >= text.len() {
            break;
        }
    }
    false
}

/// First intent whose trigger terms appear in the query wins, scanning
/// categories in table order (treatment before prognosis, matching how
/// ambiguous queries read).
fn detect_intent(lowered: &str) -> Option<QueryIntent> {
    for (intent, triggers) in INTENT_TRIGGERS {
        if triggers.iter().any(|t| contains_phrase(lowered, t)) {
            return Some(*intent);
        }
    }
    None
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
