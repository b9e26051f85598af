//! Deduplication of candidates across sources.
//!
//! Three passes: exact merge on normalized DOI, exact merge on PMID,
//! fuzzy merge on normalized title plus first-author surname similarity.
//! Unmatched candidates pass through as singleton merges. Metadata
//! conflicts resolve by the `Source::priority_rank` table.

use std::collections::HashMap;

use strsim::jaro_winkler;
use unicode_normalization::UnicodeNormalization;

use crate::types::{Candidate, MergedCandidate};

/// Minimum Jaro-Winkler similarity between normalized titles for a fuzzy
/// merge.
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.93;

/// Minimum similarity between first-author surnames when both sides have
/// author lists.
pub const SURNAME_SIMILARITY_THRESHOLD: f64 = 0.85;

struct MergeGroup {
    members: Vec<Candidate>,
    normalized_title: String,
}

/// Merge all candidates for one request into deduplicated representatives.
///
/// Idempotent: running the output's records through again produces no
/// further merges.
pub fn deduplicate(candidates: Vec<Candidate>) -> Vec<MergedCandidate> {
    let mut groups: Vec<MergeGroup> = Vec::new();
    let mut by_doi: HashMap<String, usize> = HashMap::new();
    let mut by_pmid: HashMap<String, usize> = HashMap::new();

    for candidate in candidates {
        let doi_key = candidate.doi.clone();
        let pmid_key = pmid_key(&candidate);

        let existing = doi_key
            .as_ref()
            .and_then(|d| by_doi.get(d).copied())
            .or_else(|| pmid_key.as_ref().and_then(|p| by_pmid.get(p).copied()))
            .or_else(|| fuzzy_match(&groups, &candidate));

        let group_idx = match existing {
            Some(idx) => {
                groups[idx].members.push(candidate);
                idx
            }
            None => {
                groups.push(MergeGroup {
                    normalized_title: normalize_title(&candidate.title),
                    members: vec![candidate],
                });
                groups.len() - 1
            }
        };

        // A candidate carrying both keys bridges the indexes so a later
        // DOI-only and PMID-only pair land in the same group.
        if let Some(doi) = doi_key {
            by_doi.entry(doi).or_insert(group_idx);
        }
        if let Some(pmid) = pmid_key {
            by_pmid.entry(pmid).or_insert(group_idx);
        }
    }

    groups.into_iter().map(merge_group).collect()
}

fn pmid_key(candidate: &Candidate) -> Option<String> {
    candidate
        .external_id
        .as_deref()
        .and_then(|id| id.strip_prefix("PMID:"))
        .map(|p| p.to_string())
}

fn fuzzy_match(groups: &[MergeGroup], candidate: &Candidate) -> Option<usize> {
    let title = normalize_title(&candidate.title);
    if title.is_empty() {
        return None;
    }
    groups.iter().position(|group| {
        jaro_winkler(&group.normalized_title, &title) >= TITLE_SIMILARITY_THRESHOLD
            && authors_compatible(&group.members[0], candidate)
    })
}

/// Same work if the lead surnames agree; when either side has no author
/// list the year is the only remaining check (preprint vs. published
/// versions may differ by one).
fn authors_compatible(a: &Candidate, b: &Candidate) -> bool {
    match (first_author_surname(a), first_author_surname(b)) {
        (Some(sa), Some(sb)) => jaro_winkler(&sa, &sb) >= SURNAME_SIMILARITY_THRESHOLD,
        _ => match (a.year, b.year) {
            (Some(ya), Some(yb)) => (ya - yb).abs() <= 1,
            _ => true,
        },
    }
}

/// Longest normalized token of the first author. Handles both "Goadsby
/// PJ" and "Peter J. Goadsby" orderings, where the surname is the longest
/// token in practice.
fn first_author_surname(candidate: &Candidate) -> Option<String> {
    let first = candidate.authors.first()?;
    normalize_text(first)
        .split_whitespace()
        .max_by_key(|t| t.len())
        .map(|t| t.to_string())
}

fn merge_group(group: MergeGroup) -> MergedCandidate {
    let mut members = group.members;

    // Winner by priority table, then by the source's own ordering.
    members.sort_by_key(|c| (c.source.priority_rank(), c.source_rank));

    let mut contributing: Vec<_> = members.iter().map(|c| c.source).collect();
    contributing.sort();
    contributing.dedup();

    let mut iter = members.into_iter();
    let mut record = iter.next().expect("merge group is never empty");
    let priority_rank = record.source.priority_rank();

    // The winner's populated fields stand; only gaps fill from the rest.
    for other in iter {
        if record.abstract_text.is_none() {
            record.abstract_text = other.abstract_text;
        }
        if record.authors.is_empty() {
            record.authors = other.authors;
        }
        if record.journal.is_none() {
            record.journal = other.journal;
        }
        if record.year.is_none() {
            record.year = other.year;
        }
        if record.doi.is_none() {
            record.doi = other.doi;
        }
        if record.external_id.is_none() {
            record.external_id = other.external_id;
        }
        if record.url.is_none() {
            record.url = other.url;
        }
    }

    MergedCandidate {
        record,
        contributing_sources: contributing,
        priority_rank,
    }
}

/// Case/punctuation/diacritic-insensitive title form for comparison.
pub fn normalize_title(title: &str) -> String {
    let mut result = normalize_text(title);
    for prefix in ["a ", "an ", "the "] {
        if let Some(stripped) = result.strip_prefix(prefix) {
            result = stripped.to_string();
            break;
        }
    }
    result
}

fn normalize_text(text: &str) -> String {
    let ascii: String = text
        .nfkd()
        .filter(|c| c.is_ascii_alphanumeric() || c.is_ascii_whitespace())
        .collect();
    ascii
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;

    fn candidate(source: Source, title: &str) -> Candidate {
        Candidate::new(source, title, 1)
    }

    #[test]
    fn test_doi_merge_across_sources() {
        let a = candidate(Source::Crossref, "SGLT2 Inhibitors in Heart Failure")
            .with_doi("10.1056/nejmoa2022190");
        let b = candidate(Source::PubMed, "SGLT2 inhibitors in heart failure.")
            .with_doi("10.1056/nejmoa2022190")
            .with_abstract("Trial abstract.");

        let merged = deduplicate(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].contributing_sources.len(), 2);
        // PubMed outranks Crossref, so its casing wins and its abstract
        // carries.
        assert_eq!(merged[0].record.source, Source::PubMed);
        assert!(merged[0].record.abstract_text.is_some());
    }

    #[test]
    fn test_pmid_merge() {
        let a = candidate(Source::PubMed, "Title A").with_external_id("PMID:123");
        let b = candidate(Source::EuropePmc, "Title A variant").with_external_id("PMID:123");
        let merged = deduplicate(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].priority_rank, Source::PubMed.priority_rank());
    }

    #[test]
    fn test_fuzzy_title_and_author_merge() {
        let a = candidate(Source::PubMed, "Erenumab for Episodic Migraine")
            .with_authors(vec!["Goadsby PJ".to_string()])
            .with_year(2017);
        let b = candidate(Source::OpenAlex, "Erenumab for episodic migraine.")
            .with_authors(vec!["Peter J. Goadsby".to_string()])
            .with_year(2017);
        let merged = deduplicate(vec![a, b]);
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn test_different_authors_block_fuzzy_merge() {
        let a = candidate(Source::PubMed, "Outcomes of stroke rehabilitation")
            .with_authors(vec!["Smith J".to_string()]);
        let b = candidate(Source::OpenAlex, "Outcomes of stroke rehabilitation")
            .with_authors(vec!["Nakamura K".to_string()]);
        let merged = deduplicate(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_unrelated_titles_pass_through() {
        let a = candidate(Source::PubMed, "Migraine prophylaxis with propranolol");
        let b = candidate(Source::Crossref, "Statins for hyperlipidemia");
        let merged = deduplicate(vec![a, b]);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn test_singleton_passthrough_keeps_metadata() {
        let a = candidate(Source::OpenFda, "Drug label").with_year(2020);
        let merged = deduplicate(vec![a]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].contributing_sources, vec![Source::OpenFda]);
        assert_eq!(merged[0].record.year, Some(2020));
    }

    #[test]
    fn test_idempotence() {
        let input = vec![
            candidate(Source::PubMed, "Erenumab for Episodic Migraine")
                .with_doi("10.1056/nejmoa1709038"),
            candidate(Source::Crossref, "Erenumab for episodic migraine")
                .with_doi("10.1056/nejmoa1709038"),
            candidate(Source::OpenAlex, "A different paper entirely"),
        ];
        let first = deduplicate(input);
        let records: Vec<Candidate> = first.iter().map(|m| m.record.clone()).collect();
        let second = deduplicate(records);
        assert_eq!(first.len(), second.len());
        for m in &second {
            assert_eq!(m.contributing_sources.len(), 1);
        }
    }

    #[test]
    fn test_doi_bridges_pmid_groups() {
        // b carries both keys and must land a and c in one group.
        let a = candidate(Source::Crossref, "Bridged work").with_doi("10.1/bridge");
        let b = candidate(Source::PubMed, "Bridged work")
            .with_doi("10.1/bridge")
            .with_external_id("PMID:42");
        let c = candidate(Source::EuropePmc, "Bridged work, revisited edition")
            .with_external_id("PMID:42");
        let merged = deduplicate(vec![a, b, c]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].contributing_sources.len(), 3);
    }

    #[test]
    fn test_normalize_title() {
        assert_eq!(
            normalize_title("The Glymphatic System: A Review"),
            "glymphatic system a review"
        );
        assert_eq!(normalize_title("Café-au-lait spots"), "cafeaulait spots");
    }
}
