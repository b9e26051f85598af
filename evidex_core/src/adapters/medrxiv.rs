//! medRxiv preprint adapter.
//!
//! The bioRxiv/medRxiv details API has no keyword search endpoint, so the
//! adapter pulls the recent posting window and filters it by query terms
//! client-side. Preprints rank below the peer-reviewed sources in the
//! priority table regardless.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::identifiers::normalize_doi;
use crate::query::meaningful_terms;
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const DETAILS_URL: &str = "https://api.biorxiv.org/details/medrxiv";

/// How far back the recent-postings window reaches.
const WINDOW_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    collection: Vec<Preprint>,
}

#[derive(Debug, Deserialize)]
struct Preprint {
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    authors: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(rename = "abstract", default)]
    abstract_text: Option<String>,
}

pub struct MedRxivAdapter {
    client: reqwest::Client,
}

impl MedRxivAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
        })
    }
}

#[async_trait]
impl SourceAdapter for MedRxivAdapter {
    fn source(&self) -> Source {
        Source::MedRxiv
    }

    fn description(&self) -> &'static str {
        "medRxiv: health-science preprints from the last posting window."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let end = Utc::now().format("%Y-%m-%d").to_string();
        let start = (Utc::now() - Duration::days(WINDOW_DAYS))
            .format("%Y-%m-%d")
            .to_string();
        let url = format!("{}/{}/{}/0", DETAILS_URL, start, end);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), self.source()));
        }

        let body: DetailsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("medrxiv json: {}", e)))?;

        debug!(target: "evidex::adapters::medrxiv", window = body.collection.len(), "medrxiv window fetched");
        Ok(filter_and_normalize(body.collection, query, limit))
    }
}

/// Keep preprints matching at least one query term in title or abstract,
/// ordered by match count so the densest matches lead.
fn filter_and_normalize(preprints: Vec<Preprint>, query: &str, limit: usize) -> Vec<Candidate> {
    let terms = meaningful_terms(&query.to_lowercase());
    if terms.is_empty() {
        return Vec::new();
    }

    let mut matched: Vec<(usize, Preprint)> = preprints
        .into_iter()
        .filter_map(|p| {
            let haystack = format!(
                "{} {}",
                p.title.as_deref().unwrap_or(""),
                p.abstract_text.as_deref().unwrap_or("")
            )
            .to_lowercase();
            let hits = terms.iter().filter(|t| haystack.contains(t.as_str())).count();
            if hits > 0 {
                Some((hits, p))
            } else {
                None
            }
        })
        .collect();

    matched.sort_by_key(|(hits, _)| std::cmp::Reverse(*hits));

    matched
        .into_iter()
        .take(limit)
        .enumerate()
        .filter_map(|(idx, (_, p))| normalize_preprint(p, idx + 1))
        .collect()
}

fn normalize_preprint(preprint: Preprint, rank: usize) -> Option<Candidate> {
    let title = preprint.title.as_deref().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return None;
    }

    let mut candidate = Candidate::new(Source::MedRxiv, title, rank)
        .with_journal("medRxiv (preprint)")
        .with_authors(split_authors(preprint.authors.as_deref().unwrap_or("")));

    if let Some(text) = preprint.abstract_text {
        candidate = candidate.with_abstract(text);
    }
    if let Some(year) = preprint
        .date
        .as_deref()
        .and_then(|d| d.get(0..4))
        .and_then(|y| y.parse::<i32>().ok())
    {
        candidate = candidate.with_year(year);
    }
    if let Some(doi) = preprint.doi.as_deref().and_then(normalize_doi) {
        candidate.url = Some(format!("https://www.medrxiv.org/content/{}", doi));
        candidate = candidate.with_doi(doi);
    }

    Some(candidate)
}

/// medRxiv author strings are "Last, F.; Last, F." — flatten to
/// "Last F" display names.
fn split_authors(authors: &str) -> Vec<String> {
    authors
        .split(';')
        .map(|a| {
            a.split(',')
                .map(|part| part.trim().trim_end_matches('.'))
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|a| !a.is_empty())
        .collect()
}
