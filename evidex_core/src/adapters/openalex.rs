//! OpenAlex works adapter.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::identifiers::{normalize_doi, normalize_pmid};
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const WORKS_URL: &str = "https://api.openalex.org/works";

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(default)]
    publication_year: Option<i32>,
    #[serde(default)]
    authorships: Vec<Authorship>,
    #[serde(default)]
    primary_location: Option<Location>,
    #[serde(default)]
    ids: Option<WorkIds>,
    /// OpenAlex ships abstracts as {word -> positions} for legal reasons;
    /// the text is reconstructed client-side.
    #[serde(default)]
    abstract_inverted_index: Option<HashMap<String, Vec<usize>>>,
}

#[derive(Debug, Deserialize)]
struct Authorship {
    #[serde(default)]
    author: Option<AuthorRef>,
}

#[derive(Debug, Deserialize)]
struct AuthorRef {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Location {
    #[serde(default)]
    source: Option<LocationSource>,
    #[serde(default)]
    landing_page_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LocationSource {
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkIds {
    #[serde(default)]
    openalex: Option<String>,
    #[serde(default)]
    pmid: Option<String>,
}

pub struct OpenAlexAdapter {
    client: reqwest::Client,
}

impl OpenAlexAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
        })
    }

    fn build_url(query: &str, limit: usize) -> Result<Url, SourceError> {
        let mut url = Url::parse(WORKS_URL)
            .map_err(|e| SourceError::Other(format!("bad openalex url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("search", query)
            .append_pair("per-page", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SourceAdapter for OpenAlexAdapter {
    fn source(&self) -> Source {
        Source::OpenAlex
    }

    fn description(&self) -> &'static str {
        "OpenAlex: open catalog of scholarly works, authors and venues."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let url = Self::build_url(query, limit)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), self.source()));
        }

        let body: WorksResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("openalex json: {}", e)))?;

        debug!(target: "evidex::adapters::openalex", count = body.results.len(), "openalex search returned");
        Ok(normalize_works(body.results))
    }
}

fn normalize_works(works: Vec<Work>) -> Vec<Candidate> {
    works
        .into_iter()
        .enumerate()
        .filter_map(|(idx, work)| normalize_work(work, idx + 1))
        .collect()
}

fn normalize_work(work: Work, rank: usize) -> Option<Candidate> {
    let title = work.display_name.as_deref().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return None;
    }

    let authors: Vec<String> = work
        .authorships
        .iter()
        .filter_map(|a| a.author.as_ref().and_then(|r| r.display_name.clone()))
        .collect();

    let mut candidate = Candidate::new(Source::OpenAlex, title, rank).with_authors(authors);

    if let Some(doi) = work.doi.as_deref().and_then(normalize_doi) {
        candidate = candidate.with_doi(doi);
    }
    if let Some(year) = work.publication_year {
        candidate = candidate.with_year(year);
    }
    if let Some(location) = &work.primary_location {
        if let Some(journal) = location.source.as_ref().and_then(|s| s.display_name.clone()) {
            candidate = candidate.with_journal(journal);
        }
        if let Some(url) = location.landing_page_url.clone() {
            candidate = candidate.with_url(url);
        }
    }
    if let Some(ids) = &work.ids {
        if let Some(pmid) = ids
            .pmid
            .as_deref()
            .map(|p| p.rsplit('/').next().unwrap_or(p))
            .and_then(normalize_pmid)
        {
            candidate = candidate.with_external_id(format!("PMID:{}", pmid));
        } else if let Some(id) = &ids.openalex {
            candidate = candidate.with_external_id(id.clone());
        }
    }
    if let Some(index) = &work.abstract_inverted_index {
        candidate = candidate.with_abstract(reconstruct_abstract(index));
    }

    Some(candidate)
}

/// Rebuild abstract text from the inverted index: place each word at its
/// recorded positions, then join in order. Gaps (positions missing from
/// the index) collapse silently.
fn reconstruct_abstract(index: &HashMap<String, Vec<usize>>) -> String {
    let mut positions: Vec<(usize, &str)> = index
        .iter()
        .flat_map(|(word, at)| at.iter().map(move |pos| (*pos, word.as_str())))
        .collect();
    positions.sort_unstable_by_key(|(pos, _)| *pos);
    positions
        .into_iter()
        .map(|(_, word)| word)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_from_json(value: serde_json::Value) -> Work {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_reconstruct_abstract() {
        let index: HashMap<String, Vec<usize>> = serde_json::from_value(serde_json::json!({
            "migraine": [2],
            "Despite": [0],
            "advances,": [1],
            "persists.": [3]
        }))
        .unwrap();
        assert_eq!(
            reconstruct_abstract(&index),
            "Despite advances, migraine persists."
        );
    }

    #[test]
    fn test_normalize_work() {
        let work = work_from_json(serde_json::json!({
            "display_name": "Triptans revisited",
            "doi": "https://doi.org/10.1046/j.1468-2982.2002.00404.x",
            "publication_year": 2002,
            "authorships": [
                {"author": {"display_name": "Peter J. Goadsby"}},
                {"author": null}
            ],
            "primary_location": {
                "source": {"display_name": "Cephalalgia"},
                "landing_page_url": "https://example.org/paper"
            },
            "ids": {"openalex": "https://openalex.org/W123", "pmid": "https://pubmed.ncbi.nlm.nih.gov/12230591"},
            "abstract_inverted_index": {"Triptans": [0], "work.": [1]}
        }));

        let c = normalize_work(work, 1).unwrap();
        assert_eq!(c.title, "Triptans revisited");
        assert_eq!(
            c.doi.as_deref(),
            Some("10.1046/j.1468-2982.2002.00404.x")
        );
        assert_eq!(c.external_id.as_deref(), Some("PMID:12230591"));
        assert_eq!(c.authors, vec!["Peter J. Goadsby"]);
        assert_eq!(c.journal.as_deref(), Some("Cephalalgia"));
        assert_eq!(c.abstract_text.as_deref(), Some("Triptans work."));
    }

    #[test]
    fn test_work_without_pmid_uses_openalex_id() {
        let work = work_from_json(serde_json::json!({
            "display_name": "W",
            "ids": {"openalex": "https://openalex.org/W42"}
        }));
        let c = normalize_work(work, 1).unwrap();
        assert_eq!(c.external_id.as_deref(), Some("https://openalex.org/W42"));
    }
}
