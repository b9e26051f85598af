//! Crossref works API adapter.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::identifiers::normalize_doi;
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const WORKS_URL: &str = "https://api.crossref.org/works";

/// Crossref serves abstracts as JATS XML fragments.
static JATS_TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"</?[a-zA-Z][^>]*>").expect("jats regex"));

#[derive(Debug, Deserialize)]
struct WorksResponse {
    message: WorksMessage,
}

#[derive(Debug, Deserialize)]
struct WorksMessage {
    #[serde(default)]
    items: Vec<Work>,
}

#[derive(Debug, Deserialize)]
struct Work {
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<WorkAuthor>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    #[serde(default)]
    issued: Option<DateParts>,
    #[serde(rename = "abstract", default)]
    abstract_jats: Option<String>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorkAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DateParts {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Option<i32>>>,
}

pub struct CrossrefAdapter {
    client: reqwest::Client,
}

impl CrossrefAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
        })
    }

    fn build_url(query: &str, limit: usize) -> Result<Url, SourceError> {
        let mut url = Url::parse(WORKS_URL)
            .map_err(|e| SourceError::Other(format!("bad crossref url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("rows", &limit.to_string())
            .append_pair(
                "select",
                "DOI,title,author,container-title,issued,abstract,URL",
            );
        Ok(url)
    }
}

#[async_trait]
impl SourceAdapter for CrossrefAdapter {
    fn source(&self) -> Source {
        Source::Crossref
    }

    fn description(&self) -> &'static str {
        "Crossref: publisher-registered scholarly works metadata keyed by DOI."
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
            .map_err(|e| SourceError::Malformed(format!("crossref json: {}", e)))?;

        debug!(target: "evidex::adapters::crossref", count = body.message.items.len(), "crossref search returned");
        Ok(normalize_works(body.message.items))
    }
}

fn normalize_works(items: Vec<Work>) -> Vec<Candidate> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(idx, work)| normalize_work(work, idx + 1))
        .collect()
}

fn normalize_work(work: Work, rank: usize) -> Option<Candidate> {
    let title = work.title.first().map(|t| t.trim()).unwrap_or("");
    if title.is_empty() {
        return None;
    }

    let mut candidate = Candidate::new(Source::Crossref, title, rank)
        .with_authors(work.author.iter().filter_map(flatten_author).collect());

    if let Some(journal) = work.container_title.into_iter().next() {
        candidate = candidate.with_journal(journal);
    }
    if let Some(year) = work.issued.as_ref().and_then(issued_year) {
        candidate = candidate.with_year(year);
    }
    if let Some(doi) = work.doi.as_deref().and_then(normalize_doi) {
        candidate = candidate.with_doi(doi);
    }
    if let Some(text) = work.abstract_jats.as_deref().map(strip_jats) {
        candidate = candidate.with_abstract(text);
    }
    if let Some(url) = work.url {
        candidate = candidate.with_url(url);
    }

    Some(candidate)
}

/// Crossref authors are {given, family} objects (or {name} for groups);
/// flatten to "Family Given" display names, never a debug dump.
fn flatten_author(author: &WorkAuthor) -> Option<String> {
    match (&author.family, &author.given, &author.name) {
        (Some(family), Some(given), _) => Some(format!("{} {}", family, given)),
        (Some(family), None, _) => Some(family.clone()),
        (None, _, Some(name)) => Some(name.clone()),
        _ => None,
    }
}

fn issued_year(issued: &DateParts) -> Option<i32> {
    issued.date_parts.first()?.first().copied().flatten()
}

fn strip_jats(jats: &str) -> String {
    let stripped = JATS_TAG_RE.replace_all(jats, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn work_from_json(value: serde_json::Value) -> Work {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_work() {
        let work = work_from_json(serde_json::json!({
            "DOI": "10.1016/S0140-6736(20)30925-9",
            "title": ["Global burden of migraine"],
            "author": [
                {"given": "Theo", "family": "Vos"},
                {"name": "GBD 2019 Collaborators"}
            ],
            "container-title": ["The Lancet"],
            "issued": {"date-parts": [[2020, 10, 17]]},
            "abstract": "<jats:p>Migraine is a leading cause of disability.</jats:p>",
            "URL": "https://doi.org/10.1016/s0140-6736(20)30925-9"
        }));

        let c = normalize_work(work, 2).unwrap();
        assert_eq!(c.title, "Global burden of migraine");
        assert_eq!(c.doi.as_deref(), Some("10.1016/s0140-6736(20)30925-9"));
        assert_eq!(c.year, Some(2020));
        assert_eq!(c.authors, vec!["Vos Theo", "GBD 2019 Collaborators"]);
        assert_eq!(
            c.abstract_text.as_deref(),
            Some("Migraine is a leading cause of disability.")
        );
        assert_eq!(c.source_rank, 2);
    }

    #[test]
    fn test_empty_title_drops_work() {
        let work = work_from_json(serde_json::json!({"DOI": "10.1/x", "title": []}));
        assert!(normalize_work(work, 1).is_none());
    }

    #[test]
    fn test_strip_jats_tags() {
        assert_eq!(
            strip_jats("<jats:sec><jats:title>Background</jats:title><jats:p>Text  here</jats:p></jats:sec>"),
            "Background Text here"
        );
    }

    #[test]
    fn test_issued_year_handles_missing_parts() {
        let issued: DateParts = serde_json::from_value(serde_json::json!({"date-parts": [[null]]})).unwrap();
        assert_eq!(issued_year(&issued), None);
        let issued: DateParts = serde_json::from_value(serde_json::json!({"date-parts": []})).unwrap();
        assert_eq!(issued_year(&issued), None);
    }
}
