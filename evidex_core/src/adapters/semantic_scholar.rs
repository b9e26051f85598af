//! Semantic Scholar Academic Graph adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::identifiers::{normalize_doi, normalize_pmid};
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const SEARCH_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

const FIELDS: &str = "paperId,title,abstract,venue,year,authors,externalIds,url";

#[derive(Debug, Deserialize)]
struct PaperSearchResponse {
    #[serde(default)]
    data: Vec<Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Paper {
    paper_id: String,
    title: Option<String>,
    #[serde(rename = "abstract")]
    abstract_field: Option<String>,
    venue: Option<String>,
    year: Option<i64>,
    #[serde(default)]
    authors: Vec<Author>,
    external_ids: Option<ExternalIds>,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "PubMed")]
    pub_med: Option<String>,
}

pub struct SemanticScholarAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl SemanticScholarAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
            api_key: std::env::var("SEMANTIC_SCHOLAR_API_KEY").ok(),
        })
    }

    fn build_url(query: &str, limit: usize) -> String {
        format!(
            "{}?query={}&limit={}&fields={}",
            SEARCH_URL,
            urlencoding::encode(query),
            limit,
            FIELDS
        )
    }
}

#[async_trait]
impl SourceAdapter for SemanticScholarAdapter {
    fn source(&self) -> Source {
        Source::SemanticScholar
    }

    fn description(&self) -> &'static str {
        "Semantic Scholar: AI-curated scholarly graph across all fields of science."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let url = Self::build_url(query, limit);
        let mut request = self.client.get(&url);
        if let Some(api_key) = &self.api_key {
            request = request.header("x-api-key", api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), self.source()));
        }

        let body: PaperSearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("semantic scholar json: {}", e)))?;

        debug!(target: "evidex::adapters::semantic_scholar", count = body.data.len(), "semantic scholar search returned");
        Ok(normalize_papers(body.data))
    }
}

fn normalize_papers(papers: Vec<Paper>) -> Vec<Candidate> {
    papers
        .into_iter()
        .enumerate()
        .filter_map(|(idx, paper)| normalize_paper(paper, idx + 1))
        .collect()
}

fn normalize_paper(paper: Paper, rank: usize) -> Option<Candidate> {
    let title = paper.title.as_deref().map(str::trim).unwrap_or("");
    if title.is_empty() {
        return None;
    }

    let authors: Vec<String> = paper
        .authors
        .iter()
        .filter_map(|a| a.name.clone())
        .filter(|n| !n.is_empty())
        .collect();

    let mut candidate = Candidate::new(Source::SemanticScholar, title, rank)
        .with_authors(authors)
        .with_external_id(format!("S2:{}", paper.paper_id));

    if let Some(text) = paper.abstract_field {
        candidate = candidate.with_abstract(text);
    }
    if let Some(venue) = paper.venue {
        candidate = candidate.with_journal(venue);
    }
    if let Some(year) = paper.year {
        candidate = candidate.with_year(year as i32);
    }
    if let Some(ids) = paper.external_ids {
        if let Some(doi) = ids.doi.as_deref().and_then(normalize_doi) {
            candidate = candidate.with_doi(doi);
        }
        // A PubMed id is a stronger cross-source key than the S2 paper id.
        if let Some(pmid) = ids.pub_med.as_deref().and_then(normalize_pmid) {
            candidate = candidate.with_external_id(format!("PMID:{}", pmid));
        }
    }
    if let Some(url) = paper.url {
        candidate = candidate.with_url(url);
    }

    Some(candidate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper_from_json(value: serde_json::Value) -> Paper {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_paper() {
        let paper = paper_from_json(serde_json::json!({
            "paperId": "649def34f8be52c8b66281af98ae884c09aef38b",
            "title": "CGRP antagonists for migraine prevention",
            "abstract": "We review CGRP-targeted therapies.",
            "venue": "Cephalalgia",
            "year": 2022,
            "authors": [{"authorId": "1", "name": "A. Charles"}, {"authorId": null, "name": null}],
            "externalIds": {"DOI": "10.1177/0333102421999999", "PubMed": "35012345"},
            "url": "https://www.semanticscholar.org/paper/649def"
        }));

        let c = normalize_paper(paper, 1).unwrap();
        assert_eq!(c.title, "CGRP antagonists for migraine prevention");
        assert_eq!(c.authors, vec!["A. Charles"]);
        assert_eq!(c.doi.as_deref(), Some("10.1177/0333102421999999"));
        assert_eq!(c.external_id.as_deref(), Some("PMID:35012345"));
        assert_eq!(c.year, Some(2022));
    }

    #[test]
    fn test_paper_without_pmid_keeps_s2_id() {
        let paper = paper_from_json(serde_json::json!({
            "paperId": "abc123",
            "title": "Untethered paper",
            "externalIds": {}
        }));
        let c = normalize_paper(paper, 3).unwrap();
        assert_eq!(c.external_id.as_deref(), Some("S2:abc123"));
        assert!(c.doi.is_none());
    }

    #[test]
    fn test_null_title_drops_paper() {
        let paper = paper_from_json(serde_json::json!({"paperId": "x", "title": null}));
        assert!(normalize_paper(paper, 1).is_none());
    }

    #[test]
    fn test_build_url_encodes_query() {
        let url = SemanticScholarAdapter::build_url("migraine & \"aura\"", 10);
        assert!(url.contains("query=migraine%20%26%20%22aura%22"));
        assert!(url.contains("limit=10"));
    }
}
