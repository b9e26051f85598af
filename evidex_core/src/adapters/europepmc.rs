//! Europe PMC REST adapter.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::identifiers::{normalize_doi, normalize_pmid};
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const SEARCH_URL: &str = "https://www.ebi.ac.uk/europepmc/webservices/rest/search";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "resultList")]
    result_list: Option<ResultList>,
}

#[derive(Debug, Deserialize)]
struct ResultList {
    #[serde(default)]
    result: Vec<EpmcResult>,
}

#[derive(Debug, Deserialize)]
struct EpmcResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    pmid: Option<String>,
    #[serde(default)]
    doi: Option<String>,
    #[serde(rename = "authorString", default)]
    author_string: Option<String>,
    #[serde(rename = "journalTitle", default)]
    journal_title: Option<String>,
    #[serde(rename = "pubYear", default)]
    pub_year: Option<String>,
    #[serde(rename = "abstractText", default)]
    abstract_text: Option<String>,
}

pub struct EuropePmcAdapter {
    client: reqwest::Client,
}

impl EuropePmcAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
        })
    }

    fn build_url(query: &str, limit: usize) -> Result<Url, SourceError> {
        let mut url = Url::parse(SEARCH_URL)
            .map_err(|e| SourceError::Other(format!("bad europepmc url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("query", query)
            .append_pair("format", "json")
            .append_pair("resultType", "core")
            .append_pair("pageSize", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SourceAdapter for EuropePmcAdapter {
    fn source(&self) -> Source {
        Source::EuropePmc
    }

    fn description(&self) -> &'static str {
        "Europe PMC: life-science literature including PubMed, PMC full text and preprints."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let url = Self::build_url(query, limit)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), self.source()));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("europepmc json: {}", e)))?;

        let results = body.result_list.map(|l| l.result).unwrap_or_default();
        debug!(target: "evidex::adapters::europepmc", count = results.len(), "europepmc search returned");
        Ok(normalize_results(results))
    }
}

fn normalize_results(results: Vec<EpmcResult>) -> Vec<Candidate> {
    results
        .into_iter()
        .enumerate()
        .filter_map(|(idx, item)| normalize_result(item, idx + 1))
        .collect()
}

fn normalize_result(item: EpmcResult, rank: usize) -> Option<Candidate> {
    let title = item.title?.trim().trim_end_matches('.').to_string();
    if title.is_empty() {
        return None;
    }

    let mut candidate = Candidate::new(Source::EuropePmc, title, rank)
        .with_authors(split_author_string(item.author_string.as_deref().unwrap_or("")));

    if let Some(text) = item.abstract_text {
        candidate = candidate.with_abstract(text);
    }
    if let Some(journal) = item.journal_title {
        candidate = candidate.with_journal(journal);
    }
    if let Some(year) = item.pub_year.as_deref().and_then(|y| y.parse::<i32>().ok()) {
        candidate = candidate.with_year(year);
    }
    if let Some(doi) = item.doi.as_deref().and_then(normalize_doi) {
        candidate = candidate.with_doi(doi);
    }
    if let Some(pmid) = item.pmid.as_deref().and_then(normalize_pmid) {
        candidate.url = Some(format!("https://europepmc.org/abstract/MED/{}", pmid));
        candidate = candidate.with_external_id(format!("PMID:{}", pmid));
    }

    Some(candidate)
}

/// Europe PMC gives authors as one display string: "Smith J, Jones AB,
/// Brown C.". Split into plain names.
fn split_author_string(authors: &str) -> Vec<String> {
    authors
        .trim_end_matches('.')
        .split(',')
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect()
}
