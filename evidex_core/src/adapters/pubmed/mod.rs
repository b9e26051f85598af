//! PubMed adapter over the NCBI E-utilities.
//!
//! Two-step fetch: `esearch` (JSON) resolves the query to a relevance-
//! ordered PMID list, `efetch` (XML) returns the article records. An
//! `NCBI_API_KEY` raises the published rate limit but is optional.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::identifiers::normalize_doi;
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

mod parse;
use parse::parse_efetch_articles;

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const EFETCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/efetch.fcgi";

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: Option<ESearchResult>,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

pub struct PubMedAdapter {
    client: reqwest::Client,
    api_key: Option<String>,
}

impl PubMedAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
            api_key: std::env::var("NCBI_API_KEY").ok(),
        })
    }

    async fn esearch(&self, query: &str, limit: usize) -> Result<Vec<String>, SourceError> {
        let mut url = Url::parse(ESEARCH_URL)
            .map_err(|e| SourceError::Other(format!("bad esearch url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("term", query)
            .append_pair("retmode", "json")
            .append_pair("retmax", &limit.to_string())
            .append_pair("sort", "relevance");
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), Source::PubMed));
        }

        let body: ESearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("esearch json: {}", e)))?;

        Ok(body.esearchresult.map(|r| r.idlist).unwrap_or_default())
    }

    async fn efetch(&self, pmids: &[String]) -> Result<String, SourceError> {
        let mut url = Url::parse(EFETCH_URL)
            .map_err(|e| SourceError::Other(format!("bad efetch url: {}", e)))?;
        url.query_pairs_mut()
            .append_pair("db", "pubmed")
            .append_pair("id", &pmids.join(","))
            .append_pair("retmode", "xml");
        if let Some(key) = &self.api_key {
            url.query_pairs_mut().append_pair("api_key", key);
        }

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), Source::PubMed));
        }
        response
            .text()
            .await
            .map_err(|e| SourceError::Malformed(format!("efetch body: {}", e)))
    }
}

#[async_trait]
impl SourceAdapter for PubMedAdapter {
    fn source(&self) -> Source {
        Source::PubMed
    }

    fn description(&self) -> &'static str {
        "PubMed: MEDLINE-indexed biomedical literature via NCBI E-utilities."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let pmids = self.esearch(query, limit).await?;
        if pmids.is_empty() {
            return Ok(Vec::new());
        }

        let xml = self.efetch(&pmids).await?;
        let articles = parse_efetch_articles(&xml)?;
        debug!(
            target: "evidex::adapters::pubmed",
            requested = pmids.len(),
            parsed = articles.len(),
            "pubmed efetch parsed"
        );

        // efetch does not guarantee the requested order; restore the
        // relevance order from the esearch id list.
        let mut by_pmid: std::collections::HashMap<String, parse::ParsedArticle> = articles
            .into_iter()
            .filter_map(|a| a.pmid.clone().map(|pmid| (pmid, a)))
            .collect();

        let candidates = pmids
            .iter()
            .filter_map(|pmid| by_pmid.remove(pmid))
            .enumerate()
            .filter_map(|(idx, article)| normalize_article(article, idx + 1))
            .collect();

        Ok(candidates)
    }
}

fn normalize_article(article: parse::ParsedArticle, rank: usize) -> Option<Candidate> {
    if article.title.is_empty() {
        return None;
    }

    let mut candidate = Candidate::new(Source::PubMed, article.title, rank)
        .with_authors(article.authors);

    if !article.abstract_text.is_empty() {
        candidate = candidate.with_abstract(article.abstract_text);
    }
    if !article.journal.is_empty() {
        candidate = candidate.with_journal(article.journal);
    }
    if let Some(year) = article.year {
        candidate = candidate.with_year(year);
    }
    if let Some(doi) = article.doi.as_deref().and_then(normalize_doi) {
        candidate = candidate.with_doi(doi);
    }
    if let Some(pmid) = article.pmid {
        candidate.url = Some(format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid));
        candidate = candidate.with_external_id(format!("PMID:{}", pmid));
    }

    Some(candidate)
}
