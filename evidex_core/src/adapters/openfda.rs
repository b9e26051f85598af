//! openFDA drug-label adapter.
//!
//! Structured product labels rather than literature; candidates carry the
//! label's indications text as their abstract so the scorer can judge
//! topical relevance the same way it does for papers.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use super::{build_client, DEFAULT_USER_AGENT};
use crate::error::SourceError;
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

const LABEL_URL: &str = "https://api.fda.gov/drug/label.json";

/// Labels repeat entire prescribing sections; keep the abstract bounded.
const MAX_ABSTRACT_CHARS: usize = 1200;

#[derive(Debug, Deserialize)]
struct LabelResponse {
    #[serde(default)]
    results: Vec<Label>,
}

#[derive(Debug, Deserialize)]
struct Label {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    effective_time: Option<String>,
    #[serde(default)]
    indications_and_usage: Vec<String>,
    #[serde(default)]
    openfda: Option<OpenFdaMeta>,
}

#[derive(Debug, Deserialize)]
struct OpenFdaMeta {
    #[serde(default)]
    brand_name: Vec<String>,
    #[serde(default)]
    generic_name: Vec<String>,
    #[serde(default)]
    manufacturer_name: Vec<String>,
}

pub struct OpenFdaAdapter {
    client: reqwest::Client,
}

impl OpenFdaAdapter {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: build_client(DEFAULT_USER_AGENT)?,
        })
    }

    fn build_url(query: &str, limit: usize) -> Result<Url, SourceError> {
        let mut url = Url::parse(LABEL_URL)
            .map_err(|e| SourceError::Other(format!("bad openfda url: {}", e)))?;
        // Quote each term: the openfda query grammar treats bare spaces
        // as OR.
        let search = query
            .split_whitespace()
            .map(|t| format!("\"{}\"", t))
            .collect::<Vec<_>>()
            .join(" AND ");
        url.query_pairs_mut()
            .append_pair("search", &format!("indications_and_usage:({})", search))
            .append_pair("limit", &limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl SourceAdapter for OpenFdaAdapter {
    fn source(&self) -> Source {
        Source::OpenFda
    }

    fn description(&self) -> &'static str {
        "openFDA: FDA-approved drug labels (indications, warnings, usage)."
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        let url = Self::build_url(query, limit)?;
        let response = self.client.get(url).send().await?;

        // openFDA answers an unmatched search with 404 rather than an
        // empty result set.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(SourceError::from_status(response.status(), self.source()));
        }

        let body: LabelResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(format!("openfda json: {}", e)))?;

        debug!(target: "evidex::adapters::openfda", count = body.results.len(), "openfda search returned");
        Ok(normalize_labels(body.results))
    }
}

fn normalize_labels(labels: Vec<Label>) -> Vec<Candidate> {
    labels
        .into_iter()
        .enumerate()
        .filter_map(|(idx, label)| normalize_label(label, idx + 1))
        .collect()
}

fn normalize_label(label: Label, rank: usize) -> Option<Candidate> {
    let meta = label.openfda.as_ref();
    let brand = meta.and_then(|m| m.brand_name.first()).map(|s| s.as_str());
    let generic = meta.and_then(|m| m.generic_name.first()).map(|s| s.as_str());

    let title = match (brand, generic) {
        (Some(b), Some(g)) if !b.eq_ignore_ascii_case(g) => {
            format!("{} ({}) — FDA prescribing information", b, g)
        }
        (Some(b), _) => format!("{} — FDA prescribing information", b),
        (None, Some(g)) => format!("{} — FDA prescribing information", g),
        (None, None) => return None,
    };

    let mut candidate = Candidate::new(Source::OpenFda, title, rank);

    if let Some(text) = label.indications_and_usage.first() {
        let mut text = text.trim().to_string();
        if text.len() > MAX_ABSTRACT_CHARS {
            let cut = text
                .char_indices()
                .map(|(i, c)| i + c.len_utf8())
                .take_while(|end| *end <= MAX_ABSTRACT_CHARS)
                .last()
                .unwrap_or(0);
            text.truncate(cut);
        }
        candidate = candidate.with_abstract(text);
    }
    if let Some(manufacturer) = meta.and_then(|m| m.manufacturer_name.first()) {
        candidate = candidate.with_authors(vec![manufacturer.clone()]);
    }
    if let Some(year) = label
        .effective_time
        .as_deref()
        .and_then(|t| t.get(0..4))
        .and_then(|y| y.parse::<i32>().ok())
    {
        candidate = candidate.with_year(year);
    }
    if let Some(id) = label.id {
        candidate = candidate.with_external_id(format!("SPL:{}", id));
    }

    Some(candidate)
}
