//! Answer Synthesizer boundary.
//!
//! The pipeline never calls the language model itself; it produces the
//! citation list and this module owns the prompt format plus an opaque
//! client for a messages-style completion endpoint. Callers that want a
//! prose answer pass the pipeline output through a `AnswerSynthesizer`.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};

use crate::types::Citation;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const DEFAULT_MODEL: &str = "claude-3-7-sonnet-latest";
const DEFAULT_MAX_TOKENS: u64 = 1024;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Synthesizer API key not set")]
    MissingKey,

    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    #[error("Synthesizer returned status {status}: {detail}")]
    UpstreamStatus { status: u16, detail: String },

    #[error("Malformed synthesizer response: {0}")]
    Malformed(String),
}

/// Build the synthesis prompt: question plus the numbered citation list,
/// with instructions to cite by number and admit gaps.
pub fn build_prompt(query: &str, citations: &[Citation], low_confidence: bool) -> String {
    let mut prompt = String::new();
    prompt.push_str(
        "You are a medical research assistant. Answer the question using ONLY \
         the numbered sources below. Cite sources inline as [n]. If the sources \
         do not support an answer, say so plainly.\n\n",
    );
    prompt.push_str(&format!("Question: {}\n\nSources:\n", query));

    for (idx, citation) in citations.iter().enumerate() {
        let authors = if citation.authors.is_empty() {
            "Unknown authors".to_string()
        } else if citation.authors.len() > 3 {
            format!("{} et al.", citation.authors[0])
        } else {
            citation.authors.join(", ")
        };
        let year = citation
            .year
            .map(|y| y.to_string())
            .unwrap_or_else(|| "n.d.".to_string());
        prompt.push_str(&format!(
            "[{}] {} ({}). {}. {}{} [{}]\n",
            idx + 1,
            authors,
            year,
            citation.title,
            citation.journal.as_deref().unwrap_or("Unknown venue"),
            citation
                .identifier
                .as_deref()
                .map(|id| format!(". {}", id))
                .unwrap_or_default(),
            citation.evidence_label,
        ));
    }

    if citations.is_empty() {
        prompt.push_str("(no sources passed the relevance filters)\n");
    }
    if low_confidence {
        prompt.push_str(
            "\nNote: source coverage for this question is thin; state clearly that \
             the evidence base retrieved here is limited.\n",
        );
    }
    prompt
}

/// An opaque prose-answer collaborator.
#[async_trait]
pub trait AnswerSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        query: &str,
        citations: &[Citation],
        low_confidence: bool,
    ) -> Result<String, SynthesisError>;
}

/// Claude messages-API implementation.
pub struct ClaudeSynthesizer {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    max_tokens: u64,
}

impl ClaudeSynthesizer {
    pub fn new() -> Result<Self, SynthesisError> {
        let client = reqwest::Client::builder()
            .user_agent("evidex/0.2")
            .build()
            .map_err(SynthesisError::HttpRequest)?;

        Ok(Self {
            client,
            api_key: std::env::var("ANTHROPIC_API_KEY").ok(),
            model: std::env::var("EVIDEX_SYNTH_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_headers(&self) -> Result<HeaderMap, SynthesisError> {
        let key = self.api_key.as_ref().ok_or(SynthesisError::MissingKey)?;
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(key).map_err(|_| SynthesisError::MissingKey)?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        Ok(headers)
    }
}

#[async_trait]
impl AnswerSynthesizer for ClaudeSynthesizer {
    async fn synthesize(
        &self,
        query: &str,
        citations: &[Citation],
        low_confidence: bool,
    ) -> Result<String, SynthesisError> {
        let headers = self.build_headers()?;
        let prompt = build_prompt(query, citations, low_confidence);

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": [ { "role": "user", "content": prompt } ]
        });

        let resp = self
            .client
            .post(MESSAGES_URL)
            .headers(headers)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let value: Value = resp.json().await?;
        if !status.is_success() {
            return Err(SynthesisError::UpstreamStatus {
                status: status.as_u16(),
                detail: value.to_string(),
            });
        }

        // Aggregate text parts
        let answer = value
            .get("content")
            .and_then(|c| c.as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        if answer.is_empty() {
            return Err(SynthesisError::Malformed(
                "response contained no text content".into(),
            ));
        }
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EvidenceTier, Source};

    fn citation(title: &str, authors: Vec<&str>) -> Citation {
        Citation {
            title: title.to_string(),
            authors: authors.into_iter().map(String::from).collect(),
            journal: Some("N Engl J Med".to_string()),
            year: Some(2017),
            identifier: Some("doi:10.1056/nejmoa1709038".to_string()),
            url: None,
            evidence_tier: EvidenceTier::RandomizedTrial,
            evidence_label: EvidenceTier::RandomizedTrial.label().to_string(),
            relevance_score: 0.8,
            sources: vec![Source::PubMed],
        }
    }

    #[test]
    fn test_prompt_numbers_citations() {
        let prompt = build_prompt(
            "migraine treatment",
            &[
                citation("Erenumab trial", vec!["Goadsby PJ"]),
                citation("Topiramate study", vec!["Silberstein SD"]),
            ],
            false,
        );
        assert!(prompt.contains("[1] Goadsby PJ (2017). Erenumab trial"));
        assert!(prompt.contains("[2] Silberstein SD"));
        assert!(prompt.contains("Question: migraine treatment"));
    }

    #[test]
    fn test_prompt_truncates_long_author_lists() {
        let prompt = build_prompt(
            "q",
            &[citation("T", vec!["A", "B", "C", "D", "E"])],
            false,
        );
        assert!(prompt.contains("A et al."));
        assert!(!prompt.contains("A, B, C, D"));
    }

    #[test]
    fn test_low_confidence_note_included() {
        let with = build_prompt("q", &[], true);
        let without = build_prompt("q", &[], false);
        assert!(with.contains("limited"));
        assert!(!without.contains("limited"));
    }

    #[test]
    fn test_missing_key_fails_before_network() {
        let synthesizer = ClaudeSynthesizer {
            client: reqwest::Client::new(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: 10,
        };
        assert!(matches!(
            synthesizer.build_headers(),
            Err(SynthesisError::MissingKey)
        ));
    }
}
