//! Typed per-source outcomes for one fan-out.

use serde::{Deserialize, Serialize};

use crate::error::SourceError;
use crate::types::{Candidate, Source};

/// Successful results from a single source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReturn {
    pub source: Source,

    /// Normalized candidates, in the source's own relevance order.
    pub candidates: Vec<Candidate>,

    /// Number of candidates returned
    pub count: usize,

    /// Time taken to fetch results (ms)
    pub duration_ms: u64,
}

/// A source that failed, timed out, or was rate-limited during one
/// fan-out; degraded, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFailure {
    pub source: Source,

    /// Stable failure class ("timeout", "rate_limited",
    /// "malformed_response", ...)
    pub kind: String,

    /// Human-readable detail
    pub message: String,

    /// Whether a rate-limit retry was attempted before giving up
    #[serde(default)]
    pub retried: bool,
}

impl SourceFailure {
    pub fn from_error(source: Source, error: &SourceError, retried: bool) -> Self {
        Self {
            source,
            kind: error.kind_str().to_string(),
            message: error.to_string(),
            retried,
        }
    }
}

/// Complete results of one fan-out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanoutReport {
    /// The search query as planned (raw user form)
    pub query: String,

    /// Sources that completed successfully
    pub completed: Vec<SourceReturn>,

    /// Sources that failed (partial results)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,

    /// Total candidates across all completed sources
    pub total_candidates: usize,

    /// Whether results are partial (some sources failed/timed out)
    #[serde(default)]
    pub partial: bool,

    /// Total wall-clock time for the fan-out (ms)
    pub duration_ms: u64,
}

impl FanoutReport {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            completed: Vec::new(),
            failures: Vec::new(),
            total_candidates: 0,
            partial: false,
            duration_ms: 0,
        }
    }

    pub fn add_return(&mut self, source_return: SourceReturn) {
        self.total_candidates += source_return.count;
        self.completed.push(source_return);
    }

    pub fn add_failure(&mut self, failure: SourceFailure) {
        self.failures.push(failure);
        self.partial = true;
    }

    /// Names of every degraded source, for the caller-facing contract.
    pub fn degraded_sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.failures.iter().map(|f| f.source).collect();
        sources.sort();
        sources
    }

    /// Check if every attempted source failed.
    pub fn all_failed(&self) -> bool {
        self.completed.is_empty() && !self.failures.is_empty()
    }

    /// Flatten all candidates, consuming the report's returns.
    pub fn into_candidates(self) -> Vec<Candidate> {
        self.completed
            .into_iter()
            .flat_map(|r| r.candidates)
            .collect()
    }
}
