// src/lib.rs
pub mod adapters;
pub mod dedup;
pub mod error;
pub mod evidence;
pub mod fanout;
pub mod identifiers;
pub mod pipeline;
pub mod profile;
pub mod query;
pub mod ratelimit;
pub mod score;
pub mod select;
pub mod synthesis;
pub mod types;
pub mod vocab;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

pub use crate::error::{PipelineError, SourceError};
pub use crate::pipeline::{ResearchOutcome, ResearchPipeline, ResearchRequest};
pub use crate::types::{Candidate, Citation, EvidenceTier, MergedCandidate, ScoredCandidate, Source};

/// One external bibliographic database.
///
/// Adapters are immutable after construction (keys are read from the
/// environment when built), so the registry shares them as plain `Arc`s
/// across concurrent requests.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Which source this adapter fronts.
    fn source(&self) -> Source;

    /// Returns a description of the adapter.
    fn description(&self) -> &'static str;

    /// Run one search and normalize the response into Candidates.
    ///
    /// Must contain per-item faults (skip the unparseable item, keep the
    /// rest) and return a typed `SourceError` for whole-response failures
    /// instead of panicking past the boundary. Candidate order is the
    /// source's own relevance order.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError>;
}

pub struct SourceRegistry {
    pub adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        SourceRegistry {
            adapters: HashMap::new(),
        }
    }

    pub fn register(&mut self, adapter: Arc<dyn SourceAdapter>) {
        self.adapters.insert(adapter.source(), adapter);
    }

    pub fn get(&self, source: Source) -> Option<&Arc<dyn SourceAdapter>> {
        self.adapters.get(&source)
    }

    pub fn sources(&self) -> Vec<Source> {
        let mut sources: Vec<Source> = self.adapters.keys().copied().collect();
        sources.sort();
        sources
    }

    pub fn list(&self) -> Vec<AdapterInfo> {
        let mut infos: Vec<AdapterInfo> = self
            .adapters
            .values()
            .map(|a| AdapterInfo {
                source: a.source(),
                description: a.description().to_string(),
            })
            .collect();
        infos.sort_by_key(|i| i.source);
        infos
    }
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a registry with every source enabled via Cargo features, each
/// wrapped in the shared rate limiter.
pub fn build_default_registry() -> SourceRegistry {
    let limiter = Arc::new(ratelimit::RateLimiter::with_default_rates());
    build_registry_with_limiter(limiter)
}

pub fn build_registry_with_limiter(limiter: Arc<ratelimit::RateLimiter>) -> SourceRegistry {
    #[allow(unused_mut)]
    let mut registry = SourceRegistry::new();

    macro_rules! throttled {
        ($adapter:expr) => {
            Arc::new(ratelimit::ThrottledAdapter::new(
                Arc::new($adapter),
                Arc::clone(&limiter),
            ))
        };
    }

    #[cfg(feature = "pubmed")]
    {
        if let Ok(adapter) = adapters::pubmed::PubMedAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "europepmc")]
    {
        if let Ok(adapter) = adapters::europepmc::EuropePmcAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "semantic-scholar")]
    {
        if let Ok(adapter) = adapters::semantic_scholar::SemanticScholarAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "crossref")]
    {
        if let Ok(adapter) = adapters::crossref::CrossrefAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "openalex")]
    {
        if let Ok(adapter) = adapters::openalex::OpenAlexAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "openfda")]
    {
        if let Ok(adapter) = adapters::openfda::OpenFdaAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "medrxiv")]
    {
        if let Ok(adapter) = adapters::medrxiv::MedRxivAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    #[cfg(feature = "clinicaltrials")]
    {
        if let Ok(adapter) = adapters::clinicaltrials::ClinicalTrialsAdapter::new() {
            registry.register(throttled!(adapter));
        }
    }

    registry
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AdapterInfo {
    pub source: Source,
    pub description: String,
}
