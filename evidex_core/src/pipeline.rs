//! End-to-end research pipeline: plan → fan out → dedup → score →
//! classify → select.
//!
//! Every stage after the fan-out is a synchronous, pure transformation
//! over already-collected immutable data; the only suspension points are
//! the adapter calls inside the coordinator.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::dedup::deduplicate;
use crate::error::PipelineError;
use crate::evidence::classify;
use crate::fanout::{FanoutCoordinator, SourceFailure};
use crate::profile::{ProfileStore, RunProfile};
use crate::query::build_plan;
use crate::score::assess;
use crate::select::select;
use crate::types::{Citation, ScoredCandidate, Source};
use crate::SourceRegistry;

/// Longest accepted query, in characters.
pub const MAX_QUERY_CHARS: usize = 500;

/// Caller-facing request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchRequest {
    pub query: String,

    /// Optional cap below the profile's `max_citations`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_results: None,
        }
    }
}

/// Per-source timing surfaced to the caller without the candidate
/// payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTiming {
    pub source: Source,
    pub count: usize,
    pub duration_ms: u64,
}

/// Caller-facing result: citations plus an honest account of coverage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchOutcome {
    pub query: String,

    /// Final ordered citations, at most the configured cap.
    pub citations: Vec<Citation>,

    /// Sources that failed or timed out this run.
    pub degraded_sources: Vec<Source>,

    /// Per-source failure detail for the degraded list.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<SourceFailure>,

    /// Set when fewer than the confident minimum survived selection.
    pub low_confidence: bool,

    /// Raw candidates collected before deduplication.
    pub candidates_considered: usize,

    /// Distinct works after deduplication.
    pub merged_works: usize,

    /// Per-source fetch timings for the sources that completed.
    pub source_timings: Vec<SourceTiming>,

    /// Total pipeline wall-clock (ms).
    pub duration_ms: u64,
}

/// The whole retrieval-and-ranking pipeline behind one call.
pub struct ResearchPipeline {
    registry: SourceRegistry,
    profile: RunProfile,
}

impl ResearchPipeline {
    pub fn new(registry: SourceRegistry, profile: RunProfile) -> Self {
        Self { registry, profile }
    }

    pub fn profile(&self) -> &RunProfile {
        &self.profile
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Run one research query.
    ///
    /// Absorbs every per-source failure into degraded metadata; the only
    /// errors are an invalid query and total fan-out failure.
    pub async fn run(&self, request: ResearchRequest) -> Result<ResearchOutcome, PipelineError> {
        self.run_with_store(request, None).await
    }

    pub async fn run_with_store(
        &self,
        request: ResearchRequest,
        store: Option<&ProfileStore>,
    ) -> Result<ResearchOutcome, PipelineError> {
        let started = std::time::Instant::now();

        let query = request.query.trim();
        if query.is_empty() {
            return Err(PipelineError::InvalidQuery("query is empty".into()));
        }
        if query.chars().count() > MAX_QUERY_CHARS {
            return Err(PipelineError::InvalidQuery(format!(
                "query exceeds {} characters",
                MAX_QUERY_CHARS
            )));
        }

        let plan = build_plan(query);
        debug!(
            target: "evidex::pipeline",
            terms = plan.terms.len(),
            concepts = plan.concepts.len(),
            intent = ?plan.intent,
            "query planned"
        );

        let coordinator = FanoutCoordinator::new(&self.registry);
        let report = coordinator.run(&plan, &self.profile, store).await;

        if report.all_failed() {
            return Err(PipelineError::AllSourcesFailed(report.failures.len()));
        }

        let degraded_sources = report.degraded_sources();
        let failures = report.failures.clone();
        let source_timings = report
            .completed
            .iter()
            .map(|r| SourceTiming {
                source: r.source,
                count: r.count,
                duration_ms: r.duration_ms,
            })
            .collect();

        let candidates = report.into_candidates();
        let candidates_considered = candidates.len();

        let merged = deduplicate(candidates);
        let merged_works = merged.len();

        let scored: Vec<ScoredCandidate> = merged
            .into_iter()
            .map(|m| {
                let assessment = assess(&m, &plan, &self.profile.scoring);
                let tier = classify(&m.record);
                ScoredCandidate {
                    relevance_score: assessment.score,
                    in_domain: assessment.in_domain,
                    evidence_tier: tier,
                    evidence_weight: tier.weight(),
                    merged: m,
                }
            })
            .collect();

        let mut selector = self.profile.selector.clone();
        if let Some(max) = request.max_results {
            selector.max_citations = selector.max_citations.min(max.max(1));
        }
        let selection = select(scored, &selector);

        info!(
            target: "evidex::pipeline",
            citations = selection.citations.len(),
            degraded = degraded_sources.len(),
            low_confidence = selection.low_confidence,
            considered = candidates_considered,
            "research query completed"
        );

        Ok(ResearchOutcome {
            query: query.to_string(),
            citations: selection.citations,
            degraded_sources,
            failures,
            low_confidence: selection.low_confidence,
            candidates_considered,
            merged_works,
            source_timings,
            duration_ms: started.elapsed().as_millis() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::types::{Candidate, EvidenceTier};
    use crate::SourceAdapter;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct StaticAdapter {
        source: Source,
        candidates: Vec<Candidate>,
    }

    #[async_trait]
    impl SourceAdapter for StaticAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn description(&self) -> &'static str {
            "static test adapter"
        }
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>, SourceError> {
            Ok(self.candidates.clone())
        }
    }

    struct TimeoutAdapter {
        source: Source,
    }

    #[async_trait]
    impl SourceAdapter for TimeoutAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn description(&self) -> &'static str {
            "timeout test adapter"
        }
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>, SourceError> {
            tokio::time::sleep(std::time::Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    fn pubmed_candidate(rank: usize, title: &str, doi: Option<&str>) -> Candidate {
        let mut c = Candidate::new(Source::PubMed, title, rank).with_abstract(
            "A randomized controlled trial of migraine treatment in patients; therapy reduced headache days.",
        );
        if let Some(doi) = doi {
            c = c.with_doi(doi);
        }
        c
    }

    fn crossref_candidate(rank: usize, title: &str, doi: Option<&str>) -> Candidate {
        let mut c = Candidate::new(Source::Crossref, title, rank).with_abstract(
            "Clinical cohort study of migraine treatment outcomes in patients under therapy.",
        );
        if let Some(doi) = doi {
            c = c.with_doi(doi);
        }
        c
    }

    fn test_profile(sources: &[Source]) -> RunProfile {
        let mut profile = RunProfile::new(
            "test",
            sources.iter().map(|s| s.as_str().to_string()).collect(),
        );
        profile.defaults.source_timeout_ms = 300;
        profile.defaults.global_timeout_ms = 2000;
        profile
    }

    fn scenario_registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticAdapter {
            source: Source::PubMed,
            candidates: vec![
                pubmed_candidate(1, "Migraine treatment with erenumab: a randomized trial", Some("10.1/dup")),
                pubmed_candidate(2, "Topiramate for migraine prevention in patients", None),
                pubmed_candidate(3, "Guidelines for acute migraine management in clinical practice", None),
                pubmed_candidate(4, "Triptans for acute migraine therapy", None),
                pubmed_candidate(5, "Propranolol in migraine prophylaxis", None),
            ],
        }));
        registry.register(Arc::new(TimeoutAdapter {
            source: Source::EuropePmc,
        }));
        registry.register(Arc::new(StaticAdapter {
            source: Source::Crossref,
            candidates: vec![
                crossref_candidate(1, "Migraine treatment with erenumab: a randomized trial", Some("10.1/dup")),
                crossref_candidate(2, "CGRP antagonists and migraine treatment", None),
                crossref_candidate(3, "Adherence to preventive migraine therapy among patients", None),
            ],
        }));
        registry
    }

    #[tokio::test]
    async fn test_partial_failure_scenario() {
        let profile = test_profile(&[Source::PubMed, Source::EuropePmc, Source::Crossref]);
        let pipeline = ResearchPipeline::new(scenario_registry(), profile);

        let outcome = pipeline
            .run(ResearchRequest::new("migraine treatment"))
            .await
            .unwrap();

        assert_eq!(outcome.candidates_considered, 8);
        // One DOI is shared between PubMed and Crossref.
        assert_eq!(outcome.merged_works, 7);
        assert_eq!(outcome.degraded_sources, vec![Source::EuropePmc]);
        assert!(!outcome.citations.is_empty());
        assert!(outcome.citations.len() <= 8);

        // Ordering: evidence weight descending, then relevance.
        for pair in outcome.citations.windows(2) {
            assert!(pair[0].evidence_tier.weight() >= pair[1].evidence_tier.weight());
        }
    }

    #[tokio::test]
    async fn test_non_medical_query_yields_empty_low_confidence() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticAdapter {
            source: Source::OpenAlex,
            candidates: vec![
                Candidate::new(Source::OpenAlex, "Density functional theory of band gaps", 1)
                    .with_abstract("We compute exchange-correlation functionals for crystals."),
            ],
        }));
        let profile = test_profile(&[Source::OpenAlex]);
        let pipeline = ResearchPipeline::new(registry, profile);

        let outcome = pipeline
            .run(ResearchRequest::new("density functional theory calculations"))
            .await
            .unwrap();

        assert!(outcome.citations.is_empty());
        assert!(outcome.low_confidence);
        assert_eq!(outcome.merged_works, 1);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let pipeline = ResearchPipeline::new(
            SourceRegistry::new(),
            test_profile(&[Source::PubMed]),
        );
        let result = pipeline.run(ResearchRequest::new("   ")).await;
        assert!(matches!(result, Err(PipelineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_overlong_query_rejected() {
        let pipeline = ResearchPipeline::new(
            SourceRegistry::new(),
            test_profile(&[Source::PubMed]),
        );
        let long = "migraine ".repeat(100);
        let result = pipeline.run(ResearchRequest::new(long)).await;
        assert!(matches!(result, Err(PipelineError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_total_failure_is_pipeline_error() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(TimeoutAdapter {
            source: Source::PubMed,
        }));
        registry.register(Arc::new(TimeoutAdapter {
            source: Source::Crossref,
        }));
        let profile = test_profile(&[Source::PubMed, Source::Crossref]);
        let pipeline = ResearchPipeline::new(registry, profile);

        let result = pipeline.run(ResearchRequest::new("migraine treatment")).await;
        assert!(matches!(result, Err(PipelineError::AllSourcesFailed(2))));
    }

    #[tokio::test]
    async fn test_max_results_tightens_cap() {
        let profile = test_profile(&[Source::PubMed, Source::Crossref]);
        let pipeline = ResearchPipeline::new(scenario_registry(), profile);

        let mut request = ResearchRequest::new("migraine treatment");
        request.max_results = Some(2);
        let outcome = pipeline.run(request).await.unwrap();
        assert!(outcome.citations.len() <= 2);
    }

    #[tokio::test]
    async fn test_citations_have_plain_author_strings() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticAdapter {
            source: Source::PubMed,
            candidates: vec![pubmed_candidate(
                1,
                "Migraine treatment with erenumab: a randomized trial",
                None,
            )
            .with_authors(vec!["Goadsby PJ".to_string(), "Reuter U".to_string()])],
        }));
        let profile = test_profile(&[Source::PubMed]);
        let pipeline = ResearchPipeline::new(registry, profile);

        let outcome = pipeline
            .run(ResearchRequest::new("migraine treatment"))
            .await
            .unwrap();
        for citation in &outcome.citations {
            for author in &citation.authors {
                assert!(!author.contains("[object"));
                assert!(!author.contains('{'));
            }
        }
    }

    #[tokio::test]
    async fn test_tier_labels_follow_classification() {
        let profile = test_profile(&[Source::PubMed]);
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticAdapter {
            source: Source::PubMed,
            candidates: vec![pubmed_candidate(
                1,
                "Systematic review and meta-analysis of migraine treatment",
                None,
            )],
        }));
        let pipeline = ResearchPipeline::new(registry, profile);
        let outcome = pipeline
            .run(ResearchRequest::new("migraine treatment"))
            .await
            .unwrap();
        assert_eq!(
            outcome.citations[0].evidence_tier,
            EvidenceTier::SystematicReview
        );
    }
}
