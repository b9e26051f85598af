//! Fan-out execution engine.
//!
//! Issues one concurrent call per source adapter, each under its own
//! timeout inside the global deadline, and collects whatever succeeds.
//! A slow or failing source degrades; it never blocks its siblings or
//! the overall completion.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use super::{FanoutReport, SourceFailure, SourceReturn};
use crate::error::SourceError;
use crate::profile::{ProfileStore, RunProfile};
use crate::query::QueryPlan;
use crate::types::{Candidate, Source};
use crate::{SourceAdapter, SourceRegistry};

/// Pause before the single rate-limit retry.
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

/// Engine for executing fan-outs across the registered sources.
pub struct FanoutCoordinator<'a> {
    registry: &'a SourceRegistry,
}

impl<'a> FanoutCoordinator<'a> {
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Self { registry }
    }

    /// Execute one fan-out for the plan under the profile's budgets.
    pub async fn run(
        &self,
        plan: &QueryPlan,
        profile: &RunProfile,
        store: Option<&ProfileStore>,
    ) -> FanoutReport {
        let started = Instant::now();
        let global_budget = Duration::from_millis(profile.defaults.global_timeout_ms);
        let deadline = started + global_budget;

        let adapters: Vec<(Source, Arc<dyn SourceAdapter>)> = profile
            .effective_sources(store)
            .into_iter()
            .filter_map(|source| {
                self.registry
                    .get(source)
                    .map(|adapter| (source, Arc::clone(adapter)))
            })
            .collect();

        let mut report = FanoutReport::new(plan.raw.clone());

        // All sources dispatch at once; per-call budget is the smaller of
        // the per-source timeout and what remains of the global deadline.
        let per_source = Duration::from_millis(profile.defaults.source_timeout_ms).min(global_budget);

        let futures: Vec<_> = adapters
            .into_iter()
            .map(|(source, adapter)| {
                let query = plan.query_for(source);
                let limit = profile.limit_for(source) as usize;

                async move {
                    search_one_source(source, adapter, query, limit, per_source, deadline).await
                }
            })
            .collect();

        let outcomes = futures::future::join_all(futures).await;

        for outcome in outcomes {
            match outcome {
                Ok(source_return) => report.add_return(source_return),
                Err(failure) => report.add_failure(failure),
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        debug!(
            target: "evidex::fanout",
            completed = report.completed.len(),
            failed = report.failures.len(),
            candidates = report.total_candidates,
            duration_ms = report.duration_ms,
            "fan-out settled"
        );
        report
    }
}

/// Search a single source with one bounded rate-limit retry.
async fn search_one_source(
    source: Source,
    adapter: Arc<dyn SourceAdapter>,
    query: String,
    limit: usize,
    per_source: Duration,
    deadline: Instant,
) -> Result<SourceReturn, SourceFailure> {
    let started = Instant::now();

    let first = attempt(source, &*adapter, &query, limit, per_source).await;

    let retryable = matches!(&first, Err(e) if e.is_retryable());
    let remaining = deadline.saturating_duration_since(Instant::now());
    let (result, retried) = if retryable && remaining > RETRY_BACKOFF {
        debug!(target: "evidex::fanout", %source, "rate limited, retrying once after backoff");
        tokio::time::sleep(RETRY_BACKOFF).await;
        let budget = per_source.min(deadline.saturating_duration_since(Instant::now()));
        (attempt(source, &*adapter, &query, limit, budget).await, true)
    } else {
        (first, false)
    };

    match result {
        Ok(candidates) => Ok(SourceReturn {
            source,
            count: candidates.len(),
            candidates,
            duration_ms: started.elapsed().as_millis() as u64,
        }),
        Err(error) => {
            warn!(target: "evidex::fanout", %source, kind = error.kind_str(), %error, "source degraded");
            Err(SourceFailure::from_error(source, &error, retried))
        }
    }
}

async fn attempt(
    source: Source,
    adapter: &dyn SourceAdapter,
    query: &str,
    limit: usize,
    budget: Duration,
) -> Result<Vec<Candidate>, SourceError> {
    if budget.is_zero() {
        return Err(SourceError::Timeout(format!(
            "{} had no budget left before dispatch",
            source
        )));
    }
    match timeout(budget, adapter.search(query, limit)).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(format!(
            "{} timed out after {}ms",
            source,
            budget.as_millis()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::build_plan;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StaticAdapter {
        source: Source,
        titles: Vec<&'static str>,
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
            limit: usize,
        ) -> Result<Vec<Candidate>, SourceError> {
            Ok(self
                .titles
                .iter()
                .take(limit)
                .enumerate()
                .map(|(idx, t)| Candidate::new(self.source, *t, idx + 1))
                .collect())
        }
    }

    struct FailingAdapter {
        source: Source,
    }

    #[async_trait]
    impl SourceAdapter for FailingAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn description(&self) -> &'static str {
            "failing test adapter"
        }
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>, SourceError> {
            Err(SourceError::Malformed("unexpected payload shape".into()))
        }
    }

    struct SlowAdapter {
        source: Source,
    }

    #[async_trait]
    impl SourceAdapter for SlowAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn description(&self) -> &'static str {
            "slow test adapter"
        }
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>, SourceError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Vec::new())
        }
    }

    struct RateLimitedOnceAdapter {
        source: Source,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SourceAdapter for RateLimitedOnceAdapter {
        fn source(&self) -> Source {
            self.source
        }
        fn description(&self) -> &'static str {
            "rate-limited-once test adapter"
        }
        async fn search(
            &self,
            _query: &str,
            _limit: usize,
        ) -> Result<Vec<Candidate>, SourceError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(SourceError::RateLimited("429".into()))
            } else {
                Ok(vec![Candidate::new(self.source, "after retry", 1)])
            }
        }
    }

    fn profile_for(sources: &[Source]) -> RunProfile {
        let mut profile = RunProfile::new(
            "test",
            sources.iter().map(|s| s.as_str().to_string()).collect(),
        );
        profile.defaults.source_timeout_ms = 500;
        profile.defaults.global_timeout_ms = 3000;
        profile
    }

    #[tokio::test]
    async fn test_partial_failure_is_tolerated() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticAdapter {
            source: Source::PubMed,
            titles: vec!["a", "b"],
        }));
        registry.register(Arc::new(FailingAdapter {
            source: Source::Crossref,
        }));
        registry.register(Arc::new(SlowAdapter {
            source: Source::OpenAlex,
        }));

        let plan = build_plan("migraine treatment");
        let profile = profile_for(&[Source::PubMed, Source::Crossref, Source::OpenAlex]);
        let report = FanoutCoordinator::new(&registry).run(&plan, &profile, None).await;

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.total_candidates, 2);
        assert_eq!(report.failures.len(), 2);
        assert!(report.partial);
        assert!(!report.all_failed());

        let kinds: Vec<&str> = report.failures.iter().map(|f| f.kind.as_str()).collect();
        assert!(kinds.contains(&"timeout"));
        assert!(kinds.contains(&"malformed_response"));
    }

    #[tokio::test]
    async fn test_rate_limit_retried_once() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(RateLimitedOnceAdapter {
            source: Source::SemanticScholar,
            calls: AtomicUsize::new(0),
        }));

        let plan = build_plan("migraine");
        let profile = profile_for(&[Source::SemanticScholar]);
        let report = FanoutCoordinator::new(&registry).run(&plan, &profile, None).await;

        assert_eq!(report.completed.len(), 1);
        assert_eq!(report.completed[0].candidates[0].title, "after retry");
    }

    #[tokio::test]
    async fn test_malformed_never_retried() {
        struct CountingFailer {
            calls: AtomicUsize,
        }
        #[async_trait]
        impl SourceAdapter for CountingFailer {
            fn source(&self) -> Source {
                Source::OpenFda
            }
            fn description(&self) -> &'static str {
                "counting failer"
            }
            async fn search(
                &self,
                _query: &str,
                _limit: usize,
            ) -> Result<Vec<Candidate>, SourceError> {
                self.calls.fetch_add(1, Ordering::SeqCst);
                Err(SourceError::Malformed("bad".into()))
            }
        }

        let failer = Arc::new(CountingFailer {
            calls: AtomicUsize::new(0),
        });
        let mut registry = SourceRegistry::new();
        registry.register(failer.clone());

        let plan = build_plan("migraine");
        let profile = profile_for(&[Source::OpenFda]);
        let report = FanoutCoordinator::new(&registry).run(&plan, &profile, None).await;

        assert!(report.all_failed());
        assert_eq!(failer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_source_rank_preserved_within_source() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(StaticAdapter {
            source: Source::PubMed,
            titles: vec!["first", "second", "third"],
        }));

        let plan = build_plan("migraine");
        let profile = profile_for(&[Source::PubMed]);
        let report = FanoutCoordinator::new(&registry).run(&plan, &profile, None).await;

        let ranks: Vec<usize> = report.completed[0]
            .candidates
            .iter()
            .map(|c| c.source_rank)
            .collect();
        assert_eq!(ranks, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_unregistered_sources_are_skipped() {
        let registry = SourceRegistry::new();
        let plan = build_plan("migraine");
        let profile = profile_for(&[Source::PubMed]);
        let report = FanoutCoordinator::new(&registry).run(&plan, &profile, None).await;
        assert!(report.completed.is_empty());
        assert!(report.failures.is_empty());
    }
}
