//! Per-source rate limiting.
//!
//! Each source gets a token bucket refilled at its published request rate.
//! Buckets are shared across concurrent requests in one process, so all
//! state lives in atomics updated with compare-and-swap; a multi-replica
//! deployment would swap `RateLimiter` for a client of an external counter
//! service behind the same interface.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::error::SourceError;
use crate::types::{Candidate, Source};
use crate::SourceAdapter;

/// Longest a caller will queue on an empty bucket before failing fast
/// with `RateLimited`. Keeps one throttled source from stalling the
/// whole fan-out.
pub const MAX_QUEUE_WAIT: Duration = Duration::from_millis(750);

/// Milli-tokens per token; buckets count in thousandths so sub-1/s refill
/// rates stay integral.
const MILLI: u64 = 1000;

pub struct TokenBucket {
    capacity_milli: u64,
    /// Milli-tokens added per millisecond, i.e. requests-per-second.
    refill_per_ms: u64,
    tokens_milli: AtomicU64,
    last_refill_ms: AtomicU64,
    origin: Instant,
}

impl TokenBucket {
    /// Bucket allowing `rate_per_sec` sustained requests with a burst of
    /// the same size.
    pub fn new(rate_per_sec: u32) -> Self {
        let rate = rate_per_sec.max(1) as u64;
        Self {
            capacity_milli: rate * MILLI,
            refill_per_ms: rate,
            tokens_milli: AtomicU64::new(rate * MILLI),
            last_refill_ms: AtomicU64::new(0),
            origin: Instant::now(),
        }
    }

    /// Take one token, or report how long until one is available.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.refill();
        let mut current = self.tokens_milli.load(Ordering::Acquire);
        loop {
            if current < MILLI {
                let deficit = MILLI - current;
                let wait_ms = deficit.div_ceil(self.refill_per_ms);
                return Err(Duration::from_millis(wait_ms));
            }
            match self.tokens_milli.compare_exchange_weak(
                current,
                current - MILLI,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(()),
                Err(actual) => current = actual,
            }
        }
    }

    /// Credit elapsed time to the bucket. The last-refill stamp advances
    /// by CAS so concurrent callers never double-credit an interval.
    fn refill(&self) {
        let now_ms = self.origin.elapsed().as_millis() as u64;
        let last = self.last_refill_ms.load(Ordering::Acquire);
        if now_ms <= last {
            return;
        }
        if self
            .last_refill_ms
            .compare_exchange(last, now_ms, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return;
        }
        let credit = (now_ms - last) * self.refill_per_ms;
        let mut current = self.tokens_milli.load(Ordering::Acquire);
        loop {
            let next = (current + credit).min(self.capacity_milli);
            match self.tokens_milli.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return,
                Err(actual) => current = actual,
            }
        }
    }
}

/// Process-wide registry of per-source buckets.
pub struct RateLimiter {
    buckets: HashMap<Source, TokenBucket>,
}

impl RateLimiter {
    pub fn new(rates: &HashMap<Source, u32>) -> Self {
        let buckets = rates
            .iter()
            .map(|(source, rate)| (*source, TokenBucket::new(*rate)))
            .collect();
        Self { buckets }
    }

    /// Default published-rate table for the built-in sources. NCBI allows
    /// 3 req/s anonymously and 10 req/s with an API key.
    pub fn with_default_rates() -> Self {
        let pubmed_rate = if std::env::var("NCBI_API_KEY").is_ok() {
            10
        } else {
            3
        };
        let mut rates = HashMap::new();
        rates.insert(Source::PubMed, pubmed_rate);
        rates.insert(Source::EuropePmc, 5);
        rates.insert(Source::SemanticScholar, 1);
        rates.insert(Source::Crossref, 10);
        rates.insert(Source::OpenAlex, 10);
        rates.insert(Source::OpenFda, 4);
        rates.insert(Source::MedRxiv, 2);
        rates.insert(Source::ClinicalTrials, 5);
        Self::new(&rates)
    }

    /// Take a token for `source`, queueing briefly when the bucket is
    /// empty. Unknown sources pass through unthrottled.
    pub async fn acquire(&self, source: Source) -> Result<(), SourceError> {
        let Some(bucket) = self.buckets.get(&source) else {
            return Ok(());
        };
        match bucket.try_acquire() {
            Ok(()) => Ok(()),
            Err(wait) if wait <= MAX_QUEUE_WAIT => {
                debug!(target: "evidex::ratelimit", %source, wait_ms = wait.as_millis() as u64, "queueing on rate limit");
                tokio::time::sleep(wait).await;
                bucket.try_acquire().map_err(|_| {
                    SourceError::RateLimited(format!("{} bucket still empty after queue wait", source))
                })
            }
            Err(wait) => Err(SourceError::RateLimited(format!(
                "{} bucket empty, next token in {}ms",
                source,
                wait.as_millis()
            ))),
        }
    }
}

/// Decorator applying the shared limiter in front of any adapter, so the
/// fan-out engine never needs to know which sources are throttled.
pub struct ThrottledAdapter {
    inner: Arc<dyn SourceAdapter>,
    limiter: Arc<RateLimiter>,
}

impl ThrottledAdapter {
    pub fn new(inner: Arc<dyn SourceAdapter>, limiter: Arc<RateLimiter>) -> Self {
        Self { inner, limiter }
    }
}

#[async_trait]
impl SourceAdapter for ThrottledAdapter {
    fn source(&self) -> Source {
        self.inner.source()
    }

    fn description(&self) -> &'static str {
        self.inner.description()
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<Candidate>, SourceError> {
        self.limiter.acquire(self.source()).await?;
        self.inner.search(query, limit).await
    }
}
