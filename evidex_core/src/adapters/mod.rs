//! Source adapters, one module per external database.

#[cfg(feature = "clinicaltrials")]
pub mod clinicaltrials;
#[cfg(feature = "crossref")]
pub mod crossref;
#[cfg(feature = "europepmc")]
pub mod europepmc;
#[cfg(feature = "medrxiv")]
pub mod medrxiv;
#[cfg(feature = "openalex")]
pub mod openalex;
#[cfg(feature = "openfda")]
pub mod openfda;
#[cfg(feature = "pubmed")]
pub mod pubmed;
#[cfg(feature = "semantic-scholar")]
pub mod semantic_scholar;

use crate::error::SourceError;
use std::time::Duration;

/// HTTP client tuned the same way for every adapter: short connect
/// timeout so a dead upstream fails before the fan-out deadline, http/1
/// to sidestep h2 stalls on misconfigured servers.
pub(crate) fn build_client(user_agent: &str) -> Result<reqwest::Client, SourceError> {
    reqwest::Client::builder()
        .http1_only()
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(20))
        .pool_max_idle_per_host(2)
        .user_agent(user_agent.to_string())
        .build()
        .map_err(|e| SourceError::Other(format!("failed to build http client: {}", e)))
}

pub(crate) const DEFAULT_USER_AGENT: &str =
    "evidex/0.2 (research pipeline; mailto:contact@evidex.dev)";
