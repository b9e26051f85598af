use crate::cli::OutputFormat;
use crate::commands::Result;
use evidex_core::fanout::SourceFailure;
use evidex_core::{AdapterInfo, Candidate, ResearchOutcome};
use serde::{Deserialize, Serialize};

mod pretty;
pub use pretty::{print_outcome, print_probe_failure, print_probe_results, print_source_list};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    SourceList(Vec<AdapterInfo>),
    Research {
        outcome: ResearchOutcome,
        #[serde(skip_serializing_if = "Option::is_none")]
        answer: Option<String>,
    },
    ProbeResults {
        source: String,
        query: String,
        count: usize,
        candidates: Vec<Candidate>,
    },
    ProbeFailure(SourceFailure),
}

/// Serialize for the machine-readable formats; pretty printing goes
/// through the dedicated helpers in `pretty`.
pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Pretty => {
            // Callers route pretty output themselves; fall back to JSON
            // if one ends up here.
            println!("{}", serde_json::to_string_pretty(data)?);
        }
    }
    Ok(())
}
