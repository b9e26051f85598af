use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{Cli, OutputFormat};
use crate::commands::{CommandError, Result};
use crate::output::{
    format_output, print_probe_failure, print_probe_results, OutputData,
};
use evidex_core::fanout::SourceFailure;
use evidex_core::{build_default_registry, Source};

/// Search one source directly, bypassing dedup and ranking. Useful for
/// checking what an upstream actually returns.
pub async fn run(cli: &Cli, source_name: &str, query: &str, limit: usize) -> Result<()> {
    let source = Source::parse(source_name)
        .ok_or_else(|| CommandError::SourceNotFound(source_name.to_string()))?;

    let registry = build_default_registry();
    let adapter = registry
        .get(source)
        .ok_or_else(|| CommandError::SourceNotFound(source_name.to_string()))?
        .clone();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    spinner.set_message(format!("Probing {} for '{}'...", source, query));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = adapter.search(query, limit).await;
    spinner.finish_and_clear();

    match result {
        Ok(candidates) => match cli.output {
            OutputFormat::Pretty => {
                print_probe_results(source.as_str(), query, &candidates);
            }
            _ => {
                format_output(
                    &OutputData::ProbeResults {
                        source: source.as_str().to_string(),
                        query: query.to_string(),
                        count: candidates.len(),
                        candidates,
                    },
                    &cli.output,
                )?;
            }
        },
        Err(error) => {
            let failure = SourceFailure::from_error(source, &error, false);
            match cli.output {
                OutputFormat::Pretty => print_probe_failure(&failure),
                _ => format_output(&OutputData::ProbeFailure(failure), &cli.output)?,
            }
        }
    }

    Ok(())
}
