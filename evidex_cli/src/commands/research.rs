use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::{Cli, OutputFormat};
use crate::commands::{CommandError, Result};
use crate::output::{format_output, print_outcome, OutputData};
use evidex_core::profile::{ProfileStore, RunProfile};
use evidex_core::synthesis::{AnswerSynthesizer, ClaudeSynthesizer};
use evidex_core::{build_default_registry, ResearchPipeline, ResearchRequest};

/// Run the full research pipeline for one question.
pub async fn run(
    cli: &Cli,
    query: &str,
    profile_name: Option<&str>,
    sources: Option<&str>,
    max: Option<usize>,
    synthesize: bool,
) -> Result<()> {
    let store = ProfileStore::new_default();
    let profile = resolve_profile(profile_name, sources, &store)?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .expect("Invalid progress template"),
    );
    spinner.set_message(format!("Researching '{}'...", query));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let registry = build_default_registry();
    let pipeline = ResearchPipeline::new(registry, profile);

    let mut request = ResearchRequest::new(query);
    request.max_results = max;

    let outcome = pipeline.run_with_store(request, Some(&store)).await?;
    spinner.finish_and_clear();

    let answer = if synthesize && !outcome.citations.is_empty() {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .expect("Invalid progress template"),
        );
        spinner.set_message("Synthesizing answer...");
        spinner.enable_steady_tick(std::time::Duration::from_millis(100));

        let synthesizer = ClaudeSynthesizer::new()?;
        let answer = synthesizer
            .synthesize(&outcome.query, &outcome.citations, outcome.low_confidence)
            .await?;
        spinner.finish_and_clear();
        Some(answer)
    } else {
        None
    };

    match cli.output {
        OutputFormat::Pretty => {
            print_outcome(&outcome, answer.as_deref());
        }
        _ => {
            format_output(
                &OutputData::Research { outcome, answer },
                &cli.output,
            )?;
        }
    }

    Ok(())
}

/// Resolve the run profile: explicit sources beat a named profile beats
/// the default.
fn resolve_profile(
    profile_name: Option<&str>,
    sources: Option<&str>,
    store: &ProfileStore,
) -> Result<RunProfile> {
    if let Some(sources) = sources {
        let names: Vec<String> = sources
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if names.is_empty() {
            return Err(CommandError::InvalidInput(
                "empty --sources list".to_string(),
            ));
        }
        for name in &names {
            if evidex_core::Source::parse(name).is_none() {
                return Err(CommandError::SourceNotFound(name.clone()));
            }
        }
        let mut profile = RunProfile::new("ad-hoc", names);
        if let Some(base) = RunProfile::get_builtin("default") {
            profile.defaults = base.defaults;
        }
        return Ok(profile);
    }

    let name = profile_name.unwrap_or("default");
    store
        .load(name)
        .ok_or_else(|| CommandError::ProfileNotFound(name.to_string()))
}
