use evidex_core::profile::RunProfile;
use evidex_core::{build_default_registry, ResearchPipeline, ResearchRequest};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let registry = build_default_registry();
    let profile = RunProfile::get_builtin("default").expect("builtin profile");
    let pipeline = ResearchPipeline::new(registry, profile);

    let query = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "migraine prophylaxis in adults".to_string());

    println!("Researching: {}", query);
    let outcome = pipeline.run(ResearchRequest::new(&query)).await?;

    println!(
        "\n{} candidates -> {} distinct works -> {} citations ({} ms)",
        outcome.candidates_considered,
        outcome.merged_works,
        outcome.citations.len(),
        outcome.duration_ms
    );

    for (idx, citation) in outcome.citations.iter().enumerate() {
        println!(
            "\n[{}] {} ({})",
            idx + 1,
            citation.title,
            citation.year.map(|y| y.to_string()).unwrap_or_default()
        );
        println!("    {}", citation.evidence_label);
        if let Some(id) = &citation.identifier {
            println!("    {}", id);
        }
    }

    if !outcome.degraded_sources.is_empty() {
        println!("\nDegraded sources:");
        for source in &outcome.degraded_sources {
            println!("  - {}", source);
        }
    }
    if outcome.low_confidence {
        println!("\nLow-confidence result: coverage was thin for this question.");
    }

    Ok(())
}
