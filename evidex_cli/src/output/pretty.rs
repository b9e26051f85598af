//! Human-readable terminal output.

use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, ContentArrangement, Table};
use owo_colors::OwoColorize;

use evidex_core::fanout::SourceFailure;
use evidex_core::{AdapterInfo, Candidate, ResearchOutcome};

/// Get the terminal width, defaulting to 80 if detection fails
fn get_terminal_width() -> u16 {
    terminal_size::terminal_size()
        .map(|(w, _)| w.0)
        .unwrap_or(80)
}

/// Truncate text to fit within a given width, adding "..." if truncated
fn truncate_text(text: &str, max_width: usize) -> String {
    if text.chars().count() <= max_width {
        text.to_string()
    } else {
        let truncated: String = text.chars().take(max_width.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

pub fn print_source_list(sources: &[AdapterInfo]) {
    if sources.is_empty() {
        println!("{}", "No sources available".yellow());
        return;
    }

    let term_width = get_terminal_width() as usize;
    let desc_width = term_width.saturating_sub(30);

    println!("{}", "Available Sources".bold().cyan());
    println!();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(term_width as u16)
        .set_header(vec!["Name", "Description"]);

    for source in sources {
        table.add_row(vec![
            source.source.to_string(),
            truncate_text(&source.description, desc_width.max(30)),
        ]);
    }

    println!("{}", table);
    println!();
    println!(
        "{} Use {} to query one source directly",
        "Tip:".green().bold(),
        "evidex probe <source> \"<query>\"".cyan()
    );
}

pub fn print_outcome(outcome: &ResearchOutcome, answer: Option<&str>) {
    let term_width = get_terminal_width() as usize;

    println!();
    println!(
        "{} {}",
        "Research:".bold().cyan(),
        outcome.query.bold()
    );
    println!(
        "{} candidates from {} sources, {} distinct works, {} ms",
        outcome.candidates_considered,
        outcome.source_timings.len(),
        outcome.merged_works,
        outcome.duration_ms
    );
    println!();

    if outcome.citations.is_empty() {
        println!(
            "{}",
            "No sources passed the relevance filters for this question.".yellow()
        );
    } else {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(term_width as u16)
            .set_header(vec!["#", "Citation", "Evidence", "Score"]);

        for (idx, citation) in outcome.citations.iter().enumerate() {
            let authors = if citation.authors.is_empty() {
                String::new()
            } else if citation.authors.len() > 2 {
                format!("{} et al. ", citation.authors[0])
            } else {
                format!("{} ", citation.authors.join(", "))
            };
            let year = citation
                .year
                .map(|y| format!("({}) ", y))
                .unwrap_or_default();
            let venue = citation
                .journal
                .as_deref()
                .map(|j| format!(" — {}", j))
                .unwrap_or_default();
            table.add_row(vec![
                (idx + 1).to_string(),
                format!(
                    "{}{}{}{}",
                    authors,
                    year,
                    truncate_text(&citation.title, 80),
                    venue
                ),
                citation.evidence_label.clone(),
                format!("{:.2}", citation.relevance_score),
            ]);
        }
        println!("{}", table);
    }

    if outcome.low_confidence {
        println!();
        println!(
            "{} {}",
            "Low confidence:".yellow().bold(),
            "fewer strong matches than expected; treat coverage as partial."
        );
    }

    if !outcome.degraded_sources.is_empty() {
        println!();
        println!("{}", "Degraded sources:".yellow().bold());
        for failure in &outcome.failures {
            println!(
                "  {} {} ({}){}",
                "•".yellow(),
                failure.source,
                failure.kind,
                if failure.retried { " [retried]" } else { "" }
            );
        }
    }

    if !outcome.source_timings.is_empty() {
        println!();
        println!("{}", "Source coverage:".bold());
        for timing in &outcome.source_timings {
            println!(
                "  {} {:<18} {:>3} results in {} ms",
                "✓".green(),
                timing.source.to_string(),
                timing.count,
                timing.duration_ms
            );
        }
    }

    if let Some(answer) = answer {
        println!();
        println!("{}", "Answer".bold().cyan());
        println!("{}", answer);
    }
}

pub fn print_probe_results(source: &str, query: &str, candidates: &[Candidate]) {
    println!();
    println!(
        "{} {} results from {} for {}",
        "Probe:".bold().cyan(),
        candidates.len(),
        source.bold(),
        query
    );
    println!();

    for (idx, candidate) in candidates.iter().enumerate() {
        println!(
            "{:>3}. {} {}",
            idx + 1,
            candidate.title.bold(),
            candidate
                .year
                .map(|y| format!("({})", y))
                .unwrap_or_default()
        );
        if !candidate.authors.is_empty() {
            let authors = if candidate.authors.len() > 4 {
                format!("{} et al.", candidate.authors[..3].join(", "))
            } else {
                candidate.authors.join(", ")
            };
            println!("     {}", authors.dimmed());
        }
        if let Some(id) = candidate
            .doi
            .as_deref()
            .map(|d| format!("doi:{}", d))
            .or_else(|| candidate.external_id.clone())
        {
            println!("     {}", id.dimmed());
        }
    }
}

pub fn print_probe_failure(failure: &SourceFailure) {
    println!(
        "{} {} degraded: {} ({})",
        "✗".red(),
        failure.source,
        failure.message,
        failure.kind
    );
}
