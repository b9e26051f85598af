use owo_colors::OwoColorize;

use crate::cli::{Cli, OutputFormat};
use crate::commands::Result;
use evidex_core::profile::ProfileStore;

pub fn run(cli: &Cli) -> Result<()> {
    let store = ProfileStore::new_default();
    let profiles = store.list_all();

    match cli.output {
        OutputFormat::Pretty => {
            println!("{}", "Run Profiles".bold().cyan());
            println!();
            for profile in &profiles {
                let sources = profile
                    .effective_sources(Some(&store))
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                println!(
                    "  {:<12} {}",
                    profile.name.bold(),
                    profile.description.as_deref().unwrap_or("").dimmed()
                );
                println!("  {:<12} sources: {}", "", sources);
                println!(
                    "  {:<12} cap {} / floor {:.2} / {} ms budget",
                    "",
                    profile.selector.max_citations,
                    profile.selector.relevance_floor,
                    profile.defaults.global_timeout_ms
                );
                println!();
            }
            println!(
                "{} User profiles load from {}",
                "Tip:".green().bold(),
                store.path().display()
            );
        }
        _ => {
            let value = serde_json::to_value(&profiles)?;
            match cli.output {
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
                _ => println!("{}", serde_yaml::to_string(&value)?),
            }
        }
    }

    Ok(())
}
