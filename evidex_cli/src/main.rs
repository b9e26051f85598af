use clap::Parser;
use owo_colors::OwoColorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod commands;
mod output;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging; -v raises the default filter, RUST_LOG wins.
    let default_filter = match cli.verbose {
        0 => "evidex_cli=info",
        1 => "evidex_cli=debug,evidex_core=info",
        _ => "evidex_cli=debug,evidex_core=debug",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let result = match &cli.command {
        Commands::Research {
            query,
            profile,
            sources,
            max,
            synthesize,
        } => {
            commands::research::run(
                &cli,
                query,
                profile.as_deref(),
                sources.as_deref(),
                *max,
                *synthesize,
            )
            .await
        }
        Commands::Sources => commands::sources::run(&cli).await,
        Commands::Probe {
            source,
            query,
            limit,
        } => commands::probe::run(&cli, source, query, *limit).await,
        Commands::Profiles => commands::profiles::run(&cli),
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        process::exit(1);
    }
}
