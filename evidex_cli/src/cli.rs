use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "evidex")]
#[command(about = "Evidex - evidence-ranked medical literature research")]
#[command(version)]
#[command(after_help = "\x1b[1;36mQuick Start:\x1b[0m
  evidex research \"migraine prophylaxis in adults\"   Full pipeline run
  evidex research \"statin myopathy\" --synthesize     Add a cited prose answer
  evidex sources                                     List configured sources
  evidex probe pubmed \"sglt2 inhibitors\"             Query one source directly

\x1b[1;36mProfiles:\x1b[0m
  evidex profiles                                    List run profiles
  evidex research \"...\" --profile fast               Tight deadlines, primary lit only

\x1b[1;36mMore Info:\x1b[0m
  evidex <command> --help                            Get help for any command")]
#[command(long_about = "
\x1b[1mEvidex\x1b[0m - Medical Literature Research CLI

One question fans out to 8 bibliographic databases (PubMed, Europe PMC,
Semantic Scholar, Crossref, OpenAlex, openFDA, medRxiv, ClinicalTrials.gov),
deduplicates the overlap, scores relevance, classifies evidence quality and
returns a bounded citation list ordered by the evidence hierarchy.
")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Pretty)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full research pipeline for one question
    ///
    /// Fans out to every source in the profile, deduplicates, scores,
    /// classifies evidence and prints the ranked citations with a
    /// per-source coverage report.
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  evidex research \"migraine prophylaxis in adults\"
  evidex research \"semaglutide weight loss\" --max 5
  evidex research \"apixaban vs warfarin\" --profile fast
  evidex research \"ace inhibitor cough\" -s pubmed,europepmc
  evidex research \"statin myopathy\" --synthesize")]
    Research {
        /// The research question (free text, 1-500 characters)
        query: String,
        /// Run profile (default, fast, preprints, regulatory, or user-defined)
        #[arg(short, long)]
        profile: Option<String>,
        /// Comma-separated source list overriding the profile
        #[arg(short = 's', long = "sources")]
        sources: Option<String>,
        /// Maximum citations to return
        #[arg(short, long)]
        max: Option<usize>,
        /// Ask the configured LLM for a cited prose answer (needs ANTHROPIC_API_KEY)
        #[arg(long)]
        synthesize: bool,
    },

    /// List all available sources
    #[command(alias = "ls")]
    Sources,

    /// Search a single source directly (debugging aid)
    #[command(after_help = "\x1b[1;33mExamples:\x1b[0m
  evidex probe pubmed \"sglt2 inhibitors heart failure\"
  evidex probe crossref \"migraine\" --limit 5")]
    Probe {
        /// Source name (see `evidex sources`)
        source: String,
        /// The search query
        query: String,
        /// Maximum results
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// List run profiles (built-in and user-defined)
    Profiles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable tables and colors
    Pretty,
    /// Machine-readable JSON
    Json,
    /// YAML
    Yaml,
}
