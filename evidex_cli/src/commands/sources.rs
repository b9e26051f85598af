use crate::cli::{Cli, OutputFormat};
use crate::commands::Result;
use crate::output::{format_output, print_source_list, OutputData};
use evidex_core::build_default_registry;

pub async fn run(cli: &Cli) -> Result<()> {
    let registry = build_default_registry();
    let sources = registry.list();

    match cli.output {
        OutputFormat::Pretty => {
            print_source_list(&sources);
        }
        _ => {
            format_output(&OutputData::SourceList(sources), &cli.output)?;
        }
    }

    Ok(())
}
