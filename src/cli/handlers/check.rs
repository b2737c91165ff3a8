// src/cli/handlers/check.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::cli::handlers::commons::{self, ConfigArgs};

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Validates the chain configuration.")]
struct CheckArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

/// Parses the command's own arguments and runs it.
pub fn handle(args: Vec<String>) -> Result<()> {
    let check_args = CheckArgs::try_parse_from(&args)?;
    let (path, config) = commons::load_chain_config(&check_args.config)?;

    println!(
        "{} '{}' is valid; lookups via {}",
        "✔".green().bold(),
        path.display(),
        config.lookup.endpoint_url().cyan()
    );
    for group in &config.groups {
        let roots = group.selectors.iter().filter(|s| s.is_root()).count();
        let dependents = group.selectors.len() - roots;
        println!(
            "  {:<16} {} root(s), {} dependent selector(s)",
            group.name.bold(),
            roots,
            dependents
        );
    }
    Ok(())
}
