// src/cli/handlers/show.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;

use crate::{
    cli::handlers::commons::{self, ConfigArgs},
    core::{
        chain_display::{self, DisplayOptions},
        config_loader,
    },
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Displays every declared form group and its selector chain without contacting the lookup endpoint."
)]
struct ShowArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// Hide the backend columns and tables behind each selector.
    #[arg(long, short)]
    brief: bool,
}

/// Parses the command's own arguments and runs it.
pub fn handle(args: Vec<String>) -> Result<()> {
    let show_args = ShowArgs::try_parse_from(&args)?;
    let (path, config) = commons::load_chain_config(&show_args.config)?;
    let chains = config_loader::build_chains(&config)?;

    println!(
        "\n{} {}",
        "Chains declared in".bold(),
        path.display().to_string().cyan()
    );
    println!("Lookup endpoint: {}", config.lookup.endpoint_url());

    let display_options = DisplayOptions {
        show_fields: !show_args.brief,
        show_options: false,
    };
    for (group, chain) in &chains {
        if group.title() == group.name {
            println!("\n{}", group.name.bold().underline());
        } else {
            println!(
                "\n{} {}",
                group.title().bold().underline(),
                format!("({})", group.name).dimmed()
            );
        }
        print!("{}", chain_display::render_chain(chain, &display_options));
    }

    Ok(())
}
