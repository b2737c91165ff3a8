// src/cli/handlers/resolve.rs

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::handlers::commons::{self, ConfigArgs},
    core::chain_display::{self, DisplayOptions},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Loads the chain, applies selections in order and prints the resulting state."
)]
struct ResolveArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// The form group to drive. Required when the file declares more than one.
    #[arg(long, short)]
    group: Option<String>,

    /// A `name=value` choice. Repeat in chain order, e.g. `-s login_agency=SCCWRP -s login_datatype=trawl`.
    #[arg(long = "select", short = 's')]
    selections: Vec<String>,

    /// List the options offered by every selector.
    #[arg(long, short)]
    options: bool,
}

/// Parses the command's own arguments and runs it.
pub fn handle(args: Vec<String>) -> Result<()> {
    let resolve_args = ResolveArgs::try_parse_from(&args)?;
    let selections = resolve_args
        .selections
        .iter()
        .map(|raw| commons::parse_selection(raw))
        .collect::<Result<Vec<_>>>()?;

    let (_, config) = commons::load_chain_config(&resolve_args.config)?;
    let resolver = commons::build_resolver(&config, resolve_args.group.as_deref())?;
    let runtime = commons::build_runtime()?;

    let chain = runtime.block_on(async {
        for outcome in resolver.initialize().await? {
            commons::report_refresh(&outcome);
        }
        for (name, value) in &selections {
            let outcome = resolver.select(name, value).await?;
            commons::report_selection(name, &outcome);
        }
        anyhow::Ok(resolver.snapshot())
    })?;

    let display_options = DisplayOptions {
        show_fields: false,
        show_options: resolve_args.options,
    };
    print!("{}", chain_display::render_chain(&chain, &display_options));

    Ok(())
}
