// src/cli/handlers/walk.rs

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use dialoguer::{Confirm, Select, theme::ColorfulTheme};

use crate::{
    cli::handlers::commons::{self, ConfigArgs},
    core::chain_display::{self, DisplayOptions},
    models::{OptionsState, SelectOption},
};

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Walks the chain interactively, picking one value per selector."
)]
struct WalkArgs {
    #[command(flatten)]
    config: ConfigArgs,

    /// The form group to drive. Required when the file declares more than one.
    #[arg(long, short)]
    group: Option<String>,
}

fn option_item(option: &SelectOption) -> String {
    if option.label.is_empty() || option.label == option.value {
        option.value.clone()
    } else {
        format!("{} ({})", option.label, option.value)
    }
}

/// Parses the command's own arguments and runs it.
pub fn handle(args: Vec<String>) -> Result<()> {
    let walk_args = WalkArgs::try_parse_from(&args)?;
    let (_, config) = commons::load_chain_config(&walk_args.config)?;
    let resolver = commons::build_resolver(&config, walk_args.group.as_deref())?;
    let runtime = commons::build_runtime()?;

    for outcome in runtime.block_on(resolver.initialize())? {
        commons::report_refresh(&outcome);
    }

    // Roots first, then the dependents in index order; each pick narrows the next prompt.
    let order: Vec<String> = resolver
        .snapshot()
        .nodes()
        .map(|n| n.name().to_string())
        .collect();
    let theme = ColorfulTheme::default();

    'walk: for name in &order {
        loop {
            let snapshot = resolver.snapshot();
            let Some(node) = snapshot.node(name) else {
                continue 'walk;
            };

            let choices: Vec<SelectOption> = node.choices().cloned().collect();
            if choices.is_empty() {
                let reason = match &node.state {
                    OptionsState::Failed { reason } => reason.clone(),
                    OptionsState::Blocked { missing } => {
                        format!("waiting on {}", missing.join(", "))
                    }
                    _ => "no options available".to_string(),
                };
                println!("{} {}: {}", "!".yellow().bold(), node.decl.prompt(), reason);

                let retry = Confirm::with_theme(&theme)
                    .with_prompt("Retry the lookup?")
                    .default(true)
                    .interact()?;
                if !retry {
                    break 'walk;
                }
                let outcome = runtime.block_on(resolver.refresh(name))?;
                commons::report_selection(name, &outcome);
                continue;
            }

            let items: Vec<String> = choices.iter().map(option_item).collect();
            let picked = Select::with_theme(&theme)
                .with_prompt(node.decl.prompt())
                .items(&items)
                .default(0)
                .interact()?;

            if let Some(choice) = choices.get(picked) {
                let outcome = runtime.block_on(resolver.select(name, &choice.value))?;
                commons::report_selection(name, &outcome);
            }
            continue 'walk;
        }
    }

    println!();
    print!(
        "{}",
        chain_display::render_chain(&resolver.snapshot(), &DisplayOptions::default())
    );
    Ok(())
}
