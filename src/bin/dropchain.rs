// src/bin/dropchain.rs

use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;
use dropchain::cli::{Cli, handlers};

// --- Command Definition and Registry ---

/// Defines a system command, its aliases, and its handler function.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    about: &'static str,
    handler: fn(Vec<String>) -> Result<()>,
}

/// The single source of truth for all commands.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "check",
        aliases: &[],
        about: "Validate the chain configuration",
        handler: handlers::check::handle,
    },
    CommandDefinition {
        name: "resolve",
        aliases: &["res"],
        about: "Load the chain and apply `--select name=value` choices",
        handler: handlers::resolve::handle,
    },
    CommandDefinition {
        name: "show",
        aliases: &["ls"],
        about: "Print the declared chain",
        handler: handlers::show::handle,
    },
    CommandDefinition {
        name: "walk",
        aliases: &[],
        about: "Pick a value for every selector interactively",
        handler: handlers::walk::handle,
    },
];

/// Finds a command definition in the registry by its name or alias.
fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn print_commands() {
    println!("{}", "Available commands:".bold());
    for cmd in COMMAND_REGISTRY {
        println!("  {:<10} {}", cmd.name.cyan(), cmd.about);
    }
    println!("\nRun `dropchain <command> --help` for the options of a command.");
}

/// Sets up logging, parses arguments, dispatches to the handler and reports errors.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        // Argument errors and `--help` of a command print their own output and exit code.
        if let Some(clap_err) = e.downcast_ref::<clap::Error>() {
            clap_err.exit();
        }

        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let Some(command_name) = cli.command else {
        print_commands();
        return Ok(());
    };

    let command = find_command(&command_name).ok_or_else(|| {
        let known: Vec<_> = COMMAND_REGISTRY.iter().map(|c| c.name).collect();
        anyhow!(
            "Unknown command '{}'. Available commands: {}",
            command_name,
            known.join(", ")
        )
    })?;

    (command.handler)(cli.args)
}
