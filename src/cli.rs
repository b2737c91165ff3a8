// src/cli.rs

use clap::Parser;

/// One handler per command.
pub mod handlers;

/// dropchain: resolves chains of dependent selectors against a backend lookup endpoint.
///
/// Every command reads the chain declaration from a `chain.toml` (see `--config`),
/// `$DROPCHAIN_CONFIG`, or `~/.config/dropchain/chain.toml`.
///
/// Commands:
/// - `show`    Print every declared form group and its chain (no network).
/// - `check`   Validate the configuration.
/// - `resolve` Load one group's chain, apply `--select name=value` choices in order, print
///   the result.
/// - `walk`    Pick a value for every selector of one group interactively.
///
/// `resolve` and `walk` take `--group <name>` when the file declares several groups.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The command to run. If omitted, the available commands are listed.
    pub command: Option<String>,

    /// All remaining arguments, passed to the command's own parser.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
