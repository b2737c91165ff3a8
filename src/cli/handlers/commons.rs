// src/cli/handlers/commons.rs

// Shared helpers used by multiple handlers.

use anyhow::{Context, Result, anyhow};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use crate::{
    core::{
        chain::RefreshOutcome,
        config_loader,
        paths,
        resolver::{ChainResolver, SelectionOutcome},
    },
    models::ChainConfig,
    system::lookup::HttpLookupClient,
};

/// The `--config` flag understood by every command.
#[derive(Args, Debug, Default, Clone)]
pub struct ConfigArgs {
    /// Path to the chain configuration file (`~` and `$VARS` are expanded).
    #[arg(long, short)]
    pub config: Option<String>,
}

/// Locates, loads and validates the chain configuration.
pub fn load_chain_config(args: &ConfigArgs) -> Result<(PathBuf, ChainConfig)> {
    let path = paths::resolve_config_path(args.config.as_deref())?;
    let config = config_loader::load_config(&path)
        .with_context(|| format!("while loading '{}'", path.display()))?;
    Ok((path, config))
}

/// Starts the runtime lookups run on.
pub fn build_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start the async runtime")
}

/// Builds a resolver for the chosen group (or the only one) against the HTTP endpoint.
pub fn build_resolver(
    config: &ChainConfig,
    group: Option<&str>,
) -> Result<ChainResolver<HttpLookupClient>> {
    let group = config_loader::select_group(config, group)?;
    let chain = config_loader::build_chain(group)?;
    let client = HttpLookupClient::new(&config.lookup)?;
    log::debug!(
        "Driving group '{}' against lookup endpoint {}",
        group.name,
        client.endpoint()
    );
    Ok(ChainResolver::new(chain, client))
}

/// Parses a `name=value` pair given on the command line.
pub fn parse_selection(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected 'name=value', got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(anyhow!("Selector name missing in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Prints lookups that did not land, so failures stay visible next to the affected selector.
pub fn report_refresh(outcome: &RefreshOutcome) {
    match outcome {
        RefreshOutcome::Applied { node, choices } => {
            log::info!("'{}' loaded with {} options", node, choices);
        }
        RefreshOutcome::Stale { node, token } => {
            log::debug!("'{}' ignored a superseded response (token {})", node, token);
        }
        RefreshOutcome::Failed { node, reason } => {
            eprintln!("{} '{}': {}", "warning:".yellow().bold(), node, reason);
        }
    }
}

/// Like [`report_refresh`], for the outcome of a selection.
pub fn report_selection(name: &str, outcome: &SelectionOutcome) {
    match outcome {
        SelectionOutcome::Lookup(refresh) => report_refresh(refresh),
        SelectionOutcome::Terminal => log::info!("'{}' is the last selector of the chain", name),
        SelectionOutcome::Independent => log::info!("'{}' is independent; nothing to reload", name),
        SelectionOutcome::Blocked { node, missing } => {
            eprintln!(
                "{} '{}' cannot be loaded until {} {} selected.",
                "warning:".yellow().bold(),
                node,
                missing.join(", "),
                if missing.len() == 1 { "is" } else { "are" }
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_splits_on_first_equals() {
        assert_eq!(
            parse_selection("login_station=B18=east").unwrap(),
            ("login_station".to_string(), "B18=east".to_string())
        );
        assert_eq!(
            parse_selection(" login_agency =SCCWRP").unwrap(),
            ("login_agency".to_string(), "SCCWRP".to_string())
        );
    }

    #[test]
    fn test_parse_selection_rejects_malformed_pairs() {
        assert!(parse_selection("login_agency").is_err());
        assert!(parse_selection("=SCCWRP").is_err());
    }
}
