// src/core/chain_display.rs

use crate::{
    core::chain::Chain,
    models::{OptionsState, SelectorNode},
};
use colored::Colorize;

#[derive(Debug, Default, Clone, Copy)]
pub struct DisplayOptions {
    /// Print the backend columns and table behind each selector.
    pub show_fields: bool,
    /// List every option currently offered.
    pub show_options: bool,
}

/// Renders the chain as a tree: roots flush left, then the dependent sequence nested one
/// level per index.
pub fn render_chain(chain: &Chain, options: &DisplayOptions) -> String {
    let mut out = String::new();

    for node in chain.nodes() {
        let depth = node.index().saturating_sub(1);
        let (prefix, detail_indent) = if node.is_root() || depth == 0 {
            (String::new(), "    ".to_string())
        } else {
            let pad = "    ".repeat(depth - 1);
            (format!("{}└── ", pad), format!("{}        ", pad))
        };

        let rank = if node.is_root() {
            "root".dimmed().to_string()
        } else {
            format!("#{}", node.index())
        };

        out.push_str(&format!(
            "{}{} [{}] {}{}\n",
            prefix,
            node.name().bold(),
            rank,
            state_summary(node),
            selection_summary(node)
        ));

        if options.show_fields {
            out.push_str(&format!(
                "{}{} value={} display={} table={}\n",
                detail_indent,
                "fields:".dimmed(),
                node.decl.value_field,
                node.decl.display_field,
                node.decl.table
            ));
        }

        if options.show_options {
            for option in node.choices() {
                let marker = if node.selected.as_deref() == Some(option.value.as_str()) {
                    "*"
                } else {
                    "-"
                };
                out.push_str(&format!(
                    "{}{} {} {}\n",
                    detail_indent,
                    marker,
                    option.value,
                    format!("({})", option.label).dimmed()
                ));
            }
        }
    }

    out
}

fn state_summary(node: &SelectorNode) -> String {
    match &node.state {
        OptionsState::Empty => "empty".dimmed().to_string(),
        OptionsState::Loading { .. } => "loading".yellow().to_string(),
        OptionsState::Ready => {
            let count = node.choices().count();
            let noun = if count == 1 { "option" } else { "options" };
            format!("{} {}", count, noun).green().to_string()
        }
        OptionsState::Blocked { missing } => format!("waiting on: {}", missing.join(", "))
            .yellow()
            .to_string(),
        OptionsState::Failed { reason } => format!("error: {}", reason).red().to_string(),
    }
}

fn selection_summary(node: &SelectorNode) -> String {
    match &node.selected {
        Some(value) => format!(" = {}", value.cyan().bold()),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::chain::ChainAction,
        models::{LookupRecord, SelectorDecl},
        system::lookup::LookupError,
    };

    fn sample_chain() -> Chain {
        let mut chain = Chain::new(vec![
            SelectorDecl::new("login_email", 0, "email", "email", "lu_users"),
            SelectorDecl::new("login_agency", 1, "agency", "agencyname", "lu_agency"),
            SelectorDecl::new("login_datatype", 2, "datatype", "datatype", "lu_datatype"),
        ])
        .unwrap();

        if let ChainAction::Refresh(ticket) = chain.request_options("login_agency").unwrap() {
            chain.complete_refresh(&ticket, Ok(vec![LookupRecord::new("SCCWRP", "SCCWRP")]));
        }
        if let ChainAction::Refresh(ticket) = chain.apply_selection("login_agency", "SCCWRP").unwrap() {
            chain.complete_refresh(&ticket, Err(LookupError::Status {
                url: "http://x/checker/login_values".to_string(),
                status: 502,
            }));
        }
        chain
    }

    #[test]
    fn test_render_shows_state_selection_and_nesting() {
        let text = render_chain(&sample_chain(), &DisplayOptions::default());
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("login_email") && lines[0].contains("empty"));
        assert!(lines[1].contains("login_agency") && lines[1].contains("SCCWRP"));
        assert!(lines[2].contains("└── ") && lines[2].contains("HTTP 502"));
    }

    #[test]
    fn test_render_lists_fields_and_options_on_request() {
        let options = DisplayOptions {
            show_fields: true,
            show_options: true,
        };
        let text = render_chain(&sample_chain(), &options);

        assert!(text.contains("table=lu_agency"));
        assert!(text.contains("* SCCWRP"));
    }
}
