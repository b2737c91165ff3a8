//! # Dependent Selector Chain
//!
//! The in-memory state of a form group's selectors. Roots (index `0`) stand alone; the
//! dependent sequence `1..=n` narrows itself stepwise, each node's options being looked up
//! with the confirmed values of every dependent node above it.
//!
//! The chain never performs I/O. Mutations hand back a [`RefreshTicket`] describing the
//! lookup to run, and the caller reports the result through [`Chain::complete_refresh`].
//! Every ticket carries the node's token at the time it was issued; a result whose token
//! is no longer current is discarded, so the latest user action always wins.

use crate::{
    models::{LookupRecord, LookupRequest, OptionsState, SelectOption, SelectorDecl, SelectorNode},
    system::lookup::LookupError,
};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Errors raised by building or driving a [`Chain`]. Lookup failures are not among them;
/// those end up as node state.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChainError {
    /// No selectors were declared.
    #[error("The chain declares no selectors.")]
    Empty,
    /// A selector with a blank name, reported by its index.
    #[error("Selector names must not be empty (found one at index {0}).")]
    EmptyName(usize),
    /// Two selectors share a name.
    #[error("Selector name '{0}' is declared more than once.")]
    DuplicateName(String),
    /// Two dependent selectors share an index.
    #[error("Selectors '{first}' and '{second}' both claim index {index}.")]
    DuplicateIndex {
        /// The contested index.
        index: usize,
        /// The selector declared first.
        first: String,
        /// The selector declared second.
        second: String,
    },
    /// The dependent sequence skips this index.
    #[error("Dependent selectors must be numbered from 1 without gaps, but index {0} is missing.")]
    IndexGap(usize),
    /// No node carries this name.
    #[error("No selector named '{0}' in this chain.")]
    UnknownSelector(String),
    /// The value is not among the node's current (non-placeholder) options.
    #[error("'{value}' is not one of the options currently offered by '{selector}'.")]
    UnknownOption {
        /// The node the value was offered to.
        selector: String,
        /// The rejected value.
        value: String,
    },
}

type ChainResult<T> = Result<T, ChainError>;

/// A lookup the chain wants performed on behalf of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshTicket {
    /// The node whose options are being fetched.
    pub node: String,
    /// The node's token when the ticket was issued.
    pub token: u64,
    /// What to ask the lookup service.
    pub request: LookupRequest,
}

/// What a mutation of the chain requires from the caller next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainAction {
    /// Run this lookup and report it back.
    Refresh(RefreshTicket),
    /// The changed node is the last of the chain. Nothing to fetch.
    Terminal,
    /// The successor cannot be filtered yet because these upstream nodes are unset.
    Blocked {
        /// The node that could not be loaded.
        node: String,
        /// Unset upstream nodes, in index order.
        missing: Vec<String>,
    },
    /// A root changed. Roots feed no other selector.
    Independent,
}

/// How a finished lookup affected the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The node now offers `choices` options (placeholder not counted).
    Applied {
        /// The refreshed node.
        node: String,
        /// Number of selectable options.
        choices: usize,
    },
    /// A newer ticket superseded this one; the result was dropped.
    Stale {
        /// The node the result was meant for.
        node: String,
        /// The superseded token.
        token: u64,
    },
    /// The lookup failed. The node shows `reason` and no options.
    Failed {
        /// The node whose lookup failed.
        node: String,
        /// Human-readable cause.
        reason: String,
    },
}

impl RefreshOutcome {
    /// Name of the node this outcome is about.
    pub fn node(&self) -> &str {
        match self {
            Self::Applied { node, .. } | Self::Stale { node, .. } | Self::Failed { node, .. } => {
                node
            }
        }
    }
}

/// The selectors of one form group: any number of roots plus a gap-free dependent sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chain {
    roots: Vec<SelectorNode>,
    dependents: BTreeMap<usize, SelectorNode>,
}

impl Chain {
    /// Builds a chain from its declarations, enforcing unique names and a gap-free
    /// dependent sequence starting at index 1.
    pub fn new(decls: Vec<SelectorDecl>) -> ChainResult<Self> {
        if decls.is_empty() {
            return Err(ChainError::Empty);
        }

        let mut seen_names = HashSet::new();
        let mut roots = Vec::new();
        let mut dependents: BTreeMap<usize, SelectorNode> = BTreeMap::new();

        for decl in decls {
            if decl.name.trim().is_empty() {
                return Err(ChainError::EmptyName(decl.index));
            }
            if !seen_names.insert(decl.name.clone()) {
                return Err(ChainError::DuplicateName(decl.name));
            }

            if decl.is_root() {
                roots.push(SelectorNode::new(decl));
                continue;
            }

            if let Some(existing) = dependents.get(&decl.index) {
                return Err(ChainError::DuplicateIndex {
                    index: decl.index,
                    first: existing.name().to_string(),
                    second: decl.name,
                });
            }
            dependents.insert(decl.index, SelectorNode::new(decl));
        }

        // BTreeMap keys are sorted, so the first mismatch is the lowest missing index.
        for (expected, &actual) in (1..).zip(dependents.keys()) {
            if expected != actual {
                return Err(ChainError::IndexGap(expected));
            }
        }

        Ok(Self { roots, dependents })
    }

    /// All nodes in chain order: roots as declared, then the dependents by index.
    pub fn nodes(&self) -> impl Iterator<Item = &SelectorNode> {
        self.roots.iter().chain(self.dependents.values())
    }

    /// Looks a node up by name.
    pub fn node(&self, name: &str) -> Option<&SelectorNode> {
        self.nodes().find(|n| n.name() == name)
    }

    /// The dependent node at `index`. Roots are not addressable by index.
    pub fn dependent(&self, index: usize) -> Option<&SelectorNode> {
        self.dependents.get(&index)
    }

    /// Number of nodes, roots included.
    pub fn len(&self) -> usize {
        self.roots.len() + self.dependents.len()
    }

    /// Always `false` for a chain built through [`Chain::new`].
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn node_mut(&mut self, name: &str) -> ChainResult<&mut SelectorNode> {
        self.roots
            .iter_mut()
            .chain(self.dependents.values_mut())
            .find(|n| n.name() == name)
            .ok_or_else(|| ChainError::UnknownSelector(name.to_string()))
    }

    /// Nodes loaded eagerly, with no filter and no user interaction: every root plus the
    /// first dependent, which has nothing upstream to wait for.
    pub fn initial_targets(&self) -> Vec<String> {
        self.roots
            .iter()
            .chain(self.dependents.get(&1))
            .map(|n| n.name().to_string())
            .collect()
    }

    /// The `(value_field, selected)` pairs of every dependent node strictly above
    /// `successor_index`, ascending. Unset nodes are returned as the error.
    pub fn filter_for(&self, successor_index: usize) -> Result<Vec<(String, String)>, Vec<String>> {
        if successor_index <= 1 {
            return Ok(Vec::new());
        }

        let mut filter = Vec::new();
        let mut missing = Vec::new();

        for node in self.dependents.range(1..successor_index).map(|(_, n)| n) {
            match &node.selected {
                Some(value) => filter.push((node.decl.value_field.clone(), value.clone())),
                None => missing.push(node.name().to_string()),
            }
        }

        if missing.is_empty() {
            Ok(filter)
        } else {
            Err(missing)
        }
    }

    /// Issues a ticket for `name` with an explicit filter, superseding any earlier one.
    pub fn begin_refresh(
        &mut self,
        name: &str,
        filter: Vec<(String, String)>,
    ) -> ChainResult<RefreshTicket> {
        let node = self.node_mut(name)?;
        node.token += 1;
        node.state = OptionsState::Loading { token: node.token };
        log::debug!("Issuing lookup for '{}' with token {}", name, node.token);

        Ok(RefreshTicket {
            node: name.to_string(),
            token: node.token,
            request: LookupRequest::for_selector(&node.decl, filter),
        })
    }

    /// Plans a (re)load of `name` using whatever its upstream currently holds.
    pub fn request_options(&mut self, name: &str) -> ChainResult<ChainAction> {
        let index = self
            .node(name)
            .map(SelectorNode::index)
            .ok_or_else(|| ChainError::UnknownSelector(name.to_string()))?;

        // Roots and the first dependent filter on nothing.
        let filter = if index <= 1 {
            Vec::new()
        } else {
            match self.filter_for(index) {
                Ok(filter) => filter,
                Err(missing) => return Ok(self.block(name, missing)),
            }
        };

        self.begin_refresh(name, filter).map(ChainAction::Refresh)
    }

    /// Records a user's choice on `name` and plans the follow-up lookup.
    ///
    /// For a dependent node at index `k`, every node below it is invalidated (selection,
    /// options and any in-flight lookup), then node `k + 1` is scheduled for a refresh
    /// filtered by nodes `1..=k`.
    pub fn apply_selection(&mut self, name: &str, value: &str) -> ChainResult<ChainAction> {
        let node = self.node_mut(name)?;
        if !node.has_choice(value) {
            return Err(ChainError::UnknownOption {
                selector: name.to_string(),
                value: value.to_string(),
            });
        }
        node.selected = Some(value.to_string());

        if node.is_root() {
            return Ok(ChainAction::Independent);
        }

        let index = node.index();
        self.invalidate_below(index);

        let successor_index = index + 1;
        let Some(successor) = self.dependents.get(&successor_index) else {
            return Ok(ChainAction::Terminal);
        };
        let successor_name = successor.name().to_string();

        match self.filter_for(successor_index) {
            Ok(filter) => self
                .begin_refresh(&successor_name, filter)
                .map(ChainAction::Refresh),
            Err(missing) => Ok(self.block(&successor_name, missing)),
        }
    }

    /// Applies a finished lookup, unless a newer ticket has been issued for the node since.
    pub fn complete_refresh(
        &mut self,
        ticket: &RefreshTicket,
        result: Result<Vec<LookupRecord>, LookupError>,
    ) -> RefreshOutcome {
        let Ok(node) = self.node_mut(&ticket.node) else {
            return RefreshOutcome::Stale {
                node: ticket.node.clone(),
                token: ticket.token,
            };
        };

        if node.token != ticket.token {
            log::debug!(
                "Discarding stale lookup for '{}' (token {}, current {})",
                ticket.node,
                ticket.token,
                node.token
            );
            return RefreshOutcome::Stale {
                node: ticket.node.clone(),
                token: ticket.token,
            };
        }

        match result {
            Ok(records) => {
                node.options = std::iter::once(SelectOption::placeholder())
                    .chain(records.into_iter().map(SelectOption::from))
                    .collect();
                node.state = OptionsState::Ready;

                let choices = node.choices().count();
                let lost_selection = node
                    .selected
                    .as_deref()
                    .is_some_and(|value| !node.has_choice(value));

                // A reload that drops the current choice leaves everything below unfiltered.
                if lost_selection {
                    node.selected = None;
                    if !node.is_root() {
                        let index = node.index();
                        self.invalidate_below(index);
                    }
                }

                RefreshOutcome::Applied {
                    node: ticket.node.clone(),
                    choices,
                }
            }
            Err(e) => {
                log::warn!("Lookup for '{}' failed: {}", ticket.node, e);
                let reason = e.to_string();
                node.options.clear();
                node.state = OptionsState::Failed {
                    reason: reason.clone(),
                };

                // With no options left the selection cannot stand, nor can anything
                // filtered by it.
                if node.selected.take().is_some() && !node.is_root() {
                    let index = node.index();
                    self.invalidate_below(index);
                }

                RefreshOutcome::Failed {
                    node: ticket.node.clone(),
                    reason,
                }
            }
        }
    }

    fn invalidate_below(&mut self, index: usize) {
        for (_, node) in self.dependents.range_mut(index + 1..) {
            node.invalidate();
        }
    }

    fn block(&mut self, name: &str, missing: Vec<String>) -> ChainAction {
        log::debug!("Lookup for '{}' blocked; unset upstream: {:?}", name, missing);
        if let Ok(node) = self.node_mut(name) {
            node.token += 1;
            node.options.clear();
            node.state = OptionsState::Blocked {
                missing: missing.clone(),
            };
        }
        ChainAction::Blocked {
            node: name.to_string(),
            missing,
        }
    }
}
