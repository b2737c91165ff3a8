// src/core/mod.rs

//! Chain state, its orchestration and the configuration it is built from.

pub mod chain;
/// Terminal rendering of a chain.
pub mod chain_display;
pub mod config_loader;
/// Where the configuration file lives.
pub mod paths;
pub mod resolver;
