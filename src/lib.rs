//! Resolution of dependent selector chains: ordered dropdowns where every choice narrows
//! the options of the next one through a backend lookup endpoint.

/// Command-line front end.
pub mod cli;
/// Names, defaults and environment variables.
pub mod constants;
pub mod core;
/// Profiling helpers.
pub mod dev_utils;
/// Configuration, chain state and lookup wire types.
pub mod models;
pub mod system;
