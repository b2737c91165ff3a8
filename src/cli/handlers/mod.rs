// src/cli/handlers/mod.rs

// One module per CLI command, plus the helpers they share.

/// `check`
pub mod check;
/// Helpers shared by the handlers.
pub mod commons;
/// `resolve` / `res`
pub mod resolve;
/// `show` / `ls`
pub mod show;
/// `walk`
pub mod walk;
