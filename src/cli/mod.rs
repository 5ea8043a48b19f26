//! CLI command handlers

pub mod commands;

pub use commands::{dump, keywords, run};
