//! CLI command handling module
//!
//! Handles all CLI subcommands and argument parsing.

mod commands;
mod config;
mod logging;
mod version;

pub use commands::{ViewArgs, handle_namespaces, handle_render, handle_replay, read_input};
pub use config::{ConfigSubcommand, handle_config_command};
pub use logging::*;
pub use version::display_version;
