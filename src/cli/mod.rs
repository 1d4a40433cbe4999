//! CLI layer for dealroom.
//!
//! Provides the command-line interface using clap, with commands for
//! initializing the database, generating reports and serving the API.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands, StartupCommands};
