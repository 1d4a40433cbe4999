//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// dealroom: LLM research reports for a venture portfolio.
///
/// Generates competitor, market and investment-memo reports, extracts
/// structured records from them and keeps a per-startup history.
#[derive(Parser, Debug)]
#[command(name = "dealroom")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the dealroom database file.
    ///
    /// Defaults to `.dealroom/dealroom.db` in the current directory.
    #[arg(short, long, env = "DEALROOM_DB_PATH", global = true)]
    pub db_path: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json, ndjson).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize the dealroom database.
    ///
    /// Creates the database file and schema if they don't exist.
    #[command(after_help = r#"Examples:
  dealroom init                    # Initialize in current directory
  dealroom init --force            # Re-initialize (destroys existing data)
  dealroom --db-path ./vc.db init  # Initialize with custom path
"#)]
    Init {
        /// Force re-initialization (destroys existing data).
        #[arg(short, long)]
        force: bool,
    },

    /// Show row counts and schema version.
    Status,

    /// Start the HTTP API.
    #[command(after_help = r#"Examples:
  dealroom serve                            # Listen on 127.0.0.1:3000
  dealroom serve --host 0.0.0.0 --port 8080
  dealroom serve --offline                  # Serve fallback reports only
"#)]
    Serve {
        /// Host to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to.
        #[arg(long, default_value = "3000", env = "DEALROOM_PORT")]
        port: u16,

        /// Disable model calls; every flow serves its fallback report.
        #[arg(long)]
        offline: bool,

        /// Directory containing system prompt overrides.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Generate a report from the terminal.
    ///
    /// Runs the same flow as the HTTP API and records the result in the
    /// report history.
    #[command(after_help = r#"Examples:
  dealroom report competitors 42 --name Acme --category Fintech
  dealroom report market 42 --action forecast
  dealroom report memo 42 --action update
  dealroom report competitors 42 --stream        # Print SSE frames as they arrive
  dealroom --format json report market 42 --offline | jq '.report.origin'
"#)]
    Report {
        /// Report kind: competitors, market, memo.
        kind: String,

        /// Startup id.
        subject_id: String,

        /// Startup name; read from the stored startup when omitted.
        #[arg(short, long)]
        name: Option<String>,

        /// Startup description.
        #[arg(long)]
        description: Option<String>,

        /// Sector or category.
        #[arg(short, long)]
        category: Option<String>,

        /// Flow action (research, analyze, compare, forecast, generate, update, enhance).
        #[arg(short, long)]
        action: Option<String>,

        /// Print `data:` frames as they stream instead of the final result.
        #[arg(long)]
        stream: bool,

        /// Disable model calls; the fallback report is generated.
        #[arg(long)]
        offline: bool,

        /// Directory containing system prompt overrides.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Startup records.
    #[command(subcommand)]
    Startup(StartupCommands),

    /// Write default system prompts to disk for customization.
    #[command(name = "init-prompts")]
    #[command(after_help = r#"Examples:
  dealroom init-prompts                      # Write to ~/.config/dealroom/prompts/
  dealroom init-prompts --dir ./my-prompts   # Write to custom directory
"#)]
    InitPrompts {
        /// Target directory for prompt files.
        ///
        /// Defaults to `~/.config/dealroom/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

/// Startup subcommands.
#[derive(Subcommand, Debug)]
pub enum StartupCommands {
    /// Add a startup.
    #[command(after_help = r#"Examples:
  dealroom startup add Acme --sector Fintech --description "Card issuing for SMBs"
  dealroom startup add Acme --id 42
"#)]
    Add {
        /// Display name.
        name: String,

        /// Explicit id (a UUID is generated otherwise).
        #[arg(long)]
        id: Option<String>,

        /// Sector or category.
        #[arg(short, long)]
        sector: Option<String>,

        /// One-paragraph description.
        #[arg(long)]
        description: Option<String>,

        /// Team information used by memos.
        #[arg(long)]
        team_info: Option<String>,
    },

    /// List startups.
    #[command(alias = "ls")]
    List,
}

impl Cli {
    /// Returns the database path, using the default if not specified.
    #[must_use]
    pub fn get_db_path(&self) -> PathBuf {
        self.db_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(crate::storage::DEFAULT_DB_PATH))
    }
}
