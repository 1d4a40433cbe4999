//! Error types for dealroom.
//!
//! Errors are split by layer: [`AgentError`] for model and tool calls,
//! [`StorageError`] for `SQLite` access, and [`CommandError`] for CLI and
//! HTTP argument problems. [`Error`] unifies them for the binary.

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    /// Model, tool or streaming failure.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Invalid command or request input.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Structured extraction failure.
    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// I/O failure (prompt files, stdout).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while talking to the language model or running tools.
#[derive(Error, Debug)]
pub enum AgentError {
    /// No API key was configured for a provider that needs one.
    #[error("API key missing: set OPENAI_API_KEY or DEALROOM_API_KEY")]
    ApiKeyMissing,

    /// The configured provider name is not known.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Provider name from configuration.
        name: String,
    },

    /// The model call was refused because the provider is disabled.
    #[error("model calls are disabled (offline provider)")]
    Disabled,

    /// The provider request failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Provider error message.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// The provider stream failed after it was established.
    #[error("stream error: {message}")]
    Stream {
        /// Underlying failure.
        message: String,
    },

    /// The model response could not be parsed.
    #[error("failed to parse model response: {message}")]
    ResponseParse {
        /// Parse failure description.
        message: String,
        /// Raw content that failed to parse.
        content: String,
    },

    /// A tool call failed.
    #[error("tool '{name}' failed: {message}")]
    ToolExecution {
        /// Tool name.
        name: String,
        /// Failure description.
        message: String,
    },

    /// The tool-calling loop did not converge.
    #[error("tool loop exceeded {max_iterations} iterations")]
    ToolLoopExceeded {
        /// Configured iteration limit.
        max_iterations: usize,
    },

    /// The web-search backend failed or is not configured.
    #[error("search backend error: {message}")]
    Search {
        /// Failure description.
        message: String,
    },

    /// Generation was cancelled because the client went away.
    #[error("generation cancelled")]
    Cancelled,
}

/// Errors raised by strict structured extraction.
///
/// Heuristic extraction never fails; these only tell the caller to fall
/// back to it.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The JSON is valid but has no record list.
    #[error("expected an array or an object with a `records` or `competitors` array")]
    UnexpectedShape,
}

/// Errors raised by the `SQLite` store.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying `SQLite` error.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The schema has not been created yet.
    #[error("database not initialized: run `dealroom init` first")]
    NotInitialized,

    /// The storage mutex was poisoned by a panicking holder.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// A record required for the operation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. `"startup"`).
        entity: &'static str,
        /// Identifier that was looked up.
        id: String,
    },

    /// A record was rejected before reaching the database.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Filesystem failure while creating the database directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by invalid user input.
#[derive(Error, Debug)]
pub enum CommandError {
    /// An argument or body field is missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The action is not valid for the report kind.
    #[error("invalid action '{action}' for {kind} reports")]
    UnknownAction {
        /// Report kind.
        kind: String,
        /// Rejected action.
        action: String,
    },

    /// The report or analysis kind is not known.
    #[error("unknown kind: {0}")]
    UnknownKind(String),

    /// A command could not complete.
    #[error("command failed: {0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output error: {0}")]
    Output(String),
}
