//! # dealroom
//!
//! LLM research reports for a venture portfolio.
//!
//! Three report flows (competitors, market, memo) share one pipeline:
//! templated prompts go to an OpenAI-compatible model, the answer is
//! streamed or returned whole, structured records are extracted from it
//! and competitor records are upserted idempotently into `SQLite`. When
//! the model is unavailable every flow serves a deterministic fallback
//! report.
//!
//! ## Modules
//!
//! - [`agent`]: prompts, providers, tool handling, generation and the pipeline
//! - [`relay`]: vendor stream frames to SSE events
//! - [`extract`]: strict and heuristic record extraction, report sections
//! - [`persist`]: idempotent competitor upserts
//! - [`storage`]: the `SQLite` store
//! - [`server`]: the axum HTTP API
//! - [`cli`]: the `dealroom` command line

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod extract;
pub mod persist;
pub mod relay;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
