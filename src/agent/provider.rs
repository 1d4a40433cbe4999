//! Model backend seam.
//!
//! Flows only talk to [`LlmProvider`]; the vendor SDK lives behind it.

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use super::message::{ChatRequest, ChatResponse, StreamFrame};
use crate::error::AgentError;

/// Frames of a streamed completion, in arrival order.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<StreamFrame, AgentError>> + Send>>;

/// A chat model backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &'static str;

    /// Runs a blocking completion.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on transport or API failures.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;

    /// Opens a streamed completion.
    ///
    /// Dropping the returned stream abandons the upstream request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] when the stream cannot be established.
    async fn chat_stream(&self, request: &ChatRequest) -> Result<FrameStream, AgentError>;
}
