//! Agentic tool-calling loop.
//!
//! Drives the model ↔ tool round-trip used in execute mode: send the
//! request, run any tool calls, append their results, repeat until the
//! model answers without tools or the iteration limit is reached. Every
//! text segment and a trace line per call are collected into one
//! transcript.

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::executor::ToolHandler;
use super::message::{ChatRequest, TokenUsage, assistant_message, tool_message};
use super::provider::LlmProvider;
use super::tool::trace_line;
use crate::error::AgentError;

/// What a completed loop produced.
#[derive(Debug, Clone, Default)]
pub struct LoopOutcome {
    /// Model text and tool trace lines, in order.
    pub transcript: String,
    /// Model round-trips made.
    pub iterations: usize,
    /// Tool calls executed.
    pub tool_calls: usize,
    /// Summed token usage.
    pub usage: TokenUsage,
}

/// Runs model → tools → model … until a tool-free answer.
///
/// `request` is extended in place with assistant and tool messages.
///
/// # Errors
///
/// Returns [`AgentError::ToolLoopExceeded`] if the model keeps calling
/// tools past `max_iterations`, [`AgentError::Cancelled`] if `cancel`
/// fires, and propagates provider errors.
pub async fn agentic_loop(
    provider: &dyn LlmProvider,
    request: &mut ChatRequest,
    executor: &dyn ToolHandler,
    max_iterations: usize,
    cancel: &CancellationToken,
) -> Result<LoopOutcome, AgentError> {
    let mut outcome = LoopOutcome::default();

    for iteration in 0..max_iterations {
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AgentError::Cancelled),
            response = provider.chat(request) => response?,
        };
        outcome.iterations = iteration + 1;
        outcome.usage.prompt_tokens += response.usage.prompt_tokens;
        outcome.usage.completion_tokens += response.usage.completion_tokens;
        outcome.usage.total_tokens += response.usage.total_tokens;
        outcome.transcript.push_str(&response.content);

        if response.tool_calls.is_empty() {
            debug!(iteration, "agentic loop completed with final text response");
            return Ok(outcome);
        }

        debug!(
            iteration,
            tool_count = response.tool_calls.len(),
            "executing tool calls"
        );

        request.messages.push(assistant_message(
            &response.content,
            response.tool_calls.clone(),
        ));

        for call in &response.tool_calls {
            outcome.transcript.push_str(&trace_line(call, true));
            let result = executor.execute(call).await;
            debug!(
                tool = call.name,
                call_id = call.id,
                is_error = result.is_error,
                "tool execution complete"
            );
            outcome.tool_calls += 1;
            request
                .messages
                .push(tool_message(&result.tool_call_id, &result.content));
        }
    }

    Err(AgentError::ToolLoopExceeded { max_iterations })
}
