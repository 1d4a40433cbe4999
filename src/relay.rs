//! Streaming relay: provider frames in, SSE events out.
//!
//! Text deltas are forwarded as they arrive. Tool-call fragments are
//! buffered per call index and turned into one `search` or
//! `agent_updated` event once the call is complete (a new index starts,
//! the model finishes, or the stream ends). A clean end emits
//! `final_output` with the accumulated text; a failed upstream emits a
//! single `error` event and stops.
//!
//! When the receiving side goes away the relay cancels its token and
//! drops the upstream stream, which closes the provider connection.

use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::agent::message::{StreamFrame, ToolCallDelta};
use crate::agent::provider::FrameStream;
use crate::agent::tool::{SAVE_COMPETITOR, ToolCall, WEB_SEARCH, call_label, trace_line};

/// One SSE envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Text delta.
    Content {
        /// Delta text.
        text: String,
    },
    /// The model asked for a web search.
    Search {
        /// Search query.
        query: String,
    },
    /// The model asked to save a competitor.
    AgentUpdated {
        /// Competitor name.
        name: String,
    },
    /// The full report text; always the last event of a clean stream.
    FinalOutput {
        /// Accumulated report text.
        text: String,
    },
    /// Upstream failure; the stream closes after it.
    Error {
        /// What went wrong.
        message: String,
    },
}

impl StreamEvent {
    /// JSON payload of the event.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error","message":"serialization failed"}"#.to_string())
    }

    /// `data: <json>\n\n` frame.
    #[must_use]
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }

    /// Event for a completed tool call, if the call is one the client shows.
    #[must_use]
    pub fn for_tool_call(call: &ToolCall) -> Option<Self> {
        let label = call_label(&call.name, &call.arguments)?;
        match call.name.as_str() {
            WEB_SEARCH => Some(Self::Search { query: label }),
            SAVE_COMPETITOR => Some(Self::AgentUpdated { name: label }),
            _ => None,
        }
    }
}

/// How a relay ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Upstream finished and `final_output` was sent.
    Completed,
    /// Upstream failed and an `error` event was sent.
    Failed,
    /// The receiver went away or the token was cancelled.
    Disconnected,
}

/// Result of relaying one stream.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    /// Text sent to the client, including tool trace lines.
    pub text: String,
    /// How the stream ended.
    pub end: RelayEnd,
    /// Whether `text` was replaced by the fallback.
    pub used_fallback: bool,
}

#[derive(Debug, Default)]
struct PendingCall {
    index: u32,
    id: String,
    name: String,
    arguments: String,
}

impl PendingCall {
    fn into_call(self) -> ToolCall {
        ToolCall {
            id: self.id,
            name: self.name,
            arguments: self.arguments,
        }
    }
}

/// Accumulates tool-call fragments until a call is complete.
#[derive(Debug, Default)]
pub struct ToolCallBuffer {
    current: Option<PendingCall>,
}

impl ToolCallBuffer {
    /// Adds a fragment. Returns the previous call when `delta` starts a new one.
    pub fn push(&mut self, delta: ToolCallDelta) -> Option<ToolCall> {
        let completed = match &self.current {
            Some(pending) if pending.index != delta.index => self.flush(),
            _ => None,
        };
        let pending = self.current.get_or_insert_with(|| PendingCall {
            index: delta.index,
            ..PendingCall::default()
        });
        if let Some(id) = delta.id {
            pending.id = id;
        }
        if let Some(name) = delta.name {
            pending.name.push_str(&name);
        }
        if let Some(arguments) = delta.arguments {
            pending.arguments.push_str(&arguments);
        }
        completed
    }

    /// Takes the call being assembled, if any.
    pub fn flush(&mut self) -> Option<ToolCall> {
        self.current.take().map(PendingCall::into_call)
    }
}

struct Relay<'a> {
    tx: &'a mpsc::Sender<StreamEvent>,
    cancel: &'a CancellationToken,
    text: String,
    forwarded: usize,
}

impl Relay<'_> {
    async fn send(&mut self, event: StreamEvent) -> bool {
        if self.tx.send(event).await.is_ok() {
            self.forwarded += 1;
            true
        } else {
            debug!("stream receiver dropped; cancelling generation");
            self.cancel.cancel();
            false
        }
    }

    async fn emit_call(&mut self, call: &ToolCall) -> bool {
        // Streamed calls are never executed; the trace says so.
        self.text.push_str(&trace_line(call, false));
        match StreamEvent::for_tool_call(call) {
            Some(event) => self.send(event).await,
            None => {
                debug!(tool = %call.name, "tool call without a displayable label");
                true
            }
        }
    }
}

/// Relays `frames` into `tx` until the stream ends, fails or is cancelled.
///
/// `fallback` is called when the stream completes without any text, or
/// fails before anything was forwarded (providers report a refused
/// connection as the first item). Its result is sent as one `content`
/// event before `final_output`.
pub async fn relay<F>(
    mut frames: FrameStream,
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    fallback: F,
) -> RelayOutcome
where
    F: FnOnce() -> String + Send,
{
    let mut relay = Relay {
        tx,
        cancel,
        text: String::new(),
        forwarded: 0,
    };
    let mut calls = ToolCallBuffer::default();

    let disconnected = |text: String| RelayOutcome {
        text,
        end: RelayEnd::Disconnected,
        used_fallback: false,
    };

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => return disconnected(relay.text),
            next = frames.next() => next,
        };

        match next {
            None => break,
            Some(Ok(StreamFrame::Content(delta))) => {
                if delta.is_empty() {
                    continue;
                }
                relay.text.push_str(&delta);
                if !relay.send(StreamEvent::Content { text: delta }).await {
                    return disconnected(relay.text);
                }
            }
            Some(Ok(StreamFrame::ToolCall(delta))) => {
                if let Some(call) = calls.push(delta)
                    && !relay.emit_call(&call).await
                {
                    return disconnected(relay.text);
                }
            }
            Some(Ok(StreamFrame::Finish(reason))) => {
                debug!(finish_reason = %reason, "stream finished");
                if let Some(call) = calls.flush()
                    && !relay.emit_call(&call).await
                {
                    return disconnected(relay.text);
                }
            }
            Some(Err(e)) if relay.forwarded == 0 && relay.text.is_empty() => {
                warn!(error = %e, "stream failed before any output; sending fallback");
                drop(frames);
                let text = fallback();
                let end = emit_whole(tx, cancel, &text).await;
                return RelayOutcome {
                    text,
                    end,
                    used_fallback: true,
                };
            }
            Some(Err(e)) => {
                warn!(error = %e, "stream failed mid-response");
                drop(frames);
                relay
                    .send(StreamEvent::Error {
                        message: e.to_string(),
                    })
                    .await;
                return RelayOutcome {
                    text: relay.text,
                    end: RelayEnd::Failed,
                    used_fallback: false,
                };
            }
        }
    }

    if let Some(call) = calls.flush()
        && !relay.emit_call(&call).await
    {
        return disconnected(relay.text);
    }

    if relay.text.trim().is_empty() {
        let text = fallback();
        let end = emit_whole(tx, cancel, &text).await;
        return RelayOutcome {
            text,
            end,
            used_fallback: true,
        };
    }

    let end = if relay
        .send(StreamEvent::FinalOutput {
            text: relay.text.clone(),
        })
        .await
    {
        RelayEnd::Completed
    } else {
        RelayEnd::Disconnected
    };
    RelayOutcome {
        text: relay.text,
        end,
        used_fallback: false,
    }
}

/// Sends `text` as a single `content` event followed by `final_output`.
///
/// Used when no upstream stream could be established.
pub async fn emit_whole(
    tx: &mpsc::Sender<StreamEvent>,
    cancel: &CancellationToken,
    text: &str,
) -> RelayEnd {
    let mut relay = Relay {
        tx,
        cancel,
        text: String::new(),
        forwarded: 0,
    };
    let sent = relay
        .send(StreamEvent::Content {
            text: text.to_string(),
        })
        .await
        && relay
            .send(StreamEvent::FinalOutput {
                text: text.to_string(),
            })
            .await;
    if sent {
        RelayEnd::Completed
    } else {
        RelayEnd::Disconnected
    }
}
