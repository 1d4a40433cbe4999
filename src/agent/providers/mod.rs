//! Concrete [`LlmProvider`](super::provider::LlmProvider) backends.

mod offline;
mod openai;

pub use offline::DisabledProvider;
pub use openai::OpenAiProvider;
