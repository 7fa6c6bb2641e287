//! Assistant: keyword routing, text generation and the DataBot front
//!
//! - `intent`: substring routing of questions to local answers
//! - `llm`: the `TextGenerator` seam and the Mistral client
//! - `bot`: the assistant combining both with the caller's memory

pub mod bot;
pub mod intent;
pub mod llm;

pub use bot::{Answer, AnswerSource, DataBot, PendingAnswer};
pub use intent::{answer_locally, Intent};
pub use llm::{MistralClient, TextGenerator};
