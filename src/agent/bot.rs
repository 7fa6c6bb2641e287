//! The DataBot assistant
//!
//! Answers a question from the sales table, optionally through a hosted
//! model, and records the exchange in the caller's memory. The assistant
//! holds no session state of its own: the memory is passed in by the caller
//! (CLI loop or HTTP state).

use super::intent::answer_locally;
use super::llm::{MistralClient, TextGenerator};
use crate::config::DataBotConfig;
use crate::error::Result;
use crate::memory::ConversationMemory;
use crate::sales::{render_report, SalesTable};
use serde::Serialize;
use std::sync::Arc;

const INSTRUCTIONS: &str = "Tu es DataBot, un assistant commercial. \
Réponds en français, de façon concise, uniquement à partir des données fournies.";

/// Where an answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerSource {
    /// Hosted language model
    Model,
    /// Keyword matcher over the sales table
    Local,
}

/// Assistant answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub text: String,
    pub source: AnswerSource,
}

/// A question with its local answer and, when a model is attached, the
/// prompt built from the memory at the time of asking.
#[derive(Debug, Clone)]
pub struct PendingAnswer {
    local: String,
    prompt: Option<String>,
}

/// Sales assistant
pub struct DataBot {
    table: SalesTable,
    generator: Option<Arc<dyn TextGenerator>>,
    low_stock_threshold: u32,
    context_chars: usize,
}

impl DataBot {
    /// Local-only assistant with default settings.
    pub fn new(table: SalesTable) -> Self {
        let defaults = DataBotConfig::default();
        Self {
            table,
            generator: None,
            low_stock_threshold: defaults.sales.low_stock_threshold,
            context_chars: defaults.memory.context_chars,
        }
    }

    /// Build the assistant from configuration.
    ///
    /// Reads the CSV data file if configured and attaches the Mistral client
    /// when the model is enabled and an API key is available.
    pub fn from_config(config: &DataBotConfig) -> Result<Self> {
        let table = match &config.sales.data_file {
            Some(path) => SalesTable::from_csv(path)?,
            None => SalesTable::demo(),
        };

        let mut bot = Self::new(table)
            .with_low_stock_threshold(config.sales.low_stock_threshold)
            .with_context_chars(config.memory.context_chars);

        if config.llm.enabled {
            match config.llm.resolve_api_key() {
                Some(key) => {
                    let client = MistralClient::from_config(&config.llm, key)?;
                    tracing::info!(model = %client.model(), "Language model enabled");
                    bot = bot.with_generator(Arc::new(client));
                }
                None => tracing::info!(
                    env = %config.llm.api_key_env,
                    "No API key found, answering from local data only"
                ),
            }
        }

        Ok(bot)
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_low_stock_threshold(mut self, threshold: u32) -> Self {
        self.low_stock_threshold = threshold;
        self
    }

    pub fn with_context_chars(mut self, chars: usize) -> Self {
        self.context_chars = chars;
        self
    }

    pub fn table(&self) -> &SalesTable {
        &self.table
    }

    pub fn low_stock_threshold(&self) -> u32 {
        self.low_stock_threshold
    }

    pub fn has_model(&self) -> bool {
        self.generator.is_some()
    }

    /// Answer from the sales table only.
    pub fn answer_locally(&self, question: &str) -> String {
        answer_locally(&self.table, question, self.low_stock_threshold)
    }

    /// Today's commercial report.
    pub fn report(&self) -> String {
        render_report(&self.table)
    }

    /// Answer `question` and record the exchange in `memory`.
    ///
    /// A generator failure is logged and replaced by the local answer; this
    /// never fails.
    pub async fn ask(&self, memory: &mut ConversationMemory, question: &str) -> Answer {
        let pending = self.prepare(memory, question);
        let answer = self.respond(pending).await;
        memory.append_turn(question, answer.text.clone());
        answer
    }

    /// Everything `respond` needs from the memory, captured up front so the
    /// caller can release it during the model call.
    pub fn prepare(&self, memory: &ConversationMemory, question: &str) -> PendingAnswer {
        let local = self.answer_locally(question);
        let prompt = self
            .generator
            .as_ref()
            .map(|_| self.build_prompt(memory, question, &local));
        PendingAnswer { local, prompt }
    }

    /// Run the model on a prepared question, falling back to the local answer.
    /// The caller records the turn.
    pub async fn respond(&self, pending: PendingAnswer) -> Answer {
        let PendingAnswer { local, prompt } = pending;
        let (Some(generator), Some(prompt)) = (&self.generator, prompt) else {
            return Answer {
                text: local,
                source: AnswerSource::Local,
            };
        };

        match generator.generate(&prompt).await {
            Ok(text) => Answer {
                text,
                source: AnswerSource::Model,
            },
            Err(e) => {
                tracing::warn!(
                    generator = generator.name(),
                    error = %e,
                    "Model unavailable, falling back to local answer"
                );
                Answer {
                    text: local,
                    source: AnswerSource::Local,
                }
            }
        }
    }

    /// Prompt sent to the model: instructions, data digest, history, question.
    pub fn build_prompt(&self, memory: &ConversationMemory, question: &str, local: &str) -> String {
        let mut prompt = String::from(INSTRUCTIONS);
        prompt.push_str("\n\nDONNÉES:\n");
        prompt.push_str(&self.table.to_string());
        prompt.push('\n');
        prompt.push_str(&self.report());
        prompt.push_str("\nANALYSE RAPIDE: ");
        prompt.push_str(local);
        prompt.push_str("\n\n");

        let context = memory.context_for_prompt(self.context_chars);
        if !context.is_empty() {
            prompt.push_str(&context);
            prompt.push('\n');
        }

        prompt.push_str("QUESTION: ");
        prompt.push_str(question);
        prompt
    }
}
