pub mod client;
pub mod prompt;
pub mod response;

use std::time::Duration;

use anyhow::anyhow;
use tracing::debug;

use crate::card::FlashcardDraft;
use crate::error::GenerationError;

pub use client::{CompletionModel, OpenAiModel, Prompt};
pub use response::parse_drafts;

#[derive(Clone, Debug)]
pub struct GeneratorConfig {
    /// Model-call timeout. A hung request is abandoned, surfacing as
    /// `ModelUnavailable`.
    pub timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        GeneratorConfig {
            timeout: Duration::from_secs(60),
        }
    }
}

/// Turns topic content into validated flashcard drafts via an external
/// generative model.
///
/// The adapter does not retry and does not deduplicate: a retried call
/// may legitimately produce a different draft set, and both policies
/// belong to the caller.
#[derive(Clone, Debug)]
pub struct Generator<M> {
    model: M,
    config: GeneratorConfig,
}

impl<M: CompletionModel> Generator<M> {
    pub fn new(model: M, config: GeneratorConfig) -> Self {
        Generator { model, config }
    }

    /// Request roughly `count` drafts for `content`. `count` is a hint;
    /// the model may return more or fewer.
    pub async fn generate(
        &self,
        content: &str,
        count: usize,
    ) -> Result<Vec<FlashcardDraft>, GenerationError> {
        if content.trim().is_empty() {
            return Err(GenerationError::ModelRefused(
                "empty content".to_string(),
            ));
        }
        if count == 0 {
            return Err(GenerationError::ModelRefused(
                "zero flashcards requested".to_string(),
            ));
        }

        let prompt = prompt::generation_prompt(content, count);
        let raw = tokio::time::timeout(self.config.timeout, self.model.complete(&prompt))
            .await
            .map_err(|_| {
                GenerationError::ModelUnavailable(anyhow!(
                    "model call timed out after {:?}",
                    self.config.timeout
                ))
            })??;

        let drafts = parse_drafts(&raw)?;
        debug!(requested = count, produced = drafts.len(), "generated drafts");
        Ok(drafts)
    }
}
