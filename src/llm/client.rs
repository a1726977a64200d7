use anyhow::anyhow;
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::responses::{
        CreateResponseArgs, InputMessage, InputRole, OutputItem, OutputMessageContent,
    },
};
use async_trait::async_trait;

use crate::error::GenerationError;

const MAX_OUTPUT_TOKENS: u32 = 5000;

/// System and user halves of one model request.
#[derive(Clone, Debug)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// The opaque model boundary: prompt in, untrusted text out.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}

/// OpenAI-backed model.
#[derive(Clone, Debug)]
pub struct OpenAiModel {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiModel {
    pub fn new(api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        OpenAiModel {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl CompletionModel for OpenAiModel {
    async fn complete(&self, prompt: &Prompt) -> Result<String, GenerationError> {
        let request = CreateResponseArgs::default()
            .model(&self.model)
            .max_output_tokens(MAX_OUTPUT_TOKENS)
            .input(vec![
                InputMessage {
                    role: InputRole::System,
                    content: vec![prompt.system.as_str().into()],
                    status: None,
                },
                InputMessage {
                    role: InputRole::User,
                    content: vec![prompt.user.as_str().into()],
                    status: None,
                },
            ])
            .build()
            .map_err(|err| GenerationError::ModelUnavailable(anyhow!(err)))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|err| GenerationError::ModelUnavailable(anyhow!(err)))?;

        first_output_text(response.output).ok_or_else(|| {
            GenerationError::ModelRefused("no text output returned from model".to_string())
        })
    }
}

// The response nests text under message items; the first non-empty one
// is the answer, everything else (reasoning, refusals) is skipped.
fn first_output_text(output: Vec<OutputItem>) -> Option<String> {
    output.into_iter().find_map(|item| match item {
        OutputItem::Message(message) => message.content.into_iter().find_map(|content| {
            match content {
                OutputMessageContent::OutputText(text) => {
                    let trimmed = text.text.trim();
                    (!trimmed.is_empty()).then(|| trimmed.to_string())
                }
                _ => None,
            }
        }),
        _ => None,
    })
}
