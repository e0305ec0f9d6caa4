//! Chat-completions backed summarizer

use serde::{Deserialize, Serialize};

use crate::config::ModelConfig;
use crate::error::{Result, VulnLensError};
use crate::http::ModelClient;
use crate::summarize::prompt::{clean_response, SYSTEM_MESSAGE};
use crate::summarize::{SummaryRequest, Summarizer};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// [`Summarizer`] over an OpenAI-compatible `/v1/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    client: ModelClient,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl ChatSummarizer {
    pub fn new(config: &ModelConfig) -> Result<Self> {
        Ok(Self {
            client: ModelClient::new(config)?,
            endpoint: config.chat_endpoint.clone(),
            model: config.chat_model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }
}

impl Summarizer for ChatSummarizer {
    async fn summarize(&self, request: &SummaryRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_MESSAGE,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            stream: false,
        };

        let response: ChatResponse = self.client.post_json("chat", &self.endpoint, &body).await?;
        extract_summary(response)
    }
}

/// First choice's content, cleaned; an empty answer is an error
fn extract_summary(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| VulnLensError::model("chat", "response has no choices"))?;

    let cleaned = clean_response(&content);
    if cleaned.is_empty() {
        return Err(VulnLensError::model("chat", "empty completion"));
    }
    Ok(cleaned)
}
