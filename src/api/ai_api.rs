use crate::api::read_json;
use crate::config::endpoint;
use crate::error::{CodeMasterError, Result};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    model: String,
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Deserialize)]
struct AnthropicBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

/// Text answer plus the model that produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Completion {
    pub model: String,
    pub text: String,
}

/// Stateless LLM provider endpoints.
pub struct AiEndpoints;

impl AiEndpoints {
    /// `POST {base}/chat/completions` with bearer auth.
    pub async fn openai_chat(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion> {
        let body = OpenAiRequest {
            model,
            messages,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: 0.2,
        };
        let resp = client
            .post(endpoint(base, "chat/completions")?)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let payload: OpenAiResponse = read_json(resp).await?;
        let text = payload
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| CodeMasterError::InvalidResponse("no choices returned".to_string()))?;
        info!(model = %payload.model, "openai completion received");
        Ok(Completion {
            model: payload.model,
            text,
        })
    }

    /// `POST {base}/messages`. System messages are lifted into the
    /// top-level `system` field.
    pub async fn anthropic_messages(
        client: &reqwest::Client,
        base: &Url,
        api_key: &str,
        model: &str,
        messages: &[ChatMessage],
    ) -> Result<Completion> {
        let system = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| m.content.as_str());
        let body = AnthropicRequest {
            model,
            max_tokens: DEFAULT_MAX_TOKENS,
            system,
            messages: messages.iter().filter(|m| m.role != "system").collect(),
        };
        let resp = client
            .post(endpoint(base, "messages")?)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let payload: AnthropicResponse = read_json(resp).await?;
        let text = payload
            .content
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        if text.is_empty() {
            return Err(CodeMasterError::InvalidResponse(
                "no text content returned".to_string(),
            ));
        }
        info!(model = %payload.model, "anthropic completion received");
        Ok(Completion {
            model: payload.model,
            text,
        })
    }
}
