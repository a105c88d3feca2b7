use async_trait::async_trait;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::ai::message::{ChatMessage, ContentPart};
use crate::ai::provider::{AiProvider, Completion, TokenUsage};
use crate::error::AppError;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 2048;

pub struct ClaudeProvider {
    client: Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl ClaudeProvider {
    pub fn new(api_key: String, model: String, api_url: Option<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
            api_url: api_url.unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
        }
    }

    /// Separate system messages from the conversation and build the request.
    fn build_request(&self, messages: &[ChatMessage], max_tokens: Option<u32>) -> ClaudeRequest {
        let mut system_text: Option<String> = None;
        let mut claude_messages = Vec::new();

        for msg in messages {
            if msg.role == "system" {
                // Anthropic API uses a top-level `system` parameter rather than a system role message.
                match &mut system_text {
                    Some(existing) => {
                        existing.push_str("\n\n");
                        existing.push_str(&msg.text());
                    }
                    None => system_text = Some(msg.text()),
                }
            } else {
                claude_messages.push(ClaudeMessage {
                    role: msg.role.clone(),
                    content: msg.content.iter().map(ClaudeContentBlock::from).collect(),
                });
            }
        }

        ClaudeRequest {
            model: self.model.clone(),
            max_tokens: max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system: system_text,
            messages: claude_messages,
        }
    }
}

// --- Request / Response types for the Anthropic Messages API ---

#[derive(Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<ClaudeMessage>,
}

#[derive(Serialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeContentBlock>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContentBlock {
    Text { text: String },
    Image { source: ClaudeImageSource },
}

#[derive(Serialize)]
struct ClaudeImageSource {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'static str,
    data: String,
}

impl From<&ContentPart> for ClaudeContentBlock {
    fn from(part: &ContentPart) -> Self {
        match part {
            ContentPart::Text(text) => ClaudeContentBlock::Text { text: text.clone() },
            ContentPart::Image(image) => ClaudeContentBlock::Image {
                source: ClaudeImageSource {
                    source_type: "base64",
                    media_type: image.media_type.as_str(),
                    data: image.data.clone(),
                },
            },
        }
    }
}

#[derive(Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeResponseBlock>,
    usage: Option<ClaudeUsage>,
}

#[derive(Deserialize)]
struct ClaudeResponseBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct ClaudeUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Pull the first text-typed block out of a Messages API reply.
fn into_completion(resp: ClaudeResponse) -> Result<Completion, AppError> {
    let text = resp
        .content
        .into_iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| {
            AppError::MalformedUpstreamResponse("reply contains no text content block".into())
        })?;

    Ok(Completion {
        text,
        usage: resp.usage.map(|u| TokenUsage {
            input_tokens: u.input_tokens,
            output_tokens: u.output_tokens,
        }),
    })
}

#[async_trait]
impl AiProvider for ClaudeProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        max_tokens: Option<u32>,
    ) -> Result<Completion, AppError> {
        let body = self.build_request(messages, max_tokens);

        info!("Sending request to Anthropic API ({})", self.model);
        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::AiProviderError(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "could not read body".into());
            return Err(AppError::AiProviderError(format!(
                "Anthropic API error ({}): {}",
                status, text
            )));
        }

        let resp: ClaudeResponse = response.json().await.map_err(|e| {
            AppError::MalformedUpstreamResponse(format!("Failed to parse response: {}", e))
        })?;
        info!("Received response from Anthropic API.");

        let completion = into_completion(resp)?;
        if let Some(usage) = &completion.usage {
            debug!(
                "Token usage: {} in / {} out ({} total)",
                usage.input_tokens,
                usage.output_tokens,
                usage.total()
            );
        }
        Ok(completion)
    }
}
