//! Anthropic Messages API adapter (text only).
//!
//! Auth: `x-api-key` plus a pinned `anthropic-version`.

use serde::{Deserialize, Serialize};

use super::{AdapterContext, AdapterResult, non_empty, resolve_model};
use crate::core::http::{join_url, send_json};
use crate::core::options::RequestOptions;

/// API version header value.
pub const API_VERSION: &str = "2023-06-01";

/// Default model.
pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Generate text with the Messages API.
pub async fn generate_text(
    ctx: &AdapterContext<'_>,
    prompt: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    // Anthropic's temperature range is [0, 1].
    let body = MessagesRequest {
        model: resolve_model(model, options, DEFAULT_MODEL),
        max_tokens: options.max_tokens_or_default(),
        temperature: options.temperature_or_default().min(1.0),
        messages: [Message {
            role: "user",
            content: prompt,
        }],
    };

    let response: MessagesResponse = send_json(
        ctx.client
            .post(join_url(ctx.base_url, "/v1/messages"))
            .header("x-api-key", ctx.key.expose_secret())
            .header("anthropic-version", API_VERSION)
            .json(&body),
    )
    .await?;

    let text = response
        .content
        .into_iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text)
        .collect::<String>();
    non_empty(text, "completion")
}
