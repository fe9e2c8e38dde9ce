//! Google Gemini adapter (text only).
//!
//! Endpoint: `/v1beta/models/{model}:generateContent`, auth via
//! `x-goog-api-key`.

use serde::{Deserialize, Serialize};

use super::{AdapterContext, AdapterResult, non_empty, resolve_model};
use crate::core::http::{join_url, send_json};
use crate::core::options::RequestOptions;
use crate::error::ProviderFailure;

/// Default model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

/// Generate text with `generateContent`.
pub async fn generate_text(
    ctx: &AdapterContext<'_>,
    prompt: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    let model = resolve_model(model, options, DEFAULT_MODEL);
    let model = model.strip_prefix("models/").unwrap_or(model);
    let body = GenerateRequest {
        contents: [Content {
            role: "user",
            parts: [Part { text: prompt }],
        }],
        generation_config: GenerationConfig {
            temperature: options.temperature_or_default(),
            max_output_tokens: options.max_tokens_or_default(),
        },
    };

    let response: GenerateResponse = send_json(
        ctx.client
            .post(join_url(
                ctx.base_url,
                &format!("/v1beta/models/{model}:generateContent"),
            ))
            .header("x-goog-api-key", ctx.key.expose_secret())
            .json(&body),
    )
    .await?;

    let content = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .ok_or_else(|| ProviderFailure::malformed("missing candidates[0].content"))?;
    let text = content
        .parts
        .into_iter()
        .filter_map(|p| p.text)
        .collect::<String>();
    non_empty(text, "completion")
}
