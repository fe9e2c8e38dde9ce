//! Stability AI text-to-image adapter.
//!
//! Endpoint: `/v1/generation/{engine}/text-to-image`. Artifacts come back as
//! base64 PNGs and are returned inline as `data:image/png;base64,…` URIs.

use serde::{Deserialize, Serialize};

use super::{AdapterContext, AdapterResult, resolve_model};
use crate::core::http::{join_url, send_json};
use crate::core::options::RequestOptions;
use crate::error::ProviderFailure;

/// Default engine.
pub const DEFAULT_ENGINE: &str = "stable-diffusion-xl-1024-v1-0";

/// Classifier-free guidance scale.
const CFG_SCALE: f32 = 7.0;

#[derive(Debug, Serialize)]
struct TextToImageRequest<'a> {
    text_prompts: [TextPrompt<'a>; 1],
    cfg_scale: f32,
    width: u32,
    height: u32,
    steps: u32,
    samples: u8,
}

#[derive(Debug, Serialize)]
struct TextPrompt<'a> {
    text: &'a str,
    weight: f32,
}

#[derive(Debug, Deserialize)]
struct TextToImageResponse {
    #[serde(default)]
    artifacts: Vec<Artifact>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Artifact {
    #[serde(default)]
    base64: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}

/// Generate an image and return it as an inline PNG.
pub async fn generate_image(
    ctx: &AdapterContext<'_>,
    prompt: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    let engine = resolve_model(model, options, DEFAULT_ENGINE);
    let (width, height) = options.dimensions_or_default();
    let body = TextToImageRequest {
        text_prompts: [TextPrompt {
            text: prompt,
            weight: 1.0,
        }],
        cfg_scale: CFG_SCALE,
        width,
        height,
        steps: options.steps_or_default(),
        samples: 1,
    };

    let response: TextToImageResponse = send_json(
        ctx.client
            .post(join_url(
                ctx.base_url,
                &format!("/v1/generation/{engine}/text-to-image"),
            ))
            .bearer_auth(ctx.key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body),
    )
    .await?;

    response
        .artifacts
        .into_iter()
        .filter(|a| a.finish_reason.as_deref() != Some("CONTENT_FILTERED"))
        .find_map(|a| a.base64.filter(|b| !b.is_empty()))
        .map(|b64| format!("data:image/png;base64,{b64}"))
        .ok_or_else(|| ProviderFailure::malformed("no usable artifact"))
}
