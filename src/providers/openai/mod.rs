//! `OpenAI` adapters.
//!
//! Serves all four capabilities:
//! - Chat completions (`/v1/chat/completions`)
//! - Image generation (`/v1/images/generations`)
//! - Speech synthesis (`/v1/audio/speech`)
//! - Transcription (`/v1/audio/transcriptions`, multipart upload)
//!
//! Auth: `Authorization: Bearer <key>`.

use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};

use super::{AdapterContext, AdapterResult, non_empty, resolve_model, sniff_audio_type};
use crate::core::http::{join_url, send_bytes, send_json};
use crate::core::options::RequestOptions;
use crate::core::resources::TrackedResource;
use crate::error::ProviderFailure;

/// Default chat model.
pub const DEFAULT_TEXT_MODEL: &str = "gpt-4o-mini";
/// Default image model.
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";
/// Default speech model.
pub const DEFAULT_SPEECH_MODEL: &str = "tts-1";
/// Default voice.
pub const DEFAULT_VOICE: &str = "alloy";
/// Default transcription model.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

// =============================================================================
// Text
// =============================================================================

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generate text with chat completions.
pub async fn generate_text(
    ctx: &AdapterContext<'_>,
    prompt: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    let body = ChatRequest {
        model: resolve_model(model, options, DEFAULT_TEXT_MODEL),
        messages: [ChatMessage {
            role: "user",
            content: prompt,
        }],
        temperature: options.temperature_or_default(),
        max_tokens: options.max_tokens_or_default(),
    };

    let response: ChatResponse = send_json(
        ctx.client
            .post(join_url(ctx.base_url, "/v1/chat/completions"))
            .bearer_auth(ctx.key.expose_secret())
            .json(&body),
    )
    .await?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderFailure::malformed("missing choices[0].message.content"))?;
    non_empty(content, "completion")
}

// =============================================================================
// Image
// =============================================================================

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: String,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    b64_json: Option<String>,
}

/// Generate an image; returns the hosted URL or an inline PNG.
pub async fn generate_image(
    ctx: &AdapterContext<'_>,
    prompt: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    let (width, height) = options.dimensions_or_default();
    let body = ImageRequest {
        model: resolve_model(model, options, DEFAULT_IMAGE_MODEL),
        prompt,
        n: 1,
        size: format!("{width}x{height}"),
    };

    let response: ImageResponse = send_json(
        ctx.client
            .post(join_url(ctx.base_url, "/v1/images/generations"))
            .bearer_auth(ctx.key.expose_secret())
            .json(&body),
    )
    .await?;

    let datum = response
        .data
        .into_iter()
        .next()
        .ok_or_else(|| ProviderFailure::malformed("missing data[0]"))?;
    match (datum.url, datum.b64_json) {
        (Some(url), _) if !url.is_empty() => Ok(url),
        (_, Some(b64)) if !b64.is_empty() => Ok(format!("data:image/png;base64,{b64}")),
        _ => Err(ProviderFailure::malformed("image has neither url nor b64_json")),
    }
}

// =============================================================================
// Speech
// =============================================================================

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'static str,
}

/// Synthesize speech to MP3 and track it.
pub async fn synthesize(
    ctx: &AdapterContext<'_>,
    text: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<TrackedResource> {
    let body = SpeechRequest {
        model: model
            .or(options.model_id.as_deref())
            .unwrap_or(DEFAULT_SPEECH_MODEL),
        input: text,
        voice: options.voice_id.as_deref().unwrap_or(DEFAULT_VOICE),
        response_format: "mp3",
    };

    let (audio, content_type) = send_bytes(
        ctx.client
            .post(join_url(ctx.base_url, "/v1/audio/speech"))
            .bearer_auth(ctx.key.expose_secret())
            .json(&body),
    )
    .await?;

    Ok(ctx
        .resources
        .track(audio, content_type.as_deref().unwrap_or("audio/mpeg")))
}

// =============================================================================
// Transcription
// =============================================================================

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    #[serde(default)]
    text: Option<String>,
}

/// Transcribe audio with a multipart upload.
pub async fn transcribe(
    ctx: &AdapterContext<'_>,
    audio: &[u8],
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    let (mime, ext) = sniff_audio_type(audio);
    let file = Part::bytes(audio.to_vec())
        .file_name(format!("audio.{ext}"))
        .mime_str(mime)
        .map_err(|_| ProviderFailure::malformed("invalid upload content type"))?;
    let form = Form::new()
        .text(
            "model",
            resolve_model(model, options, DEFAULT_TRANSCRIPTION_MODEL).to_string(),
        )
        .part("file", file);

    let response: TranscriptionResponse = send_json(
        ctx.client
            .post(join_url(ctx.base_url, "/v1/audio/transcriptions"))
            .bearer_auth(ctx.key.expose_secret())
            .multipart(form),
    )
    .await?;

    let text = response
        .text
        .ok_or_else(|| ProviderFailure::malformed("missing text"))?;
    non_empty(text, "transcript")
}
