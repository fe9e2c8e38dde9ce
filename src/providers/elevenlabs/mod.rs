//! `ElevenLabs` text-to-speech adapter.
//!
//! Endpoint: `/v1/text-to-speech/{voiceId}`, auth via `xi-api-key`. The
//! response body is the audio itself.

use serde::Serialize;

use super::{AdapterContext, AdapterResult};
use crate::core::http::{join_url, send_bytes};
use crate::core::options::RequestOptions;
use crate::core::resources::TrackedResource;

/// Default voice ("Rachel").
pub const DEFAULT_VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
/// Default synthesis model.
pub const DEFAULT_MODEL_ID: &str = "eleven_monolingual_v1";

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
}

/// Synthesize speech and track the audio.
pub async fn synthesize(
    ctx: &AdapterContext<'_>,
    text: &str,
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<TrackedResource> {
    let voice_id = options.voice_id.as_deref().unwrap_or(DEFAULT_VOICE_ID);
    let body = SpeechRequest {
        text,
        model_id: model
            .or(options.model_id.as_deref())
            .unwrap_or(DEFAULT_MODEL_ID),
    };

    let (audio, content_type) = send_bytes(
        ctx.client
            .post(join_url(
                ctx.base_url,
                &format!("/v1/text-to-speech/{voice_id}"),
            ))
            .header("xi-api-key", ctx.key.expose_secret())
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&body),
    )
    .await?;

    Ok(ctx
        .resources
        .track(audio, content_type.as_deref().unwrap_or("audio/mpeg")))
}
