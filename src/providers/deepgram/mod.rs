//! Deepgram pre-recorded transcription adapter.
//!
//! Endpoint: `/v1/listen?model=…`, auth via `Authorization: Token <key>`,
//! raw audio request body.

use serde::Deserialize;

use super::{AdapterContext, AdapterResult, non_empty, resolve_model, sniff_audio_type};
use crate::core::http::{join_url, send_json};
use crate::core::options::RequestOptions;
use crate::error::ProviderFailure;

/// Default model.
pub const DEFAULT_MODEL: &str = "nova-2";

#[derive(Debug, Deserialize)]
struct ListenResponse {
    results: Option<ListenResults>,
}

#[derive(Debug, Deserialize)]
struct ListenResults {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(default)]
    alternatives: Vec<Alternative>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: Option<String>,
}

/// Transcribe audio.
pub async fn transcribe(
    ctx: &AdapterContext<'_>,
    audio: &[u8],
    options: &RequestOptions,
    model: Option<&str>,
) -> AdapterResult<String> {
    let model = resolve_model(model, options, DEFAULT_MODEL);
    let (mime, _) = sniff_audio_type(audio);
    let url = format!(
        "{}?model={model}&smart_format=true",
        join_url(ctx.base_url, "/v1/listen")
    );

    let response: ListenResponse = send_json(
        ctx.client
            .post(url)
            .header(
                reqwest::header::AUTHORIZATION,
                format!("Token {}", ctx.key.expose_secret()),
            )
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(audio.to_vec()),
    )
    .await?;

    let transcript = response
        .results
        .and_then(|r| r.channels.into_iter().next())
        .and_then(|c| c.alternatives.into_iter().next())
        .and_then(|a| a.transcript)
        .ok_or_else(|| ProviderFailure::malformed("missing results.channels[0].alternatives[0]"))?;
    non_empty(transcript, "transcript")
}
