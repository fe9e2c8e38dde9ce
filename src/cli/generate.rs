//! `text`, `image`, `speak` and `transcribe` commands.

use std::path::Path;

use super::OutputFormat;
use super::args::{ImageArgs, SpeakArgs, TextArgs, TranscribeArgs};
use super::read_input;
use crate::core::capability::Capability;
use crate::core::failover::ChainSuccess;
use crate::core::router::{Router, RouterOutput};
use crate::core::validate::Payload;
use crate::error::Result;
use crate::render::{CallReport, render_call};

/// Generate text and print it.
///
/// # Errors
///
/// Any router error for the call.
pub async fn text(router: &Router, args: &TextArgs, format: OutputFormat, pretty: bool) -> Result<()> {
    let prompt = read_input(&args.prompt)?;
    let success = router
        .execute_routed(Capability::Text, Payload::Text(&prompt), &args.options())
        .await?;
    print_report(Capability::Text, &success, None, format, pretty)
}

/// Generate an image and print its URL or data URI.
///
/// # Errors
///
/// Any router error for the call.
pub async fn image(
    router: &Router,
    args: &ImageArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let prompt = read_input(&args.prompt)?;
    let success = router
        .execute_routed(Capability::Image, Payload::Text(&prompt), &args.options())
        .await?;
    print_report(Capability::Image, &success, None, format, pretty)
}

/// Synthesize speech, write it to `--out`, then release the resource.
///
/// # Errors
///
/// Any router error for the call, or an I/O error writing the file.
pub async fn speak(
    router: &Router,
    args: &SpeakArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let text = read_input(&args.text)?;
    let success = router
        .execute_routed(Capability::TextToSpeech, Payload::Text(&text), &args.options())
        .await?;

    if let RouterOutput::Speech(resource) = &success.value {
        let written: Result<()> = match router.audio(resource) {
            Some(bytes) => tokio::fs::write(&args.out, &bytes[..])
                .await
                .map_err(Into::into),
            None => Err(anyhow::anyhow!("audio {} was released before it was saved", resource.id).into()),
        };
        // Release even when the write failed.
        router.release(resource);
        written?;
        tracing::info!(path = %args.out.display(), bytes = resource.len, "Audio saved");
    }

    print_report(
        Capability::TextToSpeech,
        &success,
        Some(&args.out),
        format,
        pretty,
    )
}

/// Transcribe an audio file and print the transcript.
///
/// # Errors
///
/// Any router error for the call, or an I/O error reading the file.
pub async fn transcribe(
    router: &Router,
    args: &TranscribeArgs,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let audio = tokio::fs::read(&args.file).await?;
    let success = router
        .execute_routed(
            Capability::SpeechToText,
            Payload::Audio(&audio),
            &args.request.options(),
        )
        .await?;
    print_report(Capability::SpeechToText, &success, None, format, pretty)
}

fn print_report(
    capability: Capability,
    success: &ChainSuccess<RouterOutput>,
    saved_to: Option<&Path>,
    format: OutputFormat,
    pretty: bool,
) -> Result<()> {
    let report = CallReport::new(capability, success, saved_to);
    println!("{}", render_call(&report, format, pretty)?);
    Ok(())
}
