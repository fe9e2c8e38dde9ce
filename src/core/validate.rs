//! Request validation.
//!
//! Runs before any credential lookup or network call. Never fails: the
//! outcome is reported as a [`ValidationResult`].

use serde::Serialize;

use super::capability::{Capability, MAX_AUDIO_BYTES};
use super::options::RequestOptions;

/// Keywords that make an image prompt unacceptable (case-insensitive substring).
pub const IMAGE_DENYLIST: &[&str] = &[
    "nude", "naked", "nsfw", "porn", "explicit", "gore", "sexual",
];

/// Longest accepted identifier option (`model`, `voiceId`, `modelId`).
pub const MAX_IDENTIFIER_LEN: usize = 128;

/// Input handed to the router.
#[derive(Debug, Clone, Copy)]
pub enum Payload<'a> {
    Text(&'a str),
    Audio(&'a [u8]),
}

impl Payload<'_> {
    const fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Audio(_) => "audio",
        }
    }
}

/// Outcome of [`validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationResult {
    #[must_use]
    pub const fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    #[must_use]
    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
        }
    }
}

/// Validate a request for a capability.
#[must_use]
pub fn validate(
    capability: Capability,
    payload: Option<Payload<'_>>,
    options: &RequestOptions,
) -> ValidationResult {
    let Some(payload) = payload else {
        return ValidationResult::rejected("payload is missing");
    };

    let result = match (capability.takes_text(), payload) {
        (true, Payload::Text(text)) => validate_text(capability, text),
        (false, Payload::Audio(audio)) => validate_audio(audio),
        (true, other) => ValidationResult::rejected(format!(
            "expected text input, got {}",
            other.kind()
        )),
        (false, other) => ValidationResult::rejected(format!(
            "expected audio input, got {}",
            other.kind()
        )),
    };
    if !result.valid {
        return result;
    }

    validate_identifiers(options)
}

fn validate_text(capability: Capability, text: &str) -> ValidationResult {
    if text.trim().is_empty() {
        return ValidationResult::rejected("input is empty");
    }

    let len = text.chars().count();
    if let Some(max) = capability.max_input_chars()
        && len > max
    {
        return ValidationResult::rejected(format!(
            "input is {len} characters, maximum is {max}"
        ));
    }

    if capability == Capability::Image {
        let lower = text.to_lowercase();
        if IMAGE_DENYLIST.iter().any(|word| lower.contains(word)) {
            return ValidationResult::rejected("prompt contains disallowed content");
        }
    }

    ValidationResult::ok()
}

fn validate_audio(audio: &[u8]) -> ValidationResult {
    if audio.is_empty() {
        return ValidationResult::rejected("audio is empty");
    }
    if audio.len() > MAX_AUDIO_BYTES {
        return ValidationResult::rejected(format!(
            "audio is {} bytes, maximum is {MAX_AUDIO_BYTES}",
            audio.len()
        ));
    }
    ValidationResult::ok()
}

fn validate_identifiers(options: &RequestOptions) -> ValidationResult {
    let identifiers = [
        ("model", options.model.as_deref()),
        ("voiceId", options.voice_id.as_deref()),
        ("modelId", options.model_id.as_deref()),
    ];
    for (name, value) in identifiers {
        let Some(value) = value.map(str::trim) else {
            continue;
        };
        if value.len() > MAX_IDENTIFIER_LEN {
            return ValidationResult::rejected(format!("{name} is too long"));
        }
        if !is_safe_identifier(value) {
            return ValidationResult::rejected(format!("{name} contains invalid characters"));
        }
    }
    ValidationResult::ok()
}

/// Characters allowed in model and voice identifiers, which end up in URL paths.
pub(crate) fn is_safe_identifier(value: &str) -> bool {
    !value.contains("..")
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | ':' | '/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::capability::{MAX_IMAGE_PROMPT_CHARS, MAX_TEXT_PROMPT_CHARS};

    fn check(capability: Capability, text: &str) -> ValidationResult {
        validate(capability, Some(Payload::Text(text)), &RequestOptions::default())
    }

    #[test]
    fn accepts_ordinary_prompt() {
        assert!(check(Capability::Text, "Summarize lesson 3").valid);
    }

    #[test]
    fn rejects_missing_and_blank_payloads() {
        let missing = validate(Capability::Text, None, &RequestOptions::default());
        assert!(!missing.valid);
        assert!(!check(Capability::Text, "   \n\t").valid);
    }

    #[test]
    fn text_limit_is_ten_thousand_characters() {
        let at_limit = "a".repeat(MAX_TEXT_PROMPT_CHARS);
        assert!(check(Capability::Text, &at_limit).valid);
        let over = "a".repeat(MAX_TEXT_PROMPT_CHARS + 1);
        let result = check(Capability::Text, &over);
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("10000"));
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let accented = "é".repeat(MAX_IMAGE_PROMPT_CHARS);
        assert!(check(Capability::Image, &accented).valid);
    }

    #[test]
    fn image_limit_is_one_thousand_characters() {
        let over = "a".repeat(MAX_IMAGE_PROMPT_CHARS + 1);
        assert!(!check(Capability::Image, &over).valid);
    }

    #[test]
    fn image_denylist_is_case_insensitive() {
        let result = check(Capability::Image, "A NuDe statue in a museum");
        assert!(!result.valid);
        assert_eq!(result.error.as_deref(), Some("prompt contains disallowed content"));
        // The denylist only applies to images.
        assert!(check(Capability::Text, "Explain why nude paintings were censored").valid);
    }

    #[test]
    fn payload_kind_must_match_capability() {
        let audio = [1_u8, 2, 3];
        let r = validate(Capability::Text, Some(Payload::Audio(&audio)), &RequestOptions::default());
        assert_eq!(r.error.as_deref(), Some("expected text input, got audio"));
        let r = validate(Capability::SpeechToText, Some(Payload::Text("hi")), &RequestOptions::default());
        assert_eq!(r.error.as_deref(), Some("expected audio input, got text"));
    }

    #[test]
    fn empty_audio_rejected() {
        let r = validate(Capability::SpeechToText, Some(Payload::Audio(&[])), &RequestOptions::default());
        assert!(!r.valid);
    }

    #[test]
    fn identifier_options_must_be_url_safe() {
        let bad = RequestOptions {
            voice_id: Some("../../v1/admin".to_string()),
            ..RequestOptions::default()
        };
        let r = validate(Capability::TextToSpeech, Some(Payload::Text("hello")), &bad);
        assert_eq!(r.error.as_deref(), Some("voiceId contains invalid characters"));

        let good = RequestOptions::default().with_model("models/gemini-1.5-flash");
        assert!(validate(Capability::Text, Some(Payload::Text("hello")), &good).valid);
    }
}
