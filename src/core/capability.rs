//! Router capabilities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Maximum characters for a text-generation prompt.
pub const MAX_TEXT_PROMPT_CHARS: usize = 10_000;
/// Maximum characters for an image prompt.
pub const MAX_IMAGE_PROMPT_CHARS: usize = 1_000;
/// Maximum characters for text-to-speech input.
pub const MAX_SPEECH_TEXT_CHARS: usize = 5_000;
/// Maximum bytes for a speech-to-text upload.
pub const MAX_AUDIO_BYTES: usize = 25 * 1024 * 1024;

/// A kind of AI request the router can dispatch.
///
/// Selects the provider priority list and the rate-limit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    Text,
    Image,
    TextToSpeech,
    SpeechToText,
}

impl Capability {
    /// All capabilities in display order.
    pub const ALL: &'static [Self] = &[
        Self::Text,
        Self::Image,
        Self::TextToSpeech,
        Self::SpeechToText,
    ];

    /// Config/CLI name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::TextToSpeech => "text-to-speech",
            Self::SpeechToText => "speech-to-text",
        }
    }

    /// Display name for human output and error messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Text => "text generation",
            Self::Image => "image generation",
            Self::TextToSpeech => "text-to-speech",
            Self::SpeechToText => "speech-to-text",
        }
    }

    /// Parse from a config or CLI name. Accepts a few aliases.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "text" => Some(Self::Text),
            "image" => Some(Self::Image),
            "text-to-speech" | "tts" | "speech" => Some(Self::TextToSpeech),
            "speech-to-text" | "stt" | "transcription" => Some(Self::SpeechToText),
            _ => None,
        }
    }

    /// Whether the payload for this capability is text (as opposed to audio).
    #[must_use]
    pub const fn takes_text(self) -> bool {
        !matches!(self, Self::SpeechToText)
    }

    /// Maximum input length in characters for text payloads.
    #[must_use]
    pub const fn max_input_chars(self) -> Option<usize> {
        match self {
            Self::Text => Some(MAX_TEXT_PROMPT_CHARS),
            Self::Image => Some(MAX_IMAGE_PROMPT_CHARS),
            Self::TextToSpeech => Some(MAX_SPEECH_TEXT_CHARS),
            Self::SpeechToText => None,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
