//! Provider adapters.
//!
//! Each provider family has its own submodule with one adapter per
//! capability it serves. The per-capability enums below are the closed sets
//! the router dispatches over; adding a provider means adding a variant and
//! the compiler points at every `match` that needs it.

pub mod anthropic;
pub mod deepgram;
pub mod elevenlabs;
pub mod gemini;
pub mod openai;
pub mod stability;

use std::fmt;

use reqwest::Client;

use crate::core::credentials::ApiKey;
use crate::core::failover::RouteTarget;
use crate::core::options::RequestOptions;
use crate::core::provider::ProviderId;
use crate::core::resources::{ResourceArena, TrackedResource};
use crate::error::ProviderFailure;

/// Result of a single adapter call.
pub type AdapterResult<T> = std::result::Result<T, ProviderFailure>;

/// Everything an adapter needs for one call.
#[derive(Debug, Clone, Copy)]
pub struct AdapterContext<'a> {
    pub client: &'a Client,
    /// Provider API base URL (overridable for tests).
    pub base_url: &'a str,
    pub key: &'a ApiKey,
    /// Arena for adapters that produce locally held artifacts.
    pub resources: &'a ResourceArena,
}

// =============================================================================
// Capability Enums
// =============================================================================

/// Text generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextProvider {
    OpenAi,
    Anthropic,
    Gemini,
}

impl TextProvider {
    /// Default priority order.
    pub const DEFAULT_ORDER: &'static [Self] = &[Self::OpenAi, Self::Anthropic, Self::Gemini];

    #[must_use]
    pub const fn from_family(family: ProviderId) -> Option<Self> {
        match family {
            ProviderId::OpenAi => Some(Self::OpenAi),
            ProviderId::Anthropic => Some(Self::Anthropic),
            ProviderId::Gemini => Some(Self::Gemini),
            _ => None,
        }
    }

    /// Generate a completion for `prompt`.
    pub async fn generate(
        self,
        ctx: &AdapterContext<'_>,
        prompt: &str,
        options: &RequestOptions,
        model: Option<&str>,
    ) -> AdapterResult<String> {
        match self {
            Self::OpenAi => openai::generate_text(ctx, prompt, options, model).await,
            Self::Anthropic => anthropic::generate_text(ctx, prompt, options, model).await,
            Self::Gemini => gemini::generate_text(ctx, prompt, options, model).await,
        }
    }
}

impl RouteTarget for TextProvider {
    fn family(self) -> ProviderId {
        match self {
            Self::OpenAi => ProviderId::OpenAi,
            Self::Anthropic => ProviderId::Anthropic,
            Self::Gemini => ProviderId::Gemini,
        }
    }
}

/// Image generation providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageProvider {
    StabilityAi,
    OpenAi,
}

impl ImageProvider {
    pub const DEFAULT_ORDER: &'static [Self] = &[Self::StabilityAi, Self::OpenAi];

    #[must_use]
    pub const fn from_family(family: ProviderId) -> Option<Self> {
        match family {
            ProviderId::Stability => Some(Self::StabilityAi),
            ProviderId::OpenAi => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// Generate an image; returns a URL or an inline `data:` URI.
    pub async fn generate(
        self,
        ctx: &AdapterContext<'_>,
        prompt: &str,
        options: &RequestOptions,
        model: Option<&str>,
    ) -> AdapterResult<String> {
        match self {
            Self::StabilityAi => stability::generate_image(ctx, prompt, options, model).await,
            Self::OpenAi => openai::generate_image(ctx, prompt, options, model).await,
        }
    }
}

impl RouteTarget for ImageProvider {
    fn family(self) -> ProviderId {
        match self {
            Self::StabilityAi => ProviderId::Stability,
            Self::OpenAi => ProviderId::OpenAi,
        }
    }
}

/// Text-to-speech providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechProvider {
    ElevenLabs,
    OpenAi,
}

impl SpeechProvider {
    pub const DEFAULT_ORDER: &'static [Self] = &[Self::ElevenLabs, Self::OpenAi];

    #[must_use]
    pub const fn from_family(family: ProviderId) -> Option<Self> {
        match family {
            ProviderId::ElevenLabs => Some(Self::ElevenLabs),
            ProviderId::OpenAi => Some(Self::OpenAi),
            _ => None,
        }
    }

    /// Synthesize speech into a tracked audio resource.
    pub async fn synthesize(
        self,
        ctx: &AdapterContext<'_>,
        text: &str,
        options: &RequestOptions,
        model: Option<&str>,
    ) -> AdapterResult<TrackedResource> {
        match self {
            Self::ElevenLabs => elevenlabs::synthesize(ctx, text, options, model).await,
            Self::OpenAi => openai::synthesize(ctx, text, options, model).await,
        }
    }
}

impl RouteTarget for SpeechProvider {
    fn family(self) -> ProviderId {
        match self {
            Self::ElevenLabs => ProviderId::ElevenLabs,
            Self::OpenAi => ProviderId::OpenAi,
        }
    }
}

/// Speech-to-text providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TranscriptionProvider {
    OpenAi,
    Deepgram,
}

impl TranscriptionProvider {
    pub const DEFAULT_ORDER: &'static [Self] = &[Self::OpenAi, Self::Deepgram];

    #[must_use]
    pub const fn from_family(family: ProviderId) -> Option<Self> {
        match family {
            ProviderId::OpenAi => Some(Self::OpenAi),
            ProviderId::Deepgram => Some(Self::Deepgram),
            _ => None,
        }
    }

    /// Transcribe audio to text.
    pub async fn transcribe(
        self,
        ctx: &AdapterContext<'_>,
        audio: &[u8],
        options: &RequestOptions,
        model: Option<&str>,
    ) -> AdapterResult<String> {
        match self {
            Self::OpenAi => openai::transcribe(ctx, audio, options, model).await,
            Self::Deepgram => deepgram::transcribe(ctx, audio, options, model).await,
        }
    }
}

impl RouteTarget for TranscriptionProvider {
    fn family(self) -> ProviderId {
        match self {
            Self::OpenAi => ProviderId::OpenAi,
            Self::Deepgram => ProviderId::Deepgram,
        }
    }
}

macro_rules! display_as_family {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.family(), f)
            }
        })*
    };
}

display_as_family!(TextProvider, ImageProvider, SpeechProvider, TranscriptionProvider);

// =============================================================================
// Shared Helpers
// =============================================================================

/// Pick the model: a route pin wins, then the caller's option, then the
/// adapter default.
pub(crate) fn resolve_model<'a>(
    route_model: Option<&'a str>,
    options: &'a RequestOptions,
    default: &'a str,
) -> &'a str {
    route_model
        .or(options.model.as_deref())
        .unwrap_or(default)
}

/// Best-effort audio container detection from magic bytes.
///
/// Returns the MIME type and a file extension for uploads.
#[must_use]
pub fn sniff_audio_type(audio: &[u8]) -> (&'static str, &'static str) {
    match audio {
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'A', b'V', b'E', ..] => ("audio/wav", "wav"),
        [b'I', b'D', b'3', ..] | [0xFF, 0xFB | 0xF3 | 0xF2, ..] => ("audio/mpeg", "mp3"),
        [b'O', b'g', b'g', b'S', ..] => ("audio/ogg", "ogg"),
        [b'f', b'L', b'a', b'C', ..] => ("audio/flac", "flac"),
        [0x1A, 0x45, 0xDF, 0xA3, ..] => ("audio/webm", "webm"),
        [_, _, _, _, b'f', b't', b'y', b'p', ..] => ("audio/mp4", "m4a"),
        _ => ("application/octet-stream", "bin"),
    }
}

/// Reject a blank provider result.
pub(crate) fn non_empty(text: String, what: &str) -> AdapterResult<String> {
    if text.trim().is_empty() {
        Err(ProviderFailure::malformed(format!("empty {what}")))
    } else {
        Ok(text)
    }
}
