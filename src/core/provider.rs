//! Provider families.
//!
//! A provider family is one credential-bearing vendor. The same family can
//! serve several capabilities (OpenAI serves all four), so credentials,
//! base URLs and auth/quota short-circuiting are keyed by [`ProviderId`].

use serde::{Deserialize, Serialize};
use std::fmt;

use super::capability::Capability;
use crate::error::{GatewayError, Result};

// =============================================================================
// Provider Enum
// =============================================================================

/// Supported AI providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Anthropic,
    Gemini,
    Stability,
    ElevenLabs,
    Deepgram,
}

impl ProviderId {
    /// All providers in display order.
    pub const ALL: &'static [Self] = &[
        Self::OpenAi,
        Self::Anthropic,
        Self::Gemini,
        Self::Stability,
        Self::ElevenLabs,
        Self::Deepgram,
    ];

    /// Config/CLI name for this provider.
    #[must_use]
    pub const fn cli_name(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Stability => "stability",
            Self::ElevenLabs => "elevenlabs",
            Self::Deepgram => "deepgram",
        }
    }

    /// Display name for human output.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAi => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
            Self::Stability => "Stability AI",
            Self::ElevenLabs => "ElevenLabs",
            Self::Deepgram => "Deepgram",
        }
    }

    /// Environment variable holding this provider's API key.
    #[must_use]
    pub const fn env_var(self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Stability => "STABILITY_API_KEY",
            Self::ElevenLabs => "ELEVENLABS_API_KEY",
            Self::Deepgram => "DEEPGRAM_API_KEY",
        }
    }

    /// Production API base URL.
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com",
            Self::Anthropic => "https://api.anthropic.com",
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::Stability => "https://api.stability.ai",
            Self::ElevenLabs => "https://api.elevenlabs.io",
            Self::Deepgram => "https://api.deepgram.com",
        }
    }

    /// Get the status page URL for this provider.
    #[must_use]
    pub const fn status_page_url(self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("https://status.openai.com"),
            Self::Anthropic => Some("https://status.anthropic.com"),
            Self::Gemini => Some("https://status.cloud.google.com"),
            Self::Stability => Some("https://status.stability.ai"),
            Self::ElevenLabs => Some("https://status.elevenlabs.io"),
            Self::Deepgram => Some("https://status.deepgram.com"),
        }
    }

    /// Capabilities this provider family has an adapter for.
    #[must_use]
    pub const fn capabilities(self) -> &'static [Capability] {
        match self {
            Self::OpenAi => Capability::ALL,
            Self::Anthropic | Self::Gemini => &[Capability::Text],
            Self::Stability => &[Capability::Image],
            Self::ElevenLabs => &[Capability::TextToSpeech],
            Self::Deepgram => &[Capability::SpeechToText],
        }
    }

    /// Whether this provider serves the capability.
    #[must_use]
    pub fn supports(self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// Parse from a config or CLI name (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        match lower.as_str() {
            "stabilityai" | "stability-ai" => Some(Self::Stability),
            "google" => Some(Self::Gemini),
            _ => Self::ALL.iter().find(|p| p.cli_name() == lower).copied(),
        }
    }

    /// Parse from a config or CLI name, failing with a config error.
    pub fn from_cli_name(name: &str) -> Result<Self> {
        Self::from_name(name).ok_or_else(|| {
            let valid = Self::ALL
                .iter()
                .map(|p| p.cli_name())
                .collect::<Vec<_>>()
                .join(", ");
            GatewayError::Config(format!(
                "Unknown provider \"{name}\". Valid providers: {valid}"
            ))
        })
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cli_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_from_cli_name() {
        assert_eq!(ProviderId::from_cli_name("openai").unwrap(), ProviderId::OpenAi);
        assert_eq!(ProviderId::from_cli_name("ANTHROPIC").unwrap(), ProviderId::Anthropic);
        assert_eq!(ProviderId::from_cli_name("stability-ai").unwrap(), ProviderId::Stability);
        assert!(ProviderId::from_cli_name("invalid").is_err());
    }

    #[test]
    fn every_capability_has_at_least_two_providers() {
        for &cap in Capability::ALL {
            let count = ProviderId::ALL.iter().filter(|p| p.supports(cap)).count();
            assert!(count >= 2, "{cap} has only {count} provider(s)");
        }
    }

    #[test]
    fn env_vars_are_unique() {
        let mut vars: Vec<_> = ProviderId::ALL.iter().map(|p| p.env_var()).collect();
        vars.sort_unstable();
        vars.dedup();
        assert_eq!(vars.len(), ProviderId::ALL.len());
    }
}
