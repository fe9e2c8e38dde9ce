//! Fix suggestion database for aigate errors.
//!
//! Provides actionable fix suggestions mapped to specific error types,
//! including commands, context explanations, and prevention tips.

use std::time::Duration;

use super::{FailureKind, ProviderDiagnostic};
use crate::core::capability::Capability;
use crate::core::provider::ProviderId;

// =============================================================================
// Fix Suggestion Types
// =============================================================================

/// A fix suggestion for an error.
#[derive(Debug, Clone)]
pub struct FixSuggestion {
    /// Fix commands in order of preference, copy-paste ready.
    pub commands: Vec<String>,

    /// Explanation of why this error occurred.
    pub context: String,

    /// Tips to prevent this error in the future.
    pub prevention: Option<String>,
}

impl FixSuggestion {
    /// Creates a new fix suggestion with required fields.
    #[must_use]
    pub fn new(commands: Vec<String>, context: impl Into<String>) -> Self {
        Self {
            commands,
            context: context.into(),
            prevention: None,
        }
    }

    /// Builder: adds prevention tips.
    #[must_use]
    pub fn with_prevention(mut self, prevention: impl Into<String>) -> Self {
        self.prevention = Some(prevention.into());
        self
    }
}

// =============================================================================
// Per-error suggestions
// =============================================================================

pub fn validation_suggestions(capability: Capability, message: &str) -> Vec<FixSuggestion> {
    vec![
        FixSuggestion::new(
            vec![],
            format!("The {capability} request was rejected before any provider was called: {message}."),
        )
        .with_prevention(format!(
            "Keep {capability} input within {} characters of plain text.",
            capability.max_input_chars().map_or_else(|| "the documented".to_string(), |n| n.to_string())
        )),
    ]
}

pub fn no_configured_provider_suggestions(capability: Capability, checked: &str) -> Vec<FixSuggestion> {
    let exports: Vec<String> = checked
        .split(", ")
        .filter_map(ProviderId::from_name)
        .map(|p| format!("export {}=<your key>", p.env_var()))
        .collect();

    vec![
        FixSuggestion::new(
            exports,
            format!("None of the {capability} providers ({checked}) has a usable API key."),
        )
        .with_prevention("Run `aigate providers` to see which credentials were picked up."),
    ]
}

pub fn config_suggestions(message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec!["aigate providers".to_string()],
        format!("Configuration error: {message}"),
    )]
}

pub fn config_invalid_suggestions(key: &str, message: &str) -> Vec<FixSuggestion> {
    vec![FixSuggestion::new(
        vec![],
        format!("The config key '{key}' is invalid: {message}"),
    )
    .with_prevention("Remove the key to fall back to the built-in default.")]
}

pub fn rate_limited_suggestions(
    capability: Capability,
    retry_after: Option<Duration>,
) -> Vec<FixSuggestion> {
    let context = retry_after.map_or_else(
        || format!("The local {capability} request quota is exhausted."),
        |d| {
            format!(
                "The local {capability} request quota is exhausted. Retry in {}s.",
                d.as_secs().max(1)
            )
        },
    );
    vec![FixSuggestion::new(vec![], context)
        .with_prevention("Raise [rate_limits] in the config file if the default is too strict.")]
}

pub fn all_providers_failed_suggestions(diagnostics: &[ProviderDiagnostic]) -> Vec<FixSuggestion> {
    let mut out = Vec::new();

    for diag in diagnostics {
        let Some(provider) = ProviderId::from_name(&diag.provider) else {
            continue;
        };
        let suggestion = match diag.kind {
            Some(FailureKind::Auth) => FixSuggestion::new(
                vec![format!("export {}=<a valid key>", provider.env_var())],
                format!("{} rejected the configured API key.", provider.display_name()),
            ),
            Some(FailureKind::Quota) => FixSuggestion::new(
                vec![],
                format!(
                    "{} reports the account quota or billing limit is exhausted.",
                    provider.display_name()
                ),
            ),
            Some(FailureKind::Timeout) => FixSuggestion::new(
                vec![],
                format!("{} did not answer before the deadline.", provider.display_name()),
            )
            .with_prevention("Pass a larger timeoutMs option for long generations."),
            None => FixSuggestion::new(
                vec![format!("export {}=<your key>", provider.env_var())],
                format!("{} was skipped: {}.", provider.display_name(), diag.message),
            ),
            Some(_) => continue,
        };
        out.push(suggestion);
    }

    if out.is_empty() {
        out.push(FixSuggestion::new(
            vec![],
            "Every provider failed with a transient error. Retry the request later.",
        ));
    }
    out
}
