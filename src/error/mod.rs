//! Error types for aigate.
//!
//! Uses `thiserror` for structured error types that map to exit codes.
//!
//! ## Error Taxonomy
//!
//! Errors are categorized into five main categories:
//! - **Validation**: Malformed, oversized, or unsafe requests (never reach the network)
//! - **Configuration**: No usable credential, invalid config file or values
//! - **RateLimit**: Local per-capability quota exhausted (never reaches the network)
//! - **Provider**: Every provider in the priority list failed or was skipped
//! - **Internal**: Unexpected errors, bugs, or unclassified issues
//!
//! Per-provider failures ([`ProviderFailure`]) are classified inside the
//! failover loop and only reach callers wrapped in
//! [`GatewayError::AllProvidersFailed`], one [`ProviderDiagnostic`] per provider.
//!
//! Each error has a stable error code (e.g., `AIGW-V001`) for programmatic handling.
//! No message ever carries a credential value or a raw provider response body.

pub mod suggestions;

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::capability::Capability;

pub use suggestions::FixSuggestion;

// =============================================================================
// Error Categories
// =============================================================================

/// High-level error categories for classification and routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Request rejected before any credential check or network call.
    Validation,
    /// Missing credentials, invalid config file or values.
    Configuration,
    /// Local rate limit exhausted.
    RateLimit,
    /// All providers failed.
    Provider,
    /// Internal errors (bugs, unexpected state, unclassified).
    Internal,
}

impl ErrorCategory {
    /// Returns a human-readable description of the category.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Validation => "Validation error",
            Self::Configuration => "Configuration error",
            Self::RateLimit => "Rate limit error",
            Self::Provider => "Provider error",
            Self::Internal => "Internal error",
        }
    }

    /// Returns a short code prefix for this category.
    #[must_use]
    pub const fn code_prefix(&self) -> &'static str {
        match self {
            Self::Validation => "V",
            Self::Configuration => "C",
            Self::RateLimit => "R",
            Self::Provider => "P",
            Self::Internal => "X",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

// =============================================================================
// Exit Codes
// =============================================================================

/// Process exit codes for the `aigate` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Success
    Success = 0,
    /// Unexpected failure
    GeneralError = 1,
    /// Request rejected by validation
    InvalidRequest = 2,
    /// Configuration or credential problem
    ConfigError = 3,
    /// Local rate limit exhausted
    RateLimited = 4,
    /// Every provider failed
    ProvidersFailed = 5,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

// =============================================================================
// Provider Failures
// =============================================================================

/// Classification of a single provider failure.
///
/// Used by the failover policy to decide whether a failure short-circuits the
/// provider family or halts the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    Auth,
    Quota,
    Server,
    Unavailable,
    Rejected,
    Malformed,
}

impl FailureKind {
    /// All failure kinds.
    pub const ALL: &'static [Self] = &[
        Self::Timeout,
        Self::Auth,
        Self::Quota,
        Self::Server,
        Self::Unavailable,
        Self::Rejected,
        Self::Malformed,
    ];

    /// Config/CLI name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::Auth => "auth",
            Self::Quota => "quota",
            Self::Server => "server",
            Self::Unavailable => "unavailable",
            Self::Rejected => "rejected",
            Self::Malformed => "malformed",
        }
    }

    /// Parse from a config value (case-insensitive).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_lowercase();
        Self::ALL.iter().copied().find(|k| k.as_str() == lower)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single provider's failure, produced by an adapter from the provider's
/// status code or structured error body.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderFailure {
    /// No response within the deadline.
    #[error("timed out after {after_ms}ms")]
    Timeout { after_ms: u64 },

    /// Credential rejected.
    #[error("authentication failed (HTTP {status})")]
    Auth { status: u16 },

    /// Provider-side quota or billing limit reached.
    #[error("quota exhausted (HTTP {status})")]
    Quota { status: u16 },

    /// Provider returned a 5xx.
    #[error("upstream server error (HTTP {status})")]
    Server { status: u16 },

    /// Connection could not be established or was reset.
    #[error("provider unreachable: {reason}")]
    Unavailable { reason: String },

    /// Provider refused the request (4xx other than auth/quota).
    #[error("request rejected (HTTP {status})")]
    Rejected { status: u16 },

    /// Response could not be decoded into the expected shape.
    #[error("malformed response: {reason}")]
    Malformed { reason: String },
}

impl ProviderFailure {
    /// Returns the failure classification.
    #[must_use]
    pub const fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout { .. } => FailureKind::Timeout,
            Self::Auth { .. } => FailureKind::Auth,
            Self::Quota { .. } => FailureKind::Quota,
            Self::Server { .. } => FailureKind::Server,
            Self::Unavailable { .. } => FailureKind::Unavailable,
            Self::Rejected { .. } => FailureKind::Rejected,
            Self::Malformed { .. } => FailureKind::Malformed,
        }
    }

    /// HTTP status that produced this failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Auth { status }
            | Self::Quota { status }
            | Self::Server { status }
            | Self::Rejected { status } => Some(*status),
            Self::Timeout { .. } | Self::Unavailable { .. } | Self::Malformed { .. } => None,
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Short per-provider diagnostic carried by [`GatewayError::AllProvidersFailed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDiagnostic {
    /// Provider name (e.g. `openai`).
    pub provider: String,
    /// Failure classification; `None` when the provider was skipped.
    pub kind: Option<FailureKind>,
    /// Human-readable one-liner.
    pub message: String,
}

impl fmt::Display for ProviderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.provider, self.message)
    }
}

fn render_diagnostics(diagnostics: &[ProviderDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| format!("\n  - {d}"))
        .collect::<String>()
}

// =============================================================================
// Gateway Error
// =============================================================================

/// Main error type for aigate operations.
///
/// Each variant has:
/// - A stable error code (e.g., `AIGW-V001`)
/// - A category for classification
/// - A retryable flag for caller-level retry logic
#[derive(Error, Debug)]
pub enum GatewayError {
    // ==========================================================================
    // Validation errors (Category: Validation)
    // ==========================================================================
    /// Request payload or options failed validation.
    #[error("invalid {capability} request: {message}")]
    Validation {
        capability: Capability,
        message: String,
    },

    // ==========================================================================
    // Configuration errors (Category: Configuration)
    // ==========================================================================
    /// No provider in the capability's priority list has a usable credential.
    #[error("no configured provider for {capability} (checked: {checked})")]
    NoConfiguredProvider {
        capability: Capability,
        checked: String,
    },

    /// Generic configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Invalid value in configuration.
    #[error("invalid config value for '{key}': {message}")]
    ConfigInvalid { key: String, message: String },

    // ==========================================================================
    // Rate limit errors (Category: RateLimit)
    // ==========================================================================
    /// Local per-capability quota exhausted.
    #[error("rate limit exceeded for {capability}: {max_requests} requests per {window_ms}ms")]
    RateLimited {
        capability: Capability,
        max_requests: u32,
        window_ms: u64,
        retry_after: Option<Duration>,
    },

    // ==========================================================================
    // Provider errors (Category: Provider)
    // ==========================================================================
    /// Every provider in the priority list failed or was skipped.
    #[error("all providers failed for {capability}:{}", render_diagnostics(.diagnostics))]
    AllProvidersFailed {
        capability: Capability,
        diagnostics: Vec<ProviderDiagnostic>,
    },

    // ==========================================================================
    // Internal errors (Category: Internal)
    // ==========================================================================
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Catch-all for other errors.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GatewayError {
    pub(crate) fn validation(capability: Capability, message: impl Into<String>) -> Self {
        Self::Validation {
            capability,
            message: message.into(),
        }
    }

    /// Map error to process exit code.
    #[must_use]
    pub const fn exit_code(&self) -> ExitCode {
        match self {
            Self::Validation { .. } => ExitCode::InvalidRequest,
            Self::NoConfiguredProvider { .. } | Self::Config(_) | Self::ConfigInvalid { .. } => {
                ExitCode::ConfigError
            }
            Self::RateLimited { .. } => ExitCode::RateLimited,
            Self::AllProvidersFailed { .. } => ExitCode::ProvidersFailed,
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ExitCode::GeneralError,
        }
    }

    /// Returns the error category for classification and routing.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NoConfiguredProvider { .. } | Self::Config(_) | Self::ConfigInvalid { .. } => {
                ErrorCategory::Configuration
            }
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::AllProvidersFailed { .. } => ErrorCategory::Provider,
            Self::Io(_) | Self::Json(_) | Self::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Returns a stable error code for programmatic handling.
    ///
    /// Format: `AIGW-{category}{number}`.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "AIGW-V001",
            Self::NoConfiguredProvider { .. } => "AIGW-C001",
            Self::Config(_) => "AIGW-C002",
            Self::ConfigInvalid { .. } => "AIGW-C003",
            Self::RateLimited { .. } => "AIGW-R001",
            Self::AllProvidersFailed { .. } => "AIGW-P001",
            Self::Io(_) => "AIGW-X001",
            Self::Json(_) => "AIGW-X002",
            Self::Other(_) => "AIGW-X099",
        }
    }

    /// Returns whether the caller may reasonably retry the same request later.
    ///
    /// The router itself never retries; this is advice for callers.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } => true,
            Self::AllProvidersFailed { diagnostics, .. } => diagnostics.iter().any(|d| {
                matches!(
                    d.kind,
                    Some(FailureKind::Timeout | FailureKind::Server | FailureKind::Unavailable)
                )
            }),
            _ => false,
        }
    }

    /// Returns the retry-after duration if this error specifies one.
    #[must_use]
    pub const fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Returns the capability this error concerns, if any.
    #[must_use]
    pub const fn capability(&self) -> Option<Capability> {
        match self {
            Self::Validation { capability, .. }
            | Self::NoConfiguredProvider { capability, .. }
            | Self::RateLimited { capability, .. }
            | Self::AllProvidersFailed { capability, .. } => Some(*capability),
            _ => None,
        }
    }

    /// Per-provider diagnostics for the aggregated case.
    #[must_use]
    pub fn diagnostics(&self) -> &[ProviderDiagnostic] {
        match self {
            Self::AllProvidersFailed { diagnostics, .. } => diagnostics,
            _ => &[],
        }
    }

    /// One-line hint for terse output (first suggestion's context).
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        self.fix_suggestions().into_iter().next().map(|s| s.context)
    }

    /// Returns actionable fix suggestions for this error.
    #[must_use]
    pub fn fix_suggestions(&self) -> Vec<FixSuggestion> {
        match self {
            Self::Validation { capability, message } => {
                suggestions::validation_suggestions(*capability, message)
            }
            Self::NoConfiguredProvider { capability, checked } => {
                suggestions::no_configured_provider_suggestions(*capability, checked)
            }
            Self::Config(msg) => suggestions::config_suggestions(msg),
            Self::ConfigInvalid { key, message } => {
                suggestions::config_invalid_suggestions(key, message)
            }
            Self::RateLimited {
                capability,
                retry_after,
                ..
            } => suggestions::rate_limited_suggestions(*capability, *retry_after),
            Self::AllProvidersFailed { diagnostics, .. } => {
                suggestions::all_providers_failed_suggestions(diagnostics)
            }
            Self::Io(err) => vec![FixSuggestion::new(
                vec!["# Check file permissions and disk space".to_string()],
                format!("I/O error: {err}."),
            )],
            Self::Json(err) => vec![FixSuggestion::new(
                vec![],
                format!("JSON error: {err}. The input may be in an unexpected format."),
            )],
            Self::Other(err) => vec![FixSuggestion::new(
                vec![],
                format!("Unexpected error: {err}. Please report this issue."),
            )],
        }
    }
}

/// Result type alias for aigate operations.
pub type Result<T> = std::result::Result<T, GatewayError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn diag(provider: &str, kind: Option<FailureKind>, message: &str) -> ProviderDiagnostic {
        ProviderDiagnostic {
            provider: provider.to_string(),
            kind,
            message: message.to_string(),
        }
    }

    #[test]
    fn error_category_code_prefix() {
        assert_eq!(ErrorCategory::Validation.code_prefix(), "V");
        assert_eq!(ErrorCategory::Configuration.code_prefix(), "C");
        assert_eq!(ErrorCategory::RateLimit.code_prefix(), "R");
        assert_eq!(ErrorCategory::Provider.code_prefix(), "P");
        assert_eq!(ErrorCategory::Internal.code_prefix(), "X");
    }

    #[test]
    fn error_codes_match_category_prefix() {
        let errors = vec![
            GatewayError::validation(Capability::Text, "prompt is empty"),
            GatewayError::NoConfiguredProvider {
                capability: Capability::Image,
                checked: "stability, openai".to_string(),
            },
            GatewayError::Config("bad".to_string()),
            GatewayError::RateLimited {
                capability: Capability::Text,
                max_requests: 50,
                window_ms: 60_000,
                retry_after: None,
            },
            GatewayError::AllProvidersFailed {
                capability: Capability::Text,
                diagnostics: vec![],
            },
        ];
        for err in errors {
            let code = err.error_code();
            let prefix = format!("AIGW-{}", err.category().code_prefix());
            assert!(code.starts_with(&prefix), "{code} should start with {prefix}");
        }
    }

    #[test]
    fn aggregated_error_lists_one_line_per_provider() {
        let err = GatewayError::AllProvidersFailed {
            capability: Capability::Text,
            diagnostics: vec![
                diag("openai", Some(FailureKind::Auth), "authentication failed (HTTP 401)"),
                diag("anthropic", None, "not configured"),
            ],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("all providers failed for text generation:"));
        assert!(msg.contains("\n  - openai: authentication failed (HTTP 401)"));
        assert!(msg.contains("\n  - anthropic: not configured"));
        assert_eq!(err.diagnostics().len(), 2);
    }

    #[test]
    fn retryable_only_for_transient_provider_failures() {
        let transient = GatewayError::AllProvidersFailed {
            capability: Capability::Image,
            diagnostics: vec![diag("stability", Some(FailureKind::Timeout), "timed out")],
        };
        assert!(transient.is_retryable());

        let permanent = GatewayError::AllProvidersFailed {
            capability: Capability::Image,
            diagnostics: vec![diag("stability", Some(FailureKind::Auth), "auth")],
        };
        assert!(!permanent.is_retryable());

        assert!(!GatewayError::validation(Capability::Text, "x").is_retryable());
    }

    #[test]
    fn provider_failure_kind_and_status() {
        let f = ProviderFailure::Quota { status: 429 };
        assert_eq!(f.kind(), FailureKind::Quota);
        assert_eq!(f.status(), Some(429));
        assert_eq!(f.to_string(), "quota exhausted (HTTP 429)");

        let f = ProviderFailure::Timeout { after_ms: 30_000 };
        assert_eq!(f.status(), None);
    }

    #[test]
    fn failure_kind_parses_names() {
        assert_eq!(FailureKind::from_name("AUTH"), Some(FailureKind::Auth));
        assert_eq!(FailureKind::from_name(" quota "), Some(FailureKind::Quota));
        assert_eq!(FailureKind::from_name("bogus"), None);
    }

    #[test]
    fn exit_codes_by_category() {
        assert_eq!(
            GatewayError::validation(Capability::Text, "x").exit_code(),
            ExitCode::InvalidRequest
        );
        assert_eq!(
            GatewayError::Config("x".to_string()).exit_code(),
            ExitCode::ConfigError
        );
        assert_eq!(i32::from(ExitCode::ProvidersFailed), 5);
    }

    #[test]
    fn every_error_has_suggestions() {
        let err = GatewayError::RateLimited {
            capability: Capability::TextToSpeech,
            max_requests: 20,
            window_ms: 60_000,
            retry_after: Some(Duration::from_secs(12)),
        };
        let suggestions = err.fix_suggestions();
        assert!(!suggestions.is_empty());
        assert!(suggestions[0].context.contains("12s"));
    }
}
