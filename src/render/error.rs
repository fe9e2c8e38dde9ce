//! Error rendering for aigate.
//!
//! Plain text with the first fix suggestion for terminals, structured JSON
//! for machine consumption.

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::error::{GatewayError, ProviderDiagnostic};

// =============================================================================
// Public API
// =============================================================================

/// Render an error in the requested format.
#[must_use]
pub fn render_error(error: &GatewayError, format: OutputFormat, pretty: bool) -> String {
    match format {
        OutputFormat::Json => render_error_json(error, pretty),
        OutputFormat::Human => render_simple(error),
    }
}

/// Render error as structured JSON.
#[must_use]
pub fn render_error_json(error: &GatewayError, pretty: bool) -> String {
    let error_json = ErrorJson::from_error(error);
    let rendered = if pretty {
        serde_json::to_string_pretty(&error_json)
    } else {
        serde_json::to_string(&error_json)
    };
    rendered.unwrap_or_else(|_| render_simple(error))
}

// =============================================================================
// Simple Text Rendering
// =============================================================================

/// Error line, then the first runnable fix and the explanation.
fn render_simple(error: &GatewayError) -> String {
    let suggestions = error.fix_suggestions();

    let mut lines = vec![format!("Error [{}]: {}", error.error_code(), error)];

    if let Some(suggestion) = suggestions.first() {
        // Skip comments
        if let Some(cmd) = suggestion.commands.iter().find(|c| !c.starts_with('#')) {
            lines.push(format!("Fix: {cmd}"));
        }
        if !suggestion.context.is_empty() {
            lines.push(format!("Why: {}", suggestion.context));
        }
        if let Some(prevention) = &suggestion.prevention {
            lines.push(format!("Tip: {prevention}"));
        }
    }

    if let Some(retry_after) = error.retry_after() {
        lines.push(format!("Retry after: {}s", retry_after.as_secs().max(1)));
    }

    lines.join("\n")
}

// =============================================================================
// JSON Rendering
// =============================================================================

#[derive(Serialize)]
struct ErrorJson<'a> {
    error_code: &'static str,
    category: String,
    message: String,
    is_retryable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    capability: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after_ms: Option<u64>,
    #[serde(skip_serializing_if = "<[_]>::is_empty")]
    providers: &'a [ProviderDiagnostic],
    suggestions: Vec<SuggestionJson>,
}

#[derive(Serialize)]
struct SuggestionJson {
    commands: Vec<String>,
    context: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    prevention: Option<String>,
}

impl<'a> ErrorJson<'a> {
    fn from_error(error: &'a GatewayError) -> Self {
        Self {
            error_code: error.error_code(),
            category: error.category().to_string(),
            message: error.to_string(),
            is_retryable: error.is_retryable(),
            capability: error.capability().map(|c| c.as_str()),
            retry_after_ms: error
                .retry_after()
                .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX)),
            providers: error.diagnostics(),
            suggestions: error
                .fix_suggestions()
                .into_iter()
                .map(|s| SuggestionJson {
                    commands: s.commands,
                    context: s.context,
                    prevention: s.prevention,
                })
                .collect(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
