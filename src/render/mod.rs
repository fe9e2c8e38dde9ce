//! Output rendering for human and JSON modes.

pub mod error;

use std::fmt::Write as _;
use std::path::Path;

use serde::Serialize;

use crate::cli::args::OutputFormat;
use crate::core::capability::Capability;
use crate::core::failover::{AttemptOutcome, ChainSuccess, ProviderAttempt};
use crate::core::router::{CapabilityStatus, RouterOutput};
use crate::error::Result;

pub use error::render_error;

/// A completed call as shown to the operator.
#[derive(Debug, Serialize)]
pub struct CallReport<'a> {
    pub capability: Capability,
    /// Route that answered.
    pub route: &'a str,
    pub output: &'a RouterOutput,
    /// Where `speak` wrote the audio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<&'a Path>,
    pub attempts: Vec<AttemptJson>,
}

/// One route's outcome in a [`CallReport`].
#[derive(Debug, Serialize)]
pub struct AttemptJson {
    pub route: String,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    pub duration_ms: u64,
}

impl From<&ProviderAttempt> for AttemptJson {
    fn from(attempt: &ProviderAttempt) -> Self {
        let (outcome, detail) = match &attempt.outcome {
            AttemptOutcome::Succeeded => ("succeeded", None),
            AttemptOutcome::Failed(failure) => ("failed", Some(failure.to_string())),
            AttemptOutcome::Skipped(reason) => ("skipped", Some(reason.to_string())),
        };
        Self {
            route: attempt.route.clone(),
            outcome,
            detail,
            duration_ms: attempt.duration_ms,
        }
    }
}

impl<'a> CallReport<'a> {
    #[must_use]
    pub fn new(
        capability: Capability,
        success: &'a ChainSuccess<RouterOutput>,
        saved_to: Option<&'a Path>,
    ) -> Self {
        Self {
            capability,
            route: &success.route,
            output: &success.value,
            saved_to,
            attempts: success.attempts.iter().map(AttemptJson::from).collect(),
        }
    }
}

/// Render a completed call.
pub fn render_call(report: &CallReport<'_>, format: OutputFormat, pretty: bool) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(report, pretty),
        OutputFormat::Human => Ok(render_call_human(report)),
    }
}

fn render_call_human(report: &CallReport<'_>) -> String {
    match report.output {
        RouterOutput::Text(text) | RouterOutput::Image(text) | RouterOutput::Transcript(text) => {
            text.clone()
        }
        RouterOutput::Speech(resource) => {
            let target = report
                .saved_to
                .map_or_else(|| resource.id.to_string(), |p| p.display().to_string());
            format!(
                "Wrote {} bytes of {} to {} (via {})",
                resource.len, resource.content_type, target, report.route
            )
        }
    }
}

/// Render routing status.
pub fn render_status(
    status: &[CapabilityStatus],
    format: OutputFormat,
    pretty: bool,
) -> Result<String> {
    match format {
        OutputFormat::Json => to_json(&status, pretty),
        OutputFormat::Human => Ok(render_status_human(status)),
    }
}

fn render_status_human(status: &[CapabilityStatus]) -> String {
    let mut out = String::new();
    for (i, cap) in status.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let _ = writeln!(
            out,
            "{} ({}/{} left per {}s)",
            cap.capability.display_name(),
            cap.remaining,
            cap.rate_limit.max_requests,
            cap.rate_limit.window_ms / 1_000
        );
        for (rank, route) in cap.routes.iter().enumerate() {
            let marker = if route.configured { "+" } else { "-" };
            let _ = writeln!(
                out,
                "  {}. [{marker}] {:<40} {}",
                rank + 1,
                route.route,
                route.state
            );
        }
    }
    out.trim_end().to_string()
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    Ok(if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}
