//! Request options record.
//!
//! Callers hand the router a plain options record (typically a JSON object
//! assembled by the dashboard). Only the recognized keys survive parsing;
//! everything else is dropped and never forwarded to a provider.

use std::time::Duration;

use serde::Serialize;
use serde_json::{Map, Value};

/// Default sampling temperature.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
/// Temperature bounds.
pub const TEMPERATURE_RANGE: (f32, f32) = (0.0, 2.0);
/// Default and maximum completion length.
pub const DEFAULT_MAX_TOKENS: u32 = 1_024;
pub const MAX_TOKENS_CEILING: u32 = 4_096;
/// Image dimension bounds (pixels).
pub const IMAGE_DIMENSION_RANGE: (u32, u32) = (256, 1_024);
pub const DEFAULT_IMAGE_DIMENSION: u32 = 1_024;
/// Diffusion step bounds.
pub const STEPS_RANGE: (u32, u32) = (10, 50);
pub const DEFAULT_STEPS: u32 = 30;
/// Per-call deadline bounds (milliseconds).
pub const TIMEOUT_RANGE_MS: (u64, u64) = (1_000, 120_000);
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Recognized request option keys, in their wire spelling.
pub const RECOGNIZED_KEYS: &[&str] = &[
    "model",
    "temperature",
    "maxTokens",
    "width",
    "height",
    "steps",
    "voiceId",
    "modelId",
    "timeoutMs",
];

/// Options for a single router call. Every field is optional; adapters fall
/// back to their own defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl RequestOptions {
    /// Empty options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a loosely-typed record.
    ///
    /// Unrecognized keys and values of the wrong type are dropped.
    #[must_use]
    pub fn from_record(record: &Map<String, Value>) -> Self {
        let mut options = Self::default();
        for (key, value) in record {
            let accepted = match key.as_str() {
                "model" => set(&mut options.model, as_string(value)),
                "temperature" => set(&mut options.temperature, as_f32(value)),
                "maxTokens" => set(&mut options.max_tokens, as_u32(value)),
                "width" => set(&mut options.width, as_u32(value)),
                "height" => set(&mut options.height, as_u32(value)),
                "steps" => set(&mut options.steps, as_u32(value)),
                "voiceId" => set(&mut options.voice_id, as_string(value)),
                "modelId" => set(&mut options.model_id, as_string(value)),
                "timeoutMs" => set(&mut options.timeout_ms, value.as_u64()),
                _ => {
                    tracing::debug!(key = %key, "Dropping unrecognized option");
                    continue;
                }
            };
            if !accepted {
                tracing::debug!(key = %key, "Dropping option with unexpected value type");
            }
        }
        options
    }

    /// Build from any JSON value; non-objects yield empty options.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        value.as_object().map(Self::from_record).unwrap_or_default()
    }

    /// Builder: model.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builder: per-call deadline.
    #[must_use]
    pub const fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// Effective temperature.
    #[must_use]
    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    /// Effective completion length.
    #[must_use]
    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    /// Effective image size.
    #[must_use]
    pub fn dimensions_or_default(&self) -> (u32, u32) {
        (
            self.width.unwrap_or(DEFAULT_IMAGE_DIMENSION),
            self.height.unwrap_or(DEFAULT_IMAGE_DIMENSION),
        )
    }

    /// Effective diffusion steps.
    #[must_use]
    pub fn steps_or_default(&self) -> u32 {
        self.steps.unwrap_or(DEFAULT_STEPS)
    }

    /// Effective per-call deadline.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS))
    }
}

fn set<T>(slot: &mut Option<T>, value: Option<T>) -> bool {
    let accepted = value.is_some();
    if accepted {
        *slot = value;
    }
    accepted
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(str::to_string)
}

#[allow(clippy::cast_possible_truncation)]
fn as_f32(value: &Value) -> Option<f32> {
    value.as_f64().filter(|v| v.is_finite()).map(|v| v as f32)
}

fn as_u32(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64))
            .map(|v| u32::try_from(v).unwrap_or(u32::MAX)),
        _ => None,
    }
}
