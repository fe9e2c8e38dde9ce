//! aigate - AI service router
//!
//! Routes text generation, image generation, text-to-speech and
//! speech-to-text requests across external AI providers with validation,
//! local rate limiting, ordered failover and tracking of generated audio.

// Note: deny (not forbid) to allow #[allow(unsafe_code)] in test helpers for env var manipulation
#![deny(unsafe_code)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod core;
pub mod error;
pub mod providers;
pub mod render;
pub mod storage;

/// Test utilities module - included in test builds or when test-utils feature is enabled.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use crate::core::{Capability, ProviderId, RequestOptions, Router, RouterConfig, RouterOutput};
pub use error::{ExitCode, GatewayError, Result};
