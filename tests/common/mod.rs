//! Shared helpers for integration tests.
//!
//! - `log_capture`: thread-local tracing capture for log assertions
//! - `mocks`: wiremock responders shaped like each provider's API

#![allow(dead_code)]

pub mod log_capture;
pub mod mocks;
