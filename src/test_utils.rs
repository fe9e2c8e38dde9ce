//! Test utilities for aigate.
//!
//! Factories for credentials, router configurations pointed at a mock
//! server, routers on a manual clock, and a few assertion macros.
//!
//! # Usage
//!
//! ```rust,ignore
//! use aigate::test_utils::*;
//!
//! let server = wiremock::MockServer::start().await;
//! let creds = make_test_credentials(&[ProviderId::OpenAi]);
//! let (router, clock) = make_test_router(make_test_router_config(&server.uri()), creds);
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::core::clock::ManualClock;
use crate::core::credentials::CredentialRegistry;
use crate::core::provider::ProviderId;
use crate::core::router::{Router, RouterConfig};

// =============================================================================
// Test Data Factories
// =============================================================================

/// A well-formed fake API key.
pub const TEST_API_KEY: &str = "sk-test-0123456789abcdef";

/// Start time of the manual clock used by [`make_test_router`].
pub const TEST_CLOCK_START_MS: u64 = 1_700_000_000_000;

/// Credentials with [`TEST_API_KEY`] for each listed provider.
#[must_use]
pub fn make_test_credentials(providers: &[ProviderId]) -> CredentialRegistry {
    providers
        .iter()
        .fold(CredentialRegistry::new(), |registry, &provider| {
            registry.with(provider, TEST_API_KEY)
        })
}

/// Default routing with every provider pointed at `base_url` and a short
/// default deadline.
#[must_use]
pub fn make_test_router_config(base_url: &str) -> RouterConfig {
    RouterConfig {
        default_timeout: Duration::from_secs(5),
        ..RouterConfig::default()
    }
    .with_base_url_for_all(base_url)
}

/// A router on a [`ManualClock`]; the clock is returned for advancing.
///
/// # Panics
///
/// Panics if the HTTP client cannot be built.
#[must_use]
pub fn make_test_router(
    config: RouterConfig,
    credentials: CredentialRegistry,
) -> (Router, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(TEST_CLOCK_START_MS));
    let router = Router::with_clock(config, credentials, clock.clone())
        .expect("Failed to build test router");
    (router, clock)
}

/// A minimal RIFF/WAVE header followed by `samples` bytes of silence.
#[must_use]
pub fn make_test_wav(samples: usize) -> Vec<u8> {
    let data_len = u32::try_from(samples).unwrap_or(u32::MAX);
    let mut wav = Vec::with_capacity(44 + samples);
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVEfmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&1u16.to_le_bytes()); // mono
    wav.extend_from_slice(&16_000u32.to_le_bytes());
    wav.extend_from_slice(&32_000u32.to_le_bytes());
    wav.extend_from_slice(&2u16.to_le_bytes());
    wav.extend_from_slice(&16u16.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());
    wav.resize(44 + samples, 0);
    wav
}

/// Config file routing every provider to `base_url`.
#[must_use]
pub fn make_test_config_toml(base_url: &str) -> String {
    let providers: String = ProviderId::ALL
        .iter()
        .map(|p| format!("\n[providers.{}]\napi_base = \"{base_url}\"\n", p.cli_name()))
        .collect();
    format!(
        r#"[general]
timeout_seconds = 5

[routing]
text = ["openai", "anthropic", "gemini"]
image = ["stability", "openai"]
speech = ["elevenlabs", "openai"]
transcription = ["openai", "deepgram"]

[failover]
skip_provider_on = ["auth", "quota"]
halt_on = []
{providers}"#
    )
}

// =============================================================================
// Temporary Directories
// =============================================================================

/// An isolated temporary directory removed on drop.
pub struct TestDir {
    inner: tempfile::TempDir,
}

impl TestDir {
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: tempfile::tempdir().expect("Failed to create temp directory"),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Write a file, creating parent directories. Returns its path.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn create_file(&self, name: &str, content: impl AsRef<[u8]>) -> PathBuf {
        let path = self.inner.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directories");
        }
        fs::write(&path, content).expect("Failed to write test file");
        path
    }

    #[must_use]
    pub fn file_path(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

impl Default for TestDir {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Assertion Macros
// =============================================================================

/// Assert that a string contains a substring.
#[macro_export]
macro_rules! assert_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            haystack.contains(needle),
            "Expected string to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string does NOT contain a substring.
#[macro_export]
macro_rules! assert_not_contains {
    ($haystack:expr, $needle:expr) => {
        let haystack = $haystack;
        let needle = $needle;
        assert!(
            !haystack.contains(needle),
            "Expected string NOT to contain {:?}\n\nActual string:\n{:?}",
            needle,
            haystack
        );
    };
}

/// Assert that a string parses as JSON and evaluate to the parsed value.
#[macro_export]
macro_rules! assert_json_valid {
    ($json:expr) => {{
        let json = $json;
        match serde_json::from_str::<serde_json::Value>(json) {
            Ok(value) => value,
            Err(e) => panic!("Invalid JSON: {e}\n\nInput:\n{json}"),
        }
    }};
}
