//! Provider credentials.
//!
//! Keys are read once when the router is built (by default from the process
//! environment) and never re-read per call. A provider whose key is missing
//! or malformed is *unconfigured*: it is skipped by the failover loop instead
//! of failing startup.

use std::collections::HashMap;

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};

use super::provider::ProviderId;

/// Minimum plausible API key length. Shorter values are treated as typos.
pub const MIN_KEY_LEN: usize = 10;

/// A provider API key that never prints its value.
#[derive(Clone)]
pub struct ApiKey(SecretString);

impl ApiKey {
    /// Create a new API key (surrounding whitespace is trimmed).
    pub fn new(key: impl Into<String>) -> Self {
        Self(SecretString::from(key.into().trim().to_string()))
    }

    /// Expose the secret value. Only call this when building a request.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }

    /// Whether the key passes the minimal shape check.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        let key = self.expose_secret();
        key.len() >= MIN_KEY_LEN && !key.chars().any(char::is_whitespace)
    }

    /// Short SHA-256 fingerprint, safe to log.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.expose_secret().as_bytes());
        hex::encode(&digest[..4])
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ApiKey([REDACTED])")
    }
}

impl From<&str> for ApiKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Why a provider counts as unconfigured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Configured,
    Missing,
    Malformed,
}

impl CredentialState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configured => "configured",
            Self::Missing => "not configured",
            Self::Malformed => "credential malformed",
        }
    }
}

/// Immutable map from provider to API key.
#[derive(Debug, Clone, Default)]
pub struct CredentialRegistry {
    keys: HashMap<ProviderId, ApiKey>,
}

impl CredentialRegistry {
    /// Empty registry (every provider unconfigured).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load keys from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load keys through an arbitrary lookup keyed by environment variable name.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut keys = HashMap::new();
        for &provider in ProviderId::ALL {
            if let Some(value) = lookup(provider.env_var()) {
                if value.trim().is_empty() {
                    continue;
                }
                let key = ApiKey::new(value);
                tracing::debug!(
                    provider = %provider,
                    fingerprint = %key.fingerprint(),
                    well_formed = key.is_well_formed(),
                    "Loaded credential"
                );
                keys.insert(provider, key);
            }
        }
        Self { keys }
    }

    /// Builder: set a key for a provider.
    #[must_use]
    pub fn with(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.keys.insert(provider, ApiKey::new(key));
        self
    }

    /// Credential state for a provider.
    #[must_use]
    pub fn state(&self, provider: ProviderId) -> CredentialState {
        match self.keys.get(&provider) {
            None => CredentialState::Missing,
            Some(key) if key.expose_secret().is_empty() => CredentialState::Missing,
            Some(key) if !key.is_well_formed() => CredentialState::Malformed,
            Some(_) => CredentialState::Configured,
        }
    }

    /// Whether the provider has a usable key.
    #[must_use]
    pub fn is_configured(&self, provider: ProviderId) -> bool {
        self.state(provider) == CredentialState::Configured
    }

    /// The provider's key, only if it is usable.
    #[must_use]
    pub fn usable_key(&self, provider: ProviderId) -> Option<&ApiKey> {
        if self.is_configured(provider) {
            self.keys.get(&provider)
        } else {
            None
        }
    }

    /// Providers with a usable key.
    #[must_use]
    pub fn configured(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .iter()
            .copied()
            .filter(|p| self.is_configured(*p))
            .collect()
    }
}
