//! Configuration file loading and validation.
//!
//! Loads configuration from:
//! - Linux: `~/.config/aigate/config.toml`
//! - macOS: `~/Library/Application Support/aigate/config.toml`
//! - Windows: `%APPDATA%/aigate/config/config.toml`
//!
//! ## Precedence
//!
//! 1. CLI flags (`--config`, `--pretty`)
//! 2. Environment variables
//! 3. Config file
//! 4. Built-in defaults
//!
//! ## Environment Variables
//!
//! - `AIGATE_CONFIG`: Override config file path
//! - `AIGATE_TIMEOUT`: Default request deadline in seconds
//! - `AIGATE_PRETTY`: Pretty-print JSON output (1, true, yes)
//!
//! ## Example
//!
//! ```toml
//! [general]
//! timeout_seconds = 30
//!
//! [routing]
//! text = ["anthropic:claude-3-5-sonnet-latest", "openai", "gemini"]
//!
//! [rate_limits.image]
//! max_requests = 5
//! window_ms = 60000
//!
//! [failover]
//! skip_provider_on = ["auth", "quota"]
//! halt_on = []
//!
//! [providers.openai]
//! api_base = "https://proxy.internal.example"
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::capability::Capability;
use crate::core::failover::{FailoverPolicy, Route, RouteTarget};
use crate::core::options::TIMEOUT_RANGE_MS;
use crate::core::provider::ProviderId;
use crate::core::rate_limit::RateLimitPolicy;
use crate::core::router::RouterConfig;
use crate::core::validate::is_safe_identifier;
use crate::error::{FailureKind, GatewayError, Result};
use crate::providers::{ImageProvider, SpeechProvider, TextProvider, TranscriptionProvider};

// =============================================================================
// Environment Variable Names
// =============================================================================

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "AIGATE_CONFIG";
/// Environment variable for the default deadline in seconds.
pub const ENV_TIMEOUT: &str = "AIGATE_TIMEOUT";
/// Environment variable for pretty JSON output.
pub const ENV_PRETTY: &str = "AIGATE_PRETTY";

// =============================================================================
// Resolved Configuration
// =============================================================================

/// Where a configuration value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Value from CLI flag.
    Cli,
    /// Value from environment variable.
    Env,
    /// Value from config file.
    ConfigFile,
    /// Built-in default.
    #[default]
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI flag"),
            Self::Env => write!(f, "environment variable"),
            Self::ConfigFile => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

/// Configuration after merging CLI flags, environment and the config file.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Config file that was read (it may not exist).
    pub path: PathBuf,
    pub path_source: ConfigSource,
    /// Router settings, validated.
    pub router: RouterConfig,
    pub timeout_source: ConfigSource,
    /// Whether to pretty-print JSON output.
    pub pretty: bool,
}

impl ResolvedConfig {
    /// Resolve against the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file is unreadable or invalid, or if an
    /// explicitly named config file does not exist.
    pub fn resolve(config_flag: Option<&Path>, pretty_flag: bool) -> Result<Self> {
        Self::resolve_with(config_flag, pretty_flag, |key| std::env::var(key).ok())
    }

    /// [`resolve`](Self::resolve) with an injectable environment lookup.
    pub fn resolve_with(
        config_flag: Option<&Path>,
        pretty_flag: bool,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let (path, path_source) = if let Some(path) = config_flag {
            (path.to_path_buf(), ConfigSource::Cli)
        } else if let Some(path) = env(ENV_CONFIG).filter(|p| !p.trim().is_empty()) {
            (PathBuf::from(path), ConfigSource::Env)
        } else {
            (Config::config_path(), ConfigSource::Default)
        };

        let explicit = path_source != ConfigSource::Default;
        if explicit && !path.exists() {
            return Err(GatewayError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }

        let mut config = Config::load_from(&path)?;
        let mut timeout_source = if path.exists() {
            ConfigSource::ConfigFile
        } else {
            ConfigSource::Default
        };

        if let Some(raw) = env(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(seconds) => {
                    config.general.timeout_seconds = seconds;
                    timeout_source = ConfigSource::Env;
                }
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid {ENV_TIMEOUT}"),
            }
        }

        let router = config.to_router_config()?;
        let pretty = pretty_flag || env(ENV_PRETTY).is_some_and(|v| is_truthy(&v));

        Ok(Self {
            path,
            path_source,
            router,
            timeout_source,
            pretty,
        })
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

// =============================================================================
// File Format
// =============================================================================

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings.
    pub general: GeneralConfig,
    /// Provider priority lists per capability.
    pub routing: RoutingConfig,
    /// Per-capability quotas keyed by capability name.
    pub rate_limits: BTreeMap<String, RateLimitPolicy>,
    /// Which failures skip a provider family or halt the chain.
    pub failover: FailoverConfig,
    /// Provider-specific settings keyed by provider name.
    pub providers: BTreeMap<String, ProviderSettings>,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Deadline for calls that do not pass `timeoutMs`, in seconds.
    pub timeout_seconds: u64,
    /// Lifetime of generated audio before the sweeper releases it.
    pub resource_ttl_seconds: u64,
    /// How often the sweeper runs.
    pub sweep_interval_seconds: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            resource_ttl_seconds: 3_600,
            sweep_interval_seconds: 60,
        }
    }
}

/// Priority lists. Entries are `provider` or `provider:model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub text: Vec<String>,
    pub image: Vec<String>,
    pub speech: Vec<String>,
    pub transcription: Vec<String>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        fn names<P: RouteTarget>(order: &[P]) -> Vec<String> {
            order
                .iter()
                .map(|p| p.family().cli_name().to_string())
                .collect()
        }
        Self {
            text: names(TextProvider::DEFAULT_ORDER),
            image: names(ImageProvider::DEFAULT_ORDER),
            speech: names(SpeechProvider::DEFAULT_ORDER),
            transcription: names(TranscriptionProvider::DEFAULT_ORDER),
        }
    }
}

/// Failover policy by failure-kind name.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    pub skip_provider_on: Vec<String>,
    pub halt_on: Vec<String>,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        let policy = FailoverPolicy::default();
        let mut skip: Vec<String> = policy
            .skip_provider_on
            .iter()
            .map(|k| k.as_str().to_string())
            .collect();
        skip.sort();
        Self {
            skip_provider_on: skip,
            halt_on: Vec::new(),
        }
    }
}

/// Settings for a specific provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// Custom API base URL (if different from default).
    pub api_base: Option<String>,
}

impl Config {
    /// Load configuration from the default config file path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from a specific path.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns error only if the file exists but is invalid.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(?path, "Config file not found, using defaults");
            return Ok(Self::default());
        }

        tracing::debug!(?path, "Loading config file");
        let content = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| GatewayError::Config(format!("Invalid config file: {e}")))?;

        Ok(config)
    }

    /// Get the config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        AppPaths::new().config_file()
    }

    /// Validate configuration values.
    ///
    /// Checks that:
    /// - Routing entries name known providers that serve the capability
    /// - No priority list is empty or repeats an entry
    /// - Rate limits name a capability and are non-zero
    /// - Failure kinds are known
    /// - Timeouts and intervals are within bounds
    pub fn validate(&self) -> Result<()> {
        self.to_router_config().map(drop)
    }

    /// Build a validated [`RouterConfig`].
    pub fn to_router_config(&self) -> Result<RouterConfig> {
        let (min_ms, max_ms) = TIMEOUT_RANGE_MS;
        let timeout_ms = self.general.timeout_seconds.saturating_mul(1_000);
        if !(min_ms..=max_ms).contains(&timeout_ms) {
            return Err(invalid(
                "general.timeout_seconds",
                format!(
                    "must be between {} and {} seconds",
                    min_ms / 1_000,
                    max_ms / 1_000
                ),
            ));
        }
        if self.general.resource_ttl_seconds == 0 {
            return Err(invalid("general.resource_ttl_seconds", "must be positive"));
        }
        if self.general.sweep_interval_seconds == 0 {
            return Err(invalid("general.sweep_interval_seconds", "must be positive"));
        }

        Ok(RouterConfig {
            text: parse_routes(
                "routing.text",
                Capability::Text,
                &self.routing.text,
                TextProvider::from_family,
            )?,
            image: parse_routes(
                "routing.image",
                Capability::Image,
                &self.routing.image,
                ImageProvider::from_family,
            )?,
            speech: parse_routes(
                "routing.speech",
                Capability::TextToSpeech,
                &self.routing.speech,
                SpeechProvider::from_family,
            )?,
            transcription: parse_routes(
                "routing.transcription",
                Capability::SpeechToText,
                &self.routing.transcription,
                TranscriptionProvider::from_family,
            )?,
            rate_limits: self.rate_limit_policies()?,
            failover: FailoverPolicy {
                skip_provider_on: parse_kinds(
                    "failover.skip_provider_on",
                    &self.failover.skip_provider_on,
                )?,
                halt_on: parse_kinds("failover.halt_on", &self.failover.halt_on)?,
            },
            default_timeout: Duration::from_secs(self.general.timeout_seconds),
            base_urls: self.base_urls()?,
            resource_ttl: Duration::from_secs(self.general.resource_ttl_seconds),
            sweep_interval: Duration::from_secs(self.general.sweep_interval_seconds),
        })
    }

    fn rate_limit_policies(&self) -> Result<HashMap<Capability, RateLimitPolicy>> {
        let mut policies = HashMap::new();
        for (name, policy) in &self.rate_limits {
            let key = format!("rate_limits.{name}");
            let capability = Capability::from_name(name).ok_or_else(|| {
                invalid(
                    &key,
                    format!(
                        "unknown capability. Valid capabilities: {}",
                        Capability::ALL
                            .iter()
                            .map(|c| c.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })?;
            if policy.max_requests == 0 {
                return Err(invalid(&key, "max_requests must be positive"));
            }
            if policy.window_ms == 0 {
                return Err(invalid(&key, "window_ms must be positive"));
            }
            policies.insert(capability, *policy);
        }
        Ok(policies)
    }

    fn base_urls(&self) -> Result<HashMap<ProviderId, String>> {
        let mut urls = HashMap::new();
        for (name, settings) in &self.providers {
            let key = format!("providers.{name}");
            let provider = ProviderId::from_name(name)
                .ok_or_else(|| invalid(&key, format!("unknown provider \"{name}\"")))?;
            if let Some(base) = settings.api_base.as_deref().map(str::trim) {
                if !(base.starts_with("http://") || base.starts_with("https://")) {
                    return Err(invalid(
                        &format!("{key}.api_base"),
                        "must start with http:// or https://",
                    ));
                }
                urls.insert(provider, base.trim_end_matches('/').to_string());
            }
        }
        Ok(urls)
    }
}

fn invalid(key: &str, message: impl Into<String>) -> GatewayError {
    GatewayError::ConfigInvalid {
        key: key.to_string(),
        message: message.into(),
    }
}

fn parse_routes<P: RouteTarget>(
    key: &str,
    capability: Capability,
    entries: &[String],
    from_family: fn(ProviderId) -> Option<P>,
) -> Result<Vec<Route<P>>> {
    if entries.is_empty() {
        return Err(invalid(key, "priority list is empty"));
    }

    let mut seen = HashSet::new();
    let mut routes = Vec::with_capacity(entries.len());
    for entry in entries {
        let entry = entry.trim();
        let (name, model) = match entry.split_once(':') {
            Some((name, model)) => (name.trim(), Some(model.trim())),
            None => (entry, None),
        };

        let family = ProviderId::from_name(name)
            .ok_or_else(|| invalid(key, format!("unknown provider \"{name}\"")))?;
        let provider = from_family(family).ok_or_else(|| {
            invalid(
                key,
                format!("{family} does not serve {}", capability.display_name()),
            )
        })?;

        let route = match model {
            Some("") => return Err(invalid(key, format!("empty model in \"{entry}\""))),
            Some(model) if !is_safe_identifier(model) => {
                return Err(invalid(
                    key,
                    format!("model in \"{entry}\" contains invalid characters"),
                ));
            }
            Some(model) => Route::with_model(provider, model),
            None => Route::new(provider),
        };

        if !seen.insert(route.label()) {
            return Err(invalid(key, format!("duplicate entry \"{}\"", route.label())));
        }
        routes.push(route);
    }
    Ok(routes)
}

fn parse_kinds(key: &str, names: &[String]) -> Result<HashSet<FailureKind>> {
    names
        .iter()
        .map(|name| {
            FailureKind::from_name(name).ok_or_else(|| {
                invalid(
                    key,
                    format!(
                        "unknown failure kind \"{name}\". Valid kinds: {}",
                        FailureKind::ALL
                            .iter()
                            .map(|k| k.as_str())
                            .collect::<Vec<_>>()
                            .join(", ")
                    ),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn invalid_key(err: &GatewayError) -> &str {
        match err {
            GatewayError::ConfigInvalid { key, .. } => key,
            other => panic!("expected ConfigInvalid, got {other:?}"),
        }
    }

    #[test]
    fn default_config_matches_router_defaults() {
        let router = Config::default().to_router_config().unwrap();
        let defaults = RouterConfig::default();
        assert_eq!(router.text, defaults.text);
        assert_eq!(router.image, defaults.image);
        assert_eq!(router.speech, defaults.speech);
        assert_eq!(router.transcription, defaults.transcription);
        assert_eq!(router.failover, FailoverPolicy::default());
        assert_eq!(router.default_timeout, Duration::from_secs(30));
        assert!(router.base_urls.is_empty());
    }

    #[test]
    fn load_missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/path/config.toml")).unwrap();
        assert_eq!(config.general.timeout_seconds, 30);
        assert_eq!(config.routing.image, vec!["stability", "openai"]);
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let file = write_config("this is not valid toml {{");
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn load_full_file() {
        let file = write_config(
            r#"
[general]
timeout_seconds = 45
resource_ttl_seconds = 600

[routing]
text = ["anthropic:claude-3-5-sonnet-latest", "openai", "openai:gpt-4o"]

[rate_limits.image]
max_requests = 5
window_ms = 30000

[failover]
skip_provider_on = ["auth"]
halt_on = ["quota"]

[providers.openai]
api_base = "http://127.0.0.1:8080/"
"#,
        );

        let router = Config::load_from(file.path())
            .unwrap()
            .to_router_config()
            .unwrap();

        let labels: Vec<String> = router.text.iter().map(Route::label).collect();
        assert_eq!(
            labels,
            vec!["anthropic:claude-3-5-sonnet-latest", "openai", "openai:gpt-4o"]
        );
        assert_eq!(
            router.rate_limits.get(&Capability::Image),
            Some(&RateLimitPolicy::new(5, 30_000))
        );
        assert!(router.failover.halt_on.contains(&FailureKind::Quota));
        assert!(!router.failover.skip_provider_on.contains(&FailureKind::Quota));
        assert_eq!(router.default_timeout, Duration::from_secs(45));
        assert_eq!(router.resource_ttl, Duration::from_secs(600));
        assert_eq!(router.base_url(ProviderId::OpenAi), "http://127.0.0.1:8080");
        assert_eq!(router.base_url(ProviderId::Anthropic), "https://api.anthropic.com");
    }

    #[test]
    fn rejects_unknown_provider() {
        let mut config = Config::default();
        config.routing.text = vec!["mistral".to_string()];
        let err = config.validate().unwrap_err();
        assert_eq!(invalid_key(&err), "routing.text");
        assert!(err.to_string().contains("unknown provider \"mistral\""));
    }

    #[test]
    fn rejects_provider_without_capability() {
        let mut config = Config::default();
        config.routing.image = vec!["anthropic".to_string()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("does not serve image generation"));
    }

    #[test]
    fn rejects_empty_and_duplicate_lists() {
        let mut config = Config::default();
        config.routing.speech.clear();
        assert_eq!(invalid_key(&config.validate().unwrap_err()), "routing.speech");

        let mut config = Config::default();
        config.routing.transcription = vec!["openai".to_string(), "OpenAI".to_string()];
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("duplicate entry")
        );
    }

    #[test]
    fn rejects_unsafe_model_pin() {
        let mut config = Config::default();
        config.routing.text = vec!["openai:../../admin".to_string()];
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("invalid characters")
        );
    }

    #[test]
    fn rejects_zero_rate_limits_and_unknown_capability() {
        let mut config = Config::default();
        config
            .rate_limits
            .insert("text".to_string(), RateLimitPolicy::new(0, 60_000));
        assert_eq!(invalid_key(&config.validate().unwrap_err()), "rate_limits.text");

        let mut config = Config::default();
        config
            .rate_limits
            .insert("video".to_string(), RateLimitPolicy::new(1, 1));
        assert_eq!(invalid_key(&config.validate().unwrap_err()), "rate_limits.video");
    }

    #[test]
    fn rejects_out_of_range_timeouts() {
        for seconds in [0, 121, u64::MAX] {
            let mut config = Config::default();
            config.general.timeout_seconds = seconds;
            assert_eq!(
                invalid_key(&config.validate().unwrap_err()),
                "general.timeout_seconds",
                "{seconds}s should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unknown_failure_kind_and_bad_base_url() {
        let mut config = Config::default();
        config.failover.halt_on = vec!["explosion".to_string()];
        assert_eq!(invalid_key(&config.validate().unwrap_err()), "failover.halt_on");

        let mut config = Config::default();
        config.providers.insert(
            "deepgram".to_string(),
            ProviderSettings {
                api_base: Some("ftp://example".to_string()),
            },
        );
        assert_eq!(
            invalid_key(&config.validate().unwrap_err()),
            "providers.deepgram.api_base"
        );
    }

    #[test]
    fn resolve_prefers_flag_over_env_path() {
        let flagged = write_config("[general]\ntimeout_seconds = 10\n");
        let from_env = write_config("[general]\ntimeout_seconds = 20\n");
        let env_path = from_env.path().to_string_lossy().into_owned();

        let resolved = ResolvedConfig::resolve_with(Some(flagged.path()), false, |key| {
            (key == ENV_CONFIG).then(|| env_path.clone())
        })
        .unwrap();
        assert_eq!(resolved.path_source, ConfigSource::Cli);
        assert_eq!(resolved.router.default_timeout, Duration::from_secs(10));

        let resolved = ResolvedConfig::resolve_with(None, false, |key| {
            (key == ENV_CONFIG).then(|| env_path.clone())
        })
        .unwrap();
        assert_eq!(resolved.path_source, ConfigSource::Env);
        assert_eq!(resolved.router.default_timeout, Duration::from_secs(20));
        assert_eq!(resolved.timeout_source, ConfigSource::ConfigFile);
    }

    #[test]
    fn resolve_missing_explicit_file_is_an_error() {
        let err = ResolvedConfig::resolve_with(
            Some(Path::new("/nonexistent/aigate.toml")),
            false,
            no_env,
        )
        .unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn resolve_env_timeout_and_pretty() {
        let file = write_config("[general]\ntimeout_seconds = 10\n");
        let resolved = ResolvedConfig::resolve_with(Some(file.path()), false, |key| match key {
            ENV_TIMEOUT => Some("90".to_string()),
            ENV_PRETTY => Some("yes".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(resolved.router.default_timeout, Duration::from_secs(90));
        assert_eq!(resolved.timeout_source, ConfigSource::Env);
        assert!(resolved.pretty);
    }

    #[test]
    fn resolve_env_timeout_is_validated() {
        let file = write_config("");
        let err = ResolvedConfig::resolve_with(Some(file.path()), false, |key| {
            (key == ENV_TIMEOUT).then(|| "600".to_string())
        })
        .unwrap_err();
        assert_eq!(invalid_key(&err), "general.timeout_seconds");
    }

    #[test]
    fn config_source_display() {
        assert_eq!(ConfigSource::Cli.to_string(), "CLI flag");
        assert_eq!(ConfigSource::Env.to_string(), "environment variable");
        assert_eq!(ConfigSource::ConfigFile.to_string(), "config file");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }
}
