//! The AI service router.
//!
//! One [`Router`] is built per process (or per test) from a [`RouterConfig`],
//! a [`CredentialRegistry`] and a [`Clock`], then shared by reference across
//! tasks. Every call runs the same pipeline:
//!
//! 1. validate the payload and options
//! 2. fail fast if no provider for the capability has a usable credential
//! 3. admit against the capability's rate window
//! 4. sanitize input and options
//! 5. try providers in priority order (see [`run_chain`])
//! 6. sanitize string output

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::capability::Capability;
use super::clock::{Clock, SystemClock};
use super::credentials::{ApiKey, CredentialRegistry};
use super::failover::{CallState, ChainSuccess, FailoverPolicy, Route, RouteTarget, run_chain};
use super::http::{DEFAULT_TIMEOUT, build_client};
use super::options::RequestOptions;
use super::provider::ProviderId;
use super::rate_limit::{RateLimitPolicy, RateLimiter};
use super::resources::{
    DEFAULT_RESOURCE_TTL, DEFAULT_SWEEP_INTERVAL, ResourceArena, TrackedResource,
};
use super::sanitize::{sanitize_image_options, sanitize_input, sanitize_options, sanitize_output};
use super::validate::{Payload, validate};
use crate::error::{GatewayError, Result};
use crate::providers::{
    AdapterContext, ImageProvider, SpeechProvider, TextProvider, TranscriptionProvider,
};

// =============================================================================
// Configuration
// =============================================================================

/// Everything the router needs besides credentials and a clock.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub text: Vec<Route<TextProvider>>,
    pub image: Vec<Route<ImageProvider>>,
    pub speech: Vec<Route<SpeechProvider>>,
    pub transcription: Vec<Route<TranscriptionProvider>>,
    /// Per-capability quotas; missing entries use the built-in defaults.
    pub rate_limits: HashMap<Capability, RateLimitPolicy>,
    pub failover: FailoverPolicy,
    /// Deadline for calls that do not pass `timeoutMs`.
    pub default_timeout: Duration,
    /// Per-provider API base URL overrides.
    pub base_urls: HashMap<ProviderId, String>,
    pub resource_ttl: Duration,
    pub sweep_interval: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            text: TextProvider::DEFAULT_ORDER.iter().map(|&p| Route::new(p)).collect(),
            image: ImageProvider::DEFAULT_ORDER.iter().map(|&p| Route::new(p)).collect(),
            speech: SpeechProvider::DEFAULT_ORDER.iter().map(|&p| Route::new(p)).collect(),
            transcription: TranscriptionProvider::DEFAULT_ORDER
                .iter()
                .map(|&p| Route::new(p))
                .collect(),
            rate_limits: HashMap::new(),
            failover: FailoverPolicy::default(),
            default_timeout: DEFAULT_TIMEOUT,
            base_urls: HashMap::new(),
            resource_ttl: DEFAULT_RESOURCE_TTL,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl RouterConfig {
    /// Point every provider at the same base URL (used against mock servers).
    #[must_use]
    pub fn with_base_url_for_all(mut self, base_url: &str) -> Self {
        for &provider in ProviderId::ALL {
            self.base_urls.insert(provider, base_url.to_string());
        }
        self
    }

    /// Base URL for a provider family.
    #[must_use]
    pub fn base_url(&self, provider: ProviderId) -> &str {
        self.base_urls
            .get(&provider)
            .map_or_else(|| provider.default_base_url(), String::as_str)
    }

    /// Route labels for a capability, in priority order.
    #[must_use]
    pub fn route_labels(&self, capability: Capability) -> Vec<(String, ProviderId)> {
        fn labels<P: RouteTarget>(routes: &[Route<P>]) -> Vec<(String, ProviderId)> {
            routes
                .iter()
                .map(|r| (r.label(), r.provider.family()))
                .collect()
        }
        match capability {
            Capability::Text => labels(&self.text),
            Capability::Image => labels(&self.image),
            Capability::TextToSpeech => labels(&self.speech),
            Capability::SpeechToText => labels(&self.transcription),
        }
    }
}

// =============================================================================
// Outputs
// =============================================================================

/// Normalized result of [`Router::execute`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum RouterOutput {
    Text(String),
    Image(String),
    Speech(TrackedResource),
    Transcript(String),
}

/// One route's configuration state.
#[derive(Debug, Clone, Serialize)]
pub struct RouteStatus {
    pub route: String,
    pub provider: ProviderId,
    pub configured: bool,
    pub state: &'static str,
}

/// A capability's routing and quota state.
#[derive(Debug, Clone, Serialize)]
pub struct CapabilityStatus {
    pub capability: Capability,
    pub routes: Vec<RouteStatus>,
    pub rate_limit: RateLimitPolicy,
    pub remaining: u32,
}

// =============================================================================
// Router
// =============================================================================

/// Multi-capability AI service router.
#[derive(Debug)]
pub struct Router {
    config: RouterConfig,
    credentials: CredentialRegistry,
    limiter: RateLimiter,
    resources: Arc<ResourceArena>,
    client: Client,
}

impl Router {
    /// Build a router on the wall clock.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: RouterConfig, credentials: CredentialRegistry) -> Result<Self> {
        Self::with_clock(config, credentials, Arc::new(SystemClock))
    }

    /// Build a router with an injected clock.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn with_clock(
        config: RouterConfig,
        credentials: CredentialRegistry,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let limiter = RateLimiter::new(&config.rate_limits, Arc::clone(&clock));
        let resources = Arc::new(ResourceArena::new(config.resource_ttl, clock));
        let configured = credentials.configured();
        tracing::debug!(
            configured = ?configured.iter().map(|p| p.cli_name()).collect::<Vec<_>>(),
            "Router initialized"
        );
        Ok(Self {
            config,
            credentials,
            limiter,
            resources,
            client: build_client()?,
        })
    }

    /// Router configuration.
    #[must_use]
    pub const fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Shared resource arena.
    #[must_use]
    pub const fn resources(&self) -> &Arc<ResourceArena> {
        &self.resources
    }

    /// Start the background expiry sweeper at the configured interval.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        self.resources.spawn_sweeper(self.config.sweep_interval)
    }

    fn context<'a>(&'a self, provider: ProviderId, key: &'a ApiKey) -> AdapterContext<'a> {
        AdapterContext {
            client: &self.client,
            base_url: self.config.base_url(provider),
            key,
            resources: &self.resources,
        }
    }

    // -------------------------------------------------------------------------
    // Public operations
    // -------------------------------------------------------------------------

    /// Generate text for `prompt`.
    ///
    /// # Errors
    ///
    /// Validation, configuration, rate-limit or aggregated provider errors.
    pub async fn generate_text(&self, prompt: &str, options: &RequestOptions) -> Result<String> {
        Ok(self.route_text(prompt, options).await?.value)
    }

    /// Generate an image; returns a URL or an inline `data:` URI.
    ///
    /// # Errors
    ///
    /// Validation, configuration, rate-limit or aggregated provider errors.
    pub async fn generate_image(&self, prompt: &str, options: &RequestOptions) -> Result<String> {
        Ok(self.route_image(prompt, options).await?.value)
    }

    /// Synthesize speech. The returned resource must be released (or left to
    /// expire).
    ///
    /// # Errors
    ///
    /// Validation, configuration, rate-limit or aggregated provider errors.
    pub async fn text_to_speech(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<TrackedResource> {
        Ok(self.route_speech(text, options).await?.value)
    }

    /// Transcribe audio.
    ///
    /// # Errors
    ///
    /// Validation, configuration, rate-limit or aggregated provider errors.
    pub async fn speech_to_text(&self, audio: &[u8], options: &RequestOptions) -> Result<String> {
        Ok(self.route_transcription(audio, options).await?.value)
    }

    /// Capability-generic entry point.
    ///
    /// # Errors
    ///
    /// Validation, configuration, rate-limit or aggregated provider errors.
    pub async fn execute(
        &self,
        capability: Capability,
        payload: Payload<'_>,
        options: &RequestOptions,
    ) -> Result<RouterOutput> {
        Ok(self.execute_routed(capability, payload, options).await?.value)
    }

    /// Like [`execute`](Self::execute) but also reports which route answered
    /// and what happened to every route before it.
    ///
    /// # Errors
    ///
    /// Validation, configuration, rate-limit or aggregated provider errors.
    pub async fn execute_routed(
        &self,
        capability: Capability,
        payload: Payload<'_>,
        options: &RequestOptions,
    ) -> Result<ChainSuccess<RouterOutput>> {
        match (capability, payload) {
            (Capability::Text, Payload::Text(prompt)) => Ok(map_value(
                self.route_text(prompt, options).await?,
                RouterOutput::Text,
            )),
            (Capability::Image, Payload::Text(prompt)) => Ok(map_value(
                self.route_image(prompt, options).await?,
                RouterOutput::Image,
            )),
            (Capability::TextToSpeech, Payload::Text(text)) => Ok(map_value(
                self.route_speech(text, options).await?,
                RouterOutput::Speech,
            )),
            (Capability::SpeechToText, Payload::Audio(audio)) => Ok(map_value(
                self.route_transcription(audio, options).await?,
                RouterOutput::Transcript,
            )),
            (capability, payload) => {
                // Validation always rejects a payload of the wrong kind.
                self.reject(capability, Some(payload), options)?;
                Err(GatewayError::validation(
                    capability,
                    "payload kind does not match capability",
                ))
            }
        }
    }

    /// Release a speech resource. Returns `false` if it was already released.
    pub fn release(&self, resource: &TrackedResource) -> bool {
        self.resources.release(resource)
    }

    /// Release every live resource.
    pub fn release_all(&self) -> usize {
        self.resources.release_all()
    }

    /// Audio bytes of a live speech resource.
    #[must_use]
    pub fn audio(&self, resource: &TrackedResource) -> Option<Arc<[u8]>> {
        self.resources.get(resource)
    }

    /// Routing, credential and quota state per capability.
    #[must_use]
    pub fn provider_status(&self) -> Vec<CapabilityStatus> {
        Capability::ALL
            .iter()
            .map(|&capability| CapabilityStatus {
                capability,
                routes: self
                    .config
                    .route_labels(capability)
                    .into_iter()
                    .map(|(route, provider)| {
                        let state = self.credentials.state(provider);
                        RouteStatus {
                            route,
                            provider,
                            configured: self.credentials.is_configured(provider),
                            state: state.as_str(),
                        }
                    })
                    .collect(),
                rate_limit: self.limiter.policy(capability),
                remaining: self.limiter.remaining(capability),
            })
            .collect()
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    /// Validation result as an error, or `Ok(())` if the payload is fine.
    fn reject(
        &self,
        capability: Capability,
        payload: Option<Payload<'_>>,
        options: &RequestOptions,
    ) -> Result<()> {
        let result = validate(capability, payload, options);
        if result.valid {
            return Ok(());
        }
        let message = result.error.unwrap_or_else(|| "invalid request".to_string());
        tracing::debug!(
            capability = %capability.as_str(),
            state = %CallState::RejectedEarly,
            reason = %message,
            "Request rejected by validation"
        );
        Err(GatewayError::validation(capability, message))
    }

    /// Steps 1-4: validate, check configuration, admit, sanitize options.
    /// Returns the sanitized options and the call deadline.
    fn admit(
        &self,
        capability: Capability,
        payload: Payload<'_>,
        options: &RequestOptions,
    ) -> Result<(RequestOptions, Duration)> {
        tracing::debug!(capability = %capability.as_str(), state = %CallState::Validating, "Call started");
        self.reject(capability, Some(payload), options)?;

        let routes = self.config.route_labels(capability);
        if !routes.iter().any(|(_, p)| self.credentials.is_configured(*p)) {
            let mut checked: Vec<&str> = Vec::new();
            for (_, provider) in &routes {
                if !checked.contains(&provider.cli_name()) {
                    checked.push(provider.cli_name());
                }
            }
            tracing::debug!(
                capability = %capability.as_str(),
                state = %CallState::RejectedEarly,
                "No configured provider"
            );
            return Err(GatewayError::NoConfiguredProvider {
                capability,
                checked: checked.join(", "),
            });
        }

        tracing::debug!(capability = %capability.as_str(), state = %CallState::RateChecking, "Checking rate limit");
        if !self.limiter.admit(capability) {
            let policy = self.limiter.policy(capability);
            return Err(GatewayError::RateLimited {
                capability,
                max_requests: policy.max_requests,
                window_ms: policy.window_ms,
                retry_after: self.limiter.retry_after(capability),
            });
        }

        tracing::debug!(capability = %capability.as_str(), state = %CallState::Sanitizing, "Sanitizing request");
        let sanitized = if capability == Capability::Image {
            sanitize_image_options(options)
        } else {
            sanitize_options(options)
        };
        let deadline = sanitized
            .timeout_ms
            .map_or(self.config.default_timeout, Duration::from_millis);
        Ok((sanitized, deadline))
    }

    /// Sanitize a text payload; markup-only input is a validation error.
    fn clean_text(capability: Capability, text: &str) -> Result<String> {
        let clean = sanitize_input(text);
        if clean.is_empty() {
            return Err(GatewayError::validation(
                capability,
                "input is empty after removing markup",
            ));
        }
        Ok(clean)
    }

    async fn route_text(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<ChainSuccess<String>> {
        let capability = Capability::Text;
        let (options, deadline) = self.admit(capability, Payload::Text(prompt), options)?;
        let prompt = Self::clean_text(capability, prompt)?;

        let router = self;
        let (prompt, options) = (prompt.as_str(), &options);
        let success = run_chain(
            capability,
            &self.config.text,
            &self.credentials,
            &self.config.failover,
            deadline,
            move |route, key| async move {
                let ctx = router.context(route.provider.family(), &key);
                route
                    .provider
                    .generate(&ctx, prompt, options, route.model.as_deref())
                    .await
            },
        )
        .await?;
        Ok(finish(capability, map_value(success, |text| sanitize_output(&text))))
    }

    async fn route_image(
        &self,
        prompt: &str,
        options: &RequestOptions,
    ) -> Result<ChainSuccess<String>> {
        let capability = Capability::Image;
        let (options, deadline) = self.admit(capability, Payload::Text(prompt), options)?;
        let prompt = Self::clean_text(capability, prompt)?;

        let router = self;
        let (prompt, options) = (prompt.as_str(), &options);
        let success = run_chain(
            capability,
            &self.config.image,
            &self.credentials,
            &self.config.failover,
            deadline,
            move |route, key| async move {
                let ctx = router.context(route.provider.family(), &key);
                route
                    .provider
                    .generate(&ctx, prompt, options, route.model.as_deref())
                    .await
            },
        )
        .await?;
        Ok(finish(capability, map_value(success, |image| sanitize_output(&image))))
    }

    async fn route_speech(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<ChainSuccess<TrackedResource>> {
        let capability = Capability::TextToSpeech;
        let (options, deadline) = self.admit(capability, Payload::Text(text), options)?;
        let text = Self::clean_text(capability, text)?;

        let router = self;
        let (text, options) = (text.as_str(), &options);
        let success = run_chain(
            capability,
            &self.config.speech,
            &self.credentials,
            &self.config.failover,
            deadline,
            move |route, key| async move {
                let ctx = router.context(route.provider.family(), &key);
                route
                    .provider
                    .synthesize(&ctx, text, options, route.model.as_deref())
                    .await
            },
        )
        .await?;
        Ok(finish(capability, success))
    }

    async fn route_transcription(
        &self,
        audio: &[u8],
        options: &RequestOptions,
    ) -> Result<ChainSuccess<String>> {
        let capability = Capability::SpeechToText;
        let (options, deadline) = self.admit(capability, Payload::Audio(audio), options)?;

        let router = self;
        let options = &options;
        let success = run_chain(
            capability,
            &self.config.transcription,
            &self.credentials,
            &self.config.failover,
            deadline,
            move |route, key| async move {
                let ctx = router.context(route.provider.family(), &key);
                route
                    .provider
                    .transcribe(&ctx, audio, options, route.model.as_deref())
                    .await
            },
        )
        .await?;
        Ok(finish(capability, map_value(success, |text| sanitize_output(&text))))
    }
}

fn map_value<T, U>(success: ChainSuccess<T>, f: impl FnOnce(T) -> U) -> ChainSuccess<U> {
    ChainSuccess {
        value: f(success.value),
        route: success.route,
        attempts: success.attempts,
    }
}

fn finish<T>(capability: Capability, success: ChainSuccess<T>) -> ChainSuccess<T> {
    tracing::info!(
        capability = %capability.as_str(),
        provider = %success.route,
        attempts = success.attempts.len(),
        state = %CallState::Succeeded,
        "Request completed"
    );
    success
}
