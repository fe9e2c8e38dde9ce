//! Ordered provider failover.
//!
//! A capability's priority list is a sequence of [`Route`]s. The chain tries
//! them strictly one after another under a per-call deadline and returns the
//! first success. Failures are classified by [`FailureKind`]; the
//! [`FailoverPolicy`] decides which kinds short-circuit the provider family
//! for the rest of the call and which halt the chain outright.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::capability::Capability;
use super::credentials::{ApiKey, CredentialRegistry, CredentialState};
use super::http::with_deadline;
use super::provider::ProviderId;
use crate::error::{FailureKind, GatewayError, ProviderDiagnostic, ProviderFailure, Result};

// =============================================================================
// Routes
// =============================================================================

/// A per-capability provider variant.
pub trait RouteTarget: Copy + fmt::Debug + PartialEq + Send + Sync {
    /// Credential-bearing provider family.
    fn family(self) -> ProviderId;
}

/// One entry of a priority list: a provider plus an optional model override.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route<P> {
    pub provider: P,
    pub model: Option<String>,
}

impl<P: RouteTarget> Route<P> {
    #[must_use]
    pub const fn new(provider: P) -> Self {
        Self {
            provider,
            model: None,
        }
    }

    #[must_use]
    pub fn with_model(provider: P, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: Some(model.into()),
        }
    }

    /// Name used in diagnostics and config (`openai`, `openai:gpt-4o-mini`).
    #[must_use]
    pub fn label(&self) -> String {
        match &self.model {
            Some(model) => format!("{}:{model}", self.provider.family()),
            None => self.provider.family().to_string(),
        }
    }
}

// =============================================================================
// Policy
// =============================================================================

/// Which failure kinds short-circuit a provider family or halt the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailoverPolicy {
    /// Kinds after which later routes of the same family are skipped.
    pub skip_provider_on: HashSet<FailureKind>,
    /// Kinds after which no further route is tried.
    pub halt_on: HashSet<FailureKind>,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            skip_provider_on: HashSet::from([FailureKind::Auth, FailureKind::Quota]),
            halt_on: HashSet::new(),
        }
    }
}

impl FailoverPolicy {
    /// Policy that never short-circuits.
    #[must_use]
    pub fn exhaustive() -> Self {
        Self {
            skip_provider_on: HashSet::new(),
            halt_on: HashSet::new(),
        }
    }
}

// =============================================================================
// Attempts
// =============================================================================

/// Per-call state, logged at each transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallState {
    Validating,
    RateChecking,
    Sanitizing,
    TryingProvider(usize),
    Succeeded,
    Exhausted,
    RejectedEarly,
}

impl fmt::Display for CallState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validating => f.write_str("validating"),
            Self::RateChecking => f.write_str("rate_checking"),
            Self::Sanitizing => f.write_str("sanitizing"),
            Self::TryingProvider(i) => write!(f, "trying_provider({i})"),
            Self::Succeeded => f.write_str("succeeded"),
            Self::Exhausted => f.write_str("exhausted"),
            Self::RejectedEarly => f.write_str("rejected_early"),
        }
    }
}

/// Why a route was not invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// Credential absent or malformed.
    Unconfigured(CredentialState),
    /// The family failed earlier in this call with a short-circuiting kind.
    ShortCircuited(FailureKind),
    /// The chain halted before reaching this route.
    Halted(FailureKind),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconfigured(state) => f.write_str(state.as_str()),
            Self::ShortCircuited(kind) => write!(f, "skipped after earlier {kind} failure"),
            Self::Halted(kind) => write!(f, "not attempted, chain halted on {kind} failure"),
        }
    }
}

/// What happened to one route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    Succeeded,
    Failed(ProviderFailure),
    Skipped(SkipReason),
}

/// Record of one route in a call.
#[derive(Debug, Clone)]
pub struct ProviderAttempt {
    pub route: String,
    pub family: ProviderId,
    pub outcome: AttemptOutcome,
    pub duration_ms: u64,
}

impl ProviderAttempt {
    fn skipped(route: String, family: ProviderId, reason: SkipReason) -> Self {
        Self {
            route,
            family,
            outcome: AttemptOutcome::Skipped(reason),
            duration_ms: 0,
        }
    }

    /// Diagnostic line for the aggregated error.
    #[must_use]
    pub fn diagnostic(&self) -> ProviderDiagnostic {
        let (kind, message) = match &self.outcome {
            AttemptOutcome::Succeeded => (None, "succeeded".to_string()),
            AttemptOutcome::Failed(failure) => (Some(failure.kind()), failure.to_string()),
            AttemptOutcome::Skipped(reason) => (None, reason.to_string()),
        };
        ProviderDiagnostic {
            provider: self.route.clone(),
            kind,
            message,
        }
    }
}

/// A successful chain run.
#[derive(Debug)]
pub struct ChainSuccess<T> {
    pub value: T,
    /// Label of the route that produced `value`.
    pub route: String,
    pub attempts: Vec<ProviderAttempt>,
}

// =============================================================================
// Chain
// =============================================================================

/// Drive `routes` in order until one succeeds.
///
/// `invoke` is called with the route and its usable key, and runs under
/// `deadline`. Routes without a usable key are skipped without a call.
///
/// # Errors
///
/// Returns [`GatewayError::AllProvidersFailed`] with one diagnostic per route
/// once the list is exhausted or halted.
pub async fn run_chain<'a, P, T, F, Fut>(
    capability: Capability,
    routes: &'a [Route<P>],
    credentials: &CredentialRegistry,
    policy: &FailoverPolicy,
    deadline: Duration,
    mut invoke: F,
) -> Result<ChainSuccess<T>>
where
    P: RouteTarget,
    F: FnMut(&'a Route<P>, ApiKey) -> Fut,
    Fut: Future<Output = std::result::Result<T, ProviderFailure>>,
{
    let mut attempts = Vec::with_capacity(routes.len());
    let mut short_circuited: HashMap<ProviderId, FailureKind> = HashMap::new();
    let mut halted: Option<FailureKind> = None;

    for (index, route) in routes.iter().enumerate() {
        let family = route.provider.family();
        let label = route.label();

        if let Some(kind) = halted {
            attempts.push(ProviderAttempt::skipped(label, family, SkipReason::Halted(kind)));
            continue;
        }

        let Some(key) = credentials.usable_key(family) else {
            let state = credentials.state(family);
            tracing::debug!(
                capability = %capability.as_str(),
                provider = %label,
                reason = state.as_str(),
                "Skipping unconfigured provider"
            );
            attempts.push(ProviderAttempt::skipped(label, family, SkipReason::Unconfigured(state)));
            continue;
        };

        if let Some(&kind) = short_circuited.get(&family) {
            tracing::debug!(
                capability = %capability.as_str(),
                provider = %label,
                "Skipping short-circuited provider family"
            );
            attempts.push(ProviderAttempt::skipped(
                label,
                family,
                SkipReason::ShortCircuited(kind),
            ));
            continue;
        }

        tracing::debug!(
            capability = %capability.as_str(),
            provider = %label,
            state = %CallState::TryingProvider(index),
            "Trying provider"
        );

        let start = Instant::now();
        let result = with_deadline(deadline, invoke(route, key.clone())).await;
        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

        match result {
            Ok(value) => {
                tracing::info!(
                    capability = %capability.as_str(),
                    provider = %label,
                    duration_ms,
                    "Provider succeeded"
                );
                attempts.push(ProviderAttempt {
                    route: label.clone(),
                    family,
                    outcome: AttemptOutcome::Succeeded,
                    duration_ms,
                });
                return Ok(ChainSuccess {
                    value,
                    route: label,
                    attempts,
                });
            }
            Err(failure) => {
                let kind = failure.kind();
                tracing::warn!(
                    capability = %capability.as_str(),
                    provider = %label,
                    kind = %kind,
                    error = %failure,
                    duration_ms,
                    "Provider failed"
                );
                if policy.halt_on.contains(&kind) {
                    tracing::debug!(provider = %label, kind = %kind, "Halting failover chain");
                    halted = Some(kind);
                } else if policy.skip_provider_on.contains(&kind) {
                    short_circuited.insert(family, kind);
                }
                attempts.push(ProviderAttempt {
                    route: label,
                    family,
                    outcome: AttemptOutcome::Failed(failure),
                    duration_ms,
                });
            }
        }
    }

    tracing::debug!(
        capability = %capability.as_str(),
        state = %CallState::Exhausted,
        attempted = attempts.len(),
        "Failover chain exhausted"
    );
    Err(GatewayError::AllProvidersFailed {
        capability,
        diagnostics: attempts.iter().map(ProviderAttempt::diagnostic).collect(),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Fake {
        A,
        B,
    }

    impl RouteTarget for Fake {
        fn family(self) -> ProviderId {
            match self {
                Self::A => ProviderId::OpenAi,
                Self::B => ProviderId::Anthropic,
            }
        }
    }

    fn creds() -> CredentialRegistry {
        CredentialRegistry::new()
            .with(ProviderId::OpenAi, "sk-test-openai-000")
            .with(ProviderId::Anthropic, "sk-ant-test-000000")
    }

    const DEADLINE: Duration = Duration::from_secs(30);

    #[tokio::test]
    async fn first_success_wins_and_stops_the_chain() {
        let routes = [Route::new(Fake::A), Route::new(Fake::B)];
        let calls = AtomicUsize::new(0);
        let ok = run_chain(
            Capability::Text,
            &routes,
            &creds(),
            &FailoverPolicy::default(),
            DEADLINE,
            |route, _key| {
                calls.fetch_add(1, Ordering::SeqCst);
                let provider = route.provider;
                async move { Ok::<_, ProviderFailure>(format!("{provider:?}")) }
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.value, "A");
        assert_eq!(ok.route, "openai");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn server_error_advances_to_next_provider() {
        let routes = [Route::new(Fake::A), Route::new(Fake::B)];
        let ok = run_chain(
            Capability::Text,
            &routes,
            &creds(),
            &FailoverPolicy::default(),
            DEADLINE,
            |route, _key| {
                let provider = route.provider;
                async move {
                    match provider {
                        Fake::A => Err(ProviderFailure::Server { status: 503 }),
                        Fake::B => Ok("from b"),
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.value, "from b");
        assert_eq!(ok.attempts.len(), 2);
    }

    #[tokio::test]
    async fn auth_failure_skips_rest_of_family_but_continues() {
        let routes = [
            Route::new(Fake::A),
            Route::with_model(Fake::A, "gpt-4o-mini"),
            Route::new(Fake::B),
        ];
        let calls = AtomicUsize::new(0);
        let ok = run_chain(
            Capability::Text,
            &routes,
            &creds(),
            &FailoverPolicy::default(),
            DEADLINE,
            |route, _key| {
                calls.fetch_add(1, Ordering::SeqCst);
                let provider = route.provider;
                async move {
                    match provider {
                        Fake::A => Err(ProviderFailure::Auth { status: 401 }),
                        Fake::B => Ok("fallback"),
                    }
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.value, "fallback");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            ok.attempts[1].outcome,
            AttemptOutcome::Skipped(SkipReason::ShortCircuited(FailureKind::Auth))
        );
        assert_eq!(ok.attempts[1].route, "openai:gpt-4o-mini");
    }

    #[tokio::test]
    async fn halt_policy_stops_the_chain() {
        let routes = [Route::new(Fake::A), Route::new(Fake::B)];
        let policy = FailoverPolicy {
            skip_provider_on: HashSet::new(),
            halt_on: HashSet::from([FailureKind::Quota]),
        };
        let err = run_chain(
            Capability::Text,
            &routes,
            &creds(),
            &policy,
            DEADLINE,
            |_route, _key| async { Err::<(), _>(ProviderFailure::Quota { status: 429 }) },
        )
        .await
        .unwrap_err();
        let diags = err.diagnostics();
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].kind, Some(FailureKind::Quota));
        assert!(diags[1].message.contains("halted"));
    }

    #[tokio::test]
    async fn unconfigured_providers_are_skipped_without_a_call() {
        let routes = [Route::new(Fake::A), Route::new(Fake::B)];
        let only_b = CredentialRegistry::new().with(ProviderId::Anthropic, "sk-ant-test-000000");
        let calls = AtomicUsize::new(0);
        let ok = run_chain(
            Capability::Text,
            &routes,
            &only_b,
            &FailoverPolicy::default(),
            DEADLINE,
            |_route, key| {
                calls.fetch_add(1, Ordering::SeqCst);
                let fp = key.fingerprint();
                async move { Ok::<_, ProviderFailure>(fp) }
            },
        )
        .await
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            ok.attempts[0].diagnostic().message,
            "not configured"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn slow_provider_times_out_and_next_one_answers() {
        let routes = [Route::new(Fake::A), Route::new(Fake::B)];
        let ok = run_chain(
            Capability::Text,
            &routes,
            &creds(),
            &FailoverPolicy::default(),
            Duration::from_secs(2),
            |route, _key| {
                let provider = route.provider;
                async move {
                    if provider == Fake::A {
                        tokio::time::sleep(Duration::from_secs(60)).await;
                    }
                    Ok::<_, ProviderFailure>(provider)
                }
            },
        )
        .await
        .unwrap();
        assert_eq!(ok.value, Fake::B);
        assert_eq!(
            ok.attempts[0].outcome,
            AttemptOutcome::Failed(ProviderFailure::Timeout { after_ms: 2_000 })
        );
    }

    #[test]
    fn default_policy_short_circuits_auth_and_quota() {
        let policy = FailoverPolicy::default();
        assert!(policy.skip_provider_on.contains(&FailureKind::Auth));
        assert!(policy.skip_provider_on.contains(&FailureKind::Quota));
        assert!(policy.halt_on.is_empty());
        assert!(FailoverPolicy::exhaustive().skip_provider_on.is_empty());
    }
}
