//! Per-capability sliding-window rate limiter.
//!
//! Each capability owns a window of admission timestamps behind its own
//! mutex, so the prune/check/push sequence is atomic per capability and two
//! concurrent callers can never both be admitted past the quota. Windows are
//! pruned lazily on each check; there is no background task.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::capability::Capability;
use super::clock::Clock;

/// Quota for one capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitPolicy {
    /// Requests admitted per window. Always > 0.
    pub max_requests: u32,
    /// Window length in milliseconds. Always > 0.
    pub window_ms: u64,
}

impl RateLimitPolicy {
    #[must_use]
    pub const fn new(max_requests: u32, window_ms: u64) -> Self {
        Self {
            max_requests,
            window_ms,
        }
    }

    /// Built-in quota for a capability.
    #[must_use]
    pub const fn default_for(capability: Capability) -> Self {
        match capability {
            Capability::Text => Self::new(50, 60_000),
            Capability::Image => Self::new(10, 60_000),
            Capability::TextToSpeech | Capability::SpeechToText => Self::new(20, 60_000),
        }
    }

    /// Window length as a [`Duration`].
    #[must_use]
    pub const fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }
}

#[derive(Debug)]
struct Window {
    policy: RateLimitPolicy,
    timestamps: Mutex<VecDeque<u64>>,
}

impl Window {
    fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            timestamps: Mutex::new(VecDeque::with_capacity(policy.max_requests as usize)),
        }
    }

    /// Run `f` on the pruned window while holding the lock.
    fn with_pruned<T>(&self, now: u64, f: impl FnOnce(&mut VecDeque<u64>) -> T) -> T {
        let mut timestamps = self
            .timestamps
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Before one full window has elapsed there is nothing to expire.
        if let Some(cutoff) = now.checked_sub(self.policy.window_ms) {
            while timestamps.front().is_some_and(|&t| t <= cutoff) {
                timestamps.pop_front();
            }
        }
        f(&mut timestamps)
    }
}

/// Sliding-window limiter keyed by capability.
#[derive(Debug)]
pub struct RateLimiter {
    windows: HashMap<Capability, Window>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter. Capabilities missing from `policies` use their
    /// built-in defaults.
    #[must_use]
    pub fn new(policies: &HashMap<Capability, RateLimitPolicy>, clock: Arc<dyn Clock>) -> Self {
        let windows = Capability::ALL
            .iter()
            .map(|&cap| {
                let policy = policies
                    .get(&cap)
                    .copied()
                    .unwrap_or_else(|| RateLimitPolicy::default_for(cap));
                (cap, Window::new(policy))
            })
            .collect();
        Self { windows, clock }
    }

    /// Limiter with the built-in policies.
    #[must_use]
    pub fn with_defaults(clock: Arc<dyn Clock>) -> Self {
        Self::new(&HashMap::new(), clock)
    }

    fn window(&self, capability: Capability) -> &Window {
        // Every capability is populated in `new`.
        &self.windows[&capability]
    }

    /// Policy in force for a capability.
    #[must_use]
    pub fn policy(&self, capability: Capability) -> RateLimitPolicy {
        self.window(capability).policy
    }

    /// Admit one request if the window has room. Rejection leaves the window
    /// untouched.
    pub fn admit(&self, capability: Capability) -> bool {
        let window = self.window(capability);
        let now = self.clock.now_ms();
        let max = window.policy.max_requests as usize;
        let admitted = window.with_pruned(now, |timestamps| {
            if timestamps.len() >= max {
                false
            } else {
                timestamps.push_back(now);
                true
            }
        });
        if !admitted {
            tracing::warn!(
                capability = %capability.as_str(),
                max_requests = window.policy.max_requests,
                window_ms = window.policy.window_ms,
                "Rate limit exceeded"
            );
        }
        admitted
    }

    /// Free slots left in the current window.
    #[must_use]
    pub fn remaining(&self, capability: Capability) -> u32 {
        let window = self.window(capability);
        let used = window.with_pruned(self.clock.now_ms(), |t| t.len());
        window
            .policy
            .max_requests
            .saturating_sub(u32::try_from(used).unwrap_or(u32::MAX))
    }

    /// Time until the next slot frees up, or `None` if a request would be
    /// admitted now.
    #[must_use]
    pub fn retry_after(&self, capability: Capability) -> Option<Duration> {
        let window = self.window(capability);
        let now = self.clock.now_ms();
        let max = window.policy.max_requests as usize;
        window.with_pruned(now, |timestamps| {
            if timestamps.len() < max {
                return None;
            }
            timestamps.front().map(|&oldest| {
                let frees_at = oldest + window.policy.window_ms;
                Duration::from_millis(frees_at.saturating_sub(now))
            })
        })
    }
}
