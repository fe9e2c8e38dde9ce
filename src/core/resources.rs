//! Arena for locally held binary artifacts (synthesized audio).
//!
//! Adapters `track` bytes and hand back a [`TrackedResource`] handle. Each
//! entry is released exactly once: by an explicit `release`, a `release_all`,
//! or a `sweep` after its expiry horizon. Released entries are removed from
//! the arena, so any later release or lookup is a no-op.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::Serialize;
use tokio::task::JoinHandle;

use super::clock::Clock;

/// Default lifetime of a tracked resource.
pub const DEFAULT_RESOURCE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default interval of the background sweeper.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Opaque resource identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ResourceId(u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res-{:06}", self.0)
    }
}

/// Handle to a tracked artifact. Holding a handle does not keep the bytes
/// alive; once released, lookups return `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedResource {
    pub id: ResourceId,
    pub content_type: String,
    pub len: usize,
    pub created_at_ms: u64,
    pub expires_at_ms: u64,
}

/// Why an entry left the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReleaseReason {
    Explicit,
    All,
    Expired,
}

impl ReleaseReason {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::All => "release_all",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug)]
struct Entry {
    bytes: Arc<[u8]>,
    content_type: String,
    expires_at_ms: u64,
}

/// Resource arena shared by the router and its adapters.
#[derive(Debug)]
pub struct ResourceArena {
    entries: Mutex<HashMap<ResourceId, Entry>>,
    next_id: AtomicU64,
    ttl_ms: u64,
    clock: Arc<dyn Clock>,
}

impl ResourceArena {
    /// Create an arena whose entries expire `ttl` after creation.
    #[must_use]
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            ttl_ms: u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX),
            clock,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ResourceId, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take ownership of `bytes` and return a handle.
    pub fn track(&self, bytes: impl Into<Arc<[u8]>>, content_type: &str) -> TrackedResource {
        let bytes = bytes.into();
        let id = ResourceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let created_at_ms = self.clock.now_ms();
        let expires_at_ms = created_at_ms.saturating_add(self.ttl_ms);
        let resource = TrackedResource {
            id,
            content_type: content_type.to_string(),
            len: bytes.len(),
            created_at_ms,
            expires_at_ms,
        };
        self.lock().insert(
            id,
            Entry {
                bytes,
                content_type: resource.content_type.clone(),
                expires_at_ms,
            },
        );
        tracing::debug!(
            resource = %id,
            content_type,
            len = resource.len,
            expires_at_ms,
            "Tracked resource"
        );
        resource
    }

    /// The artifact bytes, if the resource has not been released.
    #[must_use]
    pub fn get(&self, resource: &TrackedResource) -> Option<Arc<[u8]>> {
        self.lock().get(&resource.id).map(|e| Arc::clone(&e.bytes))
    }

    /// Whether the resource has been released.
    #[must_use]
    pub fn is_released(&self, resource: &TrackedResource) -> bool {
        !self.lock().contains_key(&resource.id)
    }

    /// Inline `data:` URI of a live resource.
    #[must_use]
    pub fn to_data_uri(&self, resource: &TrackedResource) -> Option<String> {
        let entries = self.lock();
        let entry = entries.get(&resource.id)?;
        Some(format!(
            "data:{};base64,{}",
            entry.content_type,
            STANDARD.encode(&entry.bytes)
        ))
    }

    /// Release a resource. Returns `false` if it was already released.
    pub fn release(&self, resource: &TrackedResource) -> bool {
        let removed = self.lock().remove(&resource.id).is_some();
        if removed {
            log_release(resource.id, ReleaseReason::Explicit);
        }
        removed
    }

    /// Release every live resource. Returns how many were released.
    pub fn release_all(&self) -> usize {
        let drained: Vec<ResourceId> = self.lock().drain().map(|(id, _)| id).collect();
        for id in &drained {
            log_release(*id, ReleaseReason::All);
        }
        drained.len()
    }

    /// Release every entry whose expiry is at or before `now_ms`.
    pub fn sweep(&self, now_ms: u64) -> usize {
        let mut expired = Vec::new();
        self.lock().retain(|id, entry| {
            let keep = entry.expires_at_ms > now_ms;
            if !keep {
                expired.push(*id);
            }
            keep
        });
        for id in &expired {
            log_release(*id, ReleaseReason::Expired);
        }
        expired.len()
    }

    /// [`sweep`](Self::sweep) at the arena clock's current time.
    pub fn sweep_expired(&self) -> usize {
        self.sweep(self.clock.now_ms())
    }

    /// Number of live resources.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.lock().len()
    }

    /// Spawn a background task that sweeps expired entries every `interval`.
    ///
    /// The task holds only a weak reference and exits once the arena is
    /// dropped. It is not tied to any caller's lifetime.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let arena: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(arena) = arena.upgrade() else {
                    tracing::debug!("Resource arena dropped, sweeper exiting");
                    break;
                };
                let released = arena.sweep_expired();
                if released > 0 {
                    tracing::debug!(released, "Swept expired resources");
                }
            }
        })
    }
}

fn log_release(id: ResourceId, reason: ReleaseReason) {
    tracing::debug!(resource = %id, reason = reason.as_str(), "Released resource");
}
