//! Routing core: request validation, rate limiting, failover and resource tracking.

pub mod capability;
pub mod clock;
pub mod credentials;
pub mod failover;
pub mod http;
pub mod logging;
pub mod options;
pub mod provider;
pub mod rate_limit;
pub mod resources;
pub mod router;
pub mod sanitize;
pub mod validate;

pub use capability::Capability;
pub use clock::{Clock, ManualClock, SystemClock};
pub use credentials::{ApiKey, CredentialRegistry, CredentialState};
pub use failover::{
    AttemptOutcome, CallState, ChainSuccess, FailoverPolicy, ProviderAttempt, Route, RouteTarget,
    SkipReason,
};
pub use options::RequestOptions;
pub use provider::ProviderId;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
pub use resources::{ResourceArena, ResourceId, TrackedResource};
pub use router::{CapabilityStatus, RouteStatus, Router, RouterConfig, RouterOutput};
pub use validate::{Payload, ValidationResult, validate};
