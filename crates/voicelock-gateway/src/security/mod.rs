//! Request authentication, caller authorization, and abuse prevention.

pub mod abuse;
pub mod authorizer;
pub mod clock;
pub mod signature;

pub use abuse::{AbuseGuard, RateDecision, RateLimiter, ReplayDecision, ReplayGuard};
pub use authorizer::CallerAuthorizer;
pub use clock::{Clock, ManualClock, SystemClock};
pub use signature::SignatureContext;
