//! Upstream vehicle API client.

mod tessie;

pub use tessie::TessieClient;

use crate::domain::error::UpstreamError;
use async_trait::async_trait;

/// Observed lock state of the vehicle.
///
/// Always fetched fresh before a command decision, never cached across
/// requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockState {
    Locked,
    Unlocked,
}

impl LockState {
    pub fn from_locked(locked: bool) -> Self {
        if locked {
            Self::Locked
        } else {
            Self::Unlocked
        }
    }

    /// Command that reverses this state.
    pub fn reversal(&self) -> LockAction {
        match self {
            Self::Locked => LockAction::Unlock,
            Self::Unlocked => LockAction::Lock,
        }
    }
}

/// Command sent to the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockAction {
    Lock,
    Unlock,
}

impl LockAction {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Lock => "lock",
            Self::Unlock => "unlock",
        }
    }

    /// State the vehicle is in once this command succeeds.
    pub fn resulting_state(&self) -> LockState {
        match self {
            Self::Lock => LockState::Locked,
            Self::Unlock => LockState::Unlocked,
        }
    }
}

/// Port to the upstream vehicle API.
///
/// Calls are not idempotent at the HTTP layer; convergence of the
/// outward-visible action is the orchestrator's job.
#[async_trait]
pub trait VehicleClient: Send + Sync {
    /// Read the vehicle's current lock state.
    async fn lock_state(&self, vehicle_id: &str) -> Result<LockState, UpstreamError>;

    /// Send a lock or unlock command.
    async fn send_command(&self, vehicle_id: &str, action: LockAction)
        -> Result<(), UpstreamError>;
}
