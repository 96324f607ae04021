//! State-driven toggle orchestration.
//!
//! The direction of a toggle is never taken from the caller: the current
//! lock state is fetched fresh and the opposite command is issued. Repeated
//! invocations are convergent (press again to reverse), and a single
//! invocation is never ambiguous about its direction because it derives
//! from freshly observed truth.

use crate::domain::error::UpstreamError;
use crate::vehicle::{LockState, VehicleClient};
use std::sync::Arc;
use tracing::debug;

pub struct ToggleOrchestrator {
    client: Arc<dyn VehicleClient>,
}

impl ToggleOrchestrator {
    pub fn new(client: Arc<dyn VehicleClient>) -> Self {
        Self { client }
    }

    /// Fetch the current lock state and command the opposite.
    ///
    /// Returns the state the vehicle is in after the command. The caller is
    /// responsible for recording the success with the replay guard; this
    /// orchestrator has no knowledge of caller identity.
    pub async fn toggle(&self, vehicle_id: &str) -> Result<LockState, UpstreamError> {
        let current = self.client.lock_state(vehicle_id).await?;
        let action = current.reversal();
        debug!(?current, ?action, "toggling vehicle lock");
        self.client.send_command(vehicle_id, action).await?;
        Ok(action.resulting_state())
    }
}
