//! The authorize → throttle → act pipeline.
//!
//! Stage order is a hard contract: signature verification strictly precedes
//! the allow-list check, which strictly precedes throttling, which strictly
//! precedes any upstream call. Signature and allow-list rejections happen
//! before the rate limiter, so they never consume quota; every later stage
//! does. No upstream call is made for an unauthenticated or unauthorized
//! request.

use crate::domain::caller::CallerIdentity;
use crate::domain::config::{ConfigError, GatewayConfig};
use crate::domain::error::GatewayError;
use crate::domain::outcome::{AttemptOutcome, AttemptStatus, Reason};
use crate::orchestrator::ToggleOrchestrator;
use crate::security::abuse::{AbuseGuard, RateDecision, ReplayDecision};
use crate::security::authorizer::CallerAuthorizer;
use crate::security::clock::Clock;
use crate::security::signature::{self, SignatureContext};
use crate::vehicle::LockState;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, warn};

/// One inbound call attempt, as handed over by the HTTP layer.
#[derive(Debug, Clone)]
pub struct CallRequest {
    /// Public URL the webhook provider signed against
    pub canonical_url: String,
    /// Decoded form parameters
    pub form_params: BTreeMap<String, String>,
    /// Value of the signature header, if present
    pub signature: Option<String>,
}

/// The voice command security gateway.
pub struct VoiceGateway {
    auth_token: Option<String>,
    authorizer: CallerAuthorizer,
    abuse: AbuseGuard,
    orchestrator: Option<Arc<ToggleOrchestrator>>,
    vehicle_id: Option<String>,
}

impl VoiceGateway {
    /// Wire the pipeline. `orchestrator` is `None` when the vehicle API
    /// token is not configured; attempts then fail at the vehicle stage
    /// with a configuration error instead of at startup.
    pub fn new(
        config: &GatewayConfig,
        clock: Arc<dyn Clock>,
        orchestrator: Option<Arc<ToggleOrchestrator>>,
    ) -> Self {
        Self {
            auth_token: config.security.auth_token.clone(),
            authorizer: CallerAuthorizer::new(config.security.allowed_callers.iter().cloned()),
            abuse: AbuseGuard::new(&config.throttle, clock),
            orchestrator,
            vehicle_id: config.vehicle.vehicle_id.clone(),
        }
    }

    /// Run the full pipeline for one call attempt.
    ///
    /// Always returns a terminal outcome and emits exactly one structured
    /// log record for it.
    pub async fn handle_call(&self, request: CallRequest) -> AttemptOutcome {
        let caller =
            CallerIdentity::normalize(request.form_params.get("From").map(String::as_str));
        let outcome = match self.run_pipeline(&request, caller.as_ref()).await {
            Ok(final_state) => AttemptOutcome::success(final_state),
            Err(err) => outcome_for_error(&err),
        };
        log_attempt(caller.as_ref(), &outcome);
        outcome
    }

    async fn run_pipeline(
        &self,
        request: &CallRequest,
        caller: Option<&CallerIdentity>,
    ) -> Result<LockState, GatewayError> {
        let ctx = SignatureContext {
            canonical_url: &request.canonical_url,
            form_params: &request.form_params,
            provided_signature: request.signature.as_deref(),
            shared_secret: self.auth_token.as_deref(),
        };
        if !signature::verify(&ctx) {
            return Err(GatewayError::Authentication);
        }

        if !self.authorizer.is_allowed(caller) {
            return Err(GatewayError::Authorization);
        }
        // The authorizer rejects absent callers, so identity is present here.
        let Some(caller) = caller else {
            return Err(GatewayError::Authorization);
        };

        // From this point on the attempt consumes quota, even if it fails.
        if let RateDecision::Blocked { retry_after } = self.abuse.check_rate(caller) {
            return Err(GatewayError::RateLimited { retry_after });
        }
        if let ReplayDecision::Blocked { wait } = self.abuse.check_replay(caller) {
            return Err(GatewayError::ReplayWindow { wait });
        }

        let vehicle_id = self
            .vehicle_id
            .as_deref()
            .ok_or(ConfigError::MissingVehicleId)?;
        let orchestrator = self
            .orchestrator
            .as_ref()
            .ok_or(ConfigError::MissingVehicleToken)?;

        let final_state = orchestrator.toggle(vehicle_id).await?;
        self.abuse.mark_success(caller);
        Ok(final_state)
    }
}

fn outcome_for_error(err: &GatewayError) -> AttemptOutcome {
    match err {
        GatewayError::Authentication => AttemptOutcome::blocked(Reason::InvalidSignature),
        GatewayError::Authorization => AttemptOutcome::blocked(Reason::CallerNotAllowed),
        GatewayError::RateLimited { retry_after } => {
            AttemptOutcome::blocked(Reason::RateLimited)
                .with_detail(json!({ "retry_after_ms": retry_after.as_millis() as u64 }))
        }
        GatewayError::ReplayWindow { wait } => AttemptOutcome::blocked(Reason::ReplayWindow)
            .with_detail(json!({ "wait_ms": wait.as_millis() as u64 })),
        GatewayError::Config(config_err) => AttemptOutcome::failed(
            Reason::MissingConfig,
            Some(json!({ "message": config_err.to_string() })),
        ),
        GatewayError::Upstream(upstream) => AttemptOutcome::failed(
            Reason::VehicleError,
            Some(json!({ "message": upstream.to_string() })),
        ),
        GatewayError::Bind(message) => AttemptOutcome::failed(
            Reason::MissingConfig,
            Some(json!({ "message": message })),
        ),
    }
}

/// One structured record per attempt.
fn log_attempt(caller: Option<&CallerIdentity>, outcome: &AttemptOutcome) {
    let caller = caller.map(CallerIdentity::as_str).unwrap_or("unknown");
    match outcome.status {
        AttemptStatus::Success => info!(
            caller,
            status = outcome.status.as_str(),
            reason = outcome.reason.as_str(),
            "call attempt"
        ),
        AttemptStatus::Blocked | AttemptStatus::Failed => warn!(
            caller,
            status = outcome.status.as_str(),
            reason = outcome.reason.as_str(),
            detail = outcome
                .detail
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default(),
            "call attempt"
        ),
    }
}
