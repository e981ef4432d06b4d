use crate::chain::{Flow, Stage};
use crate::context::ReconcileContext;
use crate::error::{ReconcileError, ScalerError};
use crate::store::{apply_with_retry, Mutation, ScalerStore};
use crds::{CurrentPeriod, ScalerStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Persists the scaling outcome, or releases the finalizer when the Scaler
/// is being deleted.
pub struct StatusStage {
    store: Arc<dyn ScalerStore>,
    attempts: u32,
    steady_requeue: Duration,
}

impl StatusStage {
    pub fn new(store: Arc<dyn ScalerStore>, attempts: u32, steady_requeue: Duration) -> Self {
        Self {
            store,
            attempts,
            steady_requeue,
        }
    }
}

/// Status summary for one pass; deterministic for identical results
fn summarize(period: &CurrentPeriod) -> String {
    format!(
        "Period '{}' ({}): {} succeeded, {} failed",
        period.name,
        period.period_type,
        period.successful.len(),
        period.failed.len()
    )
}

#[async_trait::async_trait]
impl Stage for StatusStage {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn execute(&self, mut ctx: ReconcileContext) -> Result<Flow, ReconcileError> {
        let scaler = ctx.scaler()?;

        if ctx.should_finalize {
            apply_with_retry(self.store.as_ref(), scaler, &Mutation::RemoveFinalizer, self.attempts, &ctx.cancel)
                .await
                .map_err(ReconcileError::recoverable)?;
            info!("Released finalizer on {}", ctx.key);
            return Ok(Flow::Stop(ctx));
        }

        let resolution = ctx
            .resolution
            .as_ref()
            .ok_or(ScalerError::MissingState("resolved period"))?;

        let mut current = resolution.next.clone();
        current.successful = ctx.success_results.clone();
        current.failed = ctx.failed_results.clone();
        let status = ScalerStatus {
            comments: Some(summarize(&current)),
            current_period: Some(current),
        };

        let updated = apply_with_retry(self.store.as_ref(), scaler, &Mutation::Status(status), self.attempts, &ctx.cancel)
            .await
            .map_err(ReconcileError::recoverable)?;
        debug!("Persisted status for {}", ctx.key);

        ctx.scaler = Some(updated);
        ctx.request_requeue(self.steady_requeue);
        Ok(Flow::Continue(ctx))
    }
}
