use crate::chain::{Flow, Stage};
use crate::context::ReconcileContext;
use crate::error::ReconcileError;
use crate::store::{apply_with_retry, Mutation, ScalerStore};
use std::sync::Arc;
use tracing::{debug, info};

/// Keeps the finalizer marker on live Scalers and detects deletion.
///
/// - live, no marker: add it, continue
/// - deleting, marker present: flag cleanup, continue
/// - deleting, no marker: nothing owed, stop
pub struct FinalizerStage {
    store: Arc<dyn ScalerStore>,
    attempts: u32,
}

impl FinalizerStage {
    pub fn new(store: Arc<dyn ScalerStore>, attempts: u32) -> Self {
        Self { store, attempts }
    }
}

#[async_trait::async_trait]
impl Stage for FinalizerStage {
    fn name(&self) -> &'static str {
        "finalizer"
    }

    async fn execute(&self, mut ctx: ReconcileContext) -> Result<Flow, ReconcileError> {
        let scaler = ctx.scaler()?;

        if scaler.is_deleting() {
            if !scaler.has_finalizer() {
                debug!("{} is being deleted and owes no cleanup", ctx.key);
                return Ok(Flow::Stop(ctx));
            }
            info!("{} is being deleted, finalizing", ctx.key);
            ctx.should_finalize = true;
            return Ok(Flow::Continue(ctx));
        }

        if !scaler.has_finalizer() {
            let updated = apply_with_retry(self.store.as_ref(), scaler, &Mutation::AddFinalizer, self.attempts, &ctx.cancel)
                .await
                .map_err(ReconcileError::recoverable)?;
            info!("Added finalizer to {}", ctx.key);
            ctx.scaler = Some(updated);
        }

        Ok(Flow::Continue(ctx))
    }
}
