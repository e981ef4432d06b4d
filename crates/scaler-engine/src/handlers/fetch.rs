use crate::chain::{Flow, Stage};
use crate::context::{with_cancel, ReconcileContext};
use crate::error::{ReconcileError, ScalerError};
use crate::store::ScalerStore;
use std::sync::Arc;
use tracing::debug;

/// Loads the Scaler into the context.
///
/// A missing Scaler is critical; read failures are recoverable.
pub struct FetchStage {
    store: Arc<dyn ScalerStore>,
}

impl FetchStage {
    pub fn new(store: Arc<dyn ScalerStore>) -> Self {
        Self { store }
    }
}

#[async_trait::async_trait]
impl Stage for FetchStage {
    fn name(&self) -> &'static str {
        "fetch"
    }

    async fn execute(&self, mut ctx: ReconcileContext) -> Result<Flow, ReconcileError> {
        let scaler = with_cancel(&ctx.cancel, self.store.get(&ctx.key))
            .await
            .map_err(ReconcileError::recoverable)?
            .ok_or_else(|| ReconcileError::critical(ScalerError::NotFound(ctx.key.to_string())))?;

        debug!(
            "Fetched {} (resourceVersion {:?})",
            ctx.key, scaler.metadata.resource_version
        );
        ctx.scaler = Some(scaler);
        Ok(Flow::Continue(ctx))
    }
}
