use crate::chain::{Flow, Stage};
use crate::context::{with_cancel, ReconcileContext};
use crate::error::ReconcileError;
use crate::provider::ProviderConnector;
use std::sync::Arc;
use tracing::debug;

/// Builds the provider client for the Scaler.
///
/// Skipped when finalizing without restore, since no provider call follows.
pub struct AuthStage {
    connector: Arc<dyn ProviderConnector>,
}

impl AuthStage {
    pub fn new(connector: Arc<dyn ProviderConnector>) -> Self {
        Self { connector }
    }
}

#[async_trait::async_trait]
impl Stage for AuthStage {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn execute(&self, mut ctx: ReconcileContext) -> Result<Flow, ReconcileError> {
        if ctx.finalize_without_restore() {
            debug!("{} is finalizing without restore, skipping auth", ctx.key);
            return Ok(Flow::Continue(ctx));
        }

        let scaler = ctx.scaler()?;
        // Cancellation stays recoverable; everything else fails the cycle.
        let handle = with_cancel(&ctx.cancel, self.connector.connect(scaler)).await?;
        debug!("Connected {} to {}", ctx.key, handle.provider_name());
        ctx.provider = Some(handle);
        Ok(Flow::Continue(ctx))
    }
}
