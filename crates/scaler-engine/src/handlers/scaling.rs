use crate::chain::{Flow, Stage};
use crate::context::ReconcileContext;
use crate::error::{ReconcileError, ScalerError};
use crate::mutator::build_mutator;
use tracing::{debug, info, warn};

/// Runs the mutator of every configured resource kind.
///
/// Never fails: a kind whose mutator cannot be built or run is recorded as
/// one failure entry (name "*") and the next kind is processed.
#[derive(Default)]
pub struct ScalingStage;

impl ScalingStage {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl Stage for ScalingStage {
    fn name(&self) -> &'static str {
        "scaling"
    }

    async fn execute(&self, mut ctx: ReconcileContext) -> Result<Flow, ReconcileError> {
        let (Some(resolution), Some(resources), Some(handle)) = (&ctx.resolution, &ctx.resources, &ctx.provider) else {
            debug!("No period resolved for {}, nothing to scale", ctx.key);
            return Ok(Flow::Continue(ctx));
        };
        let target = resolution.period.period_type;
        let default_namespace = ctx.key.namespace.clone();

        let mut successful = Vec::new();
        let mut failed = Vec::new();

        for kind in resources.types() {
            let outcome = match build_mutator(handle, resources, kind, &default_namespace) {
                Ok(mutator) => mutator.set_state(target, &ctx.cancel).await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(report) => {
                    debug!(
                        "{} {}: {} succeeded, {} failed",
                        ctx.key,
                        kind,
                        report.successful.len(),
                        report.failed.len()
                    );
                    successful.extend(report.successful);
                    failed.extend(report.failed);
                }
                Err(e) => {
                    warn!("Resource kind {} failed for {}: {}", kind, ctx.key, e);
                    failed.push(kind_failure(kind, &e));
                }
            }
        }

        info!(
            "Scaled {} to {}: {} succeeded, {} failed",
            ctx.key,
            target,
            successful.len(),
            failed.len()
        );
        ctx.success_results.extend(successful);
        ctx.failed_results.extend(failed);
        Ok(Flow::Continue(ctx))
    }
}

fn kind_failure(kind: &str, error: &ScalerError) -> crds::ScalingFailure {
    crds::ScalingFailure {
        kind: kind.to_string(),
        name: "*".to_string(),
        reason: error.to_string(),
    }
}
