use crate::chain::{Flow, Stage};
use crate::context::ReconcileContext;
use crate::error::{ReconcileError, ScalerError};
use crate::period::{resolve, PeriodError};
use std::time::Duration;
use tracing::{debug, info};

/// Resolves the active period and stores it with the resource selection.
///
/// Stops early (without error) when:
/// - a one-shot period already ran: requeue once its window is over
/// - "noaction" follows "noaction": requeue at the steady interval
pub struct PeriodStage {
    steady_requeue: Duration,
    run_once_grace: Duration,
}

impl PeriodStage {
    pub fn new(steady_requeue: Duration, run_once_grace: Duration) -> Self {
        Self {
            steady_requeue,
            run_once_grace,
        }
    }
}

#[async_trait::async_trait]
impl Stage for PeriodStage {
    fn name(&self) -> &'static str {
        "period"
    }

    async fn execute(&self, mut ctx: ReconcileContext) -> Result<Flow, ReconcileError> {
        if ctx.finalize_without_restore() {
            debug!("{} is finalizing without restore, no period applies", ctx.key);
            return Ok(Flow::Continue(ctx));
        }
        if ctx.provider.is_none() {
            return Err(ScalerError::MissingState("provider handle").into());
        }

        let restore_requested = ctx.restore_requested();
        let scaler = ctx.scaler()?;
        let resources = scaler.spec.provider.clone();

        let resolution = match resolve(&scaler.spec.periods, scaler.current_period(), restore_requested, ctx.now) {
            Ok(resolution) => resolution,
            Err(PeriodError::AlreadyRun(period)) => {
                let delay = period.rerun_delay(ctx.now, self.run_once_grace);
                info!(
                    "One-shot period '{}' already ran for {}, next check in {:?}",
                    period.name, ctx.key, delay
                );
                ctx.request_requeue(delay);
                return Ok(Flow::Stop(ctx));
            }
            Err(e) => return Err(ReconcileError::critical(e)),
        };

        if resolution.period_changed() {
            info!(
                "{} entered period '{}' ({}, until {})",
                ctx.key, resolution.period.name, resolution.period.period_type, resolution.period.end_time
            );
        } else {
            debug!(
                "{} remains in period '{}' ({}, until {})",
                ctx.key, resolution.period.name, resolution.period.period_type, resolution.period.end_time
            );
        }

        let steady = resolution.is_noaction_steady_state();
        ctx.resources = Some(resources);
        ctx.resolution = Some(resolution);

        if steady {
            debug!("{} stays in a noaction period, nothing to do", ctx.key);
            ctx.request_requeue(self.steady_requeue);
            return Ok(Flow::Stop(ctx));
        }

        Ok(Flow::Continue(ctx))
    }
}
