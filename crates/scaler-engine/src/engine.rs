//! Engine entry point: builds the stage pipeline once and runs it per reconcile.

use crate::chain::HandlerChain;
use crate::config::EngineConfig;
use crate::context::{ReconcileContext, ScalerKey};
use crate::error::ReconcileError;
use crate::handlers::{AuthStage, FetchStage, FinalizerStage, PeriodStage, ScalingStage, StatusStage};
use crate::period::Period;
use crate::provider::ProviderConnector;
use crate::store::ScalerStore;
use chrono::{DateTime, Utc};
use crds::{ScalingFailure, ScalingSuccess};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Result of a reconcile that did not fail
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// When to look at the Scaler again; `None` means only on change
    pub requeue_after: Option<Duration>,
    /// Stage that ended the cycle early
    pub stopped_by: Option<&'static str>,
    /// Period resolved in this cycle
    pub period: Option<Period>,
    pub successful: Vec<ScalingSuccess>,
    pub failed: Vec<ScalingFailure>,
}

/// Scheduled scaling engine for `Scaler` objects
pub struct ScalerEngine {
    chain: HandlerChain,
    config: EngineConfig,
}

impl ScalerEngine {
    pub fn new(store: Arc<dyn ScalerStore>, connector: Arc<dyn ProviderConnector>, config: EngineConfig) -> Self {
        let retries = config.status_update_retries;
        let chain = HandlerChain::build(vec![
            Box::new(FetchStage::new(store.clone())),
            Box::new(FinalizerStage::new(store.clone(), retries)),
            Box::new(AuthStage::new(connector)),
            Box::new(PeriodStage::new(config.steady_requeue, config.run_once_grace)),
            Box::new(ScalingStage::new()),
            Box::new(StatusStage::new(store, retries, config.steady_requeue)),
        ]);
        debug!("Built reconcile pipeline: {:?}", chain.stage_names());
        Self { chain, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stage names in execution order
    pub fn stages(&self) -> Vec<&'static str> {
        self.chain.stage_names()
    }

    /// Run one reconcile cycle for `key`, evaluating periods at `now`.
    pub async fn reconcile(
        &self,
        key: ScalerKey,
        now: DateTime<Utc>,
        cancel: CancellationToken,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let result = self.chain.execute(ReconcileContext::new(key, now, cancel)).await?;
        let requeue_after = result.requeue_after();
        let ctx = result.context;

        info!(
            "Reconciled {}: {} succeeded, {} failed, requeue {:?}",
            ctx.key,
            ctx.success_results.len(),
            ctx.failed_results.len(),
            requeue_after
        );

        Ok(ReconcileOutcome {
            requeue_after,
            stopped_by: result.stopped_by,
            period: ctx.resolution.map(|resolution| resolution.period),
            successful: ctx.success_results,
            failed: ctx.failed_results,
        })
    }
}
