//! Scaler watcher.
//!
//! Runs `kube_runtime::Controller` over `Scaler` objects and hands each
//! reconcile to the engine. Requeue decisions follow the engine's result:
//!
//! - success: the requeue the pipeline asked for, otherwise wait for a change
//! - recoverable failure: retry after the error requeue interval
//! - critical failure: per-Scaler Fibonacci backoff

use crate::backoff::BackoffTracker;
use crate::error::ControllerError;
use crate::metrics::Metrics;
use chrono::Utc;
use crds::Scaler;
use futures::StreamExt;
use kube::Api;
use kube_runtime::{controller::{Action, Config as RuntimeConfig}, watcher, Controller};
use scaler_engine::{ScalerEngine, ScalerKey};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// State shared by every reconcile
pub struct WatchContext {
    pub engine: ScalerEngine,
    pub metrics: Metrics,
    pub backoff: BackoffTracker,
    /// Parent of every reconcile's cancellation token
    pub shutdown: CancellationToken,
}

/// Requeue for a completed reconcile
fn action_for(requeue_after: Option<Duration>) -> Action {
    match requeue_after {
        Some(delay) => Action::requeue(delay),
        None => Action::await_change(),
    }
}

async fn reconcile(scaler: Arc<Scaler>, ctx: Arc<WatchContext>) -> Result<Action, ControllerError> {
    let key = ScalerKey::from_scaler(&scaler);
    let started = Instant::now();
    debug!("Reconciling Scaler {}", key);

    match ctx
        .engine
        .reconcile(key.clone(), Utc::now(), ctx.shutdown.child_token())
        .await
    {
        Ok(outcome) => {
            ctx.metrics.record_success(&outcome, started.elapsed());
            ctx.backoff.on_success(&key);
            Ok(action_for(outcome.requeue_after))
        }
        Err(e) => {
            ctx.metrics.record_failure(&e, started.elapsed());
            Err(ControllerError::Reconcile(e))
        }
    }
}

fn error_policy(scaler: Arc<Scaler>, error: &ControllerError, ctx: Arc<WatchContext>) -> Action {
    let key = ScalerKey::from_scaler(&scaler);
    match error {
        ControllerError::Reconcile(e) if e.is_recoverable() => {
            let delay = ctx.engine.config().error_requeue;
            warn!("Reconcile of {} failed ({}), retrying in {:?}", key, e, delay);
            Action::requeue(delay)
        }
        _ => {
            let delay = ctx.backoff.on_failure(&key);
            error!("Reconcile of {} failed ({}), backing off for {:?}", key, error, delay);
            Action::requeue(delay)
        }
    }
}

/// Watch Scalers until shutdown; `ready` is raised once the watch starts.
pub async fn watch_scalers(
    api: Api<Scaler>,
    ctx: Arc<WatchContext>,
    ready: Arc<AtomicBool>,
) -> Result<(), ControllerError> {
    info!("Starting Scaler watcher");

    // Debounce batches bursts of events (including our own status writes)
    let config = RuntimeConfig::default()
        .debounce(Duration::from_secs(5))
        .concurrency(3);

    ready.store(true, Ordering::SeqCst);
    Controller::new(api, watcher::Config::default())
        .with_config(config)
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((object, _)) => debug!("Reconciled Scaler {}", object.name),
                Err(e) => warn!("Scaler controller error: {}", e),
            }
        })
        .await;

    ready.store(false, Ordering::SeqCst);
    info!("Scaler watcher stopped");
    Ok(())
}
