//! Stage pipeline
//!
//! A [`HandlerChain`] runs its stages in order. Each stage takes ownership of
//! the context and hands it back inside a [`Flow`]:
//!
//! - `Flow::Continue(ctx)`: run the next stage
//! - `Flow::Stop(ctx)`: end the cycle cleanly (the stage's requeue stands)
//! - `Err(ReconcileError)`: end the cycle with a failure
//!
//! The chain alone decides whether the next stage runs.

use crate::context::ReconcileContext;
use crate::error::ReconcileError;
use std::time::Duration;
use tracing::{debug, warn};

/// Decision returned by a stage
#[derive(Debug)]
pub enum Flow {
    Continue(ReconcileContext),
    Stop(ReconcileContext),
}

/// One step of the reconcile pipeline
#[async_trait::async_trait]
pub trait Stage: Send + Sync {
    /// Stage name for logs
    fn name(&self) -> &'static str;

    async fn execute(&self, ctx: ReconcileContext) -> Result<Flow, ReconcileError>;
}

/// Result of a chain execution that did not fail
#[derive(Debug)]
pub struct ChainResult {
    /// Context as left by the last stage that ran
    pub context: ReconcileContext,
    /// Stage that ended the cycle early, if any
    pub stopped_by: Option<&'static str>,
}

impl ChainResult {
    pub fn requeue_after(&self) -> Option<Duration> {
        self.context.requeue_after()
    }
}

/// Ordered list of stages
#[derive(Default)]
pub struct HandlerChain {
    stages: Vec<Box<dyn Stage>>,
}

impl HandlerChain {
    pub fn build(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run the stages in order until one stops or fails.
    pub async fn execute(&self, mut ctx: ReconcileContext) -> Result<ChainResult, ReconcileError> {
        for stage in &self.stages {
            debug!("Running stage {} for {}", stage.name(), ctx.key);
            let key = ctx.key.clone();
            match stage.execute(ctx).await {
                Ok(Flow::Continue(next)) => ctx = next,
                Ok(Flow::Stop(next)) => {
                    debug!(
                        "Stage {} stopped the chain for {} (requeue: {:?})",
                        stage.name(),
                        next.key,
                        next.requeue_after()
                    );
                    return Ok(ChainResult {
                        context: next,
                        stopped_by: Some(stage.name()),
                    });
                }
                Err(e) => {
                    warn!("Stage {} failed for {}: {}", stage.name(), key, e);
                    return Err(e);
                }
            }
        }

        Ok(ChainResult {
            context: ctx,
            stopped_by: None,
        })
    }
}
