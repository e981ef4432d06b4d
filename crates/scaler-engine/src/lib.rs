//! CloudScaler reconciliation engine
//!
//! Decides which period of a `Scaler` is active and drives the selected cloud
//! resources toward the state that period requests.
//!
//! One reconcile runs a fixed pipeline of stages over a [`ReconcileContext`]:
//!
//! ```text
//! Fetch -> Finalizer -> Auth -> Period -> Scaling -> Status
//! ```
//!
//! Each stage returns [`Flow::Continue`] or [`Flow::Stop`], or fails with a
//! [`ReconcileError`] that is either `Critical` (no explicit requeue, the
//! controller's backoff applies) or `Recoverable` (short retry).
//!
//! Provider differences are confined to the [`ProviderConnector`] (Auth stage)
//! and the resource mutators (Scaling stage); everything else is shared.
//!
//! # Example
//!
//! ```no_run
//! use scaler_engine::{EngineConfig, KubeProviderConnector, KubeScalerStore, ScalerEngine, ScalerKey};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = kube::Client::try_default().await?;
//! let engine = ScalerEngine::new(
//!     Arc::new(KubeScalerStore::new(client.clone())),
//!     Arc::new(KubeProviderConnector::new(client)),
//!     EngineConfig::default(),
//! );
//! let key = ScalerKey::new("default", "office-hours");
//! let outcome = engine.reconcile(key, chrono::Utc::now(), CancellationToken::new()).await?;
//! println!("next reconcile in {:?}", outcome.requeue_after);
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod mutator;
pub mod period;
pub mod provider;
pub mod store;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use chain::{ChainResult, Flow, HandlerChain, Stage};
pub use config::EngineConfig;
pub use context::{with_cancel, ReconcileContext, ScalerKey};
pub use engine::{ReconcileOutcome, ScalerEngine};
pub use error::{ReconcileError, ScalerError};
pub use mutator::{build_mutator, ResourceMutator, ScalingReport};
pub use mutator::kubernetes::{KubeWorkloads, Workload, WorkloadApi, WorkloadKind};
pub use period::{default_restore_period, fingerprint, resolve, Period, PeriodError, Resolution};
pub use provider::{KubeProviderConnector, ProviderConnector, ProviderHandle};
pub use store::{KubeScalerStore, Mutation, ScalerStore};

#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockProviderConnector, MockScalerStore, MockWorkloadApi};
