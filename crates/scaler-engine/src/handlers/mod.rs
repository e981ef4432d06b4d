//! Reconcile stages, in execution order:
//!
//! | Stage | Responsibility |
//! |---|---|
//! | [`FetchStage`] | load the Scaler |
//! | [`FinalizerStage`] | keep the finalizer marker, detect deletion |
//! | [`AuthStage`] | build the provider client |
//! | [`PeriodStage`] | resolve the active period |
//! | [`ScalingStage`] | run the resource mutators |
//! | [`StatusStage`] | persist results or release the finalizer |

mod auth;
mod fetch;
mod finalizer;
mod period;
mod scaling;
mod status;


pub use auth::AuthStage;
pub use fetch::FetchStage;
pub use finalizer::FinalizerStage;
pub use period::PeriodStage;
pub use scaling::ScalingStage;
pub use status::StatusStage;
