//! HTTP handlers

pub mod health;
pub mod catalog;
pub mod predict;
pub mod explain;
pub mod counterfactual;

use guard_core::PredictorResult;

use crate::AppResult;

/// Run a pipeline call on the blocking pool
pub(crate) async fn run_blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> PredictorResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await??)
}
