//! Handler for `GET /dashboard`.

use axum::{Json, extract::State};
use permit_core::store::PermitStore;
use permit_engine::DashboardStats;

use crate::{AppState, auth::AccountSession, error::Error};

/// Counts by status for the caller's applications and vehicles; registry
/// totals as well for administrators.
pub async fn stats<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
) -> Result<Json<DashboardStats>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.dashboard_stats(&actor).await?))
}
