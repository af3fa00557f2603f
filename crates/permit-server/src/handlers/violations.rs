//! Handlers for violations: issued by officers against a vehicle, settled by
//! administrators.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use permit_core::{
  pagination::Page,
  store::PermitStore,
  violation::{NewViolation, Violation, ViolationFilter, ViolationStatus},
};
use permit_engine::PageParams;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{AccountSession, OfficerSession, Session},
  error::Error,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
  pub status:     Option<ViolationStatus>,
  pub vehicle_id: Option<String>,
  pub officer_id: Option<Uuid>,
  pub page:       Option<u32>,
  pub limit:      Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PayBody {
  #[serde(default)]
  pub comment: Option<String>,
}

/// `POST /vehicles/{id}/violations`
pub async fn issue<S>(
  State(state): State<AppState<S>>,
  OfficerSession(officer): OfficerSession,
  Path(vehicle_id): Path<String>,
  Json(body): Json<NewViolation>,
) -> Result<impl IntoResponse, Error>
where
  S: PermitStore + 'static,
{
  let violation = state
    .engine
    .issue_violation(&officer, &vehicle_id, body)
    .await?;
  Ok((StatusCode::CREATED, Json(violation)))
}

/// `GET /violations`. Operators must pass `vehicle_id` for a vehicle they
/// own; officers see their own.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  Session(actor): Session,
  Query(q): Query<ListQuery>,
) -> Result<Json<Page<Violation>>, Error>
where
  S: PermitStore + 'static,
{
  let filter = ViolationFilter {
    status:     q.status,
    vehicle_id: q.vehicle_id,
    officer_id: q.officer_id,
  };
  let params = PageParams { page: q.page, limit: q.limit };
  Ok(Json(state.engine.list_violations(&actor, filter, params).await?))
}

/// `GET /violations/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Session(actor): Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Violation>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.get_violation(&actor, id).await?))
}

/// `POST /violations/{id}/pay` with body `{"comment":…}`, may be `{}`.
pub async fn pay<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<Uuid>,
  Json(body): Json<PayBody>,
) -> Result<Json<Violation>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.pay_violation(&actor, id, body.comment).await?))
}
