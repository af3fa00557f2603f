//! Handlers for `/vehicles` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use permit_core::{
  pagination::Page,
  store::PermitStore,
  vehicle::{NewVehicle, Vehicle, VehicleDetailsPatch, VehicleFilter, VehicleSort, VehicleStatus},
};
use permit_engine::PageParams;
use serde::Deserialize;
use uuid::Uuid;

use super::{CommentBody, StatusBody};
use crate::{
  AppState,
  auth::{AccountSession, Session},
  error::Error,
};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
  pub status:   Option<VehicleStatus>,
  pub owner_id: Option<Uuid>,
  /// Case-insensitive substring of the operating route.
  pub route:    Option<String>,
  pub sort:     Option<VehicleSort>,
  pub page:     Option<u32>,
  pub limit:    Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct LookupQuery {
  pub registration: String,
}

/// `GET /vehicles`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Query(q): Query<ListQuery>,
) -> Result<Json<Page<Vehicle>>, Error>
where
  S: PermitStore + 'static,
{
  let filter = VehicleFilter {
    status:   q.status,
    owner_id: q.owner_id,
    route:    q.route,
    sort:     q.sort.unwrap_or_default(),
  };
  let params = PageParams { page: q.page, limit: q.limit };
  Ok(Json(state.engine.list_vehicles(&actor, filter, params).await?))
}

/// `POST /vehicles`: returns 201 + the vehicle with its allocated id.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Json(body): Json<NewVehicle>,
) -> Result<impl IntoResponse, Error>
where
  S: PermitStore + 'static,
{
  let vehicle = state.engine.register_vehicle(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(vehicle)))
}

/// `GET /vehicles/lookup?registration=ABC 1234`, for officers and administrators.
pub async fn lookup<S>(
  State(state): State<AppState<S>>,
  Session(actor): Session,
  Query(q): Query<LookupQuery>,
) -> Result<Json<Vehicle>, Error>
where
  S: PermitStore + 'static,
{
  let vehicle = state
    .engine
    .find_vehicle_by_registration(&actor, &q.registration)
    .await?;
  Ok(Json(vehicle))
}

/// `GET /vehicles/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
) -> Result<Json<Vehicle>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.get_vehicle(&actor, &id).await?))
}

/// `PATCH /vehicles/{id}`: route, driver, insurer, expiry dates.
pub async fn update_details<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
  Json(patch): Json<VehicleDetailsPatch>,
) -> Result<Json<Vehicle>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.update_vehicle_details(&actor, &id, patch).await?))
}

/// `DELETE /vehicles/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
) -> Result<StatusCode, Error>
where
  S: PermitStore + 'static,
{
  state.engine.delete_vehicle(&actor, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /vehicles/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
  Json(body): Json<StatusBody<VehicleStatus>>,
) -> Result<Json<Vehicle>, Error>
where
  S: PermitStore + 'static,
{
  let vehicle = state
    .engine
    .transition_vehicle(&actor, &id, body.status, body.comment)
    .await?;
  Ok(Json(vehicle))
}

/// `POST /vehicles/{id}/comments`
pub async fn comment<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
  Json(body): Json<CommentBody>,
) -> Result<Json<Vehicle>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.comment_vehicle(&actor, &id, &body.comment).await?))
}

/// `PUT /vehicles/{id}/documents/{slot}`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path((id, slot)): Path<(String, String)>,
  body: Bytes,
) -> Result<Json<Vehicle>, Error>
where
  S: PermitStore + 'static,
{
  let vehicle = state
    .engine
    .attach_vehicle_document(&actor, &*state.files, &id, &slot, body)
    .await?;
  Ok(Json(vehicle))
}
