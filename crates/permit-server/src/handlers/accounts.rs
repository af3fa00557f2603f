//! Handlers for `/accounts` and `/officers` endpoints. Administrators only,
//! except that a principal may read its own record.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use permit_core::{
  pagination::Page,
  principal::{Principal, PrincipalStatus, Role},
  store::PermitStore,
};
use permit_engine::{NewOfficer, PageParams};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState,
  auth::{AccountSession, Session},
  error::Error,
};

#[derive(Debug, Deserialize)]
pub struct AccountsQuery {
  pub role:   Option<Role>,
  pub status: Option<PrincipalStatus>,
  pub search: Option<String>,
  pub page:   Option<u32>,
  pub limit:  Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct OfficersQuery {
  pub status: Option<PrincipalStatus>,
  pub search: Option<String>,
  pub page:   Option<u32>,
  pub limit:  Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PrincipalStatusBody {
  pub status: PrincipalStatus,
}

/// `GET /accounts[?role=&status=&search=&page=&limit=]`
pub async fn list_accounts<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Query(q): Query<AccountsQuery>,
) -> Result<Json<Page<Principal>>, Error>
where
  S: PermitStore + 'static,
{
  let params = PageParams { page: q.page, limit: q.limit };
  let page = state
    .engine
    .list_accounts(&actor, q.role, q.status, q.search, params)
    .await?;
  Ok(Json(page))
}

/// `GET /accounts/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<Uuid>,
) -> Result<Json<Principal>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.get_principal(&actor, id).await?))
}

/// `GET /officers/{id}`, readable by the officer themself.
pub async fn get_officer<S>(
  State(state): State<AppState<S>>,
  Session(actor): Session,
  Path(id): Path<Uuid>,
) -> Result<Json<Principal>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.get_principal(&actor, id).await?))
}

/// `PUT /accounts/{id}/status` and `PUT /officers/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<Uuid>,
  Json(body): Json<PrincipalStatusBody>,
) -> Result<Json<Principal>, Error>
where
  S: PermitStore + 'static,
{
  let principal = state
    .engine
    .set_principal_status(&actor, id, body.status)
    .await?;
  Ok(Json(principal))
}

/// `GET /officers[?status=&search=&page=&limit=]`
pub async fn list_officers<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Query(q): Query<OfficersQuery>,
) -> Result<Json<Page<Principal>>, Error>
where
  S: PermitStore + 'static,
{
  let params = PageParams { page: q.page, limit: q.limit };
  let page = state
    .engine
    .list_officers(&actor, q.status, q.search, params)
    .await?;
  Ok(Json(page))
}

/// `POST /officers`: returns 201 + the officer with its badge number.
pub async fn create_officer<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Json(body): Json<NewOfficer>,
) -> Result<impl IntoResponse, Error>
where
  S: PermitStore + 'static,
{
  let officer = state.engine.create_officer(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(officer)))
}
