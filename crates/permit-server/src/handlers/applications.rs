//! Handlers for `/applications` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/applications` | `?status`, `owner_id` (admins), `sort`, `page`, `limit` |
//! | `POST` | `/applications` | Body: [`NewApplication`]; returns 201 |
//! | `GET`  | `/applications/{id}` | Owner or administrator |
//! | `DELETE` | `/applications/{id}` | Owner or administrator; 204 |
//! | `PATCH` | `/applications/{id}/fields` | Body: `{"fields":{…},"comment":…}` |
//! | `PUT`  | `/applications/{id}/status` | Body: [`StatusBody`] |
//! | `POST` | `/applications/{id}/comments` | Body: [`CommentBody`] |
//! | `PUT`  | `/applications/{id}/documents/{slot}` | Raw document bytes |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use bytes::Bytes;
use permit_core::{
  application::{
    Application, ApplicationFilter, ApplicationSort, ApplicationStatus, NewApplication,
  },
  pagination::Page,
  store::PermitStore,
};
use permit_engine::PageParams;
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use super::{CommentBody, StatusBody};
use crate::{AppState, auth::AccountSession, error::Error};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
  pub status:   Option<ApplicationStatus>,
  pub owner_id: Option<Uuid>,
  pub sort:     Option<ApplicationSort>,
  pub page:     Option<u32>,
  pub limit:    Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct EditBody {
  pub fields:  Map<String, Value>,
  pub comment: Option<String>,
}

/// `GET /applications`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Query(q): Query<ListQuery>,
) -> Result<Json<Page<Application>>, Error>
where
  S: PermitStore + 'static,
{
  let filter = ApplicationFilter {
    status:   q.status,
    owner_id: q.owner_id,
    sort:     q.sort.unwrap_or_default(),
  };
  let params = PageParams { page: q.page, limit: q.limit };
  Ok(Json(state.engine.list_applications(&actor, filter, params).await?))
}

/// `POST /applications`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Json(body): Json<NewApplication>,
) -> Result<impl IntoResponse, Error>
where
  S: PermitStore + 'static,
{
  let application = state.engine.submit_application(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(application)))
}

/// `GET /applications/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
) -> Result<Json<Application>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.get_application(&actor, &id).await?))
}

/// `DELETE /applications/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
) -> Result<StatusCode, Error>
where
  S: PermitStore + 'static,
{
  state.engine.delete_application(&actor, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /applications/{id}/status`
pub async fn set_status<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
  Json(body): Json<StatusBody<ApplicationStatus>>,
) -> Result<Json<Application>, Error>
where
  S: PermitStore + 'static,
{
  let application = state
    .engine
    .transition_application(&actor, &id, body.status, body.comment)
    .await?;
  Ok(Json(application))
}

/// `POST /applications/{id}/comments`
pub async fn comment<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
  Json(body): Json<CommentBody>,
) -> Result<Json<Application>, Error>
where
  S: PermitStore + 'static,
{
  Ok(Json(state.engine.comment_application(&actor, &id, &body.comment).await?))
}

/// `PATCH /applications/{id}/fields`
pub async fn edit<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path(id): Path<String>,
  Json(body): Json<EditBody>,
) -> Result<Json<Application>, Error>
where
  S: PermitStore + 'static,
{
  let application = state
    .engine
    .edit_application(&actor, &id, body.fields, body.comment)
    .await?;
  Ok(Json(application))
}

/// `PUT /applications/{id}/documents/{slot}`
pub async fn upload<S>(
  State(state): State<AppState<S>>,
  AccountSession(actor): AccountSession,
  Path((id, slot)): Path<(String, String)>,
  body: Bytes,
) -> Result<Json<Application>, Error>
where
  S: PermitStore + 'static,
{
  let application = state
    .engine
    .attach_application_document(&actor, &*state.files, &id, &slot, body)
    .await?;
  Ok(Json(application))
}
