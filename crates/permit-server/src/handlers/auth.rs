//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: [`NewAccount`]; returns 201 + principal |
//! | `POST` | `/auth/login` | Body: `{"email","password"}` |
//! | `POST` | `/auth/officers/login` | Body: `{"badge_number","password"}` |
//! | `GET`  | `/auth/me` | The caller's own principal |

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use chrono::{DateTime, Utc};
use permit_core::{
  principal::{Principal, PrincipalPool},
  store::PermitStore,
};
use permit_engine::NewAccount;
use serde::{Deserialize, Serialize};

use crate::{AppState, auth::Session, error::Error};

#[derive(Debug, Deserialize)]
pub struct AccountLogin {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OfficerLogin {
  pub badge_number: String,
  pub password:     String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
  pub principal:  Principal,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<NewAccount>,
) -> Result<impl IntoResponse, Error>
where
  S: PermitStore + 'static,
{
  let principal = state.engine.register(body).await?;
  Ok((StatusCode::CREATED, Json(principal)))
}

async fn login<S: PermitStore>(
  state: &AppState<S>,
  pool: PrincipalPool,
  identifier: &str,
  password: &str,
) -> Result<Json<LoginResponse>, Error> {
  let (principal, issued) = state.engine.login(pool, identifier, password).await?;
  Ok(Json(LoginResponse {
    token: issued.token,
    expires_at: issued.expires_at,
    principal,
  }))
}

/// `POST /auth/login`
pub async fn account_login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<AccountLogin>,
) -> Result<Json<LoginResponse>, Error>
where
  S: PermitStore + 'static,
{
  login(&state, PrincipalPool::Accounts, &body.email, &body.password).await
}

/// `POST /auth/officers/login`
pub async fn officer_login<S>(
  State(state): State<AppState<S>>,
  Json(body): Json<OfficerLogin>,
) -> Result<Json<LoginResponse>, Error>
where
  S: PermitStore + 'static,
{
  login(&state, PrincipalPool::Officers, &body.badge_number, &body.password).await
}

/// `GET /auth/me`
pub async fn me(Session(principal): Session) -> Json<Principal> { Json(principal) }
