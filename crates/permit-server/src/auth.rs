//! Bearer-token extractors.
//!
//! A handler names the principal pool it serves by the extractor it takes:
//! [`AccountSession`] for operators and administrators, [`OfficerSession`]
//! for officers, [`Session`] where either will do.

use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use permit_core::{
  error::AuthError,
  principal::{Principal, PrincipalPool},
  store::PermitStore,
};

use crate::{AppState, error::Error};

/// An operator or administrator, resolved from the `accounts` pool.
pub struct AccountSession(pub Principal);

/// An officer, resolved from the `officers` pool.
pub struct OfficerSession(pub Principal);

/// A principal from either pool.
pub struct Session(pub Principal);

/// The token of an `Authorization: Bearer <token>` header, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
}

async fn resolve<S: PermitStore>(
  parts: &Parts,
  state: &AppState<S>,
  pool: PrincipalPool,
) -> Result<Principal, Error> {
  let token = bearer_token(&parts.headers);
  Ok(state.engine.authenticate(pool, token).await?)
}

impl<S> FromRequestParts<AppState<S>> for AccountSession
where
  S: PermitStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve(parts, state, PrincipalPool::Accounts).await.map(Self)
  }
}

impl<S> FromRequestParts<AppState<S>> for OfficerSession
where
  S: PermitStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve(parts, state, PrincipalPool::Officers).await.map(Self)
  }
}

impl<S> FromRequestParts<AppState<S>> for Session
where
  S: PermitStore + 'static,
{
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    match resolve(parts, state, PrincipalPool::Accounts).await {
      Err(Error::Registry(permit_core::Error::Auth(AuthError::PrincipalNotFound))) => {
        resolve(parts, state, PrincipalPool::Officers).await.map(Self)
      }
      other => other.map(Self),
    }
  }
}
