//! Error type and axum `IntoResponse` implementation.
//!
//! Registry errors keep their stable `kind()` string in the body so clients
//! can branch on it without parsing messages.

use axum::{
  Json,
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use permit_core::error::AuthError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Registry(#[from] permit_core::Error),
}

impl Error {
  pub fn status(&self) -> StatusCode {
    use permit_core::Error as E;
    match self {
      Error::Registry(e) => match e {
        E::Auth(AuthError::AccountInactive) => StatusCode::FORBIDDEN,
        E::Auth(_) => StatusCode::UNAUTHORIZED,
        E::Authz(_) => StatusCode::FORBIDDEN,
        E::Validation(_) | E::PageOutOfRange { .. } => StatusCode::BAD_REQUEST,
        E::Conflict(_) => StatusCode::CONFLICT,
        E::Transition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        E::NotFound { .. } => StatusCode::NOT_FOUND,
        E::Store(_) | E::Internal(_) | E::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn kind(&self) -> &'static str {
    match self {
      Error::Registry(e) => e.kind(),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
      "internal server error".to_owned()
    } else {
      self.to_string()
    };

    let mut res = (status, Json(json!({ "error": message, "kind": self.kind() }))).into_response();
    if status == StatusCode::UNAUTHORIZED {
      res
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    }
    res
  }
}
