//! Error type for `permit-store-sqlite`.

use permit_core::store::{StoreError, UniqueField};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("{0} already exists")]
  UniqueViolation(UniqueField),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("unknown {column} value: {value:?}")]
  UnknownValue { column: &'static str, value: String },

  #[error("{0} has no timeline")]
  Untracked(permit_core::ids::EntityKind),
}

impl Error {
  /// Translate a raw database error, recognising UNIQUE / PRIMARY KEY
  /// constraint failures on the columns the registry cares about.
  pub(crate) fn from_db(err: tokio_rusqlite::Error) -> Self {
    if let tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(code, Some(msg))) = &err
      && code.code == rusqlite::ErrorCode::ConstraintViolation
      && let Some(field) = unique_field_from_message(msg)
    {
      return Error::UniqueViolation(field);
    }
    Error::Database(err)
  }
}

/// Parse `UNIQUE constraint failed: <table>.<column>`.
fn unique_field_from_message(msg: &str) -> Option<UniqueField> {
  let column = msg.strip_prefix("UNIQUE constraint failed: ")?;
  let column = column.split(',').next()?.trim();
  match column {
    "principals.email" => Some(UniqueField::Email),
    "principals.badge_number" => Some(UniqueField::BadgeNumber),
    "applications.application_id" => Some(UniqueField::ApplicationId),
    "vehicles.vehicle_id" => Some(UniqueField::VehicleId),
    "vehicles.registration_number" => Some(UniqueField::RegistrationNumber),
    _ => None,
  }
}

impl StoreError for Error {
  fn unique_violation(&self) -> Option<UniqueField> {
    match self {
      Error::UniqueViolation(field) => Some(*field),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
