//! Error taxonomy shared by every layer of the permit registry.
//!
//! Each variant of [`Error`] maps to one stable [`Error::kind`] string so
//! callers can branch on the failure class without parsing messages.

use thiserror::Error;

use crate::ids::{EntityKind, IdKind};

/// Authentication failures. Each case is reported distinctly; none is
/// coerced into a generic failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
  #[error("token is missing")]
  TokenMissing,

  #[error("token has expired")]
  TokenExpired,

  #[error("token is invalid")]
  TokenInvalid,

  #[error("principal not found")]
  PrincipalNotFound,

  /// Unknown identifier and wrong secret are the same case.
  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("account is not active")]
  AccountInactive,
}

/// Authorization failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthzError {
  /// `required` names the capability, never the resource.
  #[error("{required} access required")]
  Denied { required: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
  #[error("missing required field: {0}")]
  MissingField(String),

  #[error("malformed {field}: {reason}")]
  Malformed { field: String, reason: String },

  #[error("{field} out of range: {reason}")]
  OutOfRange { field: String, reason: String },
}

impl ValidationError {
  pub fn missing(field: impl Into<String>) -> Self {
    Self::MissingField(field.into())
  }

  pub fn malformed(field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::Malformed { field: field.into(), reason: reason.into() }
  }

  pub fn out_of_range(field: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::OutOfRange { field: field.into(), reason: reason.into() }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
  /// A user-supplied unique field (email, registration number, …) is taken.
  #[error("{0} already exists")]
  Duplicate(String),

  #[error("could not allocate a free {0} identifier")]
  AllocationExhausted(IdKind),

  /// The entity changed between read and compare-and-set.
  #[error("{kind} {id} was modified concurrently")]
  ConcurrentUpdate { kind: EntityKind, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
  #[error("invalid {kind} transition: {from} -> {to}")]
  InvalidTransition { kind: EntityKind, from: String, to: String },

  #[error("cannot delete an active vehicle")]
  CannotDeleteActive,

  #[error("cannot delete an approved application")]
  CannotDeleteApproved,
}

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Auth(#[from] AuthError),

  #[error(transparent)]
  Authz(#[from] AuthzError),

  #[error(transparent)]
  Validation(#[from] ValidationError),

  #[error(transparent)]
  Conflict(#[from] ConflictError),

  #[error(transparent)]
  Transition(#[from] TransitionError),

  #[error("{kind} not found: {id}")]
  NotFound { kind: EntityKind, id: String },

  #[error("page {requested} is out of range (total pages: {total_pages})")]
  PageOutOfRange { requested: u32, total_pages: u32 },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(kind: EntityKind, id: impl ToString) -> Self {
    Self::NotFound { kind, id: id.to_string() }
  }

  /// A stable, machine-readable identifier for the failure class.
  pub fn kind(&self) -> &'static str {
    match self {
      Error::Auth(e) => match e {
        AuthError::TokenMissing => "auth.token_missing",
        AuthError::TokenExpired => "auth.token_expired",
        AuthError::TokenInvalid => "auth.token_invalid",
        AuthError::PrincipalNotFound => "auth.principal_not_found",
        AuthError::InvalidCredentials => "auth.invalid_credentials",
        AuthError::AccountInactive => "auth.account_inactive",
      },
      Error::Authz(AuthzError::Denied { .. }) => "authz.denied",
      Error::Validation(_) => "validation",
      Error::Conflict(e) => match e {
        ConflictError::Duplicate(_) => "conflict.duplicate",
        ConflictError::AllocationExhausted(_) => "conflict.allocation_exhausted",
        ConflictError::ConcurrentUpdate { .. } => "conflict.concurrent_update",
      },
      Error::Transition(e) => match e {
        TransitionError::InvalidTransition { .. } => "transition.invalid",
        TransitionError::CannotDeleteActive => "transition.cannot_delete_active",
        TransitionError::CannotDeleteApproved => "transition.cannot_delete_approved",
      },
      Error::NotFound { .. } => "not_found",
      Error::PageOutOfRange { .. } => "query.page_out_of_range",
      Error::Store(_) => "store",
      Error::Internal(_) => "internal",
      Error::Serialization(_) => "serialization",
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
