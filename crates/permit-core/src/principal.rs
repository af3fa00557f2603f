//! Principals: the actors that authenticate against the registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  Operator,
  Admin,
  Officer,
}

impl Role {
  /// The pool a principal with this role authenticates against.
  pub fn pool(self) -> PrincipalPool {
    match self {
      Role::Operator | Role::Admin => PrincipalPool::Accounts,
      Role::Officer => PrincipalPool::Officers,
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrincipalStatus {
  Active,
  Pending,
  Suspended,
}

/// A set of principals sharing one login identifier namespace.
///
/// Operators and administrators log in with an email address; officers log
/// in with their badge number.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PrincipalPool {
  Accounts,
  Officers,
}

impl PrincipalPool {
  pub fn contains(self, role: Role) -> bool { role.pool() == self }

  /// Normalise a login identifier the way it is stored.
  pub fn normalize_login(self, identifier: &str) -> String {
    match self {
      PrincipalPool::Accounts => identifier.trim().to_lowercase(),
      PrincipalPool::Officers => identifier.trim().to_uppercase(),
    }
  }
}

/// Descriptive profile fields. None of these participate in access control.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
  pub first_name:       String,
  pub last_name:        String,
  pub phone:            Option<String>,
  pub company_name:     Option<String>,
  pub business_address: Option<String>,
  pub department:       Option<String>,
  pub rank:             Option<String>,
}

/// A stored principal, credential hash included.
///
/// The hash is skipped on serialisation so a `Principal` can be returned to
/// clients as-is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub principal_id:  Uuid,
  pub role:          Role,
  pub status:        PrincipalStatus,
  /// Lower-cased; unique across all principals.
  pub email:         String,
  /// Officers only; unique.
  pub badge_number:  Option<String>,
  #[serde(skip_serializing, default)]
  pub password_hash: String,
  pub profile:       Profile,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
  pub last_login:    Option<DateTime<Utc>>,
}

impl Principal {
  pub fn is_active(&self) -> bool { self.status == PrincipalStatus::Active }

  pub fn pool(&self) -> PrincipalPool { self.role.pool() }
}

/// Filter for account and officer listings.
#[derive(Debug, Clone, Default)]
pub struct PrincipalFilter {
  pub role:   Option<Role>,
  /// Restrict to one pool; ignored when `role` is set.
  pub pool:   Option<PrincipalPool>,
  pub status: Option<PrincipalStatus>,
  /// Case-insensitive substring of email, badge number, name, or company.
  pub search: Option<String>,
}
