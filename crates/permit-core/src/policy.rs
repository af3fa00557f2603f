//! The access policy: one pure function from principal and capability to a
//! decision.

use std::fmt;

use uuid::Uuid;

use crate::{
  error::AuthzError,
  principal::{Principal, Role},
};

/// A capability an operation requires of its caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
  /// Any principal that resolved from a valid token.
  Authenticated,
  Admin,
  Officer,
  AdminOrOfficer,
  /// The principal must own the entity.
  OwnerOf(Uuid),
  /// The owner, or any administrator.
  OwnerOrAdmin(Uuid),
}

impl fmt::Display for Capability {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // The owner id is never rendered.
    let s = match self {
      Capability::Authenticated => "authenticated",
      Capability::Admin => "admin",
      Capability::Officer => "officer",
      Capability::AdminOrOfficer => "admin or officer",
      Capability::OwnerOf(_) => "owner",
      Capability::OwnerOrAdmin(_) => "owner or admin",
    };
    f.write_str(s)
  }
}

pub fn authorize(principal: &Principal, required: Capability) -> Result<(), AuthzError> {
  let allowed = match required {
    Capability::Authenticated => true,
    Capability::Admin => principal.role == Role::Admin,
    Capability::Officer => principal.role == Role::Officer,
    Capability::AdminOrOfficer => matches!(principal.role, Role::Admin | Role::Officer),
    Capability::OwnerOf(owner) => principal.principal_id == owner,
    Capability::OwnerOrAdmin(owner) => {
      principal.role == Role::Admin || principal.principal_id == owner
    }
  };

  if allowed {
    Ok(())
  } else {
    Err(AuthzError::Denied { required: required.to_string() })
  }
}

#[cfg(test)]
mod tests {
  use chrono::Utc;

  use super::*;
  use crate::principal::{PrincipalStatus, Profile};

  fn principal(role: Role) -> Principal {
    let now = Utc::now();
    Principal {
      principal_id:  Uuid::new_v4(),
      role,
      status:        PrincipalStatus::Active,
      email:         format!("{role}@example.com"),
      badge_number:  None,
      password_hash: String::new(),
      profile:       Profile::default(),
      created_at:    now,
      updated_at:    now,
      last_login:    None,
    }
  }

  #[test]
  fn role_capabilities() {
    let op = principal(Role::Operator);
    let admin = principal(Role::Admin);
    let officer = principal(Role::Officer);

    assert!(authorize(&op, Capability::Authenticated).is_ok());
    assert!(authorize(&op, Capability::Admin).is_err());
    assert!(authorize(&admin, Capability::Admin).is_ok());
    assert!(authorize(&admin, Capability::Officer).is_err());
    assert!(authorize(&officer, Capability::Officer).is_ok());
    assert!(authorize(&officer, Capability::AdminOrOfficer).is_ok());
    assert!(authorize(&admin, Capability::AdminOrOfficer).is_ok());
    assert!(authorize(&op, Capability::AdminOrOfficer).is_err());
  }

  #[test]
  fn ownership_compares_ids_only() {
    let alice = principal(Role::Operator);
    let bob = principal(Role::Operator);
    let admin = principal(Role::Admin);

    assert!(authorize(&alice, Capability::OwnerOf(alice.principal_id)).is_ok());
    assert!(authorize(&bob, Capability::OwnerOf(alice.principal_id)).is_err());
    // Plain ownership is not satisfied by the admin role.
    assert!(authorize(&admin, Capability::OwnerOf(alice.principal_id)).is_err());
    assert!(authorize(&admin, Capability::OwnerOrAdmin(alice.principal_id)).is_ok());
    assert!(authorize(&bob, Capability::OwnerOrAdmin(alice.principal_id)).is_err());
  }

  #[test]
  fn denial_does_not_leak_owner() {
    let alice = principal(Role::Operator);
    let bob = principal(Role::Operator);
    let err = authorize(&bob, Capability::OwnerOf(alice.principal_id)).unwrap_err();
    let AuthzError::Denied { required } = err;
    assert_eq!(required, "owner");
    assert!(!required.contains(&alice.principal_id.to_string()));
  }
}
