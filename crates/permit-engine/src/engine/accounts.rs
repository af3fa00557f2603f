//! Account registration, login, officers, and principal status.

use chrono::Utc;
use permit_core::{
  Error, Result,
  collaborator::{Notification, Notifier},
  error::{ConflictError, ValidationError},
  ids::{EntityKind, IdKind},
  pagination::{Page, PageInfo},
  policy::{Capability, authorize},
  principal::{
    Principal, PrincipalFilter, PrincipalPool, PrincipalStatus, Profile, Role,
  },
  store::{PermitStore, UniqueField},
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::{Engine, PageParams, conflict, required, resolve_owned};
use crate::{
  auth::{IssuedToken, hash_password},
  store_err,
};

pub const MIN_PASSWORD_LEN: usize = 8;

/// Self-registration input for operators and administrators.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
  pub email:    String,
  pub password: String,
  pub role:     Role,
  #[serde(flatten)]
  pub profile:  Profile,
}

/// Officer account created by an administrator.
#[derive(Debug, Clone, Deserialize)]
pub struct NewOfficer {
  pub email:    String,
  pub password: String,
  #[serde(flatten)]
  pub profile:  Profile,
}

fn check_email(raw: &str) -> Result<String, ValidationError> {
  let email = required("email", raw)?.to_lowercase();
  let well_formed = email.split_once('@').is_some_and(|(local, domain)| {
    !local.is_empty()
      && !domain.starts_with('.')
      && !domain.ends_with('.')
      && domain.contains('.')
      && !domain.contains('@')
  }) && !email.contains(char::is_whitespace);

  if !well_formed {
    return Err(ValidationError::malformed("email", "not a valid email address"));
  }
  Ok(email)
}

fn check_password(password: &str) -> Result<(), ValidationError> {
  if password.chars().count() < MIN_PASSWORD_LEN {
    return Err(ValidationError::out_of_range(
      "password",
      format!("must be at least {MIN_PASSWORD_LEN} characters"),
    ));
  }
  let has = |pred: fn(char) -> bool| password.chars().any(pred);
  if !(has(char::is_uppercase) && has(char::is_lowercase) && has(|c| c.is_ascii_digit())) {
    return Err(ValidationError::malformed(
      "password",
      "must contain an uppercase letter, a lowercase letter, and a digit",
    ));
  }
  Ok(())
}

fn check_profile(mut profile: Profile) -> Result<Profile, ValidationError> {
  profile.first_name = required("first_name", &profile.first_name)?;
  profile.last_name = required("last_name", &profile.last_name)?;
  Ok(profile)
}

impl<S: PermitStore, N: Notifier> Engine<S, N> {
  async fn email_taken(&self, email: &str) -> Result<bool> {
    self
      .store
      .unique_exists(UniqueField::Email, email.to_owned())
      .await
      .map_err(store_err)
  }

  /// Register an operator or administrator account. Operators start active;
  /// administrators start pending until another administrator activates
  /// them.
  #[tracing::instrument(skip_all, fields(role = %input.role))]
  pub async fn register(&self, input: NewAccount) -> Result<Principal> {
    if input.role == Role::Officer {
      return Err(
        ValidationError::out_of_range("role", "officers are created by an administrator").into(),
      );
    }
    let email = check_email(&input.email)?;
    check_password(&input.password)?;
    let profile = check_profile(input.profile)?;

    if self.email_taken(&email).await? {
      return Err(ConflictError::Duplicate(UniqueField::Email.to_string()).into());
    }

    let now = Utc::now();
    let principal = Principal {
      principal_id: Uuid::new_v4(),
      role: input.role,
      status: match input.role {
        Role::Admin => PrincipalStatus::Pending,
        _ => PrincipalStatus::Active,
      },
      email,
      badge_number: None,
      password_hash: hash_password(&input.password)?,
      profile,
      created_at: now,
      updated_at: now,
      last_login: None,
    };
    self
      .store
      .insert_principal(principal.clone())
      .await
      .map_err(conflict)?;

    info!(principal_id = %principal.principal_id, status = %principal.status, "account registered");
    self
      .notify(Notification::AccountRegistered {
        principal_id: principal.principal_id,
        email:        principal.email.clone(),
      })
      .await;
    Ok(principal)
  }

  /// Verify credentials and issue a session token.
  pub async fn login(
    &self,
    pool: PrincipalPool,
    identifier: &str,
    secret: &str,
  ) -> Result<(Principal, IssuedToken)> {
    let principal = self.auth.login(&*self.store, pool, identifier, secret).await?;
    let token = self.auth.issue_token(&principal)?;
    Ok((principal, token))
  }

  /// Resolve a bearer token to an active principal of `pool`.
  pub async fn authenticate(&self, pool: PrincipalPool, token: Option<&str>) -> Result<Principal> {
    self.auth.validate(&*self.store, pool, token).await
  }

  /// Create the initial administrator if no account holds `email` yet.
  pub async fn bootstrap_admin(
    &self,
    email: &str,
    password_hash: String,
  ) -> Result<Option<Principal>> {
    let email = check_email(email)?;
    if self.email_taken(&email).await? {
      return Ok(None);
    }

    let now = Utc::now();
    let principal = Principal {
      principal_id: Uuid::new_v4(),
      role: Role::Admin,
      status: PrincipalStatus::Active,
      email,
      badge_number: None,
      password_hash,
      profile: Profile {
        first_name: "System".into(),
        last_name: "Administrator".into(),
        ..Default::default()
      },
      created_at: now,
      updated_at: now,
      last_login: None,
    };
    self
      .store
      .insert_principal(principal.clone())
      .await
      .map_err(conflict)?;

    info!(principal_id = %principal.principal_id, "bootstrap administrator created");
    Ok(Some(principal))
  }

  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id))]
  pub async fn create_officer(&self, actor: &Principal, input: NewOfficer) -> Result<Principal> {
    authorize(actor, Capability::Admin)?;
    let email = check_email(&input.email)?;
    check_password(&input.password)?;
    let profile = check_profile(input.profile)?;

    if self.email_taken(&email).await? {
      return Err(ConflictError::Duplicate(UniqueField::Email.to_string()).into());
    }

    let password_hash = hash_password(&input.password)?;
    let now = Utc::now();
    let officer = self
      .insert_allocated(
        IdKind::Officer,
        |badge| Principal {
          principal_id: Uuid::new_v4(),
          role: Role::Officer,
          status: PrincipalStatus::Active,
          email: email.clone(),
          badge_number: Some(badge),
          password_hash: password_hash.clone(),
          profile: profile.clone(),
          created_at: now,
          updated_at: now,
          last_login: None,
        },
        |officer| self.store.insert_principal(officer),
      )
      .await?;

    let badge_number = officer.badge_number.clone().unwrap_or_default();
    info!(principal_id = %officer.principal_id, %badge_number, "officer created");
    self
      .notify(Notification::OfficerCreated { principal_id: officer.principal_id, badge_number })
      .await;
    Ok(officer)
  }

  pub async fn get_principal(&self, actor: &Principal, id: Uuid) -> Result<Principal> {
    let found = self.store.get_principal(id).await.map_err(store_err)?;
    resolve_owned(actor, found, |p| p.principal_id, EntityKind::Principal, &id.to_string())
  }

  /// Activate, suspend, or (for accounts) return a principal to pending.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id, %status))]
  pub async fn set_principal_status(
    &self,
    actor: &Principal,
    id: Uuid,
    status: PrincipalStatus,
  ) -> Result<Principal> {
    authorize(actor, Capability::Admin)?;
    let mut principal = self
      .store
      .get_principal(id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found(EntityKind::Principal, id))?;

    if principal.role == Role::Officer && status == PrincipalStatus::Pending {
      return Err(
        ValidationError::out_of_range("status", "officers are either active or suspended").into(),
      );
    }
    if principal.principal_id == actor.principal_id && status != PrincipalStatus::Active {
      return Err(
        ValidationError::out_of_range("status", "administrators cannot deactivate themselves")
          .into(),
      );
    }

    let now = Utc::now();
    let updated = self
      .store
      .set_principal_status(id, status, now)
      .await
      .map_err(store_err)?;
    if !updated {
      return Err(Error::not_found(EntityKind::Principal, id));
    }

    info!(from = %principal.status, "principal status changed");
    principal.status = status;
    principal.updated_at = now;
    Ok(principal)
  }

  /// Operators and administrators, newest first.
  pub async fn list_accounts(
    &self,
    actor: &Principal,
    role: Option<Role>,
    status: Option<PrincipalStatus>,
    search: Option<String>,
    params: PageParams,
  ) -> Result<Page<Principal>> {
    authorize(actor, Capability::Admin)?;
    if role == Some(Role::Officer) {
      return Err(ValidationError::out_of_range("role", "officers are listed separately").into());
    }
    let filter = PrincipalFilter { role, pool: Some(PrincipalPool::Accounts), status, search };
    self.list_principals(filter, params).await
  }

  /// Officers in badge number order.
  pub async fn list_officers(
    &self,
    actor: &Principal,
    status: Option<PrincipalStatus>,
    search: Option<String>,
    params: PageParams,
  ) -> Result<Page<Principal>> {
    authorize(actor, Capability::Admin)?;
    let filter = PrincipalFilter {
      role: Some(Role::Officer),
      pool: Some(PrincipalPool::Officers),
      status,
      search,
    };
    self.list_principals(filter, params).await
  }

  async fn list_principals(
    &self,
    filter: PrincipalFilter,
    params: PageParams,
  ) -> Result<Page<Principal>> {
    let req = self.page_request(params)?;
    let total = self
      .store
      .count_principals(filter.clone())
      .await
      .map_err(store_err)?;
    let pagination = PageInfo::compute(req, total)?;
    let items = self
      .store
      .list_principals(filter, req.skip(), req.limit)
      .await
      .map_err(store_err)?;
    Ok(Page { items, pagination })
  }
}
