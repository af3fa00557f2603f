//! Password hashing and signed session tokens.
//!
//! Tokens are HS256 JWTs carrying `{sub, iat, exp, jti}` and live for
//! [`TOKEN_TTL_HOURS`]. They are stateless: nothing is stored server-side and
//! nothing can revoke a token before it expires.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use chrono::{DateTime, Duration, TimeZone as _, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use permit_core::{
  Error, Result,
  error::AuthError,
  principal::{Principal, PrincipalPool},
  store::PermitStore,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::store_err;

pub const TOKEN_TTL_HOURS: i64 = 24;

/// Hash `password` into an argon2id PHC string.
pub fn hash_password(password: &str) -> Result<String> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::Internal(format!("password hashing failed: {e}")))
}

/// `false` for a wrong password and for an unparseable stored hash alike.
fn verify_password(password_hash: &str, password: &str) -> bool {
  PasswordHash::new(password_hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
  pub sub: Uuid,
  pub iat: i64,
  pub exp: i64,
  pub jti: Uuid,
}

/// A freshly signed token and the instant it stops being accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuedToken {
  pub token:      String,
  pub expires_at: DateTime<Utc>,
}

/// Verifies credentials and issues and validates session tokens for either
/// principal pool.
#[derive(Clone)]
pub struct Authenticator {
  encoding:   EncodingKey,
  decoding:   DecodingKey,
  validation: Validation,
  /// Verified against when the login identifier is unknown, so a miss costs
  /// the same as a wrong password.
  dummy_hash: String,
}

impl Authenticator {
  pub fn new(secret: &[u8]) -> Result<Self> {
    if secret.is_empty() {
      return Err(Error::Internal("token secret is empty".into()));
    }

    // Expiry is checked against our own clock in `decode_at`.
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.leeway = 0;

    Ok(Self {
      encoding: EncodingKey::from_secret(secret),
      decoding: DecodingKey::from_secret(secret),
      validation,
      dummy_hash: hash_password("not-a-real-password")?,
    })
  }

  pub fn issue_token(&self, principal: &Principal) -> Result<IssuedToken> {
    self.issue_token_at(principal, Utc::now())
  }

  pub fn issue_token_at(&self, principal: &Principal, now: DateTime<Utc>) -> Result<IssuedToken> {
    let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);
    let claims = Claims {
      sub: principal.principal_id,
      iat: now.timestamp(),
      exp: expires_at.timestamp(),
      jti: Uuid::new_v4(),
    };

    let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
      .map_err(|e| Error::Internal(format!("token signing failed: {e}")))?;

    Ok(IssuedToken {
      token,
      expires_at: Utc
        .timestamp_opt(claims.exp, 0)
        .single()
        .unwrap_or(expires_at),
    })
  }

  /// Check signature, shape, and expiry of `token` at `now`.
  pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, AuthError> {
    let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
      .map_err(|_| AuthError::TokenInvalid)?;

    if now.timestamp() >= data.claims.exp {
      return Err(AuthError::TokenExpired);
    }
    Ok(data.claims)
  }

  /// Verify `secret` for the principal known as `identifier` in `pool`.
  ///
  /// Unknown identifiers and wrong secrets are indistinguishable. A correct
  /// secret on a principal that is not active is refused with
  /// [`AuthError::AccountInactive`].
  #[tracing::instrument(skip(self, store, secret))]
  pub async fn login<S: PermitStore>(
    &self,
    store: &S,
    pool: PrincipalPool,
    identifier: &str,
    secret: &str,
  ) -> Result<Principal> {
    let login = pool.normalize_login(identifier);
    let found = store
      .find_principal(pool, login)
      .await
      .map_err(store_err)?
      .filter(|p| pool.contains(p.role));

    let Some(mut principal) = found else {
      let _ = verify_password(&self.dummy_hash, secret);
      return Err(AuthError::InvalidCredentials.into());
    };

    if !verify_password(&principal.password_hash, secret) {
      return Err(AuthError::InvalidCredentials.into());
    }
    if !principal.is_active() {
      return Err(AuthError::AccountInactive.into());
    }

    let now = Utc::now();
    match store.record_login(principal.principal_id, now).await {
      Ok(()) => principal.last_login = Some(now),
      Err(e) => warn!(principal_id = %principal.principal_id, error = %e, "failed to record last login"),
    }

    info!(principal_id = %principal.principal_id, role = %principal.role, "login");
    Ok(principal)
  }

  pub async fn validate<S: PermitStore>(
    &self,
    store: &S,
    pool: PrincipalPool,
    token: Option<&str>,
  ) -> Result<Principal> {
    self.validate_at(store, pool, token, Utc::now()).await
  }

  /// Resolve `token` to an active principal of `pool`.
  pub async fn validate_at<S: PermitStore>(
    &self,
    store: &S,
    pool: PrincipalPool,
    token: Option<&str>,
    now: DateTime<Utc>,
  ) -> Result<Principal> {
    let token = token
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or(AuthError::TokenMissing)?;
    let claims = self.decode_at(token, now)?;

    let principal = store
      .get_principal(claims.sub)
      .await
      .map_err(store_err)?
      .filter(|p| pool.contains(p.role))
      .ok_or(AuthError::PrincipalNotFound)?;

    if !principal.is_active() {
      return Err(AuthError::AccountInactive.into());
    }
    Ok(principal)
  }
}
