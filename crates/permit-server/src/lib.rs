//! JSON HTTP binding for the permit registry.
//!
//! Exposes an axum [`Router`] over an [`Engine`] backed by any
//! [`PermitStore`]. Handlers parse the request, resolve the bearer token,
//! call one engine operation, and render the result. Every rule lives in
//! the engine.
//!
//! # Routes
//!
//! | Method | Path | Session |
//! |--------|------|---------|
//! | `POST` | `/auth/register` | none |
//! | `POST` | `/auth/login`, `/auth/officers/login` | none |
//! | `GET`  | `/auth/me` | any |
//! | `GET`  | `/accounts`, `/accounts/{id}` | account |
//! | `PUT`  | `/accounts/{id}/status` | account |
//! | `GET`/`POST` | `/officers` | account |
//! | `GET`  | `/officers/{id}` | any |
//! | `PUT`  | `/officers/{id}/status` | account |
//! | `GET`/`POST` | `/applications` | account |
//! | `GET`/`DELETE` | `/applications/{id}` | account |
//! | `PATCH` | `/applications/{id}/fields` | account |
//! | `PUT`  | `/applications/{id}/status` | account |
//! | `POST` | `/applications/{id}/comments` | account |
//! | `PUT`  | `/applications/{id}/documents/{slot}` | account |
//! | `GET`/`POST` | `/vehicles` | account |
//! | `GET`  | `/vehicles/lookup?registration=` | any |
//! | `GET`/`PATCH`/`DELETE` | `/vehicles/{id}` | account |
//! | `PUT`  | `/vehicles/{id}/status` | account |
//! | `POST` | `/vehicles/{id}/comments` | account |
//! | `PUT`  | `/vehicles/{id}/documents/{slot}` | account |
//! | `POST` | `/vehicles/{id}/violations` | officer |
//! | `GET`  | `/violations`, `/violations/{id}` | any |
//! | `POST` | `/violations/{id}/pay` | account |
//! | `GET`  | `/dashboard` | account |

pub mod auth;
pub mod error;
pub mod files;
pub mod handlers;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  extract::DefaultBodyLimit,
  routing::{get, patch, post, put},
};
use permit_core::{pagination::PageLimits, store::PermitStore};
use permit_engine::{Engine, EngineConfig, allocator::DEFAULT_MAX_ATTEMPTS};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use files::DiskFileStore;
use handlers::{accounts, applications, auth as login, dashboard, vehicles, violations};

/// Largest request body accepted, uploads included.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PERMIT_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:                          String,
  pub port:                          u16,
  pub store_path:                    PathBuf,
  pub upload_dir:                    PathBuf,
  /// HMAC key for session tokens.
  pub token_secret:                  String,
  #[serde(default = "default_page_limit")]
  pub page_default_limit:            u32,
  #[serde(default = "max_page_limit")]
  pub page_max_limit:                u32,
  #[serde(default = "default_max_attempts")]
  pub allocation_max_attempts:       u32,
  /// Created as an active administrator at startup if no account holds the
  /// address yet.
  pub bootstrap_admin_email:         Option<String>,
  /// argon2 PHC string, as printed by `server --hash-password`.
  pub bootstrap_admin_password_hash: Option<String>,
}

fn default_page_limit() -> u32 { PageLimits::default().default_limit }

fn max_page_limit() -> u32 { PageLimits::default().max_limit }

fn default_max_attempts() -> u32 { DEFAULT_MAX_ATTEMPTS }

impl ServerConfig {
  pub fn engine_config(&self) -> EngineConfig {
    EngineConfig {
      page_limits:             PageLimits {
        default_limit: self.page_default_limit,
        max_limit:     self.page_max_limit,
      },
      allocation_max_attempts: self.allocation_max_attempts,
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub engine: Arc<Engine<S>>,
  pub files:  Arc<DiskFileStore>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      engine: Arc::clone(&self.engine),
      files:  Arc::clone(&self.files),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the registry's axum [`Router`].
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PermitStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    // Sessions
    .route("/auth/register", post(login::register::<S>))
    .route("/auth/login", post(login::account_login::<S>))
    .route("/auth/officers/login", post(login::officer_login::<S>))
    .route("/auth/me", get(login::me))
    // Principals
    .route("/accounts", get(accounts::list_accounts::<S>))
    .route("/accounts/{id}", get(accounts::get_one::<S>))
    .route("/accounts/{id}/status", put(accounts::set_status::<S>))
    .route(
      "/officers",
      get(accounts::list_officers::<S>).post(accounts::create_officer::<S>),
    )
    .route("/officers/{id}", get(accounts::get_officer::<S>))
    .route("/officers/{id}/status", put(accounts::set_status::<S>))
    // Applications
    .route(
      "/applications",
      get(applications::list::<S>).post(applications::create::<S>),
    )
    .route(
      "/applications/{id}",
      get(applications::get_one::<S>).delete(applications::delete_one::<S>),
    )
    .route("/applications/{id}/fields", patch(applications::edit::<S>))
    .route("/applications/{id}/status", put(applications::set_status::<S>))
    .route("/applications/{id}/comments", post(applications::comment::<S>))
    .route(
      "/applications/{id}/documents/{slot}",
      put(applications::upload::<S>),
    )
    // Vehicles
    .route("/vehicles", get(vehicles::list::<S>).post(vehicles::create::<S>))
    .route("/vehicles/lookup", get(vehicles::lookup::<S>))
    .route(
      "/vehicles/{id}",
      get(vehicles::get_one::<S>)
        .patch(vehicles::update_details::<S>)
        .delete(vehicles::delete_one::<S>),
    )
    .route("/vehicles/{id}/status", put(vehicles::set_status::<S>))
    .route("/vehicles/{id}/comments", post(vehicles::comment::<S>))
    .route("/vehicles/{id}/documents/{slot}", put(vehicles::upload::<S>))
    .route("/vehicles/{id}/violations", post(violations::issue::<S>))
    // Violations
    .route("/violations", get(violations::list::<S>))
    .route("/violations/{id}", get(violations::get_one::<S>))
    .route("/violations/{id}/pay", post(violations::pay::<S>))
    // Dashboard
    .route("/dashboard", get(dashboard::stats::<S>))
    .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
