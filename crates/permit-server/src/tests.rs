//! Router tests driven through `tower::ServiceExt::oneshot`.

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  body::Body,
  http::{Method, Request, StatusCode, header},
};
use permit_engine::{Authenticator, Engine, EngineConfig, hash_password};
use permit_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use super::*;

const PASSWORD: &str = "Secret123";

async fn make_app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let auth = Authenticator::new(b"router-test-secret").unwrap();
  let engine = Engine::new(Arc::new(store), auth, EngineConfig::default());
  engine
    .bootstrap_admin("admin@example.com", hash_password(PASSWORD).unwrap())
    .await
    .unwrap();

  let upload_dir = std::env::temp_dir().join(format!("permit-uploads-{}", Uuid::new_v4()));
  router(AppState {
    engine: Arc::new(engine),
    files:  Arc::new(DiskFileStore::new(upload_dir)),
  })
}

async fn send(
  app: &Router,
  method: Method,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let req = match body {
    Some(body) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(body.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let res = app.clone().oneshot(req).await.unwrap();
  let status = res.status();
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

async fn register(app: &Router, email: &str) {
  let (status, body) = send(
    app,
    Method::POST,
    "/auth/register",
    None,
    Some(json!({
      "email": email,
      "password": PASSWORD,
      "role": "operator",
      "first_name": "Alice",
      "last_name": "Moyo",
      "company_name": "Moyo Transport",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert!(body.get("password_hash").is_none());
}

async fn login(app: &Router, email: &str) -> String {
  let (status, body) = send(
    app,
    Method::POST,
    "/auth/login",
    None,
    Some(json!({ "email": email, "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  body["token"].as_str().unwrap().to_string()
}

async fn submit(app: &Router, token: &str) -> String {
  let (status, body) = send(
    app,
    Method::POST,
    "/applications",
    Some(token),
    Some(json!({ "route_from": "Harare", "route_to": "Mutare" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["application_id"].as_str().unwrap().to_string()
}

// ── End to end ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_and_approve_over_http() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let alice = login(&app, "alice@example.com").await;

  let (status, me) = send(&app, Method::GET, "/auth/me", Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["email"], "alice@example.com");

  let id = submit(&app, &alice).await;
  assert!(id.starts_with("PRM-"));

  let admin = login(&app, "admin@example.com").await;
  let (status, body) = send(
    &app,
    Method::PUT,
    &format!("/applications/{id}/status"),
    Some(&admin),
    Some(json!({ "status": "approved" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["status"], "approved");
  assert_eq!(body["timeline"].as_array().unwrap().len(), 2);

  let (status, body) = send(
    &app,
    Method::DELETE,
    &format!("/applications/{id}"),
    Some(&alice),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["kind"], "transition.cannot_delete_approved");
}

// ── Error mapping ───────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_token_is_401_with_challenge() {
  let app = make_app().await;
  let req = Request::builder()
    .uri("/applications")
    .body(Body::empty())
    .unwrap();
  let res = app.oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
  assert_eq!(res.headers()[header::WWW_AUTHENTICATE], "Bearer");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
  let app = make_app().await;
  let (status, body) = send(&app, Method::GET, "/applications", Some("garbage"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["kind"], "auth.token_invalid");
}

#[tokio::test]
async fn wrong_password_is_401() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let (status, body) = send(
    &app,
    Method::POST,
    "/auth/login",
    None,
    Some(json!({ "email": "alice@example.com", "password": "Wrong1234" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["kind"], "auth.invalid_credentials");
}

#[tokio::test]
async fn duplicate_registration_is_409() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let (status, body) = send(
    &app,
    Method::POST,
    "/auth/register",
    None,
    Some(json!({
      "email": "Alice@Example.com",
      "password": PASSWORD,
      "role": "operator",
      "first_name": "Alice",
      "last_name": "Moyo",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert_eq!(body["kind"], "conflict.duplicate");
}

#[tokio::test]
async fn foreign_application_is_403() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  register(&app, "bob@example.com").await;
  let alice = login(&app, "alice@example.com").await;
  let bob = login(&app, "bob@example.com").await;
  let id = submit(&app, &alice).await;

  let (status, body) = send(
    &app,
    Method::GET,
    &format!("/applications/{id}"),
    Some(&bob),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert_eq!(body["kind"], "authz.denied");

  let (status, body) = send(&app, Method::GET, "/applications", Some(&bob), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["pagination"]["total_items"], 0);
}

#[tokio::test]
async fn invalid_transition_is_422() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let alice = login(&app, "alice@example.com").await;
  let admin = login(&app, "admin@example.com").await;
  let id = submit(&app, &alice).await;

  let (status, body) = send(
    &app,
    Method::PUT,
    &format!("/applications/{id}/status"),
    Some(&admin),
    Some(json!({ "status": "active" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body["kind"], "transition.invalid");
}

#[tokio::test]
async fn page_past_the_end_is_400() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let alice = login(&app, "alice@example.com").await;
  for _ in 0..3 {
    submit(&app, &alice).await;
  }

  let (status, body) = send(
    &app,
    Method::GET,
    "/applications?page=2&limit=2",
    Some(&alice),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["items"].as_array().unwrap().len(), 1);
  assert_eq!(body["pagination"]["has_prev"], true);

  let (status, body) = send(
    &app,
    Method::GET,
    "/applications?page=3&limit=2",
    Some(&alice),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["kind"], "query.page_out_of_range");
}

// ── Pools and uploads ───────────────────────────────────────────────────────

#[tokio::test]
async fn officer_flow_stays_in_its_pool() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let alice = login(&app, "alice@example.com").await;
  let admin = login(&app, "admin@example.com").await;

  let (status, vehicle) = send(
    &app,
    Method::POST,
    "/vehicles",
    Some(&alice),
    Some(json!({
      "registration_number": "abc 1234",
      "make": "Toyota",
      "model": "Quantum",
      "year": 2019,
      "capacity": 14,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{vehicle}");
  let vehicle_id = vehicle["vehicle_id"].as_str().unwrap().to_string();

  let (status, officer) = send(
    &app,
    Method::POST,
    "/officers",
    Some(&admin),
    Some(json!({
      "email": "officer@police.example",
      "password": PASSWORD,
      "first_name": "Tatenda",
      "last_name": "Dube",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{officer}");
  let badge = officer["badge_number"].as_str().unwrap().to_string();

  let (status, body) = send(
    &app,
    Method::POST,
    "/auth/officers/login",
    None,
    Some(json!({ "badge_number": badge, "password": PASSWORD })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  let officer_token = body["token"].as_str().unwrap().to_string();

  // Officer tokens do not open account routes.
  let (status, _) = send(&app, Method::GET, "/applications", Some(&officer_token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, found) = send(
    &app,
    Method::GET,
    "/vehicles/lookup?registration=ABC%201234",
    Some(&officer_token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{found}");
  assert_eq!(found["vehicle_id"], vehicle_id.as_str());

  let (status, violation) = send(
    &app,
    Method::POST,
    &format!("/vehicles/{vehicle_id}/violations"),
    Some(&officer_token),
    Some(json!({ "description": "Overloading", "fine": 5000 })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{violation}");

  // Account tokens cannot issue violations.
  let (status, _) = send(
    &app,
    Method::POST,
    &format!("/vehicles/{vehicle_id}/violations"),
    Some(&alice),
    Some(json!({ "description": "Overloading", "fine": 5000 })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let violation_id = violation["violation_id"].as_str().unwrap();
  let (status, paid) = send(
    &app,
    Method::POST,
    &format!("/violations/{violation_id}/pay"),
    Some(&admin),
    Some(json!({})),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{paid}");
  assert_eq!(paid["status"], "paid");
}

#[tokio::test]
async fn document_upload_records_a_reference() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let alice = login(&app, "alice@example.com").await;
  let id = submit(&app, &alice).await;

  let req = Request::builder()
    .method(Method::PUT)
    .uri(format!("/applications/{id}/documents/tax_clearance"))
    .header(header::AUTHORIZATION, format!("Bearer {alice}"))
    .header(header::CONTENT_TYPE, "application/pdf")
    .body(Body::from("%PDF-1.4 test"))
    .unwrap();
  let res = app.clone().oneshot(req).await.unwrap();
  assert_eq!(res.status(), StatusCode::OK);
  let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();

  let reference = body["uploaded_files"]["tax_clearance"].as_str().unwrap();
  assert!(reference.starts_with(files::REFERENCE_PREFIX));
}

#[tokio::test]
async fn health_needs_no_session() {
  let app = make_app().await;
  let (status, body) = send(&app, Method::GET, "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

// ── Dashboard and search ────────────────────────────────────────────────────

#[tokio::test]
async fn dashboard_is_scoped_per_caller() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  register(&app, "bob@example.com").await;
  let alice = login(&app, "alice@example.com").await;
  let bob = login(&app, "bob@example.com").await;
  submit(&app, &alice).await;
  submit(&app, &alice).await;
  submit(&app, &bob).await;

  let (status, mine) = send(&app, Method::GET, "/dashboard", Some(&alice), None).await;
  assert_eq!(status, StatusCode::OK, "{mine}");
  assert_eq!(mine["applications"]["total"], 2);
  assert_eq!(mine["applications"]["by_status"]["pending"], 2);
  assert!(mine.get("registry").is_none());

  let admin = login(&app, "admin@example.com").await;
  let (status, all) = send(&app, Method::GET, "/dashboard", Some(&admin), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(all["applications"]["total"], 3);
  assert_eq!(all["registry"]["operators"], 2);

  let (status, _) = send(&app, Method::GET, "/dashboard", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn account_listing_filters_by_search_text() {
  let app = make_app().await;
  register(&app, "alice@example.com").await;
  let admin = login(&app, "admin@example.com").await;

  let (status, body) = send(
    &app,
    Method::GET,
    "/accounts?search=moyo%20transport",
    Some(&admin),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["pagination"]["total_items"], 1);
  assert_eq!(body["items"][0]["email"], "alice@example.com");

  let (_, body) =
    send(&app, Method::GET, "/accounts?search=administrator", Some(&admin), None).await;
  assert_eq!(body["items"][0]["email"], "admin@example.com");
}

#[test]
fn config_defaults_fill_paging_and_allocation() {
  let cfg: ServerConfig = serde_json::from_value(json!({
    "host": "127.0.0.1",
    "port": 8080,
    "store_path": "~/.local/share/permit/registry.db",
    "upload_dir": "/var/lib/permit/uploads",
    "token_secret": "secret",
  }))
  .unwrap();
  assert_eq!(cfg.store_path, PathBuf::from("~/.local/share/permit/registry.db"));
  assert!(cfg.bootstrap_admin_email.is_none());

  let engine = cfg.engine_config();
  assert_eq!(engine.page_limits.default_limit, 10);
  assert_eq!(engine.page_limits.max_limit, 50);
  assert_eq!(engine.allocation_max_attempts, 1000);
}
