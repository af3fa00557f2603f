//! Route handlers, one module per resource.
//!
//! Query strings carry `page` and `limit` as plain fields of each handler's
//! query struct; `serde_urlencoded` cannot read numbers through `flatten`.

pub mod accounts;
pub mod applications;
pub mod auth;
pub mod dashboard;
pub mod vehicles;
pub mod violations;

use serde::Deserialize;

/// Body of every `PUT …/status` route.
#[derive(Debug, Deserialize)]
pub struct StatusBody<T> {
  pub status:  T,
  pub comment: Option<String>,
}

/// Body of every `POST …/comments` route.
#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub comment: String,
}
