//! Permit applications submitted by operators.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};
use uuid::Uuid;

use crate::timeline::TimelineEntry;

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  AsRefStr,
  EnumString,
  EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ApplicationStatus {
  Pending,
  UnderReview,
  Approved,
  Rejected,
  Active,
  /// Requested to record an administrative edit; never stored as a status.
  Edited,
}

/// A permit application. Mutated only through the lifecycle engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
  pub application_id: String,
  pub owner_id:       Uuid,
  pub status:         ApplicationStatus,
  pub route_from:     String,
  pub route_to:       String,
  /// Free-form submitted fields (operator name, contact person, …).
  pub fields:         serde_json::Map<String, serde_json::Value>,
  /// Document slot name → file store reference.
  pub uploaded_files: BTreeMap<String, String>,
  pub timeline:       Vec<TimelineEntry>,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// Input accepted when an operator submits an application.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewApplication {
  pub route_from: String,
  pub route_to:   String,
  #[serde(default)]
  pub fields:     serde_json::Map<String, serde_json::Value>,
}

/// Listing order. Ties are always broken by `application_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationSort {
  #[default]
  Newest,
  Oldest,
}

#[derive(Debug, Clone, Default)]
pub struct ApplicationFilter {
  pub status:   Option<ApplicationStatus>,
  pub owner_id: Option<Uuid>,
  pub sort:     ApplicationSort,
}
