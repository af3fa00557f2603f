//! Violations issued by officers against registered vehicles.

use chrono::{DateTime, NaiveDate, Utc};
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
pub enum ViolationStatus {
  Unpaid,
  Paid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
  pub violation_id: Uuid,
  pub vehicle_id:   String,
  pub officer_id:   Uuid,
  pub description:  String,
  /// Minor currency units.
  pub fine:         u64,
  pub status:       ViolationStatus,
  pub date:         NaiveDate,
  pub timeline:     Vec<TimelineEntry>,
  pub created_at:   DateTime<Utc>,
  pub updated_at:   DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewViolation {
  pub description: String,
  pub fine:        u64,
}

#[derive(Debug, Clone, Default)]
pub struct ViolationFilter {
  pub status:     Option<ViolationStatus>,
  pub vehicle_id: Option<String>,
  pub officer_id: Option<Uuid>,
}
