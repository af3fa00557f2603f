//! The append-only audit timeline attached to every trackable entity.

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike as _, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Whether an entry moved the entity's status or only annotated it.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntryKind {
  Transition,
  Annotation,
}

/// One line of an entity's audit trail. Entries are never reordered or
/// deleted; their order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
  /// The status label, e.g. `submitted`, `approved`, `edited`.
  pub status:      String,
  pub kind:        EntryKind,
  pub date:        NaiveDate,
  /// Minute precision.
  pub time:        NaiveTime,
  pub description: String,
  pub comment:     Option<String>,
  pub updated_by:  Option<Uuid>,
}

impl TimelineEntry {
  pub fn transition(status: impl Into<String>, description: impl Into<String>) -> Self {
    Self::new(EntryKind::Transition, status, description, Utc::now())
  }

  pub fn annotation(status: impl Into<String>, description: impl Into<String>) -> Self {
    Self::new(EntryKind::Annotation, status, description, Utc::now())
  }

  pub fn new(
    kind: EntryKind,
    status: impl Into<String>,
    description: impl Into<String>,
    at: DateTime<Utc>,
  ) -> Self {
    let time = at.time();
    Self {
      status: status.into(),
      kind,
      date: at.date_naive(),
      time: NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time),
      description: description.into(),
      comment: None,
      updated_by: None,
    }
  }

  pub fn with_comment(mut self, comment: Option<String>) -> Self {
    self.comment = comment.filter(|c| !c.trim().is_empty());
    self
  }

  pub fn by(mut self, principal_id: Uuid) -> Self {
    self.updated_by = Some(principal_id);
    self
  }
}

/// The status implied by a timeline: the label of its last transition entry.
pub fn current_status(timeline: &[TimelineEntry]) -> Option<&str> {
  timeline
    .iter()
    .rev()
    .find(|e| e.kind == EntryKind::Transition)
    .map(|e| e.status.as_str())
}
