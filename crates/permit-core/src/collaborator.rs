//! Interfaces to the collaborators that sit outside the registry core: the
//! notification channel and the document file store.

use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::EntityKind;

// ─── Notifications ───────────────────────────────────────────────────────────

/// Events that trigger an outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
  AccountRegistered { principal_id: Uuid, email: String },
  OfficerCreated { principal_id: Uuid, badge_number: String },
  ApplicationSubmitted { application_id: String, owner_id: Uuid },
  VehicleRegistered { vehicle_id: String, owner_id: Uuid },
  StatusChanged { kind: EntityKind, id: String, owner_id: Option<Uuid>, status: String },
  ViolationIssued { violation_id: Uuid, vehicle_id: String, fine: u64 },
}

/// Outbound notification delivery.
///
/// Delivery is best effort: the engine logs a failed notification and
/// carries on, so an implementation must never be relied upon for state.
pub trait Notifier: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn notify(
    &self,
    notification: Notification,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── File storage ────────────────────────────────────────────────────────────

/// Storage for uploaded documents. The registry only ever keeps the returned
/// reference string, never the bytes.
pub trait FileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist `bytes` under the logical `key` and return a stable reference.
  fn put(
    &self,
    key: String,
    bytes: Bytes,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;
}
