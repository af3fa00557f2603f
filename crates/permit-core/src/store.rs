//! The `PermitStore` trait, the persistence collaborator.
//!
//! The trait is implemented by storage backends (e.g. `permit-store-sqlite`).
//! Higher layers depend on this abstraction, not on any concrete backend.
//!
//! Backends must enforce uniqueness of every [`UniqueField`] themselves (a
//! unique index or equivalent) and report a violation through
//! [`StoreError::unique_violation`]. Application-level existence checks are
//! only a fast path.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};
use uuid::Uuid;

use crate::{
  application::{Application, ApplicationFilter},
  ids::{EntityKind, IdKind},
  principal::{Principal, PrincipalFilter, PrincipalPool, PrincipalStatus},
  timeline::TimelineEntry,
  vehicle::{Vehicle, VehicleDetailsPatch, VehicleFilter},
  violation::{Violation, ViolationFilter},
};

// ─── Unique fields ───────────────────────────────────────────────────────────

/// Every field the store keeps a uniqueness constraint on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UniqueField {
  Email,
  BadgeNumber,
  ApplicationId,
  VehicleId,
  RegistrationNumber,
}

impl UniqueField {
  /// The field holding allocated identifiers of `kind`.
  pub fn for_id(kind: IdKind) -> Self {
    match kind {
      IdKind::Application => UniqueField::ApplicationId,
      IdKind::Vehicle => UniqueField::VehicleId,
      IdKind::Officer => UniqueField::BadgeNumber,
    }
  }

  /// `true` for fields whose values the registry allocates itself.
  pub fn is_allocated(self) -> bool {
    matches!(
      self,
      UniqueField::ApplicationId | UniqueField::VehicleId | UniqueField::BadgeNumber
    )
  }
}

/// Backend errors must say when an insert hit a uniqueness constraint.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn unique_violation(&self) -> Option<UniqueField>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a permit registry backend.
///
/// Timeline entries are append-only. Status changes go exclusively through
/// [`PermitStore::apply_transition`], which updates the status and appends
/// the entry as one unit and only if the stored status still equals
/// `expected`.
///
/// Methods returning `bool` report whether a row matched; `false` means the
/// entity is absent (or, for compare-and-set methods, that it changed).
pub trait PermitStore: Send + Sync {
  type Error: StoreError;

  // ── Unique lookups ────────────────────────────────────────────────────

  /// `true` if any record already holds `value` in `field`.
  fn unique_exists(
    &self,
    field: UniqueField,
    value: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Principals ────────────────────────────────────────────────────────

  fn insert_principal(
    &self,
    principal: Principal,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_principal(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  /// Look a principal up by its login identifier within `pool`. `login` is
  /// expected to be normalised already.
  fn find_principal(
    &self,
    pool: PrincipalPool,
    login: String,
  ) -> impl Future<Output = Result<Option<Principal>, Self::Error>> + Send + '_;

  fn set_principal_status(
    &self,
    id: Uuid,
    status: PrincipalStatus,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  fn record_login(
    &self,
    id: Uuid,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn count_principals(
    &self,
    filter: PrincipalFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Officers are ordered by badge number, other principals newest first;
  /// ties broken by `principal_id`.
  fn list_principals(
    &self,
    filter: PrincipalFilter,
    skip: u64,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Principal>, Self::Error>> + Send + '_;

  // ── Applications ──────────────────────────────────────────────────────

  /// Insert an application with its seed timeline.
  fn insert_application(
    &self,
    application: Application,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_application(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Application>, Self::Error>> + Send + '_;

  fn count_applications(
    &self,
    filter: ApplicationFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn list_applications(
    &self,
    filter: ApplicationFilter,
    skip: u64,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Application>, Self::Error>> + Send + '_;

  /// Merge `patch` over the stored free-form fields and append `entry`, as
  /// one transaction. Keys in `patch` replace stored keys; others are kept.
  fn merge_application_fields(
    &self,
    id: String,
    patch: serde_json::Map<String, serde_json::Value>,
    entry: TimelineEntry,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete only if the stored status still equals `expected_status`.
  fn delete_application(
    &self,
    id: String,
    expected_status: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Vehicles ──────────────────────────────────────────────────────────

  fn insert_vehicle(
    &self,
    vehicle: Vehicle,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_vehicle(
    &self,
    id: String,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + '_;

  fn find_vehicle_by_registration(
    &self,
    registration_number: String,
  ) -> impl Future<Output = Result<Option<Vehicle>, Self::Error>> + Send + '_;

  fn count_vehicles(
    &self,
    filter: VehicleFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  fn list_vehicles(
    &self,
    filter: VehicleFilter,
    skip: u64,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Vehicle>, Self::Error>> + Send + '_;

  /// Apply `patch` to the stored details as one transaction.
  fn update_vehicle_details(
    &self,
    id: String,
    patch: VehicleDetailsPatch,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Delete only if the stored status still equals `expected_status`.
  fn delete_vehicle(
    &self,
    id: String,
    expected_status: String,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Violations ────────────────────────────────────────────────────────

  fn insert_violation(
    &self,
    violation: Violation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_violation(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Violation>, Self::Error>> + Send + '_;

  fn count_violations(
    &self,
    filter: ViolationFilter,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Newest first by `date`, ties broken by `violation_id`.
  fn list_violations(
    &self,
    filter: ViolationFilter,
    skip: u64,
    limit: u32,
  ) -> impl Future<Output = Result<Vec<Violation>, Self::Error>> + Send + '_;

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Compare-and-set the status of an application, vehicle, or violation
  /// from `expected` to `next` and append `entry`, atomically.
  fn apply_transition(
    &self,
    kind: EntityKind,
    id: String,
    expected: String,
    next: String,
    entry: TimelineEntry,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Append a timeline entry without touching the status.
  fn append_annotation(
    &self,
    kind: EntityKind,
    id: String,
    entry: TimelineEntry,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Record a file store reference in a document slot, replacing any
  /// previous reference in that slot. Other slots are left as stored.
  fn attach_file(
    &self,
    kind: EntityKind,
    id: String,
    slot: String,
    reference: String,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
