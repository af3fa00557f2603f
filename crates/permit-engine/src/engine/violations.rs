//! Violations issued by officers.

use chrono::Utc;
use permit_core::{
  Error, Result,
  collaborator::{Notification, Notifier},
  error::ValidationError,
  ids::EntityKind,
  lifecycle::StatusMachine,
  pagination::{Page, PageInfo},
  policy::{Capability, authorize},
  principal::{Principal, Role},
  store::PermitStore,
  timeline::{EntryKind, TimelineEntry},
  violation::{NewViolation, Violation, ViolationFilter, ViolationStatus},
};
use tracing::info;
use uuid::Uuid;

use super::{Engine, PageParams, describe, required};
use crate::store_err;

/// Largest fine the store can hold.
const MAX_FINE: u64 = i64::MAX as u64;

impl<S: PermitStore, N: Notifier> Engine<S, N> {
  async fn load_violation(&self, id: Uuid) -> Result<Violation> {
    self
      .store
      .get_violation(id)
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found(EntityKind::Violation, id))
  }

  /// Administrators see every violation, officers those they issued, and
  /// operators those recorded against vehicles they own.
  async fn authorize_violation(&self, actor: &Principal, violation: &Violation) -> Result<()> {
    match actor.role {
      Role::Admin => Ok(()),
      Role::Officer => Ok(authorize(actor, Capability::OwnerOf(violation.officer_id))?),
      Role::Operator => {
        let owner = self
          .store
          .get_vehicle(violation.vehicle_id.clone())
          .await
          .map_err(store_err)?
          .map(|v| v.owner_id);
        match owner {
          Some(owner) => Ok(authorize(actor, Capability::OwnerOf(owner))?),
          None => Ok(authorize(actor, Capability::AdminOrOfficer)?),
        }
      }
    }
  }

  /// Record a violation against a registered vehicle.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %vehicle_id))]
  pub async fn issue_violation(
    &self,
    actor: &Principal,
    vehicle_id: &str,
    input: NewViolation,
  ) -> Result<Violation> {
    authorize(actor, Capability::Officer)?;
    let vehicle = self
      .store
      .get_vehicle(vehicle_id.to_owned())
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found(EntityKind::Vehicle, vehicle_id))?;

    let description = required("description", &input.description)?;
    if input.fine > MAX_FINE {
      return Err(ValidationError::out_of_range("fine", "too large").into());
    }

    let now = Utc::now();
    let seed = TimelineEntry::new(
      EntryKind::Transition,
      ViolationStatus::SEED_LABEL,
      describe(EntityKind::Violation, ViolationStatus::SEED_LABEL),
      now,
    )
    .by(actor.principal_id);

    let violation = Violation {
      violation_id: Uuid::new_v4(),
      vehicle_id: vehicle.vehicle_id,
      officer_id: actor.principal_id,
      description,
      fine: input.fine,
      status: ViolationStatus::INITIAL,
      date: now.date_naive(),
      timeline: vec![seed],
      created_at: now,
      updated_at: now,
    };
    self
      .store
      .insert_violation(violation.clone())
      .await
      .map_err(store_err)?;

    info!(violation_id = %violation.violation_id, fine = violation.fine, "violation issued");
    self
      .notify(Notification::ViolationIssued {
        violation_id: violation.violation_id,
        vehicle_id:   violation.vehicle_id.clone(),
        fine:         violation.fine,
      })
      .await;
    Ok(violation)
  }

  pub async fn get_violation(&self, actor: &Principal, id: Uuid) -> Result<Violation> {
    let found = self.store.get_violation(id).await.map_err(store_err)?;
    match found {
      Some(violation) => {
        self.authorize_violation(actor, &violation).await?;
        Ok(violation)
      }
      None => {
        authorize(actor, Capability::Admin)?;
        Err(Error::not_found(EntityKind::Violation, id))
      }
    }
  }

  /// Officers are scoped to the violations they issued. Operators must name
  /// one of their own vehicles.
  pub async fn list_violations(
    &self,
    actor: &Principal,
    mut filter: ViolationFilter,
    params: PageParams,
  ) -> Result<Page<Violation>> {
    match actor.role {
      Role::Admin => {}
      Role::Officer => filter.officer_id = Some(actor.principal_id),
      Role::Operator => {
        let Some(vehicle_id) = filter.vehicle_id.clone() else {
          return Err(ValidationError::missing("vehicle_id").into());
        };
        let vehicle = self
          .store
          .get_vehicle(vehicle_id.clone())
          .await
          .map_err(store_err)?
          .ok_or_else(|| Error::not_found(EntityKind::Vehicle, vehicle_id))?;
        authorize(actor, Capability::OwnerOf(vehicle.owner_id))?;
      }
    }
    let req = self.page_request(params)?;

    let total = self
      .store
      .count_violations(filter.clone())
      .await
      .map_err(store_err)?;
    let pagination = PageInfo::compute(req, total)?;
    let items = self
      .store
      .list_violations(filter, req.skip(), req.limit)
      .await
      .map_err(store_err)?;
    Ok(Page { items, pagination })
  }

  /// Mark a fine as paid. One way only.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id))]
  pub async fn pay_violation(
    &self,
    actor: &Principal,
    id: Uuid,
    comment: Option<String>,
  ) -> Result<Violation> {
    authorize(actor, Capability::Admin)?;
    let violation = self.load_violation(id).await?;

    let id_str = id.to_string();
    let next = self
      .apply_status(actor, &id_str, violation.status, ViolationStatus::Paid, comment)
      .await?;

    info!(to = %next, "violation paid");
    let owner_id = self
      .store
      .get_vehicle(violation.vehicle_id.clone())
      .await
      .map_err(store_err)?
      .map(|v| v.owner_id);
    self
      .notify(Notification::StatusChanged {
        kind: EntityKind::Violation,
        id: id_str,
        owner_id,
        status: next.to_string(),
      })
      .await;
    self.load_violation(id).await
  }
}
