//! Vehicle registration and lifecycle.

use std::collections::BTreeMap;

use bytes::Bytes;
use chrono::{Datelike as _, Utc};
use permit_core::{
  Error, Result,
  collaborator::{FileStore, Notification, Notifier},
  error::{ConflictError, ValidationError},
  ids::{EntityKind, IdKind},
  lifecycle::{StatusMachine, check_vehicle_deletable},
  pagination::{Page, PageInfo},
  policy::{Capability, authorize},
  principal::Principal,
  store::{PermitStore, UniqueField},
  timeline::{EntryKind, TimelineEntry},
  vehicle::{
    NewVehicle, Vehicle, VehicleDetails, VehicleDetailsPatch, VehicleFilter, VehicleStatus,
    normalize_registration,
  },
};
use tracing::info;

use super::{Engine, PageParams, describe, required, resolve_owned, scope_owner};
use crate::store_err;

const MIN_YEAR: u16 = 1900;

fn check_details(mut details: VehicleDetails) -> Result<VehicleDetails, ValidationError> {
  details.make = required("make", &details.make)?;
  details.model = required("model", &details.model)?;

  let max_year = u16::try_from(Utc::now().year() + 1).unwrap_or(u16::MAX);
  if !(MIN_YEAR..=max_year).contains(&details.year) {
    return Err(ValidationError::out_of_range(
      "year",
      format!("must be between {MIN_YEAR} and {max_year}"),
    ));
  }
  if details.capacity == 0 {
    return Err(ValidationError::out_of_range("capacity", "must be at least 1"));
  }
  details.operating_route = details
    .operating_route
    .map(|r| r.trim().to_owned())
    .filter(|r| !r.is_empty());
  Ok(details)
}

impl<S: PermitStore, N: Notifier> Engine<S, N> {
  async fn load_vehicle(&self, id: &str) -> Result<Vehicle> {
    self
      .store
      .get_vehicle(id.to_owned())
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found(EntityKind::Vehicle, id))
  }

  async fn owned_vehicle(&self, actor: &Principal, id: &str) -> Result<Vehicle> {
    let found = self
      .store
      .get_vehicle(id.to_owned())
      .await
      .map_err(store_err)?;
    resolve_owned(actor, found, |v| v.owner_id, EntityKind::Vehicle, id)
  }

  /// Register a vehicle owned by `actor`.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id))]
  pub async fn register_vehicle(&self, actor: &Principal, input: NewVehicle) -> Result<Vehicle> {
    authorize(actor, Capability::Authenticated)?;
    let registration_number = normalize_registration(&input.registration_number);
    if registration_number.is_empty() {
      return Err(ValidationError::missing("registration_number").into());
    }
    let details = check_details(input.details)?;

    let taken = self
      .store
      .unique_exists(UniqueField::RegistrationNumber, registration_number.clone())
      .await
      .map_err(store_err)?;
    if taken {
      return Err(ConflictError::Duplicate(UniqueField::RegistrationNumber.to_string()).into());
    }

    let now = Utc::now();
    let seed = TimelineEntry::new(
      EntryKind::Transition,
      VehicleStatus::SEED_LABEL,
      describe(EntityKind::Vehicle, VehicleStatus::SEED_LABEL),
      now,
    )
    .by(actor.principal_id);

    let vehicle = self
      .insert_allocated(
        IdKind::Vehicle,
        |vehicle_id| Vehicle {
          vehicle_id,
          owner_id: actor.principal_id,
          registration_number: registration_number.clone(),
          status: VehicleStatus::INITIAL,
          details: details.clone(),
          uploaded_files: BTreeMap::new(),
          timeline: vec![seed.clone()],
          created_at: now,
          updated_at: now,
        },
        |vehicle| self.store.insert_vehicle(vehicle),
      )
      .await?;

    info!(vehicle_id = %vehicle.vehicle_id, registration = %vehicle.registration_number, "vehicle registered");
    self
      .notify(Notification::VehicleRegistered {
        vehicle_id: vehicle.vehicle_id.clone(),
        owner_id:   vehicle.owner_id,
      })
      .await;
    Ok(vehicle)
  }

  pub async fn get_vehicle(&self, actor: &Principal, id: &str) -> Result<Vehicle> {
    self.owned_vehicle(actor, id).await
  }

  /// Roadside lookup by registration number.
  pub async fn find_vehicle_by_registration(
    &self,
    actor: &Principal,
    registration_number: &str,
  ) -> Result<Vehicle> {
    authorize(actor, Capability::AdminOrOfficer)?;
    let registration_number = normalize_registration(registration_number);
    self
      .store
      .find_vehicle_by_registration(registration_number.clone())
      .await
      .map_err(store_err)?
      .ok_or_else(|| Error::not_found(EntityKind::Vehicle, registration_number))
  }

  /// Operators only ever see their own vehicles.
  pub async fn list_vehicles(
    &self,
    actor: &Principal,
    mut filter: VehicleFilter,
    params: PageParams,
  ) -> Result<Page<Vehicle>> {
    filter.owner_id = scope_owner(actor, filter.owner_id)?;
    let req = self.page_request(params)?;

    let total = self
      .store
      .count_vehicles(filter.clone())
      .await
      .map_err(store_err)?;
    let pagination = PageInfo::compute(req, total)?;
    let items = self
      .store
      .list_vehicles(filter, req.skip(), req.limit)
      .await
      .map_err(store_err)?;
    Ok(Page { items, pagination })
  }

  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id, %requested))]
  pub async fn transition_vehicle(
    &self,
    actor: &Principal,
    id: &str,
    requested: VehicleStatus,
    comment: Option<String>,
  ) -> Result<Vehicle> {
    authorize(actor, Capability::Admin)?;
    let vehicle = self.load_vehicle(id).await?;

    let from = vehicle.status;
    let next = self.apply_status(actor, id, from, requested, comment).await?;

    info!(%from, to = %next, "vehicle status changed");
    self
      .notify(Notification::StatusChanged {
        kind:     EntityKind::Vehicle,
        id:       id.to_owned(),
        owner_id: Some(vehicle.owner_id),
        status:   next.to_string(),
      })
      .await;
    self.load_vehicle(id).await
  }

  pub async fn comment_vehicle(&self, actor: &Principal, id: &str, text: &str) -> Result<Vehicle> {
    authorize(actor, Capability::Admin)?;
    let vehicle = self.load_vehicle(id).await?;
    self
      .append_comment(actor, EntityKind::Vehicle, id, vehicle.status.as_ref(), text)
      .await?;
    self.load_vehicle(id).await
  }

  /// Update the route, driver, and expiry fields of a vehicle.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id))]
  pub async fn update_vehicle_details(
    &self,
    actor: &Principal,
    id: &str,
    patch: VehicleDetailsPatch,
  ) -> Result<Vehicle> {
    self.owned_vehicle(actor, id).await?;
    if patch.is_empty() {
      return Err(ValidationError::missing("details").into());
    }

    let updated = self
      .store
      .update_vehicle_details(id.to_owned(), patch, Utc::now())
      .await
      .map_err(store_err)?;
    if !updated {
      return Err(Error::not_found(EntityKind::Vehicle, id));
    }

    info!("vehicle details updated");
    self.load_vehicle(id).await
  }

  /// Delete a vehicle that is not currently active.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id))]
  pub async fn delete_vehicle(&self, actor: &Principal, id: &str) -> Result<()> {
    let vehicle = self.owned_vehicle(actor, id).await?;
    check_vehicle_deletable(vehicle.status)?;

    let deleted = self
      .store
      .delete_vehicle(id.to_owned(), vehicle.status.as_ref().to_owned())
      .await
      .map_err(store_err)?;
    if !deleted {
      return Err(
        ConflictError::ConcurrentUpdate { kind: EntityKind::Vehicle, id: id.to_owned() }.into(),
      );
    }

    info!("vehicle deleted");
    Ok(())
  }

  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id, %id, %slot))]
  pub async fn attach_vehicle_document<F: FileStore>(
    &self,
    actor: &Principal,
    files: &F,
    id: &str,
    slot: &str,
    bytes: Bytes,
  ) -> Result<Vehicle> {
    let vehicle = self.owned_vehicle(actor, id).await?;
    let slot = required("slot", slot)?;
    if bytes.is_empty() {
      return Err(ValidationError::missing("file").into());
    }

    let reference = files
      .put(format!("vehicles/{id}/{slot}"), bytes)
      .await
      .map_err(|e| Error::Store(Box::new(e)))?;

    let attached = self
      .store
      .attach_file(EntityKind::Vehicle, id.to_owned(), slot, reference, Utc::now())
      .await
      .map_err(store_err)?;
    if !attached {
      return Err(
        ConflictError::ConcurrentUpdate { kind: EntityKind::Vehicle, id: id.to_owned() }.into(),
      );
    }
    self.load_vehicle(id).await
  }
}
