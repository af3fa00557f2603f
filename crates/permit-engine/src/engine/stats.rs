//! Dashboard counts, scoped to the caller the same way listings are.

use std::collections::BTreeMap;

use permit_core::{
  Result,
  application::{ApplicationFilter, ApplicationStatus},
  collaborator::Notifier,
  lifecycle::StatusMachine,
  principal::{Principal, PrincipalFilter, Role},
  store::PermitStore,
  vehicle::{VehicleFilter, VehicleStatus},
  violation::{ViolationFilter, ViolationStatus},
};
use serde::Serialize;

use super::{Engine, scope_owner};
use crate::store_err;

/// A total plus one count per stored status, keyed by status label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
  pub total:     u64,
  pub by_status: BTreeMap<String, u64>,
}

impl StatusCounts {
  fn add(&mut self, status: &str, n: u64) {
    self.total += n;
    self.by_status.insert(status.to_owned(), n);
  }

  pub fn get(&self, status: &str) -> u64 { self.by_status.get(status).copied().unwrap_or(0) }
}

/// Registry-wide totals an administrator sees on top of the entity counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryTotals {
  pub operators:         u64,
  pub officers:          u64,
  pub unpaid_violations: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
  pub applications: StatusCounts,
  pub vehicles:     StatusCounts,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub registry:     Option<RegistryTotals>,
}

impl<S: PermitStore, N: Notifier> Engine<S, N> {
  /// Application and vehicle counts by status. Operators see their own
  /// records only; administrators see the whole registry and its totals.
  #[tracing::instrument(skip_all, fields(actor = %actor.principal_id))]
  pub async fn dashboard_stats(&self, actor: &Principal) -> Result<DashboardStats> {
    let owner_id = scope_owner(actor, None)?;

    let mut applications = StatusCounts::default();
    for status in ApplicationStatus::stored_statuses() {
      let filter = ApplicationFilter { status: Some(status), owner_id, ..Default::default() };
      let n = self
        .store
        .count_applications(filter)
        .await
        .map_err(store_err)?;
      applications.add(status.as_ref(), n);
    }

    let mut vehicles = StatusCounts::default();
    for status in VehicleStatus::stored_statuses() {
      let filter = VehicleFilter { status: Some(status), owner_id, ..Default::default() };
      let n = self.store.count_vehicles(filter).await.map_err(store_err)?;
      vehicles.add(status.as_ref(), n);
    }

    let registry = match actor.role {
      Role::Admin => Some(self.registry_totals().await?),
      Role::Operator | Role::Officer => None,
    };

    Ok(DashboardStats { applications, vehicles, registry })
  }

  async fn registry_totals(&self) -> Result<RegistryTotals> {
    let with_role =
      |role: Role| PrincipalFilter { role: Some(role), ..Default::default() };
    let operators = self
      .store
      .count_principals(with_role(Role::Operator))
      .await
      .map_err(store_err)?;
    let officers = self
      .store
      .count_principals(with_role(Role::Officer))
      .await
      .map_err(store_err)?;
    let unpaid_violations = self
      .store
      .count_violations(ViolationFilter {
        status: Some(ViolationStatus::Unpaid),
        ..Default::default()
      })
      .await
      .map_err(store_err)?;

    Ok(RegistryTotals { operators, officers, unpaid_violations })
  }
}
