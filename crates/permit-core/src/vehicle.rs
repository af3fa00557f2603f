//! Vehicles registered by operators.

use std::collections::BTreeMap;

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
pub enum VehicleStatus {
  PendingApproval,
  UnderReview,
  Approved,
  Active,
  Rejected,
}

/// Descriptive and audit-relevant vehicle fields, supplied at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleDetails {
  pub make:                  String,
  pub model:                 String,
  pub year:                  u16,
  pub capacity:              u16,
  pub operating_route:       Option<String>,
  pub driver_name:           Option<String>,
  pub driver_license_number: Option<String>,
  pub driver_license_expiry: Option<NaiveDate>,
  pub insurance_company:     Option<String>,
  pub insurance_expiry:      Option<NaiveDate>,
  pub roadworthy_expiry:     Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
  pub vehicle_id:          String,
  pub owner_id:            Uuid,
  /// Upper-cased and trimmed; unique.
  pub registration_number: String,
  pub status:              VehicleStatus,
  #[serde(flatten)]
  pub details:             VehicleDetails,
  pub uploaded_files:      BTreeMap<String, String>,
  pub timeline:            Vec<TimelineEntry>,
  pub created_at:          DateTime<Utc>,
  pub updated_at:          DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewVehicle {
  pub registration_number: String,
  #[serde(flatten)]
  pub details:             VehicleDetails,
}

/// Fields an owner or administrator may change after registration. `None`
/// leaves the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleDetailsPatch {
  pub operating_route:       Option<String>,
  pub driver_name:           Option<String>,
  pub driver_license_number: Option<String>,
  pub driver_license_expiry: Option<NaiveDate>,
  pub insurance_company:     Option<String>,
  pub insurance_expiry:      Option<NaiveDate>,
  pub roadworthy_expiry:     Option<NaiveDate>,
}

impl VehicleDetailsPatch {
  pub fn is_empty(&self) -> bool {
    self.operating_route.is_none()
      && self.driver_name.is_none()
      && self.driver_license_number.is_none()
      && self.driver_license_expiry.is_none()
      && self.insurance_company.is_none()
      && self.insurance_expiry.is_none()
      && self.roadworthy_expiry.is_none()
  }

  /// Overwrite every field the patch carries. A blank route clears it.
  pub fn apply(self, details: &mut VehicleDetails) {
    if let Some(v) = self.operating_route {
      let v = v.trim();
      details.operating_route = (!v.is_empty()).then(|| v.to_owned());
    }
    if let Some(v) = self.driver_name {
      details.driver_name = Some(v);
    }
    if let Some(v) = self.driver_license_number {
      details.driver_license_number = Some(v);
    }
    if let Some(v) = self.driver_license_expiry {
      details.driver_license_expiry = Some(v);
    }
    if let Some(v) = self.insurance_company {
      details.insurance_company = Some(v);
    }
    if let Some(v) = self.insurance_expiry {
      details.insurance_expiry = Some(v);
    }
    if let Some(v) = self.roadworthy_expiry {
      details.roadworthy_expiry = Some(v);
    }
  }
}

/// Upper-case and trim a registration number the way it is stored.
pub fn normalize_registration(raw: &str) -> String {
  raw.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase()
}

/// Listing order. Ties are always broken by `vehicle_id`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleSort {
  #[default]
  RegistrationNumber,
  Newest,
}

#[derive(Debug, Clone, Default)]
pub struct VehicleFilter {
  pub status:   Option<VehicleStatus>,
  pub owner_id: Option<Uuid>,
  /// Case-insensitive substring match on `operating_route`.
  pub route:    Option<String>,
  pub sort:     VehicleSort,
}
