//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings (UTC, microseconds), dates as `YYYY-MM-DD`, times as
//! `HH:MM`. Structured fields (profile, vehicle details, free-form fields,
//! uploaded files) are stored as compact JSON. UUIDs are stored as
//! hyphenated lowercase strings. Status enums use their snake_case names.

use std::{collections::BTreeMap, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use permit_core::{
  application::Application,
  principal::Principal,
  timeline::TimelineEntry,
  vehicle::Vehicle,
  violation::Violation,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width so stored timestamps sort lexicographically.
pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339_opts(SecondsFormat::Micros, true) }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::DateParse(e.to_string()))
}

pub fn encode_time(t: NaiveTime) -> String { t.format("%H:%M").to_string() }

pub fn decode_time(s: &str) -> Result<NaiveTime> {
  NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a strum-backed enum column.
pub fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownValue { column, value: s.to_owned() })
}

pub fn encode_files(files: &BTreeMap<String, String>) -> Result<String> {
  Ok(serde_json::to_string(files)?)
}

pub fn decode_files(s: &str) -> Result<BTreeMap<String, String>> { Ok(serde_json::from_str(s)?) }

// ─── Timeline ────────────────────────────────────────────────────────────────

/// Raw `timeline_entries` row.
pub struct RawEntry {
  pub status:      String,
  pub kind:        String,
  pub date:        String,
  pub time:        String,
  pub description: String,
  pub comment:     Option<String>,
  pub updated_by:  Option<String>,
}

impl RawEntry {
  pub const COLUMNS: &'static str = "status, kind, date, time, description, comment, updated_by";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      status:      row.get(0)?,
      kind:        row.get(1)?,
      date:        row.get(2)?,
      time:        row.get(3)?,
      description: row.get(4)?,
      comment:     row.get(5)?,
      updated_by:  row.get(6)?,
    })
  }

  pub fn encode(entry: &TimelineEntry) -> Self {
    Self {
      status:      entry.status.clone(),
      kind:        entry.kind.as_ref().to_owned(),
      date:        encode_date(entry.date),
      time:        encode_time(entry.time),
      description: entry.description.clone(),
      comment:     entry.comment.clone(),
      updated_by:  entry.updated_by.map(encode_uuid),
    }
  }

  pub fn into_entry(self) -> Result<TimelineEntry> {
    Ok(TimelineEntry {
      status:      self.status,
      kind:        decode_enum("timeline_entries.kind", &self.kind)?,
      date:        decode_date(&self.date)?,
      time:        decode_time(&self.time)?,
      description: self.description,
      comment:     self.comment,
      updated_by:  self.updated_by.as_deref().map(decode_uuid).transpose()?,
    })
  }
}

fn decode_timeline(raw: Vec<RawEntry>) -> Result<Vec<TimelineEntry>> {
  raw.into_iter().map(RawEntry::into_entry).collect()
}

// ─── Principal ───────────────────────────────────────────────────────────────

pub struct RawPrincipal {
  pub principal_id:  String,
  pub role:          String,
  pub status:        String,
  pub email:         String,
  pub badge_number:  Option<String>,
  pub password_hash: String,
  pub profile_json:  String,
  pub created_at:    String,
  pub updated_at:    String,
  pub last_login:    Option<String>,
}

impl RawPrincipal {
  pub const COLUMNS: &'static str = "principal_id, role, status, email, badge_number, \
     password_hash, profile_json, created_at, updated_at, last_login";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      principal_id:  row.get(0)?,
      role:          row.get(1)?,
      status:        row.get(2)?,
      email:         row.get(3)?,
      badge_number:  row.get(4)?,
      password_hash: row.get(5)?,
      profile_json:  row.get(6)?,
      created_at:    row.get(7)?,
      updated_at:    row.get(8)?,
      last_login:    row.get(9)?,
    })
  }

  pub fn encode(p: &Principal) -> Result<Self> {
    Ok(Self {
      principal_id:  encode_uuid(p.principal_id),
      role:          p.role.as_ref().to_owned(),
      status:        p.status.as_ref().to_owned(),
      email:         p.email.clone(),
      badge_number:  p.badge_number.clone(),
      password_hash: p.password_hash.clone(),
      profile_json:  serde_json::to_string(&p.profile)?,
      created_at:    encode_dt(p.created_at),
      updated_at:    encode_dt(p.updated_at),
      last_login:    p.last_login.map(encode_dt),
    })
  }

  pub fn into_principal(self) -> Result<Principal> {
    Ok(Principal {
      principal_id:  decode_uuid(&self.principal_id)?,
      role:          decode_enum("principals.role", &self.role)?,
      status:        decode_enum("principals.status", &self.status)?,
      email:         self.email,
      badge_number:  self.badge_number,
      password_hash: self.password_hash,
      profile:       serde_json::from_str(&self.profile_json)?,
      created_at:    decode_dt(&self.created_at)?,
      updated_at:    decode_dt(&self.updated_at)?,
      last_login:    self.last_login.as_deref().map(decode_dt).transpose()?,
    })
  }
}

// ─── Application ─────────────────────────────────────────────────────────────

pub struct RawApplication {
  pub application_id: String,
  pub owner_id:       String,
  pub status:         String,
  pub route_from:     String,
  pub route_to:       String,
  pub fields_json:    String,
  pub files_json:     String,
  pub created_at:     String,
  pub updated_at:     String,
  pub timeline:       Vec<RawEntry>,
}

impl RawApplication {
  pub const COLUMNS: &'static str = "application_id, owner_id, status, route_from, route_to, \
     fields_json, files_json, created_at, updated_at";

  /// Build from a row; the timeline is loaded separately.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      application_id: row.get(0)?,
      owner_id:       row.get(1)?,
      status:         row.get(2)?,
      route_from:     row.get(3)?,
      route_to:       row.get(4)?,
      fields_json:    row.get(5)?,
      files_json:     row.get(6)?,
      created_at:     row.get(7)?,
      updated_at:     row.get(8)?,
      timeline:       Vec::new(),
    })
  }

  pub fn encode(a: &Application) -> Result<Self> {
    Ok(Self {
      application_id: a.application_id.clone(),
      owner_id:       encode_uuid(a.owner_id),
      status:         a.status.as_ref().to_owned(),
      route_from:     a.route_from.clone(),
      route_to:       a.route_to.clone(),
      fields_json:    serde_json::to_string(&a.fields)?,
      files_json:     encode_files(&a.uploaded_files)?,
      created_at:     encode_dt(a.created_at),
      updated_at:     encode_dt(a.updated_at),
      timeline:       a.timeline.iter().map(RawEntry::encode).collect(),
    })
  }

  pub fn into_application(self) -> Result<Application> {
    Ok(Application {
      application_id: self.application_id,
      owner_id:       decode_uuid(&self.owner_id)?,
      status:         decode_enum("applications.status", &self.status)?,
      route_from:     self.route_from,
      route_to:       self.route_to,
      fields:         serde_json::from_str(&self.fields_json)?,
      uploaded_files: decode_files(&self.files_json)?,
      timeline:       decode_timeline(self.timeline)?,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Vehicle ─────────────────────────────────────────────────────────────────

pub struct RawVehicle {
  pub vehicle_id:          String,
  pub owner_id:            String,
  pub registration_number: String,
  pub status:              String,
  pub operating_route:     Option<String>,
  pub details_json:        String,
  pub files_json:          String,
  pub created_at:          String,
  pub updated_at:          String,
  pub timeline:            Vec<RawEntry>,
}

impl RawVehicle {
  pub const COLUMNS: &'static str = "vehicle_id, owner_id, registration_number, status, \
     operating_route, details_json, files_json, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vehicle_id:          row.get(0)?,
      owner_id:            row.get(1)?,
      registration_number: row.get(2)?,
      status:              row.get(3)?,
      operating_route:     row.get(4)?,
      details_json:        row.get(5)?,
      files_json:          row.get(6)?,
      created_at:          row.get(7)?,
      updated_at:          row.get(8)?,
      timeline:            Vec::new(),
    })
  }

  pub fn encode(v: &Vehicle) -> Result<Self> {
    Ok(Self {
      vehicle_id:          v.vehicle_id.clone(),
      owner_id:            encode_uuid(v.owner_id),
      registration_number: v.registration_number.clone(),
      status:              v.status.as_ref().to_owned(),
      operating_route:     v.details.operating_route.clone(),
      details_json:        serde_json::to_string(&v.details)?,
      files_json:          encode_files(&v.uploaded_files)?,
      created_at:          encode_dt(v.created_at),
      updated_at:          encode_dt(v.updated_at),
      timeline:            v.timeline.iter().map(RawEntry::encode).collect(),
    })
  }

  pub fn into_vehicle(self) -> Result<Vehicle> {
    Ok(Vehicle {
      vehicle_id:          self.vehicle_id,
      owner_id:            decode_uuid(&self.owner_id)?,
      registration_number: self.registration_number,
      status:              decode_enum("vehicles.status", &self.status)?,
      details:             serde_json::from_str(&self.details_json)?,
      uploaded_files:      decode_files(&self.files_json)?,
      timeline:            decode_timeline(self.timeline)?,
      created_at:          decode_dt(&self.created_at)?,
      updated_at:          decode_dt(&self.updated_at)?,
    })
  }
}

// ─── Violation ───────────────────────────────────────────────────────────────

pub struct RawViolation {
  pub violation_id: String,
  pub vehicle_id:   String,
  pub officer_id:   String,
  pub description:  String,
  pub fine:         i64,
  pub status:       String,
  pub date:         String,
  pub created_at:   String,
  pub updated_at:   String,
  pub timeline:     Vec<RawEntry>,
}

impl RawViolation {
  pub const COLUMNS: &'static str = "violation_id, vehicle_id, officer_id, description, fine, \
     status, date, created_at, updated_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      violation_id: row.get(0)?,
      vehicle_id:   row.get(1)?,
      officer_id:   row.get(2)?,
      description:  row.get(3)?,
      fine:         row.get(4)?,
      status:       row.get(5)?,
      date:         row.get(6)?,
      created_at:   row.get(7)?,
      updated_at:   row.get(8)?,
      timeline:     Vec::new(),
    })
  }

  pub fn encode(v: &Violation) -> Self {
    Self {
      violation_id: encode_uuid(v.violation_id),
      vehicle_id:   v.vehicle_id.clone(),
      officer_id:   encode_uuid(v.officer_id),
      description:  v.description.clone(),
      fine:         i64::try_from(v.fine).unwrap_or(i64::MAX),
      status:       v.status.as_ref().to_owned(),
      date:         encode_date(v.date),
      created_at:   encode_dt(v.created_at),
      updated_at:   encode_dt(v.updated_at),
      timeline:     v.timeline.iter().map(RawEntry::encode).collect(),
    }
  }

  pub fn into_violation(self) -> Result<Violation> {
    Ok(Violation {
      violation_id: decode_uuid(&self.violation_id)?,
      vehicle_id:   self.vehicle_id,
      officer_id:   decode_uuid(&self.officer_id)?,
      description:  self.description,
      fine:         u64::try_from(self.fine).map_err(|_| Error::UnknownValue {
        column: "violations.fine",
        value:  self.fine.to_string(),
      })?,
      status:       decode_enum("violations.status", &self.status)?,
      date:         decode_date(&self.date)?,
      timeline:     decode_timeline(self.timeline)?,
      created_at:   decode_dt(&self.created_at)?,
      updated_at:   decode_dt(&self.updated_at)?,
    })
  }
}
