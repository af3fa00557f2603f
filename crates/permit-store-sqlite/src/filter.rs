//! Translation of listing filters into `WHERE` / `ORDER BY` clauses.
//!
//! Parameters are collected as owned [`Value`]s so the built query can be
//! moved onto the database thread.

use permit_core::{
  application::{ApplicationFilter, ApplicationSort},
  principal::{PrincipalFilter, PrincipalPool, Role},
  vehicle::{VehicleFilter, VehicleSort},
  violation::ViolationFilter,
};
use rusqlite::types::Value;

use crate::encode::encode_uuid;

/// A `WHERE` clause plus an `ORDER BY` and the positional parameters.
#[derive(Debug, Default)]
pub struct SqlFilter {
  clauses:  Vec<&'static str>,
  pub values: Vec<Value>,
  order_by: &'static str,
}

impl SqlFilter {
  fn push(&mut self, clause: &'static str, value: impl Into<Value>) {
    self.clauses.push(clause);
    self.values.push(value.into());
  }

  /// A clause that binds the same value at each of its `slots` placeholders.
  fn push_repeated(&mut self, clause: &'static str, value: String, slots: usize) {
    self.clauses.push(clause);
    self.values.extend(std::iter::repeat_n(Value::Text(value), slots));
  }

  pub fn where_clause(&self) -> String {
    if self.clauses.is_empty() {
      String::new()
    } else {
      format!("WHERE {}", self.clauses.join(" AND "))
    }
  }

  /// `SELECT COUNT(*)` over `table` with this filter.
  pub fn count_sql(&self, table: &str) -> String {
    format!("SELECT COUNT(*) FROM {table} {}", self.where_clause())
  }

  /// A paged `SELECT` over `table`. The caller appends `limit` and `skip` to
  /// the parameters, in that order.
  pub fn page_sql(&self, columns: &str, table: &str) -> String {
    format!(
      "SELECT {columns} FROM {table} {} ORDER BY {} LIMIT ? OFFSET ?",
      self.where_clause(),
      self.order_by
    )
  }

  pub fn paged_values(&self, skip: u64, limit: u32) -> Vec<Value> {
    let mut values = self.values.clone();
    values.push(Value::Integer(i64::from(limit)));
    values.push(Value::Integer(i64::try_from(skip).unwrap_or(i64::MAX)));
    values
  }
}

// ─── Per-listing builders ────────────────────────────────────────────────────

pub fn applications(filter: &ApplicationFilter) -> SqlFilter {
  let mut f = SqlFilter {
    order_by: match filter.sort {
      ApplicationSort::Newest => "created_at DESC, application_id ASC",
      ApplicationSort::Oldest => "created_at ASC, application_id ASC",
    },
    ..Default::default()
  };
  if let Some(status) = filter.status {
    f.push("status = ?", status.as_ref().to_owned());
  }
  if let Some(owner) = filter.owner_id {
    f.push("owner_id = ?", encode_uuid(owner));
  }
  f
}

pub fn vehicles(filter: &VehicleFilter) -> SqlFilter {
  let mut f = SqlFilter {
    order_by: match filter.sort {
      VehicleSort::RegistrationNumber => "registration_number ASC, vehicle_id ASC",
      VehicleSort::Newest => "created_at DESC, vehicle_id ASC",
    },
    ..Default::default()
  };
  if let Some(status) = filter.status {
    f.push("status = ?", status.as_ref().to_owned());
  }
  if let Some(owner) = filter.owner_id {
    f.push("owner_id = ?", encode_uuid(owner));
  }
  if let Some(route) = filter.route.as_deref().map(str::trim).filter(|r| !r.is_empty()) {
    f.push(
      "LOWER(COALESCE(operating_route, '')) LIKE ? ESCAPE '\\'",
      contains_pattern(route),
    );
  }
  f
}

pub fn violations(filter: &ViolationFilter) -> SqlFilter {
  let mut f = SqlFilter {
    order_by: "date DESC, created_at DESC, violation_id ASC",
    ..Default::default()
  };
  if let Some(status) = filter.status {
    f.push("status = ?", status.as_ref().to_owned());
  }
  if let Some(vehicle) = &filter.vehicle_id {
    f.push("vehicle_id = ?", vehicle.clone());
  }
  if let Some(officer) = filter.officer_id {
    f.push("officer_id = ?", encode_uuid(officer));
  }
  f
}

pub fn principals(filter: &PrincipalFilter) -> SqlFilter {
  let officers_only = matches!(filter.role, Some(Role::Officer))
    || (filter.role.is_none() && filter.pool == Some(PrincipalPool::Officers));

  let mut f = SqlFilter {
    order_by: if officers_only {
      "badge_number ASC, principal_id ASC"
    } else {
      "created_at DESC, principal_id ASC"
    },
    ..Default::default()
  };
  match (filter.role, filter.pool) {
    (Some(role), _) => f.push("role = ?", role.as_ref().to_owned()),
    (None, Some(PrincipalPool::Officers)) => {
      f.push("role = ?", Role::Officer.as_ref().to_owned())
    }
    (None, Some(PrincipalPool::Accounts)) => {
      f.push("role <> ?", Role::Officer.as_ref().to_owned())
    }
    (None, None) => {}
  }
  if let Some(status) = filter.status {
    f.push("status = ?", status.as_ref().to_owned());
  }
  if let Some(search) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
    f.push_repeated(PRINCIPAL_SEARCH, contains_pattern(search), 4);
  }
  f
}

/// Case-insensitive match on email, badge number, full name, or company.
const PRINCIPAL_SEARCH: &str = "(LOWER(email) LIKE ? ESCAPE '\\'
  OR LOWER(COALESCE(badge_number, '')) LIKE ? ESCAPE '\\'
  OR LOWER(json_extract(profile_json, '$.first_name') || ' ' ||
           json_extract(profile_json, '$.last_name')) LIKE ? ESCAPE '\\'
  OR LOWER(COALESCE(json_extract(profile_json, '$.company_name'), '')) LIKE ? ESCAPE '\\')";

/// `%needle%` for a `LIKE … ESCAPE '\'`, lower-cased, with the wildcard
/// characters in `needle` matched literally.
fn contains_pattern(needle: &str) -> String {
  let mut pattern = String::with_capacity(needle.len() + 2);
  pattern.push('%');
  for c in needle.to_lowercase().chars() {
    if matches!(c, '%' | '_' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('%');
  pattern
}
