//! [`SqliteStore`], the SQLite implementation of [`PermitStore`].

use std::{collections::BTreeMap, path::Path};

use chrono::{DateTime, Utc};
use permit_core::{
  application::{Application, ApplicationFilter},
  ids::EntityKind,
  principal::{Principal, PrincipalFilter, PrincipalPool, PrincipalStatus},
  store::{PermitStore, UniqueField},
  timeline::TimelineEntry,
  vehicle::{Vehicle, VehicleDetails, VehicleDetailsPatch, VehicleFilter},
  violation::{Violation, ViolationFilter},
};
use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  encode::{
    RawApplication, RawEntry, RawPrincipal, RawVehicle, RawViolation, encode_dt, encode_uuid,
  },
  filter,
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A permit registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Table and key column of an entity that carries a timeline.
fn tracked_table(kind: EntityKind) -> Result<(&'static str, &'static str)> {
  match kind {
    EntityKind::Application => Ok(("applications", "application_id")),
    EntityKind::Vehicle => Ok(("vehicles", "vehicle_id")),
    EntityKind::Violation => Ok(("violations", "violation_id")),
    other => Err(Error::Untracked(other)),
  }
}

/// Carry a JSON failure out of a database closure.
fn json_err(e: serde_json::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

fn insert_entry(
  conn: &rusqlite::Connection,
  kind: &str,
  id: &str,
  e: &RawEntry,
) -> rusqlite::Result<()> {
  conn.execute(
    "INSERT INTO timeline_entries (
       entity_kind, entity_id, status, kind, date, time, description, comment, updated_by
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    rusqlite::params![
      kind,
      id,
      e.status,
      e.kind,
      e.date,
      e.time,
      e.description,
      e.comment,
      e.updated_by,
    ],
  )?;
  Ok(())
}

fn load_timeline(
  conn: &rusqlite::Connection,
  kind: &str,
  id: &str,
) -> rusqlite::Result<Vec<RawEntry>> {
  let mut stmt = conn.prepare_cached(&format!(
    "SELECT {} FROM timeline_entries
     WHERE entity_kind = ?1 AND entity_id = ?2
     ORDER BY entry_id ASC",
    RawEntry::COLUMNS
  ))?;
  stmt
    .query_map(rusqlite::params![kind, id], RawEntry::from_row)?
    .collect()
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .run(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the database thread, translating constraint failures.
  async fn run<F, R>(&self, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, tokio_rusqlite::Error> + Send + 'static,
    R: Send + 'static,
  {
    self.conn.call(f).await.map_err(Error::from_db)
  }

  async fn count(&self, table: &'static str, f: filter::SqlFilter) -> Result<u64> {
    let n: i64 = self
      .run(move |conn| {
        Ok(conn.query_row(
          &f.count_sql(table),
          rusqlite::params_from_iter(f.values.iter()),
          |row| row.get(0),
        )?)
      })
      .await?;
    Ok(u64::try_from(n).unwrap_or_default())
  }
}

// ─── PermitStore impl ────────────────────────────────────────────────────────

impl PermitStore for SqliteStore {
  type Error = Error;

  // ── Unique lookups ────────────────────────────────────────────────────────

  async fn unique_exists(&self, field: UniqueField, value: String) -> Result<bool> {
    // Allocated identifiers stay taken once they appear in a timeline, even
    // if the entity itself was later deleted.
    let sql = match field {
      UniqueField::Email => "SELECT EXISTS(SELECT 1 FROM principals WHERE email = ?1)",
      UniqueField::BadgeNumber => {
        "SELECT EXISTS(SELECT 1 FROM principals WHERE badge_number = ?1)"
      }
      UniqueField::RegistrationNumber => {
        "SELECT EXISTS(SELECT 1 FROM vehicles WHERE registration_number = ?1)"
      }
      UniqueField::ApplicationId => {
        "SELECT EXISTS(SELECT 1 FROM applications WHERE application_id = ?1)
             OR EXISTS(SELECT 1 FROM timeline_entries
                       WHERE entity_kind = 'application' AND entity_id = ?1)"
      }
      UniqueField::VehicleId => {
        "SELECT EXISTS(SELECT 1 FROM vehicles WHERE vehicle_id = ?1)
             OR EXISTS(SELECT 1 FROM timeline_entries
                       WHERE entity_kind = 'vehicle' AND entity_id = ?1)"
      }
    };

    self
      .run(move |conn| Ok(conn.query_row(sql, rusqlite::params![value], |row| row.get(0))?))
      .await
  }

  // ── Principals ────────────────────────────────────────────────────────────

  async fn insert_principal(&self, principal: Principal) -> Result<()> {
    let raw = RawPrincipal::encode(&principal)?;

    self
      .run(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO principals ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            RawPrincipal::COLUMNS
          ),
          rusqlite::params![
            raw.principal_id,
            raw.role,
            raw.status,
            raw.email,
            raw.badge_number,
            raw.password_hash,
            raw.profile_json,
            raw.created_at,
            raw.updated_at,
            raw.last_login,
          ],
        )?;
        Ok(())
      })
      .await
  }

  async fn get_principal(&self, id: Uuid) -> Result<Option<Principal>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawPrincipal> = self
      .run(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM principals WHERE principal_id = ?1",
                RawPrincipal::COLUMNS
              ),
              rusqlite::params![id_str],
              RawPrincipal::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrincipal::into_principal).transpose()
  }

  async fn find_principal(&self, pool: PrincipalPool, login: String) -> Result<Option<Principal>> {
    let sql = match pool {
      PrincipalPool::Accounts => format!(
        "SELECT {} FROM principals WHERE email = ?1 AND role <> 'officer'",
        RawPrincipal::COLUMNS
      ),
      PrincipalPool::Officers => format!(
        "SELECT {} FROM principals WHERE badge_number = ?1 AND role = 'officer'",
        RawPrincipal::COLUMNS
      ),
    };

    let raw: Option<RawPrincipal> = self
      .run(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params![login], RawPrincipal::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawPrincipal::into_principal).transpose()
  }

  async fn set_principal_status(
    &self,
    id: Uuid,
    status: PrincipalStatus,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str = encode_uuid(id);
    let status_str = status.as_ref().to_owned();
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        let n = conn.execute(
          "UPDATE principals SET status = ?1, updated_at = ?2 WHERE principal_id = ?3",
          rusqlite::params![status_str, at_str, id_str],
        )?;
        Ok(n > 0)
      })
      .await
  }

  async fn record_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<()> {
    let id_str = encode_uuid(id);
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        conn.execute(
          "UPDATE principals SET last_login = ?1 WHERE principal_id = ?2",
          rusqlite::params![at_str, id_str],
        )?;
        Ok(())
      })
      .await
  }

  async fn count_principals(&self, filter: PrincipalFilter) -> Result<u64> {
    self.count("principals", filter::principals(&filter)).await
  }

  async fn list_principals(
    &self,
    filter: PrincipalFilter,
    skip: u64,
    limit: u32,
  ) -> Result<Vec<Principal>> {
    let f = filter::principals(&filter);

    let raws: Vec<RawPrincipal> = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&f.page_sql(RawPrincipal::COLUMNS, "principals"))?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(f.paged_values(skip, limit).iter()),
            RawPrincipal::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPrincipal::into_principal).collect()
  }

  // ── Applications ──────────────────────────────────────────────────────────

  async fn insert_application(&self, application: Application) -> Result<()> {
    let raw = RawApplication::encode(&application)?;

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO applications ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            RawApplication::COLUMNS
          ),
          rusqlite::params![
            raw.application_id,
            raw.owner_id,
            raw.status,
            raw.route_from,
            raw.route_to,
            raw.fields_json,
            raw.files_json,
            raw.created_at,
            raw.updated_at,
          ],
        )?;
        for entry in &raw.timeline {
          insert_entry(&tx, "application", &raw.application_id, entry)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn get_application(&self, id: String) -> Result<Option<Application>> {
    let raw: Option<RawApplication> = self
      .run(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {} FROM applications WHERE application_id = ?1",
              RawApplication::COLUMNS
            ),
            rusqlite::params![id],
            RawApplication::from_row,
          )
          .optional()?;
        let Some(mut raw) = raw else { return Ok(None) };
        raw.timeline = load_timeline(conn, "application", &raw.application_id)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawApplication::into_application).transpose()
  }

  async fn count_applications(&self, filter: ApplicationFilter) -> Result<u64> {
    self.count("applications", filter::applications(&filter)).await
  }

  async fn list_applications(
    &self,
    filter: ApplicationFilter,
    skip: u64,
    limit: u32,
  ) -> Result<Vec<Application>> {
    let f = filter::applications(&filter);

    let raws: Vec<RawApplication> = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&f.page_sql(RawApplication::COLUMNS, "applications"))?;
        let mut rows = stmt
          .query_map(
            rusqlite::params_from_iter(f.paged_values(skip, limit).iter()),
            RawApplication::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.timeline = load_timeline(conn, "application", &raw.application_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawApplication::into_application).collect()
  }

  async fn merge_application_fields(
    &self,
    id: String,
    patch: serde_json::Map<String, serde_json::Value>,
    entry: TimelineEntry,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let raw_entry = RawEntry::encode(&entry);
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
          .query_row(
            "SELECT fields_json FROM applications WHERE application_id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(current) = current else { return Ok(false) };

        let mut fields: serde_json::Map<String, serde_json::Value> =
          serde_json::from_str(&current).map_err(json_err)?;
        fields.extend(patch);
        let fields_json = serde_json::to_string(&fields).map_err(json_err)?;

        tx.execute(
          "UPDATE applications SET fields_json = ?1, updated_at = ?2 WHERE application_id = ?3",
          rusqlite::params![fields_json, at_str, id],
        )?;
        insert_entry(&tx, "application", &id, &raw_entry)?;
        tx.commit()?;
        Ok(true)
      })
      .await
  }

  async fn delete_application(&self, id: String, expected_status: String) -> Result<bool> {
    self
      .run(move |conn| {
        let n = conn.execute(
          "DELETE FROM applications WHERE application_id = ?1 AND status = ?2",
          rusqlite::params![id, expected_status],
        )?;
        Ok(n > 0)
      })
      .await
  }

  // ── Vehicles ──────────────────────────────────────────────────────────────

  async fn insert_vehicle(&self, vehicle: Vehicle) -> Result<()> {
    let raw = RawVehicle::encode(&vehicle)?;

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO vehicles ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            RawVehicle::COLUMNS
          ),
          rusqlite::params![
            raw.vehicle_id,
            raw.owner_id,
            raw.registration_number,
            raw.status,
            raw.operating_route,
            raw.details_json,
            raw.files_json,
            raw.created_at,
            raw.updated_at,
          ],
        )?;
        for entry in &raw.timeline {
          insert_entry(&tx, "vehicle", &raw.vehicle_id, entry)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn get_vehicle(&self, id: String) -> Result<Option<Vehicle>> {
    self.find_vehicle_where("vehicle_id", id).await
  }

  async fn find_vehicle_by_registration(&self, registration_number: String) -> Result<Option<Vehicle>> {
    self
      .find_vehicle_where("registration_number", registration_number)
      .await
  }

  async fn count_vehicles(&self, filter: VehicleFilter) -> Result<u64> {
    self.count("vehicles", filter::vehicles(&filter)).await
  }

  async fn list_vehicles(&self, filter: VehicleFilter, skip: u64, limit: u32) -> Result<Vec<Vehicle>> {
    let f = filter::vehicles(&filter);

    let raws: Vec<RawVehicle> = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&f.page_sql(RawVehicle::COLUMNS, "vehicles"))?;
        let mut rows = stmt
          .query_map(
            rusqlite::params_from_iter(f.paged_values(skip, limit).iter()),
            RawVehicle::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.timeline = load_timeline(conn, "vehicle", &raw.vehicle_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawVehicle::into_vehicle).collect()
  }

  async fn update_vehicle_details(
    &self,
    id: String,
    patch: VehicleDetailsPatch,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
          .query_row(
            "SELECT details_json FROM vehicles WHERE vehicle_id = ?1",
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(current) = current else { return Ok(false) };

        let mut details: VehicleDetails = serde_json::from_str(&current).map_err(json_err)?;
        patch.apply(&mut details);
        let details_json = serde_json::to_string(&details).map_err(json_err)?;

        tx.execute(
          "UPDATE vehicles
           SET details_json = ?1, operating_route = ?2, updated_at = ?3
           WHERE vehicle_id = ?4",
          rusqlite::params![details_json, details.operating_route, at_str, id],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await
  }

  async fn delete_vehicle(&self, id: String, expected_status: String) -> Result<bool> {
    self
      .run(move |conn| {
        let n = conn.execute(
          "DELETE FROM vehicles WHERE vehicle_id = ?1 AND status = ?2",
          rusqlite::params![id, expected_status],
        )?;
        Ok(n > 0)
      })
      .await
  }

  // ── Violations ────────────────────────────────────────────────────────────

  async fn insert_violation(&self, violation: Violation) -> Result<()> {
    let raw = RawViolation::encode(&violation);

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          &format!(
            "INSERT INTO violations ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            RawViolation::COLUMNS
          ),
          rusqlite::params![
            raw.violation_id,
            raw.vehicle_id,
            raw.officer_id,
            raw.description,
            raw.fine,
            raw.status,
            raw.date,
            raw.created_at,
            raw.updated_at,
          ],
        )?;
        for entry in &raw.timeline {
          insert_entry(&tx, "violation", &raw.violation_id, entry)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await
  }

  async fn get_violation(&self, id: Uuid) -> Result<Option<Violation>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawViolation> = self
      .run(move |conn| {
        let raw = conn
          .query_row(
            &format!(
              "SELECT {} FROM violations WHERE violation_id = ?1",
              RawViolation::COLUMNS
            ),
            rusqlite::params![id_str],
            RawViolation::from_row,
          )
          .optional()?;
        let Some(mut raw) = raw else { return Ok(None) };
        raw.timeline = load_timeline(conn, "violation", &raw.violation_id)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawViolation::into_violation).transpose()
  }

  async fn count_violations(&self, filter: ViolationFilter) -> Result<u64> {
    self.count("violations", filter::violations(&filter)).await
  }

  async fn list_violations(
    &self,
    filter: ViolationFilter,
    skip: u64,
    limit: u32,
  ) -> Result<Vec<Violation>> {
    let f = filter::violations(&filter);

    let raws: Vec<RawViolation> = self
      .run(move |conn| {
        let mut stmt = conn.prepare(&f.page_sql(RawViolation::COLUMNS, "violations"))?;
        let mut rows = stmt
          .query_map(
            rusqlite::params_from_iter(f.paged_values(skip, limit).iter()),
            RawViolation::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut rows {
          raw.timeline = load_timeline(conn, "violation", &raw.violation_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawViolation::into_violation).collect()
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────────

  async fn apply_transition(
    &self,
    kind: EntityKind,
    id: String,
    expected: String,
    next: String,
    entry: TimelineEntry,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let (table, id_col) = tracked_table(kind)?;
    let kind_str = kind.as_ref().to_owned();
    let raw_entry = RawEntry::encode(&entry);
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          &format!(
            "UPDATE {table} SET status = ?1, updated_at = ?2
             WHERE {id_col} = ?3 AND status = ?4"
          ),
          rusqlite::params![next, at_str, id, expected],
        )?;
        // Dropping `tx` without commit rolls back.
        if n == 0 {
          return Ok(false);
        }
        insert_entry(&tx, &kind_str, &id, &raw_entry)?;
        tx.commit()?;
        Ok(true)
      })
      .await
  }

  async fn append_annotation(
    &self,
    kind: EntityKind,
    id: String,
    entry: TimelineEntry,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let (table, id_col) = tracked_table(kind)?;
    let kind_str = kind.as_ref().to_owned();
    let raw_entry = RawEntry::encode(&entry);
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        let tx = conn.transaction()?;
        let n = tx.execute(
          &format!("UPDATE {table} SET updated_at = ?1 WHERE {id_col} = ?2"),
          rusqlite::params![at_str, id],
        )?;
        if n == 0 {
          return Ok(false);
        }
        insert_entry(&tx, &kind_str, &id, &raw_entry)?;
        tx.commit()?;
        Ok(true)
      })
      .await
  }

  async fn attach_file(
    &self,
    kind: EntityKind,
    id: String,
    slot: String,
    reference: String,
    at: DateTime<Utc>,
  ) -> Result<bool> {
    let (table, id_col) = match kind {
      EntityKind::Application | EntityKind::Vehicle => tracked_table(kind)?,
      other => return Err(Error::Untracked(other)),
    };
    let at_str = encode_dt(at);

    self
      .run(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current: Option<String> = tx
          .query_row(
            &format!("SELECT files_json FROM {table} WHERE {id_col} = ?1"),
            rusqlite::params![id],
            |row| row.get(0),
          )
          .optional()?;
        let Some(current) = current else { return Ok(false) };

        let mut files: BTreeMap<String, String> =
          serde_json::from_str(&current).map_err(json_err)?;
        files.insert(slot, reference);
        let files_json = serde_json::to_string(&files).map_err(json_err)?;

        tx.execute(
          &format!("UPDATE {table} SET files_json = ?1, updated_at = ?2 WHERE {id_col} = ?3"),
          rusqlite::params![files_json, at_str, id],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await
  }
}

impl SqliteStore {
  async fn find_vehicle_where(&self, column: &'static str, value: String) -> Result<Option<Vehicle>> {
    let raw: Option<RawVehicle> = self
      .run(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {} FROM vehicles WHERE {column} = ?1", RawVehicle::COLUMNS),
            rusqlite::params![value],
            RawVehicle::from_row,
          )
          .optional()?;
        let Some(mut raw) = raw else { return Ok(None) };
        raw.timeline = load_timeline(conn, "vehicle", &raw.vehicle_id)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawVehicle::into_vehicle).transpose()
  }
}
