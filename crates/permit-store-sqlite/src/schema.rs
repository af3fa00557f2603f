//! SQL schema for the permit SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS principals (
    principal_id  TEXT PRIMARY KEY,
    role          TEXT NOT NULL,   -- 'operator' | 'admin' | 'officer'
    status        TEXT NOT NULL,   -- 'active' | 'pending' | 'suspended'
    email         TEXT NOT NULL UNIQUE,
    badge_number  TEXT UNIQUE,     -- officers only
    password_hash TEXT NOT NULL,
    profile_json  TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL,
    last_login    TEXT
);

CREATE TABLE IF NOT EXISTS applications (
    application_id  TEXT PRIMARY KEY,
    owner_id        TEXT NOT NULL,
    status          TEXT NOT NULL,
    route_from      TEXT NOT NULL,
    route_to        TEXT NOT NULL,
    fields_json     TEXT NOT NULL DEFAULT '{}',
    files_json      TEXT NOT NULL DEFAULT '{}',
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vehicles (
    vehicle_id          TEXT PRIMARY KEY,
    owner_id            TEXT NOT NULL,
    registration_number TEXT NOT NULL UNIQUE,
    status              TEXT NOT NULL,
    operating_route     TEXT,
    details_json        TEXT NOT NULL,
    files_json          TEXT NOT NULL DEFAULT '{}',
    created_at          TEXT NOT NULL,
    updated_at          TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS violations (
    violation_id TEXT PRIMARY KEY,
    vehicle_id   TEXT NOT NULL,
    officer_id   TEXT NOT NULL,
    description  TEXT NOT NULL,
    fine         INTEGER NOT NULL CHECK (fine >= 0),
    status       TEXT NOT NULL,
    date         TEXT NOT NULL,
    created_at   TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

-- Timeline entries are strictly append-only.
-- No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS timeline_entries (
    entry_id     INTEGER PRIMARY KEY AUTOINCREMENT,
    entity_kind  TEXT NOT NULL,   -- 'application' | 'vehicle' | 'violation'
    entity_id    TEXT NOT NULL,
    status       TEXT NOT NULL,
    kind         TEXT NOT NULL,   -- 'transition' | 'annotation'
    date         TEXT NOT NULL,
    time         TEXT NOT NULL,
    description  TEXT NOT NULL,
    comment      TEXT,
    updated_by   TEXT
);

CREATE INDEX IF NOT EXISTS timeline_entity_idx    ON timeline_entries(entity_kind, entity_id, entry_id);
CREATE INDEX IF NOT EXISTS principals_role_idx    ON principals(role, status);
CREATE INDEX IF NOT EXISTS applications_owner_idx ON applications(owner_id);
CREATE INDEX IF NOT EXISTS applications_created_idx ON applications(created_at);
CREATE INDEX IF NOT EXISTS vehicles_owner_idx     ON vehicles(owner_id);
CREATE INDEX IF NOT EXISTS violations_vehicle_idx ON violations(vehicle_id);
CREATE INDEX IF NOT EXISTS violations_date_idx    ON violations(date);

PRAGMA user_version = 1;
";
