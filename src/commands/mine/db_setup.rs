use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::util::now_utc_string;

pub(crate) const DB_SCHEMA_VERSION: &str = "0.1.0";

pub(crate) fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    connection
        .pragma_update(None, "foreign_keys", "ON")
        .context("failed to set foreign_keys=ON")?;
    Ok(())
}

/// Idempotent schema. The UNIQUE constraints on the two lookup tables
/// are load-bearing: concurrent mining runs converge on one row per key
/// through insert-or-ignore plus re-select.
pub(crate) fn ensure_schema(connection: &Connection) -> Result<()> {
    connection.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS metadata (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS wells (
          api TEXT PRIMARY KEY,
          operator_name TEXT,
          updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS well_info (
          api TEXT PRIMARY KEY,
          district_number INTEGER,
          permit_number INTEGER,
          well_number TEXT,
          field_name TEXT,
          lease_name TEXT,
          completion_type TEXT,
          total_depth INTEGER,
          well_type TEXT,
          FOREIGN KEY(api) REFERENCES wells(api)
        );

        CREATE TABLE IF NOT EXISTS locations (
          api TEXT PRIMARY KEY,
          county TEXT,
          section TEXT,
          block TEXT,
          survey TEXT,
          distance_from_town TEXT,
          FOREIGN KEY(api) REFERENCES wells(api)
        );

        CREATE TABLE IF NOT EXISTS casing_enums (
          casing_enum_id INTEGER PRIMARY KEY,
          internal_diameter REAL NOT NULL,
          external_diameter REAL NOT NULL,
          anchor_depth INTEGER NOT NULL DEFAULT 0,
          UNIQUE(internal_diameter, external_diameter)
        );

        CREATE TABLE IF NOT EXISTS mechanical_isolation_enums (
          isolation_enum_id INTEGER PRIMARY KEY,
          isolation_type TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS casings (
          casing_id INTEGER PRIMARY KEY,
          api TEXT NOT NULL,
          casing_enum_id INTEGER NOT NULL,
          top_depth INTEGER,
          bottom_depth INTEGER,
          cement INTEGER,
          FOREIGN KEY(api) REFERENCES wells(api),
          FOREIGN KEY(casing_enum_id) REFERENCES casing_enums(casing_enum_id)
        );

        CREATE TABLE IF NOT EXISTS perforations (
          perforation_id INTEGER PRIMARY KEY,
          api TEXT NOT NULL,
          stage INTEGER NOT NULL,
          top_depth INTEGER,
          bottom_depth INTEGER,
          FOREIGN KEY(api) REFERENCES wells(api)
        );

        CREATE TABLE IF NOT EXISTS plug_schedules (
          plug_schedule_id INTEGER PRIMARY KEY,
          api TEXT NOT NULL,
          isolation_enum_id INTEGER NOT NULL,
          top_depth INTEGER,
          bottom_depth INTEGER,
          FOREIGN KEY(api) REFERENCES wells(api),
          FOREIGN KEY(isolation_enum_id) REFERENCES mechanical_isolation_enums(isolation_enum_id)
        );

        CREATE INDEX IF NOT EXISTS idx_casings_api ON casings(api);
        CREATE INDEX IF NOT EXISTS idx_perforations_api ON perforations(api);
        CREATE INDEX IF NOT EXISTS idx_plug_schedules_api ON plug_schedules(api);
        ",
    )?;

    let now = now_utc_string();
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [DB_SCHEMA_VERSION],
    )?;
    connection.execute(
        "INSERT INTO metadata(key, value) VALUES('db_updated_at', ?1)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        [now],
    )?;

    Ok(())
}
