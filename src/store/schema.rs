use anyhow::{Context, Result};
use rusqlite::{Connection, params};

pub const DB_SCHEMA_VERSION: &str = "0.1.0";

pub fn ensure_schema(connection: &Connection) -> Result<()> {
    connection
        .execute_batch(
            "
            CREATE TABLE IF NOT EXISTS metadata (
              key TEXT PRIMARY KEY,
              value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS verses (
              verse_id INTEGER PRIMARY KEY,
              rank INTEGER NOT NULL,
              reference TEXT NOT NULL DEFAULT '',
              scripture_verse_id INTEGER,
              scripture_rank INTEGER,
              mass INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lections (
              lection_id INTEGER PRIMARY KEY,
              description TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS lection_verses (
              lection_id INTEGER NOT NULL,
              verse_id INTEGER NOT NULL,
              verse_order INTEGER NOT NULL,
              cumulative_mass_from_lection_start INTEGER NOT NULL DEFAULT 0,
              PRIMARY KEY(lection_id, verse_id),
              FOREIGN KEY(lection_id) REFERENCES lections(lection_id),
              FOREIGN KEY(verse_id) REFERENCES verses(verse_id)
            );

            CREATE TABLE IF NOT EXISTS systems (
              system_id INTEGER PRIMARY KEY,
              name TEXT NOT NULL UNIQUE
            );

            CREATE TABLE IF NOT EXISTS memberships (
              membership_id INTEGER PRIMARY KEY,
              system_id INTEGER NOT NULL,
              lection_id INTEGER NOT NULL,
              sort_order INTEGER NOT NULL,
              day_id INTEGER,
              day_description TEXT NOT NULL DEFAULT '',
              order_on_day INTEGER NOT NULL DEFAULT 0,
              cumulative_mass_lections INTEGER,
              FOREIGN KEY(system_id) REFERENCES systems(system_id),
              FOREIGN KEY(lection_id) REFERENCES lections(lection_id)
            );

            CREATE INDEX IF NOT EXISTS idx_memberships_system_order
              ON memberships(system_id, sort_order, day_id, order_on_day);

            CREATE TABLE IF NOT EXISTS witnesses (
              witness_id INTEGER PRIMARY KEY AUTOINCREMENT,
              siglum TEXT NOT NULL UNIQUE,
              kind TEXT NOT NULL,
              system_id INTEGER
            );

            CREATE TABLE IF NOT EXISTS transcriptions (
              witness_id INTEGER NOT NULL,
              verse_key INTEGER NOT NULL,
              text TEXT NOT NULL,
              PRIMARY KEY(witness_id, verse_key),
              FOREIGN KEY(witness_id) REFERENCES witnesses(witness_id)
            );
            ",
        )
        .context("failed to create schema")?;

    connection
        .execute(
            "
            INSERT INTO metadata(key, value) VALUES('db_schema_version', ?1)
            ON CONFLICT(key) DO UPDATE SET value=excluded.value
            ",
            params![DB_SCHEMA_VERSION],
        )
        .context("failed to record schema version")?;

    Ok(())
}
