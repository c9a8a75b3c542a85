use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags};

mod import;
mod load;
mod schema;

pub use import::import_dataset;
pub use load::{load_system, load_witness, resolve_system_id, system_name};
pub use schema::{DB_SCHEMA_VERSION, ensure_schema};

pub const DEFAULT_DB_FILENAME: &str = "lectio.sqlite";

pub fn open_read_write(db_path: &Path) -> Result<Connection> {
    let connection = Connection::open(db_path)
        .with_context(|| format!("failed to open {}", db_path.display()))?;
    configure_connection(&connection)?;
    Ok(connection)
}

pub fn open_read_only(db_path: &Path) -> Result<Connection> {
    Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("failed to open database read-only: {}", db_path.display()))
}

fn configure_connection(connection: &Connection) -> Result<()> {
    connection
        .pragma_update(None, "journal_mode", "WAL")
        .context("failed to set journal_mode=WAL")?;
    connection
        .pragma_update(None, "synchronous", "NORMAL")
        .context("failed to set synchronous=NORMAL")?;
    Ok(())
}

pub fn count_rows(connection: &Connection, sql: &str) -> Result<i64> {
    let count = connection.query_row(sql, [], |row| row.get(0))?;
    Ok(count)
}
