use std::fs;

use anyhow::{Context, Result};
use rusqlite::OptionalExtension;
use tracing::{info, warn};

use crate::cli::StatusArgs;
use crate::commands::shared::db_path_for;
use crate::store::{self, count_rows};

pub fn run(args: StatusArgs) -> Result<()> {
    let manifest_dir = args.cache_root.join("manifests");
    let db_path = db_path_for(&args.cache_root, args.db_path.as_ref());

    info!(cache_root = %args.cache_root.display(), "status requested");

    if manifest_dir.exists() {
        let mut manifests = fs::read_dir(&manifest_dir)
            .with_context(|| format!("failed to read {}", manifest_dir.display()))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().to_string())
            .filter(|name| name.ends_with(".json"))
            .collect::<Vec<String>>();
        manifests.sort();

        info!(
            path = %manifest_dir.display(),
            manifests = manifests.len(),
            latest = %manifests.last().cloned().unwrap_or_default(),
            "manifest directory"
        );
    } else {
        warn!(path = %manifest_dir.display(), "manifest directory missing");
    }

    if db_path.exists() {
        let conn = store::open_read_only(&db_path)?;
        let schema_version: Option<String> = conn
            .query_row(
                "SELECT value FROM metadata WHERE key = 'db_schema_version'",
                [],
                |row| row.get(0),
            )
            .optional()
            .unwrap_or(None);

        info!(
            path = %db_path.display(),
            schema_version = %schema_version.unwrap_or_default(),
            verses = count_rows(&conn, "SELECT COUNT(*) FROM verses").unwrap_or(0),
            lections = count_rows(&conn, "SELECT COUNT(*) FROM lections").unwrap_or(0),
            systems = count_rows(&conn, "SELECT COUNT(*) FROM systems").unwrap_or(0),
            memberships = count_rows(&conn, "SELECT COUNT(*) FROM memberships").unwrap_or(0),
            witnesses = count_rows(&conn, "SELECT COUNT(*) FROM witnesses").unwrap_or(0),
            transcriptions = count_rows(&conn, "SELECT COUNT(*) FROM transcriptions").unwrap_or(0),
            "database status"
        );
    } else {
        warn!(path = %db_path.display(), "database file missing");
    }

    Ok(())
}
