use std::fs;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::cli::ImportArgs;
use crate::commands::shared::db_path_for;
use crate::model::{Dataset, ImportRunManifest};
use crate::store::{self, DB_SCHEMA_VERSION};
use crate::util::{
    ensure_directory, now_utc_string, sha256_file, utc_compact_string, write_json_pretty,
};

pub fn run(args: ImportArgs) -> Result<()> {
    let started_ts = Utc::now();
    let started_at = now_utc_string();
    let run_id = format!("import-{}", utc_compact_string(started_ts));

    let cache_root = args.cache_root.clone();
    let manifest_dir = cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;

    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("import_run_{}.json", utc_compact_string(started_ts)))
    });
    let db_path = db_path_for(&cache_root, args.db_path.as_ref());
    if let Some(parent) = db_path.parent() {
        ensure_directory(parent)?;
    }

    info!(
        dataset = %args.dataset.display(),
        db_path = %db_path.display(),
        run_id = %run_id,
        "starting import"
    );

    let raw = fs::read(&args.dataset)
        .with_context(|| format!("failed to read {}", args.dataset.display()))?;
    let dataset: Dataset = serde_json::from_slice(&raw)
        .with_context(|| format!("failed to parse {}", args.dataset.display()))?;
    let dataset_sha256 = sha256_file(&args.dataset)?;

    let mut connection = store::open_read_write(&db_path)?;
    store::ensure_schema(&connection)?;
    let (counts, warnings) = store::import_dataset(&mut connection, &dataset)
        .with_context(|| format!("failed to import {}", args.dataset.display()))?;

    for warning in &warnings {
        warn!(warning = %warning, "import warning");
    }

    let manifest = ImportRunManifest {
        manifest_version: 1,
        run_id,
        db_schema_version: DB_SCHEMA_VERSION.to_string(),
        status: "completed".to_string(),
        started_at,
        updated_at: now_utc_string(),
        dataset_path: args.dataset.display().to_string(),
        dataset_sha256,
        db_path: db_path.display().to_string(),
        counts,
        warnings,
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        manifest = %manifest_path.display(),
        verses = manifest.counts.verses,
        lections = manifest.counts.lections,
        memberships = manifest.counts.memberships,
        witnesses = manifest.counts.witnesses,
        transcriptions = manifest.counts.transcriptions,
        "import completed"
    );

    Ok(())
}
