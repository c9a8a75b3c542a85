use std::time::Instant;

use anyhow::Result;
use chrono::Utc;
use tracing::info;

use crate::cli::SweepArgs;
use crate::commands::shared::{
    Comparison, db_path_for, open_existing_store, write_json_stdout, write_stdout,
};
use crate::model::SweepRunManifest;
use crate::util::{
    ensure_directory, now_utc_string, utc_compact_string, write_json_pretty, write_text,
};

pub fn run(args: SweepArgs) -> Result<()> {
    let started = Instant::now();
    let started_ts = Utc::now();
    let run_id = format!("sweep-{}", utc_compact_string(started_ts));

    let db_path = db_path_for(&args.cache_root, args.db_path.as_ref());
    let connection = open_existing_store(&db_path)?;
    let comparison = Comparison::load(&connection, &args.comparison)?;

    let table = comparison
        .sweep()
        .restrict_order(args.min_order, args.max_order)
        .restrict_memberships(&args.memberships);

    for (index, siglum) in table.sigla.iter().enumerate() {
        info!(
            siglum = %siglum,
            mean_similarity = ?table.mean_similarity(index),
            "witness summary"
        );
    }

    if let Some(output) = &args.output {
        write_text(output, &table.to_csv())?;
        info!(path = %output.display(), "wrote similarity csv");
    }

    if args.json {
        write_json_stdout(&table)?;
    } else if args.output.is_none() {
        write_stdout(&table.to_csv())?;
    }

    let manifest_dir = args.cache_root.join("manifests");
    ensure_directory(&manifest_dir)?;
    let manifest_path = args.manifest_path.clone().unwrap_or_else(|| {
        manifest_dir.join(format!("sweep_run_{}.json", utc_compact_string(started_ts)))
    });
    let manifest = SweepRunManifest {
        manifest_version: 1,
        run_id,
        generated_at: now_utc_string(),
        db_path: db_path.display().to_string(),
        system: comparison.system.name.clone(),
        base_siglum: comparison.base.siglum().to_string(),
        comparison_sigla: comparison.comparison_sigla(),
        calibration: comparison.calibration.clone(),
        options: comparison.options,
        row_count: table.rows.len(),
        skipped_memberships: table.skipped_memberships,
        skipped_alignments: table.skipped_alignments,
        output_path: args.output.as_ref().map(|path| path.display().to_string()),
        duration_ms: started.elapsed().as_millis(),
    };
    write_json_pretty(&manifest_path, &manifest)?;

    info!(
        system = %manifest.system,
        rows = manifest.row_count,
        skipped_memberships = manifest.skipped_memberships,
        skipped_alignments = manifest.skipped_alignments,
        duration_ms = manifest.duration_ms,
        "sweep completed"
    );

    Ok(())
}
