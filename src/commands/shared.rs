use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::cli::ComparisonArgs;
use crate::engine::calibrate::CalibrationConfig;
use crate::engine::sweep::{SimilarityTable, SweepOptions, sweep_system};
use crate::engine::system::LectionarySystem;
use crate::engine::witness::{Witness, resolve_system};
use crate::store::{self, DEFAULT_DB_FILENAME};

pub fn db_path_for(cache_root: &Path, db_path: Option<&PathBuf>) -> PathBuf {
    db_path
        .cloned()
        .unwrap_or_else(|| cache_root.join(DEFAULT_DB_FILENAME))
}

pub fn open_existing_store(db_path: &Path) -> Result<Connection> {
    if !db_path.exists() {
        bail!(
            "database not found at {}; run `lectio import` first",
            db_path.display()
        );
    }
    store::open_read_only(db_path)
}

pub fn write_json_stdout<T: Serialize>(value: &T) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    serde_json::to_writer_pretty(&mut output, value).context("failed to serialize json output")?;
    writeln!(output)?;
    output.flush()?;
    Ok(())
}

pub fn write_stdout(text: &str) -> Result<()> {
    let mut output = io::BufWriter::new(io::stdout().lock());
    output.write_all(text.as_bytes())?;
    output.flush()?;
    Ok(())
}

/// Fails before any lection is processed when the configuration is invalid.
pub fn resolve_calibration(args: &ComparisonArgs) -> Result<CalibrationConfig> {
    let mut calibration = match &args.calibration_path {
        Some(path) => CalibrationConfig::from_json_file(path)?,
        None => CalibrationConfig::preset(&args.calibration_preset)?,
    };
    if let Some(prior_log_odds) = args.prior_log_odds {
        calibration = calibration.with_prior_log_odds(prior_log_odds);
    }
    calibration.validate()?;
    Ok(calibration)
}

pub fn sweep_options(args: &ComparisonArgs) -> SweepOptions {
    SweepOptions {
        min_verses: args.min_verses,
        ignore_incipits: args.ignore_incipits,
        similarity_mode: args.similarity_mode.mode(),
        max_alignment_cells: args.max_alignment_cells,
    }
}

/// Everything a sweep needs, loaded from the store.
pub struct Comparison {
    pub base: Box<dyn Witness>,
    pub comparisons: Vec<Box<dyn Witness>>,
    pub system: LectionarySystem,
    pub calibration: CalibrationConfig,
    pub options: SweepOptions,
}

impl Comparison {
    pub fn load(connection: &Connection, args: &ComparisonArgs) -> Result<Self> {
        let calibration = resolve_calibration(args)?;

        let base = store::load_witness(connection, args.base.trim())?;
        let comparisons = args
            .compare
            .iter()
            .map(|siglum| store::load_witness(connection, siglum.trim()))
            .collect::<Result<Vec<_>>>()?;

        let system_id = match &args.system {
            Some(selector) => store::resolve_system_id(connection, selector)?,
            None => {
                let refs: Vec<&dyn Witness> = comparisons.iter().map(|w| w.as_ref()).collect();
                match resolve_system(base.as_ref(), &refs) {
                    Some(system_id) => system_id,
                    None => bail!(
                        "no lectionary system for {}; pass --system or compare against a lectionary witness",
                        args.base
                    ),
                }
            }
        };
        let system = store::load_system(connection, system_id)?;

        info!(
            system = %system.name,
            base = %base.siglum(),
            comparisons = comparisons.len(),
            calibration = %calibration.name,
            "comparison loaded"
        );

        Ok(Self {
            base,
            comparisons,
            system,
            calibration,
            options: sweep_options(args),
        })
    }

    pub fn comparison_refs(&self) -> Vec<&dyn Witness> {
        self.comparisons.iter().map(|witness| witness.as_ref()).collect()
    }

    pub fn comparison_sigla(&self) -> Vec<String> {
        self.comparisons
            .iter()
            .map(|witness| witness.siglum().to_string())
            .collect()
    }

    pub fn sweep(&self) -> SimilarityTable {
        sweep_system(
            &self.system,
            self.base.as_ref(),
            &self.comparison_refs(),
            &self.calibration,
            &self.options,
        )
    }
}
