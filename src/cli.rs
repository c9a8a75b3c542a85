use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::engine::calibrate::DEFAULT_CALIBRATION_PRESET;
use crate::engine::sweep::{DEFAULT_MIN_VERSES, SimilarityMode};

pub const DEFAULT_CACHE_ROOT: &str = ".cache/lectio";
pub const DEFAULT_FAMILY_THRESHOLD: f64 = 76.4;

#[derive(Parser, Debug)]
#[command(
    name = "lectio",
    version,
    about = "Lectionary witness similarity and affinity tooling"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    Import(ImportArgs),
    Sweep(SweepArgs),
    Families(FamiliesArgs),
    Coverage(CoverageArgs),
    Locate(LocateArgs),
    Status(StatusArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ImportArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub dataset: PathBuf,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum SimilarityModeArg {
    Pooled,
    VerseMean,
}

impl SimilarityModeArg {
    pub fn mode(self) -> SimilarityMode {
        match self {
            Self::Pooled => SimilarityMode::Pooled,
            Self::VerseMean => SimilarityMode::VerseMean,
        }
    }
}

/// Witness selection and scoring parameters shared by `sweep` and `families`.
#[derive(Args, Debug, Clone)]
pub struct ComparisonArgs {
    #[arg(long)]
    pub base: String,

    #[arg(long = "compare", required = true)]
    pub compare: Vec<String>,

    /// System id or name; defaults to the system of the first lectionary witness.
    #[arg(long)]
    pub system: Option<String>,

    #[arg(long, default_value_t = DEFAULT_MIN_VERSES)]
    pub min_verses: usize,

    #[arg(long, default_value_t = false)]
    pub ignore_incipits: bool,

    #[arg(long, value_enum, default_value_t = SimilarityModeArg::Pooled)]
    pub similarity_mode: SimilarityModeArg,

    #[arg(long)]
    pub max_alignment_cells: Option<u64>,

    #[arg(long, default_value = DEFAULT_CALIBRATION_PRESET)]
    pub calibration_preset: String,

    #[arg(long)]
    pub calibration_path: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    pub prior_log_odds: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[command(flatten)]
    pub comparison: ComparisonArgs,

    #[arg(long, allow_negative_numbers = true)]
    pub min_order: Option<i64>,

    #[arg(long, allow_negative_numbers = true)]
    pub max_order: Option<i64>,

    #[arg(long = "membership")]
    pub memberships: Vec<i64>,

    #[arg(long)]
    pub output: Option<PathBuf>,

    #[arg(long)]
    pub manifest_path: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct FamiliesArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[command(flatten)]
    pub comparison: ComparisonArgs,

    #[arg(long, default_value_t = DEFAULT_FAMILY_THRESHOLD)]
    pub threshold: f64,

    #[arg(long)]
    pub start_rank: i64,

    #[arg(long)]
    pub end_rank: i64,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CoverageArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub witness: String,

    #[arg(long)]
    pub system: Option<String>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct LocateArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,

    #[arg(long)]
    pub system: String,

    #[arg(long)]
    pub verse: i64,

    /// Mass to move along the system; negative moves backwards.
    #[arg(long, allow_negative_numbers = true, default_value_t = 0)]
    pub mass: i64,

    /// Report the mass between `--verse` and this verse instead.
    #[arg(long)]
    pub to_verse: Option<i64>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, default_value = DEFAULT_CACHE_ROOT)]
    pub cache_root: PathBuf,

    #[arg(long)]
    pub db_path: Option<PathBuf>,
}
