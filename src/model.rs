use serde::{Deserialize, Serialize};

use crate::engine::calibrate::CalibrationConfig;
use crate::engine::sweep::SweepOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetVerse {
    pub id: i64,
    pub rank: i64,
    #[serde(default)]
    pub reference: String,
    pub scripture_verse_id: Option<i64>,
    pub scripture_rank: Option<i64>,
    /// Character count of the underlying scripture verse.
    pub char_count: Option<u32>,
    pub mass: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetLection {
    pub id: i64,
    pub description: String,
    /// Verse ids in reading order.
    pub verses: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMembership {
    pub id: i64,
    pub lection: i64,
    pub order: Option<i64>,
    pub day_id: Option<i64>,
    #[serde(default)]
    pub day: String,
    #[serde(default)]
    pub order_on_day: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSystem {
    pub id: i64,
    pub name: String,
    pub memberships: Vec<DatasetMembership>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetTranscription {
    /// Lection verse id for lectionaries, scripture verse id otherwise.
    pub verse: i64,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetWitness {
    pub siglum: String,
    pub kind: String,
    pub system: Option<String>,
    #[serde(default)]
    pub transcriptions: Vec<DatasetTranscription>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub verses: Vec<DatasetVerse>,
    #[serde(default)]
    pub lections: Vec<DatasetLection>,
    #[serde(default)]
    pub systems: Vec<DatasetSystem>,
    #[serde(default)]
    pub witnesses: Vec<DatasetWitness>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ImportCounts {
    pub verses: usize,
    pub lections: usize,
    pub lection_verses: usize,
    pub systems: usize,
    pub memberships: usize,
    pub witnesses: usize,
    pub transcriptions: usize,
    pub blank_transcriptions_skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub db_schema_version: String,
    pub status: String,
    pub started_at: String,
    pub updated_at: String,
    pub dataset_path: String,
    pub dataset_sha256: String,
    pub db_path: String,
    pub counts: ImportCounts,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub db_path: String,
    pub system: String,
    pub base_siglum: String,
    pub comparison_sigla: Vec<String>,
    pub calibration: CalibrationConfig,
    pub options: SweepOptions,
    pub row_count: usize,
    pub skipped_memberships: usize,
    pub skipped_alignments: usize,
    pub output_path: Option<String>,
    pub duration_ms: u128,
}
