use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::engine::alignment::{AlignmentCounts, AlignmentParams};

pub const DEFAULT_CALIBRATION_PRESET: &str = "whole-dataset";

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("unknown calibration preset `{0}`")]
    UnknownPreset(String),

    #[error("expected 4 calibration weights, found {0}")]
    WeightCount(usize),

    #[error("calibration parameter `{name}` must be finite, found {value}")]
    NonFinite { name: &'static str, value: f64 },

    #[error("failed to read calibration file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse calibration file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationModel {
    /// Weights on (matches, mismatches, gap opens, gap extensions).
    pub weights: [f64; 4],
    pub prior_log_odds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalibrationConfig {
    pub name: String,
    pub alignment: AlignmentParams,
    pub model: CalibrationModel,
}

#[derive(Debug, Deserialize)]
struct CalibrationFile {
    name: Option<String>,
    alignment: AlignmentParams,
    weights: Vec<f64>,
    #[serde(default)]
    prior_log_odds: f64,
}

impl CalibrationConfig {
    pub fn preset(name: &str) -> Result<Self, ConfigurationError> {
        let trimmed = name.trim();
        match trimmed {
            // PairHMM alignment parameters and logistic weights fit on the
            // whole transcribed dataset.
            DEFAULT_CALIBRATION_PRESET | "" => Ok(Self {
                name: DEFAULT_CALIBRATION_PRESET.to_string(),
                alignment: AlignmentParams {
                    match_score: 6.6995597099885345,
                    mismatch_score: -0.9209875054657459,
                    gap_open: -5.097397327423096,
                    gap_extend: -1.3005714416503906,
                },
                model: CalibrationModel {
                    weights: [
                        0.07124444438506426,
                        -0.2723489152810223,
                        -0.634987796501936,
                        -0.05103656566400282,
                    ],
                    prior_log_odds: 0.0,
                },
            }),
            other => Err(ConfigurationError::UnknownPreset(other.to_string())),
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = fs::read(path).map_err(|source| ConfigurationError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: CalibrationFile =
            serde_json::from_slice(&raw).map_err(|source| ConfigurationError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        let weights: [f64; 4] = file
            .weights
            .as_slice()
            .try_into()
            .map_err(|_| ConfigurationError::WeightCount(file.weights.len()))?;

        let config = Self {
            name: file
                .name
                .unwrap_or_else(|| path.display().to_string()),
            alignment: file.alignment,
            model: CalibrationModel {
                weights,
                prior_log_odds: file.prior_log_odds,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_prior_log_odds(mut self, prior_log_odds: f64) -> Self {
        self.model.prior_log_odds = prior_log_odds;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let named = [
            ("match_score", self.alignment.match_score),
            ("mismatch_score", self.alignment.mismatch_score),
            ("gap_open", self.alignment.gap_open),
            ("gap_extend", self.alignment.gap_extend),
            ("weights[0]", self.model.weights[0]),
            ("weights[1]", self.model.weights[1]),
            ("weights[2]", self.model.weights[2]),
            ("weights[3]", self.model.weights[3]),
            ("prior_log_odds", self.model.prior_log_odds),
        ];
        for (name, value) in named {
            if !value.is_finite() {
                return Err(ConfigurationError::NonFinite { name, value });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct WitnessScore {
    pub similarity: Option<f64>,
    pub probability: Option<f64>,
}

/// `100 * matches / alignment length`, absent when nothing was compared.
pub fn percentage_similarity(counts: &AlignmentCounts) -> Option<f64> {
    let length = counts.length();
    if length == 0 {
        return None;
    }
    Some(100.0 * counts.matches as f64 / length as f64)
}

pub fn log_odds(counts: &AlignmentCounts, model: &CalibrationModel) -> f64 {
    model.prior_log_odds
        + counts
            .as_features()
            .iter()
            .zip(model.weights.iter())
            .map(|(feature, weight)| feature * weight)
            .sum::<f64>()
}

/// Largest `f64` strictly below one.
const PROBABILITY_CEILING: f64 = 1.0 - f64::EPSILON / 2.0;

/// Logistic function kept inside the open interval (0, 1); long lections
/// would otherwise saturate to exactly 0 or 1.
pub fn sigmoid(value: f64) -> f64 {
    let probability = if value >= 0.0 {
        1.0 / (1.0 + (-value).exp())
    } else {
        let exp = value.exp();
        exp / (1.0 + exp)
    };
    probability.clamp(f64::MIN_POSITIVE, PROBABILITY_CEILING)
}

pub fn posterior_probability(counts: &AlignmentCounts, model: &CalibrationModel) -> f64 {
    sigmoid(log_odds(counts, model))
}

/// Similarity and probability are reported together or not at all.
pub fn calibrate(counts: &AlignmentCounts, model: &CalibrationModel) -> WitnessScore {
    match percentage_similarity(counts) {
        Some(similarity) => WitnessScore {
            similarity: Some(similarity),
            probability: Some(posterior_probability(counts, model)),
        },
        None => WitnessScore::default(),
    }
}
