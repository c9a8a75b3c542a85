use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::aggregate::{AggregateOptions, aggregate_lection};
use crate::engine::alignment::AlignmentCounts;
use crate::engine::calibrate::{CalibrationConfig, WitnessScore, calibrate};
use crate::engine::system::{Lection, LectionarySystem, Membership};
use crate::engine::witness::Witness;
use crate::util::rows_to_csv;

pub const DEFAULT_MIN_VERSES: usize = 2;

#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMode {
    /// Matches over the summed alignment length of the whole lection.
    #[default]
    Pooled,
    /// Mean of the per-verse percentages.
    VerseMean,
}

impl SimilarityMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pooled => "pooled",
            Self::VerseMean => "verse_mean",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SweepOptions {
    pub min_verses: usize,
    pub ignore_incipits: bool,
    pub similarity_mode: SimilarityMode,
    pub max_alignment_cells: Option<u64>,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            min_verses: DEFAULT_MIN_VERSES,
            ignore_incipits: false,
            similarity_mode: SimilarityMode::Pooled,
            max_alignment_cells: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRow {
    pub lection_label: String,
    pub membership_id: i64,
    pub membership_order: i64,
    pub lection_id: i64,
    pub verse_count: usize,
    pub scores: Vec<WitnessScore>,
    pub counts: Vec<AlignmentCounts>,
}

impl SweepRow {
    pub fn similarities(&self) -> Vec<Option<f64>> {
        self.scores.iter().map(|score| score.similarity).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SimilarityTable {
    pub sigla: Vec<String>,
    pub rows: Vec<SweepRow>,
    pub skipped_memberships: usize,
    pub skipped_alignments: usize,
}

impl SimilarityTable {
    pub fn columns(&self) -> Vec<String> {
        let mut columns = vec![
            "Lection".to_string(),
            "Lection_Membership__id".to_string(),
            "Lection_Membership__order".to_string(),
        ];
        for siglum in &self.sigla {
            columns.push(format!("{siglum}_similarity"));
            columns.push(format!("{siglum}_probability"));
        }
        columns
    }

    /// Row index of a membership; reports place gridlines by membership.
    pub fn position_of(&self, membership_id: i64) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| row.membership_id == membership_id)
    }

    pub fn row_for(&self, membership_id: i64) -> Option<&SweepRow> {
        self.position_of(membership_id).map(|index| &self.rows[index])
    }

    pub fn restrict_order(mut self, min_order: Option<i64>, max_order: Option<i64>) -> Self {
        self.rows.retain(|row| {
            min_order.is_none_or(|min| row.membership_order >= min)
                && max_order.is_none_or(|max| row.membership_order <= max)
        });
        self
    }

    pub fn restrict_memberships(mut self, membership_ids: &[i64]) -> Self {
        if membership_ids.is_empty() {
            return self;
        }
        self.rows
            .retain(|row| membership_ids.contains(&row.membership_id));
        self
    }

    /// Mean similarity over the rows where the witness was comparable.
    pub fn mean_similarity(&self, witness_index: usize) -> Option<f64> {
        let values: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|row| row.scores.get(witness_index).and_then(|score| score.similarity))
            .collect();
        if values.is_empty() {
            return None;
        }
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }

    /// Absent values render as empty cells, never as zero.
    pub fn to_csv(&self) -> String {
        let mut rows = Vec::with_capacity(self.rows.len() + 1);
        rows.push(self.columns());
        for row in &self.rows {
            let mut cells = vec![
                row.lection_label.clone(),
                row.membership_id.to_string(),
                row.membership_order.to_string(),
            ];
            for score in &row.scores {
                cells.push(format_optional(score.similarity));
                cells.push(format_optional(score.probability));
            }
            rows.push(cells);
        }
        rows_to_csv(&rows)
    }
}

fn format_optional(value: Option<f64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_default()
}

/// Similarity and probability for every kept membership, in system order.
pub fn sweep_system(
    system: &LectionarySystem,
    base: &dyn Witness,
    comparisons: &[&dyn Witness],
    calibration: &CalibrationConfig,
    options: &SweepOptions,
) -> SimilarityTable {
    let ordering = system.lections_in_system();
    let mut kept = Vec::<(&Membership, &Lection)>::with_capacity(ordering.len());
    let mut skipped_memberships = 0usize;

    for membership in ordering.iter() {
        let Some(lection) = system.lection_for(membership) else {
            warn!(
                membership_id = membership.id,
                lection_id = membership.lection_id,
                "membership references a missing lection"
            );
            skipped_memberships += 1;
            continue;
        };
        if lection.verse_count() < options.min_verses {
            debug!(
                membership_id = membership.id,
                verse_count = lection.verse_count(),
                min_verses = options.min_verses,
                "skipping short lection"
            );
            skipped_memberships += 1;
            continue;
        }
        kept.push((membership, lection));
    }

    let aggregate_options = AggregateOptions {
        ignore_incipits: options.ignore_incipits,
        max_alignment_cells: options.max_alignment_cells,
    };

    let computed: Vec<(SweepRow, usize)> = kept
        .par_iter()
        .map(|(membership, lection)| {
            let totals = aggregate_lection(
                base,
                lection,
                comparisons,
                &calibration.alignment,
                aggregate_options,
            );

            let mut scores = Vec::with_capacity(totals.witnesses.len());
            let mut counts = Vec::with_capacity(totals.witnesses.len());
            for witness in &totals.witnesses {
                let mut score = calibrate(&witness.counts, &calibration.model);
                if options.similarity_mode == SimilarityMode::VerseMean && score.similarity.is_some()
                {
                    score.similarity = witness.verse_mean_similarity();
                }
                scores.push(score);
                counts.push(witness.counts);
            }

            let row = SweepRow {
                lection_label: system.membership_label(membership),
                membership_id: membership.id,
                membership_order: membership.order,
                lection_id: lection.id,
                verse_count: lection.verse_count(),
                scores,
                counts,
            };
            (row, totals.skipped_alignments)
        })
        .collect();

    let skipped_alignments: usize = computed.iter().map(|(_, skipped)| skipped).sum();
    let rows: Vec<SweepRow> = computed.into_iter().map(|(row, _)| row).collect();

    SimilarityTable {
        sigla: comparisons
            .iter()
            .map(|witness| witness.siglum().to_string())
            .collect(),
        rows,
        skipped_memberships,
        skipped_alignments,
    }
}

#[cfg(test)]
mod tests;
