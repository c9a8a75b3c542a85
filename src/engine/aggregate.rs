use tracing::{debug, warn};

use crate::engine::alignment::{AlignmentCounts, AlignmentError, AlignmentParams, align_counts};
use crate::engine::calibrate::percentage_similarity;
use crate::engine::system::Lection;
use crate::engine::witness::Witness;

#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateOptions {
    pub ignore_incipits: bool,
    pub max_alignment_cells: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct WitnessTotals {
    pub counts: AlignmentCounts,
    pub verse_similarity_sum: f64,
    pub verses_compared: usize,
}

impl WitnessTotals {
    /// Mean of the per-verse percentage similarities.
    pub fn verse_mean_similarity(&self) -> Option<f64> {
        if self.verses_compared == 0 {
            return None;
        }
        Some(self.verse_similarity_sum / self.verses_compared as f64)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LectionTotals {
    pub witnesses: Vec<WitnessTotals>,
    pub verses_examined: usize,
    pub skipped_alignments: usize,
}

/// Sums alignment counts of the base witness against every comparison
/// witness over the verses of one lection.
pub fn aggregate_lection(
    base: &dyn Witness,
    lection: &Lection,
    comparisons: &[&dyn Witness],
    params: &AlignmentParams,
    options: AggregateOptions,
) -> LectionTotals {
    let mut totals = LectionTotals {
        witnesses: vec![WitnessTotals::default(); comparisons.len()],
        ..LectionTotals::default()
    };

    for (verse_index, verse) in lection.verses_in_order().iter().enumerate() {
        if verse_index == 0 && options.ignore_incipits {
            continue;
        }

        let Some(base_text) = base.normalized_transcription(verse) else {
            continue;
        };
        totals.verses_examined += 1;

        for (witness_index, witness) in comparisons.iter().enumerate() {
            let Some(comparison_text) = witness.normalized_transcription(verse) else {
                continue;
            };

            match align_counts(base_text, comparison_text, params, options.max_alignment_cells) {
                Ok(counts) => {
                    let entry = &mut totals.witnesses[witness_index];
                    entry.counts += counts;
                    if let Some(similarity) = percentage_similarity(&counts) {
                        entry.verse_similarity_sum += similarity;
                        entry.verses_compared += 1;
                    }
                }
                Err(err @ AlignmentError::BudgetExceeded { .. }) => {
                    totals.skipped_alignments += 1;
                    warn!(
                        lection = %lection.description,
                        verse = %verse.reference,
                        siglum = %witness.siglum(),
                        error = %err,
                        "skipping verse alignment"
                    );
                }
                Err(err) => {
                    totals.skipped_alignments += 1;
                    debug!(
                        verse = %verse.reference,
                        siglum = %witness.siglum(),
                        error = %err,
                        "alignment rejected input"
                    );
                }
            }
        }
    }

    totals
}
