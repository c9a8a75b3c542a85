//! Global affine-gap (Gotoh) alignment reporting categorical counts.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlignmentError {
    #[error("cannot align an empty sequence")]
    EmptySequence,

    #[error("alignment table of {cells} cells exceeds budget of {limit} cells")]
    BudgetExceeded { cells: u64, limit: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlignmentParams {
    pub match_score: f64,
    pub mismatch_score: f64,
    pub gap_open: f64,
    pub gap_extend: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentCounts {
    pub matches: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub gap_extensions: u64,
}

impl AlignmentCounts {
    /// Number of alignment columns.
    pub fn length(&self) -> u64 {
        self.matches + self.mismatches + self.gap_opens + self.gap_extensions
    }

    pub fn as_features(&self) -> [f64; 4] {
        [
            self.matches as f64,
            self.mismatches as f64,
            self.gap_opens as f64,
            self.gap_extensions as f64,
        ]
    }
}

impl AddAssign for AlignmentCounts {
    fn add_assign(&mut self, other: Self) {
        self.matches += other.matches;
        self.mismatches += other.mismatches;
        self.gap_opens += other.gap_opens;
        self.gap_extensions += other.gap_extensions;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Aligned,
    GapInB,
    GapInA,
}

const NO_STATE: u8 = u8::MAX;

impl State {
    fn code(self) -> u8 {
        match self {
            Self::Aligned => 0,
            Self::GapInB => 1,
            Self::GapInA => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Aligned),
            1 => Some(Self::GapInB),
            2 => Some(Self::GapInA),
            _ => None,
        }
    }
}

/// Picks the best of the three candidate scores, preferring the earlier
/// state on exact ties.
fn best_of(candidates: [(f64, State); 3]) -> (f64, u8) {
    let mut best = (f64::NEG_INFINITY, NO_STATE);
    for (score, state) in candidates {
        if score == f64::NEG_INFINITY {
            continue;
        }
        if best.1 == NO_STATE || score > best.0 {
            best = (score, state.code());
        }
    }
    best
}

/// Aligns `a` against `b` and tallies the optimal path.
///
/// `GapInB` columns consume a character of `a` against a gap, `GapInA`
/// columns consume a character of `b`. A gap run of length k is one open
/// followed by k - 1 extensions.
pub fn align_counts(
    a: &str,
    b: &str,
    params: &AlignmentParams,
    max_cells: Option<u64>,
) -> Result<AlignmentCounts, AlignmentError> {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return Err(AlignmentError::EmptySequence);
    }

    let cells = (a.len() as u64) * (b.len() as u64);
    if let Some(limit) = max_cells.filter(|limit| cells > *limit) {
        return Err(AlignmentError::BudgetExceeded { cells, limit });
    }

    let rows = a.len() + 1;
    let cols = b.len() + 1;
    let size = rows * cols;
    let idx = |i: usize, j: usize| i * cols + j;

    let mut aligned = vec![f64::NEG_INFINITY; size];
    let mut gap_in_b = vec![f64::NEG_INFINITY; size];
    let mut gap_in_a = vec![f64::NEG_INFINITY; size];
    let mut trace_aligned = vec![NO_STATE; size];
    let mut trace_gap_in_b = vec![NO_STATE; size];
    let mut trace_gap_in_a = vec![NO_STATE; size];

    aligned[idx(0, 0)] = 0.0;

    for i in 0..rows {
        for j in 0..cols {
            if i == 0 && j == 0 {
                continue;
            }
            let here = idx(i, j);

            if i > 0 && j > 0 {
                let prev = idx(i - 1, j - 1);
                let substitution = if a[i - 1] == b[j - 1] {
                    params.match_score
                } else {
                    params.mismatch_score
                };
                let (score, from) = best_of([
                    (aligned[prev], State::Aligned),
                    (gap_in_b[prev], State::GapInB),
                    (gap_in_a[prev], State::GapInA),
                ]);
                if from != NO_STATE {
                    aligned[here] = score + substitution;
                    trace_aligned[here] = from;
                }
            }

            if i > 0 {
                let prev = idx(i - 1, j);
                let (score, from) = best_of([
                    (aligned[prev] + params.gap_open, State::Aligned),
                    (gap_in_b[prev] + params.gap_extend, State::GapInB),
                    (gap_in_a[prev] + params.gap_open, State::GapInA),
                ]);
                if from != NO_STATE {
                    gap_in_b[here] = score;
                    trace_gap_in_b[here] = from;
                }
            }

            if j > 0 {
                let prev = idx(i, j - 1);
                let (score, from) = best_of([
                    (aligned[prev] + params.gap_open, State::Aligned),
                    (gap_in_b[prev] + params.gap_open, State::GapInB),
                    (gap_in_a[prev] + params.gap_extend, State::GapInA),
                ]);
                if from != NO_STATE {
                    gap_in_a[here] = score;
                    trace_gap_in_a[here] = from;
                }
            }
        }
    }

    let end = idx(a.len(), b.len());
    let (_, final_code) = best_of([
        (aligned[end], State::Aligned),
        (gap_in_b[end], State::GapInB),
        (gap_in_a[end], State::GapInA),
    ]);

    let mut counts = AlignmentCounts::default();
    let mut state = State::from_code(final_code).unwrap_or(State::Aligned);
    let (mut i, mut j) = (a.len(), b.len());

    while i > 0 || j > 0 {
        let here = idx(i, j);
        let previous_code = match state {
            State::Aligned => {
                if a[i - 1] == b[j - 1] {
                    counts.matches += 1;
                } else {
                    counts.mismatches += 1;
                }
                i -= 1;
                j -= 1;
                trace_aligned[here]
            }
            State::GapInB => {
                i -= 1;
                trace_gap_in_b[here]
            }
            State::GapInA => {
                j -= 1;
                trace_gap_in_a[here]
            }
        };

        let previous = State::from_code(previous_code).unwrap_or(State::Aligned);
        match state {
            State::GapInB | State::GapInA if previous == state => counts.gap_extensions += 1,
            State::GapInB | State::GapInA => counts.gap_opens += 1,
            State::Aligned => {}
        }
        state = previous;
    }

    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_params() -> AlignmentParams {
        AlignmentParams {
            match_score: 1.0,
            mismatch_score: -1.0,
            gap_open: -2.0,
            gap_extend: -1.0,
        }
    }

    #[test]
    fn identical_strings_align_as_all_matches() {
        let counts = align_counts("ΕΝ ΑΡΧΗ ΗΝ", "ΕΝ ΑΡΧΗ ΗΝ", &unit_params(), None).unwrap();
        assert_eq!(
            counts,
            AlignmentCounts {
                matches: 10,
                mismatches: 0,
                gap_opens: 0,
                gap_extensions: 0,
            }
        );
        assert_eq!(counts.length(), 10);
    }

    #[test]
    fn single_substitution_is_a_mismatch() {
        let counts = align_counts("ΛΟΓΟΣ", "ΛΟΓΟΝ", &unit_params(), None).unwrap();
        assert_eq!(counts.matches, 4);
        assert_eq!(counts.mismatches, 1);
        assert_eq!(counts.gap_opens, 0);
        assert_eq!(counts.gap_extensions, 0);
    }

    #[test]
    fn deletion_run_counts_one_open_and_extensions() {
        let counts = align_counts("ABCXYZDEF", "ABCDEF", &unit_params(), None).unwrap();
        assert_eq!(counts.matches, 6);
        assert_eq!(counts.mismatches, 0);
        assert_eq!(counts.gap_opens, 1);
        assert_eq!(counts.gap_extensions, 2);
        assert_eq!(counts.length(), 9);
    }

    #[test]
    fn insertion_in_second_sequence_is_counted_symmetrically() {
        let forward = align_counts("ABCDEF", "ABCXYZDEF", &unit_params(), None).unwrap();
        let backward = align_counts("ABCXYZDEF", "ABCDEF", &unit_params(), None).unwrap();
        assert_eq!(forward, backward);
    }

    #[test]
    fn trailing_gap_is_global() {
        let counts = align_counts("AB", "ABCD", &unit_params(), None).unwrap();
        assert_eq!(counts.matches, 2);
        assert_eq!(counts.gap_opens, 1);
        assert_eq!(counts.gap_extensions, 1);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(
            align_counts("", "ΛΟΓΟΣ", &unit_params(), None),
            Err(AlignmentError::EmptySequence)
        );
        assert_eq!(
            align_counts("ΛΟΓΟΣ", "", &unit_params(), None),
            Err(AlignmentError::EmptySequence)
        );
    }

    #[test]
    fn cell_budget_is_enforced() {
        let result = align_counts("ABCD", "ABCD", &unit_params(), Some(15));
        assert_eq!(
            result,
            Err(AlignmentError::BudgetExceeded {
                cells: 16,
                limit: 15
            })
        );
        assert!(align_counts("ABCD", "ABCD", &unit_params(), Some(16)).is_ok());
    }

    #[test]
    fn repeated_calls_are_identical() {
        let params = AlignmentParams {
            match_score: 6.6995597099885345,
            mismatch_score: -0.9209875054657459,
            gap_open: -5.097397327423096,
            gap_extend: -1.3005714416503906,
        };
        let left = "ΕΝ ΑΡΧΗ ΗΝ Ο ΛΟΓΟΣ ΚΑΙ Ο ΛΟΓΟΣ ΗΝ ΠΡΟΣ ΤΟΝ ΘΕΟΝ";
        let right = "ΕΝ ΑΡΧΗ ΗΝ ΛΟΓΟΣ ΚΑΙ Ο ΛΟΓΟΣ ΗΝ ΠΡΟΣ ΘΕΟΝ";
        let first = align_counts(left, right, &params, None).unwrap();
        for _ in 0..5 {
            assert_eq!(align_counts(left, right, &params, None).unwrap(), first);
        }
        assert!(first.gap_opens >= 1);
    }
}
