//! Assigns lections, and through them scripture verses, to the comparison
//! witness they most resemble.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::engine::sweep::SimilarityTable;
use crate::engine::system::{LectionarySystem, Verse};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "class", content = "witness_index", rename_all = "snake_case")]
pub enum LectionClass {
    Agrees(usize),
    Uncertain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "witness_index", rename_all = "snake_case")]
pub enum FamilyLabel {
    Unset,
    Uncertain,
    Mixed,
    Family(usize),
}

impl FamilyLabel {
    pub const UNSET_CODE: u32 = 0;
    pub const UNCERTAIN_CODE: u32 = 1;
    pub const MIXED_CODE: u32 = 2;

    /// Numeric encoding: witness indices start after the mixed sentinel.
    pub fn code(self) -> u32 {
        match self {
            Self::Unset => Self::UNSET_CODE,
            Self::Uncertain => Self::UNCERTAIN_CODE,
            Self::Mixed => Self::MIXED_CODE,
            Self::Family(index) => index as u32 + Self::MIXED_CODE + 1,
        }
    }

    /// Uncertain and mixed never change. A family escalates to mixed when
    /// any different classification, uncertain included, is written over it.
    pub fn merge(self, class: LectionClass) -> Self {
        match (self, class) {
            (Self::Unset, LectionClass::Agrees(index)) => Self::Family(index),
            (Self::Unset, LectionClass::Uncertain) => Self::Uncertain,
            (Self::Uncertain, _) => Self::Uncertain,
            (Self::Mixed, _) => Self::Mixed,
            (Self::Family(current), LectionClass::Agrees(index)) if current == index => self,
            (Self::Family(_), LectionClass::Agrees(_)) => Self::Mixed,
            (Self::Family(_), LectionClass::Uncertain) => Self::Mixed,
        }
    }
}

/// Index and value of the strictly greatest non-absent average. The lowest
/// index wins exact ties.
pub fn best_witness(averages: &[Option<f64>]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (index, average) in averages.iter().enumerate() {
        let Some(average) = average else {
            continue;
        };
        if best.is_none_or(|(_, current)| *average > current) {
            best = Some((index, *average));
        }
    }
    best
}

pub fn classify_lection(averages: &[Option<f64>], threshold: f64) -> Option<LectionClass> {
    let (index, average) = best_witness(averages)?;
    if average > threshold {
        Some(LectionClass::Agrees(index))
    } else {
        Some(LectionClass::Uncertain)
    }
}

/// Labels for the scripture verses `start_rank..=end_rank`.
#[derive(Debug, Clone, Serialize)]
pub struct FamilyMap {
    pub start_rank: i64,
    labels: Vec<FamilyLabel>,
}

impl FamilyMap {
    pub fn new(start_rank: i64, end_rank: i64) -> Self {
        let len = if end_rank >= start_rank {
            (end_rank - start_rank + 1) as usize
        } else {
            0
        };
        Self {
            start_rank,
            labels: vec![FamilyLabel::Unset; len],
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[FamilyLabel] {
        &self.labels
    }

    pub fn codes(&self) -> Vec<u32> {
        self.labels.iter().map(|label| label.code()).collect()
    }

    fn slot(&self, scripture_rank: i64) -> Option<usize> {
        let offset = scripture_rank.checked_sub(self.start_rank)?;
        if offset < 0 || offset as usize >= self.labels.len() {
            return None;
        }
        Some(offset as usize)
    }

    pub fn label_at(&self, scripture_rank: i64) -> Option<FamilyLabel> {
        self.slot(scripture_rank).map(|slot| self.labels[slot])
    }

    /// Verses outside the range or without a scripture verse are ignored.
    pub fn apply(&mut self, verses: &[Verse], class: LectionClass) {
        for verse in verses {
            let Some(slot) = verse.scripture_rank.and_then(|rank| self.slot(rank)) else {
                continue;
            };
            self.labels[slot] = self.labels[slot].merge(class);
        }
    }
}

pub fn similarity_families(
    table: &SimilarityTable,
    system: &LectionarySystem,
    threshold: f64,
    start_rank: i64,
    end_rank: i64,
) -> FamilyMap {
    let mut families = FamilyMap::new(start_rank, end_rank);
    for row in &table.rows {
        let Some(class) = classify_lection(&row.similarities(), threshold) else {
            continue;
        };
        let Some(lection) = system.lection(row.lection_id) else {
            continue;
        };
        families.apply(lection.verses_in_order(), class);
    }
    families
}

/// Membership ids whose best witness clears the threshold, per witness index.
pub fn lections_agreeing_with(table: &SimilarityTable, threshold: f64) -> BTreeMap<usize, Vec<i64>> {
    let mut agreeing = BTreeMap::<usize, Vec<i64>>::new();
    for row in &table.rows {
        if let Some(LectionClass::Agrees(index)) = classify_lection(&row.similarities(), threshold) {
            agreeing.entry(index).or_default().push(row.membership_id);
        }
    }
    agreeing
}
