use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

use crate::cli::CoverageArgs;
use crate::commands::shared::{db_path_for, open_existing_store, write_json_stdout, write_stdout};
use crate::engine::system::LectionarySystem;
use crate::engine::witness::Witness;
use crate::store;
use crate::util::rows_to_csv;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageRow {
    pub lection: String,
    pub day: String,
    pub membership_id: Option<i64>,
    pub verses_transcribed: usize,
    pub verses_count: usize,
    pub percentage: Option<f64>,
}

impl CoverageRow {
    fn new(
        lection: String,
        day: String,
        membership_id: Option<i64>,
        verses_transcribed: usize,
        verses_count: usize,
    ) -> Self {
        let percentage = (verses_count > 0)
            .then(|| verses_transcribed as f64 / verses_count as f64 * 100.0);
        Self {
            lection,
            day,
            membership_id,
            verses_transcribed,
            verses_count,
            percentage,
        }
    }
}

/// Transcribed verse count per membership in system order, then a total row.
pub fn transcribed_coverage(system: &LectionarySystem, witness: &dyn Witness) -> Vec<CoverageRow> {
    let mut rows = Vec::new();
    let mut total_transcribed = 0usize;
    let mut total_verses = 0usize;

    for membership in system.lections_in_system().iter() {
        let Some(lection) = system.lection_for(membership) else {
            continue;
        };
        let transcribed = lection
            .verses_in_order()
            .iter()
            .filter(|verse| witness.normalized_transcription(verse).is_some())
            .count();
        total_transcribed += transcribed;
        total_verses += lection.verse_count();

        rows.push(CoverageRow::new(
            lection.description.clone(),
            membership.day_description_label(),
            Some(membership.id),
            transcribed,
            lection.verse_count(),
        ));
    }

    rows.push(CoverageRow::new(
        "Total".to_string(),
        String::new(),
        None,
        total_transcribed,
        total_verses,
    ));
    rows
}

fn coverage_csv(rows: &[CoverageRow]) -> String {
    let mut cells = vec![vec![
        "Lection".to_string(),
        "Day".to_string(),
        "Verses Transcribed".to_string(),
        "Verses Count".to_string(),
        "Percentage".to_string(),
    ]];
    for row in rows {
        cells.push(vec![
            row.lection.clone(),
            row.day.clone(),
            row.verses_transcribed.to_string(),
            row.verses_count.to_string(),
            row.percentage
                .map(|value| format!("{value:.1}"))
                .unwrap_or_default(),
        ]);
    }
    rows_to_csv(&cells)
}

pub fn run(args: CoverageArgs) -> Result<()> {
    let db_path = db_path_for(&args.cache_root, args.db_path.as_ref());
    let connection = open_existing_store(&db_path)?;

    let witness = store::load_witness(&connection, args.witness.trim())?;
    let system_id = match (&args.system, witness.system_id()) {
        (Some(selector), _) => store::resolve_system_id(&connection, selector)?,
        (None, Some(system_id)) => system_id,
        (None, None) => bail!(
            "witness {} does not follow a lectionary system; pass --system",
            witness.siglum()
        ),
    };
    let system = store::load_system(&connection, system_id)?;

    let rows = transcribed_coverage(&system, witness.as_ref());
    if let Some(total) = rows.last() {
        info!(
            witness = %witness.siglum(),
            system = %system.name,
            transcribed = total.verses_transcribed,
            verses = total.verses_count,
            "coverage computed"
        );
    }

    if args.json {
        write_json_stdout(&rows)
    } else {
        write_stdout(&coverage_csv(&rows))
    }
}
