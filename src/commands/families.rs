use std::collections::BTreeMap;
use std::io::{self, Write};

use anyhow::{Result, bail};
use serde::Serialize;
use tracing::info;

use crate::cli::FamiliesArgs;
use crate::commands::shared::{Comparison, db_path_for, open_existing_store, write_json_stdout};
use crate::engine::families::{FamilyLabel, lections_agreeing_with, similarity_families};

#[derive(Debug, Serialize)]
struct FamiliesResponse {
    system: String,
    base_siglum: String,
    comparison_sigla: Vec<String>,
    threshold: f64,
    start_rank: i64,
    end_rank: i64,
    codes: Vec<u32>,
    labels: Vec<String>,
    agreeing_memberships: BTreeMap<String, Vec<i64>>,
}

fn label_name(label: FamilyLabel, sigla: &[String]) -> String {
    match label {
        FamilyLabel::Unset => "unset".to_string(),
        FamilyLabel::Uncertain => "uncertain".to_string(),
        FamilyLabel::Mixed => "mixed".to_string(),
        FamilyLabel::Family(index) => sigla
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("family-{index}")),
    }
}

pub fn run(args: FamiliesArgs) -> Result<()> {
    if args.end_rank < args.start_rank {
        bail!(
            "--end-rank ({}) must not precede --start-rank ({})",
            args.end_rank,
            args.start_rank
        );
    }

    let db_path = db_path_for(&args.cache_root, args.db_path.as_ref());
    let connection = open_existing_store(&db_path)?;
    let comparison = Comparison::load(&connection, &args.comparison)?;
    let sigla = comparison.comparison_sigla();

    let table = comparison.sweep();
    let families = similarity_families(
        &table,
        &comparison.system,
        args.threshold,
        args.start_rank,
        args.end_rank,
    );
    let agreeing = lections_agreeing_with(&table, args.threshold);

    let response = FamiliesResponse {
        system: comparison.system.name.clone(),
        base_siglum: comparison.base.siglum().to_string(),
        comparison_sigla: sigla.clone(),
        threshold: args.threshold,
        start_rank: args.start_rank,
        end_rank: args.end_rank,
        codes: families.codes(),
        labels: families
            .labels()
            .iter()
            .map(|label| label_name(*label, &sigla))
            .collect(),
        agreeing_memberships: agreeing
            .into_iter()
            .map(|(index, memberships)| (label_name(FamilyLabel::Family(index), &sigla), memberships))
            .collect(),
    };

    info!(
        system = %response.system,
        verses = families.len(),
        threshold = response.threshold,
        "families computed"
    );

    if args.json {
        return write_json_stdout(&response);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    writeln!(output, "scripture_rank\tcode\tlabel")?;
    for (offset, (code, label)) in response.codes.iter().zip(&response.labels).enumerate() {
        writeln!(output, "{}\t{code}\t{label}", response.start_rank + offset as i64)?;
    }
    for (siglum, memberships) in &response.agreeing_memberships {
        let ids: Vec<String> = memberships.iter().map(i64::to_string).collect();
        writeln!(output, "# agrees with {siglum}: {}", ids.join(" "))?;
    }
    output.flush()?;
    Ok(())
}
