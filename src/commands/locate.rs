use std::io::{self, Write};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use crate::cli::LocateArgs;
use crate::commands::shared::{db_path_for, open_existing_store, write_json_stdout};
use crate::engine::system::{MassIndex, Verse};
use crate::store;

#[derive(Debug, Serialize)]
struct LocateResponse {
    system: String,
    reference_verse_id: i64,
    reference_cumulative_mass: u64,
    mass: i64,
    verse: Option<Verse>,
    membership_id: Option<i64>,
    lection: Option<String>,
    to_verse_id: Option<i64>,
    distance: Option<i64>,
}

pub fn run(args: LocateArgs) -> Result<()> {
    let db_path = db_path_for(&args.cache_root, args.db_path.as_ref());
    let connection = open_existing_store(&db_path)?;
    let system_id = store::resolve_system_id(&connection, &args.system)?;
    let system = store::load_system(&connection, system_id)?;
    let index = MassIndex::new(system.lections_in_system());

    let reference_cumulative_mass = index.cumulative_mass(args.verse).with_context(|| {
        format!("verse {} is not read in system {}", args.verse, system.name)
    })?;

    let landed = index.verse_from_mass_difference(args.verse, args.mass);
    let membership = landed.map(|(membership, _)| membership);
    let verse = landed.map(|(_, verse)| verse);

    let distance = match args.to_verse {
        Some(to_verse) => Some(index.distance_between_verses(args.verse, to_verse).with_context(
            || format!("verse {to_verse} is not read in system {}", system.name),
        )?),
        None => None,
    };

    let response = LocateResponse {
        system: system.name.clone(),
        reference_verse_id: args.verse,
        reference_cumulative_mass,
        mass: args.mass,
        verse: verse.cloned(),
        membership_id: membership.map(|membership| membership.id),
        lection: membership.map(|membership| system.membership_description(membership)),
        to_verse_id: args.to_verse,
        distance,
    };

    info!(
        system = %response.system,
        verse = args.verse,
        mass = args.mass,
        found = ?response.verse.as_ref().map(|verse| verse.id),
        "locate completed"
    );

    if args.json {
        return write_json_stdout(&response);
    }

    let mut output = io::BufWriter::new(io::stdout().lock());
    match &response.verse {
        Some(verse) => writeln!(
            output,
            "{}\t{}\t{}",
            verse.id,
            verse.reference,
            response.lection.as_deref().unwrap_or_default()
        )?,
        None => writeln!(output, "no verse at mass offset {}", args.mass)?,
    }
    if let (Some(to_verse), Some(distance)) = (args.to_verse, distance) {
        writeln!(output, "distance to {to_verse}: {distance}")?;
    }
    output.flush()?;
    Ok(())
}
