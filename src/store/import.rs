use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, Transaction, params};

use crate::engine::system::{MassIndex, Verse};
use crate::engine::witness::WitnessKind;
use crate::model::{Dataset, DatasetWitness, ImportCounts};
use crate::store::load::load_system;
use crate::util::normalize_whitespace;

/// Loads a dataset in one transaction. Lections, memberships and
/// transcriptions named in the dataset replace what is stored for the same
/// ids; anything not mentioned is left alone.
pub fn import_dataset(
    connection: &mut Connection,
    dataset: &Dataset,
) -> Result<(ImportCounts, Vec<String>)> {
    check_references(dataset)?;

    let tx = connection.transaction()?;
    let mut counts = ImportCounts::default();
    let mut warnings = Vec::new();

    let masses = upsert_verses(&tx, dataset, &mut counts)?;
    upsert_lections(&tx, dataset, &masses, &mut counts)?;
    upsert_systems(&tx, dataset, &mut counts)?;

    for system in &dataset.systems {
        let stored = load_system(&tx, system.id)?;
        let index = MassIndex::new(stored.lections_in_system());
        let mut statement = tx.prepare(
            "UPDATE memberships SET cumulative_mass_lections = ?1 WHERE membership_id = ?2",
        )?;
        for (membership_id, start) in index.starts() {
            statement.execute(params![start as i64, membership_id])?;
        }
    }

    for witness in &dataset.witnesses {
        upsert_witness(&tx, witness, &mut counts, &mut warnings)?;
    }

    tx.commit()?;
    Ok((counts, warnings))
}

fn check_references(dataset: &Dataset) -> Result<()> {
    let verse_ids: HashSet<i64> = dataset.verses.iter().map(|verse| verse.id).collect();
    let lection_ids: HashSet<i64> = dataset.lections.iter().map(|lection| lection.id).collect();

    for lection in &dataset.lections {
        let mut seen = HashSet::new();
        for verse_id in &lection.verses {
            if !verse_ids.contains(verse_id) {
                bail!("lection {} references unknown verse {verse_id}", lection.id);
            }
            if !seen.insert(*verse_id) {
                bail!("lection {} lists verse {verse_id} twice", lection.id);
            }
        }
    }

    for system in &dataset.systems {
        for membership in &system.memberships {
            if !lection_ids.contains(&membership.lection) {
                bail!(
                    "membership {} of system {} references unknown lection {}",
                    membership.id,
                    system.name,
                    membership.lection
                );
            }
        }
    }

    for witness in &dataset.witnesses {
        if WitnessKind::parse(&witness.kind).is_none() {
            bail!("witness {} has unrecognised kind {:?}", witness.siglum, witness.kind);
        }
    }

    Ok(())
}

fn upsert_verses(
    tx: &Transaction<'_>,
    dataset: &Dataset,
    counts: &mut ImportCounts,
) -> Result<HashMap<i64, u32>> {
    let mut masses = HashMap::with_capacity(dataset.verses.len());
    let mut statement = tx.prepare(
        "
        INSERT INTO verses(verse_id, rank, reference, scripture_verse_id, scripture_rank, mass)
        VALUES(?1, ?2, ?3, ?4, ?5, ?6)
        ON CONFLICT(verse_id) DO UPDATE SET
          rank=excluded.rank,
          reference=excluded.reference,
          scripture_verse_id=excluded.scripture_verse_id,
          scripture_rank=excluded.scripture_rank,
          mass=excluded.mass
        ",
    )?;

    for verse in &dataset.verses {
        let mass = verse
            .mass
            .unwrap_or_else(|| Verse::default_mass(verse.scripture_verse_id.and(verse.char_count)));
        statement.execute(params![
            verse.id,
            verse.rank,
            &verse.reference,
            verse.scripture_verse_id,
            verse.scripture_rank,
            i64::from(mass)
        ])?;
        masses.insert(verse.id, mass);
        counts.verses += 1;
    }

    Ok(masses)
}

fn upsert_lections(
    tx: &Transaction<'_>,
    dataset: &Dataset,
    masses: &HashMap<i64, u32>,
    counts: &mut ImportCounts,
) -> Result<()> {
    let mut lection_statement = tx.prepare(
        "
        INSERT INTO lections(lection_id, description) VALUES(?1, ?2)
        ON CONFLICT(lection_id) DO UPDATE SET description=excluded.description
        ",
    )?;
    let mut clear_statement = tx.prepare("DELETE FROM lection_verses WHERE lection_id = ?1")?;
    let mut verse_statement = tx.prepare(
        "
        INSERT INTO lection_verses(lection_id, verse_id, verse_order, cumulative_mass_from_lection_start)
        VALUES(?1, ?2, ?3, ?4)
        ",
    )?;

    for lection in &dataset.lections {
        lection_statement.execute(params![lection.id, lection.description.trim()])?;
        clear_statement.execute(params![lection.id])?;

        let mut cumulative = 0_i64;
        for (verse_order, verse_id) in lection.verses.iter().enumerate() {
            verse_statement.execute(params![lection.id, verse_id, verse_order as i64, cumulative])?;
            cumulative += i64::from(masses.get(verse_id).copied().unwrap_or_default());
            counts.lection_verses += 1;
        }
        counts.lections += 1;
    }

    Ok(())
}

fn upsert_systems(tx: &Transaction<'_>, dataset: &Dataset, counts: &mut ImportCounts) -> Result<()> {
    let mut system_statement = tx.prepare(
        "
        INSERT INTO systems(system_id, name) VALUES(?1, ?2)
        ON CONFLICT(system_id) DO UPDATE SET name=excluded.name
        ",
    )?;
    let mut clear_statement = tx.prepare("DELETE FROM memberships WHERE system_id = ?1")?;
    let mut membership_statement = tx.prepare(
        "
        INSERT INTO memberships(
          membership_id, system_id, lection_id, sort_order, day_id, day_description, order_on_day
        )
        VALUES(?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT(membership_id) DO UPDATE SET
          system_id=excluded.system_id,
          lection_id=excluded.lection_id,
          sort_order=excluded.sort_order,
          day_id=excluded.day_id,
          day_description=excluded.day_description,
          order_on_day=excluded.order_on_day,
          cumulative_mass_lections=NULL
        ",
    )?;

    for system in &dataset.systems {
        system_statement
            .execute(params![system.id, system.name.trim()])
            .with_context(|| format!("failed to store system {}", system.name))?;
        clear_statement.execute(params![system.id])?;

        for (position, membership) in system.memberships.iter().enumerate() {
            membership_statement.execute(params![
                membership.id,
                system.id,
                membership.lection,
                membership.order.unwrap_or(position as i64),
                membership.day_id,
                membership.day.trim(),
                membership.order_on_day
            ])?;
            counts.memberships += 1;
        }
        counts.systems += 1;
    }

    Ok(())
}

fn upsert_witness(
    tx: &Transaction<'_>,
    witness: &DatasetWitness,
    counts: &mut ImportCounts,
    warnings: &mut Vec<String>,
) -> Result<()> {
    let siglum = witness.siglum.trim();
    if siglum.is_empty() {
        bail!("witness with an empty siglum");
    }
    let kind = WitnessKind::parse(&witness.kind)
        .with_context(|| format!("witness {siglum} has unrecognised kind {:?}", witness.kind))?;

    let system_id = match (kind, witness.system.as_deref()) {
        (WitnessKind::Lectionary, Some(name)) => {
            let found = tx
                .query_row(
                    "SELECT system_id FROM systems WHERE name = ?1",
                    params![name.trim()],
                    |row| row.get::<_, i64>(0),
                )
                .optional()?;
            if found.is_none() {
                warnings.push(format!("witness {siglum} follows unknown system {name}"));
            }
            found
        }
        (WitnessKind::Lectionary, None) => {
            warnings.push(format!("lectionary witness {siglum} has no system"));
            None
        }
        (WitnessKind::ContinuousText, _) => None,
    };

    tx.execute(
        "
        INSERT INTO witnesses(siglum, kind, system_id) VALUES(?1, ?2, ?3)
        ON CONFLICT(siglum) DO UPDATE SET kind=excluded.kind, system_id=excluded.system_id
        ",
        params![siglum, kind.as_str(), system_id],
    )?;
    let witness_id: i64 = tx.query_row(
        "SELECT witness_id FROM witnesses WHERE siglum = ?1",
        params![siglum],
        |row| row.get(0),
    )?;

    tx.execute(
        "DELETE FROM transcriptions WHERE witness_id = ?1",
        params![witness_id],
    )?;
    let mut statement = tx.prepare(
        "
        INSERT INTO transcriptions(witness_id, verse_key, text) VALUES(?1, ?2, ?3)
        ON CONFLICT(witness_id, verse_key) DO UPDATE SET text=excluded.text
        ",
    )?;
    for transcription in &witness.transcriptions {
        let text = normalize_whitespace(&transcription.text);
        if text.is_empty() {
            counts.blank_transcriptions_skipped += 1;
            continue;
        }
        statement.execute(params![witness_id, transcription.verse, text])?;
        counts.transcriptions += 1;
    }
    counts.witnesses += 1;

    Ok(())
}
