use std::collections::HashMap;

use anyhow::{Context, Result, bail};
use rusqlite::{Connection, OptionalExtension, params};

use crate::engine::system::{Lection, LectionarySystem, Membership, Verse};
use crate::engine::witness::{ContinuousTextWitness, LectionaryWitness, Witness, WitnessKind};

/// Accepts a numeric system id or an exact system name.
pub fn resolve_system_id(connection: &Connection, selector: &str) -> Result<i64> {
    let selector = selector.trim();
    if let Ok(system_id) = selector.parse::<i64>() {
        let found = connection
            .query_row(
                "SELECT system_id FROM systems WHERE system_id = ?1",
                params![system_id],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if let Some(system_id) = found {
            return Ok(system_id);
        }
    }

    connection
        .query_row(
            "SELECT system_id FROM systems WHERE name = ?1",
            params![selector],
            |row| row.get::<_, i64>(0),
        )
        .optional()?
        .with_context(|| format!("unknown lectionary system: {selector}"))
}

pub fn system_name(connection: &Connection, system_id: i64) -> Result<String> {
    connection
        .query_row(
            "SELECT name FROM systems WHERE system_id = ?1",
            params![system_id],
            |row| row.get(0),
        )
        .optional()?
        .with_context(|| format!("unknown lectionary system id: {system_id}"))
}

pub fn load_system(connection: &Connection, system_id: i64) -> Result<LectionarySystem> {
    let name = system_name(connection, system_id)?;

    let mut statement = connection.prepare(
        "
        SELECT membership_id, lection_id, sort_order, day_id, order_on_day,
               day_description, cumulative_mass_lections
        FROM memberships
        WHERE system_id = ?1
        ",
    )?;
    let memberships = statement
        .query_map(params![system_id], |row| {
            Ok(Membership {
                id: row.get(0)?,
                lection_id: row.get(1)?,
                order: row.get(2)?,
                day_id: row.get(3)?,
                order_on_day: row.get(4)?,
                day_description: row.get(5)?,
                cumulative_mass_lections: row
                    .get::<_, Option<i64>>(6)?
                    .map(|mass| mass.max(0) as u64),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context(|| format!("failed to read memberships of system {name}"))?;

    let mut descriptions = HashMap::<i64, String>::new();
    let mut statement = connection.prepare(
        "
        SELECT DISTINCT l.lection_id, l.description
        FROM lections l
        JOIN memberships m ON m.lection_id = l.lection_id
        WHERE m.system_id = ?1
        ",
    )?;
    let mut rows = statement.query(params![system_id])?;
    while let Some(row) = rows.next()? {
        descriptions.insert(row.get(0)?, row.get(1)?);
    }

    let mut entries = HashMap::<i64, Vec<(i64, Verse)>>::new();
    let mut statement = connection.prepare(
        "
        SELECT lv.lection_id, lv.verse_order, v.verse_id, v.rank, v.reference,
               v.scripture_verse_id, v.scripture_rank, v.mass
        FROM lection_verses lv
        JOIN verses v ON v.verse_id = lv.verse_id
        WHERE lv.lection_id IN (SELECT lection_id FROM memberships WHERE system_id = ?1)
        ",
    )?;
    let mut rows = statement.query(params![system_id])?;
    while let Some(row) = rows.next()? {
        let lection_id: i64 = row.get(0)?;
        let verse_order: i64 = row.get(1)?;
        let verse = Verse {
            id: row.get(2)?,
            rank: row.get(3)?,
            reference: row.get(4)?,
            scripture_verse_id: row.get(5)?,
            scripture_rank: row.get(6)?,
            mass: row.get::<_, i64>(7)?.clamp(0, i64::from(u32::MAX)) as u32,
        };
        entries.entry(lection_id).or_default().push((verse_order, verse));
    }

    let mut lections = HashMap::with_capacity(descriptions.len());
    for (lection_id, description) in descriptions {
        let verses = entries.remove(&lection_id).unwrap_or_default();
        lections.insert(lection_id, Lection::new(lection_id, description, verses));
    }

    tracing::debug!(
        system = %name,
        memberships = memberships.len(),
        lections = lections.len(),
        "loaded lectionary system"
    );

    Ok(LectionarySystem {
        id: system_id,
        name,
        memberships,
        lections,
    })
}

pub fn load_witness(connection: &Connection, siglum: &str) -> Result<Box<dyn Witness>> {
    let found = connection
        .query_row(
            "SELECT witness_id, kind, system_id FROM witnesses WHERE siglum = ?1",
            params![siglum],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, Option<i64>>(2)?,
                ))
            },
        )
        .optional()?;
    let Some((witness_id, kind, system_id)) = found else {
        bail!("unknown witness siglum: {siglum}");
    };

    let mut statement =
        connection.prepare("SELECT verse_key, text FROM transcriptions WHERE witness_id = ?1")?;
    let transcriptions = statement
        .query_map(params![witness_id], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<HashMap<i64, String>>>()
        .with_context(|| format!("failed to read transcriptions of {siglum}"))?;

    let witness: Box<dyn Witness> = match WitnessKind::parse(&kind) {
        Some(WitnessKind::Lectionary) => {
            Box::new(LectionaryWitness::new(siglum, system_id, transcriptions))
        }
        Some(WitnessKind::ContinuousText) => {
            Box::new(ContinuousTextWitness::new(siglum, transcriptions))
        }
        None => bail!("witness {siglum} has unrecognised kind {kind:?}"),
    };
    Ok(witness)
}
