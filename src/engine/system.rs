//! Lections, their placement in a lectionary system, and the ordering
//! primitive shared by the similarity sweep and mass bookkeeping.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::Serialize;

/// Mass given to verses with no underlying scripture verse (headings and
/// other liturgical filler).
pub const DEFAULT_LECTIONARY_VERSE_MASS: u32 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verse {
    pub id: i64,
    pub rank: i64,
    pub reference: String,
    pub scripture_verse_id: Option<i64>,
    pub scripture_rank: Option<i64>,
    pub mass: u32,
}

impl Verse {
    pub fn default_mass(scripture_char_count: Option<u32>) -> u32 {
        scripture_char_count.unwrap_or(DEFAULT_LECTIONARY_VERSE_MASS)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Lection {
    pub id: i64,
    pub description: String,
    verses: Vec<Verse>,
}

impl Lection {
    /// Builds a lection from `(membership order, verse)` pairs. Ties on the
    /// membership order are broken by verse rank.
    pub fn new(id: i64, description: impl Into<String>, mut entries: Vec<(i64, Verse)>) -> Self {
        entries.sort_by(|left, right| {
            left.0
                .cmp(&right.0)
                .then(left.1.rank.cmp(&right.1.rank))
                .then(left.1.id.cmp(&right.1.id))
        });

        Self {
            id,
            description: description.into(),
            verses: entries.into_iter().map(|(_, verse)| verse).collect(),
        }
    }

    pub fn verses_in_order(&self) -> &[Verse] {
        &self.verses
    }

    pub fn verse_count(&self) -> usize {
        self.verses.len()
    }

    pub fn first_verse(&self) -> Option<&Verse> {
        self.verses.first()
    }

    pub fn contains_verse(&self, verse_id: i64) -> bool {
        self.verses.iter().any(|verse| verse.id == verse_id)
    }

    pub fn calculate_mass(&self) -> u64 {
        self.verses.iter().map(|verse| u64::from(verse.mass)).sum()
    }

    /// Mass of the verses preceding `verse_id` in this lection.
    pub fn cumulative_mass_from_start(&self, verse_id: i64) -> Option<u64> {
        let mut mass = 0_u64;
        for verse in &self.verses {
            if verse.id == verse_id {
                return Some(mass);
            }
            mass += u64::from(verse.mass);
        }
        None
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub id: i64,
    pub lection_id: i64,
    pub order: i64,
    pub day_id: Option<i64>,
    pub order_on_day: i64,
    pub day_description: String,
    pub cumulative_mass_lections: Option<u64>,
}

impl Membership {
    pub fn day_description_label(&self) -> String {
        if self.order_on_day < 2 {
            self.day_description.clone()
        } else {
            format!("{} ({})", self.day_description, self.order_on_day)
        }
    }

    fn sort_key_cmp(&self, other: &Self) -> Ordering {
        self.order
            .cmp(&other.order)
            .then(self.day_id.cmp(&other.day_id))
            .then(self.order_on_day.cmp(&other.order_on_day))
            .then(self.id.cmp(&other.id))
    }
}

#[derive(Debug, Clone)]
pub struct LectionarySystem {
    pub id: i64,
    pub name: String,
    pub memberships: Vec<Membership>,
    pub lections: HashMap<i64, Lection>,
}

impl LectionarySystem {
    pub fn lection(&self, lection_id: i64) -> Option<&Lection> {
        self.lections.get(&lection_id)
    }

    pub fn lection_for(&self, membership: &Membership) -> Option<&Lection> {
        self.lection(membership.lection_id)
    }

    pub fn lections_in_system(&self) -> SystemOrdering<'_> {
        SystemOrdering::new(self)
    }

    /// `"<lection> in <system> on <day>"`, the row label used by reports.
    pub fn membership_label(&self, membership: &Membership) -> String {
        let lection = self
            .lection_for(membership)
            .map(|lection| lection.description.as_str())
            .unwrap_or("(missing lection)");
        format!(
            "{} in {} on {}",
            lection,
            self.name,
            membership.day_description_label()
        )
    }

    pub fn membership_description(&self, membership: &Membership) -> String {
        let lection = self
            .lection_for(membership)
            .map(|lection| lection.description.as_str())
            .unwrap_or("(missing lection)");
        format!("{}. {}", membership.day_description_label(), lection)
    }
}

/// Memberships of one system sorted once by `(order, day, order_on_day)`.
/// Neighbour lookups are index arithmetic.
#[derive(Debug, Clone)]
pub struct SystemOrdering<'a> {
    system: &'a LectionarySystem,
    sorted: Vec<usize>,
    positions: HashMap<i64, usize>,
}

impl<'a> SystemOrdering<'a> {
    pub fn new(system: &'a LectionarySystem) -> Self {
        let mut sorted: Vec<usize> = (0..system.memberships.len()).collect();
        sorted.sort_by(|left, right| {
            system.memberships[*left].sort_key_cmp(&system.memberships[*right])
        });

        let positions = sorted
            .iter()
            .enumerate()
            .map(|(position, index)| (system.memberships[*index].id, position))
            .collect();

        Self {
            system,
            sorted,
            positions,
        }
    }

    pub fn system(&self) -> &'a LectionarySystem {
        self.system
    }

    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&'a Membership> {
        self.sorted
            .get(position)
            .map(|index| &self.system.memberships[*index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Membership> + '_ {
        self.sorted
            .iter()
            .map(|index| &self.system.memberships[*index])
    }

    pub fn position(&self, membership_id: i64) -> Option<usize> {
        self.positions.get(&membership_id).copied()
    }

    pub fn first(&self) -> Option<&'a Membership> {
        self.get(0)
    }

    pub fn last(&self) -> Option<&'a Membership> {
        self.len().checked_sub(1).and_then(|position| self.get(position))
    }

    pub fn next(&self, membership_id: i64) -> Option<&'a Membership> {
        let position = self.position(membership_id)?;
        self.get(position + 1)
    }

    pub fn prev(&self, membership_id: i64) -> Option<&'a Membership> {
        let position = self.position(membership_id)?;
        position.checked_sub(1).and_then(|previous| self.get(previous))
    }

    /// First membership in system order whose lection contains the verse.
    pub fn membership_for_verse(&self, verse_id: i64) -> Option<&'a Membership> {
        self.iter().find(|membership| {
            self.system
                .lection_for(membership)
                .is_some_and(|lection| lection.contains_verse(verse_id))
        })
    }
}

/// Cumulative mass to the start of every membership, in system order.
#[derive(Debug, Clone)]
pub struct MassIndex<'a> {
    ordering: SystemOrdering<'a>,
    starts: Vec<u64>,
}

impl<'a> MassIndex<'a> {
    pub fn new(ordering: SystemOrdering<'a>) -> Self {
        let system = ordering.system();
        let mut starts = Vec::with_capacity(ordering.len());
        let mut cumulative = 0_u64;
        for membership in ordering.iter() {
            starts.push(cumulative);
            cumulative += system
                .lection_for(membership)
                .map(Lection::calculate_mass)
                .unwrap_or(0);
        }

        Self { ordering, starts }
    }

    pub fn ordering(&self) -> &SystemOrdering<'a> {
        &self.ordering
    }

    /// `(membership id, cumulative mass before it)` pairs in system order.
    pub fn starts(&self) -> Vec<(i64, u64)> {
        self.ordering
            .iter()
            .zip(self.starts.iter())
            .map(|(membership, start)| (membership.id, *start))
            .collect()
    }

    pub fn cumulative_mass(&self, verse_id: i64) -> Option<u64> {
        let membership = self.ordering.membership_for_verse(verse_id)?;
        let position = self.ordering.position(membership.id)?;
        let lection = self.ordering.system().lection_for(membership)?;
        let within = lection.cumulative_mass_from_start(verse_id)?;
        Some(self.starts[position] + within)
    }

    pub fn distance_between_verses(&self, from_verse_id: i64, to_verse_id: i64) -> Option<i64> {
        let from = self.cumulative_mass(from_verse_id)?;
        let to = self.cumulative_mass(to_verse_id)?;
        Some(to as i64 - from as i64)
    }

    /// Verse found by moving `additional_mass` along the system from the
    /// reference verse, with the membership the walk landed in. Negative
    /// masses move backwards.
    pub fn verse_from_mass_difference(
        &self,
        reference_verse_id: i64,
        additional_mass: i64,
    ) -> Option<(&'a Membership, &'a Verse)> {
        let reference = i64::try_from(self.cumulative_mass(reference_verse_id)?).ok()?;
        let target = reference.checked_add(additional_mass)?;
        if target < 0 {
            return None;
        }
        let target = target as u64;
        let system = self.ordering.system();

        let mut found = None;
        for (membership, start) in self.ordering.iter().zip(self.starts.iter()) {
            if *start > target {
                break;
            }
            let Some(lection) = system.lection_for(membership) else {
                continue;
            };
            if lection.verse_count() > 0 {
                found = Some((membership, lection, target - start));
            }
        }

        let (membership, lection, offset) = found?;
        let mut within = 0_u64;
        let mut verse_found = None;
        for verse in lection.verses_in_order() {
            if within > offset {
                break;
            }
            verse_found = Some(verse);
            within += u64::from(verse.mass);
        }
        verse_found.map(|verse| (membership, verse))
    }
}
