use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::engine::system::Verse;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WitnessKind {
    Lectionary,
    ContinuousText,
}

impl WitnessKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lectionary => "lectionary",
            Self::ContinuousText => "continuous_text",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lectionary" => Some(Self::Lectionary),
            "continuous_text" | "continuous-text" | "continuous" => Some(Self::ContinuousText),
            _ => None,
        }
    }
}

/// A transcribed source that can be compared verse by verse.
///
/// Both implementations take the lection-scoped verse; each resolves it to
/// its own storage key.
pub trait Witness: Sync {
    fn siglum(&self) -> &str;

    fn kind(&self) -> WitnessKind;

    fn normalized_transcription(&self, verse: &Verse) -> Option<&str>;

    /// Lectionary system a lectionary witness follows.
    fn system_id(&self) -> Option<i64> {
        None
    }
}

fn non_empty(text: Option<&String>) -> Option<&str> {
    text.map(String::as_str).filter(|value| !value.trim().is_empty())
}

/// Transcriptions keyed by lection verse id.
#[derive(Debug, Clone)]
pub struct LectionaryWitness {
    siglum: String,
    system_id: Option<i64>,
    transcriptions: HashMap<i64, String>,
}

impl LectionaryWitness {
    pub fn new(
        siglum: impl Into<String>,
        system_id: Option<i64>,
        transcriptions: HashMap<i64, String>,
    ) -> Self {
        Self {
            siglum: siglum.into(),
            system_id,
            transcriptions,
        }
    }
}

impl Witness for LectionaryWitness {
    fn siglum(&self) -> &str {
        &self.siglum
    }

    fn kind(&self) -> WitnessKind {
        WitnessKind::Lectionary
    }

    fn normalized_transcription(&self, verse: &Verse) -> Option<&str> {
        non_empty(self.transcriptions.get(&verse.id))
    }

    fn system_id(&self) -> Option<i64> {
        self.system_id
    }
}

/// Transcriptions keyed by scripture verse id, read outside any lection.
#[derive(Debug, Clone)]
pub struct ContinuousTextWitness {
    siglum: String,
    transcriptions: HashMap<i64, String>,
}

impl ContinuousTextWitness {
    pub fn new(siglum: impl Into<String>, transcriptions: HashMap<i64, String>) -> Self {
        Self {
            siglum: siglum.into(),
            transcriptions,
        }
    }
}

impl Witness for ContinuousTextWitness {
    fn siglum(&self) -> &str {
        &self.siglum
    }

    fn kind(&self) -> WitnessKind {
        WitnessKind::ContinuousText
    }

    fn normalized_transcription(&self, verse: &Verse) -> Option<&str> {
        let scripture_verse_id = verse.scripture_verse_id?;
        non_empty(self.transcriptions.get(&scripture_verse_id))
    }
}

/// System of the base witness when it is a lectionary, otherwise of the
/// first lectionary among the comparison witnesses.
pub fn resolve_system(base: &dyn Witness, comparisons: &[&dyn Witness]) -> Option<i64> {
    std::iter::once(base)
        .chain(comparisons.iter().copied())
        .filter(|witness| witness.kind() == WitnessKind::Lectionary)
        .find_map(|witness| witness.system_id())
}
