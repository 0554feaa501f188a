//! Records handed over by the Extractor.
//!
//! The upstream pages are loosely structured, so scores may arrive as
//! `[13, 11]`, `"13 - 11"`, `"2 : 1"` or not at all. Everything that can be
//! missing is an `Option`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Side the round winner played on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Attack,
    Defense,
}

/// Position of a team in a two-team record (0 or 1 on the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    pub fn index(self) -> usize {
        match self {
            Slot::First => 0,
            Slot::Second => 1,
        }
    }

    pub fn other(self) -> Slot {
        match self {
            Slot::First => Slot::Second,
            Slot::Second => Slot::First,
        }
    }

    /// Reorders a `(first, second)` pair so that this slot comes first.
    pub fn orient<T>(self, pair: (T, T)) -> (T, T) {
        match self {
            Slot::First => pair,
            Slot::Second => (pair.1, pair.0),
        }
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.index() as u8
    }
}

impl TryFrom<u8> for Slot {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Slot::First),
            1 => Ok(Slot::Second),
            other => Err(format!("slot must be 0 or 1, got {other}")),
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

/// One entry of a team's match list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRef {
    pub id: String,
    pub team1: String,
    pub team2: String,
    #[serde(default, deserialize_with = "de_score")]
    pub score: Option<(u32, u32)>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default)]
    pub maps: Vec<MapRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRef {
    pub name: String,
    /// In match-level team order (team1, team2).
    #[serde(default, deserialize_with = "de_score")]
    pub score: Option<(u32, u32)>,
}

/// Result of a match-detail fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchDetail {
    pub id: String,
    pub team1: String,
    pub team2: String,
    #[serde(default)]
    pub maps: Vec<MapDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapDetail {
    pub name: String,
    #[serde(default, deserialize_with = "de_score")]
    pub score: Option<(u32, u32)>,
    /// Team labels as printed above the round breakdown. Their order can
    /// disagree with the match header.
    #[serde(default)]
    pub round_labels: Option<(String, String)>,
    /// Index = round number.
    #[serde(default)]
    pub round_markers: Vec<RoundMarker>,
    #[serde(default)]
    pub players: Vec<PlayerRow>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundMarker {
    pub side: Side,
    /// Slot in `round_labels` order; `None` for rounds without an outcome.
    #[serde(default)]
    pub winner: Option<Slot>,
}

impl RoundMarker {
    pub fn won(side: Side, winner: Slot) -> Self {
        Self { side, winner: Some(winner) }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub team: String,
    #[serde(default)]
    pub player_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub stats: PerSideStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerSideStats {
    #[serde(default)]
    pub overall: StatLine,
    #[serde(default)]
    pub attack: StatLine,
    #[serde(default)]
    pub defense: StatLine,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatLine {
    pub rating: Option<f64>,
    pub acs: Option<f64>,
    pub kills: Option<f64>,
    pub deaths: Option<f64>,
    pub assists: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub roster: Vec<RosterMember>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterMember {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
}

/// Per-map performance tab of one player in one match, as extracted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMapPlayerStats {
    pub map: String,
    /// kind ("normal" | "fkfd" | "op") → opposing player → cell
    #[serde(default)]
    pub matrix: BTreeMap<String, BTreeMap<String, RawMatrixCell>>,
    #[serde(default)]
    pub advanced: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMatrixCell {
    #[serde(default)]
    pub own: Option<String>,
    #[serde(default)]
    pub opponent: Option<String>,
    #[serde(default)]
    pub diff: Option<String>,
}

/// Parses "13-11", "2 : 1", "13 11". Anything without two numbers is `None`.
pub fn parse_score(raw: &str) -> Option<(u32, u32)> {
    let mut parts = raw
        .split(|c: char| !c.is_ascii_digit())
        .filter(|p| !p.is_empty())
        .map(|p| p.parse::<u32>());
    match (parts.next(), parts.next()) {
        (Some(Ok(a)), Some(Ok(b))) => Some((a, b)),
        _ => None,
    }
}

fn de_score<'de, D>(deserializer: D) -> Result<Option<(u32, u32)>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_score(&s),
        Some(serde_json::Value::Array(items)) if items.len() == 2 => {
            match (items[0].as_u64(), items[1].as_u64()) {
                (Some(a), Some(b)) => Some((a as u32, b as u32)),
                _ => None,
            }
        }
        _ => None,
    })
}
