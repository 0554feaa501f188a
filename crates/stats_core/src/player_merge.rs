//! Player Stat Merger
//!
//! Per-map performance entries from several matches collapse by normalized
//! map name: advanced stats are averaged over the entries that had a number,
//! head-to-head matrices are summed.

use crate::error::{StatsError, StatsResult};
use crate::model::{RawMapPlayerStats, RawMatrixCell};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

static MAP_ORDINAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*").expect("static regex"));
static LEADING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*([-+]?\d+(?:\.\d+)?)").expect("static regex"));

/// Map labels that are summaries or placeholders, not maps.
const NOT_A_MAP: &[&str] = &["all maps", "all", "n/a"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AdvancedStat {
    #[serde(rename = "2K")]
    TwoKills,
    #[serde(rename = "3K")]
    ThreeKills,
    #[serde(rename = "4K")]
    FourKills,
    #[serde(rename = "5K")]
    FiveKills,
    #[serde(rename = "1v1")]
    Clutch1v1,
    #[serde(rename = "1v2")]
    Clutch1v2,
    #[serde(rename = "1v3")]
    Clutch1v3,
    #[serde(rename = "1v4")]
    Clutch1v4,
    #[serde(rename = "1v5")]
    Clutch1v5,
    #[serde(rename = "ECON")]
    Econ,
    #[serde(rename = "PL")]
    Plants,
    #[serde(rename = "DE")]
    Defuses,
}

impl AdvancedStat {
    pub const ALL: [AdvancedStat; 12] = [
        AdvancedStat::TwoKills,
        AdvancedStat::ThreeKills,
        AdvancedStat::FourKills,
        AdvancedStat::FiveKills,
        AdvancedStat::Clutch1v1,
        AdvancedStat::Clutch1v2,
        AdvancedStat::Clutch1v3,
        AdvancedStat::Clutch1v4,
        AdvancedStat::Clutch1v5,
        AdvancedStat::Econ,
        AdvancedStat::Plants,
        AdvancedStat::Defuses,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AdvancedStat::TwoKills => "2K",
            AdvancedStat::ThreeKills => "3K",
            AdvancedStat::FourKills => "4K",
            AdvancedStat::FiveKills => "5K",
            AdvancedStat::Clutch1v1 => "1v1",
            AdvancedStat::Clutch1v2 => "1v2",
            AdvancedStat::Clutch1v3 => "1v3",
            AdvancedStat::Clutch1v4 => "1v4",
            AdvancedStat::Clutch1v5 => "1v5",
            AdvancedStat::Econ => "ECON",
            AdvancedStat::Plants => "PL",
            AdvancedStat::Defuses => "DE",
        }
    }
}

impl fmt::Display for AdvancedStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AdvancedStat {
    type Err = StatsError;

    /// Case-insensitive, surrounding whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AdvancedStat::ALL
            .into_iter()
            .find(|stat| stat.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| StatsError::UnknownStatField(wanted.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatrixKind {
    /// Kills / deaths against each opponent.
    Normal,
    /// First kills / first deaths.
    Fkfd,
    /// Operator kills.
    Op,
}

impl FromStr for MatrixKind {
    type Err = StatsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" | "all" => Ok(MatrixKind::Normal),
            "fkfd" => Ok(MatrixKind::Fkfd),
            "op" => Ok(MatrixKind::Op),
            other => Err(StatsError::UnknownStatField(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatValue {
    Number(f64),
    /// Unparsable raw text. Absent for averaging.
    Text(String),
}

impl StatValue {
    pub fn parse(raw: &str) -> Self {
        parse_leading_number(raw)
            .map(StatValue::Number)
            .unwrap_or_else(|| StatValue::Text(raw.trim().to_string()))
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            StatValue::Number(v) => Some(*v),
            StatValue::Text(_) => None,
        }
    }
}

/// `"45%"` → 45, `"1.5"` → 1.5, `"-"` → None.
pub fn parse_leading_number(raw: &str) -> Option<f64> {
    LEADING_NUMBER
        .captures(raw)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Strips a leading ordinal ("1 Ascent" → "Ascent").
pub fn normalize_map_name(name: &str) -> String {
    MAP_ORDINAL.replace(name.trim(), "").trim().to_string()
}

fn is_real_map(name: &str) -> bool {
    !name.is_empty() && !NOT_A_MAP.iter().any(|n| n.eq_ignore_ascii_case(name))
}

/// Two decimals, the way merged stats are reported.
pub fn format_value(value: f64) -> String {
    format!("{value:.2}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatrixCell {
    pub own: Option<f64>,
    pub opponent: Option<f64>,
    pub diff: Option<i64>,
}

impl MatrixCell {
    fn from_raw(raw: &RawMatrixCell) -> Self {
        Self {
            own: raw.own.as_deref().and_then(parse_leading_number),
            opponent: raw.opponent.as_deref().and_then(parse_leading_number),
            diff: raw
                .diff
                .as_deref()
                .and_then(parse_leading_number)
                .map(|d| d.trunc() as i64),
        }
    }
}

/// One validated map entry of one match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPlayerStats {
    pub map: String,
    pub advanced: BTreeMap<AdvancedStat, StatValue>,
    pub matrix: BTreeMap<MatrixKind, BTreeMap<String, MatrixCell>>,
}

impl MapPlayerStats {
    /// Rejects the entry on the first unknown advanced-stat label. Unknown
    /// matrix kinds are dropped.
    pub fn ingest(raw: &RawMapPlayerStats) -> StatsResult<Self> {
        let mut advanced = BTreeMap::new();
        for (label, value) in &raw.advanced {
            let stat: AdvancedStat = label.parse()?;
            advanced.insert(stat, StatValue::parse(value));
        }

        let mut matrix: BTreeMap<MatrixKind, BTreeMap<String, MatrixCell>> = BTreeMap::new();
        for (kind, cells) in &raw.matrix {
            let Ok(kind) = kind.parse::<MatrixKind>() else {
                debug!(map = %raw.map, kind = %kind, "skipping unknown matrix kind");
                continue;
            };
            let entry = matrix.entry(kind).or_default();
            for (opponent, cell) in cells {
                entry.insert(opponent.trim().to_string(), MatrixCell::from_raw(cell));
            }
        }

        Ok(Self {
            map: normalize_map_name(&raw.map),
            advanced,
            matrix,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedMatrixCell {
    pub own: Option<f64>,
    pub opponent: Option<f64>,
    #[serde(serialize_with = "signed")]
    pub diff: i64,
}

fn signed<S: Serializer>(diff: &i64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&format!("{diff:+}"))
}

fn add(acc: Option<f64>, v: Option<f64>) -> Option<f64> {
    match (acc, v) {
        (Some(a), Some(b)) => Some(a + b),
        (a, b) => a.or(b),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedMapStats {
    pub map: String,
    pub played: u32,
    /// Averages over the entries that carried a number, two decimals.
    pub advanced: BTreeMap<AdvancedStat, f64>,
    /// Stats that never parsed as a number; raw text of the newest entry.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub advanced_text: BTreeMap<AdvancedStat, String>,
    pub matrix: BTreeMap<MatrixKind, BTreeMap<String, MergedMatrixCell>>,
}

impl MergedMapStats {
    /// True when no field carries a non-zero number or any text.
    pub fn is_blank(&self) -> bool {
        let nonzero = |v: Option<f64>| v.is_some_and(|v| v != 0.0);
        self.advanced.values().all(|v| *v == 0.0)
            && self.advanced_text.values().all(|t| t.trim().is_empty())
            && self.matrix.values().flat_map(|cells| cells.values()).all(|cell| {
                !nonzero(cell.own) && !nonzero(cell.opponent) && cell.diff == 0
            })
    }

    pub fn formatted_advanced(&self) -> BTreeMap<AdvancedStat, String> {
        self.advanced
            .iter()
            .map(|(stat, v)| (*stat, format_value(*v)))
            .collect()
    }
}

#[derive(Default)]
struct MapBucket {
    played: u32,
    sums: BTreeMap<AdvancedStat, (f64, u32)>,
    text: BTreeMap<AdvancedStat, String>,
    matrix: BTreeMap<MatrixKind, BTreeMap<String, MergedMatrixCell>>,
}

pub fn merge(entries: &[MapPlayerStats]) -> Vec<MergedMapStats> {
    let mut buckets: BTreeMap<String, MapBucket> = BTreeMap::new();

    for entry in entries {
        let map = normalize_map_name(&entry.map);
        if !is_real_map(&map) {
            debug!(map = %entry.map, "dropping non-map entry");
            continue;
        }
        let bucket = buckets.entry(map).or_default();
        bucket.played += 1;

        for (stat, value) in &entry.advanced {
            match value.as_number() {
                Some(v) => {
                    let (sum, count) = bucket.sums.entry(*stat).or_insert((0.0, 0));
                    *sum += v;
                    *count += 1;
                }
                None => {
                    if let StatValue::Text(t) = value {
                        // entries arrive newest first
                        bucket.text.entry(*stat).or_insert_with(|| t.clone());
                    }
                }
            }
        }

        for (kind, cells) in &entry.matrix {
            let merged = bucket.matrix.entry(*kind).or_default();
            for (opponent, cell) in cells {
                let acc = merged.entry(opponent.clone()).or_default();
                acc.own = add(acc.own, cell.own);
                acc.opponent = add(acc.opponent, cell.opponent);
                acc.diff += cell.diff.unwrap_or(0);
            }
        }
    }

    let mut out: Vec<MergedMapStats> = buckets
        .into_iter()
        .map(|(map, b)| {
            let advanced: BTreeMap<AdvancedStat, f64> = b
                .sums
                .iter()
                .map(|(stat, (sum, count))| (*stat, round2(sum / *count as f64)))
                .collect();
            let advanced_text = b
                .text
                .into_iter()
                .filter(|(stat, _)| !advanced.contains_key(stat))
                .collect();
            MergedMapStats {
                map,
                played: b.played,
                advanced,
                advanced_text,
                matrix: b.matrix,
            }
        })
        .filter(|m| {
            let blank = m.is_blank();
            if blank {
                debug!(map = %m.map, played = m.played, "dropping map without any stat values");
            }
            !blank
        })
        .collect();
    out.sort_by(|a, b| b.played.cmp(&a.played).then_with(|| a.map.cmp(&b.map)));
    out
}

/// Ingests raw entries, skipping (and logging) those with unknown stat labels.
pub fn ingest_all<'a>(raw: impl IntoIterator<Item = &'a RawMapPlayerStats>) -> Vec<MapPlayerStats> {
    raw.into_iter()
        .filter_map(|r| match MapPlayerStats::ingest(r) {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(map = %r.map, error = %e, "rejecting map entry");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(map: &str, advanced: &[(&str, &str)]) -> RawMapPlayerStats {
        RawMapPlayerStats {
            map: map.into(),
            matrix: BTreeMap::new(),
            advanced: advanced
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn econ_is_averaged_per_map() {
        let entries = ingest_all(&[
            raw("1 Ascent", &[("ECON", "10")]),
            raw("Ascent", &[("ECON", "20")]),
        ]);
        let merged = merge(&entries);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].map, "Ascent");
        assert_eq!(merged[0].played, 2);
        assert_eq!(merged[0].advanced[&AdvancedStat::Econ], 15.0);
        assert_eq!(merged[0].formatted_advanced()[&AdvancedStat::Econ], "15.00");
    }

    #[test]
    fn unparsable_values_do_not_drag_averages_down() {
        let entries = ingest_all(&[
            raw("Bind", &[("2K", "3"), ("PL", "-")]),
            raw("Bind", &[("2K", "n/a"), ("PL", "-")]),
        ]);
        let merged = merge(&entries);
        assert_eq!(merged[0].advanced[&AdvancedStat::TwoKills], 3.0);
        assert!(!merged[0].advanced.contains_key(&AdvancedStat::Plants));
        assert_eq!(merged[0].advanced_text[&AdvancedStat::Plants], "-");
    }

    #[test]
    fn unknown_stat_label_is_rejected_at_ingestion() {
        let err = MapPlayerStats::ingest(&raw("Bind", &[("ACS", "250")])).unwrap_err();
        assert_eq!(err, StatsError::UnknownStatField("ACS".into()));
        assert!(ingest_all(&[raw("Bind", &[("ACS", "250")])]).is_empty());
    }

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("econ".parse::<AdvancedStat>(), Ok(AdvancedStat::Econ));
        assert_eq!(" 1V3 ".parse::<AdvancedStat>(), Ok(AdvancedStat::Clutch1v3));
        for stat in AdvancedStat::ALL {
            assert_eq!(stat.label().parse::<AdvancedStat>(), Ok(stat));
        }
    }

    #[test]
    fn summary_and_placeholder_maps_are_dropped() {
        let entries = ingest_all(&[
            raw("All Maps", &[("ECON", "50")]),
            raw("N/A", &[("ECON", "50")]),
            raw("", &[]),
            raw("2 Lotus", &[("ECON", "40")]),
            raw("Haven", &[]),
            raw("Lotus", &[]),
        ]);
        let maps: Vec<_> = merge(&entries).into_iter().map(|m| (m.map, m.played)).collect();
        assert_eq!(maps, vec![("Lotus".to_string(), 2)]);
    }

    #[test]
    fn maps_without_any_value_are_dropped() {
        let mut zero_matrix = raw("Pearl", &[("ECON", "0")]);
        zero_matrix.matrix.insert(
            "fkfd".into(),
            [(
                "Boaster".to_string(),
                RawMatrixCell { own: Some("0".into()), opponent: None, diff: Some("0".into()) },
            )]
            .into_iter()
            .collect(),
        );
        let entries = ingest_all(&[
            raw("Haven", &[]),
            raw("Icebox", &[("ECON", "0"), ("2K", "0")]),
            zero_matrix,
            raw("Sunset", &[("ECON", "0"), ("1v1", "1")]),
        ]);
        let maps: Vec<_> = merge(&entries).into_iter().map(|m| (m.map, m.played)).collect();
        assert_eq!(maps, vec![("Sunset".to_string(), 1)]);
    }

    #[test]
    fn text_values_come_from_the_newest_entry() {
        let entries = ingest_all(&[
            raw("Breeze", &[("PL", "newest"), ("ECON", "30")]),
            raw("Breeze", &[("PL", "oldest"), ("ECON", "40")]),
        ]);
        let merged = merge(&entries);
        assert_eq!(merged[0].advanced_text[&AdvancedStat::Plants], "newest");
        assert_eq!(merged[0].advanced[&AdvancedStat::Econ], 35.0);
    }

    #[test]
    fn matrix_cells_sum_and_diff_keeps_sign() {
        let mut a = raw("Split", &[]);
        a.matrix.insert(
            "normal".into(),
            [(
                "Boaster".to_string(),
                RawMatrixCell { own: Some("3".into()), opponent: Some("5".into()), diff: Some("-2".into()) },
            )]
            .into_iter()
            .collect(),
        );
        let mut b = raw("Split", &[]);
        b.matrix.insert(
            "normal".into(),
            [(
                "Boaster".to_string(),
                RawMatrixCell { own: Some("4".into()), opponent: Some("1".into()), diff: Some("+3".into()) },
            )]
            .into_iter()
            .collect(),
        );
        b.matrix.insert("weird".into(), BTreeMap::new());

        let merged = merge(&ingest_all(&[a, b]));
        let cell = &merged[0].matrix[&MatrixKind::Normal]["Boaster"];
        assert_eq!(cell.own, Some(7.0));
        assert_eq!(cell.opponent, Some(6.0));
        assert_eq!(cell.diff, 1);
        assert_eq!(merged[0].matrix.len(), 1);

        let json = serde_json::to_value(&merged[0]).unwrap();
        assert_eq!(json["matrix"]["normal"]["Boaster"]["diff"], "+1");
        assert_eq!(json["played"], 2);
    }

    #[test]
    fn leading_number_parsing() {
        assert_eq!(parse_leading_number("45%"), Some(45.0));
        assert_eq!(parse_leading_number(" 1.5 "), Some(1.5));
        assert_eq!(parse_leading_number("-3"), Some(-3.0));
        assert_eq!(parse_leading_number("-"), None);
        assert_eq!(format_value(0.0), "0.00");
    }
}
