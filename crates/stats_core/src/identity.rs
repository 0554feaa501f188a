//! Identity Normalizer
//!
//! Free-text team labels ("Team Liquid", "TL", "liquid") resolve to a
//! canonical team through an ordered chain of matchers:
//! exact → alias table → substring containment. The first matcher that
//! hits decides; an unresolved label is `None`, never a guess.

use crate::model::{Slot, TeamProfile};
use once_cell::sync::Lazy;
use std::collections::BTreeSet;
use tracing::debug;
use unicode_normalization::UnicodeNormalization;

/// Known historical / abbreviated spellings. Key = canonical alias key.
pub const ALIAS_GROUPS: &[(&str, &[&str])] = &[
    ("tl", &["teamliquid", "liquid", "tl"]),
    ("fnc", &["fnatic", "fnc"]),
    ("th", &["teamheretics", "heretics", "th"]),
    ("fut", &["futesports", "fut"]),
    ("bbl", &["bblesports", "bbl"]),
    ("mkoi", &["movistarkoi", "koi", "mkoi"]),
    ("navi", &["natusvincere", "navi"]),
    ("kc", &["karminecorp", "kc"]),
    ("g2", &["g2esports", "g2"]),
    ("vitality", &["teamvitality", "vitality", "vit"]),
    ("cloud9", &["cloud9", "c9"]),
    ("sentinels", &["sentinels", "sen"]),
    ("optic", &["opticgaming", "optic", "og"]),
    ("faze", &["fazeclan", "faze"]),
    ("tsm", &["tsm", "teamsolomid"]),
    ("eg", &["evilempire", "eg"]),
    ("100t", &["100thieves", "100t"]),
];

/// Lowercase, accents folded, everything outside `[a-z0-9]` dropped.
pub fn normalize(label: &str) -> String {
    label
        .nfkd()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Alias key for an already normalized label, first group wins.
pub fn alias_key(normalized: &str) -> Option<&'static str> {
    ALIAS_GROUPS
        .iter()
        .find(|(_, variants)| variants.contains(&normalized))
        .map(|(key, _)| *key)
}

fn alias_variants(normalized: &str) -> impl Iterator<Item = &'static str> {
    let key = alias_key(normalized);
    ALIAS_GROUPS
        .iter()
        .filter(move |(k, _)| Some(*k) == key)
        .flat_map(|(_, variants)| variants.iter().copied())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalTeam {
    pub id: String,
    pub name: String,
    pub tag: Option<String>,
    /// Normalized name and tag plus the alias-table variants of either.
    pub aliases: BTreeSet<String>,
    norm_name: String,
    norm_tag: Option<String>,
}

impl CanonicalTeam {
    pub fn new(id: impl Into<String>, name: impl Into<String>, tag: Option<String>) -> Self {
        let name = name.into();
        let norm_name = normalize(&name);
        let norm_tag = tag.as_deref().map(normalize).filter(|t| !t.is_empty());

        let mut aliases: BTreeSet<String> = alias_variants(&norm_name).map(String::from).collect();
        if let Some(t) = norm_tag.as_deref() {
            aliases.extend(alias_variants(t).map(String::from));
            aliases.insert(t.to_string());
        }
        if !norm_name.is_empty() {
            aliases.insert(norm_name.clone());
        }

        Self {
            id: id.into(),
            name,
            tag,
            aliases,
            norm_name,
            norm_tag,
        }
    }

    pub fn from_profile(profile: &TeamProfile) -> Self {
        Self::new(profile.id.clone(), profile.name.clone(), profile.tag.clone())
    }

    /// Ad hoc identity for an opponent we only know by its printed label.
    pub fn from_label(label: &str) -> Self {
        Self::new(normalize(label), label.trim(), None)
    }

    pub fn normalized_name(&self) -> &str {
        &self.norm_name
    }

    pub fn normalized_tag(&self) -> Option<&str> {
        self.norm_tag.as_deref()
    }

    fn normalized_keys(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.norm_name.as_str())
            .chain(self.norm_tag.as_deref())
            .filter(|k| !k.is_empty())
    }
}

/// Ordered weakest → strongest so `Ord` ranks an exact hit highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrength {
    Containment,
    Alias,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Index into the candidate slice.
    pub index: usize,
    pub strength: MatchStrength,
}

/// One link of the resolution chain. `label` is already normalized and
/// never empty.
pub trait TeamMatcher: Send + Sync {
    fn strength(&self) -> MatchStrength;
    fn find(&self, label: &str, candidates: &[CanonicalTeam]) -> Option<usize>;
}

/// Normalized name of any candidate, then tag of any candidate.
pub struct ExactMatcher;

impl TeamMatcher for ExactMatcher {
    fn strength(&self) -> MatchStrength {
        MatchStrength::Exact
    }

    fn find(&self, label: &str, candidates: &[CanonicalTeam]) -> Option<usize> {
        candidates
            .iter()
            .position(|c| c.norm_name == label)
            .or_else(|| {
                candidates
                    .iter()
                    .position(|c| c.norm_tag.as_deref() == Some(label))
            })
    }
}

pub struct AliasMatcher;

impl TeamMatcher for AliasMatcher {
    fn strength(&self) -> MatchStrength {
        MatchStrength::Alias
    }

    fn find(&self, label: &str, candidates: &[CanonicalTeam]) -> Option<usize> {
        alias_key(label)?;
        candidates.iter().position(|c| c.aliases.contains(label))
    }
}

/// Substring either direction. Ties go to the first candidate in list order.
pub struct ContainmentMatcher;

impl TeamMatcher for ContainmentMatcher {
    fn strength(&self) -> MatchStrength {
        MatchStrength::Containment
    }

    fn find(&self, label: &str, candidates: &[CanonicalTeam]) -> Option<usize> {
        candidates.iter().position(|c| {
            c.normalized_keys()
                .any(|key| key.contains(label) || label.contains(key))
        })
    }
}

pub struct IdentityResolver {
    chain: Vec<Box<dyn TeamMatcher>>,
}

impl Default for IdentityResolver {
    fn default() -> Self {
        Self::new(vec![
            Box::new(ExactMatcher),
            Box::new(AliasMatcher),
            Box::new(ContainmentMatcher),
        ])
    }
}

static DEFAULT_RESOLVER: Lazy<IdentityResolver> = Lazy::new(IdentityResolver::default);

/// `resolve` with the default exact → alias → containment chain.
pub fn resolve<'a>(raw_label: &str, candidates: &'a [CanonicalTeam]) -> Option<&'a CanonicalTeam> {
    DEFAULT_RESOLVER.resolve(raw_label, candidates)
}

impl IdentityResolver {
    pub fn new(chain: Vec<Box<dyn TeamMatcher>>) -> Self {
        Self { chain }
    }

    pub fn resolve_index(&self, raw_label: &str, candidates: &[CanonicalTeam]) -> Option<Resolution> {
        let label = normalize(raw_label);
        if label.is_empty() {
            return None;
        }
        self.chain.iter().find_map(|matcher| {
            matcher.find(&label, candidates).map(|index| Resolution {
                index,
                strength: matcher.strength(),
            })
        })
    }

    pub fn resolve<'a>(
        &self,
        raw_label: &str,
        candidates: &'a [CanonicalTeam],
    ) -> Option<&'a CanonicalTeam> {
        self.resolve_index(raw_label, candidates)
            .map(|r| &candidates[r.index])
    }

    /// Which of two labels belongs to `candidates[0]` (the target).
    ///
    /// Both labels are resolved against all candidates. The label resolving
    /// to the target with the stronger matcher wins, equal strength keeps
    /// the first slot. If only another candidate resolves, the target takes
    /// the remaining slot.
    pub fn resolve_slot(&self, first: &str, second: &str, candidates: &[CanonicalTeam]) -> Option<Slot> {
        let a = self.resolve_index(first, candidates);
        let b = self.resolve_index(second, candidates);
        let target_strength = |r: Option<Resolution>| r.filter(|r| r.index == 0).map(|r| r.strength);

        let slot = match (target_strength(a), target_strength(b)) {
            (Some(sa), Some(sb)) if sb > sa => Some(Slot::Second),
            (Some(_), _) => Some(Slot::First),
            (None, Some(_)) => Some(Slot::Second),
            (None, None) => match (a, b) {
                (Some(_), _) => Some(Slot::Second),
                (_, Some(_)) => Some(Slot::First),
                _ => None,
            },
        };

        if slot.is_none() {
            debug!(first, second, "neither label resolves to a known team");
        }
        slot
    }

    /// Target slot in a two-team record plus the candidate list
    /// `[target, opponent]` for resolving rows inside that record.
    /// The opponent is only known when the target slot is.
    pub fn match_candidates(
        &self,
        target: &CanonicalTeam,
        first: &str,
        second: &str,
    ) -> (Option<Slot>, Vec<CanonicalTeam>) {
        let mut candidates = vec![target.clone()];
        let slot = self.resolve_slot(first, second, &candidates);
        if let Some(slot) = slot {
            let opponent_label = match slot {
                Slot::First => second,
                Slot::Second => first,
            };
            candidates.push(CanonicalTeam::from_label(opponent_label));
        }
        (slot, candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liquid() -> CanonicalTeam {
        CanonicalTeam::new("474", "Team Liquid", Some("TL".to_string()))
    }

    fn fnatic() -> CanonicalTeam {
        CanonicalTeam::new("2593", "FNATIC", Some("FNC".to_string()))
    }

    #[test]
    fn normalize_strips_to_ascii_alnum() {
        assert_eq!(normalize("  Team Liquid! "), "teamliquid");
        assert_eq!(normalize("100 Thieves"), "100thieves");
        assert_eq!(normalize("KRÜ Esports"), "kruesports");
        assert_eq!(normalize("---"), "");
    }

    #[test]
    fn aliases_come_from_name_and_tag_groups() {
        let team = liquid();
        assert!(team.aliases.contains("liquid"));
        assert!(team.aliases.contains("tl"));
        assert!(!team.aliases.contains("fnc"));
    }

    #[test]
    fn exact_beats_alias_and_containment() {
        let candidates = vec![
            CanonicalTeam::new("1", "Liquid Academy", None),
            liquid(),
        ];
        let r = IdentityResolver::default()
            .resolve_index("Team Liquid", &candidates)
            .unwrap();
        assert_eq!(r.index, 1);
        assert_eq!(r.strength, MatchStrength::Exact);
    }

    #[test]
    fn tag_is_an_exact_match() {
        let candidates = vec![fnatic(), liquid()];
        assert_eq!(resolve("tl", &candidates).map(|t| t.id.as_str()), Some("474"));
    }

    #[test]
    fn alias_table_resolves_known_variants() {
        let candidates = vec![fnatic(), liquid()];
        let r = IdentityResolver::default()
            .resolve_index("Liquid", &candidates)
            .unwrap();
        assert_eq!(r.index, 1);
        assert_eq!(r.strength, MatchStrength::Alias);
    }

    #[test]
    fn containment_is_last_resort() {
        let candidates = vec![CanonicalTeam::new("9", "Paper Rex", Some("PRX".into()))];
        let r = IdentityResolver::default()
            .resolve_index("Paper Rex Academy", &candidates)
            .unwrap();
        assert_eq!(r.strength, MatchStrength::Containment);
    }

    #[test]
    fn unknown_label_is_none() {
        let candidates = vec![fnatic(), liquid()];
        assert!(resolve("Paper Rex", &candidates).is_none());
        assert!(resolve("!!!", &candidates).is_none());
    }

    #[test]
    fn slot_follows_target_not_position() {
        let resolver = IdentityResolver::default();
        let candidates = vec![liquid(), fnatic()];
        assert_eq!(resolver.resolve_slot("FNC", "TL", &candidates), Some(Slot::Second));
        assert_eq!(resolver.resolve_slot("Team Liquid", "FNATIC", &candidates), Some(Slot::First));
        // only the opponent is recognisable
        assert_eq!(resolver.resolve_slot("FNATIC", "???", &candidates), Some(Slot::Second));
        assert_eq!(resolver.resolve_slot("NRG", "LOUD", &candidates), None);
    }

    #[test]
    fn slot_prefers_stronger_match() {
        let resolver = IdentityResolver::default();
        let candidates = vec![CanonicalTeam::new("1", "Rex", None)];
        // "Paper Rex" only contains the target, "Rex" is exact
        assert_eq!(resolver.resolve_slot("Paper Rex", "Rex", &candidates), Some(Slot::Second));
    }

    #[test]
    fn match_candidates_adds_opponent() {
        let resolver = IdentityResolver::default();
        let (slot, candidates) = resolver.match_candidates(&liquid(), "FNATIC", "Team Liquid");
        assert_eq!(slot, Some(Slot::Second));
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].name, "FNATIC");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn label() -> impl Strategy<Value = String> {
            prop_oneof![
                Just("Team Liquid".to_string()),
                Just("liquid".to_string()),
                Just("FNC".to_string()),
                Just("Paper Rex Academy".to_string()),
                Just("team heretics".to_string()),
                "[A-Za-z0-9 .-]{0,14}",
            ]
        }

        proptest! {
            #[test]
            fn resolution_is_idempotent(raw in label()) {
                let candidates = vec![
                    liquid(),
                    fnatic(),
                    CanonicalTeam::new("9", "Paper Rex", Some("PRX".into())),
                    CanonicalTeam::new("1001", "Team Heretics", Some("TH".into())),
                ];
                if let Some(team) = resolve(&raw, &candidates) {
                    prop_assert_eq!(resolve(&team.name, &candidates), Some(team));
                }
            }

            #[test]
            fn normalize_is_stable(raw in ".{0,20}") {
                let once = normalize(&raw);
                prop_assert_eq!(normalize(&once), once.clone());
                prop_assert!(once.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
            }
        }
    }
}
