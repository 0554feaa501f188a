//! Match Aggregator
//!
//! Per-map statistics for one team over a (most-recent-first) window of
//! matches: played / won / lost from map scores, attack/defense round
//! rates from round ledgers, and composition frequency.

use crate::cache::{cache_key, AggregationCache};
use crate::fetch::FetchOutcome;
use crate::identity::{normalize, CanonicalTeam, IdentityResolver};
use crate::model::{MapDetail, MatchDetail, MatchRef, PlayerRow, Slot};
use crate::round_ledger::{LedgerTeam, RoundLedger, RoundTally};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, warn};

const COMPOSITION_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapAggregate {
    pub map: String,
    pub played: u32,
    pub wins: u32,
    pub losses: u32,
    /// wins / (wins + losses)
    pub win_rate: Option<f64>,
    pub attack_rounds_won: u32,
    pub attack_rounds_lost: u32,
    pub defense_rounds_won: u32,
    pub defense_rounds_lost: u32,
    /// Over rounds actually played on attack.
    pub attack_win_rate: Option<f64>,
    pub defense_win_rate: Option<f64>,
    pub comebacks: u32,
    pub comebacks_conceded: u32,
    /// "agent1,agent2,..." (lowercase, sorted) → times fielded
    pub composition_frequency: BTreeMap<String, u32>,
}

impl MapAggregate {
    /// Composition keys split back into agent lists, most fielded first.
    pub fn compositions(&self) -> Vec<(Vec<String>, u32)> {
        let mut comps: Vec<(Vec<String>, u32)> = self
            .composition_frequency
            .iter()
            .map(|(key, times)| (key.split(',').map(String::from).collect(), *times))
            .collect();
        comps.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        comps
    }
}

/// Order-insensitive composition key.
pub fn composition_key<'a>(agents: impl IntoIterator<Item = &'a str>) -> String {
    let mut agents: Vec<String> = agents.into_iter().map(|a| a.trim().to_lowercase()).collect();
    agents.sort();
    agents.join(",")
}

fn rate(won: u32, lost: u32) -> Option<f64> {
    let total = won + lost;
    (total > 0).then(|| won as f64 / total as f64)
}

#[derive(Default)]
struct MapAccumulator {
    played: u32,
    wins: u32,
    losses: u32,
    ledger: RoundLedger,
    comebacks: u32,
    comebacks_conceded: u32,
    compositions: BTreeMap<String, u32>,
}

impl MapAccumulator {
    fn fold_ledger(&mut self, ledger: &RoundLedger) {
        self.ledger.attack_rounds_won += ledger.attack_rounds_won;
        self.ledger.attack_rounds_lost += ledger.attack_rounds_lost;
        self.ledger.defense_rounds_won += ledger.defense_rounds_won;
        self.ledger.defense_rounds_lost += ledger.defense_rounds_lost;
        match ledger.comeback_by {
            Some(LedgerTeam::Target) => self.comebacks += 1,
            Some(LedgerTeam::Opponent) => self.comebacks_conceded += 1,
            None => {}
        }
    }

    fn finish(self, map: String) -> MapAggregate {
        let l = self.ledger;
        MapAggregate {
            map,
            played: self.played,
            wins: self.wins,
            losses: self.losses,
            win_rate: rate(self.wins, self.losses),
            attack_rounds_won: l.attack_rounds_won,
            attack_rounds_lost: l.attack_rounds_lost,
            defense_rounds_won: l.defense_rounds_won,
            defense_rounds_lost: l.defense_rounds_lost,
            attack_win_rate: rate(l.attack_rounds_won, l.attack_rounds_lost),
            defense_win_rate: rate(l.defense_rounds_won, l.defense_rounds_lost),
            comebacks: self.comebacks,
            comebacks_conceded: self.comebacks_conceded,
            composition_frequency: self.compositions,
        }
    }
}

pub struct MatchAggregator<'a> {
    target: &'a CanonicalTeam,
    resolver: &'a IdentityResolver,
    tallies: Option<(&'a dyn AggregationCache<RoundTally>, Duration)>,
}

impl<'a> MatchAggregator<'a> {
    pub fn new(target: &'a CanonicalTeam, resolver: &'a IdentityResolver) -> Self {
        Self {
            target,
            resolver,
            tallies: None,
        }
    }

    /// Round tallies get memoized per (match, map).
    pub fn with_tally_cache(mut self, cache: &'a dyn AggregationCache<RoundTally>, ttl: Duration) -> Self {
        self.tallies = Some((cache, ttl));
        self
    }

    /// `details` is keyed by match id; a missing key counts like a failed
    /// fetch: the match still contributes played/wins/losses.
    pub fn aggregate(
        &self,
        matches: &[MatchRef],
        details: &HashMap<String, FetchOutcome<MatchDetail>>,
        window: Option<usize>,
    ) -> Vec<MapAggregate> {
        let window = window.unwrap_or(matches.len());
        let mut maps: BTreeMap<String, MapAccumulator> = BTreeMap::new();

        for m in matches.iter().take(window) {
            let (slot, candidates) = self
                .resolver
                .match_candidates(self.target, &m.team1, &m.team2);
            if slot.is_none() {
                warn!(
                    match_id = %m.id,
                    team1 = %m.team1,
                    team2 = %m.team2,
                    target = %self.target.name,
                    "target team not found in match, excluding from win/loss"
                );
            }

            let detail = match details.get(&m.id) {
                Some(FetchOutcome::Success(d)) => Some(d),
                Some(FetchOutcome::Failed(reason)) => {
                    debug!(match_id = %m.id, %reason, "no detail, scores only");
                    None
                }
                None => None,
            };
            let mut used = vec![false; detail.map_or(0, |d| d.maps.len())];

            for map_ref in &m.maps {
                let name = map_ref.name.trim();
                if name.is_empty() {
                    continue;
                }
                let acc = maps.entry(name.to_string()).or_default();
                acc.played += 1;

                let oriented = slot.zip(map_ref.score).map(|(s, score)| s.orient(score));
                match oriented {
                    Some((own, opp)) if own > opp => acc.wins += 1,
                    Some((own, opp)) if own < opp => acc.losses += 1,
                    _ => {}
                }

                let Some(detail) = detail else { continue };
                let wanted = normalize(name);
                let Some(idx) = detail
                    .maps
                    .iter()
                    .enumerate()
                    .position(|(i, d)| !used[i] && normalize(&d.name) == wanted)
                else {
                    debug!(match_id = %m.id, map = name, "map missing from detail");
                    continue;
                };
                used[idx] = true;
                let map_detail = &detail.maps[idx];

                if let Some(ledger) = self.ledger_for(&m.id, map_detail, &candidates, oriented) {
                    acc.fold_ledger(&ledger);
                }

                if let Some(key) = self.composition_for(map_detail, &candidates) {
                    *acc.compositions.entry(key).or_insert(0) += 1;
                } else {
                    debug!(match_id = %m.id, map = name, "no composition for map");
                }
            }
        }

        let mut out: Vec<MapAggregate> = maps
            .into_iter()
            .map(|(name, acc)| acc.finish(name))
            .collect();
        out.sort_by(|a, b| b.played.cmp(&a.played).then_with(|| a.map.cmp(&b.map)));
        out
    }

    /// Slot is re-resolved from the round breakdown labels: they do not
    /// always follow the match header order.
    fn ledger_for(
        &self,
        match_id: &str,
        map: &MapDetail,
        candidates: &[CanonicalTeam],
        final_score: Option<(u32, u32)>,
    ) -> Option<RoundLedger> {
        let slot: Option<Slot> = map
            .round_labels
            .as_ref()
            .and_then(|(a, b)| self.resolver.resolve_slot(a, b, candidates));
        let Some(slot) = slot else {
            warn!(
                match_id,
                map = %map.name,
                labels = ?map.round_labels,
                "round breakdown team slot unresolved, skipping rounds"
            );
            return None;
        };

        let tally = match self.tallies {
            Some((cache, ttl)) => {
                let key = cache_key("round_tally", &[match_id, normalize(&map.name).as_str()]);
                cache.get(&key).unwrap_or_else(|| {
                    let tally = RoundTally::from_markers(&map.round_markers);
                    cache.set(&key, tally.clone(), ttl);
                    tally
                })
            }
            None => RoundTally::from_markers(&map.round_markers),
        };
        Some(RoundLedger::from_tally(&tally, slot, final_score))
    }

    fn composition_for(&self, map: &MapDetail, candidates: &[CanonicalTeam]) -> Option<String> {
        let resolved: Vec<Option<usize>> = map
            .players
            .iter()
            .map(|p| self.resolver.resolve_index(&p.team, candidates).map(|r| r.index))
            .collect();

        let mut rows: Vec<&PlayerRow> = map
            .players
            .iter()
            .zip(&resolved)
            .filter(|(_, r)| **r == Some(0))
            .map(|(p, _)| p)
            .collect();

        if rows.len() != COMPOSITION_SIZE {
            // most frequent label among rows that are not the opponent
            let mut counts: Vec<(String, usize)> = Vec::new();
            for (p, r) in map.players.iter().zip(&resolved) {
                if matches!(r, Some(i) if *i != 0) {
                    continue;
                }
                let label = normalize(&p.team);
                match counts.iter_mut().find(|(l, _)| *l == label) {
                    Some((_, n)) => *n += 1,
                    None => counts.push((label, 1)),
                }
            }
            // max_by_key keeps the last maximum; reverse so ties go to first seen
            let fallback = counts.iter().rev().max_by_key(|(_, n)| *n).map(|(l, _)| l.clone());
            debug!(map = %map.name, found = rows.len(), ?fallback, "composition fallback to most frequent label");
            if let Some(label) = fallback {
                rows = map
                    .players
                    .iter()
                    .filter(|p| normalize(&p.team) == label)
                    .collect();
            }
        }

        if rows.len() != COMPOSITION_SIZE {
            return None;
        }
        let agents: Option<Vec<&str>> = rows
            .iter()
            .map(|p| p.agent.as_deref().filter(|a| !a.trim().is_empty()))
            .collect();
        agents.map(composition_key)
    }
}
