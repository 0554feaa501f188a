//! Team profile summary and agent pick rates, derived from map aggregates.

use crate::aggregator::MapAggregate;
use crate::identity::{CanonicalTeam, IdentityResolver};
use crate::model::MatchRef;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Best/worst map over the whole history needs this many maps played.
pub const MIN_PLAYED_OVERALL: u32 = 5;
/// Same for the last-10 window.
pub const MIN_PLAYED_RECENT: u32 = 2;
pub const RECENT_MATCHES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapRate {
    pub map: String,
    pub played: u32,
    pub win_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecentRecord {
    pub matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub most_played_map: Option<String>,
    pub best_map: Option<MapRate>,
    pub worst_map: Option<MapRate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSummary {
    pub team_id: String,
    pub team_name: String,
    pub total_maps: u32,
    pub total_wins: u32,
    pub total_losses: u32,
    pub win_rate: Option<f64>,
    pub most_played_map: Option<String>,
    pub best_map: Option<MapRate>,
    pub worst_map: Option<MapRate>,
    pub last10: RecentRecord,
}

/// (most played, best, worst). Input order breaks ties.
fn map_extremes(maps: &[MapAggregate], min_played: u32) -> (Option<String>, Option<MapRate>, Option<MapRate>) {
    let most_played = maps
        .iter()
        .fold(None::<&MapAggregate>, |best, m| match best {
            Some(b) if b.played >= m.played => Some(b),
            _ => Some(m),
        })
        .map(|m| m.map.clone());

    let mut best: Option<MapRate> = None;
    let mut worst: Option<MapRate> = None;
    for m in maps.iter().filter(|m| m.played >= min_played) {
        let Some(rate) = m.win_rate else { continue };
        let entry = || MapRate {
            map: m.map.clone(),
            played: m.played,
            win_rate: rate,
        };
        if best.as_ref().map_or(true, |b| rate > b.win_rate) {
            best = Some(entry());
        }
        if worst.as_ref().map_or(true, |w| rate < w.win_rate) {
            worst = Some(entry());
        }
    }
    (most_played, best, worst)
}

/// `all_maps` covers the full recent match list, `recent_maps` and
/// `recent_matches` the last ten. Series without a resolvable target or
/// with a tied/missing score are left out of the recent record.
pub fn summarize(
    team: &CanonicalTeam,
    all_maps: &[MapAggregate],
    recent_maps: &[MapAggregate],
    recent_matches: &[MatchRef],
    resolver: &IdentityResolver,
) -> TeamSummary {
    let total_maps = all_maps.iter().map(|m| m.played).sum();
    let total_wins: u32 = all_maps.iter().map(|m| m.wins).sum();
    let total_losses: u32 = all_maps.iter().map(|m| m.losses).sum();
    let decided = total_wins + total_losses;
    let (most_played_map, best_map, worst_map) = map_extremes(all_maps, MIN_PLAYED_OVERALL);

    let mut last10 = RecentRecord::default();
    let candidates = std::slice::from_ref(team);
    for m in recent_matches.iter().take(RECENT_MATCHES) {
        last10.matches += 1;
        let Some(slot) = resolver.resolve_slot(&m.team1, &m.team2, candidates) else {
            continue;
        };
        match m.score.map(|s| slot.orient(s)) {
            Some((own, opp)) if own > opp => last10.wins += 1,
            Some((own, opp)) if own < opp => last10.losses += 1,
            _ => {}
        }
    }
    let (most, best, worst) = map_extremes(recent_maps, MIN_PLAYED_RECENT);
    last10.most_played_map = most;
    last10.best_map = best;
    last10.worst_map = worst;

    TeamSummary {
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        total_maps,
        total_wins,
        total_losses,
        win_rate: (decided > 0).then(|| total_wins as f64 / decided as f64),
        most_played_map,
        best_map,
        worst_map,
        last10,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentPickRate {
    pub agent: String,
    pub played: u32,
    /// Share of all agent picks, [0, 1].
    pub pick_rate: f64,
}

/// Every agent of every counted composition, across all maps.
pub fn agent_pick_rates(maps: &[MapAggregate]) -> Vec<AgentPickRate> {
    let mut counts: BTreeMap<&str, u32> = BTreeMap::new();
    for map in maps {
        for (comp, times) in &map.composition_frequency {
            for agent in comp.split(',').filter(|a| !a.is_empty()) {
                *counts.entry(agent).or_insert(0) += times;
            }
        }
    }
    let total: u32 = counts.values().sum();
    let mut out: Vec<AgentPickRate> = counts
        .into_iter()
        .map(|(agent, played)| AgentPickRate {
            agent: agent.to_string(),
            played,
            pick_rate: if total > 0 { played as f64 / total as f64 } else { 0.0 },
        })
        .collect();
    out.sort_by(|a, b| b.played.cmp(&a.played).then_with(|| a.agent.cmp(&b.agent)));
    out
}
