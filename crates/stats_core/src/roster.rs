//! Roster Differ
//!
//! Diffs per-match roster snapshots into join/leave sets and a stability
//! score: `1 - changes / ((snapshots - 1) * 5)`, clamped to [0, 1].

use crate::error::{StatsError, StatsResult};
use crate::identity::{CanonicalTeam, IdentityResolver};
use crate::model::MatchDetail;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, warn};

pub const ROSTER_SIZE: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterSnapshot {
    pub match_id: String,
    pub player_ids: BTreeSet<String>,
}

impl RosterSnapshot {
    pub fn new<I, S>(match_id: impl Into<String>, player_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            match_id: match_id.into(),
            player_ids: player_ids.into_iter().map(Into::into).collect(),
        }
    }

    /// Players whose team label resolves to `target` on any map of the
    /// match. Rows without a player id are skipped.
    pub fn from_detail(detail: &MatchDetail, target: &CanonicalTeam, resolver: &IdentityResolver) -> Self {
        let (slot, candidates) = resolver.match_candidates(target, &detail.team1, &detail.team2);
        if slot.is_none() {
            warn!(match_id = %detail.id, team1 = %detail.team1, team2 = %detail.team2, "target not in match detail, empty snapshot");
        }

        let mut player_ids = BTreeSet::new();
        for map in &detail.maps {
            for row in &map.players {
                match resolver.resolve_index(&row.team, &candidates) {
                    Some(r) if r.index == 0 => match row.player_id.as_deref().map(str::trim) {
                        Some(id) if !id.is_empty() => {
                            player_ids.insert(id.to_string());
                        }
                        _ => debug!(match_id = %detail.id, name = %row.name, "player row without id, skipped"),
                    },
                    Some(_) => {}
                    None => debug!(match_id = %detail.id, label = %row.team, "player row team unresolved"),
                }
            }
        }

        Self {
            match_id: detail.id.clone(),
            player_ids,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.player_ids.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterStabilityResult {
    pub team_id: String,
    pub team_name: Option<String>,
    pub current_roster: Vec<String>,
    pub new_players: Vec<String>,
    pub left_players: Vec<String>,
    pub roster_changes: u32,
    pub max_possible_changes: u32,
    /// [0, 1], two decimals.
    pub stability_score: f64,
    pub snapshots_used: usize,
}

/// `snapshots` are ordered newest → oldest. Empty snapshots are skipped;
/// fewer than two usable ones is an error, not a default score.
pub fn diff(team_id: &str, snapshots: &[RosterSnapshot]) -> StatsResult<RosterStabilityResult> {
    let usable: Vec<&RosterSnapshot> = snapshots.iter().filter(|s| !s.is_empty()).collect();
    if usable.len() < 2 {
        return Err(StatsError::InsufficientSnapshots {
            available: usable.len(),
        });
    }

    let mut new_players: BTreeSet<&str> = BTreeSet::new();
    let mut left_players: BTreeSet<&str> = BTreeSet::new();

    // od nejnovějšího: kdo chybí ve starším zápase odešel, kdo přibyl je nový
    for pair in usable.windows(2) {
        let (previous, current) = (pair[0], pair[1]);
        for id in previous.player_ids.difference(&current.player_ids) {
            left_players.insert(id);
        }
        for id in current.player_ids.difference(&previous.player_ids) {
            new_players.insert(id);
        }
    }

    let roster_changes = (new_players.len() + left_players.len()) as u32;
    let max_possible_changes = ((usable.len() - 1) * ROSTER_SIZE) as u32;
    let stability_score = stability_score(roster_changes, max_possible_changes);

    debug!(
        team_id,
        snapshots = usable.len(),
        roster_changes,
        max_possible_changes,
        stability_score,
        "roster diff"
    );

    Ok(RosterStabilityResult {
        team_id: team_id.to_string(),
        team_name: None,
        current_roster: usable[0].player_ids.iter().cloned().collect(),
        new_players: new_players.into_iter().map(String::from).collect(),
        left_players: left_players.into_iter().map(String::from).collect(),
        roster_changes,
        max_possible_changes,
        stability_score,
        snapshots_used: usable.len(),
    })
}

fn stability_score(changes: u32, max_possible: u32) -> f64 {
    if max_possible == 0 {
        return 0.0;
    }
    let raw = (1.0 - changes as f64 / max_possible as f64).clamp(0.0, 1.0);
    (raw * 100.0).round() / 100.0
}
