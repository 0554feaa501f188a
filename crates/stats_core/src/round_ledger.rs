//! Round Ledger Builder
//!
//! Round markers → attack/defense round counts and comeback
//! classification. The slot-neutral `RoundTally` is what gets cached per
//! (match, map); `RoundLedger` is its projection onto the target team.

use crate::model::{RoundMarker, Side, Slot};
use serde::{Deserialize, Serialize};

/// Max deficit (rounds) a map winner must have overcome to count as a comeback.
pub const COMEBACK_THRESHOLD: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerTeam {
    Target,
    Opponent,
}

/// Slot-indexed round counts for one map instance.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundTally {
    pub attack_wins: [u32; 2],
    pub defense_wins: [u32; 2],
    /// Largest score deficit each slot faced at any point of the map.
    pub max_deficit: [u32; 2],
    pub completed_rounds: u32,
}

impl RoundTally {
    /// Fewer than two markers is not enough to say anything: all zero.
    pub fn from_markers(markers: &[RoundMarker]) -> Self {
        let mut tally = Self::default();
        if markers.len() < 2 {
            return tally;
        }

        let mut score = [0i64; 2];
        for marker in markers {
            let Some(winner) = marker.winner else {
                continue;
            };
            let w = winner.index();
            match marker.side {
                Side::Attack => tally.attack_wins[w] += 1,
                Side::Defense => tally.defense_wins[w] += 1,
            }
            score[w] += 1;
            tally.completed_rounds += 1;

            let diff = score[0] - score[1];
            if diff < 0 {
                tally.max_deficit[0] = tally.max_deficit[0].max(diff.unsigned_abs() as u32);
            } else if diff > 0 {
                tally.max_deficit[1] = tally.max_deficit[1].max(diff as u32);
            }
        }
        tally
    }

    pub fn wins(&self, slot: Slot) -> u32 {
        let i = slot.index();
        self.attack_wins[i] + self.defense_wins[i]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundLedger {
    pub attack_rounds_won: u32,
    pub defense_rounds_won: u32,
    /// Opponent defense wins, i.e. rounds the target attacked and lost.
    pub attack_rounds_lost: u32,
    /// Opponent attack wins.
    pub defense_rounds_lost: u32,
    pub comeback_by: Option<LedgerTeam>,
}

impl RoundLedger {
    pub fn build(markers: &[RoundMarker], target: Slot, final_score: Option<(u32, u32)>) -> Self {
        Self::from_tally(&RoundTally::from_markers(markers), target, final_score)
    }

    /// `final_score` is oriented (target, opponent). Without it the map
    /// winner is read off the round tally.
    pub fn from_tally(tally: &RoundTally, target: Slot, final_score: Option<(u32, u32)>) -> Self {
        if tally.completed_rounds == 0 {
            return Self::default();
        }

        let t = target.index();
        let o = target.other().index();
        let (own, opp) = final_score.unwrap_or((tally.wins(target), tally.wins(target.other())));
        let winner = if own > opp {
            Some(LedgerTeam::Target)
        } else if opp > own {
            Some(LedgerTeam::Opponent)
        } else {
            None
        };

        let comeback_by = match winner {
            Some(LedgerTeam::Target) if tally.max_deficit[t] >= COMEBACK_THRESHOLD => {
                Some(LedgerTeam::Target)
            }
            Some(LedgerTeam::Opponent) if tally.max_deficit[o] >= COMEBACK_THRESHOLD => {
                Some(LedgerTeam::Opponent)
            }
            _ => None,
        };

        Self {
            attack_rounds_won: tally.attack_wins[t],
            defense_rounds_won: tally.defense_wins[t],
            attack_rounds_lost: tally.defense_wins[o],
            defense_rounds_lost: tally.attack_wins[o],
            comeback_by,
        }
    }

    pub fn total_rounds(&self) -> u32 {
        self.attack_rounds_won + self.defense_rounds_won + self.attack_rounds_lost + self.defense_rounds_lost
    }

    pub fn rounds_won(&self) -> u32 {
        self.attack_rounds_won + self.defense_rounds_won
    }

    pub fn rounds_lost(&self) -> u32 {
        self.attack_rounds_lost + self.defense_rounds_lost
    }
}
