//! RustMiskoLive Stats: aggregation core
//!
//! Pure logic over already-extracted vlr.gg style records: identity
//! resolution, round ledgers, per-map aggregates, roster churn and
//! player stat merging. No I/O here; fetching lives in `extractor`,
//! orchestration in `stats_service`.

pub mod aggregator;
pub mod cache;
pub mod error;
pub mod fetch;
pub mod identity;
pub mod model;
pub mod player_merge;
pub mod roster;
pub mod round_ledger;
pub mod summary;

pub use aggregator::{composition_key, MapAggregate, MatchAggregator};
pub use cache::{cache_key, get_or_compute, AggregationCache, MemoryCache};
pub use error::{StatsError, StatsResult};
pub use fetch::{fetch_in_batches, FetchOutcome, DEFAULT_BATCH_SIZE};
pub use identity::{normalize, CanonicalTeam, IdentityResolver, MatchStrength, Resolution};
pub use model::{
    parse_score, MapDetail, MapRef, MatchDetail, MatchRef, PlayerRow, RawMapPlayerStats,
    RawMatrixCell, RosterMember, RoundMarker, Side, Slot, TeamProfile,
};
pub use player_merge::{
    format_value, ingest_all, merge, AdvancedStat, MapPlayerStats, MatrixKind, MergedMapStats,
};
pub use roster::{diff, RosterSnapshot, RosterStabilityResult, ROSTER_SIZE};
pub use round_ledger::{LedgerTeam, RoundLedger, RoundTally, COMEBACK_THRESHOLD};
pub use summary::{agent_pick_rates, summarize, AgentPickRate, MapRate, RecentRecord, TeamSummary};
