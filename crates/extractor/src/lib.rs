//! RustMiskoLive Stats: Extractor
//!
//! The boundary to the upstream page extraction. Everything past this
//! trait works on typed records; how they were scraped is not our concern.
//!
//! - `HttpExtractor`: JSON over HTTP against a running extraction service
//! - `FixtureExtractor`: pre-extracted JSON files on disk

mod fixture;
mod http;

pub use fixture::FixtureExtractor;
pub use http::HttpExtractor;

use anyhow::{bail, Result};
use stats_core::{MatchDetail, MatchRef, RawMapPlayerStats, TeamProfile};
use std::future::Future;

pub trait Extractor: Send + Sync {
    /// Most recent first.
    fn list_team_matches(&self, team_id: &str) -> impl Future<Output = Result<Vec<MatchRef>>> + Send;

    fn get_match_detail(&self, match_id: &str) -> impl Future<Output = Result<MatchDetail>> + Send;

    fn get_team_profile(&self, team_id: &str) -> impl Future<Output = Result<TeamProfile>> + Send;

    /// Match ids, most recent first.
    fn list_player_matches(&self, player_id: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

    /// Per-map performance tab of `player_id` in one match.
    fn get_player_performance(
        &self,
        match_id: &str,
        player_id: &str,
    ) -> impl Future<Output = Result<Vec<RawMapPlayerStats>>> + Send;
}

/// Ids end up in URL paths and file names: `[A-Za-z0-9_-]+` only.
pub fn check_id(kind: &str, id: &str) -> Result<()> {
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        bail!("invalid {} id {:?}", kind, id);
    }
    Ok(())
}
