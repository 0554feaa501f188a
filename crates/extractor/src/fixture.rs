use crate::{check_id, Extractor};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use stats_core::{MatchDetail, MatchRef, RawMapPlayerStats, TeamProfile};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads records dumped by the extraction service:
///
/// ```text
/// <root>/teams/<team>.json
/// <root>/team_matches/<team>.json
/// <root>/matches/<match>.json
/// <root>/player_matches/<player>.json
/// <root>/performance/<match>_<player>.json
/// ```
pub struct FixtureExtractor {
    root: PathBuf,
}

impl FixtureExtractor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn read_json<T: DeserializeOwned>(&self, dir: &str, name: &str) -> Result<T> {
        let path = self.root.join(dir).join(format!("{}.json", name));
        debug!(path = %path.display(), "reading fixture");
        let raw = tokio::fs::read_to_string(&path)
            .await
            .context(format!("fixture not readable: {}", path.display()))?;
        serde_json::from_str(&raw).context(format!("invalid fixture JSON: {}", path.display()))
    }
}

impl Extractor for FixtureExtractor {
    async fn list_team_matches(&self, team_id: &str) -> Result<Vec<MatchRef>> {
        check_id("team", team_id)?;
        self.read_json("team_matches", team_id).await
    }

    async fn get_match_detail(&self, match_id: &str) -> Result<MatchDetail> {
        check_id("match", match_id)?;
        self.read_json("matches", match_id).await
    }

    async fn get_team_profile(&self, team_id: &str) -> Result<TeamProfile> {
        check_id("team", team_id)?;
        self.read_json("teams", team_id).await
    }

    async fn list_player_matches(&self, player_id: &str) -> Result<Vec<String>> {
        check_id("player", player_id)?;
        self.read_json("player_matches", player_id).await
    }

    async fn get_player_performance(&self, match_id: &str, player_id: &str) -> Result<Vec<RawMapPlayerStats>> {
        check_id("match", match_id)?;
        check_id("player", player_id)?;
        self.read_json("performance", &format!("{}_{}", match_id, player_id))
            .await
    }
}
