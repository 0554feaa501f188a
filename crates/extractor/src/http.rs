use crate::{check_id, Extractor};
use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use stats_core::{MatchDetail, MatchRef, RawMapPlayerStats, TeamProfile};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

const USER_AGENT: &str = concat!("vlr-stats/", env!("CARGO_PKG_VERSION"));

/// Client for the extraction service. Requests are spaced at least
/// `min_request_interval` apart across all callers.
pub struct HttpExtractor {
    client: reqwest::Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
    min_request_interval: Duration,
}

impl HttpExtractor {
    pub fn new(base_url: impl Into<String>, min_request_interval: Duration) -> Self {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );

        Self {
            client: reqwest::Client::builder()
                .default_headers(headers)
                .user_agent(USER_AGENT)
                .timeout(Duration::from_secs(10))
                .gzip(true)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            last_request: Mutex::new(None),
            min_request_interval,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn wait_for_rate_limit(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_request_interval {
                sleep(self.min_request_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.wait_for_rate_limit().await;
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "extractor GET");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .context(format!("extractor request failed for {}", url))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!("extractor HTTP {} for {}", status, url));
        }

        resp.json::<T>()
            .await
            .context(format!("invalid JSON from {}", url))
    }
}

impl Extractor for HttpExtractor {
    async fn list_team_matches(&self, team_id: &str) -> Result<Vec<MatchRef>> {
        check_id("team", team_id)?;
        self.get_json(&format!("/teams/{}/matches", team_id)).await
    }

    async fn get_match_detail(&self, match_id: &str) -> Result<MatchDetail> {
        check_id("match", match_id)?;
        self.get_json(&format!("/matches/{}", match_id)).await
    }

    async fn get_team_profile(&self, team_id: &str) -> Result<TeamProfile> {
        check_id("team", team_id)?;
        self.get_json(&format!("/teams/{}", team_id)).await
    }

    async fn list_player_matches(&self, player_id: &str) -> Result<Vec<String>> {
        check_id("player", player_id)?;
        self.get_json(&format!("/players/{}/matches", player_id)).await
    }

    async fn get_player_performance(&self, match_id: &str, player_id: &str) -> Result<Vec<RawMapPlayerStats>> {
        check_id("match", match_id)?;
        check_id("player", player_id)?;
        self.get_json(&format!("/matches/{}/performance?player={}", match_id, player_id))
            .await
    }
}
