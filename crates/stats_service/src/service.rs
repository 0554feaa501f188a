//! Request-level orchestration: fetch through the Extractor, aggregate with
//! `stats_core`, memoize through injected caches.

use crate::config::StatsConfig;
use anyhow::{Context, Result};
use extractor::Extractor;
use logger::{EventLogger, FetchFailedEvent, IdentityUnresolvedEvent, ReportComputedEvent};
use serde::Serialize;
use stats_core::summary::RECENT_MATCHES;
use stats_core::{
    agent_pick_rates, cache_key, fetch_in_batches, get_or_compute, ingest_all, merge,
    summarize, AgentPickRate, AggregationCache, CanonicalTeam, FetchOutcome, IdentityResolver,
    MapAggregate, MatchAggregator, MatchDetail, MatchRef, MemoryCache, MergedMapStats,
    RosterSnapshot, RosterStabilityResult, RoundTally, StatsError, TeamProfile, TeamSummary,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerMapReport {
    pub player_id: String,
    pub matches_requested: usize,
    pub matches_used: usize,
    pub maps: Vec<MergedMapStats>,
}

/// Injected caches, one per memoized computation.
#[derive(Clone)]
pub struct ServiceCaches {
    pub roster: Arc<dyn AggregationCache<RosterStabilityResult>>,
    pub snapshots: Arc<dyn AggregationCache<RosterSnapshot>>,
    pub tallies: Arc<dyn AggregationCache<RoundTally>>,
    pub map_stats: Arc<dyn AggregationCache<Vec<MapAggregate>>>,
}

impl Default for ServiceCaches {
    fn default() -> Self {
        Self {
            roster: Arc::new(MemoryCache::new()),
            snapshots: Arc::new(MemoryCache::new()),
            tallies: Arc::new(MemoryCache::new()),
            map_stats: Arc::new(MemoryCache::new()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct FetchTally {
    used: usize,
    failed: usize,
}

pub struct StatsService<E: Extractor> {
    extractor: E,
    resolver: IdentityResolver,
    caches: ServiceCaches,
    config: StatsConfig,
    events: Option<EventLogger>,
}

impl<E: Extractor> StatsService<E> {
    pub fn new(extractor: E, config: StatsConfig) -> Self {
        Self {
            extractor,
            resolver: IdentityResolver::default(),
            caches: ServiceCaches::default(),
            config,
            events: None,
        }
    }

    pub fn with_caches(mut self, caches: ServiceCaches) -> Self {
        self.caches = caches;
        self
    }

    pub fn with_resolver(mut self, resolver: IdentityResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_event_logger(mut self, events: EventLogger) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &StatsConfig {
        &self.config
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    // ── Exposed operations ────────────────────────────────────────────────

    /// Per-map aggregates over the `window` most recent matches (all when `None`).
    pub async fn compute_map_stats(&self, team_id: &str, window: Option<usize>) -> Result<Vec<MapAggregate>> {
        let window_key = window.map_or_else(|| "all".to_string(), |w| w.to_string());
        let key = cache_key("map_stats", &[team_id, window_key.as_str()]);
        let computed = AtomicBool::new(false);

        let stats = get_or_compute(self.caches.map_stats.as_ref(), &key, self.config.default_ttl, || async {
            computed.store(true, Ordering::Relaxed);
            let (team, _) = self.team(team_id).await?;
            let matches = self.team_matches(team_id).await?;
            let window = window.unwrap_or(matches.len()).min(matches.len());
            let recent = &matches[..window];

            self.report_unresolved(&team, recent);
            let (details, tally) = self.fetch_details("map_stats", recent).await;
            let out = MatchAggregator::new(&team, &self.resolver)
                .with_tally_cache(self.caches.tallies.as_ref(), self.config.snapshot_ttl)
                .aggregate(recent, &details, None);

            info!(team_id, maps = out.len(), matches = window, failed = tally.failed, "map stats computed");
            self.record(&ReportComputedEvent::new("map_stats", team_id, tally.used, tally.failed, false));
            Ok::<_, anyhow::Error>(out)
        })
        .await?;

        if !computed.load(Ordering::Relaxed) {
            self.record(&ReportComputedEvent::new("map_stats", team_id, 0, 0, true));
        }
        Ok(stats)
    }

    /// Errors: `TeamNotFound`, `NoMatches`, `InsufficientSnapshots`
    /// (downcast from the returned `anyhow::Error`).
    pub async fn compute_roster_stability(&self, team_id: &str) -> Result<RosterStabilityResult> {
        let key = cache_key("roster_stability", &[team_id]);
        let computed = AtomicBool::new(false);

        let result = get_or_compute(self.caches.roster.as_ref(), &key, self.config.roster_ttl, || async {
            computed.store(true, Ordering::Relaxed);
            let (team, profile) = self.team(team_id).await?;
            let matches = self.team_matches(team_id).await?;
            if matches.is_empty() {
                return Err(anyhow::Error::from(StatsError::NoMatches(team_id.to_string())));
            }
            let recent = &matches[..matches.len().min(self.config.roster_window)];
            let (snapshots, tally) = self.roster_snapshots(&team, recent).await;

            let mut result = stats_core::diff(team_id, &snapshots)?;
            result.team_name = Some(team.name.clone());
            let profile_roster: Vec<String> = profile
                .roster
                .iter()
                .filter_map(|m| match m.id.as_deref().map(str::trim) {
                    Some(id) if !id.is_empty() => Some(id.to_string()),
                    _ => {
                        debug!(team_id, name = %m.name, "roster member without id, skipped");
                        None
                    }
                })
                .collect();
            if !profile_roster.is_empty() {
                result.current_roster = profile_roster;
            }

            info!(
                team_id,
                score = result.stability_score,
                changes = result.roster_changes,
                snapshots = result.snapshots_used,
                "roster stability computed"
            );
            self.record(&ReportComputedEvent::new("roster_stability", team_id, tally.used, tally.failed, false));
            Ok::<_, anyhow::Error>(result)
        })
        .await?;

        if !computed.load(Ordering::Relaxed) {
            self.record(&ReportComputedEvent::new("roster_stability", team_id, 0, 0, true));
        }
        Ok(result)
    }

    /// Averaged advanced stats per map over the player's last `match_count`
    /// matches. A match whose performance tab fails is skipped.
    pub async fn merge_player_stats(&self, player_id: &str, match_count: usize) -> Result<PlayerMapReport> {
        let match_ids = self
            .extractor
            .list_player_matches(player_id)
            .await
            .context(format!("cannot list matches of player {}", player_id))?;
        if match_ids.is_empty() {
            return Err(StatsError::NoMatches(player_id.to_string()).into());
        }
        let wanted: Vec<String> = match_ids.into_iter().take(match_count.max(1)).collect();

        let extractor = &self.extractor;
        let outcomes = fetch_in_batches(&wanted, self.config.batch_size, move |match_id: String| async move {
            extractor.get_player_performance(&match_id, player_id).await
        })
        .await;

        let mut tally = FetchTally::default();
        let mut raw = Vec::new();
        for (match_id, outcome) in outcomes {
            match outcome {
                FetchOutcome::Success(entries) => {
                    tally.used += 1;
                    raw.extend(entries);
                }
                FetchOutcome::Failed(reason) => {
                    tally.failed += 1;
                    self.record(&FetchFailedEvent::new("player_stats", "performance", &match_id, &reason));
                }
            }
        }

        let maps = merge(&ingest_all(&raw));
        info!(player_id, maps = maps.len(), used = tally.used, failed = tally.failed, "player stats merged");
        self.record(&ReportComputedEvent::new("player_stats", player_id, tally.used, tally.failed, false));

        Ok(PlayerMapReport {
            player_id: player_id.to_string(),
            matches_requested: wanted.len(),
            matches_used: tally.used,
            maps,
        })
    }

    /// Totals over the whole match list plus a last-10 view. Uses map
    /// scores only, no detail fetches.
    pub async fn compute_team_summary(&self, team_id: &str) -> Result<TeamSummary> {
        let (team, _) = self.team(team_id).await?;
        let matches = self.team_matches(team_id).await?;
        let no_details = HashMap::new();
        let aggregator = MatchAggregator::new(&team, &self.resolver);

        let all_maps = aggregator.aggregate(&matches, &no_details, None);
        let recent_maps = aggregator.aggregate(&matches, &no_details, Some(RECENT_MATCHES));
        let recent = &matches[..matches.len().min(RECENT_MATCHES)];
        let summary = summarize(&team, &all_maps, &recent_maps, recent, &self.resolver);

        self.record(&ReportComputedEvent::new("team_summary", team_id, matches.len(), 0, false));
        Ok(summary)
    }

    pub async fn compute_agent_stats(&self, team_id: &str, window: Option<usize>) -> Result<Vec<AgentPickRate>> {
        let maps = self.compute_map_stats(team_id, window).await?;
        Ok(agent_pick_rates(&maps))
    }

    // ── Internals ─────────────────────────────────────────────────────────

    async fn team(&self, team_id: &str) -> Result<(CanonicalTeam, TeamProfile)> {
        match self.extractor.get_team_profile(team_id).await {
            Ok(profile) => Ok((CanonicalTeam::from_profile(&profile), profile)),
            Err(e) => {
                let reason = format!("{e:#}");
                warn!(team_id, %reason, "team profile fetch failed");
                self.record(&FetchFailedEvent::new("team", "team_profile", team_id, &reason));
                Err(StatsError::TeamNotFound(team_id.to_string()).into())
            }
        }
    }

    async fn team_matches(&self, team_id: &str) -> Result<Vec<MatchRef>> {
        self.extractor
            .list_team_matches(team_id)
            .await
            .context(format!("cannot list matches of team {}", team_id))
    }

    async fn fetch_details(
        &self,
        operation: &str,
        matches: &[MatchRef],
    ) -> (HashMap<String, FetchOutcome<MatchDetail>>, FetchTally) {
        let ids: Vec<String> = matches.iter().map(|m| m.id.clone()).collect();
        let extractor = &self.extractor;
        let outcomes = fetch_in_batches(&ids, self.config.batch_size, move |id: String| async move {
            extractor.get_match_detail(&id).await
        })
        .await;

        let mut tally = FetchTally::default();
        for (id, outcome) in &outcomes {
            match outcome {
                FetchOutcome::Success(_) => tally.used += 1,
                FetchOutcome::Failed(reason) => {
                    tally.failed += 1;
                    self.record(&FetchFailedEvent::new(operation, "match", id, reason));
                }
            }
        }
        (outcomes.into_iter().collect(), tally)
    }

    /// Snapshots in `matches` order; cached per (match, team), failures
    /// are empty snapshots and never cached.
    async fn roster_snapshots(&self, team: &CanonicalTeam, matches: &[MatchRef]) -> (Vec<RosterSnapshot>, FetchTally) {
        let mut tally = FetchTally::default();
        let mut found: HashMap<String, RosterSnapshot> = HashMap::new();
        let mut missing = Vec::new();
        for m in matches {
            match self.caches.snapshots.get(&cache_key("match_roster", &[m.id.as_str(), team.id.as_str()])) {
                Some(snapshot) => {
                    tally.used += 1;
                    found.insert(m.id.clone(), snapshot);
                }
                None => missing.push(m.clone()),
            }
        }
        debug!(team_id = %team.id, cached = found.len(), missing = missing.len(), "roster snapshots");

        if !missing.is_empty() {
            let (details, fetched) = self.fetch_details("roster_stability", &missing).await;
            tally.used += fetched.used;
            tally.failed += fetched.failed;
            for (id, outcome) in details {
                if let FetchOutcome::Success(detail) = outcome {
                    let snapshot = RosterSnapshot::from_detail(&detail, team, &self.resolver);
                    self.caches.snapshots.set(
                        &cache_key("match_roster", &[id.as_str(), team.id.as_str()]),
                        snapshot.clone(),
                        self.config.snapshot_ttl,
                    );
                    found.insert(id, snapshot);
                }
            }
        }

        let snapshots = matches
            .iter()
            .map(|m| {
                found
                    .remove(&m.id)
                    .unwrap_or_else(|| RosterSnapshot::new(m.id.clone(), Vec::<String>::new()))
            })
            .collect();
        (snapshots, tally)
    }

    fn report_unresolved(&self, team: &CanonicalTeam, matches: &[MatchRef]) {
        let candidates = std::slice::from_ref(team);
        for m in matches {
            if self.resolver.resolve_slot(&m.team1, &m.team2, candidates).is_none() {
                self.record(&IdentityUnresolvedEvent::new(&team.id, &m.id, &[m.team1.as_str(), m.team2.as_str()]));
            }
        }
    }

    fn record<T: Serialize>(&self, event: &T) {
        if let Some(events) = &self.events {
            events.record(event);
        }
    }
}
