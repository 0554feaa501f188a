use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    /// `None` → records come from `fixture_dir`.
    pub extractor_url: Option<String>,
    pub fixture_dir: PathBuf,
    pub log_dir: PathBuf,
    pub batch_size: usize,
    /// Matches diffed for roster stability.
    pub roster_window: usize,
    pub roster_ttl: Duration,
    pub snapshot_ttl: Duration,
    /// Map-stats reports.
    pub default_ttl: Duration,
    pub player_match_limit: usize,
    pub extractor_min_interval: Duration,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            extractor_url: None,
            fixture_dir: PathBuf::from("fixtures"),
            log_dir: PathBuf::from("logs"),
            batch_size: stats_core::DEFAULT_BATCH_SIZE,
            roster_window: 20,
            roster_ttl: Duration::from_secs(3600),
            snapshot_ttl: Duration::from_secs(3600),
            default_ttl: Duration::from_secs(120),
            player_match_limit: 5,
            extractor_min_interval: Duration::from_millis(250),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    match lookup(key) {
        Some(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!(key, value = %raw, "unparsable config value, using default");
            default
        }),
        None => default,
    }
}

impl StatsConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Self::default();
        Self {
            extractor_url: lookup("EXTRACTOR_URL").filter(|u| !u.trim().is_empty()),
            fixture_dir: lookup("STATS_FIXTURE_DIR").map(PathBuf::from).unwrap_or(d.fixture_dir),
            log_dir: lookup("STATS_LOG_DIR").map(PathBuf::from).unwrap_or(d.log_dir),
            batch_size: parsed(&lookup, "STATS_BATCH_SIZE", d.batch_size).max(1),
            roster_window: parsed(&lookup, "STATS_ROSTER_WINDOW", d.roster_window).max(2),
            roster_ttl: Duration::from_secs(parsed(&lookup, "STATS_ROSTER_TTL_SECS", d.roster_ttl.as_secs())),
            snapshot_ttl: Duration::from_secs(parsed(&lookup, "STATS_SNAPSHOT_TTL_SECS", d.snapshot_ttl.as_secs())),
            default_ttl: Duration::from_secs(parsed(&lookup, "STATS_DEFAULT_TTL_SECS", d.default_ttl.as_secs())),
            player_match_limit: parsed(&lookup, "STATS_PLAYER_MATCH_LIMIT", d.player_match_limit),
            extractor_min_interval: Duration::from_millis(parsed(
                &lookup,
                "EXTRACTOR_MIN_INTERVAL_MS",
                d.extractor_min_interval.as_millis() as u64,
            )),
        }
    }
}
