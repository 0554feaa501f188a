/// RustMiskoLive Stats — Logger
/// JSONL event stream, jeden soubor na UTC den

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct EventLogger {
    log_dir: PathBuf,
}

impl EventLogger {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        let dir = log_dir.into();
        fs::create_dir_all(&dir).ok();
        Self { log_dir: dir }
    }

    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }

    pub fn log<T: Serialize>(&self, event: &T) -> Result<()> {
        let date  = Utc::now().format("%Y-%m-%d").to_string();
        let path  = self.log_dir.join(format!("{date}.jsonl"));
        let line  = serde_json::to_string(event)?;
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .context(format!("cannot open event log {}", path.display()))?;
        writeln!(f, "{line}")?;
        Ok(())
    }

    /// Like `log`, but a failed write is only a warning.
    pub fn record<T: Serialize>(&self, event: &T) {
        if let Err(e) = self.log(event) {
            warn!(error = %e, dir = %self.log_dir.display(), "event log write failed");
        }
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

// ── Event typy ────────────────────────────────────────────────────────────────

#[derive(Serialize, Debug)]
pub struct FetchFailedEvent {
    pub ts:        String,
    pub event:     &'static str,   // "FETCH_FAILED"
    pub operation: String,         // "map_stats" | "roster_stability" | ...
    pub resource:  String,         // "match" | "team_profile" | "performance"
    pub id:        String,
    pub reason:    String,
}

impl FetchFailedEvent {
    pub fn new(operation: &str, resource: &str, id: &str, reason: &str) -> Self {
        Self {
            ts:        now_iso(),
            event:     "FETCH_FAILED",
            operation: operation.to_string(),
            resource:  resource.to_string(),
            id:        id.to_string(),
            reason:    reason.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct IdentityUnresolvedEvent {
    pub ts:       String,
    pub event:    &'static str,   // "IDENTITY_UNRESOLVED"
    pub team_id:  String,
    pub match_id: String,
    pub labels:   Vec<String>,
}

impl IdentityUnresolvedEvent {
    pub fn new(team_id: &str, match_id: &str, labels: &[&str]) -> Self {
        Self {
            ts:       now_iso(),
            event:    "IDENTITY_UNRESOLVED",
            team_id:  team_id.to_string(),
            match_id: match_id.to_string(),
            labels:   labels.iter().map(|l| l.to_string()).collect(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ReportComputedEvent {
    pub ts:            String,
    pub event:         &'static str,   // "REPORT_COMPUTED"
    pub operation:     String,
    pub subject_id:    String,
    pub matches_used:  usize,
    pub fetch_failures: usize,
    pub cached:        bool,
}

impl ReportComputedEvent {
    pub fn new(operation: &str, subject_id: &str, matches_used: usize, fetch_failures: usize, cached: bool) -> Self {
        Self {
            ts:             now_iso(),
            event:          "REPORT_COMPUTED",
            operation:      operation.to_string(),
            subject_id:     subject_id.to_string(),
            matches_used,
            fetch_failures,
            cached,
        }
    }
}
