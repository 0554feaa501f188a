/// RustMiskoLive Stats — report runner
///
/// Co dělá:
///   1. Načte konfiguraci z .env / prostředí (StatsConfig)
///   2. Vybere zdroj dat: EXTRACTOR_URL → HTTP, jinak fixtures na disku
///   3. Spočítá jeden report a vypíše ho jako JSON na stdout
///
/// Spuštění:
///   cargo run --bin stats-cli -- map-stats 474 [window]
///   cargo run --bin stats-cli -- roster 474
///   cargo run --bin stats-cli -- player 9 [matches]
///   cargo run --bin stats-cli -- summary 474
///   cargo run --bin stats-cli -- agents 474 [window]

use anyhow::{bail, Context, Result};
use dotenv::dotenv;
use extractor::{Extractor, FixtureExtractor, HttpExtractor};
use logger::EventLogger;
use stats_service::{StatsConfig, StatsService};
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const USAGE: &str = "usage: stats-cli <map-stats|roster|player|summary|agents> <id> [count]";

struct Command {
    name: String,
    id: String,
    count: Option<usize>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Command> {
    let name = args.next().context(USAGE)?;
    let id = args.next().context(USAGE)?;
    let count = match args.next() {
        Some(raw) => Some(
            raw.parse::<usize>()
                .context(format!("count must be a number, got {:?}", raw))?,
        ),
        None => None,
    };
    Ok(Command { name, id, count })
}

async fn run<E: Extractor>(service: &StatsService<E>, cmd: &Command) -> Result<serde_json::Value> {
    let value = match cmd.name.as_str() {
        "map-stats" => serde_json::to_value(service.compute_map_stats(&cmd.id, cmd.count).await?)?,
        "roster" => serde_json::to_value(service.compute_roster_stability(&cmd.id).await?)?,
        "player" => {
            let limit = cmd.count.unwrap_or(service.config().player_match_limit);
            serde_json::to_value(service.merge_player_stats(&cmd.id, limit).await?)?
        }
        "summary" => serde_json::to_value(service.compute_team_summary(&cmd.id).await?)?,
        "agents" => serde_json::to_value(service.compute_agent_stats(&cmd.id, cmd.count).await?)?,
        other => bail!("unknown command {:?}\n{}", other, USAGE),
    };
    Ok(value)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();

    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    let cmd = parse_args(env::args().skip(1))?;
    let config = StatsConfig::from_env();
    let events = EventLogger::new(config.log_dir.clone());
    info!(command = %cmd.name, id = %cmd.id, logs = %config.log_dir.display(), "=== RustMiskoLive Stats ===");

    let report = match config.extractor_url.clone() {
        Some(url) => {
            info!(%url, "source: extractor service");
            let extractor = HttpExtractor::new(url, config.extractor_min_interval);
            let service = StatsService::new(extractor, config).with_event_logger(events);
            run(&service, &cmd).await?
        }
        None => {
            info!(dir = %config.fixture_dir.display(), "source: fixtures");
            let extractor = FixtureExtractor::new(config.fixture_dir.clone());
            let service = StatsService::new(extractor, config).with_event_logger(events);
            run(&service, &cmd).await?
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter().map(|s| s.to_string()).collect::<Vec<_>>().into_iter()
    }

    #[test]
    fn parses_command_id_and_count() {
        let cmd = parse_args(args(&["map-stats", "474", "10"])).unwrap();
        assert_eq!((cmd.name.as_str(), cmd.id.as_str(), cmd.count), ("map-stats", "474", Some(10)));
        let cmd = parse_args(args(&["roster", "474"])).unwrap();
        assert_eq!(cmd.count, None);
    }

    #[test]
    fn rejects_missing_id_and_bad_count() {
        assert!(parse_args(args(&["roster"])).is_err());
        assert!(parse_args(args(&["player", "9", "five"])).is_err());
    }
}
