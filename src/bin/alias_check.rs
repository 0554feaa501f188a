/// RustMiskoLive Stats — alias check
///
/// Ověří, že statická alias tabulka rozliší zadané labely na správný tým.
///
///   cargo run --bin alias-check -- "Team Liquid|TL" "liquid" "FNC" "Paper Rex"
///
/// První argument je kandidát (`jméno|tag`), další jsou labely k rozlišení.
/// Bez argumentů projde celou alias tabulku.

use anyhow::Result;
use dotenv::dotenv;
use stats_core::identity::{alias_key, ALIAS_GROUPS};
use stats_core::{normalize, CanonicalTeam, IdentityResolver};
use std::env;
use tracing::{info, warn};

fn candidate(spec: &str) -> CanonicalTeam {
    let mut parts = spec.splitn(2, '|');
    let name = parts.next().unwrap_or_default().trim();
    let tag = parts.next().map(|t| t.trim().to_string()).filter(|t| !t.is_empty());
    CanonicalTeam::new(normalize(name), name, tag)
}

/// Every variant of every group must resolve back to a team built from it.
fn check_table(resolver: &IdentityResolver) -> usize {
    let mut failures = 0;
    for (key, variants) in ALIAS_GROUPS {
        let team = CanonicalTeam::new(*key, *key, None);
        let candidates = [team];
        for variant in *variants {
            let hit = resolver.resolve_index(variant, &candidates);
            if hit.is_none() || alias_key(variant) != Some(*key) {
                warn!(group = key, variant, "alias variant does not resolve to its group");
                failures += 1;
            }
        }
    }
    failures
}

fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .init();

    let resolver = IdentityResolver::default();
    let mut args = env::args().skip(1);

    let Some(spec) = args.next() else {
        let failures = check_table(&resolver);
        info!(groups = ALIAS_GROUPS.len(), failures, "alias table checked");
        if failures > 0 {
            anyhow::bail!("{} alias variants failed", failures);
        }
        return Ok(());
    };

    let team = candidate(&spec);
    info!(name = %team.name, tag = ?team.tag, aliases = ?team.aliases, "candidate");
    let candidates = [team];
    for label in args {
        match resolver.resolve_index(&label, &candidates) {
            Some(r) => println!("{:<24} → {} ({:?})", label, candidates[r.index].name, r.strength),
            None => println!("{:<24} → unresolved", label),
        }
    }

    Ok(())
}
