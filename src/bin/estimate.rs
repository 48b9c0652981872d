use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use winprob_terminal::config::EngineConfig;
use winprob_terminal::diagram::Diagram;
use winprob_terminal::query::Query;
use winprob_terminal::sampler::CancelToken;

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    init_tracing();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let as_json = args.iter().any(|a| a == "--json");
    let path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/query.json"));

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("read query file {}", path.display()))?;
    let query = Query::from_json(&raw).with_context(|| format!("parse {}", path.display()))?;

    let cfg = EngineConfig::from_env();
    let data = cfg.load_data()?;
    let estimator = cfg.build_estimator(data);

    // Nothing else holds this token, so the run cannot be cancelled.
    let estimate = estimator
        .estimate(&query, &CancelToken::new())
        .context("sampling run was cancelled")?;

    if as_json {
        println!("{}", Diagram::from_estimate(&estimate).to_json()?);
        return Ok(());
    }

    println!("P(team 1 wins): {:.3}", estimate.p_win());
    println!(
        "Particles: {}/{} kept ({:.1}%)",
        estimate.posterior.accepted,
        estimate.posterior.drawn,
        estimate.posterior.acceptance_rate() * 100.0
    );
    println!(
        "Historical: {:.3} over {} matches",
        estimate.historical_rate, estimate.historical_matches
    );
    println!(
        "Team 1 morale {:.2} aggression {:.2}",
        estimate.team1.morale, estimate.team1.aggression
    );
    println!(
        "Team 2 morale {:.2} aggression {:.2}",
        estimate.team2.morale, estimate.team2.aggression
    );

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("winprob_terminal=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact().with_writer(std::io::stderr))
        .init();
}
