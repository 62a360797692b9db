#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that plays a Skirmish match headlessly.

mod scenario;
mod session;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use skirmish_core::WELCOME_BANNER;
use skirmish_system_sequencer::Pacing;
use skirmish_world::Config;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    scenario::ScenarioFile,
    session::{describe, Session},
};

/// Play an attacker autopilot against the defender policy.
#[derive(Parser, Debug)]
#[command(name = "skirmish", version)]
struct Args {
    /// TOML scenario describing the battlefield and roster.
    #[arg(long)]
    scenario: Option<PathBuf>,

    /// Seed for combat rolls, overriding the scenario's.
    #[arg(long)]
    seed: Option<u64>,

    /// Rounds to play before calling the match a draw.
    #[arg(long, default_value_t = 50)]
    max_rounds: u32,
}

/// Entry point for the Skirmish command-line interface.
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("skirmish=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = match &args.scenario {
        Some(path) => ScenarioFile::load(path)?.into_config(),
        None => Config::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    info!(
        columns = config.bounds.columns(),
        rows = config.bounds.rows(),
        units = config.deployments.len(),
        seed = config.seed,
        "starting match"
    );

    println!("{WELCOME_BANNER}");
    let mut session = Session::new(config, Pacing::default())?;
    let report = session.run(args.max_rounds, |event| println!("{}", describe(event)))?;

    match report.outcome {
        Some(outcome) => println!(
            "{:?} side wins in round {} after {} effects",
            outcome.winner(),
            report.round,
            report.effects
        ),
        None => println!("no winner after {} rounds", args.max_rounds),
    }
    Ok(())
}
