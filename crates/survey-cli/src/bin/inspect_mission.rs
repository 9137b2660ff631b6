//! Import a mission package and report what it contains.
//!
//! Usage:
//!   cargo run -p survey-cli --bin inspect_mission -- --input mission.kml

use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use survey_cli::{format_metrics, format_notice, Config};
use survey_core::{decode_package_bytes, evaluate_mission, MissionSettings};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Inspect a survey mission package")]
struct Args {
    /// Mission package to read
    #[arg(long)]
    input: PathBuf,

    /// Print metrics as JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("survey_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let config = Config::from_env()?;

    let bytes =
        fs::read(&args.input).with_context(|| format!("failed to read {}", args.input.display()))?;
    let defaults = MissionSettings::default();
    let outcome = decode_package_bytes(&bytes, &defaults)
        .with_context(|| format!("failed to import {}", args.input.display()))?;

    if let Some(notice) = &outcome.notice {
        eprintln!("{}", format_notice(notice));
    }

    let settings = outcome
        .mission
        .session_settings
        .clone()
        .unwrap_or(defaults);
    let metrics = evaluate_mission(&outcome.mission.waypoints, &settings, &config.rules);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&metrics)?);
        return Ok(());
    }

    if let Some(created) = outcome.mission.created_at {
        println!("Created:          {}", created.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!("Profile:          {}", settings.drone_profile_id);
    println!("End of mission:   {:?}", outcome.mission.end_of_mission);
    println!("Lost link:        {:?}", outcome.mission.lost_link_action);
    println!("{}", format_metrics(&metrics, settings.unit_system));
    Ok(())
}
