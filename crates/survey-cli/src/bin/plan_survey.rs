//! Plan a survey over a boundary and write the mission package.
//!
//! Usage:
//!   cargo run -p survey-cli --bin plan_survey -- \
//!     --boundary field.geojson --settings settings.json --output mission.kml

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use survey_cli::{format_metrics, Config};
use survey_core::{
    evaluate_mission, export_mission, synthesize_path, BoundaryPolygon, MissionFile,
    MissionSettings,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Plan a photo survey and export a mission package")]
struct Args {
    /// GeoJSON file holding the boundary polygon
    #[arg(long)]
    boundary: PathBuf,

    /// JSON mission settings; omitted fields take their defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Where to write the mission package
    #[arg(long, default_value = "mission.kml")]
    output: PathBuf,

    /// Also write the mission as GeoJSON
    #[arg(long)]
    geojson: Option<PathBuf>,
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

    let boundary_text = fs::read_to_string(&args.boundary)
        .with_context(|| format!("failed to read boundary {}", args.boundary.display()))?;
    let boundary = BoundaryPolygon::from_geojson(&boundary_text)
        .with_context(|| format!("failed to load boundary {}", args.boundary.display()))?;

    let settings: MissionSettings = match &args.settings {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("failed to parse settings {}", path.display()))?
        }
        None => MissionSettings::default(),
    };

    let result = synthesize_path(&boundary, &settings, &config.rules);
    if !result.success {
        match result.diagnostic {
            Some(diagnostic) => bail!("no survey path: {diagnostic}"),
            None => bail!("no survey path"),
        }
    }
    tracing::info!(waypoints = result.waypoints.len(), "survey path planned");

    let package = export_mission(&result.waypoints, &settings, &boundary)?;
    fs::write(&args.output, package)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    println!("Wrote {}", args.output.display());

    if let Some(path) = &args.geojson {
        let text = MissionFile::new(result.waypoints.clone(), &settings, &boundary)
            .to_geojson_string()?;
        fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    let metrics = evaluate_mission(&result.waypoints, &settings, &config.rules);
    println!("{}", format_metrics(&metrics, settings.unit_system));
    Ok(())
}
