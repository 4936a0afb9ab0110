#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the crash map resolution pipeline.
//!
//! Normalizes a crash table, resolves each record's milepost to a WGS84
//! coordinate via a route reference layer or a two-anchor model, and
//! writes the resolved table for the rendering layer to consume.

mod output;

use std::fs::File;
use std::io::Write as _;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use crash_map_crash_models::LatLon;
use crash_map_ingest::{load_csv, normalize};
use crash_map_reference::{LinearAnchorModel, RouteReferenceIndex, load_geojson};
use crash_map_resolver::{ResolutionOutcome, resolve};

use output::ResolvedTable;

#[derive(Parser)]
#[command(name = "crash_map_cli", about = "Milepost-to-coordinate crash resolution")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize a crash table and resolve mileposts to coordinates
    Resolve {
        /// Crash table CSV (columns detected by name: date, direction,
        /// milepost/reference, severity/damage)
        #[arg(long)]
        crashes: PathBuf,
        /// Route reference layer as GeoJSON point features
        #[arg(long, conflicts_with = "anchors")]
        reference: Option<PathBuf>,
        /// Route id to filter the reference layer to (e.g., "I 25")
        #[arg(long, requires = "reference")]
        route: Option<String>,
        /// State id to filter the reference layer to (e.g., "CO")
        #[arg(long, requires = "reference")]
        state: Option<String>,
        /// Anchor model as `start_mp,start_lat,start_lon,end_mp,end_lat,end_lon`.
        /// Without `--reference` or `--anchors`, the built-in I-25
        /// Segment 5 anchors are used.
        #[arg(long)]
        anchors: Option<String>,
        /// Output file; stdout when omitted
        #[arg(long)]
        output: Option<PathBuf>,
        /// Output format: "csv" or "json"
        #[arg(long, default_value = "csv")]
        format: String,
    },
    /// Load a reference layer and report what would be indexed
    CheckReference {
        /// Route reference layer as GeoJSON point features
        #[arg(long)]
        reference: PathBuf,
        /// Route id to filter to
        #[arg(long)]
        route: Option<String>,
        /// State id to filter to
        #[arg(long)]
        state: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            crashes,
            reference,
            route,
            state,
            anchors,
            output,
            format,
        } => run_resolve(
            &crashes,
            reference.as_deref(),
            route.as_deref(),
            state.as_deref(),
            anchors.as_deref(),
            output.as_deref(),
            &format,
        ),
        Commands::CheckReference {
            reference,
            route,
            state,
        } => {
            let features = load_geojson(File::open(&reference)?)?;
            let index =
                RouteReferenceIndex::build(&features, route.as_deref(), state.as_deref())?;
            log::info!(
                "Reference layer OK: {} indexed points from {} features",
                index.len(),
                features.len()
            );
            Ok(())
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn run_resolve(
    crashes: &std::path::Path,
    reference: Option<&std::path::Path>,
    route: Option<&str>,
    state: Option<&str>,
    anchors: Option<&str>,
    output: Option<&std::path::Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let table = load_csv(File::open(crashes)?)?;
    let normalized = normalize(&table)?;

    for (reason, count) in &normalized.summary.excluded {
        log::warn!("Excluded {count} row(s): {reason:?}");
    }

    let outcome = if let Some(reference) = reference {
        let features = load_geojson(File::open(reference)?)?;
        let index = RouteReferenceIndex::build(&features, route, state)?;
        resolve(&normalized.records, &index)?
    } else {
        let model = match anchors {
            Some(spec) => parse_anchors(spec)?,
            None => LinearAnchorModel::i25_segment_5(),
        };
        resolve(&normalized.records, &model)?
    };

    write_output(&outcome, &normalized.summary, output, format)
}

fn write_output(
    outcome: &ResolutionOutcome,
    normalization: &crash_map_ingest::NormalizationSummary,
    output: Option<&std::path::Path>,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer: Box<dyn std::io::Write> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    match format {
        "csv" => output::write_csv(&mut writer, &outcome.resolved)?,
        "json" => {
            let table = ResolvedTable {
                records: &outcome.resolved,
                normalization,
                resolution: &outcome.summary,
            };
            output::write_json(&mut writer, &table)?;
            writeln!(writer)?;
        }
        other => return Err(format!("unsupported output format: {other}").into()),
    }

    Ok(())
}

/// Parses `start_mp,start_lat,start_lon,end_mp,end_lat,end_lon`.
fn parse_anchors(spec: &str) -> Result<LinearAnchorModel, Box<dyn std::error::Error>> {
    let values: Vec<f64> = spec
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<_, _>>()
        .map_err(|_| format!("anchors must be six comma-separated numbers, got {spec:?}"))?;

    let [start_mp, start_lat, start_lon, end_mp, end_lat, end_lon] = values.as_slice() else {
        return Err(format!(
            "anchors must be six comma-separated numbers, got {} value(s)",
            values.len()
        )
        .into());
    };

    LinearAnchorModel::build(
        *start_mp,
        LatLon::new(*start_lat, *start_lon),
        *end_mp,
        LatLon::new(*end_lat, *end_lon),
    )
    .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_six_anchor_values() {
        let model = parse_anchors("243,40.336,-104.993,250,40.185,-104.981").unwrap();
        let mid = model.interpolate(246.5);
        assert!((mid.lat - 40.2605).abs() < 1e-9);
    }

    #[test]
    fn rejects_wrong_arity() {
        assert!(parse_anchors("243,40.336,-104.993").is_err());
    }

    #[test]
    fn rejects_non_numeric_anchor() {
        assert!(parse_anchors("a,b,c,d,e,f").is_err());
    }

    #[test]
    fn rejects_degenerate_anchors() {
        assert!(parse_anchors("243,40.336,-104.993,243,40.185,-104.981").is_err());
    }
}
