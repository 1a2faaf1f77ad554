//! highway-compare CLI - Road network coverage check
//!
//! Usage:
//!   highway-compare -g <groundtruth.geojson> -b <boundary.geojson> -m <candidates.geojson>
//!                   [-t <threads>] [-o <output.geojson>]
//!
//! Compares a ground-truth road network against candidate highways tile by
//! tile and writes matched, partially missing and missing roads plus
//! attribute update proposals to a single GeoJSON document.

use clap::Parser;
use highway_compare::compare::CompareConfig;
use highway_compare::{compare_files, MatchOptions};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "highway-compare")]
#[command(about = "Compare a ground-truth road network against candidate highways", long_about = None)]
struct Cli {
    /// Ground-truth GeoJSON file (LineString / MultiLineString features)
    #[arg(short = 'g', long)]
    ground_truth: PathBuf,

    /// GeoJSON file with the study-area polygon
    #[arg(short = 'b', long)]
    boundary: PathBuf,

    /// Candidate GeoJSON file (features with a `highway` attribute)
    #[arg(short = 'm', long)]
    candidates: PathBuf,

    /// Number of workers (positive, even)
    #[arg(short, long, default_value = "4")]
    threads: usize,

    /// Output file
    #[arg(short, long, default_value = "./osmdiff.geojson")]
    output: PathBuf,

    /// Distance tolerance in kilometers
    #[arg(long, default_value = "0.01")]
    tolerance: f64,

    /// Maximum bearing difference in degrees
    #[arg(long, default_value = "15")]
    angle: f64,

    /// Error margin around full coverage
    #[arg(long, default_value = "0.1")]
    err: f64,

    /// Tile zoom level
    #[arg(long, default_value = "12")]
    zoom: u8,

    /// Enable verbose debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let config = CompareConfig {
        ground_truth: cli.ground_truth,
        boundary: cli.boundary,
        candidates: cli.candidates,
        output: cli.output,
        threads: cli.threads,
        zoom: cli.zoom,
        options: MatchOptions {
            tolerance_km: cli.tolerance,
            max_angle_deg: cli.angle,
            err: cli.err,
        },
    };

    match compare_files(&config) {
        Ok(result) => {
            println!("\n{}", "=".repeat(60));
            println!("Comparison written to: {}", config.output.display());
            println!("{}", "=".repeat(60));
            println!("  Tiles processed:   {}", result.tiles_processed);
            println!("  Tiles failed:      {}", result.tiles_failed);
            println!("  Ground truth:      {}", result.buckets.ground_truth.len());
            println!("  Candidates:        {}", result.buckets.candidates.len());
            println!("  Partially missing: {}", result.buckets.partial_missing.len());
            println!("  Missing:           {}", result.buckets.missing.len());
            println!("  Updates:           {}", result.buckets.updates.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
