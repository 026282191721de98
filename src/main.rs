use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::{DateTime, Duration, Utc};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;

use gp_archive::aggregate;
use gp_archive::archive::{parse_day_string, BucketSchedule, DirSource};
use gp_archive::dataset::{Dataset, DatasetConfig};
use gp_archive::position::{Sgp4Propagator, TrackState};

#[derive(Parser)]
#[command(name = "gp-archive")]
#[command(about = "Historical orbital element archive")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate raw element dumps into a bucketed archive
    Aggregate {
        /// Directory of raw *.csv.gz exports
        raw_dir: PathBuf,
        /// Output directory for bucket files and the catalog
        out_dir: PathBuf,
    },
    /// Interpolate object positions at one instant
    Snapshot(SnapshotArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Archive directory produced by aggregate
    archive_dir: PathBuf,
    /// Query time, RFC 3339
    #[arg(long)]
    time: String,
    /// Print at most this many objects
    #[arg(long, default_value_t = 10)]
    limit: usize,
    /// Anchor spacing override, e.g. "30s"
    #[arg(long)]
    period: Option<String>,
    /// Dataset tuning file (YAML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Emit JSON instead of text
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate { raw_dir, out_dir } => aggregate_cmd(&raw_dir, &out_dir),
        Commands::Snapshot(args) => snapshot_cmd(args),
    }
}

fn aggregate_cmd(raw_dir: &Path, out_dir: &Path) -> ExitCode {
    match aggregate::run(raw_dir, out_dir) {
        Ok(summary) => {
            println!(
                "{} records in {} raw files -> {} archived rows, {} objects, {} buckets",
                summary.raw.records,
                summary.raw.files,
                summary.archived,
                summary.objects,
                summary.buckets
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Aggregation failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[derive(Serialize)]
struct SnapshotEntry {
    catalog_id: u32,
    name: Option<String>,
    position_km: [f64; 3],
}

fn snapshot_cmd(args: SnapshotArgs) -> ExitCode {
    match snapshot(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Snapshot failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn snapshot(args: SnapshotArgs) -> Result<(), Box<dyn Error>> {
    let time = DateTime::parse_from_rfc3339(&args.time)?.with_timezone(&Utc);

    let mut config = match &args.config {
        Some(path) => DatasetConfig::from_file(path)?,
        None => DatasetConfig::default(),
    };
    if let Some(period) = &args.period {
        let std = humantime::parse_duration(period.trim())?;
        config.update_period = Duration::from_std(std)?;
    }

    let source = DirSource::new(args.archive_dir.clone());
    let names = source.bucket_names()?;
    let Some(last) = names.last() else {
        return Err(format!("no bucket files in {}", args.archive_dir.display()).into());
    };
    let Some(end) = parse_day_string(last) else {
        return Err(format!("unparseable bucket name {last}").into());
    };
    let schedule = BucketSchedule::through(end);

    let mut dataset = Dataset::open(source, schedule, config)?;
    dataset.advance_to(time)?;
    dataset.purge(time);

    let propagator = Sgp4Propagator;
    let mut rng = rand::thread_rng();
    let config = dataset.config().clone();
    let mut entries = Vec::new();
    for (slot, satellite) in dataset.catalog().iter().enumerate() {
        if entries.len() >= args.limit {
            break;
        }
        let mut state =
            TrackState::new(satellite, config.update_period, config.accuracy, &mut rng);
        if !state.is_in_window(time) {
            continue;
        }
        let Some(samples) = dataset.samples(slot) else {
            continue;
        };
        if let Some(position) = state.position_at(samples, &propagator, time) {
            entries.push(SnapshotEntry {
                catalog_id: satellite.catalog_id,
                name: satellite.name.clone(),
                position_km: position,
            });
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{} objects with positions at {}", entries.len(), time);
        for entry in &entries {
            println!(
                "{:>9}  {:<24} [{:10.3}, {:10.3}, {:10.3}] km",
                entry.catalog_id,
                entry.name.as_deref().unwrap_or("-"),
                entry.position_km[0],
                entry.position_km[1],
                entry.position_km[2]
            );
        }
    }
    Ok(())
}
