use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::warn;

use stridemetrics::logging::{init_logging, LogLevel};
use stridemetrics::{
    ActivityId, BatchRunner, BestAverages, BestEffort, Dataset, EngineConfig, InMemoryStore,
    StreamKey, StreamType, TrainingLoadCalculator, TsbInterpretation,
};

/// stridemetrics - Activity analytics CLI
///
/// Simplified route curves, best efforts, best averages and a daily
/// training load model from recorded activity streams.
#[derive(Parser)]
#[command(name = "stridemetrics")]
#[command(version)]
#[command(about = "Activity time-series analytics", long_about = None)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity of output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Print results as JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simplify the route curve of one activity
    Curve {
        /// Dataset file (JSON with athlete and activities)
        #[arg(short, long)]
        dataset: PathBuf,

        /// Activity ID
        #[arg(short, long)]
        activity: String,

        /// Channels carried next to distance (e.g. heartrate,watts)
        #[arg(short = 'C', long, value_delimiter = ',')]
        channels: Vec<StreamType>,
    },

    /// Extract best efforts for every activity
    Efforts {
        #[arg(short, long)]
        dataset: PathBuf,
    },

    /// Extract best averages for every averageable stream
    Averages {
        #[arg(short, long)]
        dataset: PathBuf,
    },

    /// Calculate the training load model
    Load {
        #[arg(short, long)]
        dataset: PathBuf,

        /// Reference date (YYYY-MM-DD, default: today)
        #[arg(short, long)]
        today: Option<NaiveDate>,

        /// Number of recent days to show
        #[arg(short, long, default_value = "14")]
        limit: usize,
    },

    /// Write the default configuration file
    Config {
        /// Output path (default: ~/.stridemetrics/config.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Tabled)]
struct EffortRow {
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "Sport")]
    sport: String,
    #[tabled(rename = "Distance (m)")]
    distance: String,
    #[tabled(rename = "Time")]
    time: String,
}

#[derive(Tabled)]
struct AverageRow {
    #[tabled(rename = "Activity")]
    activity: String,
    #[tabled(rename = "Stream")]
    stream: String,
    #[tabled(rename = "Interval (s)")]
    interval: u32,
    #[tabled(rename = "Best Average")]
    value: String,
}

#[derive(Tabled)]
struct LoadRow {
    #[tabled(rename = "Date")]
    date: NaiveDate,
    #[tabled(rename = "TRIMP")]
    trimp: String,
    #[tabled(rename = "CTL")]
    ctl: String,
    #[tabled(rename = "ATL")]
    atl: String,
    #[tabled(rename = "TSB")]
    tsb: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from_file(path)?,
        None => EngineConfig::load_or_default(),
    };

    // Set up logging based on verbosity
    config.logging.level = match cli.verbose {
        0 => config.logging.level,
        1 => LogLevel::Info,
        2 => LogLevel::Debug,
        _ => LogLevel::Trace,
    };
    init_logging(&config.logging)?;

    match cli.command {
        Commands::Curve {
            dataset,
            activity,
            channels,
        } => run_curve(&config, &load_dataset(&dataset)?, &activity, &channels, cli.json),
        Commands::Efforts { dataset } => run_efforts(&config, &load_dataset(&dataset)?, cli.json),
        Commands::Averages { dataset } => run_averages(&config, &load_dataset(&dataset)?, cli.json),
        Commands::Load {
            dataset,
            today,
            limit,
        } => {
            let today = today.unwrap_or_else(|| Local::now().date_naive());
            run_load(&config, &load_dataset(&dataset)?, today, limit, cli.json)
        }
        Commands::Config { output } => {
            let path = output.unwrap_or_else(EngineConfig::default_config_path);
            config.save_to_file(&path)?;
            println!(
                "{}",
                format!("✓ Configuration written to {}", path.display()).green()
            );
            Ok(())
        }
    }
}

fn load_dataset(path: &Path) -> Result<Dataset> {
    let dataset = Dataset::from_json_file(path)
        .with_context(|| format!("Failed to load dataset: {}", path.display()))?;

    for activity in &dataset.activities {
        if let Err(e) = activity.check_stream_lengths() {
            warn!(activity_id = %activity.id, error = %e, "Streams are not index-aligned");
        }
    }

    Ok(dataset)
}

fn run_curve(
    config: &EngineConfig,
    dataset: &Dataset,
    activity_id: &str,
    channels: &[StreamType],
    json: bool,
) -> Result<()> {
    let activity = dataset
        .activity(activity_id)
        .with_context(|| format!("Activity not found: {}", activity_id))?;

    let runner = BatchRunner::from_engine_config(config);
    let (_, curve) = runner
        .simplify_curves(std::slice::from_ref(activity), channels)?
        .into_iter()
        .next()
        .with_context(|| format!("No curve produced for {}", activity_id))?;
    let curve = curve?;

    if json {
        println!("{}", serde_json::to_string_pretty(&curve)?);
        return Ok(());
    }

    println!("{}", format!("Route curve for {}", activity_id).blue().bold());
    println!("  Epsilon: {:.3}", curve.epsilon);
    println!(
        "  Points: {} → {}",
        curve.raw_point_count,
        curve.points.len().to_string().green()
    );
    let header: Vec<String> = std::iter::once("distance".to_string())
        .chain(curve.channels.iter().map(|c| format!("{:?}", c).to_lowercase()))
        .collect();
    println!("  {}", header.join("\t").dimmed());
    for point in &curve.points {
        let row: Vec<String> = point.iter().map(|v| format!("{:.1}", v)).collect();
        println!("  {}", row.join("\t"));
    }
    Ok(())
}

fn run_efforts(config: &EngineConfig, dataset: &Dataset, json: bool) -> Result<()> {
    let runner = BatchRunner::from_engine_config(config);
    let mut store: InMemoryStore<ActivityId, Vec<BestEffort>> = InMemoryStore::new();
    let summary = runner.run_best_efforts(&dataset.activities, &mut store)?;

    let mut efforts: Vec<_> = store.iter().flat_map(|(_, efforts)| efforts.iter()).collect();
    efforts.sort_by(|a, b| {
        a.activity_id
            .cmp(&b.activity_id)
            .then(a.distance_in_meter.total_cmp(&b.distance_in_meter))
    });

    if json {
        println!("{}", serde_json::to_string_pretty(&efforts)?);
        return Ok(());
    }

    let rows: Vec<EffortRow> = efforts
        .iter()
        .map(|e| EffortRow {
            activity: e.activity_id.clone(),
            sport: format!("{:?}", e.sport_type),
            distance: format!("{:.0}", e.distance_in_meter),
            time: format_duration(e.time_in_seconds),
        })
        .collect();

    println!("{}", "Best efforts".blue().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "{}",
        format!("{} activities, {} computed", summary.total, summary.computed).dimmed()
    );
    Ok(())
}

fn run_averages(config: &EngineConfig, dataset: &Dataset, json: bool) -> Result<()> {
    let runner = BatchRunner::from_engine_config(config);
    let mut store: InMemoryStore<StreamKey, BestAverages> = InMemoryStore::new();
    let summary = runner.run_best_averages(&dataset.activities, &mut store)?;

    let mut entries: Vec<_> = store.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    if json {
        let map: Vec<_> = entries
            .iter()
            .map(|(key, averages)| serde_json::json!({ "key": key, "averages": averages }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    let rows: Vec<AverageRow> = entries
        .iter()
        .flat_map(|(key, averages)| {
            averages.iter().map(move |(&interval, value)| AverageRow {
                activity: key.activity_id.clone(),
                stream: format!("{:?}", key.stream_type),
                interval,
                value: format!("{:.1}", value),
            })
        })
        .collect();

    println!("{}", "Best averages".blue().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!(
        "{}",
        format!("{} streams, {} computed", summary.total, summary.computed).dimmed()
    );
    Ok(())
}

fn run_load(
    config: &EngineConfig,
    dataset: &Dataset,
    today: NaiveDate,
    limit: usize,
    json: bool,
) -> Result<()> {
    let calculator = TrainingLoadCalculator::with_config(config.training_load.clone());
    let Some(report) = calculator.calculate(&dataset.activities, &dataset.athlete, today) else {
        println!("{}", "No activities with moving time, nothing to model".yellow());
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let skip = report.metrics.len().saturating_sub(limit);
    let rows: Vec<LoadRow> = report
        .metrics
        .iter()
        .skip(skip)
        .map(|m| LoadRow {
            date: m.date,
            trimp: format!("{:.1}", m.trimp),
            ctl: format!("{:.1}", m.ctl),
            atl: format!("{:.1}", m.atl),
            tsb: format!("{:.1}", m.tsb),
        })
        .collect();

    let summary = &report.summary;
    println!("{}", "Training load".blue().bold());
    println!("{}", Table::new(rows).with(Style::rounded()));
    println!("  CTL (Fitness): {:.1}", summary.latest.ctl);
    println!("  ATL (Fatigue): {:.1}", summary.latest.atl);
    println!(
        "  TSB (Form):    {}",
        colored_tsb(summary.latest.tsb, summary.tsb_interpretation)
    );
    println!("  A:C ratio:     {:.2}", summary.ac_ratio);
    println!("  Monotony:      {:.2}", summary.monotony);
    println!("  Strain:        {:.0}", summary.strain);
    println!("  Weekly TRIMP:  {:.0}", summary.weekly_trimp);
    println!("  Rest days:     {}", summary.rest_days_last_week);
    if let Some(ramp) = summary.ctl_ramp_rate {
        println!("  CTL ramp:      {:.1} / week", ramp);
    }
    Ok(())
}

fn colored_tsb(tsb: Decimal, interpretation: TsbInterpretation) -> ColoredString {
    let text = format!("{:.1} ({})", tsb, interpretation.description());
    match interpretation {
        TsbInterpretation::VeryFresh | TsbInterpretation::Fresh => text.green(),
        TsbInterpretation::Neutral => text.normal(),
        TsbInterpretation::Fatigued => text.yellow(),
        TsbInterpretation::VeryFatigued => text.red(),
    }
}

fn format_duration(seconds: f64) -> String {
    let total = seconds.round() as u64;
    let (hours, minutes, secs) = (total / 3600, (total % 3600) / 60, total % 60);
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, secs)
    } else {
        format!("{}:{:02}", minutes, secs)
    }
}
