//! Construction Output - command-line entry point
//!
//! Loads the two sheets of a workbook directory, runs the cleaning pipeline
//! and writes or prints the dashboard charts.

use anyhow::{Context, Result};
use clap::Parser;
use construction_output::charts::{ChartPlotter, StaticChartRenderer};
use construction_output::data::DataLoader;
use construction_output::stats::StatsCalculator;
use construction_output::{Pipeline, PipelineConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "construction-output")]
#[command(about = "Reconcile, clean and chart monthly construction output sheets")]
struct Args {
    /// Directory holding one `<sheet>.csv` per workbook sheet
    #[arg(short, long)]
    workbook: PathBuf,

    /// JSON pipeline configuration (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Time periods to analyse, overriding the configured window
    #[arg(long, num_args = 1..)]
    window: Option<Vec<String>>,

    /// Write the dashboard charts as PNG files into this directory
    #[arg(long)]
    charts: Option<PathBuf>,

    /// Print the dashboard chart specifications as JSON
    #[arg(long)]
    json: bool,

    /// Print descriptive statistics and correlations per source sheet
    #[arg(long)]
    describe: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(window) = args.window {
        config.window = window;
    }

    info!(workbook = %args.workbook.display(), "Construction output starting");

    let loader = DataLoader::new(&args.workbook);
    let (left, right) = loader
        .load_pair(&config.left_sheet, &config.right_sheet, &config.key_column)
        .context("loading workbook sheets")?;

    let pipeline = Pipeline::new(config);
    let output = pipeline.run(&left, &right).context("cleaning pipeline")?;
    let cleaned = &output.cleaned;
    let config = pipeline.config();

    if args.describe {
        for suffix in [&config.left_suffix, &config.right_suffix] {
            let sheet = cleaned.columns_with_suffix(suffix)?;
            println!("\n=== Columns {} ===", suffix);
            for summary in StatsCalculator::describe(&sheet)? {
                println!(
                    "{:<40} n={:<3} mean={:>12.3} std={:>12.3} min={:>12.3} max={:>12.3}",
                    summary.column, summary.count, summary.mean, summary.std, summary.min, summary.max
                );
            }
            let matrix = StatsCalculator::correlation_matrix(&sheet)?;
            println!("{}", serde_json::to_string_pretty(&matrix)?);
        }
    }

    let aggregated = pipeline
        .derive_aggregates(cleaned)
        .context("deriving aggregates")?;
    info!(
        rows = aggregated.height(),
        columns = aggregated.width(),
        "Aggregates derived"
    );

    if args.json || args.charts.is_some() {
        let specs = ChartPlotter::dashboard(
            &aggregated,
            &config.aggregate_specs(),
            &config.left_suffix,
            &config.right_suffix,
        )
        .context("building dashboard charts")?;

        if args.json {
            println!("{}", serde_json::to_string_pretty(&specs)?);
        }
        if let Some(dir) = &args.charts {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating {}", dir.display()))?;
            let written = StaticChartRenderer::render_all(&specs, dir, (1000, 600))?;
            info!(charts = written.len(), "Charts written");
        }
    }

    Ok(())
}
