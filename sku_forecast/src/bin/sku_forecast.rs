//! Command-line forecaster for wide monthly sales tables.

use chrono::NaiveDate;
use clap::Parser;
use sku_forecast::data::parse_month_header;
use sku_forecast::logging::LoggingConfig;
use sku_forecast::utils::SyntheticTable;
use sku_forecast::{
    DataLoader, ForecastError, ForecastPipeline, PipelineConfig, Result, WideSchema, WideTable,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "sku-forecast")]
#[command(version, about = "Next-month sales forecasts per warehouse and SKU", long_about = None)]
struct Cli {
    /// Wide CSV with warehouse, region, sku and one column per month
    #[arg(short, long, required_unless_present = "demo")]
    input: Option<PathBuf>,

    /// Generate a synthetic table instead of reading one
    #[arg(long, conflicts_with = "input")]
    demo: bool,

    /// First test month (e.g. 2023-12 or 2023-12-01); defaults to the latest month
    #[arg(short, long, value_parser = parse_cutoff)]
    cutoff: Option<NaiveDate>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Worker threads for per-SKU fitting
    #[arg(short, long)]
    workers: Option<usize>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Forecast rows to print
    #[arg(long, default_value = "10")]
    show: usize,
}

fn parse_cutoff(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_month_header(value).ok_or_else(|| format!("'{}' is not a month", value))
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    LoggingConfig::new(cli.log_level.clone(), cli.json_logs).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "forecast failed");
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    config.apply_env()?;
    if let Some(cutoff) = cli.cutoff {
        config.cutoff = Some(cutoff);
    }
    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }

    let table = load_table(cli)?;
    println!(
        "Loaded {} series over {} month columns",
        table.len(),
        table.columns().len()
    );

    let pipeline = ForecastPipeline::new(config)?;
    let run = pipeline.run(&table)?;

    println!(
        "Cutoff {}: {} training rows, {} test rows, {} SKUs ({} per-SKU warnings)",
        run.cutoff,
        run.train_rows,
        run.forecasts.len(),
        run.series.len(),
        run.series.warnings().len()
    );

    println!(
        "\n{:<10} {:<10} {:<10} {:>10} {:>10} {:>10} {:>10}",
        "month", "warehouse", "sku", "sales", "rf", "sarima", "final"
    );
    for row in run.forecasts.rows().iter().take(cli.show) {
        let obs = &row.observation;
        println!(
            "{:<10} {:<10} {:<10} {:>10.1} {:>10.1} {:>10} {:>10}",
            obs.month.format("%Y-%m"),
            obs.warehouse,
            obs.sku,
            obs.sales,
            row.rf_prediction,
            format_optional(row.sarima_prediction),
            format_optional(row.final_prediction)
        );
    }

    match &run.evaluation {
        Ok(report) => println!("\n{}", report),
        Err(e) => println!("\nEvaluation unavailable: {}", e),
    }

    Ok(())
}

fn load_table(cli: &Cli) -> Result<WideTable> {
    match (&cli.input, cli.demo) {
        (_, true) => SyntheticTable::default().generate(),
        (Some(path), false) => DataLoader::from_csv(path, &WideSchema::default()),
        (None, false) => Err(ForecastError::Config(
            "either --input or --demo is required".to_string(),
        )),
    }
}

fn format_optional(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{:.1}", v),
        None => "-".to_string(),
    }
}
