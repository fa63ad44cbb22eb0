//! Forecast a generated sales table and print the per-SKU models' results.
//!
//! Run with `cargo run --example basic_forecast`.

use sku_forecast::logging::LoggingConfig;
use sku_forecast::per_series::ForecastSource;
use sku_forecast::utils::SyntheticTable;
use sku_forecast::{ForecastPipeline, PipelineConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    LoggingConfig::new("warn", false).init();

    let table = SyntheticTable {
        warehouses: 2,
        skus: 5,
        months: 30,
        missing_rate: 0.05,
        seed: 3,
        ..Default::default()
    }
    .generate()?;

    let pipeline = ForecastPipeline::new(PipelineConfig::default())?;
    let run = pipeline.run(&table)?;

    println!("Cutoff: {}", run.cutoff);
    println!(
        "Rows: {} in, {} dropped as empty",
        run.features.input_rows, run.features.dropped_missing_sales
    );

    for forecast in run.series.iter() {
        let source = match forecast.source {
            ForecastSource::Model => "model",
            ForecastSource::InsufficientHistory => "short history",
            ForecastSource::FitFailure => "fit failed",
        };
        println!(
            "{:<8} {:>10.2}  ({} months, {})",
            forecast.sku, forecast.value, forecast.observed_months, source
        );
    }

    match run.evaluation {
        Ok(report) => println!("\n{}", report),
        Err(e) => println!("\nNo evaluation: {}", e),
    }

    Ok(())
}
