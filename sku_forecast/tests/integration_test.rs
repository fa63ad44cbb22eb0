use sku_forecast::data::WideSchema;
use sku_forecast::error::UndefinedMetricReason;
use sku_forecast::per_series::ForecastSource;
use sku_forecast::utils::SyntheticTable;
use sku_forecast::{DataLoader, ForecastError, ForecastPipeline, PipelineConfig};
use std::io::Write;
use tempfile::NamedTempFile;

fn small_config() -> PipelineConfig {
    let mut config = PipelineConfig::default().with_workers(2);
    config.random_forest.n_estimators = 20;
    config
}

#[test]
fn test_full_forecast_workflow() {
    let table = SyntheticTable {
        warehouses: 2,
        skus: 4,
        months: 30,
        ..Default::default()
    }
    .generate()
    .unwrap();

    let pipeline = ForecastPipeline::new(small_config()).unwrap();
    let run = pipeline.run(&table).unwrap();

    // default cutoff holds out the latest month
    let last = run.forecasts.rows().iter().map(|r| r.observation.month).max().unwrap();
    assert_eq!(run.cutoff, last);
    assert!(run.forecasts.rows().iter().all(|r| r.observation.month == last));
    assert_eq!(
        run.train_rows + run.forecasts.len(),
        run.features.output_rows
    );

    // every SKU has a per-series forecast, so every row is blended
    assert_eq!(run.series.len(), 4);
    assert!(run.series.warnings().is_empty());
    assert!(run.series.iter().all(|f| f.source == ForecastSource::Model));
    for row in run.forecasts.rows() {
        let sarima = row.sarima_prediction.unwrap();
        let blended = row.final_prediction.unwrap();
        assert!((blended - (row.rf_prediction + sarima) / 2.0).abs() < 1e-9);
    }

    let report = run.evaluation.as_ref().unwrap();
    assert_eq!(report.rows, run.forecasts.len());
    assert!(report.mape.is_finite() && report.mape >= 0.0);
}

#[test]
fn test_pipeline_is_reproducible() {
    let table = SyntheticTable {
        warehouses: 2,
        skus: 3,
        months: 26,
        ..Default::default()
    }
    .generate()
    .unwrap();

    let pipeline = ForecastPipeline::new(small_config()).unwrap();
    let a = pipeline.run(&table).unwrap();
    let b = pipeline.run(&table).unwrap();
    assert_eq!(a.forecasts, b.forecasts);
}

#[test]
fn test_csv_with_zero_actual_keeps_forecasts() {
    let mut file = NamedTempFile::new().unwrap();
    let months: Vec<String> = (1..=12)
        .map(|m| format!("2023-{:02}-01", m))
        .chain((1..=3).map(|m| format!("2024-{:02}-01", m)))
        .collect();
    writeln!(file, "warehouse,region,sku,{}", months.join(",")).unwrap();
    let a: Vec<String> = (1..=15).map(|v| (v * 10).to_string()).collect();
    let mut b: Vec<String> = (1..=15).map(|v| (v + 3).to_string()).collect();
    b[14] = "0".to_string();
    writeln!(file, "W1,North,A,{}", a.join(",")).unwrap();
    writeln!(file, "W1,North,B,{}", b.join(",")).unwrap();

    let table = DataLoader::from_csv(file.path(), &WideSchema::default()).unwrap();
    let config = small_config().with_cutoff(chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
    let run = ForecastPipeline::new(config).unwrap().run(&table).unwrap();

    assert_eq!(run.forecasts.len(), 2);
    assert!(run.forecasts.rows().iter().all(|r| r.final_prediction.is_some()));
    assert!(matches!(
        run.evaluation,
        Err(ForecastError::UndefinedMetric(UndefinedMetricReason::ZeroActual { row: 1 }))
    ));
}

#[test]
fn test_cutoff_past_data_fails() {
    let table = SyntheticTable {
        warehouses: 1,
        skus: 2,
        months: 6,
        ..Default::default()
    }
    .generate()
    .unwrap();
    let config = small_config().with_cutoff(chrono::NaiveDate::from_ymd_opt(2030, 1, 1).unwrap());
    let result = ForecastPipeline::new(config).unwrap().run(&table);
    assert!(matches!(result, Err(ForecastError::EmptyTestSet { .. })));
}

#[test]
fn test_invalid_config_rejected() {
    let config = PipelineConfig {
        lags: 0,
        ..Default::default()
    };
    assert!(matches!(
        ForecastPipeline::new(config),
        Err(ForecastError::Config(_))
    ));
}
