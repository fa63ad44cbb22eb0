use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use sku_forecast::{ForecastError, PipelineConfig};
use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn test_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.lags, 3);
    assert_eq!(config.min_history_months, 12);
    assert_eq!(config.random_forest.n_estimators, 100);
    assert_eq!(config.random_forest.seed, 42);
    assert_eq!(config.sarima.seasonal_order.period, 12);
    assert_eq!(config.fit_timeout(), Duration::from_secs(30));
    assert!(config.validate().is_ok());
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config = PipelineConfig::from_json_str(
        r#"{ "cutoff": "2023-12-01", "random_forest": { "seed": 7 }, "workers": 4 }"#,
    )
    .unwrap();

    assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2023, 12, 1));
    assert_eq!(config.random_forest.seed, 7);
    assert_eq!(config.random_forest.n_estimators, 100);
    assert_eq!(config.workers, Some(4));
    assert_eq!(config.lags, 3);
}

#[test]
fn test_json_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ "lags": 2, "fit_timeout_secs": 5.5 }}"#).unwrap();

    let config = PipelineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.lags, 2);
    assert_eq!(config.fit_timeout(), Duration::from_millis(5500));
}

#[test]
fn test_bad_json_is_config_error() {
    assert!(matches!(
        PipelineConfig::from_json_str("{ not json"),
        Err(ForecastError::Config(_))
    ));
}

#[test]
fn test_overrides() {
    let vars: HashMap<&str, &str> = [
        ("CUTOFF", "2023-06"),
        ("WORKERS", "3"),
        ("SEED", "99"),
        ("FIT_TIMEOUT_SECS", "2"),
    ]
    .into_iter()
    .collect();

    let mut config = PipelineConfig::default();
    config
        .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
        .unwrap();

    assert_eq!(config.cutoff, NaiveDate::from_ymd_opt(2023, 6, 1));
    assert_eq!(config.workers, Some(3));
    assert_eq!(config.random_forest.seed, 99);
    assert_eq!(config.fit_timeout_secs, 2.0);
}

#[test]
fn test_unparseable_override_is_error() {
    let mut config = PipelineConfig::default();
    let result = config.apply_overrides(|key| (key == "WORKERS").then(|| "many".to_string()));
    assert!(matches!(result, Err(ForecastError::Config(_))));
}

#[test]
fn test_validate_rejects_bad_values() {
    let zero_lags = PipelineConfig {
        lags: 0,
        ..Default::default()
    };
    assert!(zero_lags.validate().is_err());

    let zero_workers = PipelineConfig::default().with_workers(0);
    assert!(zero_workers.validate().is_err());

    let no_timeout = PipelineConfig {
        fit_timeout_secs: 0.0,
        ..Default::default()
    };
    assert!(no_timeout.validate().is_err());
}
