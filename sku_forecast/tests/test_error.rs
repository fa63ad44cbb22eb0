use chrono::NaiveDate;
use forecast_math::MathError;
use sku_forecast::error::UndefinedMetricReason;
use sku_forecast::ForecastError;
use std::io;

#[test]
fn test_error_conversion() {
    let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
    let forecast_error = ForecastError::from(io_error);
    assert!(matches!(forecast_error, ForecastError::Io(_)));

    let math_error = MathError::InsufficientData("too short".to_string());
    let forecast_error: ForecastError = math_error.into();
    assert!(matches!(forecast_error, ForecastError::Math(_)));

    let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    assert!(matches!(ForecastError::from(json_error), ForecastError::Json(_)));
}

#[test]
fn test_error_display() {
    let err = ForecastError::DuplicateObservation {
        warehouse: "W1".to_string(),
        sku: "A".to_string(),
        month: NaiveDate::from_ymd_opt(2023, 2, 1).unwrap(),
    };
    assert_eq!(
        err.to_string(),
        "Duplicate observation for warehouse 'W1', sku 'A', month 2023-02-01"
    );

    let err = ForecastError::EmptyTestSet {
        cutoff: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    };
    assert_eq!(err.to_string(), "No test rows on or after cutoff 2024-01-01");

    let err = ForecastError::UndefinedMetric(UndefinedMetricReason::ZeroActual { row: 3 });
    assert_eq!(err.to_string(), "Undefined metric: actual value is zero at row 3");
}
