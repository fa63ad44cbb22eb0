use approx::assert_relative_eq;
use chrono::NaiveDate;
use rstest::rstest;
use sku_forecast::data::RawObservation;
use sku_forecast::error::UndefinedMetricReason;
use sku_forecast::metrics::{
    mean_absolute_error, mean_absolute_percentage_error, root_mean_squared_error,
};
use sku_forecast::{Ensembler, Evaluator, FeatureBuilder, ForecastError};

#[test]
fn test_mape_reference_value() {
    let mape = mean_absolute_percentage_error(&[100.0, 200.0], &[Some(110.0), Some(180.0)]).unwrap();
    assert_relative_eq!(mape, 0.10, epsilon = 1e-12);
}

#[rstest]
#[case(&[1.0, 2.0, 4.0], &[1.0, 2.0, 4.0], 0.0)]
#[case(&[10.0], &[15.0], 0.5)]
#[case(&[-10.0, 10.0], &[-5.0, 5.0], 0.5)]
fn test_mape_cases(#[case] actual: &[f64], #[case] predicted: &[f64], #[case] expected: f64) {
    let predicted: Vec<Option<f64>> = predicted.iter().copied().map(Some).collect();
    let mape = mean_absolute_percentage_error(actual, &predicted).unwrap();
    assert_relative_eq!(mape, expected, epsilon = 1e-12);
}

#[test]
fn test_zero_actual_is_undefined() {
    match mean_absolute_percentage_error(&[100.0, 0.0], &[Some(90.0), Some(1.0)]) {
        Err(ForecastError::UndefinedMetric(UndefinedMetricReason::ZeroActual { row })) => {
            assert_eq!(row, 1)
        }
        other => panic!("Expected zero-actual error, got {:?}", other),
    }
}

#[test]
fn test_missing_prediction_is_undefined() {
    let result = mean_absolute_error(&[1.0, 2.0], &[Some(1.0), None]);
    assert!(matches!(
        result,
        Err(ForecastError::UndefinedMetric(
            UndefinedMetricReason::MissingPrediction { row: 1 }
        ))
    ));
}

#[test]
fn test_length_mismatch_is_undefined() {
    let result = root_mean_squared_error(&[1.0, 2.0], &[Some(1.0)]);
    assert!(matches!(
        result,
        Err(ForecastError::UndefinedMetric(
            UndefinedMetricReason::LengthMismatch { actual: 2, predicted: 1 }
        ))
    ));
}

#[test]
fn test_evaluator_scores_each_component() {
    let month = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let raw = vec![
        RawObservation::new("W1", "North", "A", month, 100.0),
        RawObservation::new("W1", "North", "B", month, 200.0),
    ];
    let (test, _) = FeatureBuilder::default().build(&raw).unwrap();
    let forecasts = Ensembler
        .combine(&test, &[120.0, 160.0], &[Some(100.0), Some(200.0)])
        .unwrap();

    let report = Evaluator.evaluate(&forecasts).unwrap();
    assert_eq!(report.rows, 2);
    // final predictions are 110 and 180
    assert_relative_eq!(report.mape, 0.10, epsilon = 1e-12);
    assert_relative_eq!(report.mae, 15.0, epsilon = 1e-12);
    assert_relative_eq!(report.rmse, (250.0f64).sqrt(), epsilon = 1e-12);
    assert_relative_eq!(report.rf_mape, 0.20, epsilon = 1e-12);
    assert_relative_eq!(report.sarima_mape, 0.0, epsilon = 1e-12);
}
