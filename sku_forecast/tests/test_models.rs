use approx::assert_abs_diff_eq;
use sku_forecast::models::random_forest::{RandomForest, RandomForestConfig};
use sku_forecast::models::sarima::{SarimaConfig, SeasonalArima};
use sku_forecast::models::{
    FeatureMatrix, RegressionModel, SeriesModel, TrainedRegressionModel, TrainedSeriesModel,
};
use sku_forecast::ForecastError;
use std::time::Duration;

fn training_data() -> (FeatureMatrix, Vec<f64>) {
    let mut rows = Vec::new();
    let mut targets = Vec::new();
    for year in [2022.0, 2023.0] {
        for month in 1..=12 {
            let lag = 50.0 + month as f64;
            rows.push(vec![month as f64, year, lag, lag - 1.0, lag - 2.0]);
            targets.push(lag + if month >= 6 { 20.0 } else { 0.0 });
        }
    }
    (FeatureMatrix::from_rows(rows, 5).unwrap(), targets)
}

#[test]
fn test_random_forest_is_deterministic_for_a_seed() {
    let (x, y) = training_data();
    let config = RandomForestConfig {
        n_estimators: 25,
        seed: 11,
        ..Default::default()
    };

    let a = RandomForest::new(config.clone()).unwrap().train(&x, &y).unwrap();
    let b = RandomForest::new(config).unwrap().train(&x, &y).unwrap();

    assert_eq!(a.predict(&x), b.predict(&x));
    assert_eq!(a.n_trees(), 25);
}

#[test]
fn test_random_forest_predictions_stay_in_target_range() {
    let (x, y) = training_data();
    let trained = RandomForest::default().train(&x, &y).unwrap();
    let lo = y.iter().cloned().fold(f64::INFINITY, f64::min);
    let hi = y.iter().cloned().fold(f64::NEG_INFINITY, f64::max);

    for p in trained.predict(&x) {
        assert!(p >= lo && p <= hi, "prediction {} outside [{}, {}]", p, lo, hi);
    }
    assert_eq!(trained.name(), "RandomForest(n_estimators=100)");
}

#[test]
fn test_random_forest_rejects_empty_training_set() {
    let x = FeatureMatrix::from_rows(Vec::new(), 5).unwrap();
    assert!(matches!(
        RandomForest::default().train(&x, &[]),
        Err(ForecastError::EmptyTrainingSet)
    ));
}

#[test]
fn test_random_forest_rejects_nan_features() {
    let x = FeatureMatrix::from_rows(vec![vec![1.0, f64::NAN]], 2).unwrap();
    assert!(matches!(
        RandomForest::default().train(&x, &[1.0]),
        Err(ForecastError::NonNumericFeature(_))
    ));
}

#[test]
fn test_sarima_seasonal_naive_on_clean_series() {
    let series: Vec<Option<f64>> = (0..30)
        .map(|t| Some(10.0 + t as f64 + if t % 12 == 3 { 5.0 } else { 0.0 }))
        .collect();
    let trained = SeasonalArima::default().train(&series).unwrap();
    let forecast = trained.forecast_next().unwrap();

    // y[30] = y[29] + y[18] - y[17]
    let y = |t: usize| series[t].unwrap();
    assert_abs_diff_eq!(forecast, y(29) + y(18) - y(17), epsilon = 1e-6);
}

#[test]
fn test_sarima_short_series_fails() {
    let series = vec![Some(1.0); 12];
    assert!(matches!(
        SeasonalArima::default().train(&series),
        Err(ForecastError::Math(_))
    ));
}

#[test]
fn test_sarima_time_budget() {
    let series: Vec<Option<f64>> = (0..40).map(|t| Some(((t * 7919) % 97) as f64)).collect();
    let model = SeasonalArima::new(SarimaConfig::default())
        .unwrap()
        .with_time_budget(Duration::ZERO);
    assert!(model.train(&series).is_err());
}
