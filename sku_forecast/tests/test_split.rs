use chrono::NaiveDate;
use rstest::rstest;
use sku_forecast::data::RawObservation;
use sku_forecast::{FeatureBuilder, FeatureTable, ForecastError, Splitter};

fn month(y: i32, m: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, 1).unwrap()
}

fn table() -> FeatureTable {
    let mut raw = Vec::new();
    for (w, sku) in [("W1", "A"), ("W1", "B"), ("W2", "A")] {
        for m in 1..=12 {
            raw.push(RawObservation::new(w, "North", sku, month(2023, m), m as f64));
        }
    }
    FeatureBuilder::default().build(&raw).unwrap().0
}

#[rstest]
#[case(month(2023, 2))]
#[case(month(2023, 7))]
#[case(month(2023, 12))]
fn test_split_is_a_partition(#[case] cutoff: NaiveDate) {
    let table = table();
    let split = Splitter::new(cutoff).split(&table).unwrap();

    assert_eq!(split.train.len() + split.test.len(), table.len());
    assert!(split.train.rows().iter().all(|r| r.month < cutoff));
    assert!(split.test.rows().iter().all(|r| r.month >= cutoff));
    assert_eq!(split.cutoff, cutoff);
}

#[test]
fn test_split_keeps_lags_computed_before_split() {
    let split = Splitter::new(month(2023, 12)).split(&table()).unwrap();
    // the first test row of each series still sees November
    assert!(split.test.rows().iter().all(|r| r.lag(1) == Some(11.0)));
}

#[test]
fn test_cutoff_after_data_is_empty_test_set() {
    let result = Splitter::new(month(2024, 1)).split(&table());
    match result {
        Err(ForecastError::EmptyTestSet { cutoff }) => assert_eq!(cutoff, month(2024, 1)),
        other => panic!("Expected EmptyTestSet, got {:?}", other.map(|s| s.cutoff)),
    }
}

#[test]
fn test_cutoff_before_data_leaves_train_empty() {
    let split = Splitter::new(month(2020, 1)).split(&table()).unwrap();
    assert!(split.train.is_empty());
    assert_eq!(split.test.len(), 36);
}

#[test]
fn test_default_cutoff_is_latest_month() {
    let table = table();
    let splitter = Splitter::latest_month(&table).unwrap();
    assert_eq!(splitter.cutoff(), month(2023, 12));
    assert_eq!(splitter.split(&table).unwrap().test.len(), 3);
}

#[test]
fn test_default_cutoff_of_empty_table_is_schema_error() {
    let raw = vec![RawObservation {
        sales: None,
        ..RawObservation::new("W1", "North", "A", month(2023, 1), 0.0)
    }];
    let (table, report) = FeatureBuilder::default().build(&raw).unwrap();
    assert_eq!(report.dropped_missing_sales, 1);

    match Splitter::latest_month(&table) {
        Err(ForecastError::Schema(msg)) => assert!(msg.contains("no usable observations")),
        other => panic!("Expected Schema error, got {:?}", other),
    }
}
