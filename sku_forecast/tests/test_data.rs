use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rstest::rstest;
use sku_forecast::data::{DataLoader, MonthColumn, SeriesKey, WideSchema, WideTable};
use sku_forecast::utils::add_months;
use sku_forecast::{FeatureBuilder, ForecastError};
use std::io::Write;
use tempfile::NamedTempFile;

fn wide_table(series: usize, months: usize) -> WideTable {
    let start = NaiveDate::from_ymd_opt(2022, 6, 1).unwrap();
    let keys = (0..series)
        .map(|i| SeriesKey::new(format!("W{}", i % 2), "North", format!("SKU{}", i)))
        .collect();
    let columns = (0..months)
        .map(|m| {
            let month = add_months(start, m as i64).unwrap();
            MonthColumn::parse(month.format("%Y-%m-%d").to_string())
        })
        .collect();
    let values = (0..series)
        .map(|i| {
            (0..months)
                .map(|m| if (i + m) % 5 == 4 { None } else { Some((i * 100 + m) as f64) })
                .collect()
        })
        .collect();
    WideTable::new(WideSchema::default(), keys, columns, values).unwrap()
}

#[rstest]
#[case(1, 1)]
#[case(2, 3)]
#[case(4, 14)]
fn test_melt_produces_one_row_per_cell(#[case] series: usize, #[case] months: usize) {
    let table = wide_table(series, months);
    let long = table.melt();
    assert_eq!(long.len(), series * months);

    // row-major: every month of the first series before the second
    assert!(long[..months].iter().all(|r| r.sku == "SKU0"));
}

#[rstest]
#[case(1, 1)]
#[case(3, 5)]
#[case(6, 24)]
fn test_pivot_inverts_melt(#[case] series: usize, #[case] months: usize) {
    let table = wide_table(series, months);
    let rebuilt = WideTable::pivot(WideSchema::default(), &table.melt()).unwrap();
    assert_eq!(rebuilt, table);
}

#[test]
fn test_data_loader_from_csv() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "warehouse,region,sku,2023-01-01,2023-02-01,2023-03-01").unwrap();
    writeln!(file, "W1,North,A,10,20,30").unwrap();
    writeln!(file, "W1,North,B,5,,7").unwrap();
    writeln!(file, "W2,South,A,1,2,3").unwrap();

    let table = DataLoader::from_csv(file.path(), &WideSchema::default()).unwrap();
    assert_eq!(table.len(), 3);
    assert!(!table.is_empty());
    assert_eq!(table.columns().len(), 3);
    assert_eq!(
        table.columns()[1].month,
        Some(NaiveDate::from_ymd_opt(2023, 2, 1).unwrap())
    );
    assert_eq!(table.value(0, 2), Some(30.0));
    assert_eq!(table.value(1, 1), None);
    assert_eq!(table.keys()[2], SeriesKey::new("W2", "South", "A"));
}

#[test]
fn test_custom_schema_names() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "site,area,item,2023-01").unwrap();
    writeln!(file, "S1,East,X,4").unwrap();

    let schema = WideSchema {
        warehouse: "site".to_string(),
        region: "area".to_string(),
        sku: "item".to_string(),
    };
    let table = DataLoader::from_csv(file.path(), &schema).unwrap();
    let long = table.melt();
    assert_eq!(long.len(), 1);
    assert_eq!(long[0].warehouse, "S1");
    assert_eq!(long[0].sales, Some(4.0));
}

#[test]
fn test_missing_id_column_is_schema_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "warehouse,sku,2023-01-01").unwrap();
    writeln!(file, "W1,A,10").unwrap();

    match DataLoader::from_csv(file.path(), &WideSchema::default()) {
        Err(ForecastError::Schema(msg)) => assert!(msg.contains("region")),
        other => panic!("Expected schema error, got {:?}", other),
    }
}

#[test]
fn test_text_column_under_non_month_header_is_dropped() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "warehouse,region,sku,notes,2023-01-01,2023-02-01").unwrap();
    writeln!(file, "W1,North,A,promo,10,20").unwrap();
    writeln!(file, "W1,North,B,restock,5,7").unwrap();

    let table = DataLoader::from_csv(file.path(), &WideSchema::default()).unwrap();
    assert_eq!(table.unparsed_headers(), vec!["notes"]);
    assert_eq!(table.value(0, 0), None);
    assert_eq!(table.value(0, 2), Some(20.0));

    let (features, report) = FeatureBuilder::default().build(&table.melt()).unwrap();
    assert_eq!(report.dropped_unparsed_month, 2);
    assert_eq!(features.len(), 4);
}

#[test]
fn test_text_in_month_column_is_schema_error() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "warehouse,region,sku,2023-01-01,2023-02-01").unwrap();
    writeln!(file, "W1,North,A,10,lots").unwrap();

    match DataLoader::from_csv(file.path(), &WideSchema::default()) {
        Err(ForecastError::Schema(msg)) => assert!(msg.contains("2023-02-01")),
        other => panic!("Expected schema error, got {:?}", other),
    }
}

#[test]
fn test_missing_file_is_io_error() {
    let result = DataLoader::from_csv("/nonexistent/sales.csv", &WideSchema::default());
    assert!(matches!(result, Err(ForecastError::Io(_))));
}

#[test]
fn test_new_rejects_ragged_values() {
    let result = WideTable::new(
        WideSchema::default(),
        vec![SeriesKey::new("W1", "North", "A")],
        vec![MonthColumn::parse("2023-01-01"), MonthColumn::parse("2023-02-01")],
        vec![vec![Some(1.0)]],
    );
    assert!(matches!(result, Err(ForecastError::Schema(_))));
}
