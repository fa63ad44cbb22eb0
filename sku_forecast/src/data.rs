//! Wide and long sales tables
//!
//! Ingestion hands over a wide table: one row per (warehouse, region, sku)
//! and one numeric column per month. [`WideSchema`] states which columns are
//! identifiers; every other column must carry a month header. The wide table
//! is melted into long [`RawObservation`] rows before feature construction.

use crate::error::{ForecastError, Result};
use crate::utils::month_start;
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::Path;

/// Names of the identifier columns of a wide sales table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideSchema {
    /// Warehouse identifier column
    pub warehouse: String,
    /// Region column
    pub region: String,
    /// SKU identifier column
    pub sku: String,
}

impl Default for WideSchema {
    fn default() -> Self {
        Self {
            warehouse: "warehouse".to_string(),
            region: "region".to_string(),
            sku: "sku".to_string(),
        }
    }
}

impl WideSchema {
    /// Identifier column names in table order
    pub fn id_columns(&self) -> [&str; 3] {
        [&self.warehouse, &self.region, &self.sku]
    }

    fn is_id_column(&self, name: &str) -> bool {
        self.id_columns().contains(&name)
    }
}

/// Identifier values of one wide row
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SeriesKey {
    pub warehouse: String,
    pub region: String,
    pub sku: String,
}

impl SeriesKey {
    pub fn new(warehouse: impl Into<String>, region: impl Into<String>, sku: impl Into<String>) -> Self {
        Self {
            warehouse: warehouse.into(),
            region: region.into(),
            sku: sku.into(),
        }
    }
}

/// A month column header and the month it parsed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthColumn {
    /// Header exactly as it appeared in the input
    pub label: String,
    /// First day of the month, or `None` if the header is not a date
    pub month: Option<NaiveDate>,
}

impl MonthColumn {
    /// Parse a header into a month column
    pub fn parse(label: impl Into<String>) -> Self {
        let label = label.into();
        let month = parse_month_header(&label);
        Self { label, month }
    }
}

/// One melted cell of the wide table
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub warehouse: String,
    pub region: String,
    pub sku: String,
    /// Header the cell came from
    pub month_label: String,
    /// Parsed month; `None` when the header is not a date
    pub month: Option<NaiveDate>,
    /// Sales value; `None` for an empty cell
    pub sales: Option<f64>,
}

impl RawObservation {
    /// Build a fully parsed raw row
    pub fn new(
        warehouse: impl Into<String>,
        region: impl Into<String>,
        sku: impl Into<String>,
        month: NaiveDate,
        sales: f64,
    ) -> Self {
        Self {
            warehouse: warehouse.into(),
            region: region.into(),
            sku: sku.into(),
            month_label: month.format("%Y-%m-%d").to_string(),
            month: Some(month),
            sales: Some(sales),
        }
    }
}

/// Clean long-format observation
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub warehouse: String,
    pub region: String,
    pub sku: String,
    /// First day of the month
    pub month: NaiveDate,
    pub sales: f64,
}

impl Observation {
    /// Convert a raw row, returning `None` if its month or sales value is missing
    pub fn from_raw(raw: &RawObservation) -> Option<Self> {
        Some(Self {
            warehouse: raw.warehouse.clone(),
            region: raw.region.clone(),
            sku: raw.sku.clone(),
            month: raw.month?,
            sales: raw.sales?,
        })
    }
}

/// Wide sales table validated against a [`WideSchema`]
#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    schema: WideSchema,
    keys: Vec<SeriesKey>,
    columns: Vec<MonthColumn>,
    /// Row-major cells, `values[row][column]`
    values: Vec<Vec<Option<f64>>>,
}

/// Data loader for wide sales tables
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a wide sales table from a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P, schema: &WideSchema) -> Result<WideTable> {
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        WideTable::from_dataframe(&df, schema)
    }

    /// Create a wide sales table from an existing DataFrame
    pub fn from_dataframe(df: &DataFrame, schema: &WideSchema) -> Result<WideTable> {
        WideTable::from_dataframe(df, schema)
    }
}

impl WideTable {
    /// Build a table from parts, checking shape and that at least one header is a month
    pub fn new(
        schema: WideSchema,
        keys: Vec<SeriesKey>,
        columns: Vec<MonthColumn>,
        values: Vec<Vec<Option<f64>>>,
    ) -> Result<Self> {
        if values.len() != keys.len() {
            return Err(ForecastError::Schema(format!(
                "{} id rows but {} value rows",
                keys.len(),
                values.len()
            )));
        }
        if let Some((row, cells)) = values
            .iter()
            .enumerate()
            .find(|(_, cells)| cells.len() != columns.len())
        {
            return Err(ForecastError::Schema(format!(
                "row {} has {} cells, expected {}",
                row,
                cells.len(),
                columns.len()
            )));
        }
        if !columns.iter().any(|c| c.month.is_some()) {
            return Err(ForecastError::Schema(
                "no column header parses as a month".to_string(),
            ));
        }

        Ok(Self {
            schema,
            keys,
            columns,
            values,
        })
    }

    /// Validate a DataFrame against the schema and read it into a wide table
    pub fn from_dataframe(df: &DataFrame, schema: &WideSchema) -> Result<Self> {
        let names = df.get_column_names();
        let missing: Vec<&str> = schema
            .id_columns()
            .into_iter()
            .filter(|id| !names.contains(id))
            .collect();
        if !missing.is_empty() {
            return Err(ForecastError::Schema(format!(
                "missing id columns: {}",
                missing.join(", ")
            )));
        }

        let warehouses = string_column(df, &schema.warehouse)?;
        let regions = string_column(df, &schema.region)?;
        let skus = string_column(df, &schema.sku)?;
        let keys: Vec<SeriesKey> = warehouses
            .into_iter()
            .zip(regions)
            .zip(skus)
            .map(|((w, r), s)| SeriesKey::new(w, r, s))
            .collect();

        let mut columns = Vec::new();
        let mut column_values = Vec::new();
        for series in df.get_columns() {
            if schema.is_id_column(series.name()) {
                continue;
            }
            let column = MonthColumn::parse(series.name());
            // cells under a non-month header are dropped later, whatever their type
            let cells = if column.month.is_none() && !series.dtype().is_numeric() {
                vec![None; series.len()]
            } else {
                numeric_column(series)?
            };
            columns.push(column);
            column_values.push(cells);
        }

        let values = (0..keys.len())
            .map(|row| column_values.iter().map(|col| col[row]).collect())
            .collect();

        Self::new(schema.clone(), keys, columns, values)
    }

    /// Schema the table was validated against
    pub fn schema(&self) -> &WideSchema {
        &self.schema
    }

    /// Identifier rows
    pub fn keys(&self) -> &[SeriesKey] {
        &self.keys
    }

    /// Month columns in input order
    pub fn columns(&self) -> &[MonthColumn] {
        &self.columns
    }

    /// Cell at (`row`, `column`)
    pub fn value(&self, row: usize, column: usize) -> Option<f64> {
        self.values[row][column]
    }

    /// Headers that did not parse as months
    pub fn unparsed_headers(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.month.is_none())
            .map(|c| c.label.as_str())
            .collect()
    }

    /// Number of id rows
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if the table has no id rows
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Reshape to long form: one row per (id row, month column), row-major
    pub fn melt(&self) -> Vec<RawObservation> {
        let mut out = Vec::with_capacity(self.keys.len() * self.columns.len());
        for (key, cells) in self.keys.iter().zip(self.values.iter()) {
            for (column, sales) in self.columns.iter().zip(cells.iter()) {
                out.push(RawObservation {
                    warehouse: key.warehouse.clone(),
                    region: key.region.clone(),
                    sku: key.sku.clone(),
                    month_label: column.label.clone(),
                    month: column.month,
                    sales: *sales,
                });
            }
        }
        out
    }

    /// Inverse of [`melt`](Self::melt): id rows in first-seen order, months ascending
    pub fn pivot(schema: WideSchema, rows: &[RawObservation]) -> Result<Self> {
        let mut key_index: HashMap<SeriesKey, usize> = HashMap::new();
        let mut keys = Vec::new();
        let mut months: BTreeMap<NaiveDate, String> = BTreeMap::new();

        for row in rows {
            let month = row.month.ok_or_else(|| {
                ForecastError::Schema(format!("cannot pivot unparsed month '{}'", row.month_label))
            })?;
            months.entry(month).or_insert_with(|| row.month_label.clone());
            let key = SeriesKey::new(&row.warehouse, &row.region, &row.sku);
            if !key_index.contains_key(&key) {
                key_index.insert(key.clone(), keys.len());
                keys.push(key);
            }
        }

        let month_index: HashMap<NaiveDate, usize> =
            months.keys().enumerate().map(|(i, m)| (*m, i)).collect();
        let mut values = vec![vec![None; months.len()]; keys.len()];
        let mut filled = vec![vec![false; months.len()]; keys.len()];

        for row in rows {
            let key = SeriesKey::new(&row.warehouse, &row.region, &row.sku);
            let month = row.month.ok_or_else(|| {
                ForecastError::Schema(format!("cannot pivot unparsed month '{}'", row.month_label))
            })?;
            let (r, c) = (key_index[&key], month_index[&month]);
            if filled[r][c] {
                return Err(ForecastError::DuplicateObservation {
                    warehouse: row.warehouse.clone(),
                    sku: row.sku.clone(),
                    month,
                });
            }
            filled[r][c] = true;
            values[r][c] = row.sales;
        }

        let columns = months
            .into_iter()
            .map(|(month, label)| MonthColumn {
                label,
                month: Some(month),
            })
            .collect();

        Self::new(schema, keys, columns, values)
    }

    /// Convert back to a polars DataFrame
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let mut series = vec![
            Series::new(
                &self.schema.warehouse,
                self.keys.iter().map(|k| k.warehouse.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                &self.schema.region,
                self.keys.iter().map(|k| k.region.as_str()).collect::<Vec<_>>(),
            ),
            Series::new(
                &self.schema.sku,
                self.keys.iter().map(|k| k.sku.as_str()).collect::<Vec<_>>(),
            ),
        ];
        for (c, column) in self.columns.iter().enumerate() {
            let cells: Vec<Option<f64>> = self.values.iter().map(|row| row[c]).collect();
            series.push(Series::new(&column.label, cells));
        }
        Ok(DataFrame::new(series)?)
    }
}

/// Parse a column header into the first day of its month
pub fn parse_month_header(label: &str) -> Option<NaiveDate> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }

    let date = ["%Y-%m-%d", "%Y/%m/%d"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(label, fmt).ok())
        .or_else(|| {
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(label, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", label), "%Y-%m-%d").ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("{}/01", label), "%Y/%m/%d").ok())
        .or_else(|| {
            if label.len() == 6 && label.chars().all(|c| c.is_ascii_digit()) {
                NaiveDate::parse_from_str(&format!("{}01", label), "%Y%m%d").ok()
            } else {
                None
            }
        })
        .or_else(|| NaiveDate::parse_from_str(&format!("01-{}", label), "%d-%b-%Y").ok())
        .or_else(|| NaiveDate::parse_from_str(&format!("01 {}", label), "%d %b %Y").ok())?;

    Some(month_start(date))
}

fn string_column(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let series = df.column(name)?.cast(&DataType::Utf8)?;
    series
        .utf8()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            value.map(str::to_string).ok_or_else(|| {
                ForecastError::Schema(format!("id column '{}' is null at row {}", name, row))
            })
        })
        .collect()
}

fn numeric_column(series: &Series) -> Result<Vec<Option<f64>>> {
    if !series.dtype().is_numeric() {
        return Err(ForecastError::Schema(format!(
            "month column '{}' has non-numeric type {}",
            series.name(),
            series.dtype()
        )));
    }
    let cast = series.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(values)
}
