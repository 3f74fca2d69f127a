//! Joined-table output and comparison against expected results.

use crate::cache::temp_sibling;
use crate::error::{IntegrationError, Result};
use crate::join::{self, JoinOptions};
use csv::ReaderBuilder;
use itertools::Itertools;
use polars::prelude::*;
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Numeric cells closer than this are considered equal.
pub const FLOAT_TOLERANCE: f64 = 1e-6;

/// Result of comparing a joined table with an expected CSV.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableComparison {
    /// Set when the two headers name different columns.
    pub header_mismatch: Option<String>,
    pub matching: usize,
    /// Expected rows with no counterpart in the joined table.
    pub missing: Vec<Vec<String>>,
    /// Joined rows with no counterpart in the expected table.
    pub unexpected: Vec<Vec<String>>,
}

impl TableComparison {
    pub fn is_match(&self) -> bool {
        self.header_mismatch.is_none() && self.missing.is_empty() && self.unexpected.is_empty()
    }

    pub fn summary(&self) -> String {
        match &self.header_mismatch {
            Some(detail) => format!("header mismatch: {}", detail),
            None => format!(
                "{} matching, {} missing, {} unexpected",
                self.matching,
                self.missing.len(),
                self.unexpected.len()
            ),
        }
    }
}

pub struct ResultSink {
    output_dir: PathBuf,
}

impl ResultSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// `<output_dir>/<task>/<MM-DD-YYYY>.csv`
    pub fn output_path(&self, options: &JoinOptions) -> PathBuf {
        task_path(&self.output_dir, options)
    }

    /// Sort by key and write the table. The file appears complete or not at all.
    pub fn write(&self, df: DataFrame, options: &JoinOptions) -> Result<PathBuf> {
        let path = self.output_path(options);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut sorted = join::sort_by_key(df, options.granularity)?;
        let tmp = temp_sibling(&path);
        {
            let mut file = File::create(&tmp)?;
            CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut sorted)?;
        }
        fs::rename(&tmp, &path)?;

        info!("wrote {} rows to {}", sorted.height(), path.display());
        Ok(path)
    }

    /// Compare a joined table with an expected CSV, ignoring row order.
    pub fn compare(&self, df: &DataFrame, expected_path: &Path) -> Result<TableComparison> {
        if !expected_path.is_file() {
            return Err(IntegrationError::DataAvailability(format!(
                "expected result {} is missing",
                expected_path.display()
            )));
        }

        let mut buffer = Vec::new();
        CsvWriter::new(&mut buffer)
            .include_header(true)
            .finish(&mut df.clone())?;
        let (actual_header, actual_rows) = read_table(buffer.as_slice())?;
        let (expected_header, expected_rows) = read_table(File::open(expected_path)?)?;

        let comparison = compare_tables(&actual_header, actual_rows, &expected_header, expected_rows);
        debug!("compared with {}: {}", expected_path.display(), comparison.summary());
        Ok(comparison)
    }
}

/// `<dir>/<task>/<MM-DD-YYYY>.csv`, shared by outputs and ground truth.
pub fn task_path(dir: &Path, options: &JoinOptions) -> PathBuf {
    dir.join(options.task_name())
        .join(format!("{}.csv", options.date.format("%m-%d-%Y")))
}

fn read_table<R: std::io::Read>(reader: R) -> Result<(Vec<String>, Vec<Vec<String>>)> {
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(reader);
    let header = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    let mut rows = Vec::new();
    for record in rdr.records() {
        rows.push(record?.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok((header, rows))
}

fn compare_tables(
    actual_header: &[String],
    actual_rows: Vec<Vec<String>>,
    expected_header: &[String],
    expected_rows: Vec<Vec<String>>,
) -> TableComparison {
    let mut actual_sorted = actual_header.to_vec();
    let mut expected_sorted = expected_header.to_vec();
    actual_sorted.sort();
    expected_sorted.sort();
    if actual_sorted != expected_sorted {
        let absent = actual_header.iter().filter(|h| !expected_header.contains(h)).join(", ");
        let extra = expected_header.iter().filter(|h| !actual_header.contains(h)).join(", ");
        return TableComparison {
            header_mismatch: Some(format!("only in output [{}], only in expected [{}]", absent, extra)),
            ..TableComparison::default()
        };
    }

    // Reorder expected cells into the output's column order
    let order: Vec<usize> = actual_header
        .iter()
        .filter_map(|h| expected_header.iter().position(|e| e == h))
        .collect();
    let expected_rows: Vec<Vec<String>> = expected_rows
        .into_iter()
        .map(|row| order.iter().map(|&i| row.get(i).cloned().unwrap_or_default()).collect())
        .collect();

    // Bucket expected rows by their non-numeric cells, then match numerics
    // within a bucket under the tolerance.
    let mut buckets: HashMap<Vec<String>, Vec<Vec<String>>> = HashMap::new();
    for row in expected_rows {
        buckets.entry(text_signature(&row)).or_default().push(row);
    }

    let mut comparison = TableComparison::default();
    for row in actual_rows {
        let candidates = buckets.entry(text_signature(&row)).or_default();
        match candidates.iter().position(|candidate| rows_equal(&row, candidate)) {
            Some(i) => {
                candidates.swap_remove(i);
                comparison.matching += 1;
            }
            None => comparison.unexpected.push(row),
        }
    }
    comparison.missing = buckets.into_values().flatten().collect();
    comparison
}

fn is_null(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null")
}

fn text_signature(row: &[String]) -> Vec<String> {
    row.iter()
        .map(|cell| {
            if is_null(cell) || cell.parse::<f64>().is_ok() {
                String::new()
            } else {
                cell.clone()
            }
        })
        .collect()
}

fn cells_equal(a: &str, b: &str) -> bool {
    if a == b || (is_null(a) && is_null(b)) {
        return true;
    }
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => (x - y).abs() <= FLOAT_TOLERANCE,
        _ => false,
    }
}

fn rows_equal(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| cells_equal(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::Granularity;
    use chrono::NaiveDate;

    fn temp_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("mobility_sink_{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn options(extra: bool) -> JoinOptions {
        JoinOptions::new(Granularity::Country, NaiveDate::from_ymd_opt(2020, 6, 30).unwrap())
            .with_extra_columns(extra)
    }

    fn joined() -> DataFrame {
        df! [
            "country_region_code" => ["us", "fr"],
            "date" => ["2020-06-30", "2020-06-30"],
            "Confirmed" => [100i64, 40],
            "Latitude" => [Some(37.25), None],
        ]
        .unwrap()
    }

    #[test]
    fn test_output_path_per_task() {
        let sink = ResultSink::new("out");
        assert_eq!(
            sink.output_path(&options(false)),
            PathBuf::from("out/country/06-30-2020.csv")
        );
        assert_eq!(
            sink.output_path(&options(true)),
            PathBuf::from("out/country-with-extra-columns/06-30-2020.csv")
        );
    }

    #[test]
    fn test_write_sorts_by_key() {
        let dir = temp_dir();
        let sink = ResultSink::new(&dir);
        let path = sink.write(joined(), &options(false)).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "country_region_code,date,Confirmed,Latitude");
        assert!(lines[1].starts_with("fr,"));
        assert!(lines[2].starts_with("us,"));
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_compare_ignores_order_and_float_noise() {
        let dir = temp_dir();
        let expected = dir.join("expected.csv");
        fs::write(
            &expected,
            "date,country_region_code,Confirmed,Latitude\n\
             2020-06-30,fr,40,\n\
             2020-06-30,us,100.0,37.2500000001\n",
        )
        .unwrap();

        let comparison = ResultSink::new(&dir).compare(&joined(), &expected).unwrap();
        assert!(comparison.is_match(), "{}", comparison.summary());
        assert_eq!(comparison.matching, 2);
    }

    #[test]
    fn test_compare_reports_differences() {
        let dir = temp_dir();
        let expected = dir.join("expected.csv");
        fs::write(
            &expected,
            "country_region_code,date,Confirmed,Latitude\n\
             us,2020-06-30,101,37.25\n\
             de,2020-06-30,3,51.0\n\
             fr,2020-06-30,40,\n",
        )
        .unwrap();

        let comparison = ResultSink::new(&dir).compare(&joined(), &expected).unwrap();
        assert!(!comparison.is_match());
        assert_eq!(comparison.matching, 1);
        assert_eq!(comparison.unexpected.len(), 1);
        assert_eq!(comparison.missing.len(), 2);
    }

    #[test]
    fn test_compare_header_mismatch() {
        let dir = temp_dir();
        let expected = dir.join("expected.csv");
        fs::write(&expected, "country_region_code,date,Confirmed\nus,2020-06-30,100\n").unwrap();

        let comparison = ResultSink::new(&dir).compare(&joined(), &expected).unwrap();
        assert!(comparison.header_mismatch.unwrap().contains("Latitude"));
    }

    #[test]
    fn test_compare_missing_expected_file() {
        let dir = temp_dir();
        let err = ResultSink::new(&dir)
            .compare(&joined(), &dir.join("nope.csv"))
            .unwrap_err();
        assert!(matches!(err, IntegrationError::DataAvailability(_)));
    }
}
