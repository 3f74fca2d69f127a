use crate::error::{IntegrationError, Result};
use chrono::NaiveDate;
use std::env;
use std::path::{Path, PathBuf};

pub const REPORT_DATE_FORMAT: &str = "%m-%d-%Y";
pub const MOBILITY_FILE_NAME: &str = "Global_Mobility_Report.csv";
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.95;

/// Inclusive range of report dates for which both datasets overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl Default for DateWindow {
    fn default() -> Self {
        Self {
            first: NaiveDate::from_ymd_opt(2020, 2, 15).unwrap_or_default(),
            last: NaiveDate::from_ymd_opt(2020, 6, 30).unwrap_or_default(),
        }
    }
}

impl DateWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.first <= date && date <= self.last
    }

    /// Parse an `MM-DD-YYYY` report date and check it against the window.
    pub fn parse_report_date(&self, raw: &str) -> Result<NaiveDate> {
        let date = NaiveDate::parse_from_str(raw.trim(), REPORT_DATE_FORMAT).map_err(|e| {
            IntegrationError::Configuration(format!(
                "report date '{}' is not MM-DD-YYYY: {}",
                raw, e
            ))
        })?;
        if !self.contains(date) {
            return Err(IntegrationError::Configuration(format!(
                "report date {} is outside the supported window {} to {}",
                raw,
                self.first.format(REPORT_DATE_FORMAT),
                self.last.format(REPORT_DATE_FORMAT)
            )));
        }
        Ok(date)
    }
}

#[derive(Debug, Clone)]
pub struct IntegrationConfig {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Ground-truth tables to compare outputs with, when present.
    pub expected_dir: Option<PathBuf>,
    pub fuzzy_threshold: f64,
    pub date_window: DateWindow,
    pub use_cache: bool,
}

impl Default for IntegrationConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("source-datasets"),
            output_dir: PathBuf::from("output"),
            cache_dir: PathBuf::from(".cache"),
            expected_dir: None,
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            date_window: DateWindow::default(),
            use_cache: true,
        }
    }
}

impl IntegrationConfig {
    /// Defaults overridden by `MOBILITY_*` environment variables.
    /// Call `dotenv::dotenv()` first to pick up a `.env` file.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = non_empty("MOBILITY_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("MOBILITY_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("MOBILITY_CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = non_empty("MOBILITY_EXPECTED_DIR") {
            config.expected_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = non_empty("MOBILITY_FUZZY_THRESHOLD") {
            config.fuzzy_threshold = parse_threshold(&raw)?;
        }
        Ok(config)
    }

    pub fn case_report_path(&self, date: NaiveDate) -> PathBuf {
        self.data_dir
            .join(format!("{}.csv", date.format(REPORT_DATE_FORMAT)))
    }

    pub fn mobility_path(&self) -> PathBuf {
        self.data_dir.join(MOBILITY_FILE_NAME)
    }

    pub fn expected_dir(&self) -> Option<&Path> {
        self.expected_dir.as_deref()
    }
}

fn parse_threshold(raw: &str) -> Result<f64> {
    let value: f64 = raw.trim().parse().map_err(|_| {
        IntegrationError::Configuration(format!("fuzzy threshold '{}' is not a number", raw))
    })?;
    if !(0.0..=1.0).contains(&value) {
        return Err(IntegrationError::Configuration(format!(
            "fuzzy threshold {} must lie in [0, 1]",
            value
        )));
    }
    Ok(value)
}
