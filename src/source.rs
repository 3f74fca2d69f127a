//! Raw-row sources for the two input datasets.

use crate::error::{IntegrationError, Result};
use crate::model::{columns, CaseExtras, CaseReportRow, CountryCode, MobilityRow};
use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info};

const CASE_REPORT_TABLE: &str = "case report";
const MOBILITY_TABLE: &str = "mobility report";

/// Header spellings across the legacy and current daily-report schemas.
const PROVINCE_HEADERS: &[&str] = &["Province/State", "Province_State", "sub_region_1"];
const COUNTRY_HEADERS: &[&str] = &["Country/Region", "Country_Region", "country_region"];
const ADMIN2_HEADERS: &[&str] = &["Admin2", "sub_region_2"];
const CODE_HEADERS: &[&str] = &["country_region_code"];
const CONFIRMED_HEADERS: &[&str] = &["Confirmed"];
const DEATHS_HEADERS: &[&str] = &["Deaths"];
const RECOVERED_HEADERS: &[&str] = &["Recovered"];
const ACTIVE_HEADERS: &[&str] = &["Active"];
const LAT_HEADERS: &[&str] = &["Lat", "Latitude"];
const LONG_HEADERS: &[&str] = &["Long_", "Longitude"];
const INCIDENCE_HEADERS: &[&str] = &["Incidence_Rate", "Incident_Rate"];
const FATALITY_HEADERS: &[&str] = &["Case-Fatality_Ratio", "Case_Fatality_Ratio"];

const MOBILITY_REQUIRED: &[&str] = &[
    columns::COUNTRY_REGION_CODE,
    columns::COUNTRY_REGION,
    columns::SUB_REGION_1,
    columns::SUB_REGION_2,
    columns::DATE,
];

/// Fail fast when a source file has not been fetched.
pub fn ensure_available(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(IntegrationError::DataAvailability(format!(
            "{} is missing; download and extract the source datasets first",
            path.display()
        )))
    }
}

/// Column positions of a case-report header.
struct CaseReportLayout {
    province: usize,
    country: usize,
    admin2: Option<usize>,
    code: Option<usize>,
    confirmed: usize,
    deaths: usize,
    recovered: usize,
    active: Option<usize>,
    lat: Option<usize>,
    long: Option<usize>,
    incidence_rate: Option<usize>,
    case_fatality_ratio: Option<usize>,
}

impl CaseReportLayout {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let index: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}'), i))
            .collect();
        let find = |aliases: &[&str]| aliases.iter().find_map(|a| index.get(a).copied());
        let require = |aliases: &[&str]| {
            find(aliases).ok_or_else(|| IntegrationError::missing_column(CASE_REPORT_TABLE, aliases[0]))
        };

        Ok(Self {
            province: require(PROVINCE_HEADERS)?,
            country: require(COUNTRY_HEADERS)?,
            admin2: find(ADMIN2_HEADERS),
            code: find(CODE_HEADERS),
            confirmed: require(CONFIRMED_HEADERS)?,
            deaths: require(DEATHS_HEADERS)?,
            recovered: require(RECOVERED_HEADERS)?,
            active: find(ACTIVE_HEADERS),
            lat: find(LAT_HEADERS),
            long: find(LONG_HEADERS),
            incidence_rate: find(INCIDENCE_HEADERS),
            case_fatality_ratio: find(FATALITY_HEADERS),
        })
    }
}

/// Read a JHU daily report and stamp every row with the report date.
pub fn read_case_reports(path: &Path, report_date: NaiveDate) -> Result<Vec<CaseReportRow>> {
    ensure_available(path)?;
    info!("reading case report {}", path.display());

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let layout = CaseReportLayout::from_headers(rdr.headers()?)?;

    let mut rows = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result?;
        // header is line 1
        let line = line + 2;
        let cell = |idx: usize| record.get(idx).unwrap_or("").trim();
        let optional = |idx: Option<usize>| idx.map(|i| cell(i)).unwrap_or("");

        rows.push(CaseReportRow {
            country_region: cell(layout.country).to_string(),
            sub_region_1: cell(layout.province).to_string(),
            sub_region_2: optional(layout.admin2).to_string(),
            country_region_code: CountryCode::parse(optional(layout.code)),
            date: report_date,
            confirmed: parse_count(cell(layout.confirmed), columns::CONFIRMED, line)?,
            deaths: parse_count(cell(layout.deaths), columns::DEATHS, line)?,
            recovered: parse_count(cell(layout.recovered), columns::RECOVERED, line)?,
            extras: CaseExtras {
                active: parse_optional_signed(optional(layout.active), columns::ACTIVE, line)?,
                latitude: parse_optional_float(optional(layout.lat), columns::LAT, line)?,
                longitude: parse_optional_float(optional(layout.long), columns::LONG, line)?,
                incidence_rate: parse_optional_float(
                    optional(layout.incidence_rate),
                    columns::INCIDENCE_RATE,
                    line,
                )?,
                case_fatality_ratio: parse_optional_float(
                    optional(layout.case_fatality_ratio),
                    columns::CASE_FATALITY_RATIO,
                    line,
                )?,
            },
        });
    }

    info!("read {} case report rows", rows.len());
    Ok(rows)
}

/// Read a mobility table; works for the published report and the normalized cache.
pub fn read_mobility(path: &Path) -> Result<Vec<MobilityRow>> {
    ensure_available(path)?;
    info!("reading mobility report {}", path.display());

    let mut rdr = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_string())
        .collect();
    for required in MOBILITY_REQUIRED {
        if !headers.iter().any(|h| h == required) {
            return Err(IntegrationError::missing_column(MOBILITY_TABLE, required));
        }
    }
    rdr.set_headers(StringRecord::from(headers));

    let mut rows = Vec::new();
    for (line, result) in rdr.deserialize::<MobilityRow>().enumerate() {
        let row = result.map_err(|e| {
            IntegrationError::schema_mismatch(MOBILITY_TABLE, format!("line {}: {}", line + 2, e))
        })?;
        rows.push(row);
    }

    debug!("read {} mobility rows", rows.len());
    Ok(rows)
}

/// Counts are non-negative integers; blank reads as zero and integral
/// floats (`"12.0"`) are accepted.
fn parse_count(raw: &str, column: &str, line: usize) -> Result<u64> {
    match parse_optional_float(raw, column, line)? {
        None => Ok(0),
        Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v as u64),
        Some(v) => Err(IntegrationError::schema_mismatch(
            column,
            format!("line {}: expected a non-negative integer, found {}", line, v),
        )),
    }
}

fn parse_optional_signed(raw: &str, column: &str, line: usize) -> Result<Option<i64>> {
    match parse_optional_float(raw, column, line)? {
        None => Ok(None),
        Some(v) if v.fract() == 0.0 => Ok(Some(v as i64)),
        Some(v) => Err(IntegrationError::schema_mismatch(
            column,
            format!("line {}: expected an integer, found {}", line, v),
        )),
    }
}

fn parse_optional_float(raw: &str, column: &str, line: usize) -> Result<Option<f64>> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>().map(Some).map_err(|_| {
        IntegrationError::schema_mismatch(column, format!("line {}: '{}' is not a number", line, raw))
    })
}
