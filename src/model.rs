//! Row types shared by the source readers, the normalizer and the joiner.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Column names of the normalized tables and the joined output.
pub mod columns {
    pub const COUNTRY_REGION_CODE: &str = "country_region_code";
    pub const COUNTRY_REGION: &str = "country_region";
    pub const SUB_REGION_1: &str = "sub_region_1";
    pub const SUB_REGION_2: &str = "sub_region_2";
    pub const METRO_AREA: &str = "metro_area";
    pub const ISO_3166_2_CODE: &str = "iso_3166_2_code";
    pub const CENSUS_FIPS_CODE: &str = "census_fips_code";
    pub const DATE: &str = "date";

    pub const CONFIRMED: &str = "Confirmed";
    pub const DEATHS: &str = "Deaths";
    pub const RECOVERED: &str = "Recovered";
    pub const ACTIVE: &str = "Active";
    pub const LAT: &str = "Lat";
    pub const LONG: &str = "Long_";
    pub const LATITUDE: &str = "Latitude";
    pub const LONGITUDE: &str = "Longitude";
    pub const INCIDENCE_RATE: &str = "Incidence_Rate";
    pub const CASE_FATALITY_RATIO: &str = "Case-Fatality_Ratio";

    pub const RETAIL_AND_RECREATION: &str = "retail_and_recreation_percent_change_from_baseline";
    pub const GROCERY_AND_PHARMACY: &str = "grocery_and_pharmacy_percent_change_from_baseline";
    pub const PARKS: &str = "parks_percent_change_from_baseline";
    pub const TRANSIT_STATIONS: &str = "transit_stations_percent_change_from_baseline";
    pub const WORKPLACES: &str = "workplaces_percent_change_from_baseline";
    pub const RESIDENTIAL: &str = "residential_percent_change_from_baseline";

    pub const PERCENT_CHANGE_METRICS: [&str; 6] = [
        RETAIL_AND_RECREATION,
        GROCERY_AND_PHARMACY,
        PARKS,
        TRANSIT_STATIONS,
        WORKPLACES,
        RESIDENTIAL,
    ];
}

/// Serialized form of [`CountryCode::Unresolved`].
pub const UNRESOLVED_CODE: &str = "unresolved";

/// ISO alpha-2 country code of a row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CountryCode {
    /// The raw input carried no code; only seen before normalization.
    #[default]
    Missing,
    /// Lowercase two-letter code.
    Resolved(String),
    /// Resolution was attempted and failed. Never joins with anything.
    Unresolved,
}

impl CountryCode {
    /// Parse a serialized code. Trusted verbatim apart from casing and whitespace.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CountryCode::Missing
        } else if trimmed.eq_ignore_ascii_case(UNRESOLVED_CODE) {
            CountryCode::Unresolved
        } else {
            CountryCode::Resolved(trimmed.to_lowercase())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CountryCode::Missing => "",
            CountryCode::Resolved(code) => code,
            CountryCode::Unresolved => UNRESOLVED_CODE,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CountryCode::Missing)
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, CountryCode::Resolved(_))
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CountryCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CountryCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map(|s| CountryCode::parse(&s)).unwrap_or_default())
    }
}

/// Join key of a location. Empty sub-regions mean "not applicable".
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LocationKey {
    pub country_region_code: String,
    pub sub_region_1: String,
    pub sub_region_2: String,
}

/// Optional measures only present in the newer daily-report schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseExtras {
    pub active: Option<i64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub incidence_rate: Option<f64>,
    pub case_fatality_ratio: Option<f64>,
}

/// One row of a JHU daily case report.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseReportRow {
    pub country_region: String,
    pub sub_region_1: String,
    pub sub_region_2: String,
    pub country_region_code: CountryCode,
    pub date: NaiveDate,
    pub confirmed: u64,
    pub deaths: u64,
    pub recovered: u64,
    pub extras: CaseExtras,
}

impl CaseReportRow {
    pub fn location_key(&self) -> LocationKey {
        LocationKey {
            country_region_code: self.country_region_code.to_string(),
            sub_region_1: self.sub_region_1.clone(),
            sub_region_2: self.sub_region_2.clone(),
        }
    }

    /// Reported active cases, or confirmed minus deaths minus recovered.
    pub fn active_cases(&self) -> i64 {
        self.extras.active.unwrap_or_else(|| {
            self.confirmed as i64 - self.deaths as i64 - self.recovered as i64
        })
    }
}

/// One row of the Google community mobility report.
///
/// Field names match the published CSV header so the same type reads the
/// source file and the normalized cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MobilityRow {
    pub country_region_code: CountryCode,
    #[serde(default)]
    pub country_region: String,
    #[serde(default)]
    pub sub_region_1: String,
    #[serde(default)]
    pub sub_region_2: String,
    #[serde(default)]
    pub metro_area: String,
    #[serde(default)]
    pub iso_3166_2_code: String,
    #[serde(default)]
    pub census_fips_code: String,
    pub date: NaiveDate,
    #[serde(rename = "retail_and_recreation_percent_change_from_baseline", default)]
    pub retail_and_recreation: Option<i64>,
    #[serde(rename = "grocery_and_pharmacy_percent_change_from_baseline", default)]
    pub grocery_and_pharmacy: Option<i64>,
    #[serde(rename = "parks_percent_change_from_baseline", default)]
    pub parks: Option<i64>,
    #[serde(rename = "transit_stations_percent_change_from_baseline", default)]
    pub transit_stations: Option<i64>,
    #[serde(rename = "workplaces_percent_change_from_baseline", default)]
    pub workplaces: Option<i64>,
    #[serde(rename = "residential_percent_change_from_baseline", default)]
    pub residential: Option<i64>,
}

impl MobilityRow {
    pub fn location_key(&self) -> LocationKey {
        LocationKey {
            country_region_code: self.country_region_code.to_string(),
            sub_region_1: self.sub_region_1.clone(),
            sub_region_2: self.sub_region_2.clone(),
        }
    }

    pub fn percent_changes(&self) -> [Option<i64>; 6] {
        [
            self.retail_and_recreation,
            self.grocery_and_pharmacy,
            self.parks,
            self.transit_stations,
            self.workplaces,
            self.residential,
        ]
    }
}
