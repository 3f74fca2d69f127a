//! Location normalization for both source schemas.
//!
//! Both entry points are pure maps: they take a borrowed table and return a
//! new one, so a normalized table can be shared by every granularity.

use crate::error::UnresolvedLocationCode;
use crate::geo_data;
use crate::model::{CaseReportRow, CountryCode, MobilityRow};
use crate::resolver::{CountryLookup, CountryResolver, FuzzyCountryLookup, Resolution};
use itertools::Itertools;
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::info;

/// A normalized table plus the names that could not be resolved.
#[derive(Debug, Clone)]
pub struct Normalized<T> {
    pub rows: Vec<T>,
    pub diagnostics: Vec<UnresolvedLocationCode>,
}

pub struct LocationNormalizer<L: CountryLookup = FuzzyCountryLookup> {
    resolver: CountryResolver<L>,
    // Reports repeat the same few hundred names thousands of times
    memo: RefCell<HashMap<String, Resolution>>,
}

impl Default for LocationNormalizer<FuzzyCountryLookup> {
    fn default() -> Self {
        Self::new(CountryResolver::default())
    }
}

impl<L: CountryLookup> LocationNormalizer<L> {
    pub fn new(resolver: CountryResolver<L>) -> Self {
        Self {
            resolver,
            memo: RefCell::new(HashMap::new()),
        }
    }

    pub fn normalize_case_reports(&self, rows: &[CaseReportRow]) -> Normalized<CaseReportRow> {
        info!("normalizing {} case report rows", rows.len());
        let mut diagnostics = Vec::new();
        let rows = rows
            .iter()
            .map(|row| self.normalize_case_report(row, &mut diagnostics))
            .collect();
        Normalized { rows, diagnostics: dedup_diagnostics(diagnostics) }
    }

    pub fn normalize_mobility(&self, rows: &[MobilityRow]) -> Normalized<MobilityRow> {
        info!("normalizing {} mobility rows", rows.len());
        let mut diagnostics = Vec::new();
        let rows = rows
            .iter()
            .map(|row| self.normalize_mobility_row(row, &mut diagnostics))
            .collect();
        Normalized { rows, diagnostics: dedup_diagnostics(diagnostics) }
    }

    fn normalize_case_report(
        &self,
        row: &CaseReportRow,
        diagnostics: &mut Vec<UnresolvedLocationCode>,
    ) -> CaseReportRow {
        let country_region = clean(&row.country_region.replace('*', ""));
        let (sub_region_1, sub_region_2) = split_location(&row.sub_region_1, &row.sub_region_2);
        let country_region_code = self.fill_code(&row.country_region_code, &country_region, diagnostics);

        CaseReportRow {
            country_region,
            sub_region_1,
            sub_region_2,
            country_region_code,
            ..row.clone()
        }
    }

    fn normalize_mobility_row(
        &self,
        row: &MobilityRow,
        diagnostics: &mut Vec<UnresolvedLocationCode>,
    ) -> MobilityRow {
        let country_region = clean(&row.country_region);
        let country_region_code = self.fill_code(&row.country_region_code, &country_region, diagnostics);

        MobilityRow {
            country_region_code,
            country_region,
            sub_region_1: clean(&row.sub_region_1),
            sub_region_2: strip_place_suffixes(&row.sub_region_2),
            metro_area: clean(&row.metro_area),
            iso_3166_2_code: row.iso_3166_2_code.trim().to_string(),
            census_fips_code: row.census_fips_code.trim().to_string(),
            ..row.clone()
        }
    }

    /// Codes present in the source are trusted; only missing ones are resolved.
    fn fill_code(
        &self,
        code: &CountryCode,
        country_region: &str,
        diagnostics: &mut Vec<UnresolvedLocationCode>,
    ) -> CountryCode {
        if !code.is_missing() {
            return code.clone();
        }

        let resolution = self
            .memo
            .borrow_mut()
            .entry(country_region.to_string())
            .or_insert_with(|| self.resolver.resolve(country_region))
            .clone();

        match resolution {
            Resolution::Resolved(code) => CountryCode::Resolved(code),
            Resolution::Unresolved(diag) => {
                diagnostics.push(diag);
                CountryCode::Unresolved
            }
        }
    }
}

fn clean(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Split a `"County, ST"` location into `(state, county)`.
///
/// Without a comma the existing county is kept, which makes the split
/// idempotent. An unknown abbreviation leaves the state field as given.
pub fn split_location(sub_region_1: &str, sub_region_2: &str) -> (String, String) {
    match sub_region_1.find(',') {
        Some(position) if position > 0 => {
            let county = clean(&sub_region_1[..position]);
            let abbreviation = sub_region_1[position + 1..].trim().to_uppercase();
            let state = match geo_data::state_name(&abbreviation) {
                Some(full) => full.to_lowercase(),
                None => clean(sub_region_1),
            };
            (state, county)
        }
        _ => (clean(sub_region_1), clean(sub_region_2)),
    }
}

/// Lowercase, drop the literal words "county" and "city", trim.
pub fn strip_place_suffixes(sub_region_2: &str) -> String {
    sub_region_2
        .to_lowercase()
        .replace("county", "")
        .replace("city", "")
        .trim()
        .to_string()
}

/// First diagnostic per name, in input order.
pub(crate) fn dedup_diagnostics(
    diagnostics: impl IntoIterator<Item = UnresolvedLocationCode>,
) -> Vec<UnresolvedLocationCode> {
    diagnostics
        .into_iter()
        .unique_by(|d| d.name.clone())
        .collect()
}
