use crate::error::{IntegrationError, Result};
use crate::frame::{self, iso_date};
use crate::model::{columns, CaseReportRow, MobilityRow, UNRESOLVED_CODE};
use chrono::NaiveDate;
use polars::prelude::*;
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Geographic resolution of a join. Each level is an independent join
/// configuration selected by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Granularity {
    Country,
    State,
    County,
}

impl Granularity {
    pub const ALL: [Granularity; 3] = [Granularity::Country, Granularity::State, Granularity::County];

    pub fn name(&self) -> &'static str {
        match self {
            Granularity::Country => "country",
            Granularity::State => "state",
            Granularity::County => "county",
        }
    }

    /// Location columns of the join key, without the date.
    pub fn location_columns(&self) -> &'static [&'static str] {
        match self {
            Granularity::Country => &[columns::COUNTRY_REGION_CODE],
            Granularity::State => &[columns::COUNTRY_REGION_CODE, columns::SUB_REGION_1],
            Granularity::County => &[
                columns::COUNTRY_REGION_CODE,
                columns::SUB_REGION_1,
                columns::SUB_REGION_2,
            ],
        }
    }

    /// Full equality key: location columns followed by the date.
    pub fn key_columns(&self) -> Vec<&'static str> {
        let mut keys = self.location_columns().to_vec();
        keys.push(columns::DATE);
        keys
    }

    /// Mobility rows reported at this level. The three predicates partition
    /// the table: country rows have no sub-region or metro area, county rows
    /// have a sub_region_2, state rows are everything else.
    pub fn mobility_filter(&self) -> Expr {
        let country_tier = col(columns::SUB_REGION_1)
            .eq(lit(""))
            .and(col(columns::SUB_REGION_2).eq(lit("")))
            .and(col(columns::METRO_AREA).eq(lit("")));
        match self {
            Granularity::Country => country_tier,
            Granularity::State => col(columns::SUB_REGION_2).eq(lit("")).and(country_tier.not()),
            Granularity::County => col(columns::SUB_REGION_2).neq(lit("")),
        }
    }

    /// Row-level form of [`Granularity::mobility_filter`].
    pub fn accepts(&self, row: &MobilityRow) -> bool {
        let key = row.location_key();
        let country_tier =
            key.sub_region_1.is_empty() && key.sub_region_2.is_empty() && row.metro_area.is_empty();
        match self {
            Granularity::Country => country_tier,
            Granularity::State => key.sub_region_2.is_empty() && !country_tier,
            Granularity::County => !key.sub_region_2.is_empty(),
        }
    }

    /// Case-report groups whose key fields at this level are all present.
    fn case_filter(&self) -> Expr {
        self.location_columns()
            .iter()
            .skip(1)
            .fold(lit(true), |acc, c| acc.and(col(c).neq(lit(""))))
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Granularity {
    type Err = IntegrationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "country" => Ok(Granularity::Country),
            "state" => Ok(Granularity::State),
            "county" => Ok(Granularity::County),
            other => Err(IntegrationError::UnsupportedGranularity(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinOptions {
    pub granularity: Granularity,
    pub date: NaiveDate,
    /// Also carry active cases, mean coordinates, incidence rate and case
    /// fatality ratio.
    pub extra_columns: bool,
}

impl JoinOptions {
    pub fn new(granularity: Granularity, date: NaiveDate) -> Self {
        Self {
            granularity,
            date,
            extra_columns: false,
        }
    }

    pub fn with_extra_columns(mut self, extra_columns: bool) -> Self {
        self.extra_columns = extra_columns;
        self
    }

    /// Task name used to partition outputs, e.g. `state-with-extra-columns`.
    pub fn task_name(&self) -> String {
        if self.extra_columns {
            format!("{}-with-extra-columns", self.granularity)
        } else {
            self.granularity.to_string()
        }
    }
}

const CASE_TABLE: &str = "case report frame";
const MOBILITY_TABLE: &str = "mobility frame";

/// Aggregates case reports to a granularity and inner-joins them with the
/// mobility rows reported at that level.
pub struct GranularityJoiner;

impl GranularityJoiner {
    pub fn join(
        &self,
        cases: &[CaseReportRow],
        mobility: &[MobilityRow],
        options: &JoinOptions,
    ) -> Result<DataFrame> {
        let left = frame::case_reports_frame(cases)?;
        let right = frame::mobility_frame(mobility)?;
        self.join_frames(left, right, options)
    }

    pub fn join_frames(
        &self,
        left: DataFrame,
        right: DataFrame,
        options: &JoinOptions,
    ) -> Result<DataFrame> {
        let granularity = options.granularity;
        self.validate(&left, &right, options)?;

        let date = iso_date(options.date);
        let resolved = col(columns::COUNTRY_REGION_CODE).neq(lit(UNRESOLVED_CODE));
        let on_date = col(columns::DATE).eq(lit(date.clone()));
        let keys: Vec<Expr> = granularity.key_columns().iter().map(|c| col(c)).collect();

        let aggregated = left
            .lazy()
            .filter(on_date.clone().and(resolved.clone()).and(granularity.case_filter()))
            .group_by(keys.clone())
            .agg(self.aggregations(options.extra_columns));

        let reported = right
            .lazy()
            .filter(on_date.and(resolved).and(granularity.mobility_filter()));

        let joined = aggregated
            .join(reported, keys.clone(), keys, JoinArgs::new(JoinType::Inner))
            .collect()?;

        info!(
            "{} join on {}: {} rows",
            options.task_name(),
            date,
            joined.height()
        );
        Ok(joined)
    }

    fn aggregations(&self, extra_columns: bool) -> Vec<Expr> {
        let mut aggs = vec![
            col(columns::CONFIRMED).sum().alias(columns::CONFIRMED),
            col(columns::DEATHS).sum().alias(columns::DEATHS),
            col(columns::RECOVERED).sum().alias(columns::RECOVERED),
        ];
        if extra_columns {
            aggs.extend([
                col(columns::ACTIVE).sum().alias(columns::ACTIVE),
                col(columns::LAT).mean().alias(columns::LATITUDE),
                col(columns::LONG).mean().alias(columns::LONGITUDE),
                col(columns::INCIDENCE_RATE).mean().alias(columns::INCIDENCE_RATE),
                col(columns::CASE_FATALITY_RATIO)
                    .mean()
                    .alias(columns::CASE_FATALITY_RATIO),
            ]);
        }
        aggs
    }

    fn validate(&self, left: &DataFrame, right: &DataFrame, options: &JoinOptions) -> Result<()> {
        let left_schema = left.schema();
        let right_schema = right.schema();
        let keys = options.granularity.key_columns();

        for key in &keys {
            expect_string(&left_schema, CASE_TABLE, key)?;
            expect_string(&right_schema, MOBILITY_TABLE, key)?;
        }
        for filter_column in [columns::SUB_REGION_1, columns::SUB_REGION_2, columns::METRO_AREA] {
            expect_string(&right_schema, MOBILITY_TABLE, filter_column)?;
        }
        for count in [columns::CONFIRMED, columns::DEATHS, columns::RECOVERED] {
            expect_numeric(&left_schema, CASE_TABLE, count, true)?;
        }
        if options.extra_columns {
            expect_numeric(&left_schema, CASE_TABLE, columns::ACTIVE, true)?;
            for measure in [
                columns::LAT,
                columns::LONG,
                columns::INCIDENCE_RATE,
                columns::CASE_FATALITY_RATIO,
            ] {
                expect_numeric(&left_schema, CASE_TABLE, measure, false)?;
            }
        }
        Ok(())
    }
}

fn expect_string(schema: &Schema, table: &str, column: &str) -> Result<()> {
    match schema.get(column) {
        None => Err(IntegrationError::missing_column(table, column)),
        Some(DataType::String) => Ok(()),
        Some(other) => Err(IntegrationError::schema_mismatch(
            column,
            format!("{} key column must be a string, found {}", table, other),
        )),
    }
}

fn expect_numeric(schema: &Schema, table: &str, column: &str, integer: bool) -> Result<()> {
    match schema.get(column) {
        None => Err(IntegrationError::missing_column(table, column)),
        Some(dtype) if integer && dtype.is_integer() => Ok(()),
        Some(dtype) if !integer && dtype.is_numeric() => Ok(()),
        Some(DataType::Null) if !integer => Ok(()),
        Some(other) => Err(IntegrationError::schema_mismatch(
            column,
            format!("{} measure cannot be aggregated as {}", table, other),
        )),
    }
}

/// Sort a joined table by its key tuple; join output order is otherwise unspecified.
pub fn sort_by_key(df: DataFrame, granularity: Granularity) -> Result<DataFrame> {
    let keys: Vec<Expr> = granularity.key_columns().iter().map(|c| col(c)).collect();
    Ok(df
        .lazy()
        .sort_by_exprs(keys, SortMultipleOptions::default())
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CaseExtras, CountryCode};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2020, 6, 30).unwrap()
    }

    fn case(code: &str, sub1: &str, sub2: &str, confirmed: u64, deaths: u64, recovered: u64) -> CaseReportRow {
        CaseReportRow {
            country_region: String::new(),
            sub_region_1: sub1.to_string(),
            sub_region_2: sub2.to_string(),
            country_region_code: CountryCode::parse(code),
            date: date(),
            confirmed,
            deaths,
            recovered,
            extras: CaseExtras::default(),
        }
    }

    fn mobility(code: &str, sub1: &str, sub2: &str, metro: &str, parks: i64) -> MobilityRow {
        MobilityRow {
            country_region_code: CountryCode::parse(code),
            country_region: "somewhere".to_string(),
            sub_region_1: sub1.to_string(),
            sub_region_2: sub2.to_string(),
            metro_area: metro.to_string(),
            iso_3166_2_code: String::new(),
            census_fips_code: String::new(),
            date: date(),
            retail_and_recreation: Some(-20),
            grocery_and_pharmacy: None,
            parks: Some(parks),
            transit_stations: Some(-5),
            workplaces: Some(-30),
            residential: Some(9),
        }
    }

    fn i64_at(df: &DataFrame, column: &str, row: usize) -> Option<i64> {
        df.column(column).unwrap().i64().unwrap().get(row)
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!("County".parse::<Granularity>().unwrap(), Granularity::County);
        assert!(matches!(
            "city".parse::<Granularity>(),
            Err(IntegrationError::UnsupportedGranularity(_))
        ));
    }

    #[test]
    fn test_filters_partition_mobility_rows() {
        let rows = vec![
            mobility("us", "", "", "", 1),
            mobility("us", "california", "", "", 1),
            mobility("us", "california", "orange", "", 1),
            mobility("us", "", "", "chicago metropolitan area", 1),
        ];
        for row in &rows {
            let hits = Granularity::ALL.iter().filter(|g| g.accepts(row)).count();
            assert_eq!(hits, 1, "row {:?}", row);
        }

        let df = frame::mobility_frame(&rows).unwrap();
        let total: usize = Granularity::ALL
            .iter()
            .map(|g| df.clone().lazy().filter(g.mobility_filter()).collect().unwrap().height())
            .sum();
        assert_eq!(total, rows.len());
    }

    #[test]
    fn test_county_join_sums_group_and_keeps_metrics() {
        let cases = vec![
            case("us", "california", "orange", 100, 2, 10),
            case("us", "california", "orange", 50, 1, 5),
            case("us", "california", "alpine", 7, 0, 0),
        ];
        let mob = vec![
            mobility("us", "california", "orange", "", 12),
            mobility("us", "california", "", "", 3),
        ];
        let options = JoinOptions::new(Granularity::County, date());
        let joined = GranularityJoiner.join(&cases, &mob, &options).unwrap();

        assert_eq!(joined.height(), 1);
        assert_eq!(i64_at(&joined, columns::CONFIRMED, 0), Some(150));
        assert_eq!(i64_at(&joined, columns::DEATHS, 0), Some(3));
        assert_eq!(i64_at(&joined, columns::RECOVERED, 0), Some(15));
        assert_eq!(i64_at(&joined, columns::PARKS, 0), Some(12));
        assert_eq!(i64_at(&joined, columns::GROCERY_AND_PHARMACY, 0), None);
        let county = joined.column(columns::SUB_REGION_2).unwrap().str().unwrap().get(0);
        assert_eq!(county, Some("orange"));
    }

    #[test]
    fn test_country_join_aggregates_provinces() {
        let cases = vec![
            case("cn", "hubei", "", 60, 3, 20),
            case("cn", "beijing", "", 40, 1, 10),
            case("fr", "", "", 5, 0, 0),
        ];
        let mob = vec![
            mobility("cn", "", "", "", -1),
            mobility("cn", "beijing", "", "", -2),
        ];
        let joined = GranularityJoiner
            .join(&cases, &mob, &JoinOptions::new(Granularity::Country, date()))
            .unwrap();

        assert_eq!(joined.height(), 1);
        assert_eq!(i64_at(&joined, columns::CONFIRMED, 0), Some(100));
        assert_eq!(i64_at(&joined, columns::PARKS, 0), Some(-1));
    }

    #[test]
    fn test_state_join_ignores_country_and_county_rows() {
        let cases = vec![
            case("us", "california", "orange", 10, 0, 0),
            case("us", "california", "alpine", 5, 0, 0),
            case("fr", "", "", 99, 0, 0),
        ];
        let mob = vec![
            mobility("us", "california", "", "", 4),
            mobility("us", "california", "orange", "", 8),
            mobility("fr", "", "", "", 1),
        ];
        let joined = GranularityJoiner
            .join(&cases, &mob, &JoinOptions::new(Granularity::State, date()))
            .unwrap();

        assert_eq!(joined.height(), 1);
        assert_eq!(i64_at(&joined, columns::CONFIRMED, 0), Some(15));
        assert_eq!(i64_at(&joined, columns::PARKS, 0), Some(4));
    }

    #[test]
    fn test_unmatched_and_unresolved_groups_are_dropped() {
        let cases = vec![
            case("unresolved", "", "", 3, 0, 0),
            case("de", "", "", 8, 0, 0),
        ];
        let mob = vec![mobility("unresolved", "", "", "", 2), mobility("it", "", "", "", 2)];
        let joined = GranularityJoiner
            .join(&cases, &mob, &JoinOptions::new(Granularity::Country, date()))
            .unwrap();
        assert_eq!(joined.height(), 0);
    }

    #[test]
    fn test_other_dates_are_ignored() {
        let mut stale = case("fr", "", "", 1000, 0, 0);
        stale.date = NaiveDate::from_ymd_opt(2020, 6, 29).unwrap();
        let cases = vec![stale, case("fr", "", "", 1, 0, 0)];
        let joined = GranularityJoiner
            .join(&cases, &[mobility("fr", "", "", "", 0)], &JoinOptions::new(Granularity::Country, date()))
            .unwrap();
        assert_eq!(i64_at(&joined, columns::CONFIRMED, 0), Some(1));
    }

    #[test]
    fn test_extra_columns() {
        let mut a = case("it", "lombardia", "", 30, 5, 5);
        a.extras.latitude = Some(45.0);
        a.extras.longitude = Some(9.0);
        let mut b = case("it", "lazio", "", 10, 0, 0);
        b.extras.latitude = Some(41.0);
        b.extras.longitude = Some(13.0);
        b.extras.active = Some(4);

        let options = JoinOptions::new(Granularity::Country, date()).with_extra_columns(true);
        assert_eq!(options.task_name(), "country-with-extra-columns");
        let joined = GranularityJoiner
            .join(&[a, b], &[mobility("it", "", "", "", 0)], &options)
            .unwrap();

        assert_eq!(i64_at(&joined, columns::ACTIVE, 0), Some(24));
        let lat = joined.column(columns::LATITUDE).unwrap().f64().unwrap().get(0);
        assert_eq!(lat, Some(43.0));
        let long = joined.column(columns::LONGITUDE).unwrap().f64().unwrap().get(0);
        assert_eq!(long, Some(11.0));
    }

    #[test]
    fn test_missing_key_column_is_configuration_error() {
        let left = frame::case_reports_frame(&[case("fr", "", "", 1, 0, 0)])
            .unwrap()
            .drop(columns::SUB_REGION_1)
            .unwrap();
        let right = frame::mobility_frame(&[]).unwrap();
        let err = GranularityJoiner
            .join_frames(left, right, &JoinOptions::new(Granularity::State, date()))
            .unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("sub_region_1"));
    }

    #[test]
    fn test_wrong_key_type_is_schema_mismatch() {
        let left = df! [
            "country_region_code" => [1i64],
            "date" => ["2020-06-30"],
            "Confirmed" => [1i64],
            "Deaths" => [0i64],
            "Recovered" => [0i64]
        ]
        .unwrap();
        let right = frame::mobility_frame(&[]).unwrap();
        let err = GranularityJoiner
            .join_frames(left, right, &JoinOptions::new(Granularity::Country, date()))
            .unwrap_err();
        assert!(matches!(err, IntegrationError::SchemaMismatch { .. }));
    }

    #[test]
    fn test_sort_by_key() {
        let df = df! [
            "country_region_code" => ["us", "fr", "de"],
            "date" => ["2020-06-30", "2020-06-30", "2020-06-30"]
        ]
        .unwrap();
        let sorted = sort_by_key(df, Granularity::Country).unwrap();
        let codes: Vec<Option<&str>> = sorted
            .column(columns::COUNTRY_REGION_CODE)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some("de"), Some("fr"), Some("us")]);
    }
}
