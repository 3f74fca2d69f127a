//! Conversion of normalized rows into polars frames.

use crate::error::Result;
use crate::model::{columns, CaseReportRow, MobilityRow};
use chrono::NaiveDate;
use polars::prelude::*;

pub(crate) fn iso_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn strings<T>(rows: &[T], f: impl Fn(&T) -> String) -> Vec<String> {
    rows.iter().map(f).collect()
}

pub fn case_reports_frame(rows: &[CaseReportRow]) -> Result<DataFrame> {
    let df = DataFrame::new(vec![
        Series::new(columns::COUNTRY_REGION_CODE, strings(rows, |r| r.country_region_code.to_string())),
        Series::new(columns::COUNTRY_REGION, strings(rows, |r| r.country_region.clone())),
        Series::new(columns::SUB_REGION_1, strings(rows, |r| r.sub_region_1.clone())),
        Series::new(columns::SUB_REGION_2, strings(rows, |r| r.sub_region_2.clone())),
        Series::new(columns::DATE, strings(rows, |r| iso_date(r.date))),
        Series::new(columns::CONFIRMED, rows.iter().map(|r| r.confirmed as i64).collect::<Vec<i64>>()),
        Series::new(columns::DEATHS, rows.iter().map(|r| r.deaths as i64).collect::<Vec<i64>>()),
        Series::new(columns::RECOVERED, rows.iter().map(|r| r.recovered as i64).collect::<Vec<i64>>()),
        Series::new(columns::ACTIVE, rows.iter().map(|r| r.active_cases()).collect::<Vec<i64>>()),
        Series::new(columns::LAT, rows.iter().map(|r| r.extras.latitude).collect::<Vec<Option<f64>>>()),
        Series::new(columns::LONG, rows.iter().map(|r| r.extras.longitude).collect::<Vec<Option<f64>>>()),
        Series::new(
            columns::INCIDENCE_RATE,
            rows.iter().map(|r| r.extras.incidence_rate).collect::<Vec<Option<f64>>>(),
        ),
        Series::new(
            columns::CASE_FATALITY_RATIO,
            rows.iter().map(|r| r.extras.case_fatality_ratio).collect::<Vec<Option<f64>>>(),
        ),
    ])?;
    Ok(df)
}

pub fn mobility_frame(rows: &[MobilityRow]) -> Result<DataFrame> {
    let mut series = vec![
        Series::new(columns::COUNTRY_REGION_CODE, strings(rows, |r| r.country_region_code.to_string())),
        Series::new(columns::COUNTRY_REGION, strings(rows, |r| r.country_region.clone())),
        Series::new(columns::SUB_REGION_1, strings(rows, |r| r.sub_region_1.clone())),
        Series::new(columns::SUB_REGION_2, strings(rows, |r| r.sub_region_2.clone())),
        Series::new(columns::METRO_AREA, strings(rows, |r| r.metro_area.clone())),
        Series::new(columns::ISO_3166_2_CODE, strings(rows, |r| r.iso_3166_2_code.clone())),
        Series::new(columns::CENSUS_FIPS_CODE, strings(rows, |r| r.census_fips_code.clone())),
        Series::new(columns::DATE, strings(rows, |r| iso_date(r.date))),
    ];
    for (idx, name) in columns::PERCENT_CHANGE_METRICS.iter().enumerate() {
        let values: Vec<Option<i64>> = rows.iter().map(|r| r.percent_changes()[idx]).collect();
        series.push(Series::new(name, values));
    }
    Ok(DataFrame::new(series)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CaseExtras, CountryCode};

    #[test]
    fn test_case_frame_shape() {
        let rows = vec![CaseReportRow {
            country_region: "france".to_string(),
            sub_region_1: String::new(),
            sub_region_2: String::new(),
            country_region_code: CountryCode::Resolved("fr".to_string()),
            date: NaiveDate::from_ymd_opt(2020, 4, 2).unwrap(),
            confirmed: 10,
            deaths: 1,
            recovered: 2,
            extras: CaseExtras::default(),
        }];
        let df = case_reports_frame(&rows).unwrap();

        assert_eq!(df.height(), 1);
        assert_eq!(df.width(), 13);
        let date = df.column(columns::DATE).unwrap().str().unwrap().get(0);
        assert_eq!(date, Some("2020-04-02"));
        let active = df.column(columns::ACTIVE).unwrap().i64().unwrap().get(0);
        assert_eq!(active, Some(7));
    }

    #[test]
    fn test_empty_mobility_frame_keeps_schema() {
        let df = mobility_frame(&[]).unwrap();
        assert_eq!(df.height(), 0);
        assert_eq!(df.width(), 14);
        assert_eq!(
            df.column(columns::PARKS).unwrap().dtype(),
            &DataType::Int64
        );
    }
}
