//! End-to-end run: load, normalize, join at each requested granularity, write.

use crate::cache::MobilityCache;
use crate::config::IntegrationConfig;
use crate::error::{IntegrationError, Result, UnresolvedLocationCode};
use crate::frame;
use crate::join::{Granularity, GranularityJoiner, JoinOptions};
use crate::model::MobilityRow;
use crate::normalize::{dedup_diagnostics, LocationNormalizer, Normalized};
use crate::resolver::{CountryResolver, FuzzyCountryLookup};
use crate::sink::{self, ResultSink, TableComparison};
use crate::source;
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

/// Outcome of one granularity/column-mode task.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub options: JoinOptions,
    pub rows: usize,
    pub path: PathBuf,
    pub comparison: Option<TableComparison>,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub date: NaiveDate,
    pub tasks: Vec<TaskOutcome>,
    /// Names that could not be resolved, across both tables.
    pub diagnostics: Vec<UnresolvedLocationCode>,
}

impl RunSummary {
    /// Tasks whose output differs from the expected table.
    pub fn mismatches(&self) -> Vec<&TaskOutcome> {
        self.tasks
            .iter()
            .filter(|t| t.comparison.as_ref().map_or(false, |c| !c.is_match()))
            .collect()
    }
}

/// Task list for a run: one granularity, or all three in both column modes.
pub fn plan_tasks(granularity: Option<Granularity>, extra_columns: bool, date: NaiveDate) -> Vec<JoinOptions> {
    match granularity {
        Some(g) => vec![JoinOptions::new(g, date).with_extra_columns(extra_columns)],
        None => Granularity::ALL
            .iter()
            .flat_map(|&g| {
                [
                    JoinOptions::new(g, date),
                    JoinOptions::new(g, date).with_extra_columns(true),
                ]
            })
            .collect(),
    }
}

pub struct IntegrationPipeline {
    config: IntegrationConfig,
    normalizer: LocationNormalizer,
    joiner: GranularityJoiner,
    sink: ResultSink,
}

impl IntegrationPipeline {
    pub fn new(config: IntegrationConfig) -> Self {
        let lookup = FuzzyCountryLookup::new(config.fuzzy_threshold);
        let normalizer = LocationNormalizer::new(CountryResolver::new(lookup));
        let sink = ResultSink::new(config.output_dir.clone());
        Self {
            config,
            normalizer,
            joiner: GranularityJoiner,
            sink,
        }
    }

    pub fn config(&self) -> &IntegrationConfig {
        &self.config
    }

    pub fn run(&self, date: NaiveDate, tasks: &[JoinOptions]) -> Result<RunSummary> {
        if !self.config.date_window.contains(date) {
            return Err(IntegrationError::Configuration(format!(
                "report date {} is outside the supported window",
                date
            )));
        }
        if let Some(task) = tasks.iter().find(|t| t.date != date) {
            return Err(IntegrationError::Configuration(format!(
                "task {} is for {}, run is for {}",
                task.task_name(),
                task.date,
                date
            )));
        }

        let case_path = self.config.case_report_path(date);
        let mobility_path = self.config.mobility_path();
        source::ensure_available(&case_path)?;
        source::ensure_available(&mobility_path)?;

        info!("loading case report {}", case_path.display());
        let cases = self
            .normalizer
            .normalize_case_reports(&source::read_case_reports(&case_path, date)?);
        let mobility = self.load_mobility()?;

        let left = frame::case_reports_frame(&cases.rows)?;
        let right = frame::mobility_frame(&mobility.rows)?;

        // Every task is joined and compared before anything is written, so a
        // failing task leaves no output behind.
        let mut staged = Vec::with_capacity(tasks.len());
        for options in tasks {
            let joined = self.joiner.join_frames(left.clone(), right.clone(), options)?;
            let comparison = match self.config.expected_dir() {
                Some(dir) => {
                    let comparison = self.sink.compare(&joined, &sink::task_path(dir, options))?;
                    if comparison.is_match() {
                        info!("{} matches expected output", options.task_name());
                    } else {
                        warn!("{} differs from expected output: {}", options.task_name(), comparison.summary());
                    }
                    Some(comparison)
                }
                None => None,
            };
            staged.push((*options, joined, comparison));
        }

        let mut outcomes = Vec::with_capacity(staged.len());
        for (options, joined, comparison) in staged {
            let rows = joined.height();
            let path = self.sink.write(joined, &options)?;
            outcomes.push(TaskOutcome {
                options,
                rows,
                path,
                comparison,
            });
        }

        Ok(RunSummary {
            date,
            tasks: outcomes,
            diagnostics: dedup_diagnostics(cases.diagnostics.into_iter().chain(mobility.diagnostics)),
        })
    }

    /// Normalized mobility table, through the cache unless disabled. Rows
    /// served from the cache carry no diagnostics.
    pub fn load_mobility(&self) -> Result<Normalized<MobilityRow>> {
        let path = self.config.mobility_path();
        let mut diagnostics = Vec::new();
        let mut build = |p: &std::path::Path| -> Result<Vec<MobilityRow>> {
            info!("loading mobility report {}", p.display());
            let normalized = self.normalizer.normalize_mobility(&source::read_mobility(p)?);
            diagnostics = normalized.diagnostics;
            Ok(normalized.rows)
        };

        let rows = if self.config.use_cache {
            MobilityCache::new(self.config.cache_dir.clone()).get_or_build(&path, build)?
        } else {
            source::ensure_available(&path)?;
            build(&path)?
        };
        for granularity in Granularity::ALL {
            let count = rows.iter().filter(|r| granularity.accepts(r)).count();
            info!("{} {}-level mobility rows", count, granularity);
        }
        Ok(Normalized { rows, diagnostics })
    }

    /// Build the normalized mobility cache without running any join.
    pub fn warm_cache(&self) -> Result<usize> {
        let path = self.config.mobility_path();
        let rows = MobilityCache::new(self.config.cache_dir.clone()).get_or_build(&path, |p| {
            Ok(self.normalizer.normalize_mobility(&source::read_mobility(p)?).rows)
        })?;
        Ok(rows.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_all_tasks() {
        let date = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
        let names: Vec<String> = plan_tasks(None, false, date).iter().map(|t| t.task_name()).collect();
        assert_eq!(
            names,
            vec![
                "country",
                "country-with-extra-columns",
                "state",
                "state-with-extra-columns",
                "county",
                "county-with-extra-columns",
            ]
        );
    }

    #[test]
    fn test_plan_single_task() {
        let date = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
        let tasks = plan_tasks(Some(Granularity::State), true, date);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task_name(), "state-with-extra-columns");
    }

    #[test]
    fn test_missing_case_report_fails_before_work() {
        let dir = std::env::temp_dir().join(format!("mobility_pipeline_{}", uuid::Uuid::new_v4()));
        let config = IntegrationConfig {
            data_dir: dir.clone(),
            output_dir: dir.join("out"),
            cache_dir: dir.join("cache"),
            ..IntegrationConfig::default()
        };
        let date = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
        let pipeline = IntegrationPipeline::new(config);

        let err = pipeline.run(date, &plan_tasks(None, false, date)).unwrap_err();
        assert!(matches!(err, IntegrationError::DataAvailability(_)));
        assert!(!dir.join("out").exists());
    }

    fn fixture_config(name: &str) -> IntegrationConfig {
        let dir = std::env::temp_dir().join(format!("mobility_pipeline_{}_{}", name, uuid::Uuid::new_v4()));
        let data_dir = dir.join("data");
        std::fs::create_dir_all(&data_dir).unwrap();
        std::fs::write(
            data_dir.join("06-30-2020.csv"),
            "Province/State,Country/Region,Last Update,Confirmed,Deaths,Recovered\n\
             ,France,2020-06-30T23:00:00,10,1,2\n",
        )
        .unwrap();
        std::fs::write(
            data_dir.join("Global_Mobility_Report.csv"),
            "country_region_code,country_region,sub_region_1,sub_region_2,date,parks_percent_change_from_baseline\n\
             FR,France,,,2020-06-30,12\n",
        )
        .unwrap();
        IntegrationConfig {
            data_dir,
            output_dir: dir.join("out"),
            cache_dir: dir.join("cache"),
            expected_dir: Some(dir.join("expected")),
            ..IntegrationConfig::default()
        }
    }

    #[test]
    fn test_failed_task_leaves_no_output() {
        let config = fixture_config("partial");
        let date = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
        let tasks = plan_tasks(None, false, date);

        // Ground truth exists for the first task only
        let expected_dir = config.expected_dir.clone().unwrap();
        let first = sink::task_path(&expected_dir, &tasks[0]);
        std::fs::create_dir_all(first.parent().unwrap()).unwrap();
        std::fs::write(&first, "country_region_code,date\nfr,2020-06-30\n").unwrap();

        let err = IntegrationPipeline::new(config.clone()).run(date, &tasks).unwrap_err();
        assert!(matches!(err, IntegrationError::DataAvailability(_)));
        assert!(!config.output_dir.exists());
    }

    #[test]
    fn test_outputs_written_once_all_tasks_succeed() {
        let config = IntegrationConfig {
            expected_dir: None,
            ..fixture_config("complete")
        };
        let date = NaiveDate::from_ymd_opt(2020, 6, 30).unwrap();
        let summary = IntegrationPipeline::new(config)
            .run(date, &plan_tasks(None, false, date))
            .unwrap();

        assert_eq!(summary.tasks.len(), 6);
        assert!(summary.tasks.iter().all(|t| t.path.is_file()));
        assert_eq!(summary.tasks[0].rows, 1);
    }

    #[test]
    fn test_out_of_window_date() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let pipeline = IntegrationPipeline::new(IntegrationConfig::default());
        let err = pipeline.run(date, &plan_tasks(None, false, date)).unwrap_err();
        assert!(err.is_configuration());
    }
}
