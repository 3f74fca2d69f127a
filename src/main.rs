use mobility_integration::pipeline::{plan_tasks, IntegrationPipeline, RunSummary};
use mobility_integration::{Granularity, IntegrationConfig};

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mobility-integration")]
#[command(about = "Join COVID-19 daily case reports with community mobility reports")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Directory overrides shared by every subcommand; each falls back to the
/// MOBILITY_* environment variables, then to the built-in defaults.
#[derive(clap::Args)]
struct DirArgs {
    /// Directory holding the daily reports and Global_Mobility_Report.csv
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Directory for the normalized mobility cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Always re-read and re-normalize the mobility report
    #[arg(long)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Integrate one daily report with the mobility report
    Run {
        /// Report date, MM-DD-YYYY
        #[arg(long)]
        date: String,

        /// country, state, county, or all (all granularities in both column modes)
        #[arg(short, long, default_value = "all")]
        granularity: String,

        /// Carry active cases, mean coordinates, incidence rate and case fatality ratio
        #[arg(long)]
        extra_columns: bool,

        /// Where joined tables are written
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Ground-truth tables (<task>/<MM-DD-YYYY>.csv) to compare outputs with
        #[arg(long)]
        expected_dir: Option<PathBuf>,

        #[command(flatten)]
        dirs: DirArgs,
    },
    /// Normalize the mobility report once and store it in the cache
    WarmCache {
        #[command(flatten)]
        dirs: DirArgs,
    },
}

fn apply_dirs(config: &mut IntegrationConfig, dirs: DirArgs) {
    if let Some(dir) = dirs.data_dir {
        config.data_dir = dir;
    }
    if let Some(dir) = dirs.cache_dir {
        config.cache_dir = dir;
    }
    if dirs.no_cache {
        config.use_cache = false;
    }
}

fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let mut config = IntegrationConfig::from_env()?;

    match args.command {
        Commands::Run {
            date,
            granularity,
            extra_columns,
            output_dir,
            expected_dir,
            dirs,
        } => {
            apply_dirs(&mut config, dirs);
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            if expected_dir.is_some() {
                config.expected_dir = expected_dir;
            }

            let date = config.date_window.parse_report_date(&date)?;
            let granularity = match granularity.trim().to_lowercase().as_str() {
                "all" => None,
                other => Some(other.parse::<Granularity>()?),
            };
            let tasks = plan_tasks(granularity, extra_columns, date);

            let summary = IntegrationPipeline::new(config).run(date, &tasks)?;
            report(&summary);

            let mismatches = summary.mismatches();
            if !mismatches.is_empty() {
                let names: Vec<String> = mismatches.iter().map(|t| t.options.task_name()).collect();
                bail!("output differs from expected for: {}", names.join(", "));
            }
        }
        Commands::WarmCache { dirs } => {
            apply_dirs(&mut config, dirs);
            if !config.use_cache {
                bail!("warm-cache needs the cache enabled");
            }
            let rows = IntegrationPipeline::new(config).warm_cache()?;
            info!("mobility cache holds {} normalized rows", rows);
        }
    }

    Ok(())
}

fn report(summary: &RunSummary) {
    println!("\n=== Integration results for {} ===", summary.date.format("%m-%d-%Y"));
    for task in &summary.tasks {
        let check = match &task.comparison {
            Some(c) if c.is_match() => " [matches expected]".to_string(),
            Some(c) => format!(" [DIFFERS: {}]", c.summary()),
            None => String::new(),
        };
        println!(
            "{:<28} {:>6} rows  {}{}",
            task.options.task_name(),
            task.rows,
            task.path.display(),
            check
        );
    }

    if !summary.diagnostics.is_empty() {
        warn!("{} location names could not be resolved", summary.diagnostics.len());
        println!("\nUnresolved locations (rows kept, never joined):");
        for diagnostic in &summary.diagnostics {
            println!("  - {}", diagnostic);
        }
    }
}
