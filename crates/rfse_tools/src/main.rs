//! Resource Flow Simulation Engine - Command-line Tools

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use rfse_core::forecast::Forecaster;
use rfse_core::math::{Day, Quantity};
use rfse_core::optimizer::FlowOptimizer;
use rfse_tools::compare::compare_scenarios;
use rfse_tools::report::{save_json, to_json, ForecastReport, RunSummary};
use rfse_tools::scenario::{load_catalog, Result};
use rfse_tools::validate::validate_data_directory;
use rfse_tools::Scenario;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "rfse-tools")]
#[command(about = "Tools for the Resource Flow Simulation Engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to data directory
        #[arg(default_value = "assets/data")]
        path: PathBuf,
    },
    /// Simulate a scenario
    Simulate {
        /// Scenario file
        scenario: PathBuf,
        /// Override the scenario's horizon
        #[arg(long)]
        horizon: Option<Day>,
        /// Print JSON instead of a text summary
        #[arg(long)]
        json: bool,
        /// Also write the JSON summary to this file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Project one resource's availability
    Forecast {
        /// Scenario file
        scenario: PathBuf,
        /// Resource to project
        #[arg(short, long)]
        resource: String,
        /// Days ahead
        #[arg(short, long, default_value_t = 30)]
        days: Day,
        /// Report the first day the projection reaches this quantity
        #[arg(long)]
        target: Option<f64>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
    /// Cover plan deficits and re-time the plan, printing it as RON
    Optimize {
        /// Scenario file
        scenario: PathBuf,
        /// Count the scenario's starting inventory as supply
        #[arg(long)]
        with_inventory: bool,
        /// Override the minimum days between mission launches
        #[arg(long)]
        spacing: Option<Day>,
    },
    /// Run several scenarios in parallel against one catalog
    Compare {
        /// Scenario files
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,
        /// Catalog shared by every run (default: the first scenario's)
        #[arg(short, long)]
        catalog: Option<PathBuf>,
        /// Override every scenario's horizon
        #[arg(long)]
        horizon: Option<Day>,
        /// Print JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match run(cli.command) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    }
}

/// Returns `Ok(false)` when the command ran but found problems.
fn run(command: Commands) -> Result<bool> {
    match command {
        Commands::Validate { path } => validate(&path),
        Commands::Simulate {
            scenario,
            horizon,
            json,
            output,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let catalog = scenario.load_catalog()?;
            let result = scenario.run(&catalog, horizon)?;
            let summary = RunSummary::new(scenario.name.clone(), &result);
            if json {
                println!("{}", to_json(&summary)?);
            } else {
                print!("{summary}");
            }
            if let Some(path) = output {
                save_json(&summary, &path)?;
                tracing::info!("Summary written to {}", path.display());
            }
            Ok(true)
        }
        Commands::Forecast {
            scenario,
            resource,
            days,
            target,
            json,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let catalog = scenario.load_catalog()?;
            let scheduler = scenario.scheduler(&catalog)?;
            let forecaster = Forecaster::new(&catalog, scheduler.ledger(), scheduler.active());
            let target = target.map(Quantity::from_f64);
            let report = ForecastReport {
                points: forecaster.series(&resource, days),
                target_day: target.and_then(|t| forecaster.days_until(&resource, t, days)),
                target,
                resource,
            };
            if json {
                println!("{}", to_json(&report)?);
            } else {
                print!("{report}");
            }
            Ok(true)
        }
        Commands::Optimize {
            scenario,
            with_inventory,
            spacing,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let catalog = scenario.load_catalog()?;
            let mut config = scenario.optimizer.clone();
            if let Some(days) = spacing {
                config = config.with_mission_spacing(days);
            }
            let ledger = scenario.ledger();
            let mut optimizer = FlowOptimizer::new(&catalog, &config);
            if with_inventory {
                optimizer = optimizer.with_inventory(&ledger);
            }
            for (resource, deficit) in optimizer.deficits(&scenario.plan) {
                tracing::info!(%resource, %deficit, "Plan deficit");
            }
            let plan = optimizer.optimize(&scenario.plan)?;
            println!(
                "{}",
                ron::ser::to_string_pretty(&plan, ron::ser::PrettyConfig::default())?
            );
            Ok(true)
        }
        Commands::Compare {
            scenarios,
            catalog,
            horizon,
            json,
        } => {
            let scenarios = scenarios
                .iter()
                .map(Scenario::load)
                .collect::<Result<Vec<_>>>()?;
            let catalog = match catalog {
                Some(path) => load_catalog(&path)?,
                None => match scenarios.first() {
                    Some(first) => first.load_catalog()?,
                    None => return Ok(false),
                },
            };
            let comparison = compare_scenarios(&catalog, &scenarios, horizon);
            if json {
                println!("{}", to_json(&comparison)?);
            } else {
                print!("{comparison}");
                if let Some(best) = comparison.ranked().first() {
                    println!("\nBest: {}", best.scenario);
                }
            }
            Ok(true)
        }
    }
}

fn validate(path: &Path) -> Result<bool> {
    tracing::info!("Validating data files in: {}", path.display());
    let report = validate_data_directory(path)?;
    for file in &report.files {
        if file.issues.is_empty() {
            println!("ok    {}", file.path.display());
        }
        for issue in &file.issues {
            println!("FAIL  {}: {issue}", file.path.display());
        }
    }
    if report.is_valid() {
        tracing::info!("Validation passed");
    } else {
        tracing::error!("Validation failed: {} issue(s)", report.issue_count());
    }
    Ok(report.is_valid())
}
