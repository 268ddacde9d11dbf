//! Scenario loading and configuration.
//!
//! A scenario bundles everything a run needs from the calling layer: the
//! catalog to use, initial inventory, records of work already in progress,
//! installed power units, the development plan, and run settings.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use rfse_core::analyzer::PowerTable;
use rfse_core::catalog::Catalog;
use rfse_core::error::EngineError;
use rfse_core::instance::{ActiveMission, ActiveProduction};
use rfse_core::ledger::InventoryLedger;
use rfse_core::math::{Day, Quantity};
use rfse_core::optimizer::OptimizerConfig;
use rfse_core::plan::DevelopmentPhase;
use rfse_core::scheduler::{Scheduler, SimulationConfig, SimulationResult};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Error type for tool operations.
#[derive(Error, Debug)]
pub enum ToolError {
    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(String),
    /// Failed to read or write a file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse '{path}': {source}")]
    Parse {
        /// File that failed to parse.
        path: String,
        /// Underlying parse error.
        #[source]
        source: ron::error::SpannedError,
    },
    /// Failed to write RON.
    #[error("Failed to write RON: {0}")]
    RonWrite(#[from] ron::Error),
    /// Failed to write JSON.
    #[error("Failed to write JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The engine rejected the input.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Result type alias using [`ToolError`].
pub type Result<T> = std::result::Result<T, ToolError>;

/// Read a file, distinguishing a missing file from other IO failures.
///
/// # Errors
///
/// Returns [`ToolError::FileNotFound`] or [`ToolError::Io`].
pub fn read_file(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(ToolError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

/// Load a catalog document from a RON file.
///
/// # Errors
///
/// Returns an error if the file is missing, unreadable, malformed, or
/// defines an id twice.
pub fn load_catalog(path: &Path) -> Result<Catalog> {
    let contents = read_file(path)?;
    let catalog = Catalog::from_ron_str(&path.display().to_string(), &contents)?;
    info!(
        path = %path.display(),
        chains = catalog.chain_count(),
        missions = catalog.mission_count(),
        "Loaded catalog"
    );
    Ok(catalog)
}

fn default_horizon() -> Day {
    90
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Catalog file, relative to the scenario file.
    pub catalog: PathBuf,
    /// Initial inventory.
    #[serde(default)]
    pub inventory: BTreeMap<String, Quantity>,
    /// Productions already running before day 0.
    #[serde(default)]
    pub active_productions: Vec<ActiveProduction>,
    /// Missions already underway before day 0.
    #[serde(default)]
    pub active_missions: Vec<ActiveMission>,
    /// kW capacity per power unit type.
    #[serde(default)]
    pub power_table: PowerTable,
    /// Installed power units by type.
    #[serde(default)]
    pub power_units: BTreeMap<String, u32>,
    /// The development plan.
    #[serde(default)]
    pub plan: Vec<DevelopmentPhase>,
    /// Last simulated day (inclusive).
    #[serde(default = "default_horizon")]
    pub horizon_days: Day,
    /// Simulation settings.
    #[serde(default)]
    pub simulation: SimulationConfig,
    /// Optimizer settings.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Directory the scenario was loaded from, for resolving `catalog`.
    #[serde(skip)]
    pub base_dir: PathBuf,
}

impl Scenario {
    /// Load a scenario from a RON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unreadable, or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = read_file(path)?;
        let mut scenario = Self::from_ron_str(&contents).map_err(|e| match e {
            ToolError::Parse { source, .. } => ToolError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;
        scenario.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        debug!(path = %path.display(), name = %scenario.name, "Loaded scenario");
        Ok(scenario)
    }

    /// Load from a RON string (useful for embedded scenarios).
    ///
    /// The catalog path resolves against the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::Parse`] if the text is malformed.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|source| ToolError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }

    /// Full path of the catalog file.
    #[must_use]
    pub fn catalog_path(&self) -> PathBuf {
        self.base_dir.join(&self.catalog)
    }

    /// Load this scenario's catalog.
    ///
    /// # Errors
    ///
    /// See [`load_catalog`].
    pub fn load_catalog(&self) -> Result<Catalog> {
        load_catalog(&self.catalog_path())
    }

    /// Initial ledger built from the inventory section.
    #[must_use]
    pub fn ledger(&self) -> InventoryLedger {
        InventoryLedger::from_snapshot(
            self.inventory
                .iter()
                .map(|(resource, &quantity)| (resource.as_str(), quantity)),
        )
    }

    /// Simulation settings with available power taken from the power units.
    ///
    /// An empty power table leaves the configured figure untouched.
    #[must_use]
    pub fn simulation_config(&self) -> SimulationConfig {
        let mut config = self.simulation.clone();
        if !self.power_units.is_empty() {
            config.analyzer = config
                .analyzer
                .with_power_table(&self.power_table, &self.power_units);
        }
        config
    }

    /// A scheduler seeded with active records and loaded with the plan.
    ///
    /// # Errors
    ///
    /// Returns an engine error for unknown seeded ids or an invalid plan.
    pub fn scheduler<'a>(&self, catalog: &'a Catalog) -> Result<Scheduler<'a>> {
        let mut scheduler =
            Scheduler::new(catalog, self.ledger()).with_config(self.simulation_config());
        for record in &self.active_productions {
            scheduler.seed_production(record)?;
        }
        for record in &self.active_missions {
            scheduler.seed_mission(record)?;
        }
        scheduler.load_plan(&self.plan)?;
        Ok(scheduler)
    }

    /// Run the scenario through `horizon` (or its own horizon).
    ///
    /// # Errors
    ///
    /// See [`Scenario::scheduler`].
    pub fn run(&self, catalog: &Catalog, horizon: Option<Day>) -> Result<SimulationResult> {
        let horizon = horizon.unwrap_or(self.horizon_days);
        info!(scenario = %self.name, horizon, "Running scenario");
        Ok(self.scheduler(catalog)?.run(horizon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCENARIO: &str = r#"Scenario(
        name: "Outpost",
        catalog: "catalog.ron",
        inventory: { "ore": 50, "fuel": 12.5 },
        active_productions: [(chain: "smelter", completion_day: 2)],
        power_table: { "solar": 5 },
        power_units: { "solar": 6 },
        plan: [
            (start_day: 0, productions: [(chain: "mine", quantity: 2)]),
            (start_day: 4, missions: ["survey"]),
        ],
        simulation: (fuel_resource: "hydrazine"),
    )"#;

    #[test]
    fn test_parse_scenario_with_defaults() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        assert_eq!(scenario.name, "Outpost");
        assert_eq!(scenario.horizon_days, 90);
        assert_eq!(scenario.plan.len(), 2);
        assert_eq!(scenario.active_productions[0].multiplier, 1);
        assert_eq!(scenario.simulation.fuel_resource.as_str(), "hydrazine");
        assert_eq!(scenario.simulation.analyzer.mission_ceiling, 3);
        assert_eq!(scenario.optimizer, OptimizerConfig::default());
    }

    #[test]
    fn test_ledger_and_power_from_scenario() {
        let scenario = Scenario::from_ron_str(SCENARIO).unwrap();
        let ledger = scenario.ledger();
        assert_eq!(ledger.get("ore"), Quantity::new(50));
        assert_eq!(ledger.get("fuel"), Quantity::from_f64(12.5));
        assert_eq!(
            scenario.simulation_config().analyzer.available_power_kw,
            Quantity::new(30)
        );
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = Scenario::from_ron_str("Scenario(name: ").unwrap_err();
        assert!(matches!(err, ToolError::Parse { .. }));
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::load("definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ToolError::FileNotFound(_)));
    }
}
