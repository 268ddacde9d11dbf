//! # RFSE Core
//!
//! Deterministic resource flow simulation for settlement development plans.
//!
//! This crate contains **only** deterministic logic:
//! - No IO
//! - No randomness
//! - No wall-clock access
//! - No floating-point math (uses fixed-point)
//!
//! Identical inputs always produce byte-identical results, which enables
//! what-if comparison across many plans and regression testing of results.
//!
//! ## Crate Structure
//!
//! - [`catalog`] - Chain and mission profile registry
//! - [`ledger`] - Inventory ledger
//! - [`resolver`] - Prerequisite ordering
//! - [`analyzer`] - Bottleneck classification
//! - [`scheduler`] - Day-stepped simulation loop
//! - [`optimizer`] - Heuristic plan improvement
//! - [`forecast`] - Linear availability projection
//! - [`data`] - RON catalog documents
//! - [`math`] - Fixed-point quantities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod analyzer;
pub mod catalog;
pub mod data;
pub mod error;
pub mod forecast;
pub mod instance;
pub mod ledger;
pub mod math;
pub mod optimizer;
pub mod plan;
pub mod resolver;
pub mod scheduler;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::analyzer::{analyze, AnalyzerConfig, Bottleneck, BottleneckKind, PowerTable};
    pub use crate::catalog::{Catalog, Chain, ChainId, MissionId, MissionProfile, ResourceId, RiskLevel};
    pub use crate::data::CatalogData;
    pub use crate::error::{ConfigurationError, EngineError, Result};
    pub use crate::forecast::{forecast, ForecastPoint, Forecaster};
    pub use crate::instance::{ActiveMission, ActiveProduction, ActiveSet};
    pub use crate::ledger::{InventoryLedger, LedgerSnapshot, Shortfall};
    pub use crate::math::{Day, Fixed, Quantity};
    pub use crate::optimizer::{optimize, FlowOptimizer, OptimizerConfig};
    pub use crate::plan::{DevelopmentPhase, ProductionRequest};
    pub use crate::resolver::{resolve, DependencyResolver};
    pub use crate::scheduler::{simulate, DayEvent, Scheduler, SimulationConfig, SimulationResult};
}
