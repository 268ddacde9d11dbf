//! Bottleneck analysis: pure risk classification.
//!
//! The analyzer never mutates anything. It inspects the ledger, the catalog
//! and the active instances and reports supply, power, and capacity risks as
//! [`Bottleneck`] values. Findings are informational, never failures.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::catalog::{Catalog, ResourceId};
use crate::instance::ActiveSet;
use crate::ledger::InventoryLedger;
use crate::math::{Day, Quantity};

/// Kind of risk flagged by the analyzer or the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BottleneckKind {
    /// Stock at or below the critical share of one unit's requirement.
    CriticalShortage,
    /// Stock at or below the low share of one unit's requirement.
    LowAvailability,
    /// Power demand exceeds supply beyond the buffer.
    PowerDeficit,
    /// Too many concurrent missions (or too much crew committed).
    MissionCapacityExceeded,
    /// An instance reached its completion day without its inputs and was abandoned.
    InputShortfall,
}

impl fmt::Display for BottleneckKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::CriticalShortage => "critical-shortage",
            Self::LowAvailability => "low-availability",
            Self::PowerDeficit => "power-deficit",
            Self::MissionCapacityExceeded => "mission-capacity-exceeded",
            Self::InputShortfall => "input-shortfall",
        };
        f.write_str(name)
    }
}

/// A flagged supply, power, or capacity risk.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bottleneck {
    /// What kind of risk.
    pub kind: BottleneckKind,
    /// Resource concerned, if any.
    pub resource: Option<ResourceId>,
    /// Chain (or mission profile, for abandoned missions) concerned, if any.
    pub subject: Option<String>,
    /// Day the risk was observed.
    pub day: Day,
}

impl Bottleneck {
    /// Create a finding with no resource or subject.
    #[must_use]
    pub fn new(kind: BottleneckKind, day: Day) -> Self {
        Self {
            kind,
            resource: None,
            subject: None,
            day,
        }
    }

    /// Attach the resource concerned.
    #[must_use]
    pub fn with_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    /// Attach the chain or mission concerned.
    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Identity used for deduplication (everything but the day).
    #[must_use]
    pub fn key(&self) -> (BottleneckKind, Option<&ResourceId>, Option<&str>) {
        (self.kind, self.resource.as_ref(), self.subject.as_deref())
    }
}

impl fmt::Display for Bottleneck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "day {}: {}", self.day, self.kind)?;
        if let Some(resource) = &self.resource {
            write!(f, " [{resource}]")?;
        }
        if let Some(subject) = &self.subject {
            write!(f, " ({subject})")?;
        }
        Ok(())
    }
}

/// Keep the first occurrence of each distinct finding, in input order.
#[must_use]
pub fn dedup_bottlenecks<'a, I>(findings: I) -> Vec<Bottleneck>
where
    I: IntoIterator<Item = &'a Bottleneck>,
{
    let mut seen = BTreeSet::new();
    let mut unique = Vec::new();
    for finding in findings {
        let (kind, resource, subject) = finding.key();
        if seen.insert((kind, resource.cloned(), subject.map(str::to_string))) {
            unique.push(finding.clone());
        }
    }
    unique
}

/// Unit type -> kW capacity table supplied by the settlement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerTable {
    capacity_kw: BTreeMap<String, Quantity>,
}

impl PowerTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit type.
    #[must_use]
    pub fn with_unit(mut self, unit_type: impl Into<String>, kw: impl Into<Quantity>) -> Self {
        self.capacity_kw.insert(unit_type.into(), kw.into());
        self
    }

    /// Capacity of one unit of `unit_type`, if known.
    #[must_use]
    pub fn capacity_of(&self, unit_type: &str) -> Option<Quantity> {
        self.capacity_kw.get(unit_type).copied()
    }

    /// Total capacity of an installed-unit inventory.
    ///
    /// Unknown unit types contribute nothing.
    #[must_use]
    pub fn available_power(&self, installed: &BTreeMap<String, u32>) -> Quantity {
        installed
            .iter()
            .map(|(unit_type, &count)| match self.capacity_of(unit_type) {
                Some(kw) => kw.scaled(count),
                None => {
                    warn!(unit_type = %unit_type, "Unknown power unit type, counting as 0 kW");
                    Quantity::ZERO
                }
            })
            .sum()
    }
}

/// Thresholds and external figures used by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Externally supplied available power, in kW.
    pub available_power_kw: Quantity,
    /// Stock at or below this percent of one unit's need is critical.
    pub critical_percent: u32,
    /// Stock at or below this percent of one unit's need is low.
    pub low_percent: u32,
    /// Demand may exceed supply by this percent before a deficit is flagged.
    pub power_buffer_percent: u32,
    /// Maximum concurrently active missions.
    pub mission_ceiling: usize,
    /// Crew available for missions, if limited.
    pub crew_pool: Option<u32>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            available_power_kw: Quantity::ZERO,
            critical_percent: Self::DEFAULT_CRITICAL_PERCENT,
            low_percent: Self::DEFAULT_LOW_PERCENT,
            power_buffer_percent: Self::DEFAULT_POWER_BUFFER_PERCENT,
            mission_ceiling: Self::DEFAULT_MISSION_CEILING,
            crew_pool: None,
        }
    }
}

impl AnalyzerConfig {
    /// Default critical-shortage threshold.
    pub const DEFAULT_CRITICAL_PERCENT: u32 = 10;
    /// Default low-availability threshold.
    pub const DEFAULT_LOW_PERCENT: u32 = 50;
    /// Default power buffer.
    pub const DEFAULT_POWER_BUFFER_PERCENT: u32 = 20;
    /// Default mission concurrency ceiling.
    pub const DEFAULT_MISSION_CEILING: usize = 3;

    /// Set the available power.
    #[must_use]
    pub fn with_available_power(mut self, kw: impl Into<Quantity>) -> Self {
        self.available_power_kw = kw.into();
        self
    }

    /// Derive the available power from a power table and installed units.
    #[must_use]
    pub fn with_power_table(mut self, table: &PowerTable, installed: &BTreeMap<String, u32>) -> Self {
        self.available_power_kw = table.available_power(installed);
        self
    }

    /// Set the mission ceiling.
    #[must_use]
    pub fn with_mission_ceiling(mut self, ceiling: usize) -> Self {
        self.mission_ceiling = ceiling;
        self
    }

    /// Limit the crew available to missions.
    #[must_use]
    pub fn with_crew_pool(mut self, crew: u32) -> Self {
        self.crew_pool = Some(crew);
        self
    }
}

/// Classify the stock of one input against one unit's requirement.
///
/// Returns the more severe classification only.
#[must_use]
pub fn classify_stock(
    available: Quantity,
    required: Quantity,
    config: &AnalyzerConfig,
) -> Option<BottleneckKind> {
    if required <= Quantity::ZERO {
        return None;
    }
    if available.at_most_percent_of(required, config.critical_percent) {
        Some(BottleneckKind::CriticalShortage)
    } else if available.at_most_percent_of(required, config.low_percent) {
        Some(BottleneckKind::LowAvailability)
    } else {
        None
    }
}

/// Analyze with the default configuration.
#[must_use]
pub fn analyze(
    catalog: &Catalog,
    ledger: &InventoryLedger,
    active: &ActiveSet,
    day: Day,
) -> Vec<Bottleneck> {
    let config = AnalyzerConfig::default();
    BottleneckAnalyzer::new(catalog, &config).analyze(ledger, active, config.available_power_kw, day)
}

/// Risk classifier over a catalog with fixed thresholds.
#[derive(Debug, Clone, Copy)]
pub struct BottleneckAnalyzer<'a> {
    catalog: &'a Catalog,
    config: &'a AnalyzerConfig,
}

impl<'a> BottleneckAnalyzer<'a> {
    /// Create an analyzer.
    #[must_use]
    pub fn new(catalog: &'a Catalog, config: &'a AnalyzerConfig) -> Self {
        Self { catalog, config }
    }

    /// Run every check.
    ///
    /// `power_supply_kw` is the supply the power check compares against.
    #[must_use]
    pub fn analyze(
        &self,
        ledger: &InventoryLedger,
        active: &ActiveSet,
        power_supply_kw: Quantity,
        day: Day,
    ) -> Vec<Bottleneck> {
        let mut findings = self.resource_shortages(ledger, day);
        findings.extend(self.power_deficit(active, power_supply_kw, day));
        findings.extend(self.mission_capacity(active, day));
        for finding in &findings {
            trace!(%finding, "Bottleneck observed");
        }
        findings
    }

    /// Shortage findings for every catalog chain input.
    #[must_use]
    pub fn resource_shortages(&self, ledger: &InventoryLedger, day: Day) -> Vec<Bottleneck> {
        let mut findings = Vec::new();
        for chain in self.catalog.chains() {
            for (resource, &required) in &chain.inputs {
                let available = ledger.get(resource.as_str());
                if let Some(kind) = classify_stock(available, required, self.config) {
                    findings.push(
                        Bottleneck::new(kind, day)
                            .with_resource(resource.clone())
                            .with_subject(chain.id.as_str()),
                    );
                }
            }
        }
        findings
    }

    /// Power-deficit finding, if demand exceeds supply beyond the buffer.
    #[must_use]
    pub fn power_deficit(&self, active: &ActiveSet, supply_kw: Quantity, day: Day) -> Option<Bottleneck> {
        let demand = active.power_demand();
        let tolerated = self.config.power_buffer_percent.saturating_add(100);
        if demand > Quantity::ZERO && !demand.at_most_percent_of(supply_kw, tolerated) {
            Some(Bottleneck::new(BottleneckKind::PowerDeficit, day))
        } else {
            None
        }
    }

    /// Mission-capacity finding, if too many missions or too much crew is committed.
    #[must_use]
    pub fn mission_capacity(&self, active: &ActiveSet, day: Day) -> Option<Bottleneck> {
        let too_many = active.missions.len() > self.config.mission_ceiling;
        let crew_short = self
            .config
            .crew_pool
            .is_some_and(|pool| active.crew_committed() > pool);
        (too_many || crew_short).then(|| Bottleneck::new(BottleneckKind::MissionCapacityExceeded, day))
    }
}
