//! Heuristic plan improvement.
//!
//! The optimizer only ever adds requests or moves start days later. It never
//! removes anything from the input plan and makes no optimality claim: each
//! pass targets one local bottleneck pattern.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, ChainId, MissionId, ResourceId};
use crate::error::Result;
use crate::ledger::InventoryLedger;
use crate::math::{Day, Quantity};
use crate::plan::{DevelopmentPhase, PhaseBook, ProductionRequest};
use crate::resolver::DependencyResolver;
use crate::scheduler::DEFAULT_FUEL_RESOURCE;

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerConfig {
    /// Minimum days between launches of the same mission profile.
    pub mission_spacing_days: Day,
    /// Resource counted as mission fuel when balancing the plan.
    pub fuel_resource: ResourceId,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            mission_spacing_days: Self::DEFAULT_MISSION_SPACING_DAYS,
            fuel_resource: ResourceId::from(DEFAULT_FUEL_RESOURCE),
        }
    }
}

impl OptimizerConfig {
    /// Default spacing between same-profile missions.
    pub const DEFAULT_MISSION_SPACING_DAYS: Day = 1;

    /// Set the mission spacing.
    #[must_use]
    pub fn with_mission_spacing(mut self, days: Day) -> Self {
        self.mission_spacing_days = days;
        self
    }

    /// Set the fuel resource.
    #[must_use]
    pub fn with_fuel_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.fuel_resource = resource.into();
        self
    }
}

/// Optimize `phases` with `config`.
///
/// # Errors
///
/// Returns a configuration error if the plan fails resolution.
pub fn optimize(
    catalog: &Catalog,
    phases: &[DevelopmentPhase],
    config: &OptimizerConfig,
) -> Result<Vec<DevelopmentPhase>> {
    FlowOptimizer::new(catalog, config).optimize(phases)
}

/// Net projected flow per resource across a whole plan.
///
/// Outputs and mission yields count positive; inputs and mission fuel count
/// negative. Resources that net to zero are omitted.
#[must_use]
pub fn plan_balance(
    catalog: &Catalog,
    phases: &[DevelopmentPhase],
    fuel_resource: &ResourceId,
) -> BTreeMap<ResourceId, Quantity> {
    let mut balance: BTreeMap<ResourceId, Quantity> = BTreeMap::new();
    for phase in phases {
        for request in &phase.productions {
            let Some(chain) = catalog.chain(request.chain.as_str()) else {
                continue;
            };
            for (resource, &per_unit) in &chain.outputs {
                *balance.entry(resource.clone()).or_default() += per_unit.scaled(request.quantity);
            }
            for (resource, &per_unit) in &chain.inputs {
                *balance.entry(resource.clone()).or_default() -= per_unit.scaled(request.quantity);
            }
        }
        for mission in &phase.missions {
            let Some(profile) = catalog.mission(mission.as_str()) else {
                continue;
            };
            for (resource, &amount) in &profile.yields {
                *balance.entry(resource.clone()).or_default() += amount;
            }
            if profile.fuel_cost > Quantity::ZERO {
                *balance.entry(fuel_resource.clone()).or_default() -= profile.fuel_cost;
            }
        }
    }
    balance.retain(|_, net| !net.is_zero());
    balance
}

/// Heuristic plan improver.
///
/// Shortages are found with a plan-wide net balance rather than by running
/// [`BottleneckAnalyzer`](crate::analyzer::BottleneckAnalyzer) over simulated
/// days. A resource the plan consumes faster than it produces and stocks is a
/// deficit here, which is the whole-plan form of the analyzer's input
/// shortfall. Power and mission-capacity findings have no request that would
/// fix them and are left to the analyzer.
#[derive(Debug, Clone, Copy)]
pub struct FlowOptimizer<'a> {
    catalog: &'a Catalog,
    config: &'a OptimizerConfig,
    inventory: Option<&'a InventoryLedger>,
}

impl<'a> FlowOptimizer<'a> {
    /// Create an optimizer that balances plan flows only.
    #[must_use]
    pub fn new(catalog: &'a Catalog, config: &'a OptimizerConfig) -> Self {
        Self {
            catalog,
            config,
            inventory: None,
        }
    }

    /// Count `ledger` as supply when looking for deficits.
    #[must_use]
    pub fn with_inventory(mut self, ledger: &'a InventoryLedger) -> Self {
        self.inventory = Some(ledger);
        self
    }

    /// Resolve, fill deficits, and space missions.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the plan fails resolution.
    pub fn optimize(&self, phases: &[DevelopmentPhase]) -> Result<Vec<DevelopmentPhase>> {
        let resolver = DependencyResolver::new(self.catalog);
        let resolved = resolver.resolve(phases)?;

        let supplemented = self.fill_deficits(&resolved);
        let added = supplemented.len();
        let resolved = if supplemented.is_empty() {
            resolved
        } else {
            let mut book = PhaseBook::from_phases(&resolved);
            let day = book.earliest_day().unwrap_or(0);
            for request in supplemented {
                book.add_production(day, request);
            }
            resolver.resolve(&book.into_phases())?
        };

        let optimized = self.space_missions(&resolved);
        info!(
            phases = optimized.len(),
            added_requests = added,
            "Plan optimized"
        );
        Ok(optimized)
    }

    /// Remaining net deficits, counting the inventory if one was supplied.
    #[must_use]
    pub fn deficits(&self, phases: &[DevelopmentPhase]) -> BTreeMap<ResourceId, Quantity> {
        let mut balance = plan_balance(self.catalog, phases, &self.config.fuel_resource);
        if let Some(ledger) = self.inventory {
            for (resource, net) in &mut balance {
                *net += ledger.get(resource.as_str());
            }
        }
        balance.retain(|_, net| net.is_negative());
        balance
    }

    /// One producer request per deficit resource, sized to cover it.
    fn fill_deficits(&self, phases: &[DevelopmentPhase]) -> Vec<ProductionRequest> {
        let mut planned: BTreeSet<ChainId> = phases
            .iter()
            .flat_map(|p| p.productions.iter().map(|r| r.chain.clone()))
            .collect();
        let mut added = Vec::new();

        for (resource, net) in self.deficits(phases) {
            let deficit = -net;
            let producer = self
                .catalog
                .producers_of(resource.as_str())
                .iter()
                .filter_map(|id| self.catalog.chain(id.as_str()))
                .find(|chain| chain.prerequisites.iter().all(|p| planned.contains(p)));

            let Some(chain) = producer else {
                warn!(resource = %resource, deficit = %deficit, "No satisfiable producer for deficit");
                continue;
            };

            let units = deficit.units_to_cover(chain.output(resource.as_str()));
            if units == 0 {
                continue;
            }
            debug!(resource = %resource, chain = %chain.id, units, "Adding producer for deficit");
            planned.insert(chain.id.clone());
            added.push(ProductionRequest::new(chain.id.clone(), units));
        }
        added
    }

    /// Push repeated launches of the same profile apart.
    ///
    /// The k-th launch of a profile starts no earlier than the first launch
    /// plus k spacings. Start days only move later.
    fn space_missions(&self, phases: &[DevelopmentPhase]) -> Vec<DevelopmentPhase> {
        let book = PhaseBook::from_phases(phases);
        let spacing = self.config.mission_spacing_days;
        let mut seen: BTreeMap<MissionId, (Day, Day)> = BTreeMap::new();

        let missions = book
            .missions()
            .into_iter()
            .map(|(start, mission)| {
                let (first, count) = seen.entry(mission.clone()).or_insert((start, 0));
                let slot = first.saturating_add(spacing.saturating_mul(*count));
                *count += 1;
                let day = start.max(slot);
                if day != start {
                    debug!(mission = %mission, from = start, to = day, "Re-spacing mission");
                }
                (day, mission)
            })
            .collect();

        PhaseBook::rebuild(book.productions(), missions).into_phases()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Chain, MissionProfile};

    fn catalog() -> Catalog {
        Catalog::new(
            [
                Chain::new("drill", "Drill", 1).with_output("ore", 20),
                Chain::new("deep-drill", "Deep Drill", 2)
                    .with_output("ore", 50)
                    .with_prerequisites(["lab"]),
                Chain::new("lab", "Lab", 3),
                Chain::new("smelter", "Smelter", 2)
                    .with_input("ore", 30)
                    .with_output("metal", 10),
                Chain::new("foundry", "Foundry", 2)
                    .with_input("metal", 5)
                    .with_input("sand", 1)
                    .with_output("parts", 1),
            ],
            [MissionProfile::new("haul", "Haul", 4)
                .with_yield("ice", 10)
                .with_fuel_cost(2)],
        )
        .unwrap()
    }

    fn requests_for<'p>(phases: &'p [DevelopmentPhase], chain: &str) -> Vec<(Day, &'p ProductionRequest)> {
        phases
            .iter()
            .flat_map(|p| p.productions.iter().map(move |r| (p.start_day, r)))
            .filter(|(_, r)| r.chain.as_str() == chain)
            .collect()
    }

    #[test]
    fn test_plan_balance() {
        let catalog = catalog();
        let phases = vec![DevelopmentPhase::new(0)
            .with_production("smelter", 2)
            .with_mission("haul")];
        let balance = plan_balance(&catalog, &phases, &ResourceId::from("fuel"));

        assert_eq!(balance.get("ore"), Some(&Quantity::new(-60)));
        assert_eq!(balance.get("metal"), Some(&Quantity::new(20)));
        assert_eq!(balance.get("ice"), Some(&Quantity::new(10)));
        assert_eq!(balance.get("fuel"), Some(&Quantity::new(-2)));
    }

    #[test]
    fn test_deficit_gets_sized_producer_in_earliest_phase() {
        let catalog = catalog();
        let config = OptimizerConfig::default();
        let phases = vec![
            DevelopmentPhase::new(2).with_production("smelter", 2),
            DevelopmentPhase::new(5).with_production("drill", 1),
        ];

        let optimized = optimize(&catalog, &phases, &config).unwrap();
        let drills = requests_for(&optimized, "drill");
        // 60 ore needed, 20 planned: 40 more from the lowest-id producer.
        assert_eq!(drills.len(), 2);
        assert!(drills.contains(&(2, &ProductionRequest::new("drill", 2))));
        assert!(drills.contains(&(5, &ProductionRequest::new("drill", 1))));
    }

    #[test]
    fn test_producer_with_unmet_prerequisite_is_skipped() {
        let catalog = catalog();
        let config = OptimizerConfig::default();
        let phases = vec![DevelopmentPhase::new(0).with_production("smelter", 1)];

        let optimized = optimize(&catalog, &phases, &config).unwrap();
        assert!(requests_for(&optimized, "deep-drill").is_empty());
        assert_eq!(requests_for(&optimized, "drill")[0].1.quantity, 2);
    }

    #[test]
    fn test_resource_without_producer_is_left_alone() {
        let catalog = catalog();
        let config = OptimizerConfig::default();
        let phases = vec![DevelopmentPhase::new(0).with_production("foundry", 1)];

        let optimized = optimize(&catalog, &phases, &config).unwrap();
        // Metal gets a smelter; sand has no producer.
        assert_eq!(requests_for(&optimized, "smelter").len(), 1);
        assert_eq!(requests_for(&optimized, "foundry").len(), 1);
    }

    #[test]
    fn test_inventory_covers_deficit() {
        let catalog = catalog();
        let config = OptimizerConfig::default();
        let ledger = InventoryLedger::from_snapshot([("ore", Quantity::new(60))]);
        let phases = vec![DevelopmentPhase::new(0).with_production("smelter", 2)];

        let optimizer = FlowOptimizer::new(&catalog, &config).with_inventory(&ledger);
        assert!(optimizer.deficits(&phases).is_empty());
        let optimized = optimizer.optimize(&phases).unwrap();
        assert!(requests_for(&optimized, "drill").is_empty());
    }

    #[test]
    fn test_same_profile_missions_are_spaced() {
        let catalog = catalog();
        let config = OptimizerConfig::default().with_mission_spacing(3);
        let ledger = InventoryLedger::from_snapshot([("fuel", Quantity::new(100))]);
        let phases = vec![
            DevelopmentPhase::new(0).with_mission("haul").with_mission("haul"),
            DevelopmentPhase::new(1).with_mission("haul"),
            DevelopmentPhase::new(20).with_mission("haul"),
        ];

        let optimized = FlowOptimizer::new(&catalog, &config)
            .with_inventory(&ledger)
            .optimize(&phases)
            .unwrap();
        let days: Vec<Day> = optimized
            .iter()
            .flat_map(|p| p.missions.iter().map(move |_| p.start_day))
            .collect();
        assert_eq!(days, vec![0, 3, 6, 20]);
    }

    #[test]
    fn test_output_keeps_every_input_request() {
        let catalog = catalog();
        let config = OptimizerConfig::default();
        let phases = vec![
            DevelopmentPhase::new(0).with_production("lab", 1),
            DevelopmentPhase::new(0).with_production("deep-drill", 1),
            DevelopmentPhase::new(4).with_production("smelter", 3),
        ];

        let optimized = optimize(&catalog, &phases, &config).unwrap();
        for phase in &phases {
            for request in &phase.productions {
                assert!(requests_for(&optimized, request.chain.as_str())
                    .iter()
                    .any(|(day, r)| *r == request && *day >= phase.start_day));
            }
        }
    }
}
