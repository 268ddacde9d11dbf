//! Day-stepped simulation scheduler.
//!
//! Each simulated day runs three phases in a fixed order:
//!
//! 1. **Instantiate** - requests whose phase starts today become instances
//! 2. **Complete** - instances due today check and apply their inputs/outputs
//! 3. **Analyze** - the bottleneck analyzer scans the resulting state
//!
//! The order is part of the contract. A run owns its ledger and active sets
//! exclusively; the catalog is shared read-only, so independent runs over
//! the same catalog may execute concurrently.

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analyzer::{dedup_bottlenecks, AnalyzerConfig, Bottleneck, BottleneckAnalyzer, BottleneckKind};
use crate::catalog::{Catalog, ChainId, ResourceId, ResourceMap};
use crate::error::{EngineError, Result};
use crate::instance::{ActiveMission, ActiveProduction, ActiveSet, MissionInstance, ProductionInstance};
use crate::ledger::{InventoryLedger, LedgerSnapshot, Shortfall};
use crate::math::{Day, Quantity};
use crate::plan::DevelopmentPhase;
use crate::resolver::DependencyResolver;

/// Default resource debited for mission fuel.
pub const DEFAULT_FUEL_RESOURCE: &str = "fuel";

fn default_fuel_resource() -> ResourceId {
    ResourceId::from(DEFAULT_FUEL_RESOURCE)
}

/// Run-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Analyzer thresholds and external power figure.
    pub analyzer: AnalyzerConfig,
    /// Resource debited for mission fuel.
    pub fuel_resource: ResourceId,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            analyzer: AnalyzerConfig::default(),
            fuel_resource: default_fuel_resource(),
        }
    }
}

impl SimulationConfig {
    /// Replace the analyzer settings.
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: AnalyzerConfig) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Set the externally supplied available power.
    #[must_use]
    pub fn with_available_power(mut self, kw: impl Into<Quantity>) -> Self {
        self.analyzer.available_power_kw = kw.into();
        self
    }

    /// Set the concurrent mission ceiling.
    #[must_use]
    pub fn with_mission_ceiling(mut self, ceiling: usize) -> Self {
        self.analyzer.mission_ceiling = ceiling;
        self
    }

    /// Limit the crew available to missions.
    #[must_use]
    pub fn with_crew_pool(mut self, crew: u32) -> Self {
        self.analyzer.crew_pool = Some(crew);
        self
    }

    /// Set the resource debited for mission fuel.
    #[must_use]
    pub fn with_fuel_resource(mut self, resource: impl Into<ResourceId>) -> Self {
        self.fuel_resource = resource.into();
        self
    }
}

/// An instance abandoned on its completion day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abandonment {
    /// Chain or mission profile id.
    pub subject: String,
    /// Day the instance started.
    pub start_day: Day,
    /// The first input found short.
    pub shortfall: Shortfall,
}

/// Everything that happened on one day.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayEvent {
    /// The day.
    pub day: Day,
    /// Productions completed today, in instantiation order.
    pub completed_productions: Vec<ProductionInstance>,
    /// Missions completed today, in instantiation order.
    pub completed_missions: Vec<MissionInstance>,
    /// Instances abandoned today.
    pub abandoned: Vec<Abandonment>,
    /// Net ledger change per resource, as actually applied. Resources with no
    /// net change are omitted.
    pub deltas: BTreeMap<ResourceId, Quantity>,
    /// Bottlenecks recorded today.
    pub bottlenecks: Vec<Bottleneck>,
}

impl DayEvent {
    /// Create an empty event for `day`.
    #[must_use]
    pub fn new(day: Day) -> Self {
        Self {
            day,
            ..Self::default()
        }
    }

    /// Check if the event has anything worth logging.
    ///
    /// Abandonments always carry a bottleneck, so they are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.completed_productions.is_empty()
            && self.completed_missions.is_empty()
            && self.bottlenecks.is_empty()
    }

    fn record_debit(&mut self, bundle: &ResourceMap) {
        for (resource, &quantity) in bundle {
            *self.deltas.entry(resource.clone()).or_default() -= quantity;
        }
    }

    fn record_credit(&mut self, bundle: &ResourceMap) {
        for (resource, &quantity) in bundle {
            *self.deltas.entry(resource.clone()).or_default() += quantity;
        }
    }

    fn abandon(&mut self, subject: &str, start_day: Day, shortfall: Shortfall) {
        self.bottlenecks.push(
            Bottleneck::new(BottleneckKind::InputShortfall, self.day)
                .with_resource(shortfall.resource.clone())
                .with_subject(subject),
        );
        self.abandoned.push(Abandonment {
            subject: subject.to_string(),
            start_day,
            shortfall,
        });
    }
}

/// Work still outstanding when the horizon is reached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingWork {
    /// Instances still running.
    pub active: ActiveSet,
    /// Phases whose start day lies beyond the horizon.
    pub unstarted: Vec<DevelopmentPhase>,
}

impl PendingWork {
    /// Check if nothing is outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.unstarted.is_empty()
    }
}

/// Outcome of a simulation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResult {
    /// One entry per day with at least one completion or bottleneck.
    pub events: Vec<DayEvent>,
    /// Ledger contents after the last simulated day.
    pub final_ledger: LedgerSnapshot,
    /// Distinct bottlenecks, each at the first day it was observed.
    pub bottlenecks: Vec<Bottleneck>,
    /// Latest completion day of any planned or seeded instance.
    pub completion_day: Day,
    /// Work outstanding at the horizon.
    pub pending: PendingWork,
}

impl SimulationResult {
    /// Rebuild the final ledger from `initial` and the event log alone.
    ///
    /// Resources at zero are omitted.
    #[must_use]
    pub fn reconcile(&self, initial: &LedgerSnapshot) -> LedgerSnapshot {
        let mut totals = initial.clone();
        for event in &self.events {
            for (resource, &delta) in &event.deltas {
                *totals.entry(resource.clone()).or_default() += delta;
            }
        }
        totals.retain(|_, quantity| !quantity.is_zero());
        totals
    }

    /// Check that the event log accounts for every ledger change.
    #[must_use]
    pub fn reconciles_with(&self, initial: &LedgerSnapshot) -> bool {
        let mut final_ledger = self.final_ledger.clone();
        final_ledger.retain(|_, quantity| !quantity.is_zero());
        self.reconcile(initial) == final_ledger
    }

    /// Every instance abandoned during the run, in order.
    pub fn abandoned(&self) -> impl Iterator<Item = &Abandonment> {
        self.events.iter().flat_map(|event| event.abandoned.iter())
    }

    /// Serialize the result to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| EngineError::InvalidState(format!("Failed to serialize result: {e}")))
    }

    /// Deserialize a result from bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if deserialization fails.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| EngineError::InvalidState(format!("Failed to deserialize result: {e}")))
    }
}

/// Simulate `phases` over days `0..=horizon` with default settings.
///
/// The caller's ledger is not modified; the run works on its own copy.
///
/// # Errors
///
/// Returns a configuration error if the plan fails resolution. No day is
/// simulated in that case.
pub fn simulate(
    catalog: &Catalog,
    ledger: &InventoryLedger,
    phases: &[DevelopmentPhase],
    horizon: Day,
) -> Result<SimulationResult> {
    let mut scheduler = Scheduler::new(catalog, ledger.clone());
    scheduler.load_plan(phases)?;
    Ok(scheduler.run(horizon))
}

/// The day-stepped event loop for one run.
#[derive(Debug, Clone)]
pub struct Scheduler<'a> {
    catalog: &'a Catalog,
    config: SimulationConfig,
    ledger: InventoryLedger,
    active: ActiveSet,
    /// Resolved phases not yet instantiated, keyed by start day.
    queued: BTreeMap<Day, DevelopmentPhase>,
    /// Chains seeded as running, with their completion day.
    established: BTreeMap<ChainId, Day>,
    /// Power capacity commissioned by completed productions.
    commissioned_kw: Quantity,
    day: Day,
    completion_day: Day,
    events: Vec<DayEvent>,
}

impl<'a> Scheduler<'a> {
    /// Create a scheduler owning `ledger`, with default settings.
    #[must_use]
    pub fn new(catalog: &'a Catalog, ledger: InventoryLedger) -> Self {
        Self {
            catalog,
            config: SimulationConfig::default(),
            ledger,
            active: ActiveSet::new(),
            queued: BTreeMap::new(),
            established: BTreeMap::new(),
            commissioned_kw: Quantity::ZERO,
            day: 0,
            completion_day: 0,
            events: Vec::new(),
        }
    }

    /// Replace the run settings.
    #[must_use]
    pub fn with_config(mut self, config: SimulationConfig) -> Self {
        self.config = config;
        self
    }

    /// Place a production that was already running before day 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidReference`] if the chain is unknown.
    pub fn seed_production(&mut self, record: &ActiveProduction) -> Result<()> {
        let chain = self
            .catalog
            .chain(record.chain.as_str())
            .ok_or_else(|| EngineError::InvalidReference {
                kind: "chain",
                id: record.chain.to_string(),
            })?;
        let instance = ProductionInstance::resumed(chain, record.completion_day, record.multiplier);
        debug!(chain = %instance.chain, completion_day = instance.completion_day, "Seeded production");

        let entry = self
            .established
            .entry(chain.id.clone())
            .or_insert(instance.completion_day);
        *entry = (*entry).max(instance.completion_day);
        self.completion_day = self.completion_day.max(instance.completion_day);
        self.active.productions.push(instance);
        Ok(())
    }

    /// Place a mission that was already underway before day 0.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidReference`] if the mission is unknown.
    pub fn seed_mission(&mut self, record: &ActiveMission) -> Result<()> {
        let profile = self
            .catalog
            .mission(record.mission.as_str())
            .ok_or_else(|| EngineError::InvalidReference {
                kind: "mission",
                id: record.mission.to_string(),
            })?;
        let instance = MissionInstance::resumed(profile, record.completion_day);
        debug!(mission = %instance.mission, completion_day = instance.completion_day, "Seeded mission");

        self.completion_day = self.completion_day.max(instance.completion_day);
        self.active.missions.push(instance);
        Ok(())
    }

    /// Resolve `phases` and queue them for instantiation.
    ///
    /// Seeded productions count as established prerequisites.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if resolution fails, or
    /// [`EngineError::InvalidState`] if the run has already started.
    pub fn load_plan(&mut self, phases: &[DevelopmentPhase]) -> Result<()> {
        if self.day > 0 {
            return Err(EngineError::InvalidState(format!(
                "plan loaded after day {} was simulated",
                self.day - 1
            )));
        }

        let resolver = self
            .established
            .iter()
            .fold(DependencyResolver::new(self.catalog), |resolver, (chain, &day)| {
                resolver.with_established(chain.clone(), day)
            });
        let resolved = resolver.resolve(phases)?;

        for phase in resolved {
            for request in &phase.productions {
                if let Some(chain) = self.catalog.chain(request.chain.as_str()) {
                    let done = phase.start_day.saturating_add(chain.duration_days);
                    self.completion_day = self.completion_day.max(done);
                }
            }
            for mission in &phase.missions {
                if let Some(profile) = self.catalog.mission(mission.as_str()) {
                    let done = phase.start_day.saturating_add(profile.duration_days);
                    self.completion_day = self.completion_day.max(done);
                }
            }

            let slot = self
                .queued
                .entry(phase.start_day)
                .or_insert_with(|| DevelopmentPhase::new(phase.start_day));
            slot.productions.extend(phase.productions);
            slot.missions.extend(phase.missions);
        }
        Ok(())
    }

    /// The next day to be simulated.
    #[must_use]
    pub fn day(&self) -> Day {
        self.day
    }

    /// Current ledger.
    #[must_use]
    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    /// Currently running instances.
    #[must_use]
    pub fn active(&self) -> &ActiveSet {
        &self.active
    }

    /// Events logged so far.
    #[must_use]
    pub fn events(&self) -> &[DayEvent] {
        &self.events
    }

    /// Hash of the mutable run state.
    ///
    /// Two runs in identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.day.hash(&mut hasher);
        self.ledger.hash(&mut hasher);
        self.active.hash(&mut hasher);
        self.commissioned_kw.hash(&mut hasher);
        self.queued.len().hash(&mut hasher);
        self.events.len().hash(&mut hasher);
        hasher.finish()
    }

    /// Available power: the external figure plus commissioned capacity.
    #[must_use]
    pub fn power_supply(&self) -> Quantity {
        self.config.analyzer.available_power_kw.saturating_add(self.commissioned_kw)
    }

    /// Phase 1: turn today's queued requests into active instances.
    ///
    /// Returns the number of instances created.
    pub fn instantiate_due(&mut self, day: Day) -> usize {
        let Some(phase) = self.queued.remove(&day) else {
            return 0;
        };

        let mut created = 0;
        for request in &phase.productions {
            // Resolution guarantees the chain exists.
            let Some(chain) = self.catalog.chain(request.chain.as_str()) else {
                continue;
            };
            let instance = ProductionInstance::new(chain, day, request.quantity);
            debug!(day, chain = %instance.chain, completion_day = instance.completion_day, "Production started");
            self.active.productions.push(instance);
            created += 1;
        }
        for mission in &phase.missions {
            let Some(profile) = self.catalog.mission(mission.as_str()) else {
                continue;
            };
            let instance = MissionInstance::new(profile, day);
            debug!(day, mission = %instance.mission, completion_day = instance.completion_day, "Mission launched");
            self.active.missions.push(instance);
            created += 1;
        }
        created
    }

    /// Phase 2: complete or abandon every instance due on `event.day`.
    ///
    /// Productions are processed before missions, each in instantiation
    /// order. Abandoned instances are never retried.
    pub fn process_completions(&mut self, event: &mut DayEvent) {
        let day = event.day;
        let (productions, missions) = self.active.take_due(day);

        for instance in productions {
            match self.ledger.debit_all(&instance.consumes) {
                Ok(()) => {
                    let credited = self.ledger.credit_all(&instance.produces);
                    if credited != instance.produces {
                        warn!(day, chain = %instance.chain, "Stock at capacity, excess output discarded");
                    }
                    event.record_debit(&instance.consumes);
                    event.record_credit(&credited);
                    if instance.power_output_kw > Quantity::ZERO {
                        self.commissioned_kw = self.commissioned_kw.saturating_add(instance.power_output_kw);
                        debug!(day, chain = %instance.chain, kw = %instance.power_output_kw, "Power commissioned");
                    }
                    debug!(day, chain = %instance.chain, multiplier = instance.multiplier, "Production completed");
                    event.completed_productions.push(instance);
                }
                Err(shortfall) => {
                    warn!(day, chain = %instance.chain, %shortfall, "Production abandoned");
                    event.abandon(instance.chain.as_str(), instance.start_day, shortfall);
                }
            }
        }

        for instance in missions {
            let required = instance.requirements(&self.config.fuel_resource);
            match self.ledger.debit_all(&required) {
                Ok(()) => {
                    let credited = self.ledger.credit_all(&instance.yields);
                    if credited != instance.yields {
                        warn!(day, mission = %instance.mission, "Stock at capacity, excess yield discarded");
                    }
                    event.record_debit(&required);
                    event.record_credit(&credited);
                    debug!(day, mission = %instance.mission, "Mission completed");
                    event.completed_missions.push(instance);
                }
                Err(shortfall) => {
                    warn!(day, mission = %instance.mission, %shortfall, "Mission abandoned");
                    event.abandon(instance.mission.as_str(), instance.start_day, shortfall);
                }
            }
        }

        event.deltas.retain(|_, delta| !delta.is_zero());

        #[cfg(feature = "debug-validation")]
        debug_assert!(
            self.ledger.iter().all(|(_, quantity)| !quantity.is_negative()),
            "ledger went negative on day {day}"
        );
    }

    /// Phase 3: scan the current state for risks.
    #[must_use]
    pub fn scan_bottlenecks(&self, day: Day) -> Vec<Bottleneck> {
        BottleneckAnalyzer::new(self.catalog, &self.config.analyzer).analyze(
            &self.ledger,
            &self.active,
            self.power_supply(),
            day,
        )
    }

    /// Simulate one day and advance.
    ///
    /// Returns the day's event if it was logged.
    pub fn step(&mut self) -> Option<&DayEvent> {
        let day = self.day;
        let mut event = DayEvent::new(day);

        self.instantiate_due(day);
        self.process_completions(&mut event);
        let findings = self.scan_bottlenecks(day);
        event.bottlenecks.extend(findings);

        self.day = self.day.saturating_add(1);
        if event.is_empty() {
            None
        } else {
            self.events.push(event);
            self.events.last()
        }
    }

    /// Simulate through `horizon` (inclusive) and produce the result.
    #[must_use]
    pub fn run(mut self, horizon: Day) -> SimulationResult {
        while self.day <= horizon {
            let before = self.day;
            self.step();
            if self.day == before {
                break;
            }
        }
        self.finish()
    }

    /// Produce the result from the current state without simulating further.
    #[must_use]
    pub fn finish(self) -> SimulationResult {
        let bottlenecks = dedup_bottlenecks(self.events.iter().flat_map(|e| e.bottlenecks.iter()));
        info!(
            days = self.day,
            events = self.events.len(),
            bottlenecks = bottlenecks.len(),
            completion_day = self.completion_day,
            "Simulation finished"
        );

        SimulationResult {
            events: self.events,
            final_ledger: self.ledger.snapshot(),
            bottlenecks,
            completion_day: self.completion_day,
            pending: PendingWork {
                active: self.active,
                unstarted: self.queued.into_values().collect(),
            },
        }
    }
}
