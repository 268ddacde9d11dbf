//! Running production and mission instances.
//!
//! Instances are created when their phase's start day is reached (or seeded
//! from records supplied by the settlement before day 0) and leave the
//! active set on completion or abandonment.

use serde::{Deserialize, Serialize};

use crate::catalog::{Chain, ChainId, MissionId, MissionProfile, ResourceId, ResourceMap};
use crate::math::{Day, Quantity};

fn scale(bundle: &ResourceMap, multiplier: u32) -> ResourceMap {
    bundle
        .iter()
        .map(|(resource, quantity)| (resource.clone(), quantity.scaled(multiplier)))
        .collect()
}

/// A running instance of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionInstance {
    /// The chain being run.
    pub chain: ChainId,
    /// Day the instance started.
    pub start_day: Day,
    /// Day the instance completes (start + chain duration).
    pub completion_day: Day,
    /// Unit multiplier.
    pub multiplier: u32,
    /// Total inputs consumed on completion.
    pub consumes: ResourceMap,
    /// Total outputs produced on completion.
    pub produces: ResourceMap,
    /// Total power drawn while active, in kW.
    pub power_draw_kw: Quantity,
    /// Power capacity commissioned on completion, in kW.
    pub power_output_kw: Quantity,
}

impl ProductionInstance {
    /// Instantiate `multiplier` units of `chain` starting on `start_day`.
    #[must_use]
    pub fn new(chain: &Chain, start_day: Day, multiplier: u32) -> Self {
        Self {
            chain: chain.id.clone(),
            start_day,
            completion_day: start_day.saturating_add(chain.duration_days),
            multiplier,
            consumes: scale(&chain.inputs, multiplier),
            produces: scale(&chain.outputs, multiplier),
            power_draw_kw: chain.power_draw_kw.scaled(multiplier),
            power_output_kw: chain.power_output_kw.scaled(multiplier),
        }
    }

    /// Rebuild an instance already in progress before day 0.
    ///
    /// The start day is back-computed from the chain duration and clamps at
    /// day 0.
    #[must_use]
    pub fn resumed(chain: &Chain, completion_day: Day, multiplier: u32) -> Self {
        let mut instance = Self::new(chain, completion_day.saturating_sub(chain.duration_days), multiplier);
        instance.completion_day = completion_day;
        instance
    }

    /// Whether the instance completes on `day`.
    #[must_use]
    pub fn is_due(&self, day: Day) -> bool {
        self.completion_day == day
    }
}

/// A running expedition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MissionInstance {
    /// The mission profile.
    pub mission: MissionId,
    /// Day the mission launched.
    pub start_day: Day,
    /// Day the mission returns.
    pub completion_day: Day,
    /// Resources granted on completion.
    pub yields: ResourceMap,
    /// Fuel charged on completion.
    pub fuel_cost: Quantity,
    /// Crew tied up while active.
    pub crew: u32,
}

impl MissionInstance {
    /// Launch `profile` on `start_day`.
    #[must_use]
    pub fn new(profile: &MissionProfile, start_day: Day) -> Self {
        Self {
            mission: profile.id.clone(),
            start_day,
            completion_day: start_day.saturating_add(profile.duration_days),
            yields: profile.yields.clone(),
            fuel_cost: profile.fuel_cost,
            crew: profile.crew_required,
        }
    }

    /// Rebuild a mission already underway before day 0.
    #[must_use]
    pub fn resumed(profile: &MissionProfile, completion_day: Day) -> Self {
        let mut instance = Self::new(profile, completion_day.saturating_sub(profile.duration_days));
        instance.completion_day = completion_day;
        instance
    }

    /// Resources that must be on hand at completion.
    #[must_use]
    pub fn requirements(&self, fuel_resource: &ResourceId) -> ResourceMap {
        let mut required = ResourceMap::new();
        if self.fuel_cost > Quantity::ZERO {
            required.insert(fuel_resource.clone(), self.fuel_cost);
        }
        required
    }

    /// Whether the mission completes on `day`.
    #[must_use]
    pub fn is_due(&self, day: Day) -> bool {
        self.completion_day == day
    }
}

/// A production already running when the simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveProduction {
    /// The chain being run.
    pub chain: ChainId,
    /// Day (relative to day 0) it completes.
    pub completion_day: Day,
    /// Unit multiplier.
    #[serde(default = "default_multiplier")]
    pub multiplier: u32,
}

/// A mission already underway when the simulation starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveMission {
    /// The mission profile.
    pub mission: MissionId,
    /// Day (relative to day 0) it returns.
    pub completion_day: Day,
}

fn default_multiplier() -> u32 {
    1
}

/// The instances currently running, in instantiation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActiveSet {
    /// Running productions.
    pub productions: Vec<ProductionInstance>,
    /// Running missions.
    pub missions: Vec<MissionInstance>,
}

impl ActiveSet {
    /// Create an empty active set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total power drawn by running productions.
    #[must_use]
    pub fn power_demand(&self) -> Quantity {
        self.productions.iter().map(|p| p.power_draw_kw).sum()
    }

    /// Total crew tied up by running missions.
    #[must_use]
    pub fn crew_committed(&self) -> u32 {
        self.missions.iter().fold(0, |total, m| total.saturating_add(m.crew))
    }

    /// Remove and return every instance due on `day`, preserving order.
    pub fn take_due(&mut self, day: Day) -> (Vec<ProductionInstance>, Vec<MissionInstance>) {
        let (due_productions, productions): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.productions).into_iter().partition(|p| p.is_due(day));
        let (due_missions, missions): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.missions).into_iter().partition(|m| m.is_due(day));
        self.productions = productions;
        self.missions = missions;
        (due_productions, due_missions)
    }

    /// Check if nothing is running.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty() && self.missions.is_empty()
    }
}
