//! Immutable registry of production chains and mission profiles.
//!
//! The catalog is built once (from RON data or directly in tests) and then
//! shared read-only by every simulation call. It performs no cross-reference
//! validation on lookup; prerequisite checking belongs to the
//! [`resolver`](crate::resolver).

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::math::{Day, Quantity};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Create a new id.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// The id as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Name of a stockpiled resource (e.g. `"ore"`, `"fuel"`).
    ResourceId
);
string_id!(
    /// Unique identifier for a production chain.
    ChainId
);
string_id!(
    /// Unique identifier for a mission profile.
    MissionId
);

/// Resource bundle keyed by resource, iterated in name order.
pub type ResourceMap = BTreeMap<ResourceId, Quantity>;

/// A production or construction recipe.
///
/// Consumes `inputs` and yields `outputs` per unit, after `duration_days`.
/// A duration of zero marks a continuous (steady-state) chain whose outputs
/// are a per-day rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    /// Unique identifier.
    pub id: ChainId,
    /// Display name.
    pub name: String,
    /// Resources consumed per unit.
    pub inputs: ResourceMap,
    /// Resources produced per unit.
    pub outputs: ResourceMap,
    /// Build time in days (0 = continuous).
    pub duration_days: Day,
    /// Power drawn per unit while the build is in progress, in kW.
    pub power_draw_kw: Quantity,
    /// Power capacity commissioned per unit on completion, in kW.
    pub power_output_kw: Quantity,
    /// Chains that must complete before this one may start.
    pub prerequisites: Vec<ChainId>,
}

impl Chain {
    /// Create a chain with no inputs, outputs, power, or prerequisites.
    #[must_use]
    pub fn new(id: impl Into<ChainId>, name: impl Into<String>, duration_days: Day) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            inputs: ResourceMap::new(),
            outputs: ResourceMap::new(),
            duration_days,
            power_draw_kw: Quantity::ZERO,
            power_output_kw: Quantity::ZERO,
            prerequisites: Vec::new(),
        }
    }

    /// Add an input requirement.
    #[must_use]
    pub fn with_input(mut self, resource: impl Into<ResourceId>, quantity: impl Into<Quantity>) -> Self {
        self.inputs.insert(resource.into(), quantity.into());
        self
    }

    /// Add an output yield.
    #[must_use]
    pub fn with_output(mut self, resource: impl Into<ResourceId>, quantity: impl Into<Quantity>) -> Self {
        self.outputs.insert(resource.into(), quantity.into());
        self
    }

    /// Set the power draw.
    #[must_use]
    pub fn with_power_draw(mut self, kw: impl Into<Quantity>) -> Self {
        self.power_draw_kw = kw.into();
        self
    }

    /// Set the commissioned power output.
    #[must_use]
    pub fn with_power_output(mut self, kw: impl Into<Quantity>) -> Self {
        self.power_output_kw = kw.into();
        self
    }

    /// Set the prerequisite chains.
    #[must_use]
    pub fn with_prerequisites<I, C>(mut self, prerequisites: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ChainId>,
    {
        self.prerequisites = prerequisites.into_iter().map(Into::into).collect();
        self
    }

    /// Whether this is a continuous (zero-duration) chain.
    #[must_use]
    pub const fn is_continuous(&self) -> bool {
        self.duration_days == 0
    }

    /// Per-unit requirement of `resource` (zero if not an input).
    #[must_use]
    pub fn input(&self, resource: &str) -> Quantity {
        self.inputs.get(resource).copied().unwrap_or_default()
    }

    /// Per-unit yield of `resource` (zero if not an output).
    #[must_use]
    pub fn output(&self, resource: &str) -> Quantity {
        self.outputs.get(resource).copied().unwrap_or_default()
    }

    /// Whether this chain commissions power capacity.
    #[must_use]
    pub fn is_power_source(&self) -> bool {
        self.power_output_kw > Quantity::ZERO
    }

    /// Name of the first field holding a negative quantity, if any.
    #[must_use]
    pub fn negative_field(&self) -> Option<String> {
        first_negative(&self.inputs, "inputs")
            .or_else(|| first_negative(&self.outputs, "outputs"))
            .or_else(|| self.power_draw_kw.is_negative().then(|| "power_draw_kw".to_string()))
            .or_else(|| self.power_output_kw.is_negative().then(|| "power_output_kw".to_string()))
    }
}

fn first_negative(bundle: &ResourceMap, field: &str) -> Option<String> {
    bundle
        .iter()
        .find(|(_, quantity)| quantity.is_negative())
        .map(|(resource, _)| format!("{field}.{resource}"))
}

/// Risk classification of an expedition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Routine expedition.
    #[default]
    Low,
    /// Expedition with a meaningful chance of losses.
    Medium,
    /// Dangerous expedition.
    High,
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Template for a resource-acquisition expedition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionProfile {
    /// Unique identifier.
    pub id: MissionId,
    /// Display name.
    pub name: String,
    /// Days from launch to return.
    pub duration_days: Day,
    /// Resources granted on completion.
    pub yields: ResourceMap,
    /// Fuel consumed, charged on completion.
    pub fuel_cost: Quantity,
    /// Crew members tied up while the mission is active.
    pub crew_required: u32,
    /// Risk classification.
    pub risk: RiskLevel,
}

impl MissionProfile {
    /// Create a mission profile with no yield and no costs.
    #[must_use]
    pub fn new(id: impl Into<MissionId>, name: impl Into<String>, duration_days: Day) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            duration_days,
            yields: ResourceMap::new(),
            fuel_cost: Quantity::ZERO,
            crew_required: 0,
            risk: RiskLevel::Low,
        }
    }

    /// Add a resource yield.
    #[must_use]
    pub fn with_yield(mut self, resource: impl Into<ResourceId>, quantity: impl Into<Quantity>) -> Self {
        self.yields.insert(resource.into(), quantity.into());
        self
    }

    /// Set the fuel cost.
    #[must_use]
    pub fn with_fuel_cost(mut self, fuel: impl Into<Quantity>) -> Self {
        self.fuel_cost = fuel.into();
        self
    }

    /// Set the crew requirement.
    #[must_use]
    pub fn with_crew(mut self, crew: u32) -> Self {
        self.crew_required = crew;
        self
    }

    /// Set the risk level.
    #[must_use]
    pub fn with_risk(mut self, risk: RiskLevel) -> Self {
        self.risk = risk;
        self
    }

    /// Yield of `resource` (zero if not yielded).
    #[must_use]
    pub fn yield_of(&self, resource: &str) -> Quantity {
        self.yields.get(resource).copied().unwrap_or_default()
    }

    /// Name of the first field holding a negative quantity, if any.
    #[must_use]
    pub fn negative_field(&self) -> Option<String> {
        first_negative(&self.yields, "yields")
            .or_else(|| self.fuel_cost.is_negative().then(|| "fuel_cost".to_string()))
    }
}

/// Read-only registry of chains and mission profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    chains: BTreeMap<ChainId, Chain>,
    missions: BTreeMap<MissionId, MissionProfile>,
    /// Reverse index: resource -> chains yielding it, in id order.
    producers: BTreeMap<ResourceId, Vec<ChainId>>,
}

impl Catalog {
    /// Build a catalog from chain and mission definitions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::DuplicateDefinition`] if two entries share an
    /// id, or [`EngineError::NegativeQuantity`] if any amount is below zero.
    pub fn new<C, M>(chains: C, missions: M) -> Result<Self>
    where
        C: IntoIterator<Item = Chain>,
        M: IntoIterator<Item = MissionProfile>,
    {
        let mut catalog = Self::default();

        for chain in chains {
            if let Some(field) = chain.negative_field() {
                return Err(EngineError::NegativeQuantity {
                    kind: "chain",
                    id: chain.id.0,
                    field,
                });
            }
            if catalog.chains.contains_key(&chain.id) {
                return Err(EngineError::DuplicateDefinition {
                    kind: "chain",
                    id: chain.id.0,
                });
            }
            for resource in chain.outputs.keys() {
                catalog
                    .producers
                    .entry(resource.clone())
                    .or_default()
                    .push(chain.id.clone());
            }
            catalog.chains.insert(chain.id.clone(), chain);
        }

        for mission in missions {
            if let Some(field) = mission.negative_field() {
                return Err(EngineError::NegativeQuantity {
                    kind: "mission",
                    id: mission.id.0,
                    field,
                });
            }
            if catalog.missions.contains_key(&mission.id) {
                return Err(EngineError::DuplicateDefinition {
                    kind: "mission",
                    id: mission.id.0,
                });
            }
            catalog.missions.insert(mission.id.clone(), mission);
        }

        for producers in catalog.producers.values_mut() {
            producers.sort();
        }

        Ok(catalog)
    }

    /// Get a chain by id.
    #[must_use]
    pub fn chain(&self, id: &str) -> Option<&Chain> {
        self.chains.get(id)
    }

    /// Get a mission profile by id.
    #[must_use]
    pub fn mission(&self, id: &str) -> Option<&MissionProfile> {
        self.missions.get(id)
    }

    /// Chains whose outputs include `resource`, in id order.
    #[must_use]
    pub fn producers_of(&self, resource: &str) -> &[ChainId] {
        self.producers.get(resource).map_or(&[], Vec::as_slice)
    }

    /// All chains, in id order.
    pub fn chains(&self) -> impl Iterator<Item = &Chain> {
        self.chains.values()
    }

    /// All mission profiles, in id order.
    pub fn missions(&self) -> impl Iterator<Item = &MissionProfile> {
        self.missions.values()
    }

    /// Number of chains.
    #[must_use]
    pub fn chain_count(&self) -> usize {
        self.chains.len()
    }

    /// Number of mission profiles.
    #[must_use]
    pub fn mission_count(&self) -> usize {
        self.missions.len()
    }

    /// Check if the catalog has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chains.is_empty() && self.missions.is_empty()
    }
}
