//! Mission data structures for data-driven expedition definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{MissionProfile, RiskLevel};
use crate::math::{Day, Quantity};

/// Data-driven mission profile definition.
///
/// # Example RON
///
/// ```ron
/// MissionData(
///     id: "ice-haul",
///     name: "Ice Haul",
///     duration_days: 6,
///     yields: { "ice": 120 },
///     fuel_cost: 20,
///     crew_required: 3,
///     risk: Medium,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissionData {
    /// Unique string identifier.
    pub id: String,

    /// Display name. Empty falls back to the id.
    #[serde(default)]
    pub name: String,

    /// Days from launch to return.
    pub duration_days: Day,

    /// Resources granted on return.
    #[serde(default)]
    pub yields: BTreeMap<String, Quantity>,

    /// Fuel charged on return.
    #[serde(default)]
    pub fuel_cost: Quantity,

    /// Crew tied up while underway.
    #[serde(default)]
    pub crew_required: u32,

    /// Risk classification.
    #[serde(default)]
    pub risk: RiskLevel,
}

impl MissionData {
    /// Convert to the engine's mission profile type.
    #[must_use]
    pub fn to_profile(&self) -> MissionProfile {
        let name = if self.name.is_empty() { &self.id } else { &self.name };
        let profile = MissionProfile::new(self.id.as_str(), name.as_str(), self.duration_days)
            .with_fuel_cost(self.fuel_cost)
            .with_crew(self.crew_required)
            .with_risk(self.risk);
        self.yields
            .iter()
            .fold(profile, |profile, (resource, &quantity)| profile.with_yield(resource.as_str(), quantity))
    }
}
