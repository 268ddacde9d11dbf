//! Chain data structures for data-driven chain definitions.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Chain;
use crate::math::{Day, Quantity};

/// Data-driven chain definition.
///
/// Missing maps and power figures default to empty or zero.
///
/// # Example RON
///
/// ```ron
/// ChainData(
///     id: "smelter",
///     name: "Ore Smelter",
///     inputs: { "ore": 30 },
///     outputs: { "metal": 10 },
///     duration_days: 2,
///     power_draw_kw: 15,
///     prerequisites: ["mine"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainData {
    /// Unique string identifier.
    pub id: String,

    /// Display name. Empty falls back to the id.
    #[serde(default)]
    pub name: String,

    /// Resources consumed per unit.
    #[serde(default)]
    pub inputs: BTreeMap<String, Quantity>,

    /// Resources produced per unit.
    #[serde(default)]
    pub outputs: BTreeMap<String, Quantity>,

    /// Build time in days; 0 marks a continuous chain.
    #[serde(default)]
    pub duration_days: Day,

    /// Power drawn per unit while building, in kW.
    #[serde(default)]
    pub power_draw_kw: Quantity,

    /// Power capacity commissioned per unit on completion, in kW.
    #[serde(default)]
    pub power_output_kw: Quantity,

    /// Chain ids that must complete first.
    #[serde(default)]
    pub prerequisites: Vec<String>,
}

impl ChainData {
    /// Check if this chain lists `chain_id` as a prerequisite.
    #[must_use]
    pub fn requires(&self, chain_id: &str) -> bool {
        self.prerequisites.iter().any(|p| p == chain_id)
    }

    /// Convert to the engine's chain type.
    #[must_use]
    pub fn to_chain(&self) -> Chain {
        let name = if self.name.is_empty() { &self.id } else { &self.name };
        let chain = Chain::new(self.id.as_str(), name.as_str(), self.duration_days)
            .with_power_draw(self.power_draw_kw)
            .with_power_output(self.power_output_kw)
            .with_prerequisites(self.prerequisites.iter().map(String::as_str));
        let chain = self
            .inputs
            .iter()
            .fold(chain, |chain, (resource, &quantity)| chain.with_input(resource.as_str(), quantity));
        self.outputs
            .iter()
            .fold(chain, |chain, (resource, &quantity)| chain.with_output(resource.as_str(), quantity))
    }
}
