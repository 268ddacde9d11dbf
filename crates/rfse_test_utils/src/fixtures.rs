//! Test fixtures and helpers.
//!
//! Pre-built catalogs, ledgers, and plans for consistent testing.

use fixed::types::I32F32;
use rfse_core::catalog::{Catalog, Chain, MissionProfile, RiskLevel};
use rfse_core::ledger::InventoryLedger;
use rfse_core::math::Quantity;
use rfse_core::plan::DevelopmentPhase;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Create a quantity from an integer.
#[must_use]
pub fn qty(n: i32) -> Quantity {
    Quantity::new(n)
}

/// Create a ledger from `(resource, amount)` pairs.
#[must_use]
pub fn ledger(entries: &[(&str, i32)]) -> InventoryLedger {
    InventoryLedger::from_snapshot(entries.iter().map(|&(resource, n)| (resource, qty(n))))
}

/// Two chains: a continuous extractor `A` feeding a 3-day assembler `B`.
///
/// `A`: `{raw: 10}` -> `{refined: 9}`, duration 0.
/// `B`: `{refined: 5}` -> `{widget: 1}`, duration 3, requires `A`.
///
/// # Panics
///
/// Never; the ids are unique.
#[must_use]
pub fn two_stage_catalog() -> Catalog {
    Catalog::new(
        [
            Chain::new("A", "Extractor", 0)
                .with_input("raw", 10)
                .with_output("refined", 9),
            Chain::new("B", "Assembler", 3)
                .with_input("refined", 5)
                .with_output("widget", 1)
                .with_prerequisites(["A"]),
        ],
        [],
    )
    .expect("fixture ids are unique")
}

/// Initial ledger for the two-stage scenario: `{raw: 100}`.
#[must_use]
pub fn two_stage_ledger() -> InventoryLedger {
    ledger(&[("raw", 100)])
}

/// Plan for the two-stage scenario: phase 0 requests one `A` and one `B`.
#[must_use]
pub fn two_stage_plan() -> Vec<DevelopmentPhase> {
    vec![DevelopmentPhase::new(0)
        .with_production("A", 1)
        .with_production("B", 1)]
}

/// Three chains in a line: `mine` (2 days) <- `mill` (3 days) <- `works` (1 day).
///
/// # Panics
///
/// Never; the ids are unique.
#[must_use]
pub fn three_level_catalog() -> Catalog {
    Catalog::new(
        [
            Chain::new("mine", "Mine", 2).with_output("ore", 10),
            Chain::new("mill", "Mill", 3)
                .with_input("ore", 5)
                .with_output("plate", 2)
                .with_prerequisites(["mine"]),
            Chain::new("works", "Works", 1)
                .with_input("plate", 2)
                .with_output("machine", 1)
                .with_prerequisites(["mill"]),
        ],
        [],
    )
    .expect("fixture ids are unique")
}

/// A small settlement economy with power, missions, and a two-level tree.
///
/// # Panics
///
/// Never; the ids are unique.
#[must_use]
pub fn settlement_catalog() -> Catalog {
    Catalog::new(
        [
            Chain::new("regolith-miner", "Regolith Miner", 0).with_output("regolith", 12),
            Chain::new("ice-extractor", "Ice Extractor", 0)
                .with_output("ice", 6)
                .with_power_draw(5),
            Chain::new("smelter", "Smelter", 2)
                .with_input("regolith", 30)
                .with_output("metal", 10)
                .with_power_draw(20),
            Chain::new("electrolyzer", "Electrolyzer", 1)
                .with_input("ice", 10)
                .with_output("fuel", 8)
                .with_power_draw(15),
            Chain::new("solar-array", "Solar Array", 4)
                .with_input("metal", 20)
                .with_power_output(60)
                .with_prerequisites(["smelter"]),
            Chain::new("fabricator", "Fabricator", 3)
                .with_input("metal", 15)
                .with_output("parts", 5)
                .with_power_draw(25)
                .with_prerequisites(["smelter", "solar-array"]),
        ],
        [
            MissionProfile::new("ice-haul", "Ice Haul", 5)
                .with_yield("ice", 80)
                .with_fuel_cost(10)
                .with_crew(3)
                .with_risk(RiskLevel::Medium),
            MissionProfile::new("survey", "Survey Flight", 2)
                .with_yield("data", 1)
                .with_fuel_cost(2)
                .with_crew(1),
        ],
    )
    .expect("fixture ids are unique")
}

/// Starting stock for [`settlement_catalog`].
#[must_use]
pub fn settlement_ledger() -> InventoryLedger {
    ledger(&[("regolith", 120), ("ice", 40), ("fuel", 30), ("metal", 10)])
}

/// A week-long build-out plan for [`settlement_catalog`].
#[must_use]
pub fn settlement_plan() -> Vec<DevelopmentPhase> {
    vec![
        DevelopmentPhase::new(0)
            .with_production("smelter", 2)
            .with_production("electrolyzer", 1)
            .with_mission("ice-haul"),
        DevelopmentPhase::new(1)
            .with_production("solar-array", 1)
            .with_mission("survey"),
        DevelopmentPhase::new(3)
            .with_production("fabricator", 1)
            .with_mission("ice-haul"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixtures_build() {
        assert_eq!(two_stage_catalog().chain_count(), 2);
        assert_eq!(three_level_catalog().chain_count(), 3);
        let settlement = settlement_catalog();
        assert_eq!(settlement.chain_count(), 6);
        assert_eq!(settlement.mission_count(), 2);
        assert_eq!(settlement.producers_of("fuel").len(), 1);
    }

    #[test]
    fn test_ledger_helper() {
        let ledger = ledger(&[("ore", 3)]);
        assert_eq!(ledger.get("ore"), qty(3));
        assert_eq!(qty(2).0, fixed(2));
    }
}
