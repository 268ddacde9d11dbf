//! Availability forecasting.
//!
//! A forecast is a linear approximation for quick "how much, by when"
//! questions. It counts stock on hand, steady-rate output from continuous
//! chains, and yields of missions already underway. It ignores consumption
//! entirely, so treat it as guidance and not as an inventory projection;
//! run the [`Scheduler`](crate::scheduler::Scheduler) for authoritative
//! numbers.

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::instance::ActiveSet;
use crate::ledger::InventoryLedger;
use crate::math::{Day, Quantity};

/// Projected quantity of one resource on one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Days from now.
    pub day: Day,
    /// Projected quantity.
    pub quantity: Quantity,
}

/// Project `resource` over days `0..=days_ahead`.
#[must_use]
pub fn forecast(
    catalog: &Catalog,
    ledger: &InventoryLedger,
    active: &ActiveSet,
    resource: &str,
    days_ahead: Day,
) -> Vec<ForecastPoint> {
    Forecaster::new(catalog, ledger, active).series(resource, days_ahead)
}

/// Linear projection over a fixed ledger and active set.
#[derive(Debug, Clone, Copy)]
pub struct Forecaster<'a> {
    catalog: &'a Catalog,
    ledger: &'a InventoryLedger,
    active: &'a ActiveSet,
}

impl<'a> Forecaster<'a> {
    /// Create a forecaster.
    #[must_use]
    pub fn new(catalog: &'a Catalog, ledger: &'a InventoryLedger, active: &'a ActiveSet) -> Self {
        Self {
            catalog,
            ledger,
            active,
        }
    }

    /// Combined per-day output of continuous chains yielding `resource`.
    #[must_use]
    pub fn daily_rate(&self, resource: &str) -> Quantity {
        self.catalog
            .producers_of(resource)
            .iter()
            .filter_map(|id| self.catalog.chain(id.as_str()))
            .filter(|chain| chain.is_continuous())
            .map(|chain| chain.output(resource))
            .sum()
    }

    /// Projected quantity of `resource` on `day`.
    #[must_use]
    pub fn projected(&self, resource: &str, day: Day) -> Quantity {
        let returned: Quantity = self
            .active
            .missions
            .iter()
            .filter(|mission| mission.completion_day <= day)
            .filter_map(|mission| mission.yields.get(resource).copied())
            .sum();

        self.ledger
            .get(resource)
            .saturating_add(self.daily_rate(resource).scaled(day))
            .saturating_add(returned)
    }

    /// Projection for every day in `0..=days_ahead`.
    #[must_use]
    pub fn series(&self, resource: &str, days_ahead: Day) -> Vec<ForecastPoint> {
        (0..=days_ahead)
            .map(|day| ForecastPoint {
                day,
                quantity: self.projected(resource, day),
            })
            .collect()
    }

    /// First day within `0..=max_days` on which `resource` projects to at
    /// least `target`.
    #[must_use]
    pub fn days_until(&self, resource: &str, target: Quantity, max_days: Day) -> Option<Day> {
        (0..=max_days).find(|&day| self.projected(resource, day) >= target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Chain, MissionProfile};
    use crate::instance::MissionInstance;

    fn catalog() -> Catalog {
        Catalog::new(
            [
                Chain::new("well", "Water Well", 0).with_output("water", 4),
                Chain::new("condenser", "Condenser", 0).with_output("water", 1),
                Chain::new("tank-farm", "Tank Farm", 5).with_output("water", 100),
                Chain::new("kitchen", "Kitchen", 0)
                    .with_input("water", 2)
                    .with_output("meals", 1),
            ],
            [MissionProfile::new("comet", "Comet Tap", 3).with_yield("water", 50)],
        )
        .unwrap()
    }

    #[test]
    fn test_linear_projection_from_continuous_chains() {
        let catalog = catalog();
        let ledger = InventoryLedger::from_snapshot([("water", Quantity::new(10))]);
        let active = ActiveSet::new();

        let series = forecast(&catalog, &ledger, &active, "water", 3);
        let quantities: Vec<i32> = series.iter().map(|p| p.quantity.0.to_num()).collect();
        // Batch chains are not counted; consumption is ignored.
        assert_eq!(quantities, vec![10, 15, 20, 25]);
        assert_eq!(series[3].day, 3);
    }

    #[test]
    fn test_mission_yield_counted_from_completion_day() {
        let catalog = catalog();
        let profile = catalog.mission("comet").unwrap();
        let mut active = ActiveSet::new();
        active.missions.push(MissionInstance::new(profile, 0));
        let ledger = InventoryLedger::new();

        let forecaster = Forecaster::new(&catalog, &ledger, &active);
        assert_eq!(forecaster.projected("water", 2), Quantity::new(10));
        assert_eq!(forecaster.projected("water", 3), Quantity::new(65));
    }

    #[test]
    fn test_unknown_resource_is_flat_zero() {
        let catalog = catalog();
        let ledger = InventoryLedger::new();
        let active = ActiveSet::new();
        let series = forecast(&catalog, &ledger, &active, "plutonium", 2);
        assert_eq!(series.len(), 3);
        assert!(series.iter().all(|p| p.quantity == Quantity::ZERO));
    }

    #[test]
    fn test_days_until() {
        let catalog = catalog();
        let ledger = InventoryLedger::from_snapshot([("water", Quantity::new(3))]);
        let active = ActiveSet::new();
        let forecaster = Forecaster::new(&catalog, &ledger, &active);

        assert_eq!(forecaster.days_until("water", Quantity::new(3), 10), Some(0));
        assert_eq!(forecaster.days_until("water", Quantity::new(20), 10), Some(4));
        assert_eq!(forecaster.days_until("water", Quantity::new(1000), 10), None);
    }
}
