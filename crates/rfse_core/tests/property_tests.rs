//! Property-based tests over generated catalogs and plans.

use std::collections::BTreeMap;

use proptest::prelude::*;
use rfse_core::prelude::*;
use rfse_test_utils::determinism::strategies::{arb_scenario, RESOURCES};
use rfse_test_utils::determinism::result_hash;
use rfse_test_utils::fixtures::{qty, three_level_catalog};

/// Every `(start_day, chain, quantity)` request in a plan.
fn production_requests(phases: &[DevelopmentPhase]) -> Vec<(Day, ChainId, u32)> {
    let mut requests: Vec<_> = phases
        .iter()
        .flat_map(|p| {
            p.productions
                .iter()
                .map(move |r| (p.start_day, r.chain.clone(), r.quantity))
        })
        .collect();
    requests.sort();
    requests
}

/// Every `(start_day, mission)` launch in a plan.
fn mission_launches(phases: &[DevelopmentPhase]) -> Vec<(Day, MissionId)> {
    let mut launches: Vec<_> = phases
        .iter()
        .flat_map(|p| p.missions.iter().map(move |m| (p.start_day, m.clone())))
        .collect();
    launches.sort();
    launches
}

/// Match each input item to a distinct output item with the same key that
/// starts no earlier.
fn covered_by<K: PartialEq>(inputs: &[(Day, K)], outputs: &[(Day, K)]) -> bool {
    let mut used = vec![false; outputs.len()];
    inputs.iter().all(|(day, key)| {
        // Outputs are sorted, so the first fit is the tightest.
        let slot = outputs
            .iter()
            .enumerate()
            .position(|(i, (out_day, out_key))| !used[i] && out_key == key && out_day >= day);
        match slot {
            Some(i) => {
                used[i] = true;
                true
            }
            None => false,
        }
    })
}

/// Net change implied by one day's completions.
fn implied_deltas(event: &DayEvent) -> BTreeMap<ResourceId, Quantity> {
    let mut deltas: BTreeMap<ResourceId, Quantity> = BTreeMap::new();
    for instance in &event.completed_productions {
        for (resource, &q) in &instance.consumes {
            *deltas.entry(resource.clone()).or_default() -= q;
        }
        for (resource, &q) in &instance.produces {
            *deltas.entry(resource.clone()).or_default() += q;
        }
    }
    for instance in &event.completed_missions {
        if instance.fuel_cost > Quantity::ZERO {
            *deltas.entry(ResourceId::from("fuel")).or_default() -= instance.fuel_cost;
        }
        for (resource, &q) in &instance.yields {
            *deltas.entry(resource.clone()).or_default() += q;
        }
    }
    deltas.retain(|_, q| !q.is_zero());
    deltas
}

proptest! {
    /// Ledger quantities never go negative on any day.
    #[test]
    fn prop_ledger_never_negative((catalog, ledger, plan) in arb_scenario(6)) {
        let mut scheduler = Scheduler::new(&catalog, ledger);
        scheduler.load_plan(&plan).unwrap();
        for _ in 0..=20 {
            scheduler.step();
            prop_assert!(scheduler.ledger().iter().all(|(_, q)| !q.is_negative()));
        }
    }

    /// Each day's deltas are exactly the sum of that day's completions,
    /// and the log alone rebuilds the final ledger.
    #[test]
    fn prop_deltas_conserve_and_reconcile((catalog, ledger, plan) in arb_scenario(6)) {
        let result = simulate(&catalog, &ledger, &plan, 25).unwrap();
        for event in &result.events {
            prop_assert_eq!(&event.deltas, &implied_deltas(event));
        }
        prop_assert!(result.reconciles_with(&ledger.snapshot()));
    }

    /// Identical inputs always give byte-identical results.
    #[test]
    fn prop_simulation_is_deterministic((catalog, ledger, plan) in arb_scenario(5)) {
        let first = simulate(&catalog, &ledger, &plan, 20).unwrap();
        let second = simulate(&catalog, &ledger, &plan, 20).unwrap();
        prop_assert_eq!(result_hash(&first), result_hash(&second));
        prop_assert_eq!(first, second);
    }

    /// An abandoned instance is never completed later.
    #[test]
    fn prop_abandoned_instances_stay_abandoned((catalog, ledger, plan) in arb_scenario(6)) {
        let result = simulate(&catalog, &ledger, &plan, 25).unwrap();
        for event in &result.events {
            for abandoned in &event.abandoned {
                let later_completion = result.events.iter().filter(|e| e.day > event.day).any(|e| {
                    e.completed_productions.iter().any(|p| {
                        p.chain.as_str() == abandoned.subject && p.start_day == abandoned.start_day
                    })
                });
                prop_assert!(!later_completion);
            }
        }
    }

    /// After resolution every chain starts no earlier than the completion of
    /// every prerequisite instance, across two levels of dependency.
    #[test]
    fn prop_resolution_orders_prerequisites(
        mine_day in 0u32..10,
        mill_day in 0u32..10,
        works_day in 0u32..10,
        extra_mine_day in proptest::option::of(0u32..10),
    ) {
        let catalog = three_level_catalog();
        let mut phases = vec![
            DevelopmentPhase::new(works_day).with_production("works", 1),
            DevelopmentPhase::new(mill_day).with_production("mill", 1),
            DevelopmentPhase::new(mine_day).with_production("mine", 1),
        ];
        if let Some(day) = extra_mine_day {
            phases.push(DevelopmentPhase::new(day).with_production("mine", 2));
        }

        let resolved = resolve(&catalog, &phases).unwrap();
        let requests = production_requests(&resolved);
        let completion = |chain: &str| {
            requests
                .iter()
                .filter(|(_, c, _)| c.as_str() == chain)
                .map(|(start, c, _)| start + catalog.chain(c.as_str()).unwrap().duration_days)
                .max()
                .unwrap()
        };
        let start = |chain: &str| {
            requests
                .iter()
                .filter(|(_, c, _)| c.as_str() == chain)
                .map(|(start, _, _)| *start)
                .min()
                .unwrap()
        };

        prop_assert!(start("mill") >= completion("mine"));
        prop_assert!(start("works") >= completion("mill"));
        prop_assert!(start("works") >= mill_day.max(mine_day + 2) + 3);
    }

    /// Optimization keeps every input request, only moving start days later.
    #[test]
    fn prop_optimizer_output_is_superset(
        (catalog, _ledger, plan) in arb_scenario(6),
        spacing in 0u32..5,
    ) {
        let config = OptimizerConfig::default().with_mission_spacing(spacing);
        let optimized = optimize(&catalog, &plan, &config).unwrap();

        let keyed = |requests: Vec<(Day, ChainId, u32)>| -> Vec<(Day, (ChainId, u32))> {
            requests.into_iter().map(|(d, c, q)| (d, (c, q))).collect()
        };
        let before = keyed(production_requests(&plan));
        let after = keyed(production_requests(&optimized));
        prop_assert!(after.len() >= before.len());
        prop_assert!(covered_by(&before, &after));

        let before = mission_launches(&plan);
        let after = mission_launches(&optimized);
        prop_assert_eq!(after.len(), before.len());
        prop_assert!(covered_by(&before, &after));

        // The optimized plan still resolves without moving anything.
        prop_assert_eq!(
            production_requests(&resolve(&catalog, &optimized).unwrap()),
            production_requests(&optimized)
        );
    }

    /// A resource fed only by one continuous producer never projects lower
    /// on a later day.
    #[test]
    fn prop_forecast_is_monotonic(
        rate in 1i32..50,
        stock in 0i32..500,
        days in 1u32..60,
    ) {
        let catalog = Catalog::new(
            [Chain::new("pump", "Pump", 0).with_output("water", rate)],
            [],
        )
        .unwrap();
        let ledger = InventoryLedger::from_snapshot([("water", qty(stock))]);
        let active = ActiveSet::new();

        let series = forecast(&catalog, &ledger, &active, "water", days);
        prop_assert_eq!(series.len(), days as usize + 1);
        prop_assert_eq!(series[0].quantity, qty(stock));
        for pair in series.windows(2) {
            prop_assert!(pair[1].quantity >= pair[0].quantity);
        }
    }

    /// Shortage findings classify exactly at the integer-percent thresholds.
    #[test]
    fn prop_shortage_thresholds(required in 1i32..=i32::MAX, stock in 0i32..=i32::MAX) {
        let catalog = Catalog::new(
            [Chain::new("consumer", "Consumer", 1).with_input(RESOURCES[0], required)],
            [],
        )
        .unwrap();
        let ledger = InventoryLedger::from_snapshot([(RESOURCES[0], qty(stock))]);
        let findings = analyze(&catalog, &ledger, &ActiveSet::new(), 0);
        let kind = findings.first().map(|b| b.kind);

        let expected = if i64::from(stock) * 100 <= i64::from(required) * 10 {
            Some(BottleneckKind::CriticalShortage)
        } else if i64::from(stock) * 100 <= i64::from(required) * 50 {
            Some(BottleneckKind::LowAvailability)
        } else {
            None
        };
        prop_assert_eq!(kind, expected);
    }

    /// Stock within one unit of a threshold still classifies exactly, at
    /// any magnitude.
    #[test]
    fn prop_shortage_threshold_boundaries(
        required in 1i32..=i32::MAX,
        percent in prop::sample::select(vec![10i64, 50]),
        offset in -1i64..=1,
    ) {
        let stock = (i64::from(required) * percent / 100 + offset).clamp(0, i64::from(i32::MAX));
        let stock = i32::try_from(stock).unwrap();
        let catalog = Catalog::new(
            [Chain::new("consumer", "Consumer", 1).with_input(RESOURCES[0], required)],
            [],
        )
        .unwrap();
        let ledger = InventoryLedger::from_snapshot([(RESOURCES[0], qty(stock))]);
        let kind = analyze(&catalog, &ledger, &ActiveSet::new(), 0).first().map(|b| b.kind);

        let expected = if i64::from(stock) * 100 <= i64::from(required) * 10 {
            Some(BottleneckKind::CriticalShortage)
        } else if i64::from(stock) * 100 <= i64::from(required) * 50 {
            Some(BottleneckKind::LowAvailability)
        } else {
            None
        };
        prop_assert_eq!(kind, expected);
    }
}
