//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the engine produces identical
//! results given identical inputs.
//!
//! # Testing Strategy
//!
//! Plans are compared by simulating many what-if variants, so a run must be
//! 100% reproducible. Sources of non-determinism include:
//!
//! - **Floating-point math**: Different CPUs can produce different results.
//!   We use fixed-point arithmetic via [`rfse_core::math::Quantity`] throughout.
//!
//! - **HashMap iteration order**: Rust's default hasher is randomized.
//!   Every map in the engine is a `BTreeMap`.
//!
//! - **Wall-clock time**: The engine never reads the clock; days are counters.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual phases (instantiate, complete, analyze)
//! 2. **Property tests**: Random catalogs and plans must still be reproducible
//! 3. **Integration tests**: Full scenarios produce byte-identical results
//! 4. **Parallel tests**: Running N simulations in parallel all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use rfse_core::math::Day;
use rfse_core::scheduler::{Scheduler, SimulationResult};

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of days simulated.
    pub days: Day,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for a deterministic engine).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the runs were deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the runs produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Days: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.days,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Result hash from each simulation.
    pub hashes: Vec<u64>,
    /// Horizon each simulation ran to.
    pub horizon: Day,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all simulations matched.
    ///
    /// # Panics
    ///
    /// Panics if simulations produced different hashes.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel simulations diverged!\n\
                 Simulations: {}\n\
                 Horizon: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_sims,
                self.horizon,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Run a stepped process multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run
/// * `days` - Number of steps per run
/// * `setup` - Function to create the initial state
/// * `step` - Function to advance the state by one day
/// * `hash` - Function to compute the state hash
///
/// # Example
///
/// ```ignore
/// use rfse_test_utils::determinism::verify_determinism;
///
/// let result = verify_determinism(
///     5,  // Run 5 times
///     30, // 30 days each
///     || build_scheduler(&catalog),
///     |s| { s.step(); },
///     Scheduler::state_hash,
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    days: Day,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..days {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    DeterminismResult {
        is_deterministic,
        hashes,
        days,
    }
}

/// Simplified determinism verification for [`Scheduler`].
///
/// Steps two identically configured schedulers and compares their final
/// state hashes.
pub fn verify_scheduler_determinism<'a, F>(setup_fn: F, days: Day) -> bool
where
    F: Fn() -> Scheduler<'a>,
{
    let result = verify_determinism(
        2,
        days,
        &setup_fn,
        |scheduler| {
            scheduler.step();
        },
        Scheduler::state_hash,
    );
    result.is_deterministic
}

/// Hash of a result's serialized bytes.
///
/// # Panics
///
/// Panics if the result cannot be serialized.
#[must_use]
pub fn result_hash(result: &SimulationResult) -> u64 {
    let bytes = result.to_bytes().expect("result serializes");
    compute_hash(&bytes)
}

/// Run N simulations on scoped threads and collect result hashes.
///
/// Scoped threads let every run borrow the same catalog.
///
/// # Example
///
/// ```ignore
/// use rfse_test_utils::determinism::run_parallel_simulations_scoped;
///
/// let result = run_parallel_simulations_scoped(
///     || build_scheduler(&catalog),
///     8,  // 8 parallel simulations
///     60, // through day 60
/// );
/// result.assert_deterministic();
/// ```
pub fn run_parallel_simulations_scoped<'a, F>(
    setup_fn: F,
    num_sims: usize,
    horizon: Day,
) -> ParallelSimResult
where
    F: Fn() -> Scheduler<'a> + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| s.spawn(|| result_hash(&setup_fn().run(horizon))))
            .collect();

        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    ParallelSimResult {
        hashes,
        horizon,
        num_sims,
    }
}

/// Compare two runs day-by-day, finding the first divergence.
///
/// # Returns
///
/// `None` if the runs stay identical, `Some(day)` for the first day after
/// which their states differ.
pub fn find_first_divergence<'a, F>(setup_fn: F, days: Day) -> Option<Day>
where
    F: Fn() -> Scheduler<'a>,
{
    let mut first = setup_fn();
    let mut second = setup_fn();

    if first.state_hash() != second.state_hash() {
        return Some(0);
    }

    for _ in 0..days {
        let day = first.day();
        first.step();
        second.step();

        if first.state_hash() != second.state_hash() {
            return Some(day);
        }
    }

    None
}

/// Verify that a result survives a byte round trip exactly.
pub fn verify_serialization_determinism<'a, F>(setup_fn: F, horizon: Day) -> bool
where
    F: Fn() -> Scheduler<'a>,
{
    let result = setup_fn().run(horizon);

    let Ok(bytes) = result.to_bytes() else {
        return false;
    };
    let Ok(restored) = SimulationResult::from_bytes(&bytes) else {
        return false;
    };

    restored == result && restored.to_bytes().is_ok_and(|again| again == bytes)
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for engine testing.
///
/// These strategies generate random but reproducible catalogs, ledgers, and
/// plans. Generated prerequisite graphs are acyclic: a chain may only depend
/// on chains with a lower index.
pub mod strategies {
    use proptest::prelude::*;
    use proptest::sample::{select, subsequence};
    use rfse_core::catalog::{Catalog, Chain, ChainId, MissionId, MissionProfile};
    use rfse_core::ledger::InventoryLedger;
    use rfse_core::math::{Day, Quantity};
    use rfse_core::plan::DevelopmentPhase;

    /// Resource names used by generated catalogs.
    pub const RESOURCES: [&str; 5] = ["ore", "ice", "metal", "fuel", "parts"];

    /// Id of the generated chain at `index`. Ids sort in index order.
    #[must_use]
    pub fn chain_id(index: usize) -> String {
        format!("chain-{index:02}")
    }

    /// Generate a whole quantity in `1..max`.
    pub fn arb_quantity(max: i32) -> impl Strategy<Value = Quantity> {
        (1..max).prop_map(Quantity::new)
    }

    /// Generate a resource bundle with up to `max_entries` entries.
    pub fn arb_bundle(max_entries: usize) -> impl Strategy<Value = Vec<(&'static str, Quantity)>> {
        proptest::collection::btree_map(select(RESOURCES.to_vec()), arb_quantity(40), 0..=max_entries)
            .prop_map(|bundle| bundle.into_iter().collect())
    }

    /// Generate the chain at `index`, depending only on lower indices.
    pub fn arb_chain(index: usize) -> impl Strategy<Value = Chain> {
        let earlier: Vec<usize> = (0..index).collect();
        (
            arb_bundle(2),
            arb_bundle(2),
            0u32..5,
            0i32..10,
            subsequence(earlier, 0..=index.min(2)),
        )
            .prop_map(move |(inputs, outputs, duration, draw, prerequisites)| {
                let chain = Chain::new(chain_id(index), chain_id(index), duration)
                    .with_power_draw(draw)
                    .with_prerequisites(prerequisites.into_iter().map(chain_id));
                let chain = inputs
                    .into_iter()
                    .fold(chain, |chain, (resource, quantity)| chain.with_input(resource, quantity));
                outputs
                    .into_iter()
                    .fold(chain, |chain, (resource, quantity)| chain.with_output(resource, quantity))
            })
    }

    /// Mission profiles shared by every generated catalog.
    #[must_use]
    pub fn standard_missions() -> Vec<MissionProfile> {
        vec![
            MissionProfile::new("haul", "Haul", 3)
                .with_yield("ice", 20)
                .with_fuel_cost(2),
            MissionProfile::new("prospect", "Prospect", 5)
                .with_yield("ore", 35)
                .with_fuel_cost(4)
                .with_crew(2),
        ]
    }

    /// Generate an acyclic catalog of `1..=max_chains` chains.
    ///
    /// # Panics
    ///
    /// Never; generated ids are unique.
    pub fn arb_catalog(max_chains: usize) -> impl Strategy<Value = Catalog> {
        (1..=max_chains.max(1))
            .prop_flat_map(|n| (0..n).map(arb_chain).collect::<Vec<_>>())
            .prop_map(|chains| {
                Catalog::new(chains, standard_missions()).expect("generated ids are unique")
            })
    }

    /// Generate a starting ledger over [`RESOURCES`].
    pub fn arb_ledger() -> impl Strategy<Value = InventoryLedger> {
        proptest::collection::btree_map(select(RESOURCES.to_vec()), 0i32..200, 0..=RESOURCES.len())
            .prop_map(|stock| {
                InventoryLedger::from_snapshot(
                    stock.into_iter().map(|(resource, n)| (resource, Quantity::new(n))),
                )
            })
    }

    /// Generate a plan requesting every chain of `catalog` once, plus a few
    /// missions, at random start days below `max_start`.
    ///
    /// Every prerequisite is planned, so the plan always resolves.
    pub fn arb_plan_for(catalog: &Catalog, max_start: Day) -> BoxedStrategy<Vec<DevelopmentPhase>> {
        let chains: Vec<ChainId> = catalog.chains().map(|c| c.id.clone()).collect();
        let missions: Vec<MissionId> = catalog.missions().map(|m| m.id.clone()).collect();
        let max_start = max_start.max(1);

        let slots = proptest::collection::vec((0..max_start, 1u32..4), chains.len());
        let launches = if missions.is_empty() {
            Just(Vec::new()).boxed()
        } else {
            proptest::collection::vec((0..max_start, select(missions)), 0..4).boxed()
        };

        (slots, launches)
            .prop_map(move |(slots, launches)| {
                let mut phases: Vec<DevelopmentPhase> = chains
                    .iter()
                    .zip(slots)
                    .map(|(chain, (day, quantity))| {
                        DevelopmentPhase::new(day).with_production(chain.clone(), quantity)
                    })
                    .collect();
                phases.extend(
                    launches
                        .into_iter()
                        .map(|(day, mission)| DevelopmentPhase::new(day).with_mission(mission)),
                );
                phases
            })
            .boxed()
    }

    /// Generate a complete scenario: catalog, starting ledger, and plan.
    pub fn arb_scenario(
        max_chains: usize,
    ) -> impl Strategy<Value = (Catalog, InventoryLedger, Vec<DevelopmentPhase>)> {
        arb_catalog(max_chains).prop_flat_map(|catalog| {
            let plan = arb_plan_for(&catalog, 10);
            (Just(catalog), arb_ledger(), plan)
        })
    }
}
