//! What-if comparison of several scenarios against one catalog.
//!
//! Scenarios run in parallel with rayon. The engine is deterministic, so the
//! table is identical regardless of thread scheduling.

use std::fmt;

use rayon::prelude::*;
use rfse_core::catalog::Catalog;
use rfse_core::math::Day;
use serde::Serialize;
use tracing::{info, warn};

use crate::report::RunSummary;
use crate::scenario::Scenario;

/// Outcome of one scenario in a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum Outcome {
    /// The run finished.
    Completed(RunSummary),
    /// The scenario was rejected before any day was simulated.
    Failed {
        /// Scenario name.
        scenario: String,
        /// Why it was rejected.
        error: String,
    },
}

impl Outcome {
    /// Scenario name.
    #[must_use]
    pub fn scenario(&self) -> &str {
        match self {
            Self::Completed(summary) => &summary.scenario,
            Self::Failed { scenario, .. } => scenario,
        }
    }
}

/// Side-by-side outcomes, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comparison {
    /// One outcome per scenario.
    pub outcomes: Vec<Outcome>,
}

impl Comparison {
    /// Completed runs ordered best first.
    ///
    /// Fewer abandonments wins, then fewer findings, then an earlier
    /// completion day. Ties keep input order.
    #[must_use]
    pub fn ranked(&self) -> Vec<&RunSummary> {
        let mut completed: Vec<&RunSummary> = self
            .outcomes
            .iter()
            .filter_map(|outcome| match outcome {
                Outcome::Completed(summary) => Some(summary),
                Outcome::Failed { .. } => None,
            })
            .collect();
        completed.sort_by_key(|s| (s.abandoned, s.bottleneck_total(), s.completion_day));
        completed
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<24} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
            "scenario", "done", "prod", "miss", "aband", "find", "pend"
        )?;
        for outcome in &self.outcomes {
            match outcome {
                Outcome::Completed(s) => writeln!(
                    f,
                    "{:<24} {:>6} {:>6} {:>6} {:>6} {:>6} {:>6}",
                    s.scenario,
                    s.completion_day,
                    s.productions_completed,
                    s.missions_completed,
                    s.abandoned,
                    s.bottleneck_total(),
                    s.pending
                )?,
                Outcome::Failed { scenario, error } => {
                    writeln!(f, "{scenario:<24} FAILED: {error}")?;
                }
            }
        }
        Ok(())
    }
}

/// Run every scenario against `catalog` in parallel.
///
/// Each scenario's own catalog path is ignored. `horizon` overrides every
/// scenario's horizon when set.
#[must_use]
pub fn compare_scenarios(catalog: &Catalog, scenarios: &[Scenario], horizon: Option<Day>) -> Comparison {
    info!(count = scenarios.len(), "Comparing scenarios");

    let outcomes: Vec<Outcome> = scenarios
        .par_iter()
        .map(|scenario| match scenario.run(catalog, horizon) {
            Ok(result) => Outcome::Completed(RunSummary::new(scenario.name.clone(), &result)),
            Err(e) => {
                warn!(scenario = %scenario.name, error = %e, "Scenario rejected");
                Outcome::Failed {
                    scenario: scenario.name.clone(),
                    error: e.to_string(),
                }
            }
        })
        .collect();

    Comparison { outcomes }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfse_core::catalog::Chain;
    use rfse_core::math::Quantity;
    use rfse_core::plan::DevelopmentPhase;

    fn catalog() -> Catalog {
        Catalog::new(
            [
                Chain::new("mine", "Mine", 0).with_output("ore", 2),
                Chain::new("mill", "Mill", 2)
                    .with_input("ore", 4)
                    .with_output("metal", 1)
                    .with_prerequisites(["mine"]),
            ],
            [],
        )
        .unwrap()
    }

    fn scenario(name: &str, ore: i32, phases: Vec<DevelopmentPhase>) -> Scenario {
        let mut scenario = Scenario::from_ron_str(&format!(r#"(name: "{name}", catalog: "unused.ron")"#)).unwrap();
        scenario.inventory.insert("ore".into(), Quantity::new(ore));
        scenario.plan = phases;
        scenario.horizon_days = 10;
        scenario
    }

    #[test]
    fn test_outcomes_keep_input_order_and_rank() {
        let catalog = catalog();
        let plan = vec![DevelopmentPhase::new(0)
            .with_production("mine", 1)
            .with_production("mill", 2)];
        let scenarios = vec![
            scenario("starved", 0, plan.clone()),
            scenario("stocked", 20, plan),
            scenario("broken", 0, vec![DevelopmentPhase::new(0).with_production("forge", 1)]),
        ];

        let comparison = compare_scenarios(&catalog, &scenarios, None);
        let names: Vec<&str> = comparison.outcomes.iter().map(Outcome::scenario).collect();
        assert_eq!(names, vec!["starved", "stocked", "broken"]);
        assert!(matches!(comparison.outcomes[2], Outcome::Failed { .. }));

        let ranked = comparison.ranked();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].scenario, "stocked");
        assert_eq!(ranked[0].abandoned, 0);
        assert!(ranked[1].abandoned > 0);
    }

    #[test]
    fn test_comparison_is_repeatable() {
        let catalog = catalog();
        let scenarios: Vec<Scenario> = (0..8)
            .map(|i| {
                scenario(
                    &format!("s{i}"),
                    i * 3,
                    vec![DevelopmentPhase::new(0).with_production("mine", 1).with_production("mill", 3)],
                )
            })
            .collect();
        assert_eq!(
            compare_scenarios(&catalog, &scenarios, Some(6)),
            compare_scenarios(&catalog, &scenarios, Some(6))
        );
    }

    #[test]
    fn test_table_marks_failures() {
        let comparison = Comparison {
            outcomes: vec![Outcome::Failed {
                scenario: "x".into(),
                error: "boom".into(),
            }],
        };
        assert!(comparison.to_string().contains("FAILED: boom"));
    }
}
