//! Human-readable and JSON reports.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use rfse_core::analyzer::{Bottleneck, BottleneckKind};
use rfse_core::forecast::ForecastPoint;
use rfse_core::ledger::LedgerSnapshot;
use rfse_core::math::{Day, Quantity};
use rfse_core::scheduler::SimulationResult;
use serde::Serialize;

use crate::scenario::Result;

/// Condensed outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Scenario name.
    pub scenario: String,
    /// Last day on which planned work completes.
    pub completion_day: Day,
    /// Production instances completed.
    pub productions_completed: usize,
    /// Mission instances completed.
    pub missions_completed: usize,
    /// Instances abandoned for missing inputs.
    pub abandoned: usize,
    /// Instances still running or not yet started at the horizon.
    pub pending: usize,
    /// Finding count per kind.
    pub bottleneck_counts: BTreeMap<BottleneckKind, usize>,
    /// Distinct findings, earliest first.
    pub bottlenecks: Vec<Bottleneck>,
    /// Ledger at the horizon.
    pub final_inventory: LedgerSnapshot,
}

impl RunSummary {
    /// Summarize a simulation result.
    #[must_use]
    pub fn new(scenario: impl Into<String>, result: &SimulationResult) -> Self {
        let mut bottleneck_counts = BTreeMap::new();
        for finding in &result.bottlenecks {
            *bottleneck_counts.entry(finding.kind).or_insert(0) += 1;
        }

        let pending_active = result.pending.active.productions.len() + result.pending.active.missions.len();
        let pending_unstarted: usize = result
            .pending
            .unstarted
            .iter()
            .map(|phase| phase.productions.len() + phase.missions.len())
            .sum();

        Self {
            scenario: scenario.into(),
            completion_day: result.completion_day,
            productions_completed: result.events.iter().map(|e| e.completed_productions.len()).sum(),
            missions_completed: result.events.iter().map(|e| e.completed_missions.len()).sum(),
            abandoned: result.abandoned().count(),
            pending: pending_active + pending_unstarted,
            bottleneck_counts,
            bottlenecks: result.bottlenecks.clone(),
            final_inventory: result.final_ledger.clone(),
        }
    }

    /// Total number of distinct findings.
    #[must_use]
    pub fn bottleneck_total(&self) -> usize {
        self.bottlenecks.len()
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== {} ===", self.scenario)?;
        writeln!(f, "Completion day:        {}", self.completion_day)?;
        writeln!(f, "Productions completed: {}", self.productions_completed)?;
        writeln!(f, "Missions completed:    {}", self.missions_completed)?;
        writeln!(f, "Abandoned:             {}", self.abandoned)?;
        writeln!(f, "Pending at horizon:    {}", self.pending)?;

        if !self.bottlenecks.is_empty() {
            writeln!(f)?;
            writeln!(f, "Bottlenecks:")?;
            for (kind, count) in &self.bottleneck_counts {
                writeln!(f, "  {kind}: {count}")?;
            }
            for finding in &self.bottlenecks {
                writeln!(f, "  - {finding}")?;
            }
        }

        writeln!(f)?;
        writeln!(f, "Final inventory:")?;
        if self.final_inventory.is_empty() {
            writeln!(f, "  (empty)")?;
        }
        for (resource, quantity) in &self.final_inventory {
            writeln!(f, "  {resource:<24} {quantity}")?;
        }
        Ok(())
    }
}

/// Projection of one resource, with an optional sufficiency target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForecastReport {
    /// Resource projected.
    pub resource: String,
    /// Projected quantity per day.
    pub points: Vec<ForecastPoint>,
    /// Target quantity, if one was asked for.
    pub target: Option<Quantity>,
    /// First day the projection reaches `target`.
    pub target_day: Option<Day>,
}

impl fmt::Display for ForecastReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast for '{}' (linear, ignores consumption)", self.resource)?;
        for point in &self.points {
            writeln!(f, "  day {:>4}  {}", point.day, point.quantity)?;
        }
        if let Some(target) = self.target {
            match self.target_day {
                Some(day) => writeln!(f, "Reaches {target} on day {day}")?,
                None => writeln!(f, "Does not reach {target} within the forecast window")?,
            }
        }
        Ok(())
    }
}

/// Pretty-printed JSON for any report.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Write a report to a JSON file.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_json<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    std::fs::write(path, to_json(value)?)?;
    Ok(())
}
