//! Development plans: ordered phases of production and mission requests.
//!
//! Plans come from a calling planning layer; the engine never generates
//! them. The resolver and optimizer only ever move requests to later phases
//! or append new ones.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ChainId, MissionId};
use crate::math::Day;

/// A request to run `quantity` units of a chain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductionRequest {
    /// The chain to run.
    pub chain: ChainId,
    /// Unit multiplier.
    pub quantity: u32,
}

impl ProductionRequest {
    /// Create a new production request.
    #[must_use]
    pub fn new(chain: impl Into<ChainId>, quantity: u32) -> Self {
        Self {
            chain: chain.into(),
            quantity,
        }
    }
}

/// One phase of a development plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevelopmentPhase {
    /// Day on which every request in this phase starts.
    pub start_day: Day,
    /// Production requests started in this phase.
    #[serde(default)]
    pub productions: Vec<ProductionRequest>,
    /// Mission profiles launched in this phase.
    #[serde(default)]
    pub missions: Vec<MissionId>,
}

impl DevelopmentPhase {
    /// Create an empty phase starting on `start_day`.
    #[must_use]
    pub fn new(start_day: Day) -> Self {
        Self {
            start_day,
            productions: Vec::new(),
            missions: Vec::new(),
        }
    }

    /// Add a production request.
    #[must_use]
    pub fn with_production(mut self, chain: impl Into<ChainId>, quantity: u32) -> Self {
        self.productions.push(ProductionRequest::new(chain, quantity));
        self
    }

    /// Add a mission launch.
    #[must_use]
    pub fn with_mission(mut self, mission: impl Into<MissionId>) -> Self {
        self.missions.push(mission.into());
        self
    }

    /// Check if the phase requests nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.productions.is_empty() && self.missions.is_empty()
    }
}

/// Phases keyed by start day, used while re-timing a plan.
///
/// Phases sharing a start day are merged in their original order.
#[derive(Debug, Clone, Default)]
pub(crate) struct PhaseBook {
    phases: BTreeMap<Day, DevelopmentPhase>,
}

impl PhaseBook {
    pub(crate) fn from_phases(phases: &[DevelopmentPhase]) -> Self {
        let mut book = Self::default();
        for phase in phases {
            let slot = book.slot(phase.start_day);
            slot.productions.extend(phase.productions.iter().cloned());
            slot.missions.extend(phase.missions.iter().cloned());
        }
        book
    }

    fn slot(&mut self, day: Day) -> &mut DevelopmentPhase {
        self.phases
            .entry(day)
            .or_insert_with(|| DevelopmentPhase::new(day))
    }

    pub(crate) fn add_production(&mut self, day: Day, request: ProductionRequest) {
        self.slot(day).productions.push(request);
    }

    pub(crate) fn add_mission(&mut self, day: Day, mission: MissionId) {
        self.slot(day).missions.push(mission);
    }

    /// Earliest start day in the book, if any.
    pub(crate) fn earliest_day(&self) -> Option<Day> {
        self.phases.keys().next().copied()
    }

    /// Flatten to `(start_day, request)` pairs in phase order.
    pub(crate) fn productions(&self) -> Vec<(Day, ProductionRequest)> {
        self.phases
            .values()
            .flat_map(|p| p.productions.iter().map(|r| (p.start_day, r.clone())))
            .collect()
    }

    /// Flatten to `(start_day, mission)` pairs in phase order.
    pub(crate) fn missions(&self) -> Vec<(Day, MissionId)> {
        self.phases
            .values()
            .flat_map(|p| p.missions.iter().map(|m| (p.start_day, m.clone())))
            .collect()
    }

    /// Rebuild from flat request lists, dropping empty phases.
    pub(crate) fn rebuild(
        productions: Vec<(Day, ProductionRequest)>,
        missions: Vec<(Day, MissionId)>,
    ) -> Self {
        let mut book = Self::default();
        for (day, request) in productions {
            book.add_production(day, request);
        }
        for (day, mission) in missions {
            book.add_mission(day, mission);
        }
        book
    }

    pub(crate) fn into_phases(self) -> Vec<DevelopmentPhase> {
        self.phases
            .into_values()
            .filter(|phase| !phase.is_empty())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_builder() {
        let phase = DevelopmentPhase::new(3)
            .with_production("smelter", 2)
            .with_mission("survey");
        assert_eq!(phase.start_day, 3);
        assert_eq!(phase.productions, vec![ProductionRequest::new("smelter", 2)]);
        assert_eq!(phase.missions, vec![MissionId::from("survey")]);
        assert!(!phase.is_empty());
        assert!(DevelopmentPhase::new(0).is_empty());
    }

    #[test]
    fn test_phase_book_merges_and_sorts() {
        let phases = vec![
            DevelopmentPhase::new(5).with_production("b", 1),
            DevelopmentPhase::new(0).with_production("a", 1),
            DevelopmentPhase::new(5).with_mission("m"),
        ];

        let merged = PhaseBook::from_phases(&phases).into_phases();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].start_day, 0);
        assert_eq!(merged[1].start_day, 5);
        assert_eq!(merged[1].productions.len(), 1);
        assert_eq!(merged[1].missions.len(), 1);
    }

    #[test]
    fn test_phase_book_drops_empty_phases() {
        let phases = vec![DevelopmentPhase::new(2), DevelopmentPhase::new(4).with_mission("m")];
        let book = PhaseBook::from_phases(&phases);
        assert_eq!(book.earliest_day(), Some(2));
        let rebuilt = PhaseBook::rebuild(book.productions(), book.missions()).into_phases();
        assert_eq!(rebuilt.len(), 1);
        assert_eq!(rebuilt[0].start_day, 4);
    }
}
