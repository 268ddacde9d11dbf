//! Dependency resolution for development plans.
//!
//! Raises the start day of every production request until each of its
//! prerequisite chains has completed, iterating to a fixed point so chains
//! of any depth resolve. Start days are never lowered.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::catalog::{Catalog, ChainId, MissionId};
use crate::error::{ConfigurationError, Result};
use crate::math::Day;
use crate::plan::{DevelopmentPhase, PhaseBook, ProductionRequest};

/// Resolve prerequisite ordering for `phases` against `catalog`.
///
/// Shorthand for `DependencyResolver::new(catalog).resolve(phases)`.
///
/// # Errors
///
/// Returns a [`ConfigurationError`] for unknown references, prerequisites
/// the plan never produces, or prerequisite cycles.
pub fn resolve(catalog: &Catalog, phases: &[DevelopmentPhase]) -> Result<Vec<DevelopmentPhase>> {
    DependencyResolver::new(catalog).resolve(phases)
}

/// Computes legal start days from prerequisite relationships.
#[derive(Debug, Clone)]
pub struct DependencyResolver<'a> {
    catalog: &'a Catalog,
    /// Chains completed (or completing) outside the plan, with their day.
    established: BTreeMap<ChainId, Day>,
}

impl<'a> DependencyResolver<'a> {
    /// Create a resolver over `catalog`.
    #[must_use]
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            established: BTreeMap::new(),
        }
    }

    /// Declare that `chain` completes on `day` outside the plan.
    ///
    /// Established chains satisfy prerequisites without a planned request.
    #[must_use]
    pub fn with_established(mut self, chain: impl Into<ChainId>, day: Day) -> Self {
        let entry = self.established.entry(chain.into()).or_insert(day);
        *entry = (*entry).max(day);
        self
    }

    /// Validate references and resolve start days.
    ///
    /// The returned phases are sorted by start day; requests that had to move
    /// are placed in the phase for their new start day.
    ///
    /// # Errors
    ///
    /// See [`resolve`].
    pub fn resolve(&self, phases: &[DevelopmentPhase]) -> Result<Vec<DevelopmentPhase>> {
        let book = PhaseBook::from_phases(phases);
        let mut productions = book.productions();
        let missions = book.missions();

        self.validate_references(&productions, &missions)?;
        self.check_cycles(&productions)?;
        self.check_planned(&productions)?;

        // Fixed point: each pass can only raise start days, and the graph is
        // acyclic, so the loop ends after at most depth + 1 passes.
        loop {
            let completions = self.completion_days(&productions);
            let mut changed = false;

            for (start, request) in &mut productions {
                let Some(chain) = self.catalog.chain(request.chain.as_str()) else {
                    continue;
                };
                let earliest = chain
                    .prerequisites
                    .iter()
                    .filter_map(|p| completions.get(p))
                    .copied()
                    .max()
                    .unwrap_or(0);
                if earliest > *start {
                    debug!(
                        chain = %request.chain,
                        from = *start,
                        to = earliest,
                        "Raising start day to satisfy prerequisites"
                    );
                    *start = earliest;
                    changed = true;
                }
            }

            if !changed {
                break;
            }
        }

        Ok(PhaseBook::rebuild(productions, missions).into_phases())
    }

    fn validate_references(
        &self,
        productions: &[(Day, ProductionRequest)],
        missions: &[(Day, MissionId)],
    ) -> Result<()> {
        for (_, request) in productions {
            if self.catalog.chain(request.chain.as_str()).is_none() {
                warn!(chain = %request.chain, "Plan references unknown chain");
                return Err(ConfigurationError::UnknownChain(request.chain.clone()).into());
            }
        }
        for (_, mission) in missions {
            if self.catalog.mission(mission.as_str()).is_none() {
                warn!(mission = %mission, "Plan references unknown mission profile");
                return Err(ConfigurationError::UnknownMission(mission.clone()).into());
            }
        }
        Ok(())
    }

    /// Depth-first search over the prerequisite graph reachable from the plan.
    fn check_cycles(&self, productions: &[(Day, ProductionRequest)]) -> Result<()> {
        let roots: BTreeSet<&ChainId> = productions.iter().map(|(_, r)| &r.chain).collect();
        let mut done: BTreeSet<ChainId> = BTreeSet::new();
        let mut path: Vec<ChainId> = Vec::new();

        for root in roots {
            self.visit(root, &mut path, &mut done)?;
        }
        Ok(())
    }

    fn visit(&self, id: &ChainId, path: &mut Vec<ChainId>, done: &mut BTreeSet<ChainId>) -> Result<()> {
        if done.contains(id) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|p| p == id) {
            let mut cycle = path[pos..].to_vec();
            cycle.push(id.clone());
            warn!(?cycle, "Prerequisite cycle detected");
            return Err(ConfigurationError::PrerequisiteCycle(cycle).into());
        }

        let Some(chain) = self.catalog.chain(id.as_str()) else {
            // Reached only through a prerequisite edge; roots are validated.
            let dependent = path.last().cloned().unwrap_or_else(|| id.clone());
            return Err(ConfigurationError::UnknownPrerequisite {
                chain: dependent,
                prerequisite: id.clone(),
            }
            .into());
        };

        path.push(id.clone());
        for prerequisite in &chain.prerequisites {
            self.visit(prerequisite, path, done)?;
        }
        path.pop();
        done.insert(id.clone());
        Ok(())
    }

    fn check_planned(&self, productions: &[(Day, ProductionRequest)]) -> Result<()> {
        let planned: BTreeSet<&ChainId> = productions.iter().map(|(_, r)| &r.chain).collect();

        for (_, request) in productions {
            let Some(chain) = self.catalog.chain(request.chain.as_str()) else {
                continue;
            };
            for prerequisite in &chain.prerequisites {
                if !planned.contains(prerequisite) && !self.established.contains_key(prerequisite) {
                    warn!(
                        chain = %request.chain,
                        prerequisite = %prerequisite,
                        "Prerequisite never produced by the plan"
                    );
                    return Err(ConfigurationError::UnplannedPrerequisite {
                        chain: request.chain.clone(),
                        prerequisite: prerequisite.clone(),
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Latest completion day per chain across all requests and established entries.
    fn completion_days(&self, productions: &[(Day, ProductionRequest)]) -> BTreeMap<ChainId, Day> {
        let mut completions = self.established.clone();
        for (start, request) in productions {
            let Some(chain) = self.catalog.chain(request.chain.as_str()) else {
                continue;
            };
            let done = start.saturating_add(chain.duration_days);
            let entry = completions.entry(request.chain.clone()).or_insert(done);
            *entry = (*entry).max(done);
        }
        completions
    }
}
