//! Error types for the simulation engine.
//!
//! Hard errors abort a run before any day is simulated. Soft conditions
//! (input shortfalls, capacity warnings) are never errors; they are
//! reported as [`Bottleneck`](crate::analyzer::Bottleneck) data.

use thiserror::Error;

use crate::catalog::{ChainId, MissionId};

/// Result type alias using [`EngineError`].
pub type Result<T> = std::result::Result<T, EngineError>;

/// Top-level error type for all engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The development plan or prerequisite graph is invalid.
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Data file parsing error.
    #[error("Failed to parse data '{source_name}': {message}")]
    DataParse {
        /// Name of the document that failed to parse.
        source_name: String,
        /// Error message.
        message: String,
    },

    /// Two catalog entries share an id.
    #[error("Duplicate {kind} id in catalog: {id}")]
    DuplicateDefinition {
        /// Entry kind ("chain" or "mission").
        kind: &'static str,
        /// The duplicated id.
        id: String,
    },

    /// A catalog entry carries a negative amount.
    #[error("Negative quantity in {kind} '{id}': {field}")]
    NegativeQuantity {
        /// Entry kind ("chain" or "mission").
        kind: &'static str,
        /// The entry id.
        id: String,
        /// The offending field, e.g. `inputs.water`.
        field: String,
    },

    /// A seeded active record names an id absent from the catalog.
    #[error("Active record references unknown {kind}: {id}")]
    InvalidReference {
        /// Record kind ("chain" or "mission").
        kind: &'static str,
        /// The unknown id.
        id: String,
    },

    /// Invalid engine state (e.g. a result failed to encode).
    #[error("Invalid engine state: {0}")]
    InvalidState(String),
}

impl EngineError {
    /// The configuration cause, if this is a configuration error.
    #[must_use]
    pub fn as_configuration(&self) -> Option<&ConfigurationError> {
        match self {
            Self::Configuration(cause) => Some(cause),
            _ => None,
        }
    }
}

/// Hard plan errors detected at resolution time.
///
/// Each variant is a distinct cause so a calling planner can correct the
/// plan and retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// A plan request names a chain absent from the catalog.
    #[error("plan references unknown chain '{0}'")]
    UnknownChain(ChainId),

    /// A plan names a mission profile absent from the catalog.
    #[error("plan references unknown mission profile '{0}'")]
    UnknownMission(MissionId),

    /// A chain lists a prerequisite absent from the catalog.
    #[error("chain '{chain}' requires unknown chain '{prerequisite}'")]
    UnknownPrerequisite {
        /// The dependent chain.
        chain: ChainId,
        /// The missing prerequisite id.
        prerequisite: ChainId,
    },

    /// A prerequisite exists in the catalog but nothing in the plan produces it.
    #[error("chain '{chain}' requires '{prerequisite}', which the plan never produces")]
    UnplannedPrerequisite {
        /// The dependent chain.
        chain: ChainId,
        /// The prerequisite with no producing request.
        prerequisite: ChainId,
    },

    /// The prerequisite graph contains a cycle.
    #[error("prerequisite cycle: {}", format_cycle(.0))]
    PrerequisiteCycle(Vec<ChainId>),
}

fn format_cycle(path: &[ChainId]) -> String {
    path.iter()
        .map(ChainId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display_lists_path() {
        let err = ConfigurationError::PrerequisiteCycle(vec![
            ChainId::from("a"),
            ChainId::from("b"),
            ChainId::from("a"),
        ]);
        assert_eq!(err.to_string(), "prerequisite cycle: a -> b -> a");
    }

    #[test]
    fn test_configuration_errors_convert() {
        let err: EngineError = ConfigurationError::UnknownChain(ChainId::from("x")).into();
        assert!(matches!(
            err.as_configuration(),
            Some(ConfigurationError::UnknownChain(id)) if id.as_str() == "x"
        ));
        assert_eq!(
            err.to_string(),
            "Configuration error: plan references unknown chain 'x'"
        );
    }
}
