//! Data validation utilities.
//!
//! Checks catalog documents for cross-reference errors that would only
//! surface later as plan resolution failures, and checks that every
//! scenario in `scenarios/` names a loadable catalog and a resolvable plan.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use rfse_core::catalog::Catalog;
use rfse_core::data::CatalogData;
use rfse_core::error::ConfigurationError;
use rfse_core::plan::DevelopmentPhase;
use tracing::{debug, info, warn};

use crate::scenario::{read_file, Result, Scenario};

/// A single problem found in a data file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    /// The document could not be parsed or loaded.
    Load(String),
    /// A chain lists a prerequisite absent from the catalog.
    UnknownPrerequisite {
        /// The dependent chain.
        chain: String,
        /// The missing prerequisite id.
        prerequisite: String,
    },
    /// A chain lists itself as a prerequisite.
    SelfDependency(String),
    /// A chain or mission carries a negative amount.
    NegativeQuantity {
        /// Chain or mission id.
        subject: String,
        /// The offending field, e.g. `inputs.water`.
        field: String,
    },
    /// The prerequisite graph contains a cycle.
    Cycle(Vec<String>),
    /// A scenario's plan or seeded records do not fit its catalog.
    Scenario(String),
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(message) | Self::Scenario(message) => f.write_str(message),
            Self::UnknownPrerequisite {
                chain,
                prerequisite,
            } => write!(f, "chain '{chain}' requires unknown chain '{prerequisite}'"),
            Self::SelfDependency(chain) => write!(f, "chain '{chain}' requires itself"),
            Self::NegativeQuantity { subject, field } => {
                write!(f, "'{subject}' has a negative quantity in {field}")
            }
            Self::Cycle(path) => write!(f, "prerequisite cycle: {}", path.join(" -> ")),
        }
    }
}

/// Issues found in one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// The file checked.
    pub path: PathBuf,
    /// Problems found (empty when the file is valid).
    pub issues: Vec<ValidationIssue>,
}

/// Outcome of validating a data directory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// One entry per file checked, in path order.
    pub files: Vec<FileReport>,
}

impl ValidationReport {
    /// True if no file has issues.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.files.iter().all(|file| file.issues.is_empty())
    }

    /// Total number of issues across all files.
    #[must_use]
    pub fn issue_count(&self) -> usize {
        self.files.iter().map(|file| file.issues.len()).sum()
    }
}

/// Check a parsed catalog document for cross-reference errors.
///
/// Negative amounts, unknown prerequisites, and self-dependencies are read
/// straight from the document. Cycles are detected by resolving a plan that
/// requests every chain once, which only runs when the simpler checks pass.
#[must_use]
pub fn validate_catalog(data: &CatalogData) -> Vec<ValidationIssue> {
    let known: BTreeSet<&str> = data.chains.iter().map(|c| c.id.as_str()).collect();
    let mut issues = Vec::new();

    for chain in &data.chains {
        if let Some(field) = chain.to_chain().negative_field() {
            issues.push(ValidationIssue::NegativeQuantity {
                subject: chain.id.clone(),
                field,
            });
        }
        if chain.requires(&chain.id) {
            issues.push(ValidationIssue::SelfDependency(chain.id.clone()));
        }
        for prerequisite in &chain.prerequisites {
            if prerequisite != &chain.id && !known.contains(prerequisite.as_str()) {
                issues.push(ValidationIssue::UnknownPrerequisite {
                    chain: chain.id.clone(),
                    prerequisite: prerequisite.clone(),
                });
            }
        }
    }
    for mission in &data.missions {
        if let Some(field) = mission.to_profile().negative_field() {
            issues.push(ValidationIssue::NegativeQuantity {
                subject: mission.id.clone(),
                field,
            });
        }
    }
    if !issues.is_empty() {
        return issues;
    }

    let catalog = match data.clone().into_catalog() {
        Ok(catalog) => catalog,
        Err(e) => return vec![ValidationIssue::Load(e.to_string())],
    };
    let everything = catalog
        .chains()
        .fold(DevelopmentPhase::new(0), |phase, chain| {
            phase.with_production(chain.id.clone(), 1)
        });

    if let Err(e) = rfse_core::resolver::resolve(&catalog, &[everything]) {
        match e.as_configuration() {
            Some(ConfigurationError::PrerequisiteCycle(path)) => issues.push(ValidationIssue::Cycle(
                path.iter().map(|id| id.as_str().to_string()).collect(),
            )),
            _ => issues.push(ValidationIssue::Load(e.to_string())),
        }
    }
    issues
}

/// Check a scenario against the catalog it names.
#[must_use]
pub fn validate_scenario(scenario: &Scenario) -> Vec<ValidationIssue> {
    let catalog = match scenario.load_catalog() {
        Ok(catalog) => catalog,
        Err(e) => return vec![ValidationIssue::Load(e.to_string())],
    };
    check_scenario_against(scenario, &catalog)
}

fn check_scenario_against(scenario: &Scenario, catalog: &Catalog) -> Vec<ValidationIssue> {
    match scenario.scheduler(catalog) {
        Ok(_) => Vec::new(),
        Err(e) => vec![ValidationIssue::Scenario(e.to_string())],
    }
}

fn ron_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "ron"))
        .collect();
    files.sort();
    Ok(files)
}

fn validate_catalog_file(path: &Path) -> Vec<ValidationIssue> {
    let contents = match read_file(path) {
        Ok(contents) => contents,
        Err(e) => return vec![ValidationIssue::Load(e.to_string())],
    };
    match CatalogData::from_ron_str(&path.display().to_string(), &contents) {
        Ok(data) => validate_catalog(&data),
        Err(e) => vec![ValidationIssue::Load(e.to_string())],
    }
}

/// Validate all RON data files in a directory.
///
/// Top-level `*.ron` files are catalogs; `scenarios/*.ron` are scenarios.
///
/// # Errors
///
/// Returns an error if the directory cannot be read. Problems inside files
/// are reported in the [`ValidationReport`], not as errors.
pub fn validate_data_directory(path: &Path) -> Result<ValidationReport> {
    let mut report = ValidationReport::default();

    for file in ron_files(path)? {
        debug!(path = %file.display(), "Validating catalog");
        let issues = validate_catalog_file(&file);
        report.files.push(FileReport { path: file, issues });
    }

    let scenario_dir = path.join("scenarios");
    if scenario_dir.is_dir() {
        for file in ron_files(&scenario_dir)? {
            debug!(path = %file.display(), "Validating scenario");
            let issues = match Scenario::load(&file) {
                Ok(scenario) => validate_scenario(&scenario),
                Err(e) => vec![ValidationIssue::Load(e.to_string())],
            };
            report.files.push(FileReport { path: file, issues });
        }
    }

    for file in &report.files {
        for issue in &file.issues {
            warn!(path = %file.path.display(), "{issue}");
        }
    }
    info!(
        files = report.files.len(),
        issues = report.issue_count(),
        "Validation complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> CatalogData {
        CatalogData::from_ron_str("test", text).unwrap()
    }

    #[test]
    fn test_clean_catalog_has_no_issues() {
        let data = parse(
            r#"(chains: [
                (id: "mine", outputs: { "ore": 1 }),
                (id: "mill", inputs: { "ore": 2 }, outputs: { "metal": 1 }, duration_days: 1, prerequisites: ["mine"]),
            ])"#,
        );
        assert!(validate_catalog(&data).is_empty());
    }

    #[test]
    fn test_unknown_and_self_prerequisites() {
        let data = parse(
            r#"(chains: [
                (id: "mine", prerequisites: ["mine"]),
                (id: "mill", prerequisites: ["forge"]),
            ])"#,
        );
        let issues = validate_catalog(&data);
        assert_eq!(
            issues,
            vec![
                ValidationIssue::SelfDependency("mine".into()),
                ValidationIssue::UnknownPrerequisite {
                    chain: "mill".into(),
                    prerequisite: "forge".into(),
                },
            ]
        );
    }

    #[test]
    fn test_negative_amounts_flagged() {
        let data = parse(
            r#"(
                chains: [(id: "leak", inputs: { "water": -5 }, outputs: { "metal": 1 })],
                missions: [(id: "refund", duration_days: 1, fuel_cost: -2)],
            )"#,
        );
        assert_eq!(
            validate_catalog(&data),
            vec![
                ValidationIssue::NegativeQuantity {
                    subject: "leak".into(),
                    field: "inputs.water".into(),
                },
                ValidationIssue::NegativeQuantity {
                    subject: "refund".into(),
                    field: "fuel_cost".into(),
                },
            ]
        );
    }

    #[test]
    fn test_cycle_detected() {
        let data = parse(
            r#"(chains: [
                (id: "a", prerequisites: ["b"]),
                (id: "b", prerequisites: ["a"]),
            ])"#,
        );
        let issues = validate_catalog(&data);
        assert_eq!(issues.len(), 1);
        assert!(matches!(&issues[0], ValidationIssue::Cycle(path) if path.len() >= 2));
    }

    #[test]
    fn test_duplicate_ids_reported_as_load_issue() {
        let data = parse(r#"(chains: [(id: "a"), (id: "a")])"#);
        let issues = validate_catalog(&data);
        assert!(matches!(&issues[..], [ValidationIssue::Load(msg)] if msg.contains("Duplicate")));
    }

    #[test]
    fn test_issue_display() {
        let issue = ValidationIssue::Cycle(vec!["a".into(), "b".into(), "a".into()]);
        assert_eq!(issue.to_string(), "prerequisite cycle: a -> b -> a");
    }
}
