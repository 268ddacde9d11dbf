//! Integration tests for scenario loading, validation, and comparison.

use std::fs;
use std::path::{Path, PathBuf};

use rfse_core::math::Quantity;
use rfse_core::optimizer::FlowOptimizer;
use rfse_core::resolver::resolve;
use rfse_test_utils::fixtures::{settlement_catalog, settlement_plan};
use rfse_tools::compare::{compare_scenarios, Outcome};
use rfse_tools::report::{save_json, RunSummary};
use rfse_tools::validate::{validate_data_directory, ValidationIssue};
use rfse_tools::{Scenario, ToolError};
use tempfile::tempdir;

fn assets_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data")
}

const CATALOG: &str = r#"CatalogData(
    chains: [
        (id: "mine", outputs: { "ore": 5 }),
        (id: "mill", inputs: { "ore": 8 }, outputs: { "metal": 2 }, duration_days: 2, prerequisites: ["mine"]),
    ],
    missions: [
        (id: "scout", duration_days: 3, yields: { "ore": 20 }, fuel_cost: 1),
    ],
)"#;

const SCENARIO: &str = r#"Scenario(
    name: "tiny",
    catalog: "catalog.ron",
    inventory: { "ore": 4, "fuel": 1 },
    plan: [
        (start_day: 0, productions: [(chain: "mine", quantity: 1), (chain: "mill", quantity: 1)], missions: ["scout"]),
    ],
    horizon_days: 5,
)"#;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

// ============================================================================
// Scenario Loading
// ============================================================================

#[test]
fn test_scenario_resolves_catalog_relative_to_file() {
    let dir = tempdir().unwrap();
    write(dir.path(), "catalog.ron", CATALOG);
    let path = write(dir.path(), "tiny.ron", SCENARIO);

    let scenario = Scenario::load(&path).unwrap();
    assert_eq!(scenario.catalog_path(), dir.path().join("catalog.ron"));

    let catalog = scenario.load_catalog().unwrap();
    let result = scenario.run(&catalog, None).unwrap();

    // mine +5 on day 0, mill takes 8 of 9 on day 2, scout returns 20 on day 3.
    assert!(result.abandoned().next().is_none());
    assert_eq!(result.final_ledger.get("ore").copied(), Some(Quantity::new(21)));
    assert_eq!(result.final_ledger.get("metal").copied(), Some(Quantity::new(2)));
    assert_eq!(result.final_ledger.get("fuel").copied().unwrap_or_default(), Quantity::ZERO);
    assert_eq!(result.completion_day, 3);
}

#[test]
fn test_missing_catalog_is_reported() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "tiny.ron", SCENARIO);
    let scenario = Scenario::load(&path).unwrap();
    assert!(matches!(scenario.load_catalog(), Err(ToolError::FileNotFound(_))));
}

#[test]
fn test_malformed_scenario_names_the_file() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "bad.ron", "Scenario(name: 3)");
    match Scenario::load(&path) {
        Err(ToolError::Parse { path: reported, .. }) => assert!(reported.ends_with("bad.ron")),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn test_invalid_plan_surfaces_engine_error() {
    let dir = tempdir().unwrap();
    write(dir.path(), "catalog.ron", CATALOG);
    let path = write(
        dir.path(),
        "broken.ron",
        r#"(name: "broken", catalog: "catalog.ron", plan: [(start_day: 0, productions: [(chain: "mill", quantity: 1)])])"#,
    );
    let scenario = Scenario::load(&path).unwrap();
    let catalog = scenario.load_catalog().unwrap();
    assert!(matches!(scenario.run(&catalog, None), Err(ToolError::Engine(_))));
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_bundled_assets_validate() {
    let report = validate_data_directory(&assets_dir()).unwrap();
    assert!(report.files.len() >= 3, "expected catalog and scenarios: {report:?}");
    assert!(report.is_valid(), "{report:?}");
}

#[test]
fn test_validation_reports_bad_files() {
    let dir = tempdir().unwrap();
    write(dir.path(), "catalog.ron", CATALOG);
    write(
        dir.path(),
        "loops.ron",
        r#"(chains: [(id: "a", prerequisites: ["b"]), (id: "b", prerequisites: ["a"]), (id: "c", prerequisites: ["c"])])"#,
    );
    write(dir.path(), "scenarios/tiny.ron", SCENARIO.replace("catalog.ron", "../catalog.ron").as_str());
    write(
        dir.path(),
        "scenarios/unknown.ron",
        r#"(name: "unknown", catalog: "../catalog.ron", plan: [(start_day: 0, missions: ["orbit"])])"#,
    );

    let report = validate_data_directory(dir.path()).unwrap();
    assert!(!report.is_valid());

    let issues_for = |name: &str| {
        report
            .files
            .iter()
            .find(|file| file.path.ends_with(name))
            .map(|file| file.issues.clone())
            .unwrap()
    };
    assert!(issues_for("catalog.ron").is_empty());
    assert_eq!(issues_for("loops.ron"), vec![ValidationIssue::SelfDependency("c".into())]);
    assert!(issues_for("tiny.ron").is_empty());
    assert!(matches!(&issues_for("unknown.ron")[..], [ValidationIssue::Scenario(msg)] if msg.contains("orbit")));
}

#[test]
fn test_validating_missing_directory_fails() {
    let dir = tempdir().unwrap();
    assert!(validate_data_directory(&dir.path().join("nope")).is_err());
}

// ============================================================================
// Bundled Scenarios
// ============================================================================

#[test]
fn test_bundled_settlement_matches_fixture() {
    let scenario = Scenario::load(assets_dir().join("scenarios/settlement.ron")).unwrap();
    let catalog = scenario.load_catalog().unwrap();
    assert_eq!(catalog, settlement_catalog());
    assert_eq!(scenario.plan, settlement_plan());

    // 3 fuel cells at 10 kW, 2 RTGs at 4.5 kW.
    assert_eq!(
        scenario.simulation_config().analyzer.available_power_kw,
        Quantity::new(39)
    );

    let result = scenario.run(&catalog, None).unwrap();
    assert_eq!(result.abandoned().count(), 0);
    assert_eq!(result.completion_day, 9);
    assert!(result.reconciles_with(&scenario.ledger().snapshot()));
}

#[test]
fn test_compare_bundled_scenarios() {
    let scenarios: Vec<Scenario> = ["settlement.ron", "lean.ron"]
        .iter()
        .map(|name| Scenario::load(assets_dir().join("scenarios").join(name)).unwrap())
        .collect();
    let catalog = scenarios[0].load_catalog().unwrap();

    let comparison = compare_scenarios(&catalog, &scenarios, None);
    assert!(comparison
        .outcomes
        .iter()
        .all(|outcome| matches!(outcome, Outcome::Completed(_))));

    let ranked = comparison.ranked();
    assert_eq!(ranked[0].scenario, "settlement");
    assert!(ranked[1].abandoned > 0);
}

#[test]
fn test_optimized_bundled_plan_still_resolves() {
    let scenario = Scenario::load(assets_dir().join("scenarios/lean.ron")).unwrap();
    let catalog = scenario.load_catalog().unwrap();
    let ledger = scenario.ledger();

    let optimized = FlowOptimizer::new(&catalog, &scenario.optimizer)
        .with_inventory(&ledger)
        .optimize(&scenario.plan)
        .unwrap();
    assert!(resolve(&catalog, &optimized).is_ok());

    let text = ron::ser::to_string_pretty(&optimized, ron::ser::PrettyConfig::default()).unwrap();
    let reparsed: Vec<rfse_core::plan::DevelopmentPhase> = ron::from_str(&text).unwrap();
    assert_eq!(reparsed, optimized);
}

#[test]
fn test_summary_written_as_json() {
    let scenario = Scenario::load(assets_dir().join("scenarios/settlement.ron")).unwrap();
    let catalog = scenario.load_catalog().unwrap();
    let result = scenario.run(&catalog, Some(4)).unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("summary.json");
    save_json(&RunSummary::new(&scenario.name, &result), &path).unwrap();

    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(value["scenario"], "settlement");
    assert!(value["pending"].as_u64().unwrap() > 0);
}
