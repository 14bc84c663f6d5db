//! Planning from configuration files on disk.

use std::fs;

use rebal_common::{Config, Validate};
use rebal_planner::{Control, PlanError, PlanReport, Planner, Problem};

const FLAT_STAGE: &str = r#"{ "outcomes": [
    { "label": "flat", "probability": 1.0,
      "returns": { "asset1": 1.0, "asset2": 1.0, "deposit": 1.0 } } ] }"#;

#[test]
fn test_plan_from_modular_directory() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("config.json"),
        r#"{
            "observability": { "log_level": "warn" },
            "portfolio": {
                "start": { "asset1": 50.0, "asset2": 400.0, "deposit": 200.0, "free_cash": 100.0 }
            }
        }"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("scenarios.json"),
        format!(r#"{{ "stages": [{FLAT_STAGE}, {FLAT_STAGE}, {FLAT_STAGE}] }}"#),
    )
    .unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    config.validate().unwrap();
    assert_eq!(config.observability.log_level, "warn");
    assert_eq!(config.portfolio.stages.len(), 3);

    let problem = Problem::from_config(&config.portfolio).unwrap();
    let mut planner = Planner::new(problem);
    let path = planner.simulate_expected_path().unwrap();

    // nothing grows, so every trade only costs commission
    assert!(path.controls().iter().all(|c| *c == Control::NOOP));
    assert_eq!(path.final_value, 75_000);

    let report = PlanReport::generate(planner.problem(), planner.stats().unwrap(), &path);
    assert_eq!(report.final_value, 750.0);
    assert_eq!(report.start.free_cash, 100.0);
}

#[test]
fn test_single_file_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plan.json");

    let mut config = Config::default();
    config.portfolio.start.free_cash = 0.0;
    fs::write(&path, config.to_json().unwrap()).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.portfolio.start.free_cash, 0.0);
    assert_eq!(loaded.portfolio.assets.asset2.step, 200.0);
    assert!(Problem::from_config(&loaded.portfolio).is_ok());
}

#[test]
fn test_invalid_scenario_table_rejected_before_solve() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("scenarios.json"),
        format!("[{FLAT_STAGE}, {FLAT_STAGE}]"),
    )
    .unwrap();

    let config = Config::load_from_dir(dir.path()).unwrap();
    assert!(config.validate().is_err());
    let err = Problem::from_config(&config.portfolio).unwrap_err();
    assert!(matches!(err, PlanError::InvalidConfig(_)));
}

#[test]
fn test_malformed_json_reports_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    fs::write(&path, "{ not json").unwrap();

    let err = Config::load_from(&path).unwrap_err();
    assert!(err.to_string().contains("broken.json"));
}
