//! Modular configuration loader.
//!
//! Supports loading configuration from multiple files:
//! - `config.json` - Core configuration (observability, holdings, instruments)
//! - `scenarios.json` - Stage table, replacing `portfolio.stages`
//!
//! Files are loaded from `~/.rebal/` (or `$REBAL_CONFIG_DIR`) with proper merging.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::config_dir;
use crate::error::{Error, Result, ResultExt};

/// Configuration file names
pub const CONFIG_FILES: &[&str] = &["config.json", "scenarios.json"];

/// Load a JSON file and return its contents as a Value.
/// Returns None if file doesn't exist.
fn load_json_file(path: &Path) -> Result<Option<Value>> {
    if !path.exists() {
        return Ok(None);
    }

    let content =
        fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;

    let value: Value =
        serde_json::from_str(&content).context(format!("Failed to parse {}", path.display()))?;

    Ok(Some(value))
}

/// Deep merge two JSON values.
/// Source values override target values, with object merging at each level.
fn merge_json(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target_map), Value::Object(source_map)) => {
            for (key, source_value) in source_map {
                match target_map.get_mut(&key) {
                    Some(target_value) => {
                        merge_json(target_value, source_value);
                    }
                    None => {
                        target_map.insert(key, source_value);
                    }
                }
            }
        }
        (target, source) => {
            *target = source;
        }
    }
}

/// Load modular configuration from the config directory.
///
/// Priority (lowest to highest):
/// 1. Defaults (applied by serde when the value is deserialized)
/// 2. config.json
/// 3. scenarios.json
///
/// `scenarios.json` may be either a bare array of stages or an object with a
/// `stages` key.
pub fn load_modular_config(dir: Option<PathBuf>) -> Result<Value> {
    let cfg_dir = dir.unwrap_or_else(config_dir);

    let mut config = load_json_file(&cfg_dir.join("config.json"))?
        .unwrap_or(Value::Object(Default::default()));

    if !config.is_object() {
        return Err(Error::Config("config.json must contain a JSON object".into()));
    }

    tracing::debug!("Loading modular config from {}", cfg_dir.display());

    if let Some(scenarios) = load_json_file(&cfg_dir.join("scenarios.json"))? {
        let stages = match scenarios {
            Value::Array(stages) => Value::Array(stages),
            Value::Object(mut obj) => obj.remove("stages").ok_or_else(|| {
                Error::Config("scenarios.json object must contain a `stages` key".into())
            })?,
            _ => {
                return Err(Error::Config(
                    "scenarios.json must be an array of stages".into(),
                ))
            }
        };

        let overlay = serde_json::json!({ "portfolio": { "stages": stages } });
        merge_json(&mut config, overlay);
        tracing::debug!("Loaded scenarios.json");
    }

    Ok(config)
}

/// Check which modular config files exist.
pub fn check_modular_files(dir: Option<PathBuf>) -> Vec<(String, bool)> {
    let cfg_dir = dir.unwrap_or_else(config_dir);

    CONFIG_FILES
        .iter()
        .map(|file| {
            let path = cfg_dir.join(file);
            (file.to_string(), path.exists())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_json_objects() {
        let mut target = json!({
            "portfolio": {
                "start": { "asset1": 100.0, "free_cash": 600.0 }
            }
        });

        let source = json!({
            "portfolio": {
                "start": { "free_cash": 900.0 },
                "minor_units_per_unit": 1000
            }
        });

        merge_json(&mut target, source);

        assert_eq!(target["portfolio"]["start"]["asset1"], 100.0);
        assert_eq!(target["portfolio"]["start"]["free_cash"], 900.0);
        assert_eq!(target["portfolio"]["minor_units_per_unit"], 1000);
    }

    #[test]
    fn test_merge_json_overwrite_array() {
        let mut target = json!({ "stages": [1, 2, 3] });
        merge_json(&mut target, json!({ "stages": [4] }));
        assert_eq!(target["stages"], json!([4]));
    }

    #[test]
    fn test_scenarios_file_replaces_stages() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("config.json"),
            r#"{ "portfolio": { "start": { "free_cash": 50.0 } } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("scenarios.json"),
            r#"{ "stages": [ { "outcomes": [] } ] }"#,
        )
        .unwrap();

        let value = load_modular_config(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(value["portfolio"]["start"]["free_cash"], 50.0);
        assert_eq!(value["portfolio"]["stages"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_dir_gives_empty_object() {
        let dir = tempfile::tempdir().unwrap();
        let value = load_modular_config(Some(dir.path().to_path_buf())).unwrap();
        assert_eq!(value, json!({}));

        let files = check_modular_files(Some(dir.path().to_path_buf()));
        assert!(files.iter().all(|(_, exists)| !exists));
    }

    #[test]
    fn test_scenarios_wrong_shape_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scenarios.json"), "42").unwrap();
        let err = load_modular_config(Some(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
