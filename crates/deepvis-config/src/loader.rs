// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, DeepvisConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "deepvis_configuration.toml";

/// Find the deepvis configuration file
///
/// Search order:
/// 1. `DEEPVIS_CONFIG_PATH` environment variable
/// 2. Current working directory: `./deepvis_configuration.toml`
/// 3. Parent directories (searches up to 5 levels)
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("DEEPVIS_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by DEEPVIS_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "deepvis configuration file '{}' not found in any of these locations:\n{}\n\nSet DEEPVIS_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if config file is not found or contains invalid TOML.
/// Semantic checks are left to [`crate::validate_config`].
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<DeepvisConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: DeepvisConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

fn parse_flag(value: &str) -> bool {
    let value = value.to_lowercase();
    value == "true" || value == "1" || value == "yes"
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `DEEPVIS_LOG_LEVEL` -> `logging.level`
/// - `DEEPVIS_LOG_FORMAT` -> `logging.format`
/// - `DEEPVIS_LOG_DIR` -> `logging.log_dir`
/// - `DEEPVIS_FILE_LOGGING` -> `logging.file_logging`
/// - `DEEPVIS_TOP_N` -> `tracker.top_n`
/// - `DEEPVIS_NORMALIZE_LAST` -> `region.normalize_last`
pub fn apply_environment_overrides(config: &mut DeepvisConfig) {
    if let Ok(value) = env::var("DEEPVIS_LOG_LEVEL") {
        config.logging.level = value;
    }
    if let Ok(value) = env::var("DEEPVIS_LOG_FORMAT") {
        config.logging.format = value;
    }
    if let Ok(value) = env::var("DEEPVIS_LOG_DIR") {
        config.logging.log_dir = PathBuf::from(value);
    }
    if let Ok(value) = env::var("DEEPVIS_FILE_LOGGING") {
        config.logging.file_logging = parse_flag(&value);
    }

    if let Ok(value) = env::var("DEEPVIS_TOP_N") {
        if let Ok(top_n) = value.parse::<usize>() {
            config.tracker.top_n = top_n;
        }
    }

    if let Ok(value) = env::var("DEEPVIS_NORMALIZE_LAST") {
        config.region.normalize_last = parse_flag(&value);
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"top_n": "16", "log_level": "debug"}`)
pub fn apply_cli_overrides(config: &mut DeepvisConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("log_level") {
        config.logging.level = value.clone();
    }
    if let Some(value) = cli_args.get("log_format") {
        config.logging.format = value.clone();
    }
    if let Some(value) = cli_args.get("log_dir") {
        config.logging.log_dir = PathBuf::from(value);
    }

    if let Some(value) = cli_args.get("top_n") {
        if let Ok(top_n) = value.parse::<usize>() {
            config.tracker.top_n = top_n;
        }
    }
    if let Some(value) = cli_args.get("input_layer") {
        config.tracker.input_layer = value.clone();
    }

    if let Some(value) = cli_args.get("normalize_last") {
        config.region.normalize_last = parse_flag(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LayerKind;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("DEEPVIS_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("DEEPVIS_CONFIG_PATH");

        assert!(result.is_ok());
        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("absent.toml");

        env::set_var("DEEPVIS_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("DEEPVIS_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_two_chain_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        env::remove_var("DEEPVIS_TOP_N");
        env::remove_var("DEEPVIS_NORMALIZE_LAST");
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[region]").unwrap();
        writeln!(file, "normalize_last = true").unwrap();
        writeln!(file, "[[region.chains]]").unwrap();
        writeln!(file, "layers = [").unwrap();
        writeln!(file, "  {{ name = \"data\" }},").unwrap();
        writeln!(
            file,
            "  {{ name = \"conv1\", kind = \"conv\", params = [[32, 32], [32, 32], [3, 3], [1, 1], [1, 1]] }},"
        )
        .unwrap();
        writeln!(file, "]").unwrap();
        writeln!(file, "[[region.chains]]").unwrap();
        writeln!(file, "layers = [").unwrap();
        writeln!(file, "  {{ name = \"data\" }},").unwrap();
        writeln!(
            file,
            "  {{ name = \"pool_a\", kind = \"pool\", params = [[32, 32], [16, 16], [2, 2], [2, 2]] }},"
        )
        .unwrap();
        writeln!(file, "]").unwrap();
        writeln!(file, "[tracker]").unwrap();
        writeln!(file, "top_n = 4").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert!(config.region.normalize_last);
        assert_eq!(config.region.chains.len(), 2);
        assert_eq!(config.region.chains[1].layers[1].kind, Some(LayerKind::Pool));
        assert_eq!(config.tracker.top_n, 4);
        assert_eq!(config.tracker.input_layer, "data");
    }

    #[test]
    fn test_load_invalid_toml() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[[region.chains]]").unwrap();
        writeln!(file, "layers = [{{ name = \"data\", kind = \"deconv\" }}]").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = DeepvisConfig::default();

        env::set_var("DEEPVIS_TOP_N", "25");
        env::set_var("DEEPVIS_NORMALIZE_LAST", "yes");
        env::set_var("DEEPVIS_LOG_LEVEL", "debug");

        apply_environment_overrides(&mut config);

        env::remove_var("DEEPVIS_TOP_N");
        env::remove_var("DEEPVIS_NORMALIZE_LAST");
        env::remove_var("DEEPVIS_LOG_LEVEL");

        assert_eq!(config.tracker.top_n, 25);
        assert!(config.region.normalize_last);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = DeepvisConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("top_n".to_string(), "3".to_string());
        cli_args.insert("input_layer".to_string(), "pool1".to_string());
        cli_args.insert("top_n_typo".to_string(), "100".to_string());
        cli_args.insert("log_format".to_string(), "json".to_string());

        apply_cli_overrides(&mut config, &cli_args);

        assert_eq!(config.logging.format, "json");
        assert_eq!(config.tracker.top_n, 3);
        assert_eq!(config.tracker.input_layer, "pool1");
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[tracker]").unwrap();
        writeln!(file, "top_n = 5").unwrap();
        writeln!(file, "[logging]").unwrap();
        writeln!(file, "level = \"warn\"").unwrap();

        env::set_var("DEEPVIS_TOP_N", "7");
        env::set_var("DEEPVIS_LOG_LEVEL", "debug");

        let mut cli_args = HashMap::new();
        cli_args.insert("top_n".to_string(), "11".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args)).unwrap();

        env::remove_var("DEEPVIS_TOP_N");
        env::remove_var("DEEPVIS_LOG_LEVEL");

        // CLI wins for top_n, env wins for level (no CLI override)
        assert_eq!(config.tracker.top_n, 11);
        assert_eq!(config.logging.level, "debug");
    }
}
