// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! This module provides validation logic to ensure configuration values are
//! consistent, within valid ranges, and don't conflict with each other.

use ahash::{AHashMap, AHashSet};

use crate::{ChainSpec, ConfigError, ConfigResult, DeepvisConfig, MIN_CHAIN_LEN};

/// Log levels understood by the logging initialiser
const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const LOG_FORMATS: &[&str] = &["text", "json"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    NoChains,
    ChainTooShort { chain: usize, len: usize },
    InvalidLayer { chain: usize, layer: String, reason: String },
    DuplicateLayer { name: String, first_chain: usize, second_chain: usize },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoChains => write!(f, "region.chains must contain at least one chain"),
            Self::ChainTooShort { chain, len } => {
                write!(
                    f,
                    "Chain {} has {} layer(s), at least {} are required",
                    chain, len, MIN_CHAIN_LEN
                )
            }
            Self::InvalidLayer { chain, layer, reason } => {
                write!(f, "Chain {} layer '{}': {}", chain, layer, reason)
            }
            Self::DuplicateLayer {
                name,
                first_chain,
                second_chain,
            } => {
                write!(
                    f,
                    "Layer '{}' appears in chain {} and chain {}; only root layers may be shared",
                    name, first_chain, second_chain
                )
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Chain structure (length, geometry arity, unique non-root names)
/// - Tracker settings (positive top N, conv layers resolvable in a chain)
/// - Known log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every problem found
pub fn validate_config(config: &DeepvisConfig) -> ConfigResult<()> {
    let mut errors = validate_chains(&config.region.chains);

    validate_tracker(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

/// Check chain specifications without building anything from them.
///
/// Every non-root name must be unique across all chains and may not repeat
/// its own chain's root. Roots may be shared between chains.
pub fn validate_chains(chains: &[ChainSpec]) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();

    if chains.is_empty() {
        errors.push(ConfigValidationError::NoChains);
        return errors;
    }

    let mut seen: AHashMap<&str, usize> = AHashMap::new();

    for (chain_idx, chain) in chains.iter().enumerate() {
        if chain.layers.len() < MIN_CHAIN_LEN {
            errors.push(ConfigValidationError::ChainTooShort {
                chain: chain_idx,
                len: chain.layers.len(),
            });
        }

        for layer in &chain.layers {
            if let Err(e) = layer.geometry_components() {
                errors.push(ConfigValidationError::InvalidLayer {
                    chain: chain_idx,
                    layer: layer.name.clone(),
                    reason: e.to_string(),
                });
            }
        }

        let root = chain.root();
        for layer in chain.layers.iter().skip(1) {
            if Some(layer.name.as_str()) == root {
                errors.push(ConfigValidationError::InvalidLayer {
                    chain: chain_idx,
                    layer: layer.name.clone(),
                    reason: "repeats the chain's root layer".to_string(),
                });
                continue;
            }
            if let Some(&first_chain) = seen.get(layer.name.as_str()) {
                errors.push(ConfigValidationError::DuplicateLayer {
                    name: layer.name.clone(),
                    first_chain,
                    second_chain: chain_idx,
                });
            } else {
                seen.insert(layer.name.as_str(), chain_idx);
            }
        }
    }

    errors
}

fn validate_tracker(config: &DeepvisConfig, errors: &mut Vec<ConfigValidationError>) {
    let tracker = &config.tracker;

    if tracker.top_n == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "tracker.top_n".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if tracker.input_layer.is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "tracker.input_layer".to_string(),
        });
    }

    let known: AHashSet<&str> = config
        .region
        .chains
        .iter()
        .flat_map(|chain| chain.layers.iter().map(|layer| layer.name.as_str()))
        .collect();

    let mut tracked = AHashSet::new();
    for layer in &tracker.layers {
        if !tracked.insert(layer.name.as_str()) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "tracker.layers".to_string(),
                reason: format!("layer '{}' is listed twice", layer.name),
            });
        }
        // max patches are only located for conv layers
        if layer.is_conv && !known.contains(layer.name.as_str()) {
            errors.push(ConfigValidationError::InvalidValue {
                field: "tracker.layers".to_string(),
                reason: format!("conv layer '{}' is not part of any region chain", layer.name),
            });
        }
    }
}

fn validate_logging(config: &DeepvisConfig, errors: &mut Vec<ConfigValidationError>) {
    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }

    let format = config.logging.format.to_lowercase();
    if !LOG_FORMATS.contains(&format.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.format".to_string(),
            reason: format!("must be one of {}", LOG_FORMATS.join(", ")),
        });
    }
}
