// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `deepvis_configuration.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ConfigError, ConfigResult};

/// Number of `[height, width]` pairs a fully specified layer geometry carries:
/// input extent, output extent, kernel, stride, pad.
pub const GEOMETRY_COMPONENTS: usize = 5;

/// Input and output extents are always required.
pub const MIN_GEOMETRY_COMPONENTS: usize = 2;

/// A chain needs a root and at least one layer above it.
pub const MIN_CHAIN_LEN: usize = 2;

/// Kernel, stride and pad used when a layer entry omits them.
pub const DEFAULT_KERNEL: [u32; 2] = [1, 1];
pub const DEFAULT_STRIDE: [u32; 2] = [1, 1];
pub const DEFAULT_PAD: [u32; 2] = [0, 0];

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeepvisConfig {
    pub region: RegionConfig,
    pub tracker: TrackerConfig,
    pub logging: LoggingConfig,
}

/// Receptive field computation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RegionConfig {
    /// Layer chains, root first. Chains may share their root layer.
    pub chains: Vec<ChainSpec>,
    /// Clamp the final hop of every query to the earliest layer's extent
    pub normalize_last: bool,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self {
            chains: alexnet_chains(),
            normalize_last: false,
        }
    }
}

/// One chain of layers sharing a computational path, root to deepest.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChainSpec {
    pub layers: Vec<LayerSpec>,
}

impl ChainSpec {
    pub fn new(layers: Vec<LayerSpec>) -> Self {
        Self { layers }
    }

    /// Name of the first (root) layer, if the chain is non-empty
    pub fn root(&self) -> Option<&str> {
        self.layers.first().map(|layer| layer.name.as_str())
    }
}

/// Spatial transform performed by a layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayerKind {
    Conv,
    Pool,
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Conv => write!(f, "conv"),
            LayerKind::Pool => write!(f, "pool"),
        }
    }
}

/// A single chain entry
///
/// `params` holds `[height, width]` pairs in the order
/// `input, output, kernel, stride, pad`. Trailing pairs may be omitted and
/// fall back to [`DEFAULT_KERNEL`], [`DEFAULT_STRIDE`] and [`DEFAULT_PAD`].
/// Entries without a `kind` are pass-through layers and carry no params.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LayerSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<LayerKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Vec<[u32; 2]>>,
}

impl LayerSpec {
    /// Pass-through entry (the input layer, or any layer without a spatial transform)
    pub fn passthrough(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            params: None,
        }
    }

    pub fn conv(name: &str, params: &[[u32; 2]]) -> Self {
        Self::with_kind(name, LayerKind::Conv, params)
    }

    pub fn pool(name: &str, params: &[[u32; 2]]) -> Self {
        Self::with_kind(name, LayerKind::Pool, params)
    }

    fn with_kind(name: &str, kind: LayerKind, params: &[[u32; 2]]) -> Self {
        Self {
            name: name.to_string(),
            kind: Some(kind),
            params: Some(params.to_vec()),
        }
    }

    /// Decode the entry into its five geometry components.
    ///
    /// Returns `Ok(None)` for pass-through entries.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if a `conv`/`pool` entry has no
    /// params or the wrong number of them, or a pass-through entry has params.
    pub fn geometry_components(&self) -> ConfigResult<Option<[[u32; 2]; GEOMETRY_COMPONENTS]>> {
        let kind = match self.kind {
            Some(kind) => kind,
            None => {
                return match &self.params {
                    None => Ok(None),
                    Some(_) => Err(ConfigError::InvalidValue(format!(
                        "layer '{}' has no kind but carries geometry params",
                        self.name
                    ))),
                };
            }
        };

        let params = self.params.as_deref().ok_or_else(|| {
            ConfigError::InvalidValue(format!(
                "{} layer '{}' is missing geometry params",
                kind, self.name
            ))
        })?;

        if params.len() < MIN_GEOMETRY_COMPONENTS || params.len() > GEOMETRY_COMPONENTS {
            return Err(ConfigError::InvalidValue(format!(
                "{} layer '{}' has {} geometry components, expected {} to {}",
                kind,
                self.name,
                params.len(),
                MIN_GEOMETRY_COMPONENTS,
                GEOMETRY_COMPONENTS
            )));
        }

        let mut components = [
            [0, 0],
            [0, 0],
            DEFAULT_KERNEL,
            DEFAULT_STRIDE,
            DEFAULT_PAD,
        ];
        components[..params.len()].copy_from_slice(params);
        Ok(Some(components))
    }
}

/// The AlexNet-shaped chain used by the visualisation tooling.
///
/// `data (227x227) -> conv1 -> pool1 -> conv2 -> pool2 -> conv3 -> conv4 -> conv5`
pub fn alexnet_chains() -> Vec<ChainSpec> {
    vec![ChainSpec::new(vec![
        LayerSpec::passthrough("data"),
        LayerSpec::conv("conv1", &[[227, 227], [55, 55], [11, 11], [4, 4]]),
        LayerSpec::pool("pool1", &[[55, 55], [27, 27], [3, 3], [2, 2]]),
        LayerSpec::conv("conv2", &[[27, 27], [27, 27], [5, 5], [1, 1], [2, 2]]),
        LayerSpec::pool("pool2", &[[27, 27], [13, 13], [3, 3], [2, 2]]),
        LayerSpec::conv("conv3", &[[13, 13], [13, 13], [3, 3], [1, 1], [1, 1]]),
        LayerSpec::conv("conv4", &[[13, 13], [13, 13], [3, 3], [1, 1], [1, 1]]),
        LayerSpec::conv("conv5", &[[13, 13], [13, 13], [3, 3], [1, 1], [1, 1]]),
    ])]
}

/// Top-N activation tracking configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Number of maxima kept per unit
    pub top_n: usize,
    /// Layer the max patches are projected back to
    pub input_layer: String,
    pub layers: Vec<TrackedLayerConfig>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let conv = ["conv1", "conv2", "conv3", "conv4", "conv5"]
            .into_iter()
            .map(|name| TrackedLayerConfig {
                name: name.to_string(),
                is_conv: true,
            });
        let fc = ["fc6", "fc7", "fc8", "prob"]
            .into_iter()
            .map(|name| TrackedLayerConfig {
                name: name.to_string(),
                is_conv: false,
            });
        Self {
            top_n: 9,
            input_layer: "data".to_string(),
            layers: conv.chain(fc).collect(),
        }
    }
}

/// A layer whose activations are tracked
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TrackedLayerConfig {
    pub name: String,
    /// Convolutional layers are tracked per spatial location; fully
    /// connected layers per unit only.
    pub is_conv: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error
    pub level: String,
    /// Console format: text or json
    pub format: String,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "text".to_string(),
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_params_get_defaults() {
        let layer = LayerSpec::pool("pool1", &[[55, 55], [27, 27], [3, 3], [2, 2]]);
        let components = layer.geometry_components().unwrap().unwrap();
        assert_eq!(components[2], [3, 3]);
        assert_eq!(components[3], [2, 2]);
        assert_eq!(components[4], DEFAULT_PAD);

        let layer = LayerSpec::conv("fc", &[[6, 6], [6, 6]]);
        let components = layer.geometry_components().unwrap().unwrap();
        assert_eq!(components[2], DEFAULT_KERNEL);
        assert_eq!(components[3], DEFAULT_STRIDE);
    }

    #[test]
    fn test_passthrough_has_no_geometry() {
        let layer = LayerSpec::passthrough("data");
        assert_eq!(layer.geometry_components().unwrap(), None);
    }

    #[test]
    fn test_bad_arity_rejected() {
        let too_few = LayerSpec::conv("conv1", &[[227, 227]]);
        assert!(too_few.geometry_components().is_err());

        let too_many = LayerSpec::conv("conv1", &[[1, 1]; 6]);
        assert!(too_many.geometry_components().is_err());

        let mut missing = LayerSpec::conv("conv1", &[]);
        missing.params = None;
        assert!(missing.geometry_components().is_err());

        let mut stray = LayerSpec::passthrough("data");
        stray.params = Some(vec![[227, 227], [227, 227]]);
        assert!(stray.geometry_components().is_err());
    }

    #[test]
    fn test_alexnet_chain_shape() {
        let chains = alexnet_chains();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].root(), Some("data"));
        assert_eq!(chains[0].layers.len(), 8);
        assert_eq!(chains[0].layers[7].name, "conv5");
    }

    #[test]
    fn test_chain_toml_layout() {
        let toml_str = r#"
            [[region.chains]]
            layers = [
                { name = "data" },
                { name = "conv1", kind = "conv", params = [[227, 227], [55, 55], [11, 11], [4, 4]] },
            ]
        "#;
        let config: DeepvisConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.region.chains.len(), 1);
        let conv1 = &config.region.chains[0].layers[1];
        assert_eq!(conv1.kind, Some(LayerKind::Conv));
        assert_eq!(conv1.params.as_ref().map(Vec::len), Some(4));
        // untouched sections keep their defaults
        assert_eq!(config.tracker.top_n, 9);
    }
}
