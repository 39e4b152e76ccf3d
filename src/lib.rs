// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # deepvis - receptive fields and max activations for convolutional networks
//!
//! deepvis answers "which part of the input could have influenced this unit?"
//! for chains of convolution and pooling layers, and keeps track of the
//! strongest activations of each unit over a dataset so the corresponding
//! input patches can be cut out.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! deepvis = "0.1"
//! ```
//!
//! ```rust
//! use deepvis::prelude::*;
//!
//! let computer = RegionComputer::new(&alexnet_chains())?;
//! let region = computer.convert_region("conv5", "data", Region::unit(6, 6), true)?;
//! assert_eq!(region, Region::new(32, 195, 32, 195));
//! # Ok::<(), RegionError>(())
//! ```
//!
//! ## Crates
//!
//! - **`config`**: TOML configuration with env/CLI overrides
//! - **`observability`**: logging initialisation and per-crate debug flags
//! - **`receptive_field`**: region projection along layer chains
//! - **`max_tracker`**: top-N activations per unit and patch placement
//!
//! ## License
//!
//! Apache-2.0

// Re-export foundation
pub use deepvis_config as config;

// Re-export infrastructure
pub use deepvis_observability as observability;

// Re-export algorithms
pub use deepvis_max_tracker as max_tracker;
pub use deepvis_receptive_field as receptive_field;

use deepvis_config::{DeepvisConfig, LoggingConfig};
use deepvis_observability::{LogFormat, LoggingOptions};
use deepvis_receptive_field::{RegionComputer, RegionResult};

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::config::{alexnet_chains, ChainSpec, DeepvisConfig, LayerSpec};
    pub use crate::max_tracker::{locate_max_patch, MaxEntry, MaxTracker, NetMaxTracker};
    pub use crate::receptive_field::{Extent, Region, RegionComputer, RegionError};
}

/// Build the region computer for the chains in `config`.
pub fn region_computer(config: &DeepvisConfig) -> RegionResult<RegionComputer> {
    RegionComputer::new(&config.region.chains)
}

/// Logging options for [`deepvis_observability::init_logging`] from the
/// `[logging]` section. Any format other than `json` logs as text.
pub fn logging_options(config: &LoggingConfig) -> LoggingOptions {
    let format = if config.format.eq_ignore_ascii_case("json") {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    LoggingOptions {
        level: config.level.clone(),
        format,
        file_logging: config.file_logging,
        log_dir: config.log_dir.clone(),
        retention_days: config.retention_days,
        retention_runs: config.retention_runs,
    }
}
