// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # deepvis-observability
//!
//! Logging initialisation shared by the deepvis tools.
//!
//! Provides consistent `tracing` setup across all deepvis crates with
//! per-crate debug flag support and optional JSON file logs.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

// Re-export commonly used items
pub use cli::*;
pub use config::*;
pub use init::*;

/// Known deepvis crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "deepvis",
    "deepvis-config",
    "deepvis-receptive-field",
    "deepvis-max-tracker",
    "deepvis-observability",
];

/// Tracing target for a crate name (`deepvis-max-tracker` -> `deepvis_max_tracker`)
pub fn crate_target(crate_name: &str) -> String {
    crate_name.replace('-', "_")
}
