// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for receptive field computation.
*/

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Result type for region operations
pub type RegionResult<T> = Result<T, RegionError>;

/// Errors that can occur while building a [`crate::RegionComputer`] or
/// projecting a region
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    #[error("Invalid chain configuration: {0}")]
    Configuration(String),

    #[error("Layer not found in any chain: {0}")]
    NotFound(String),

    #[error("Cannot project forward from '{from}' to later layer '{to}'")]
    Order { from: String, to: String },

    #[error("Degenerate region {region} {context}")]
    DegenerateRegion {
        region: Region,
        context: &'static str,
    },
}

impl From<deepvis_config::ConfigError> for RegionError {
    fn from(err: deepvis_config::ConfigError) -> Self {
        RegionError::Configuration(err.to_string())
    }
}

/// Spatial size of a feature map as (height, width).
///
/// Kernel, stride and pad pairs use the same shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent {
    pub height: u32,
    pub width: u32,
}

impl Extent {
    pub const fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Same value on both axes
    pub const fn square(side: u32) -> Self {
        Self::new(side, side)
    }
}

impl From<[u32; 2]> for Extent {
    fn from(pair: [u32; 2]) -> Self {
        Self::new(pair[0], pair[1])
    }
}

impl From<(u32, u32)> for Extent {
    fn from((height, width): (u32, u32)) -> Self {
        Self::new(height, width)
    }
}

impl Display for Extent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

/// Half-open slice `(row_start, row_end, col_start, col_end)` of a feature map.
///
/// Coordinates are signed: an unclamped projection through a padded layer can
/// start before zero or end past the layer's extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub row_start: i64,
    pub row_end: i64,
    pub col_start: i64,
    pub col_end: i64,
}

impl Region {
    pub const fn new(row_start: i64, row_end: i64, col_start: i64, col_end: i64) -> Self {
        Self {
            row_start,
            row_end,
            col_start,
            col_end,
        }
    }

    /// The single unit at `(row, col)`
    pub const fn unit(row: i64, col: i64) -> Self {
        Self::new(row, row + 1, col, col + 1)
    }

    /// The whole of a feature map
    pub const fn full(extent: Extent) -> Self {
        Self::new(0, extent.height as i64, 0, extent.width as i64)
    }

    /// `start < end` on both axes
    pub fn is_valid(&self) -> bool {
        self.row_start < self.row_end && self.col_start < self.col_end
    }

    pub fn height(&self) -> i64 {
        self.row_end - self.row_start
    }

    pub fn width(&self) -> i64 {
        self.col_end - self.col_start
    }

    /// Clamp every coordinate into `[0, extent]` on its axis
    pub fn crop(&self, extent: Extent) -> Self {
        let rows = extent.height as i64;
        let cols = extent.width as i64;
        Self::new(
            self.row_start.clamp(0, rows),
            self.row_end.clamp(0, rows),
            self.col_start.clamp(0, cols),
            self.col_end.clamp(0, cols),
        )
    }

    /// Whether this region lies within `other` (inclusive bounds)
    pub fn is_within(&self, other: &Region) -> bool {
        self.row_start >= other.row_start
            && self.row_end <= other.row_end
            && self.col_start >= other.col_start
            && self.col_end <= other.col_end
    }

    pub fn as_tuple(&self) -> (i64, i64, i64, i64) {
        (self.row_start, self.row_end, self.col_start, self.col_end)
    }
}

impl From<(i64, i64, i64, i64)> for Region {
    fn from((row_start, row_end, col_start, col_end): (i64, i64, i64, i64)) -> Self {
        Self::new(row_start, row_end, col_start, col_end)
    }
}

impl From<Region> for (i64, i64, i64, i64) {
    fn from(region: Region) -> Self {
        region.as_tuple()
    }
}

impl Display for Region {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {}, {})",
            self.row_start, self.row_end, self.col_start, self.col_end
        )
    }
}
