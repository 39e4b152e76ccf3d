// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Core types for max tracking.
*/

use deepvis_receptive_field::RegionError;
use serde::{Deserialize, Serialize};

/// Result type for max tracking operations
pub type TrackerResult<T> = Result<T, TrackerError>;

/// Errors that can occur while tracking maxima or locating their patches
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Bad parameters: {0}")]
    BadParameters(String),

    #[error("Shape mismatch: expected {expected}, got {actual:?}")]
    ShapeMismatch { expected: String, actual: Vec<usize> },

    #[error("Channel {channel} out of range (layer has {channels} channels)")]
    BadChannel { channel: usize, channels: usize },

    #[error("No activations supplied for tracked layer '{0}'")]
    MissingLayer(String),

    #[error("Layer '{0}' is not spatial; its units see the whole input")]
    NotSpatial(String),

    #[error(transparent)]
    Region(#[from] RegionError),
}

/// One recorded activation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaxEntry {
    pub value: f32,
    /// Position of the image in the scanned file list
    pub image_idx: usize,
    /// Ground-truth label of the image
    pub image_class: u32,
    /// `(row, col)` of the max within the channel; `None` for fc layers
    pub location: Option<(usize, usize)>,
}
