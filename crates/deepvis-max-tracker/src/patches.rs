// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Locating tracked maxima in input space.

A unit's receptive field near the image border is partly cut off. Patches are
laid out at the full receptive field size, with the visible part placed where
it would sit had the image extended past its edge.
*/

use deepvis_receptive_field::{Extent, Region, RegionComputer};
use serde::{Deserialize, Serialize};

use crate::types::{MaxEntry, TrackerError, TrackerResult};

/// Where one maximum's input region goes inside its patch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchPlacement {
    /// Clamped region of the input layer
    pub input: Region,
    /// Full receptive field size
    pub patch: Extent,
    /// Where `input` lands inside the patch
    pub target: Region,
}

/// Input-space region of the unit that produced `entry`, clamped to the
/// input layer's extent.
///
/// # Errors
///
/// - `NotSpatial` for entries of fully connected layers
/// - `Region` if the layers cannot be related
pub fn patch_region(
    computer: &RegionComputer,
    layer: &str,
    input_layer: &str,
    entry: &MaxEntry,
) -> TrackerResult<Region> {
    let (row, col) = entry
        .location
        .ok_or_else(|| TrackerError::NotSpatial(layer.to_string()))?;
    let unit = Region::unit(row as i64, col as i64);
    Ok(computer.convert_region(layer, input_layer, unit, true)?)
}

/// Receptive field size of one interior unit of `layer` in `input_layer`.
///
/// # Errors
///
/// `BadParameters` if no geometry in `layer`'s chain fixes its extent.
pub fn receptive_field_extent(
    computer: &RegionComputer,
    layer: &str,
    input_layer: &str,
) -> TrackerResult<Extent> {
    let extent = computer.layer_extent(layer)?.ok_or_else(|| {
        TrackerError::BadParameters(format!("extent of layer '{}' is unknown", layer))
    })?;
    let center = Region::unit(i64::from(extent.height / 2), i64::from(extent.width / 2));
    let footprint = computer.convert_region(layer, input_layer, center, false)?;
    Ok(Extent::new(
        footprint.height() as u32,
        footprint.width() as u32,
    ))
}

/// Position of a clamped input region inside a patch of size `patch`.
///
/// A region starting at the top (left) image edge lost its upper (left) part,
/// so it is aligned to the bottom (right) of the patch; any other region is
/// aligned to the top (left).
///
/// # Errors
///
/// `BadParameters` if the region is larger than the patch.
pub fn place_patch(region: Region, patch: Extent) -> TrackerResult<Region> {
    let (row_start, row_end) =
        place_axis(region.row_start, region.row_end, i64::from(patch.height), "rows")?;
    let (col_start, col_end) =
        place_axis(region.col_start, region.col_end, i64::from(patch.width), "cols")?;
    Ok(Region::new(row_start, row_end, col_start, col_end))
}

fn place_axis(start: i64, end: i64, size: i64, axis: &str) -> TrackerResult<(i64, i64)> {
    let len = end - start;
    if len <= 0 || len > size {
        return Err(TrackerError::BadParameters(format!(
            "region {} [{}, {}) does not fit a patch of size {}",
            axis, start, end, size
        )));
    }
    if start == 0 {
        Ok((size - len, size))
    } else {
        Ok((0, len))
    }
}

/// [`patch_region`] and [`place_patch`] for one tracked maximum
pub fn locate_max_patch(
    computer: &RegionComputer,
    layer: &str,
    input_layer: &str,
    entry: &MaxEntry,
) -> TrackerResult<PatchPlacement> {
    let input = patch_region(computer, layer, input_layer, entry)?;
    let patch = receptive_field_extent(computer, layer, input_layer)?;
    let target = place_patch(input, patch)?;
    Ok(PatchPlacement {
        input,
        patch,
        target,
    })
}
