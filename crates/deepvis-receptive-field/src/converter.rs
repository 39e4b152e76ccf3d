// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Region converter - projects a region one conv/pool hop towards the input.

Works for conv and pool alike: the inverse footprint of a sliding window with
symmetric padding,

```text
bottom_start = top_start * stride - pad
bottom_end   = (top_end - 1) * stride + kernel - pad
```

applied independently to rows and columns.
*/

use serde::{Deserialize, Serialize};

use crate::types::{Extent, Region, RegionError, RegionResult};

/// Project `top` (a slice of the layer output) onto the layer input.
///
/// # Arguments
/// * `top` - Region in the layer's output space; must satisfy `start < end`
/// * `bottom_extent` - Size of the layer's input
/// * `top_extent` - Size of the layer's output; `top` is cropped to it first
/// * `kernel` - Window size
/// * `stride` - Window step
/// * `pad` - Padding applied on each side
/// * `normalize_last` - Also crop the result to `bottom_extent`
///
/// # Errors
/// - `RegionError::DegenerateRegion` if `top` is empty on entry or the
///   projected region is empty on either axis
/// - `RegionError::Configuration` if the geometry is too large for the
///   projected coordinates to fit in an `i64`
#[allow(clippy::too_many_arguments)]
pub fn convert_region_through(
    top: Region,
    bottom_extent: Extent,
    top_extent: Extent,
    kernel: Extent,
    stride: Extent,
    pad: Extent,
    normalize_last: bool,
) -> RegionResult<Region> {
    if !top.is_valid() {
        return Err(RegionError::DegenerateRegion {
            region: top,
            context: "requested",
        });
    }

    let top = top.crop(top_extent);

    let (row_start, row_end) = project_axis(
        top.row_start,
        top.row_end,
        kernel.height,
        stride.height,
        pad.height,
    )?;
    let (col_start, col_end) = project_axis(
        top.col_start,
        top.col_end,
        kernel.width,
        stride.width,
        pad.width,
    )?;

    let mut bottom = Region::new(row_start, row_end, col_start, col_end);
    if normalize_last {
        bottom = bottom.crop(bottom_extent);
    }

    if !bottom.is_valid() {
        return Err(RegionError::DegenerateRegion {
            region: bottom,
            context: "after projection",
        });
    }

    Ok(bottom)
}

#[inline]
fn project_axis(
    start: i64,
    end: i64,
    kernel: u32,
    stride: u32,
    pad: u32,
) -> RegionResult<(i64, i64)> {
    let (kernel, stride, pad) = (i64::from(kernel), i64::from(stride), i64::from(pad));
    let bottom_start = start
        .checked_mul(stride)
        .and_then(|v| v.checked_sub(pad));
    let bottom_end = end
        .checked_sub(1)
        .and_then(|v| v.checked_mul(stride))
        .and_then(|v| v.checked_add(kernel))
        .and_then(|v| v.checked_sub(pad));

    match (bottom_start, bottom_end) {
        (Some(bottom_start), Some(bottom_end)) => Ok((bottom_start, bottom_end)),
        _ => Err(RegionError::Configuration(format!(
            "projecting [{}, {}) with kernel {}, stride {}, pad {} overflows",
            start, end, kernel, stride, pad
        ))),
    }
}

/// Geometry of one spatially transforming layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerGeometry {
    pub input: Extent,
    pub output: Extent,
    pub kernel: Extent,
    pub stride: Extent,
    pub pad: Extent,
}

impl LayerGeometry {
    pub const fn new(
        input: Extent,
        output: Extent,
        kernel: Extent,
        stride: Extent,
        pad: Extent,
    ) -> Self {
        Self {
            input,
            output,
            kernel,
            stride,
            pad,
        }
    }

    /// Layer that only changes the extent bookkeeping: kernel 1, stride 1, pad 0
    pub const fn unit(input: Extent, output: Extent) -> Self {
        Self::new(
            input,
            output,
            Extent::square(1),
            Extent::square(1),
            Extent::square(0),
        )
    }

    /// Build from the decoded `[height, width]` components of a chain entry
    pub fn from_components(components: [[u32; 2]; 5]) -> Self {
        let [input, output, kernel, stride, pad] = components;
        Self::new(
            input.into(),
            output.into(),
            kernel.into(),
            stride.into(),
            pad.into(),
        )
    }

    /// Project a region of this layer's output onto its input.
    ///
    /// See [`convert_region_through`].
    pub fn project(&self, top: Region, normalize_last: bool) -> RegionResult<Region> {
        convert_region_through(
            top,
            self.input,
            self.output,
            self.kernel,
            self.stride,
            self.pad,
            normalize_last,
        )
    }
}
