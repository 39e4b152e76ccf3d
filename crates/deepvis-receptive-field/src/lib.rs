// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# deepvis Receptive Field

Maps a rectangular region of one layer's feature map back to the region of an
earlier layer's feature map that could have influenced it.

- [`LayerGeometry`] is the immutable record of one conv/pool layer
  (input extent, output extent, kernel, stride, pad) and projects a region one
  hop towards the input.
- [`RegionComputer`] owns one or more named layer chains (possibly sharing a
  root layer) and walks a region back along a chain from any layer to any
  earlier layer.

Regions are half-open `(row_start, row_end, col_start, col_end)` slices.

```rust
use deepvis_config::alexnet_chains;
use deepvis_receptive_field::{Region, RegionComputer};

let computer = RegionComputer::new(&alexnet_chains())?;
let field = computer.convert_region("conv1", "data", Region::new(0, 1, 0, 1), false)?;
assert_eq!(field, Region::new(0, 11, 0, 11));
# Ok::<(), deepvis_receptive_field::RegionError>(())
```
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod computer;
pub mod converter;
pub mod types;

pub use computer::{Chain, RegionComputer};
pub use converter::{convert_region_through, LayerGeometry};
pub use types::{Extent, Region, RegionError, RegionResult};
