// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
# deepvis Max Tracker

Keeps, for every unit of every tracked layer, the N strongest activations seen
while scanning a training set, and locates the input patch each one came from.

Forward passes happen elsewhere; callers feed the activation blobs of each
image into a [`NetMaxTracker`].

```rust
use deepvis_config::TrackedLayerConfig;
use deepvis_max_tracker::NetMaxTracker;
use ndarray::{ArrayD, IxDyn};
use std::collections::HashMap;

let layers = vec![TrackedLayerConfig { name: "conv1".to_string(), is_conv: true }];
let mut tracker = NetMaxTracker::new(&layers, 3)?;

let mut blob = ArrayD::<f32>::zeros(IxDyn(&[2, 4, 4]));
blob[[1, 2, 3]] = 5.0;
let blobs = HashMap::from([("conv1".to_string(), blob.view())]);
tracker.update(&blobs, 0, 7)?;

let best = &tracker.layer("conv1").unwrap().maxes(1)?[0];
assert_eq!(best.location, Some((2, 3)));
# Ok::<(), deepvis_max_tracker::TrackerError>(())
```
*/

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod net;
pub mod patches;
pub mod tracker;
pub mod types;

pub use net::NetMaxTracker;
pub use patches::{locate_max_patch, patch_region, place_patch, receptive_field_extent, PatchPlacement};
pub use tracker::MaxTracker;
pub use types::{MaxEntry, TrackerError, TrackerResult};
