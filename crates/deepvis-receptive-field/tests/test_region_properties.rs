// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Property tests for receptive field projection.
//!
//! These tests check the projection against its closed-form geometry on
//! randomly generated regions.

use deepvis_config::{alexnet_chains, ChainSpec, LayerSpec};
use deepvis_receptive_field::{Extent, LayerGeometry, Region, RegionComputer, RegionError};
use proptest::prelude::*;

const ALEXNET_LAYERS: &[&str] = &[
    "data", "conv1", "pool1", "conv2", "pool2", "conv3", "conv4", "conv5",
];

fn alexnet() -> RegionComputer {
    RegionComputer::new(&alexnet_chains()).expect("AlexNet chain must build")
}

/// data (16x16) -> conv(k3 s1 p1) -> pool(k2 s2 p0)
fn conv_then_pool() -> RegionComputer {
    RegionComputer::new(&[ChainSpec::new(vec![
        LayerSpec::passthrough("data"),
        LayerSpec::conv("conv", &[[16, 16], [16, 16], [3, 3], [1, 1], [1, 1]]),
        LayerSpec::pool("pool", &[[16, 16], [8, 8], [2, 2], [2, 2]]),
    ])])
    .expect("chain must build")
}

/// A non-empty half-open span inside `[0, size)`
fn span(size: i64) -> impl Strategy<Value = (i64, i64)> {
    (0..size).prop_flat_map(move |start| (Just(start), start + 1..=size))
}

fn region_within(extent: Extent) -> impl Strategy<Value = Region> {
    (span(extent.height as i64), span(extent.width as i64))
        .prop_map(|((r0, r1), (c0, c1))| Region::new(r0, r1, c0, c1))
}

proptest! {
    #[test]
    fn identity_chain(layer_idx in 0..ALEXNET_LAYERS.len(), r0 in -50i64..50, h in 1i64..300, c0 in -50i64..50, w in 1i64..300) {
        let layer = ALEXNET_LAYERS[layer_idx];
        let region = Region::new(r0, r0 + h, c0, c0 + w);
        let result = alexnet().convert_region(layer, layer, region, false).unwrap();
        prop_assert_eq!(result, region);
    }

    #[test]
    fn normalized_projection_stays_inside(
        from_idx in 1..ALEXNET_LAYERS.len(),
        to_offset in 1usize..8,
        seed_region in region_within(Extent::square(13)),
    ) {
        let computer = alexnet();
        let from = ALEXNET_LAYERS[from_idx];
        let to = ALEXNET_LAYERS[from_idx.saturating_sub(to_offset)];
        let from_extent = computer.layer_extent(from).unwrap().unwrap();
        // every AlexNet map is at least 13x13, so the seed fits anywhere
        let region = seed_region.crop(from_extent);

        let projected = computer.convert_region(from, to, region, true).unwrap();
        let to_extent = computer.layer_extent(to).unwrap().unwrap();
        prop_assert!(projected.is_valid());
        prop_assert!(projected.is_within(&Region::full(to_extent)));
    }

    #[test]
    fn unit_geometry_is_identity(
        height in 1u32..64,
        width in 1u32..64,
        seed in (0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0, 0.0f64..1.0),
        normalize_last in any::<bool>(),
    ) {
        let extent = Extent::new(height, width);
        let geometry = LayerGeometry::unit(extent, extent);
        let (a, b, c, d) = seed;
        let r0 = (a * height as f64) as i64;
        let r1 = r0 + 1 + (b * (height as i64 - r0 - 1) as f64) as i64;
        let c0 = (c * width as f64) as i64;
        let c1 = c0 + 1 + (d * (width as i64 - c0 - 1) as f64) as i64;
        let region = Region::new(r0, r1, c0, c1);

        prop_assert_eq!(geometry.project(region, normalize_last).unwrap(), region);
    }

    #[test]
    fn two_hops_equal_composed_formula(region in region_within(Extent::square(8))) {
        let computer = conv_then_pool();
        let hop_by_hop = computer.convert_region("pool", "data", region, false).unwrap();

        // pool: (2s, 2e), then conv: (2s - 1, 2e + 1)
        let composed = Region::new(
            2 * region.row_start - 1,
            2 * region.row_end + 1,
            2 * region.col_start - 1,
            2 * region.col_end + 1,
        );
        prop_assert_eq!(hop_by_hop, composed);

        let via_conv = computer.convert_region("pool", "conv", region, false).unwrap();
        let stepped = computer.convert_region("conv", "data", via_conv, false).unwrap();
        prop_assert_eq!(stepped, composed);
    }
}

#[test]
fn concrete_conv1_receptive_field() {
    let region = alexnet()
        .convert_region("conv1", "data", Region::new(0, 1, 0, 1), false)
        .unwrap();
    assert_eq!(region.as_tuple(), (0, 11, 0, 11));
}

#[test]
fn boundary_overhang_only_without_normalize() {
    let computer = alexnet();
    let last = Region::unit(26, 26);

    let clamped = computer.convert_region("conv2", "pool1", last, true).unwrap();
    assert!(clamped.row_end <= 27);
    assert!(clamped.col_end <= 27);

    let raw = computer.convert_region("conv2", "pool1", last, false).unwrap();
    assert_eq!(raw.row_end, 29);
    assert_eq!(raw.col_end, 29);
}

#[test]
fn ordering_violation() {
    let result = alexnet().convert_region("conv1", "pool1", Region::unit(0, 0), false);
    assert!(matches!(result, Err(RegionError::Order { .. })));
}

#[test]
fn unknown_layer() {
    let result = alexnet().convert_region("nonexistent", "data", Region::unit(0, 0), false);
    assert!(matches!(result, Err(RegionError::NotFound(_))));
}

#[test]
fn chains_from_json_architecture() {
    let description = r#"[
        {"layers": [
            {"name": "data"},
            {"name": "conv1", "kind": "conv", "params": [[64, 64], [32, 32], [3, 3], [2, 2], [1, 1]]}
        ]},
        {"layers": [
            {"name": "data"},
            {"name": "pool1", "kind": "pool", "params": [[64, 64], [32, 32], [2, 2], [2, 2]]}
        ]}
    ]"#;
    let specs: Vec<ChainSpec> = serde_json::from_str(description).unwrap();
    let computer = RegionComputer::new(&specs).unwrap();

    assert_eq!(computer.chains().len(), 2);
    let conv = computer
        .convert_region("conv1", "data", Region::unit(0, 0), true)
        .unwrap();
    assert_eq!(conv, Region::new(0, 2, 0, 2));
    let pool = computer
        .convert_region("pool1", "data", Region::unit(31, 31), false)
        .unwrap();
    assert_eq!(pool, Region::new(62, 64, 62, 64));
}

#[test]
fn shared_computer_across_threads() {
    let computer = std::sync::Arc::new(alexnet());
    let handles: Vec<_> = (0..4)
        .map(|ii| {
            let computer = computer.clone();
            std::thread::spawn(move || {
                computer
                    .convert_region("pool2", "data", Region::unit(ii, ii), true)
                    .unwrap()
            })
        })
        .collect();
    for (ii, handle) in handles.into_iter().enumerate() {
        let region = handle.join().unwrap();
        let expected = computer
            .convert_region("pool2", "data", Region::unit(ii as i64, ii as i64), true)
            .unwrap();
        assert_eq!(region, expected);
    }
}
