// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
RegionComputer - walks regions back along chains of conv/pool layers.

Chains are registered once at construction and never change afterwards, so a
computer can be shared freely between threads.
*/

use ahash::AHashMap;
use deepvis_config::{ChainSpec, MIN_CHAIN_LEN};
use tracing::{debug, info};

use crate::converter::LayerGeometry;
use crate::types::{Extent, Region, RegionError, RegionResult};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// One registered chain: layer names root first, with the geometry of every
/// spatially transforming layer at the same index.
#[derive(Debug, Clone)]
pub struct Chain {
    names: Vec<String>,
    geometries: Vec<Option<LayerGeometry>>,
    positions: AHashMap<String, usize>,
}

impl Chain {
    /// Layer names, root first
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn root(&self) -> &str {
        &self.names[0]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of `layer` in this chain
    pub fn position(&self, layer: &str) -> Option<usize> {
        self.positions.get(layer).copied()
    }

    pub fn contains(&self, layer: &str) -> bool {
        self.positions.contains_key(layer)
    }

    /// Geometry of the layer at `index`; `None` for pass-through layers
    pub fn geometry(&self, index: usize) -> Option<&LayerGeometry> {
        self.geometries.get(index).and_then(Option::as_ref)
    }
}

/// Computes regions of possible influence from later layers on earlier ones.
///
/// # Design Notes
///
/// - Every non-root layer name is unique across all chains
/// - Roots may be shared (typically the network input)
/// - `owners` maps each name to the first registered chain containing it,
///   so a shared root resolves to the first chain that lists it
#[derive(Debug, Clone)]
pub struct RegionComputer {
    chains: Vec<Chain>,
    owners: AHashMap<String, usize>,
}

impl RegionComputer {
    /// Build a computer from chain specifications.
    ///
    /// # Errors
    ///
    /// Returns `RegionError::Configuration` if:
    /// - no chain is given, or a chain has fewer than two layers
    /// - a layer's geometry params have the wrong arity or don't match its kind
    /// - a non-root name appears twice across all chains, or repeats its own root
    pub fn new(specs: &[ChainSpec]) -> RegionResult<Self> {
        if specs.is_empty() {
            return Err(RegionError::Configuration(
                "at least one chain is required".to_string(),
            ));
        }

        let mut chains = Vec::with_capacity(specs.len());
        let mut owners: AHashMap<String, usize> = AHashMap::new();
        let mut non_root_owner: AHashMap<&str, usize> = AHashMap::new();

        for (chain_idx, spec) in specs.iter().enumerate() {
            if spec.layers.len() < MIN_CHAIN_LEN {
                return Err(RegionError::Configuration(format!(
                    "chain {} has {} layer(s), at least {} are required",
                    chain_idx,
                    spec.layers.len(),
                    MIN_CHAIN_LEN
                )));
            }

            let mut names = Vec::with_capacity(spec.layers.len());
            let mut geometries = Vec::with_capacity(spec.layers.len());
            let mut positions = AHashMap::with_capacity(spec.layers.len());

            for (idx, layer) in spec.layers.iter().enumerate() {
                if idx > 0 {
                    if layer.name == spec.layers[0].name {
                        return Err(RegionError::Configuration(format!(
                            "chain {} repeats its root layer '{}'",
                            chain_idx, layer.name
                        )));
                    }
                    if let Some(&first) = non_root_owner.get(layer.name.as_str()) {
                        return Err(RegionError::Configuration(format!(
                            "layer '{}' appears in chain {} and chain {}; only root layers may be shared",
                            layer.name, first, chain_idx
                        )));
                    }
                    non_root_owner.insert(layer.name.as_str(), chain_idx);
                }

                let geometry = layer
                    .geometry_components()?
                    .map(LayerGeometry::from_components);

                names.push(layer.name.clone());
                geometries.push(geometry);
                positions.insert(layer.name.clone(), idx);
                owners.entry(layer.name.clone()).or_insert(chain_idx);
            }

            chains.push(Chain {
                names,
                geometries,
                positions,
            });
        }

        info!(
            chains = chains.len(),
            layers = owners.len(),
            "Region computer initialized"
        );

        Ok(Self { chains, owners })
    }

    pub fn chains(&self) -> &[Chain] {
        &self.chains
    }

    /// First registered chain containing `layer`.
    ///
    /// # Errors
    ///
    /// `RegionError::NotFound` if no chain contains it.
    pub fn locate_chain(&self, layer: &str) -> RegionResult<&Chain> {
        self.owners
            .get(layer)
            .map(|&idx| &self.chains[idx])
            .ok_or_else(|| RegionError::NotFound(layer.to_string()))
    }

    /// Spatial extent of `layer`'s feature map, if any layer geometry in its
    /// chain pins it down.
    ///
    /// Transforming layers report their output extent; pass-through layers
    /// take the input extent of the next transforming layer, or failing that
    /// the output extent of the previous one.
    pub fn layer_extent(&self, layer: &str) -> RegionResult<Option<Extent>> {
        let chain = self.locate_chain(layer)?;
        let idx = chain
            .position(layer)
            .ok_or_else(|| RegionError::NotFound(layer.to_string()))?;

        if let Some(geometry) = chain.geometry(idx) {
            return Ok(Some(geometry.output));
        }
        let next = (idx + 1..chain.len()).find_map(|ii| chain.geometry(ii));
        if let Some(geometry) = next {
            return Ok(Some(geometry.input));
        }
        Ok((0..idx).rev().find_map(|ii| chain.geometry(ii)).map(|g| g.output))
    }

    /// Project `region`, a slice of `from_layer`'s feature map, back to
    /// `to_layer`.
    ///
    /// Hops run from `from_layer` down to just above `to_layer`; pass-through
    /// layers leave the region as is. `normalize_last` crops only the final
    /// hop to `to_layer`'s extent, intermediate hops keep their overhang.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `from_layer` is in no chain
    /// - `Configuration` if `to_layer` is not in `from_layer`'s chain
    /// - `Order` if `to_layer` comes after `from_layer`
    /// - `DegenerateRegion` if any hop yields an empty region
    pub fn convert_region(
        &self,
        from_layer: &str,
        to_layer: &str,
        region: Region,
        normalize_last: bool,
    ) -> RegionResult<Region> {
        let chain = self.locate_chain(from_layer)?;

        let from_idx = chain
            .position(from_layer)
            .ok_or_else(|| RegionError::NotFound(from_layer.to_string()))?;
        let to_idx = chain.position(to_layer).ok_or_else(|| {
            RegionError::Configuration(format!(
                "layers '{}' and '{}' belong to different chains",
                from_layer, to_layer
            ))
        })?;

        if from_idx < to_idx {
            return Err(RegionError::Order {
                from: from_layer.to_string(),
                to: to_layer.to_string(),
            });
        }

        let mut current = region;
        for ii in (to_idx + 1..=from_idx).rev() {
            let Some(geometry) = chain.geometry(ii) else {
                debug!(layer = %chain.names[ii], region = %current, "pass-through layer");
                continue;
            };
            debug!(layer = %chain.names[ii], region = %current, "pushing region through converter");
            current = geometry.project(current, normalize_last && ii == to_idx + 1)?;
        }

        debug!(layer = to_layer, region = %current, "final region");
        Ok(current)
    }

    /// [`Self::convert_region`] over many regions of the same layer pair.
    ///
    /// Fails on the first region that fails.
    pub fn convert_regions(
        &self,
        from_layer: &str,
        to_layer: &str,
        regions: &[Region],
        normalize_last: bool,
    ) -> RegionResult<Vec<Region>> {
        #[cfg(feature = "parallel")]
        {
            regions
                .par_iter()
                .map(|&region| self.convert_region(from_layer, to_layer, region, normalize_last))
                .collect()
        }

        #[cfg(not(feature = "parallel"))]
        {
            regions
                .iter()
                .map(|&region| self.convert_region(from_layer, to_layer, region, normalize_last))
                .collect()
        }
    }
}
