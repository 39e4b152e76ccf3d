// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Max tracking across every tracked layer of a network

use ahash::{AHashMap, AHashSet};
use deepvis_config::{TrackedLayerConfig, TrackerConfig};
use ndarray::ArrayViewD;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tracing::{debug, info};

use crate::tracker::{blob_channels, MaxTracker};
use crate::types::{TrackerError, TrackerResult};

/// One [`MaxTracker`] per tracked layer.
///
/// Channel counts are not configured; each layer's tracker is sized from the
/// first blob it receives.
#[derive(Debug, Clone)]
pub struct NetMaxTracker {
    layers: Vec<TrackedLayerConfig>,
    top_n: usize,
    trackers: AHashMap<String, MaxTracker>,
    images_seen: usize,
}

impl NetMaxTracker {
    /// # Errors
    ///
    /// `BadParameters` if `top_n` is zero, no layer is given, or a layer is
    /// listed twice.
    pub fn new(layers: &[TrackedLayerConfig], top_n: usize) -> TrackerResult<Self> {
        if top_n == 0 {
            return Err(TrackerError::BadParameters(
                "top_n must be greater than 0".to_string(),
            ));
        }
        if layers.is_empty() {
            return Err(TrackerError::BadParameters(
                "at least one tracked layer is required".to_string(),
            ));
        }
        let mut seen = AHashSet::with_capacity(layers.len());
        for layer in layers {
            if !seen.insert(layer.name.as_str()) {
                return Err(TrackerError::BadParameters(format!(
                    "layer '{}' is tracked twice",
                    layer.name
                )));
            }
        }

        info!(layers = layers.len(), top_n, "Max tracker initialized");

        Ok(Self {
            layers: layers.to_vec(),
            top_n,
            trackers: AHashMap::with_capacity(layers.len()),
            images_seen: 0,
        })
    }

    pub fn from_config(config: &TrackerConfig) -> TrackerResult<Self> {
        Self::new(&config.layers, config.top_n)
    }

    /// Feed the activations of one image.
    ///
    /// `blobs` maps layer names to activation blobs; extra entries are
    /// ignored. Every blob is checked before any tracker changes, so a failed
    /// update leaves the tracker as it was.
    ///
    /// # Errors
    ///
    /// - `MissingLayer` if a tracked layer has no blob
    /// - `ShapeMismatch` if a blob does not fit its layer
    pub fn update(
        &mut self,
        blobs: &HashMap<String, ArrayViewD<'_, f32>>,
        image_idx: usize,
        image_class: u32,
    ) -> TrackerResult<()> {
        for layer in &self.layers {
            let blob = blobs
                .get(&layer.name)
                .ok_or_else(|| TrackerError::MissingLayer(layer.name.clone()))?;
            match self.trackers.get(&layer.name) {
                Some(tracker) => tracker.check_shape(blob)?,
                None => {
                    blob_channels(layer.is_conv, blob.shape())?;
                }
            }
        }

        for layer in &self.layers {
            let Some(blob) = blobs.get(&layer.name) else {
                continue;
            };
            let tracker = match self.trackers.entry(layer.name.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    let channels = blob_channels(layer.is_conv, blob.shape())?;
                    debug!(layer = %layer.name, channels, "creating layer tracker");
                    entry.insert(MaxTracker::new(layer.is_conv, channels, self.top_n)?)
                }
            };
            tracker.update(blob.view(), image_idx, image_class)?;
        }

        self.images_seen += 1;
        debug!(image_idx, image_class, "image recorded");
        Ok(())
    }

    /// Tracker of `name`, once it has received a blob
    pub fn layer(&self, name: &str) -> Option<&MaxTracker> {
        self.trackers.get(name)
    }

    pub fn tracked_layers(&self) -> &[TrackedLayerConfig] {
        &self.layers
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn images_seen(&self) -> usize {
        self.images_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{arr1, Array3, ArrayD};

    fn layers() -> Vec<TrackedLayerConfig> {
        vec![
            TrackedLayerConfig {
                name: "conv1".to_string(),
                is_conv: true,
            },
            TrackedLayerConfig {
                name: "fc6".to_string(),
                is_conv: false,
            },
        ]
    }

    fn image(conv_peak: f32, fc: [f32; 3]) -> (ArrayD<f32>, ArrayD<f32>) {
        let mut conv = Array3::<f32>::zeros((2, 4, 4));
        conv[[0, 3, 1]] = conv_peak;
        (conv.into_dyn(), arr1(&fc).into_dyn())
    }

    #[test]
    fn test_rejects_bad_parameters() {
        assert!(NetMaxTracker::new(&layers(), 0).is_err());
        assert!(NetMaxTracker::new(&[], 3).is_err());
        let mut twice = layers();
        twice.push(twice[0].clone());
        assert!(matches!(
            NetMaxTracker::new(&twice, 3),
            Err(TrackerError::BadParameters(_))
        ));
    }

    #[test]
    fn test_update_feeds_every_layer() {
        let mut net = NetMaxTracker::new(&layers(), 2).unwrap();
        assert!(net.layer("conv1").is_none());

        for (idx, peak) in [1.0f32, 3.0, 2.0].iter().enumerate() {
            let (conv, fc) = image(*peak, [*peak, 0.0, -1.0]);
            let blobs = HashMap::from([
                ("conv1".to_string(), conv.view()),
                ("fc6".to_string(), fc.view()),
                ("unrelated".to_string(), fc.view()),
            ]);
            net.update(&blobs, idx, idx as u32 * 10).unwrap();
        }

        assert_eq!(net.images_seen(), 3);
        let conv = net.layer("conv1").unwrap();
        assert_eq!(conv.n_channels(), 2);
        let best = conv.maxes(0).unwrap();
        assert_eq!(best.len(), 2);
        assert_eq!(best[0].value, 3.0);
        assert_eq!(best[0].image_class, 10);
        assert_eq!(best[0].location, Some((3, 1)));
        assert_eq!(best[1].image_idx, 2);

        let fc = net.layer("fc6").unwrap();
        assert_eq!(fc.n_channels(), 3);
        assert!(fc.maxes(0).unwrap()[0].location.is_none());
    }

    #[test]
    fn test_missing_layer_leaves_state_untouched() {
        let mut net = NetMaxTracker::new(&layers(), 2).unwrap();
        let (conv, _) = image(1.0, [0.0; 3]);
        let blobs = HashMap::from([("conv1".to_string(), conv.view())]);

        assert!(matches!(
            net.update(&blobs, 0, 0),
            Err(TrackerError::MissingLayer(name)) if name == "fc6"
        ));
        assert!(net.layer("conv1").is_none());
        assert_eq!(net.images_seen(), 0);
    }

    #[test]
    fn test_shape_change_is_rejected_before_any_update() {
        let mut net = NetMaxTracker::new(&layers(), 2).unwrap();
        let (conv, fc) = image(1.0, [0.0; 3]);
        let blobs = HashMap::from([
            ("conv1".to_string(), conv.view()),
            ("fc6".to_string(), fc.view()),
        ]);
        net.update(&blobs, 0, 0).unwrap();

        let (conv, _) = image(9.0, [0.0; 3]);
        let short_fc = arr1(&[5.0f32, 5.0]).into_dyn();
        let blobs = HashMap::from([
            ("conv1".to_string(), conv.view()),
            ("fc6".to_string(), short_fc.view()),
        ]);
        assert!(matches!(
            net.update(&blobs, 1, 0),
            Err(TrackerError::ShapeMismatch { .. })
        ));
        assert_eq!(net.layer("conv1").unwrap().maxes(0).unwrap()[0].value, 1.0);
        assert_eq!(net.images_seen(), 1);
    }

    #[test]
    fn test_from_config_defaults() {
        let net = NetMaxTracker::from_config(&TrackerConfig::default()).unwrap();
        assert_eq!(net.top_n(), 9);
        assert_eq!(net.tracked_layers().len(), 9);
    }
}
