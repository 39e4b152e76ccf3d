// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Per-layer top-N activation tracking.

A [`MaxTracker`] holds, for each channel of one layer, the strongest
activations seen so far, sorted strongest first.
*/

use ndarray::{ArrayViewD, Axis, Ix3};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::types::{MaxEntry, TrackerError, TrackerResult};

/// Top-N activations of every channel of one layer
#[derive(Debug, Clone)]
pub struct MaxTracker {
    is_conv: bool,
    top_n: usize,
    entries: Vec<Vec<MaxEntry>>,
    updates: usize,
}

/// Strongest activation of one channel for one image
type ChannelMax = Option<(f32, Option<(usize, usize)>)>;

impl MaxTracker {
    /// Create a tracker for a layer with `n_channels` channels.
    ///
    /// # Errors
    ///
    /// `BadParameters` if `n_channels` or `top_n` is zero.
    pub fn new(is_conv: bool, n_channels: usize, top_n: usize) -> TrackerResult<Self> {
        if n_channels == 0 {
            return Err(TrackerError::BadParameters(
                "a tracked layer needs at least one channel".to_string(),
            ));
        }
        if top_n == 0 {
            return Err(TrackerError::BadParameters(
                "top_n must be greater than 0".to_string(),
            ));
        }

        Ok(Self {
            is_conv,
            top_n,
            entries: vec![Vec::with_capacity(top_n); n_channels],
            updates: 0,
        })
    }

    pub fn is_conv(&self) -> bool {
        self.is_conv
    }

    pub fn n_channels(&self) -> usize {
        self.entries.len()
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Number of blobs fed through [`Self::update`]
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Entries of `channel`, strongest first
    pub fn maxes(&self, channel: usize) -> TrackerResult<&[MaxEntry]> {
        self.entries
            .get(channel)
            .map(Vec::as_slice)
            .ok_or(TrackerError::BadChannel {
                channel,
                channels: self.entries.len(),
            })
    }

    /// Check that `blob` fits this tracker without touching any state.
    pub fn check_shape(&self, blob: &ArrayViewD<'_, f32>) -> TrackerResult<()> {
        let channels = blob_channels(self.is_conv, blob.shape())?;
        if channels != self.entries.len() {
            return Err(TrackerError::ShapeMismatch {
                expected: format!("{} channels", self.entries.len()),
                actual: blob.shape().to_vec(),
            });
        }
        Ok(())
    }

    /// Record the activations of one image.
    ///
    /// Conv layers take a `(channels, height, width)` blob and record the
    /// position of each channel's spatial max (first occurrence on ties).
    /// Fc layers take `(channels,)` or `(channels, 1, 1)`. NaN activations
    /// are ignored.
    ///
    /// # Errors
    ///
    /// `ShapeMismatch` if the blob's shape does not fit the layer.
    pub fn update(
        &mut self,
        blob: ArrayViewD<'_, f32>,
        image_idx: usize,
        image_class: u32,
    ) -> TrackerResult<()> {
        self.check_shape(&blob)?;

        let channel_maxes = if self.is_conv {
            conv_channel_maxes(blob)?
        } else {
            blob.iter()
                .map(|&value| (!value.is_nan()).then_some((value, None)))
                .collect()
        };

        for (list, found) in self.entries.iter_mut().zip(channel_maxes) {
            let Some((value, location)) = found else {
                continue;
            };
            insert_entry(
                list,
                self.top_n,
                MaxEntry {
                    value,
                    image_idx,
                    image_class,
                    location,
                },
            );
        }

        self.updates += 1;
        Ok(())
    }
}

/// Channel count of a blob, or `ShapeMismatch` if it has the wrong layout
pub(crate) fn blob_channels(is_conv: bool, shape: &[usize]) -> TrackerResult<usize> {
    let valid = if is_conv {
        shape.len() == 3
    } else {
        shape.len() == 1 || (shape.len() == 3 && shape[1] == 1 && shape[2] == 1)
    };
    if !valid {
        return Err(TrackerError::ShapeMismatch {
            expected: if is_conv {
                "(channels, height, width)".to_string()
            } else {
                "(channels,) or (channels, 1, 1)".to_string()
            },
            actual: shape.to_vec(),
        });
    }
    Ok(shape[0])
}

fn conv_channel_maxes(blob: ArrayViewD<'_, f32>) -> TrackerResult<Vec<ChannelMax>> {
    let shape = blob.shape().to_vec();
    let blob = blob
        .into_dimensionality::<Ix3>()
        .map_err(|_| TrackerError::ShapeMismatch {
            expected: "(channels, height, width)".to_string(),
            actual: shape,
        })?;

    let spatial_max = |channel: usize| -> ChannelMax {
        let mut best: ChannelMax = None;
        for ((row, col), &value) in blob.index_axis(Axis(0), channel).indexed_iter() {
            if value.is_nan() {
                continue;
            }
            // strict comparison keeps the first occurrence
            if best.map_or(true, |(current, _)| value > current) {
                best = Some((value, Some((row, col))));
            }
        }
        best
    };

    let n_channels = blob.len_of(Axis(0));

    #[cfg(feature = "parallel")]
    let maxes = (0..n_channels).into_par_iter().map(spatial_max).collect();

    #[cfg(not(feature = "parallel"))]
    let maxes = (0..n_channels).map(spatial_max).collect();

    Ok(maxes)
}

/// Insert into a descending list capped at `top_n`. A full list only takes
/// values strictly greater than its current minimum.
fn insert_entry(list: &mut Vec<MaxEntry>, top_n: usize, entry: MaxEntry) {
    if list.len() == top_n {
        match list.last() {
            Some(min) if entry.value > min.value => {
                list.pop();
            }
            _ => return,
        }
    }
    let at = list.partition_point(|existing| existing.value >= entry.value);
    list.insert(at, entry);
}
