//! Structural dimensions of feature maps and pooled outputs
//!
//! Both layouts are dense and row-major with channels fastest varying:
//! feature maps are `(batch, height, width, channels)` and pooled outputs are
//! `(region, pooled_height, pooled_width, out_channels)`.

use crate::config::RoiPoolConfig;
use crate::error::{RoiPoolError, RoiPoolResult};

/// Product of `factors`, or `InvalidConfig` naming `what` on overflow
fn checked_product(what: &str, factors: &[usize]) -> RoiPoolResult<usize> {
    factors
        .iter()
        .try_fold(1usize, |acc, &f| acc.checked_mul(f))
        .ok_or_else(|| {
            RoiPoolError::invalid_config(
                what,
                format!("{:?} elements overflow usize", factors),
            )
        })
}

/// Dimensions of a `(batch, height, width, channels)` feature map
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureMapDims {
    pub batch: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl FeatureMapDims {
    pub fn new(batch: usize, height: usize, width: usize, channels: usize) -> Self {
        Self {
            batch,
            height,
            width,
            channels,
        }
    }

    /// Infer the batch size from a buffer length
    ///
    /// Used by the forward pass, whose host interface does not carry a
    /// batch size.
    pub fn infer_batch(
        len: usize,
        height: usize,
        width: usize,
        channels: usize,
    ) -> RoiPoolResult<Self> {
        let slice = checked_product("feature_map", &[height, width, channels])?;
        if slice == 0 {
            return Err(RoiPoolError::invalid_config(
                "feature_map",
                format!(
                    "height, width and channels must be positive, got {}x{}x{}",
                    height, width, channels
                ),
            ));
        }
        if len % slice != 0 {
            return Err(RoiPoolError::dimension_mismatch(
                "feature_map",
                (len / slice + 1).saturating_mul(slice),
                len,
            ));
        }
        Ok(Self::new(len / slice, height, width, channels))
    }

    /// Elements in one batch slice
    pub fn slice_len(&self) -> usize {
        self.height * self.width * self.channels
    }

    /// Total elements
    pub fn len(&self) -> usize {
        self.batch * self.slice_len()
    }

    /// Total elements, or an error when the count overflows `usize`
    pub fn checked_len(&self) -> RoiPoolResult<usize> {
        checked_product(
            "feature_map",
            &[self.batch, self.height, self.width, self.channels],
        )
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of `(h, w, c)` within one batch slice
    #[inline]
    pub fn slice_index(&self, h: usize, w: usize, c: usize) -> usize {
        (h * self.width + w) * self.channels + c
    }

    /// Check the spatial extent and channel count
    pub fn validate(&self) -> RoiPoolResult<()> {
        if self.height == 0 || self.width == 0 || self.channels == 0 {
            return Err(RoiPoolError::invalid_config(
                "feature_map",
                format!(
                    "height, width and channels must be positive, got {}x{}x{}",
                    self.height, self.width, self.channels
                ),
            ));
        }
        if self.height > i32::MAX as usize || self.width > i32::MAX as usize {
            return Err(RoiPoolError::invalid_config(
                "feature_map",
                "height and width must fit in i32",
            ));
        }
        self.checked_len()?;
        Ok(())
    }
}

/// Dimensions of a `(region, pooled_height, pooled_width, out_channels)` output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PooledDims {
    pub regions: usize,
    pub pooled_height: usize,
    pub pooled_width: usize,
    pub out_channels: usize,
}

impl PooledDims {
    /// Output dimensions for `regions` regions pooled over a map with `map` dims
    pub fn for_call(regions: usize, map: &FeatureMapDims, config: &RoiPoolConfig) -> Self {
        Self {
            regions,
            pooled_height: config.pooled_height,
            pooled_width: config.pooled_width,
            out_channels: config.mode.out_channels(map.channels),
        }
    }

    /// Elements in one region's pooled grid
    pub fn region_len(&self) -> usize {
        self.pooled_height * self.pooled_width * self.out_channels
    }

    /// Total elements
    pub fn len(&self) -> usize {
        self.regions * self.region_len()
    }

    /// Total elements, or an error when the count overflows `usize`
    pub fn checked_len(&self) -> RoiPoolResult<usize> {
        checked_product(
            "pooled_output",
            &[
                self.regions,
                self.pooled_height,
                self.pooled_width,
                self.out_channels,
            ],
        )
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat index of `(ph, pw, c)` within one region's grid
    #[inline]
    pub fn region_index(&self, ph: usize, pw: usize, c: usize) -> usize {
        (ph * self.pooled_width + pw) * self.out_channels + c
    }

    /// Shape as a 4-tuple
    pub fn shape(&self) -> (usize, usize, usize, usize) {
        (
            self.regions,
            self.pooled_height,
            self.pooled_width,
            self.out_channels,
        )
    }
}
