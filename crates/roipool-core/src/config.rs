//! Pooling configuration
//!
//! [`RoiPoolConfig`] carries the scalar parameters shared by the forward and
//! backward passes. Structural dimensions live in [`crate::dims`].

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{RoiPoolError, RoiPoolResult};

/// Which channels a region pools
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum PoolMode {
    /// Every channel is pooled independently
    #[default]
    AllChannels,
    /// Only the channel named by the region's class index is pooled,
    /// producing a single-channel output per region
    ByClass,
}

impl PoolMode {
    /// Build a mode from the host's boolean `pool_by_channel` flag
    pub fn from_flag(pool_by_channel: bool) -> Self {
        if pool_by_channel {
            PoolMode::ByClass
        } else {
            PoolMode::AllChannels
        }
    }

    /// Number of output channels per pooled cell for a map with `channels`
    pub fn out_channels(self, channels: usize) -> usize {
        match self {
            PoolMode::AllChannels => channels,
            PoolMode::ByClass => 1,
        }
    }
}

/// Scalar configuration of an ROI pooling call
///
/// # Examples
///
/// ```
/// use roipool_core::{PoolMode, RoiPoolConfig};
///
/// let config = RoiPoolConfig::new(7, 7)
///     .with_spatial_scale(1.0 / 16.0)
///     .with_mode(PoolMode::ByClass);
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.pooled_cells(), 49);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoiPoolConfig {
    /// Factor mapping region coordinates into feature-map coordinates
    pub spatial_scale: f32,
    /// Rows of the pooled grid
    pub pooled_height: usize,
    /// Columns of the pooled grid
    pub pooled_width: usize,
    /// Channel selection mode
    #[cfg_attr(feature = "serde", serde(default))]
    pub mode: PoolMode,
}

impl Default for RoiPoolConfig {
    fn default() -> Self {
        Self {
            spatial_scale: 1.0,
            pooled_height: 7,
            pooled_width: 7,
            mode: PoolMode::AllChannels,
        }
    }
}

impl RoiPoolConfig {
    /// Create a configuration for a `pooled_height` x `pooled_width` grid at scale 1
    pub fn new(pooled_height: usize, pooled_width: usize) -> Self {
        Self {
            pooled_height,
            pooled_width,
            ..Self::default()
        }
    }

    /// Set the spatial scale
    pub fn with_spatial_scale(mut self, spatial_scale: f32) -> Self {
        self.spatial_scale = spatial_scale;
        self
    }

    /// Set the pooling mode
    pub fn with_mode(mut self, mode: PoolMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the pooling mode from the host's boolean flag
    pub fn with_pool_by_channel(self, pool_by_channel: bool) -> Self {
        self.with_mode(PoolMode::from_flag(pool_by_channel))
    }

    /// Cells in one region's pooled grid
    pub fn pooled_cells(&self) -> usize {
        self.pooled_height * self.pooled_width
    }

    /// Check that the configuration describes a computable pooling
    pub fn validate(&self) -> RoiPoolResult<()> {
        if self.pooled_height == 0 {
            return Err(RoiPoolError::invalid_config(
                "pooled_height",
                "must be positive",
            ));
        }
        if self.pooled_width == 0 {
            return Err(RoiPoolError::invalid_config(
                "pooled_width",
                "must be positive",
            ));
        }
        // Zero and negative scales only collapse or invert regions.
        if !self.spatial_scale.is_finite() {
            return Err(RoiPoolError::invalid_config(
                "spatial_scale",
                format!("must be finite, got {}", self.spatial_scale),
            ));
        }
        // Geometry runs in i32 like the scaled coordinates.
        if self.pooled_height > i32::MAX as usize || self.pooled_width > i32::MAX as usize {
            return Err(RoiPoolError::invalid_config(
                "pooled_size",
                "must fit in i32",
            ));
        }
        Ok(())
    }
}
