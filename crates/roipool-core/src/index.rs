//! Typed multi-dimensional indices for data-parallel work units
//!
//! Each work unit owns one flat output slot. These types decompose that flat
//! slot into its coordinates once, so the kernels never repeat the
//! modulo/divide chain by hand.

use crate::dims::{FeatureMapDims, PooledDims};

/// Coordinates of one pooled output cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PooledIndex {
    pub region: usize,
    pub ph: usize,
    pub pw: usize,
    /// Output channel; always 0 when the output has a single channel
    pub channel: usize,
}

impl PooledIndex {
    /// Decompose a flat index into a `(region, ph, pw, channel)` output
    #[inline]
    pub fn from_flat(flat: usize, dims: &PooledDims) -> Self {
        let mut n = flat;
        let channel = n % dims.out_channels;
        n /= dims.out_channels;
        let pw = n % dims.pooled_width;
        n /= dims.pooled_width;
        let ph = n % dims.pooled_height;
        n /= dims.pooled_height;

        Self {
            region: n,
            ph,
            pw,
            channel,
        }
    }

    /// Flat index in a `(region, ph, pw, channel)` output
    #[inline]
    pub fn to_flat(&self, dims: &PooledDims) -> usize {
        self.region * dims.region_len() + dims.region_index(self.ph, self.pw, self.channel)
    }
}

/// Coordinates of one feature-map element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceIndex {
    pub batch: usize,
    pub h: usize,
    pub w: usize,
    pub channel: usize,
}

impl SourceIndex {
    /// Decompose a flat index into a `(batch, h, w, channel)` feature map
    #[inline]
    pub fn from_flat(flat: usize, dims: &FeatureMapDims) -> Self {
        let mut n = flat;
        let channel = n % dims.channels;
        n /= dims.channels;
        let w = n % dims.width;
        n /= dims.width;
        let h = n % dims.height;
        n /= dims.height;

        Self {
            batch: n,
            h,
            w,
            channel,
        }
    }

    /// Flat index within this element's batch slice, as argmax maps record it
    #[inline]
    pub fn slice_offset(&self, dims: &FeatureMapDims) -> usize {
        dims.slice_index(self.h, self.w, self.channel)
    }

    /// Flat index in the whole feature map
    #[inline]
    pub fn to_flat(&self, dims: &FeatureMapDims) -> usize {
        self.batch * dims.slice_len() + self.slice_offset(dims)
    }
}
