//! Geometry mapping between regions and pooling bins
//!
//! A region's corners are scaled into feature-map units and rounded half away
//! from zero. Its extent is forced to at least 1x1, then split into
//! `pooled_height x pooled_width` real-valued bins. Bin `(ph, pw)` covers the
//! half-open window
//!
//! ```text
//! [start_h + floor(ph * bin_h), start_h + ceil((ph + 1) * bin_h))
//!   x [start_w + floor(pw * bin_w), start_w + ceil((pw + 1) * bin_w))
//! ```
//!
//! clamped to the feature map. The backward pass inverts the same formula to
//! find which bins could have covered a given source element. Both directions
//! go through [`ScaledRoi`] so that they agree bit for bit on `f32` rounding.

use std::ops::Range;

use crate::config::RoiPoolConfig;
use crate::region::Region;

/// A region scaled into feature-map units, with its bin sizes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledRoi {
    pub start_h: i32,
    pub start_w: i32,
    pub end_h: i32,
    pub end_w: i32,
    pub bin_h: f32,
    pub bin_w: f32,
}

/// Half-open input window of one pooled cell, already clamped to the map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BinWindow {
    pub hstart: usize,
    pub hend: usize,
    pub wstart: usize,
    pub wend: usize,
}

impl BinWindow {
    /// An empty window pools nothing
    pub fn is_empty(&self) -> bool {
        self.hend <= self.hstart || self.wend <= self.wstart
    }

    pub fn rows(&self) -> Range<usize> {
        self.hstart..self.hend
    }

    pub fn cols(&self) -> Range<usize> {
        self.wstart..self.wend
    }

    /// Number of source positions in the window
    pub fn area(&self) -> usize {
        self.hend.saturating_sub(self.hstart) * self.wend.saturating_sub(self.wstart)
    }
}

/// Pooled cells that could have selected one source element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRange {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
}

impl CellRange {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }
}

#[inline]
fn scale_coord(value: f32, spatial_scale: f32) -> i32 {
    (value * spatial_scale).round() as i32
}

#[inline]
fn clamp_to(value: i64, upper: usize) -> usize {
    value.clamp(0, upper as i64) as usize
}

impl ScaledRoi {
    /// Scale `region` and compute its bin sizes for a pooled grid
    pub fn new(region: &Region, spatial_scale: f32, pooled_height: usize, pooled_width: usize) -> Self {
        let start_w = scale_coord(region.x1, spatial_scale);
        let start_h = scale_coord(region.y1, spatial_scale);
        let end_w = scale_coord(region.x2, spatial_scale);
        let end_h = scale_coord(region.y2, spatial_scale);

        // Malformed regions are forced to 1x1
        let roi_width = (end_w as i64 - start_w as i64 + 1).max(1);
        let roi_height = (end_h as i64 - start_h as i64 + 1).max(1);

        Self {
            start_h,
            start_w,
            end_h,
            end_w,
            bin_h: roi_height as f32 / pooled_height as f32,
            bin_w: roi_width as f32 / pooled_width as f32,
        }
    }

    /// Scale `region` with the parameters of `config`
    pub fn from_config(region: &Region, config: &RoiPoolConfig) -> Self {
        Self::new(
            region,
            config.spatial_scale,
            config.pooled_height,
            config.pooled_width,
        )
    }

    /// Whether the scaled corners are inverted on either axis
    pub fn is_malformed(&self) -> bool {
        self.end_w < self.start_w || self.end_h < self.start_h
    }

    /// Input window of pooled cell `(ph, pw)` on a `height x width` map
    ///
    /// # Examples
    ///
    /// ```
    /// use roipool_core::{Region, ScaledRoi};
    ///
    /// let roi = ScaledRoi::new(&Region::new(0, 0, 0.0, 0.0, 3.0, 3.0), 1.0, 2, 2);
    /// let window = roi.window(1, 0, 4, 4);
    /// assert_eq!(window.rows(), 2..4);
    /// assert_eq!(window.cols(), 0..2);
    /// ```
    #[inline]
    pub fn window(&self, ph: usize, pw: usize, height: usize, width: usize) -> BinWindow {
        let hstart = (ph as f32 * self.bin_h).floor() as i64;
        let wstart = (pw as f32 * self.bin_w).floor() as i64;
        let hend = ((ph + 1) as f32 * self.bin_h).ceil() as i64;
        let wend = ((pw + 1) as f32 * self.bin_w).ceil() as i64;

        let start_h = self.start_h as i64;
        let start_w = self.start_w as i64;

        BinWindow {
            hstart: clamp_to(hstart.saturating_add(start_h), height),
            hend: clamp_to(hend.saturating_add(start_h), height),
            wstart: clamp_to(wstart.saturating_add(start_w), width),
            wend: clamp_to(wend.saturating_add(start_w), width),
        }
    }

    /// Whether `(h, w)` lies within the scaled corners, bounds inclusive
    ///
    /// This is the region extent, not a bin window, and it is not clamped
    /// to the map.
    #[inline]
    pub fn contains(&self, h: usize, w: usize) -> bool {
        let (h, w) = (h as i64, w as i64);
        w >= self.start_w as i64
            && w <= self.end_w as i64
            && h >= self.start_h as i64
            && h <= self.end_h as i64
    }

    /// Pooled cells whose windows could contain source element `(h, w)`
    ///
    /// Inverts [`ScaledRoi::window`] with the same bin sizes and the same
    /// floor/ceil discipline, clamped to the pooled grid.
    #[inline]
    pub fn feasible_cells(
        &self,
        h: usize,
        w: usize,
        pooled_height: usize,
        pooled_width: usize,
    ) -> CellRange {
        let dh = h as i64 - self.start_h as i64;
        let dw = w as i64 - self.start_w as i64;

        let phstart = (dh as f32 / self.bin_h).floor() as i64;
        let phend = ((dh + 1) as f32 / self.bin_h).ceil() as i64;
        let pwstart = (dw as f32 / self.bin_w).floor() as i64;
        let pwend = ((dw + 1) as f32 / self.bin_w).ceil() as i64;

        CellRange {
            rows: clamp_to(phstart, pooled_height)..clamp_to(phend, pooled_height),
            cols: clamp_to(pwstart, pooled_width)..clamp_to(pwend, pooled_width),
        }
    }
}
