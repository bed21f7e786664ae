//! Region descriptors and region-list parsing
//!
//! Hosts pass regions as a flat `f32` buffer of fixed-width records
//! `[batch_index, class_index, x1, y1, x2, y2, ...]`. Fields past the sixth
//! are ignored. Index fields are truncated toward zero, as a float-to-int
//! cast would do on the host.
//!
//! Coordinates are never validated: malformed rectangles are corrected by the
//! geometry mapper. Index fields are checked against the feature map so that
//! no kernel can read outside it.

use crate::config::PoolMode;
use crate::dims::FeatureMapDims;
use crate::error::{RoiPoolError, RoiPoolResult};

/// Number of meaningful fields in a region record
pub const REGION_FIELDS: usize = 6;

/// One region of interest in input image coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    /// Batch element the region is defined over
    pub batch_index: usize,
    /// Class index; addresses a channel in [`PoolMode::ByClass`]
    pub class_index: i64,
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Region {
    pub fn new(batch_index: usize, class_index: i64, x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self {
            batch_index,
            class_index,
            x1,
            y1,
            x2,
            y2,
        }
    }

    /// The region as a 6-field host record
    pub fn to_record(&self) -> [f32; REGION_FIELDS] {
        [
            self.batch_index as f32,
            self.class_index as f32,
            self.x1,
            self.y1,
            self.x2,
            self.y2,
        ]
    }

    /// Channel read for output channel `c` under `mode`
    #[inline]
    pub fn source_channel(&self, mode: PoolMode, c: usize) -> usize {
        match mode {
            PoolMode::AllChannels => c,
            PoolMode::ByClass => self.class_index as usize,
        }
    }
}

fn check_stride(region_stride: usize) -> RoiPoolResult<()> {
    if region_stride < REGION_FIELDS {
        return Err(RoiPoolError::invalid_config(
            "region_stride",
            format!(
                "must be at least {}, got {}",
                REGION_FIELDS, region_stride
            ),
        ));
    }
    Ok(())
}

/// Truncate a record field toward zero, rejecting values with no integer meaning
fn index_field(value: f32) -> Option<i64> {
    if value.is_finite() {
        Some(value.trunc() as i64)
    } else {
        None
    }
}

/// A validated list of regions
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RegionList {
    regions: Vec<Region>,
}

impl RegionList {
    /// Parse `region_count` records of `region_stride` fields from `raw`
    ///
    /// Fails if the buffer is too short, the stride is below
    /// [`REGION_FIELDS`], a batch index does not address a batch element of
    /// `map`, or (in [`PoolMode::ByClass`]) a class index does not address a
    /// channel of `map`.
    ///
    /// # Examples
    ///
    /// ```
    /// use roipool_core::{FeatureMapDims, PoolMode, RegionList};
    ///
    /// let map = FeatureMapDims::new(2, 8, 8, 4);
    /// let raw = [1.0, 3.0, 0.0, 0.0, 7.0, 7.0];
    /// let regions = RegionList::parse(&raw, 1, 6, &map, PoolMode::ByClass).unwrap();
    /// assert_eq!(regions[0].batch_index, 1);
    /// assert_eq!(regions[0].class_index, 3);
    /// ```
    pub fn parse(
        raw: &[f32],
        region_count: usize,
        region_stride: usize,
        map: &FeatureMapDims,
        mode: PoolMode,
    ) -> RoiPoolResult<Self> {
        check_stride(region_stride)?;
        // The last record only needs its meaningful fields.
        let required = match region_count {
            0 => 0,
            n => (n - 1) * region_stride + REGION_FIELDS,
        };
        if raw.len() < required {
            return Err(RoiPoolError::dimension_mismatch(
                "regions",
                required,
                raw.len(),
            ));
        }

        let mut regions = Vec::with_capacity(region_count);
        for n in 0..region_count {
            let record = &raw[n * region_stride..n * region_stride + REGION_FIELDS];

            let batch_index = match index_field(record[0]) {
                Some(b) if b >= 0 && (b as usize) < map.batch => b as usize,
                _ => {
                    return Err(RoiPoolError::invalid_region(
                        n,
                        format!(
                            "batch index {} out of range for batch size {}",
                            record[0], map.batch
                        ),
                    ))
                }
            };

            let class_index = match (index_field(record[1]), mode) {
                (Some(c), PoolMode::AllChannels) => c,
                (Some(c), PoolMode::ByClass) if c >= 0 && (c as usize) < map.channels => c,
                (None, PoolMode::AllChannels) => -1,
                _ => {
                    return Err(RoiPoolError::invalid_region(
                        n,
                        format!(
                            "class index {} out of range for {} channels",
                            record[1], map.channels
                        ),
                    ))
                }
            };

            regions.push(Region::new(
                batch_index,
                class_index,
                record[2],
                record[3],
                record[4],
                record[5],
            ));
        }

        Ok(Self { regions })
    }

    /// Number of records packed in `len` floats at `region_stride`
    ///
    /// Uses the same rule as [`RegionList::parse`]: the last record may omit
    /// its padding but must carry all of its meaningful fields. A trailing
    /// fragment shorter than that is a dimension mismatch.
    ///
    /// ```
    /// use roipool_core::RegionList;
    ///
    /// // two records at stride 7, the last without padding
    /// assert_eq!(RegionList::record_count(13, 7).unwrap(), 2);
    /// assert!(RegionList::record_count(15, 7).is_err());
    /// ```
    pub fn record_count(len: usize, region_stride: usize) -> RoiPoolResult<usize> {
        check_stride(region_stride)?;
        if len == 0 {
            return Ok(0);
        }
        if len < REGION_FIELDS {
            return Err(RoiPoolError::dimension_mismatch(
                "regions",
                REGION_FIELDS,
                len,
            ));
        }
        let count = (len - REGION_FIELDS) / region_stride + 1;
        let covered = count.saturating_mul(region_stride);
        if len > covered {
            return Err(RoiPoolError::dimension_mismatch(
                "regions",
                covered.saturating_add(REGION_FIELDS),
                len,
            ));
        }
        Ok(count)
    }

    /// Build a list from already-typed regions, validating their indices
    pub fn from_regions(
        regions: Vec<Region>,
        map: &FeatureMapDims,
        mode: PoolMode,
    ) -> RoiPoolResult<Self> {
        let raw: Vec<f32> = regions.iter().flat_map(|r| r.to_record()).collect();
        Self::parse(&raw, regions.len(), REGION_FIELDS, map, mode)
    }

    /// Re-check every region's indices against `map` and `mode`
    ///
    /// Kernels call this before touching any buffer, since a list parsed
    /// for one map can be passed alongside another.
    pub fn check_against(&self, map: &FeatureMapDims, mode: PoolMode) -> RoiPoolResult<()> {
        for (n, region) in self.regions.iter().enumerate() {
            if region.batch_index >= map.batch {
                return Err(RoiPoolError::invalid_region(
                    n,
                    format!(
                        "batch index {} out of range for batch size {}",
                        region.batch_index, map.batch
                    ),
                ));
            }
            if mode == PoolMode::ByClass
                && (region.class_index < 0 || region.class_index as usize >= map.channels)
            {
                return Err(RoiPoolError::invalid_region(
                    n,
                    format!(
                        "class index {} out of range for {} channels",
                        region.class_index, map.channels
                    ),
                ));
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.regions.iter()
    }

    pub fn as_slice(&self) -> &[Region] {
        &self.regions
    }
}

impl std::ops::Index<usize> for RegionList {
    type Output = Region;

    fn index(&self, index: usize) -> &Region {
        &self.regions[index]
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.regions.iter()
    }
}
