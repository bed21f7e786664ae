//! Argmax records
//!
//! Each pooled cell records which feature-map element produced its value, as
//! a flat index into the region's batch slice, or nothing when the cell's
//! window was empty. Hosts that store argmax maps as `i32` buffers use `-1`
//! for the empty case; [`ArgMax::to_raw`] and [`ArgMax::from_raw`] convert.

use crate::error::{RoiPoolError, RoiPoolResult};

/// Host-side encoding of "no contributing element"
pub const ARGMAX_NONE: i32 = -1;

/// Source element selected by a pooled cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ArgMax(Option<usize>);

impl ArgMax {
    /// No element contributed
    pub const NONE: ArgMax = ArgMax(None);

    /// The element at `index` within the batch slice
    pub fn at(index: usize) -> Self {
        ArgMax(Some(index))
    }

    pub fn index(self) -> Option<usize> {
        self.0
    }

    pub fn is_none(self) -> bool {
        self.0.is_none()
    }

    /// Whether this record selects `index`
    #[inline]
    pub fn selects(self, index: usize) -> bool {
        self.0 == Some(index)
    }

    /// Decode a host `i32` record; any negative value means "none"
    pub fn from_raw(raw: i32) -> Self {
        if raw < 0 {
            ArgMax::NONE
        } else {
            ArgMax(Some(raw as usize))
        }
    }

    /// Encode as a host `i32` record
    pub fn to_raw(self) -> RoiPoolResult<i32> {
        match self.0 {
            None => Ok(ARGMAX_NONE),
            Some(index) => i32::try_from(index).map_err(|_| {
                RoiPoolError::invalid_config(
                    "argmax",
                    format!("index {} does not fit in an i32 record", index),
                )
            }),
        }
    }
}

impl From<Option<usize>> for ArgMax {
    fn from(value: Option<usize>) -> Self {
        ArgMax(value)
    }
}

impl From<ArgMax> for Option<usize> {
    fn from(value: ArgMax) -> Self {
        value.0
    }
}
