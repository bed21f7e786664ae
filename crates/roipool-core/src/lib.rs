//! # roipool-core
//!
//! Core types for Region-of-Interest (ROI) max pooling.
//!
//! This crate holds everything the forward and backward kernels share:
//!
//! - **Configuration** ([`RoiPoolConfig`], [`PoolMode`]) - scale, pooled grid, channel mode
//! - **Dimensions** ([`FeatureMapDims`], [`PooledDims`]) - channels-last buffer layouts
//! - **Regions** ([`Region`], [`RegionList`]) - parsing and index validation of host records
//! - **Geometry** ([`ScaledRoi`]) - the region-to-bin mapping and its inverse
//! - **Argmax records** ([`ArgMax`]) - explicit "no contribution" instead of a `-1` sentinel
//! - **Typed indices** ([`PooledIndex`], [`SourceIndex`]) - one decomposition per work unit
//!
//! The kernels themselves live in `roipool-kernels`.
//!
//! ## Quick Start
//!
//! ```
//! use roipool_core::{FeatureMapDims, PoolMode, RegionList, RoiPoolConfig, ScaledRoi};
//!
//! let map = FeatureMapDims::new(1, 4, 4, 1);
//! let config = RoiPoolConfig::new(2, 2);
//! let regions = RegionList::parse(&[0.0, 0.0, 0.0, 0.0, 3.0, 3.0], 1, 6, &map, PoolMode::AllChannels)?;
//!
//! let roi = ScaledRoi::from_config(&regions[0], &config);
//! let window = roi.window(1, 1, map.height, map.width);
//! assert_eq!(window.rows(), 2..4);
//! assert_eq!(window.cols(), 2..4);
//! # Ok::<(), roipool_core::RoiPoolError>(())
//! ```
//!
//! ## Features
//!
//! - `serde` - `Serialize`/`Deserialize` for [`RoiPoolConfig`] and [`PoolMode`]

#![deny(warnings)]

pub mod argmax;
pub mod config;
pub mod dims;
pub mod error;
pub mod geometry;
pub mod index;
pub mod interop;
pub mod region;


pub use argmax::{ArgMax, ARGMAX_NONE};
pub use config::{PoolMode, RoiPoolConfig};
pub use dims::{FeatureMapDims, PooledDims};
pub use error::{RoiPoolError, RoiPoolResult};
pub use geometry::{BinWindow, CellRange, ScaledRoi};
pub use index::{PooledIndex, SourceIndex};
pub use interop::{FeatureMap, PooledOutput};
pub use region::{Region, RegionList, REGION_FIELDS};
