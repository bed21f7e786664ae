//! # roipool - Region-of-Interest Max Pooling for COOLJAPAN
//!
//! Forward and backward ROI max pooling over channels-last feature maps,
//! as used by the detection head of two-stage object detectors.
//!
//! This is the **meta crate** that re-exports all roipool components for convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use roipool::prelude::*;
//!
//! let data: Vec<f32> = (0..16).map(|x| x as f32).collect();
//! let dims = FeatureMapDims::new(1, 4, 4, 1);
//! let map = FeatureMap::new(&data, dims)?;
//!
//! let config = RoiPoolConfig::new(2, 2);
//! let regions = RegionList::parse(&[0.0, 0.0, 0.0, 0.0, 3.0, 3.0], 1, 6, &dims, config.mode)?;
//!
//! let pooled = roi_pool_forward(&map, &regions, &config, &ParallelConfig::default())?;
//! assert_eq!(pooled.values, vec![5.0, 7.0, 13.0, 15.0]);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Core Types ([`core`])
//!
//! Configuration, buffer dimensions, region parsing, the region-to-bin
//! geometry and argmax records.
//!
//! ```
//! use roipool::core::{PoolMode, RoiPoolConfig};
//!
//! let config = RoiPoolConfig::new(7, 7)
//!     .with_spatial_scale(1.0 / 16.0)
//!     .with_pool_by_channel(true);
//! assert_eq!(config.mode, PoolMode::ByClass);
//! assert_eq!(config.mode.out_channels(21), 1);
//! ```
//!
//! ### Pooling Kernels ([`kernels`])
//!
//! Forward (with or without argmax), backward, caller-buffer variants and
//! raw host launchers.
//!
//! ```
//! use roipool::kernels::{roi_pool_forward_array, ParallelConfig};
//! use roipool::core::RoiPoolConfig;
//! use scirs2_core::ndarray_ext::Array4;
//!
//! let map = Array4::<f32>::ones((1, 8, 8, 3));
//! let pooled = roi_pool_forward_array(
//!     map.view(),
//!     &[0.0, 0.0, 0.0, 0.0, 7.0, 7.0],
//!     6,
//!     &RoiPoolConfig::new(2, 2),
//!     &ParallelConfig::serial(),
//! )?;
//! assert_eq!(pooled.values_array()?.shape(), &[1, 2, 2, 3]);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): Enable parallel kernel dispatch
//! - `serde`: Enable serialization of configuration types
//! - `full`: Enable all features

#![deny(warnings)]

// Re-export all components
pub use roipool_core as core;
pub use roipool_kernels as kernels;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use roipool::prelude::*;
    //!
    //! let config = RoiPoolConfig::default();
    //! assert_eq!(config.pooled_cells(), 49);
    //! ```

    // Core types
    pub use crate::core::{
        ArgMax, FeatureMap, FeatureMapDims, PoolMode, PooledDims, PooledOutput, Region,
        RegionList, RoiPoolConfig, RoiPoolError, RoiPoolResult,
    };

    // Kernels
    pub use crate::kernels::{
        roi_pool_backward, roi_pool_backward_into, roi_pool_forward, roi_pool_forward_into,
        roi_pool_forward_values, roi_pool_forward_values_into, ParallelConfig,
    };
}
