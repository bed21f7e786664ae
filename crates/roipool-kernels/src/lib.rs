//! # roipool-kernels
//!
//! Forward and backward Region-of-Interest (ROI) max pooling kernels.
//!
//! Two-stage detectors pool every proposal region of a shared feature map
//! into a fixed `pooled_height × pooled_width` grid. This crate implements
//! that pooling and its gradient over flat, channels-last `f32` buffers.
//!
//! **Key Features:**
//! - ✅ **Forward pooling** - max value and argmax per pooled cell
//! - ✅ **Value-only forward** - skips argmax recording for inference
//! - ✅ **Backward pooling** - gathers output gradients onto the feature map
//! - ✅ **Pool-by-class mode** - pools only each region's class channel
//! - ✅ **Caller-owned buffers** - `*_into` variants and raw host launchers
//! - ✅ **Parallel dispatch** - one work unit per output slot (feature-gated)
//!
//! ## Quick Start
//!
//! ```rust
//! use roipool_core::{FeatureMap, FeatureMapDims, PoolMode, RegionList, RoiPoolConfig};
//! use roipool_kernels::{roi_pool_backward, roi_pool_forward, ParallelConfig};
//!
//! // One 4x4 single-channel map holding 0..16
//! let data: Vec<f32> = (0..16).map(|x| x as f32).collect();
//! let dims = FeatureMapDims::new(1, 4, 4, 1);
//! let map = FeatureMap::new(&data, dims)?;
//!
//! // One region covering the whole map, pooled to 2x2
//! let config = RoiPoolConfig::new(2, 2);
//! let regions = RegionList::parse(&[0.0, 0.0, 0.0, 0.0, 3.0, 3.0], 1, 6, &dims, PoolMode::AllChannels)?;
//! let parallel = ParallelConfig::default();
//!
//! let pooled = roi_pool_forward(&map, &regions, &config, &parallel)?;
//! assert_eq!(pooled.values, vec![5.0, 7.0, 13.0, 15.0]);
//!
//! let grad = roi_pool_backward(&[1.0; 4], &pooled.argmax, dims, &regions, &config, &parallel)?;
//! assert_eq!(grad.iter().filter(|g| **g == 1.0).count(), 4);
//! # Ok::<(), roipool_core::RoiPoolError>(())
//! ```
//!
//! ## Usage Recommendations
//!
//! | Operation | Notes |
//! |-----------|-------|
//! | `roi_pool_forward` | Training graphs; keep the argmax for backward |
//! | `roi_pool_forward_values` | Inference; no argmax buffer |
//! | `roi_pool_backward_into` | Reuse the gradient buffer across steps |
//! | `roi_pool_*_launch` | Hosts that store argmax as `i32` with `-1` sentinel |
//!
//! ## Features
//!
//! - `parallel` (default) - Enable parallel dispatch using rayon
//! - `serde` - `Serialize`/`Deserialize` for [`ParallelConfig`] and the core config types

#![deny(warnings)]

pub mod backward;
pub mod forward;
pub mod launch;
pub mod parallel;


// Re-exports
pub use backward::{roi_pool_backward, roi_pool_backward_into};
pub use forward::{
    roi_pool_forward, roi_pool_forward_array, roi_pool_forward_into, roi_pool_forward_values,
    roi_pool_forward_values_into,
};
pub use launch::{roi_pool_backward_launch, roi_pool_forward_launch, BackwardArgs, ForwardArgs};
pub use parallel::ParallelConfig;
