//! Host-facing launchers over raw buffers
//!
//! These entry points take the flat argument lists a training-graph host
//! passes to a pooling op: raw dimensions, a `pool_by_channel` flag, region
//! records with an arbitrary stride, and `i32` argmax buffers using `-1` for
//! "no contribution". They validate everything, run the typed kernels, and
//! report failures as errors. Caller buffers hold no valid result after an
//! error.

use roipool_core::{
    ArgMax, FeatureMap, FeatureMapDims, PooledDims, RegionList, RoiPoolConfig, RoiPoolError,
    RoiPoolResult,
};

use crate::backward::roi_pool_backward_into;
use crate::forward::{roi_pool_forward_into, roi_pool_forward_values_into};
use crate::parallel::{self, ParallelConfig};

/// Arguments of a forward launch
#[derive(Debug, Clone, Copy)]
pub struct ForwardArgs<'a> {
    pub feature_map: &'a [f32],
    pub spatial_scale: f32,
    pub pool_by_channel: bool,
    pub region_count: usize,
    pub region_stride: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub pooled_height: usize,
    pub pooled_width: usize,
    pub regions: &'a [f32],
}

impl ForwardArgs<'_> {
    pub fn config(&self) -> RoiPoolConfig {
        RoiPoolConfig::new(self.pooled_height, self.pooled_width)
            .with_spatial_scale(self.spatial_scale)
            .with_pool_by_channel(self.pool_by_channel)
    }

    /// Number of elements the pooled output and argmax buffers must hold
    ///
    /// Saturates at `usize::MAX`; the launcher rejects such sizes.
    pub fn output_len(&self) -> usize {
        let out_channels = self.config().mode.out_channels(self.channels);
        self.region_count
            .saturating_mul(self.pooled_height)
            .saturating_mul(self.pooled_width)
            .saturating_mul(out_channels)
    }
}

/// Arguments of a backward launch
#[derive(Debug, Clone, Copy)]
pub struct BackwardArgs<'a> {
    pub output_grad: &'a [f32],
    pub spatial_scale: f32,
    pub pool_by_channel: bool,
    pub batch_size: usize,
    pub region_count: usize,
    pub region_stride: usize,
    pub height: usize,
    pub width: usize,
    pub channels: usize,
    pub pooled_height: usize,
    pub pooled_width: usize,
    pub regions: &'a [f32],
    pub argmax: &'a [i32],
}

impl BackwardArgs<'_> {
    pub fn config(&self) -> RoiPoolConfig {
        RoiPoolConfig::new(self.pooled_height, self.pooled_width)
            .with_spatial_scale(self.spatial_scale)
            .with_pool_by_channel(self.pool_by_channel)
    }

    pub fn dims(&self) -> FeatureMapDims {
        FeatureMapDims::new(self.batch_size, self.height, self.width, self.channels)
    }

    /// Number of elements the feature-map gradient buffer must hold
    ///
    /// Saturates at `usize::MAX`; the launcher rejects such sizes.
    pub fn output_len(&self) -> usize {
        self.batch_size
            .saturating_mul(self.height)
            .saturating_mul(self.width)
            .saturating_mul(self.channels)
    }
}

/// Run a forward pass into `pooled` and, when given, `argmax`
///
/// Without an argmax buffer the pass records no argmax, as an inference
/// graph would run it. The batch size is inferred from the feature map
/// length.
pub fn roi_pool_forward_launch(
    args: &ForwardArgs<'_>,
    pooled: &mut [f32],
    argmax: Option<&mut [i32]>,
    parallel: &ParallelConfig,
) -> RoiPoolResult<()> {
    let config = args.config();
    let dims = FeatureMapDims::infer_batch(
        args.feature_map.len(),
        args.height,
        args.width,
        args.channels,
    )?;
    let feature_map = FeatureMap::new(args.feature_map, dims)?;
    let regions = RegionList::parse(
        args.regions,
        args.region_count,
        args.region_stride,
        &dims,
        config.mode,
    )?;

    let pooled_len = PooledDims::for_call(regions.len(), &dims, &config).checked_len()?;
    RoiPoolError::check_len("pooled_output", pooled_len, pooled.len())?;

    match argmax {
        None => {
            roi_pool_forward_values_into(&feature_map, &regions, &config, parallel, pooled)?;
        }
        Some(raw_argmax) => {
            RoiPoolError::check_len("argmax", pooled_len, raw_argmax.len())?;
            if dims.slice_len() > i32::MAX as usize {
                return Err(RoiPoolError::invalid_config(
                    "feature_map",
                    format!(
                        "batch slice of {} elements cannot be indexed by i32 argmax records",
                        dims.slice_len()
                    ),
                ));
            }

            let mut typed = parallel::alloc_slots("argmax", pooled_len, ArgMax::NONE)?;
            roi_pool_forward_into(&feature_map, &regions, &config, parallel, pooled, &mut typed)?;
            for (slot, record) in raw_argmax.iter_mut().zip(&typed) {
                *slot = record.to_raw()?;
            }
        }
    }
    Ok(())
}

/// Run a backward pass, overwriting `feature_grad`
pub fn roi_pool_backward_launch(
    args: &BackwardArgs<'_>,
    feature_grad: &mut [f32],
    parallel: &ParallelConfig,
) -> RoiPoolResult<()> {
    let config = args.config();
    let dims = args.dims();
    dims.validate()?;
    let regions = RegionList::parse(
        args.regions,
        args.region_count,
        args.region_stride,
        &dims,
        config.mode,
    )?;

    let argmax: Vec<ArgMax> = args.argmax.iter().map(|&raw| ArgMax::from_raw(raw)).collect();
    roi_pool_backward_into(
        args.output_grad,
        &argmax,
        dims,
        &regions,
        &config,
        parallel,
        feature_grad,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Vec<f32> {
        (0..16).map(|x| x as f32).collect()
    }

    fn forward_args<'a>(feature_map: &'a [f32], regions: &'a [f32]) -> ForwardArgs<'a> {
        ForwardArgs {
            feature_map,
            spatial_scale: 1.0,
            pool_by_channel: false,
            region_count: 1,
            region_stride: 6,
            height: 4,
            width: 4,
            channels: 1,
            pooled_height: 2,
            pooled_width: 2,
            regions,
        }
    }

    #[test]
    fn test_forward_launch_writes_raw_argmax() {
        let data = ramp();
        let regions = [0.0, 0.0, 0.0, 0.0, 3.0, 3.0];
        let args = forward_args(&data, &regions);

        let mut pooled = vec![0.0; args.output_len()];
        let mut argmax = vec![0i32; args.output_len()];
        roi_pool_forward_launch(
            &args,
            &mut pooled,
            Some(argmax.as_mut_slice()),
            &ParallelConfig::default(),
        )
        .unwrap();

        assert_eq!(pooled, vec![5.0, 7.0, 13.0, 15.0]);
        assert_eq!(argmax, vec![5, 7, 13, 15]);
    }

    #[test]
    fn test_forward_launch_sentinel_for_empty_cells() {
        let data = ramp();
        let regions = [0.0, 0.0, -6.0, -6.0, 1.0, 1.0];
        let args = forward_args(&data, &regions);

        let mut pooled = vec![0.0; 4];
        let mut argmax = vec![0i32; 4];
        roi_pool_forward_launch(
            &args,
            &mut pooled,
            Some(argmax.as_mut_slice()),
            &ParallelConfig::serial(),
        )
        .unwrap();

        // width 8 into 2 bins of 4: only the last bin reaches the map
        assert_eq!(argmax, vec![-1, -1, -1, 5]);
        assert_eq!(pooled, vec![0.0, 0.0, 0.0, 5.0]);
    }

    #[test]
    fn test_forward_launch_without_argmax() {
        let data = ramp();
        let regions = [0.0, 0.0, 0.0, 0.0, 3.0, 3.0];
        let args = forward_args(&data, &regions);

        let mut pooled = vec![f32::NAN; 4];
        roi_pool_forward_launch(&args, &mut pooled, None, &ParallelConfig::serial()).unwrap();
        assert_eq!(pooled, vec![5.0, 7.0, 13.0, 15.0]);

        let mut short = vec![0.0; 5];
        let err = roi_pool_forward_launch(&args, &mut short, None, &ParallelConfig::serial())
            .unwrap_err();
        assert_eq!(err, RoiPoolError::dimension_mismatch("pooled_output", 4, 5));
    }

    #[test]
    fn test_forward_launch_rejects_out_of_range_batch() {
        let data = ramp();
        let regions = [1.0, 0.0, 0.0, 0.0, 3.0, 3.0];
        let args = forward_args(&data, &regions);

        let mut pooled = vec![0.0; 4];
        let err = roi_pool_forward_launch(&args, &mut pooled, None, &ParallelConfig::serial())
            .unwrap_err();
        assert!(matches!(err, RoiPoolError::InvalidRegion { region: 0, .. }));
    }

    #[test]
    fn test_forward_launch_rejects_zero_threads() {
        let data = ramp();
        let regions = [0.0, 0.0, 0.0, 0.0, 3.0, 3.0];
        let args = forward_args(&data, &regions);

        let mut pooled = vec![0.0; 4];
        let parallel = ParallelConfig::default().with_num_threads(0);
        let err = roi_pool_forward_launch(&args, &mut pooled, None, &parallel).unwrap_err();
        assert!(matches!(err, RoiPoolError::InvalidConfig { .. }));
    }

    #[test]
    fn test_backward_launch() {
        let regions = [0.0, 0.0, 0.0, 0.0, 3.0, 3.0];
        let argmax = [5, 7, 13, -1];
        let args = BackwardArgs {
            output_grad: &[1.0, 1.0, 1.0, 1.0],
            spatial_scale: 1.0,
            pool_by_channel: false,
            batch_size: 1,
            region_count: 1,
            region_stride: 6,
            height: 4,
            width: 4,
            channels: 1,
            pooled_height: 2,
            pooled_width: 2,
            regions: &regions,
            argmax: &argmax,
        };

        let mut grad = vec![f32::NAN; args.output_len()];
        roi_pool_backward_launch(&args, &mut grad, &ParallelConfig::default()).unwrap();

        let hot: Vec<usize> = (0..16).filter(|&i| grad[i] != 0.0).collect();
        assert_eq!(hot, vec![5, 7, 13]);
        assert!(grad.iter().all(|g| *g == 0.0 || *g == 1.0));
    }
}
