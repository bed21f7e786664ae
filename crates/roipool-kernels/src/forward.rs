//! Forward ROI max pooling
//!
//! For every pooled cell `(region, ph, pw, c)` the forward pass maps the
//! cell to its input window with [`ScaledRoi::window`], scans the window in
//! row-major order and keeps the first strictly greater value. The winning
//! element's flat index within the region's batch slice is recorded so the
//! backward pass can route gradients.
//!
//! # Algorithm
//!
//! 1. Scale every region once into a [`ScaledRoi`]
//! 2. One work unit per output slot decomposes its index into a [`PooledIndex`]
//! 3. Empty windows produce `0` with no argmax
//! 4. Otherwise the running maximum starts at `-f32::MAX`; a window holding
//!    only `-inf`, `-f32::MAX` or NaN therefore keeps `-f32::MAX` and no argmax
//!
//! # Complexity
//!
//! Time: O(regions × pooled cells × out channels × window area)
//! Space: O(regions) besides the outputs

use scirs2_core::ndarray_ext::ArrayView4;

use roipool_core::{
    ArgMax, BinWindow, FeatureMap, FeatureMapDims, PooledDims, PooledIndex, PooledOutput,
    RegionList, RoiPoolConfig, RoiPoolError, RoiPoolResult, ScaledRoi,
};

use crate::parallel::{self, ParallelConfig};

/// Max-pool one window at `channel`
#[inline]
fn pool_window(
    slice: &[f32],
    map: &FeatureMapDims,
    window: &BinWindow,
    channel: usize,
) -> (f32, ArgMax) {
    if window.is_empty() {
        return (0.0, ArgMax::NONE);
    }

    let mut max_val = -f32::MAX;
    let mut max_idx = None;
    for h in window.rows() {
        for w in window.cols() {
            let idx = map.slice_index(h, w, channel);
            if slice[idx] > max_val {
                max_val = slice[idx];
                max_idx = Some(idx);
            }
        }
    }
    (max_val, ArgMax::from(max_idx))
}

/// Everything a forward work unit reads, validated once per call
struct ForwardPlan<'a> {
    feature_map: &'a FeatureMap<'a>,
    regions: &'a RegionList,
    rois: Vec<ScaledRoi>,
    config: RoiPoolConfig,
    dims: PooledDims,
    len: usize,
}

impl<'a> ForwardPlan<'a> {
    fn new(
        feature_map: &'a FeatureMap<'a>,
        regions: &'a RegionList,
        config: &RoiPoolConfig,
    ) -> RoiPoolResult<Self> {
        config.validate()?;
        let map = feature_map.dims();
        regions.check_against(&map, config.mode)?;

        let rois = regions
            .iter()
            .map(|region| ScaledRoi::from_config(region, config))
            .collect();
        let dims = PooledDims::for_call(regions.len(), &map, config);
        let len = dims.checked_len()?;

        log::debug!(
            "roi_pool_forward: {} regions over {}x{}x{}x{} map, output {:?}, mode {:?}",
            regions.len(),
            map.batch,
            map.height,
            map.width,
            map.channels,
            dims.shape(),
            config.mode
        );

        Ok(Self {
            feature_map,
            regions,
            rois,
            config: *config,
            dims,
            len,
        })
    }

    #[inline]
    fn cell(&self, flat: usize) -> (f32, ArgMax) {
        let map = self.feature_map.dims();
        let idx = PooledIndex::from_flat(flat, &self.dims);
        let region = &self.regions[idx.region];
        let window = self.rois[idx.region].window(idx.ph, idx.pw, map.height, map.width);
        let channel = region.source_channel(self.config.mode, idx.channel);

        pool_window(
            self.feature_map.batch_slice(region.batch_index),
            &map,
            &window,
            channel,
        )
    }
}

/// Pool every region of `regions` over `feature_map`
///
/// Returns the pooled values and argmax records, both shaped
/// `(regions, pooled_height, pooled_width, out_channels)`.
///
/// # Examples
///
/// ```
/// use roipool_core::{FeatureMap, FeatureMapDims, PoolMode, RegionList, RoiPoolConfig};
/// use roipool_kernels::{roi_pool_forward, ParallelConfig};
///
/// let data: Vec<f32> = (0..16).map(|x| x as f32).collect();
/// let dims = FeatureMapDims::new(1, 4, 4, 1);
/// let map = FeatureMap::new(&data, dims)?;
/// let regions = RegionList::parse(&[0.0, 0.0, 0.0, 0.0, 3.0, 3.0], 1, 6, &dims, PoolMode::AllChannels)?;
///
/// let output = roi_pool_forward(&map, &regions, &RoiPoolConfig::new(2, 2), &ParallelConfig::default())?;
/// assert_eq!(output.values, vec![5.0, 7.0, 13.0, 15.0]);
/// # Ok::<(), roipool_core::RoiPoolError>(())
/// ```
pub fn roi_pool_forward(
    feature_map: &FeatureMap<'_>,
    regions: &RegionList,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
) -> RoiPoolResult<PooledOutput> {
    let plan = ForwardPlan::new(feature_map, regions, config)?;
    let mut values = parallel::alloc_slots("pooled_output", plan.len, 0.0f32)?;
    let mut argmax = parallel::alloc_slots("argmax", plan.len, ArgMax::NONE)?;

    parallel::fill_pair(&mut values, &mut argmax, parallel, "roi_pool_forward", |flat| {
        plan.cell(flat)
    })?;

    Ok(PooledOutput {
        values,
        argmax,
        dims: plan.dims,
    })
}

/// Pool into caller-owned buffers
///
/// Every slot of `values` and `argmax` is overwritten. Both must hold
/// exactly `regions × pooled_height × pooled_width × out_channels` elements.
pub fn roi_pool_forward_into(
    feature_map: &FeatureMap<'_>,
    regions: &RegionList,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
    values: &mut [f32],
    argmax: &mut [ArgMax],
) -> RoiPoolResult<PooledDims> {
    let plan = ForwardPlan::new(feature_map, regions, config)?;
    RoiPoolError::check_len("pooled_output", plan.len, values.len())?;
    RoiPoolError::check_len("argmax", plan.len, argmax.len())?;

    parallel::fill_pair(values, argmax, parallel, "roi_pool_forward", |flat| {
        plan.cell(flat)
    })?;
    Ok(plan.dims)
}

/// Pool without recording argmax, for inference
pub fn roi_pool_forward_values(
    feature_map: &FeatureMap<'_>,
    regions: &RegionList,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
) -> RoiPoolResult<Vec<f32>> {
    let plan = ForwardPlan::new(feature_map, regions, config)?;
    let mut values = parallel::alloc_slots("pooled_output", plan.len, 0.0f32)?;

    parallel::fill(&mut values, parallel, "roi_pool_forward_values", |flat| {
        plan.cell(flat).0
    })?;
    Ok(values)
}

/// Pool values only into a caller-owned buffer
///
/// Every slot of `values` is overwritten.
pub fn roi_pool_forward_values_into(
    feature_map: &FeatureMap<'_>,
    regions: &RegionList,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
    values: &mut [f32],
) -> RoiPoolResult<PooledDims> {
    let plan = ForwardPlan::new(feature_map, regions, config)?;
    RoiPoolError::check_len("pooled_output", plan.len, values.len())?;

    parallel::fill(values, parallel, "roi_pool_forward_values", |flat| {
        plan.cell(flat).0
    })?;
    Ok(plan.dims)
}

/// Pool a standard-layout `(batch, height, width, channels)` array
///
/// `regions` holds packed host records at `region_stride`; the last one may
/// omit its padding, as in [`RegionList::parse`].
pub fn roi_pool_forward_array(
    array: ArrayView4<'_, f32>,
    regions: &[f32],
    region_stride: usize,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
) -> RoiPoolResult<PooledOutput> {
    let region_count = RegionList::record_count(regions.len(), region_stride)?;
    let feature_map = FeatureMap::from_array(array)?;
    let region_list = RegionList::parse(
        regions,
        region_count,
        region_stride,
        &feature_map.dims(),
        config.mode,
    )?;
    roi_pool_forward(&feature_map, &region_list, config, parallel)
}
