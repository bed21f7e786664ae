//! Backward ROI max pooling
//!
//! The backward pass gathers rather than scatters: one work unit per
//! feature-map element sums the output gradients of every pooled cell whose
//! argmax selected that element. Each unit writes only its own gradient
//! slot, so no atomics or locks are needed.
//!
//! # Algorithm
//!
//! For source element `(batch, h, w, c)`:
//!
//! 1. Visit only regions on `batch` (and, in [`PoolMode::ByClass`], whose
//!    class is `c`), in region order
//! 2. Skip regions whose scaled corners do not contain `(h, w)`; bounds are
//!    inclusive and unclamped
//! 3. Invert the bin mapping to the feasible cell range with
//!    [`ScaledRoi::feasible_cells`]
//! 4. Add the output gradient of every feasible cell whose argmax is this
//!    element
//!
//! # Complexity
//!
//! Time: O(elements × (log regions + regions per batch × feasible cells))
//! Space: O(regions) besides the output

use roipool_core::{
    ArgMax, FeatureMapDims, PoolMode, PooledDims, RegionList, RoiPoolConfig, RoiPoolError,
    RoiPoolResult, ScaledRoi, SourceIndex,
};

use crate::parallel::{self, ParallelConfig};

/// Everything a backward work unit reads, validated once per call
struct BackwardPlan<'a> {
    output_grad: &'a [f32],
    argmax: &'a [ArgMax],
    map: FeatureMapDims,
    dims: PooledDims,
    mode: PoolMode,
    rois: Vec<ScaledRoi>,
    class_of: Vec<i64>,
    /// Region indices sorted by batch, ascending within a batch
    order: Vec<usize>,
    /// Batch of each entry of `order`
    order_batch: Vec<usize>,
}

impl<'a> BackwardPlan<'a> {
    fn new(
        output_grad: &'a [f32],
        argmax: &'a [ArgMax],
        map: FeatureMapDims,
        regions: &RegionList,
        config: &RoiPoolConfig,
    ) -> RoiPoolResult<Self> {
        config.validate()?;
        map.validate()?;
        regions.check_against(&map, config.mode)?;

        let dims = PooledDims::for_call(regions.len(), &map, config);
        let pooled_len = dims.checked_len()?;
        RoiPoolError::check_len("output_gradient", pooled_len, output_grad.len())?;
        RoiPoolError::check_len("argmax", pooled_len, argmax.len())?;

        let rois: Vec<ScaledRoi> = regions
            .iter()
            .map(|region| ScaledRoi::from_config(region, config))
            .collect();

        let malformed = rois.iter().filter(|roi| roi.is_malformed()).count();
        if malformed > 0 {
            log::warn!(
                "roi_pool_backward: {} of {} regions have inverted corners; their pooled cells receive no gradient",
                malformed,
                rois.len()
            );
        }

        let mut order: Vec<usize> = (0..regions.len()).collect();
        order.sort_by_key(|&n| regions[n].batch_index);
        let order_batch = order.iter().map(|&n| regions[n].batch_index).collect();

        log::debug!(
            "roi_pool_backward: {} regions onto {}x{}x{}x{} map, mode {:?}",
            regions.len(),
            map.batch,
            map.height,
            map.width,
            map.channels,
            config.mode
        );

        Ok(Self {
            output_grad,
            argmax,
            map,
            dims,
            mode: config.mode,
            rois,
            class_of: regions.iter().map(|region| region.class_index).collect(),
            order,
            order_batch,
        })
    }

    #[inline]
    fn element(&self, flat: usize) -> f32 {
        let src = SourceIndex::from_flat(flat, &self.map);
        let offset = src.slice_offset(&self.map);
        let out_channel = match self.mode {
            PoolMode::AllChannels => src.channel,
            PoolMode::ByClass => 0,
        };

        let first = self.order_batch.partition_point(|&b| b < src.batch);
        let last = self.order_batch.partition_point(|&b| b <= src.batch);

        let mut gradient = 0.0f32;
        for &n in &self.order[first..last] {
            if self.mode == PoolMode::ByClass && self.class_of[n] != src.channel as i64 {
                continue;
            }

            let roi = &self.rois[n];
            if !roi.contains(src.h, src.w) {
                continue;
            }

            let base = n * self.dims.region_len();
            let cells =
                roi.feasible_cells(src.h, src.w, self.dims.pooled_height, self.dims.pooled_width);
            for ph in cells.rows.clone() {
                for pw in cells.cols.clone() {
                    let k = base + self.dims.region_index(ph, pw, out_channel);
                    if self.argmax[k].selects(offset) {
                        gradient += self.output_grad[k];
                    }
                }
            }
        }
        gradient
    }
}

/// Route `output_grad` back onto a feature map of dimensions `map`
///
/// `output_grad` and `argmax` are shaped like the forward output for the
/// same `regions` and `config`. Returns a fresh gradient buffer of
/// `map.len()` elements.
///
/// # Examples
///
/// ```
/// use roipool_core::{ArgMax, FeatureMapDims, PoolMode, RegionList, RoiPoolConfig};
/// use roipool_kernels::{roi_pool_backward, ParallelConfig};
///
/// let dims = FeatureMapDims::new(1, 4, 4, 1);
/// let regions = RegionList::parse(&[0.0, 0.0, 0.0, 0.0, 3.0, 3.0], 1, 6, &dims, PoolMode::AllChannels)?;
/// let argmax = [5, 7, 13, 15].map(ArgMax::at);
///
/// let grad = roi_pool_backward(&[1.0; 4], &argmax, dims, &regions, &RoiPoolConfig::new(2, 2), &ParallelConfig::default())?;
/// assert_eq!(grad.iter().sum::<f32>(), 4.0);
/// assert_eq!(grad[13], 1.0);
/// # Ok::<(), roipool_core::RoiPoolError>(())
/// ```
pub fn roi_pool_backward(
    output_grad: &[f32],
    argmax: &[ArgMax],
    map: FeatureMapDims,
    regions: &RegionList,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
) -> RoiPoolResult<Vec<f32>> {
    let plan = BackwardPlan::new(output_grad, argmax, map, regions, config)?;
    // validated dims, so the element count cannot overflow
    let mut grad = parallel::alloc_slots("feature_gradient", map.len(), 0.0f32)?;
    parallel::fill(&mut grad, parallel, "roi_pool_backward", |flat| {
        plan.element(flat)
    })?;
    Ok(grad)
}

/// Route gradients into a caller-owned buffer
///
/// `feature_grad` must hold `map.len()` elements and is fully overwritten;
/// nothing is accumulated into its previous contents.
pub fn roi_pool_backward_into(
    output_grad: &[f32],
    argmax: &[ArgMax],
    map: FeatureMapDims,
    regions: &RegionList,
    config: &RoiPoolConfig,
    parallel: &ParallelConfig,
    feature_grad: &mut [f32],
) -> RoiPoolResult<()> {
    let plan = BackwardPlan::new(output_grad, argmax, map, regions, config)?;
    RoiPoolError::check_len("feature_gradient", map.len(), feature_grad.len())?;
    parallel::fill(feature_grad, parallel, "roi_pool_backward", |flat| {
        plan.element(flat)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use roipool_core::Region;

    fn regions(list: Vec<Region>, map: &FeatureMapDims, mode: PoolMode) -> RegionList {
        RegionList::from_regions(list, map, mode).unwrap()
    }

    #[test]
    fn test_quadrant_gradient() {
        let map = FeatureMapDims::new(1, 4, 4, 1);
        let list = regions(
            vec![Region::new(0, 0, 0.0, 0.0, 3.0, 3.0)],
            &map,
            PoolMode::AllChannels,
        );
        let argmax = [5, 7, 13, 15].map(ArgMax::at);

        let grad = roi_pool_backward(
            &[1.0, 2.0, 3.0, 4.0],
            &argmax,
            map,
            &list,
            &RoiPoolConfig::new(2, 2),
            &ParallelConfig::serial(),
        )
        .unwrap();

        let mut expected = vec![0.0; 16];
        expected[5] = 1.0;
        expected[7] = 2.0;
        expected[13] = 3.0;
        expected[15] = 4.0;
        assert_eq!(grad, expected);
    }

    #[test]
    fn test_overlapping_regions_accumulate() {
        let map = FeatureMapDims::new(1, 2, 2, 1);
        let list = regions(
            vec![
                Region::new(0, 0, 0.0, 0.0, 1.0, 1.0),
                Region::new(0, 0, 1.0, 1.0, 1.0, 1.0),
            ],
            &map,
            PoolMode::AllChannels,
        );
        // both regions selected (1, 1)
        let argmax = [ArgMax::at(3), ArgMax::at(3)];

        let grad = roi_pool_backward(
            &[0.5, 0.25],
            &argmax,
            map,
            &list,
            &RoiPoolConfig::new(1, 1),
            &ParallelConfig::serial(),
        )
        .unwrap();
        assert_eq!(grad, vec![0.0, 0.0, 0.0, 0.75]);
    }

    #[test]
    fn test_empty_argmax_routes_nothing() {
        let map = FeatureMapDims::new(1, 2, 2, 1);
        let list = regions(
            vec![Region::new(0, 0, 0.0, 0.0, 1.0, 1.0)],
            &map,
            PoolMode::AllChannels,
        );

        let grad = roi_pool_backward(
            &[9.0],
            &[ArgMax::NONE],
            map,
            &list,
            &RoiPoolConfig::new(1, 1),
            &ParallelConfig::serial(),
        )
        .unwrap();
        assert_eq!(grad, vec![0.0; 4]);
    }

    #[test]
    fn test_other_batch_untouched() {
        let map = FeatureMapDims::new(2, 2, 2, 1);
        let list = regions(
            vec![Region::new(1, 0, 0.0, 0.0, 1.0, 1.0)],
            &map,
            PoolMode::AllChannels,
        );

        let grad = roi_pool_backward(
            &[1.0],
            &[ArgMax::at(2)],
            map,
            &list,
            &RoiPoolConfig::new(1, 1),
            &ParallelConfig::serial(),
        )
        .unwrap();
        assert_eq!(grad, vec![0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_by_class_routes_to_class_channel() {
        let map = FeatureMapDims::new(1, 1, 2, 3);
        let list = regions(
            vec![Region::new(0, 1, 0.0, 0.0, 1.0, 0.0)],
            &map,
            PoolMode::ByClass,
        );
        // cell (0, 1) selected (h=0, w=1, c=1)
        let argmax = [ArgMax::at(1), ArgMax::at(4)];

        let grad = roi_pool_backward(
            &[2.0, 3.0],
            &argmax,
            map,
            &list,
            &RoiPoolConfig::new(1, 2).with_mode(PoolMode::ByClass),
            &ParallelConfig::serial(),
        )
        .unwrap();
        assert_eq!(grad, vec![0.0, 2.0, 0.0, 0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_inverted_region_receives_no_gradient() {
        let map = FeatureMapDims::new(1, 4, 4, 1);
        let list = regions(
            vec![Region::new(0, 0, 2.0, 2.0, 1.0, 1.0)],
            &map,
            PoolMode::AllChannels,
        );
        // forward pools the 1x1 window at (2, 2)
        let argmax = [ArgMax::at(10)];

        let grad = roi_pool_backward(
            &[1.0],
            &argmax,
            map,
            &list,
            &RoiPoolConfig::new(1, 1),
            &ParallelConfig::serial(),
        )
        .unwrap();
        assert_eq!(grad, vec![0.0; 16]);
    }

    #[test]
    fn test_backward_into_overwrites() {
        let map = FeatureMapDims::new(1, 2, 2, 1);
        let list = regions(
            vec![Region::new(0, 0, 0.0, 0.0, 1.0, 1.0)],
            &map,
            PoolMode::AllChannels,
        );
        let mut grad = vec![100.0; 4];

        roi_pool_backward_into(
            &[1.0],
            &[ArgMax::at(0)],
            map,
            &list,
            &RoiPoolConfig::new(1, 1),
            &ParallelConfig::serial(),
            &mut grad,
        )
        .unwrap();
        assert_eq!(grad, vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_backward_rejects_wrong_lengths() {
        let map = FeatureMapDims::new(1, 2, 2, 1);
        let list = regions(
            vec![Region::new(0, 0, 0.0, 0.0, 1.0, 1.0)],
            &map,
            PoolMode::AllChannels,
        );
        let config = RoiPoolConfig::new(1, 1);

        let err = roi_pool_backward(
            &[1.0, 1.0],
            &[ArgMax::NONE],
            map,
            &list,
            &config,
            &ParallelConfig::serial(),
        )
        .unwrap_err();
        assert_eq!(err, RoiPoolError::dimension_mismatch("output_gradient", 1, 2));

        let mut short = vec![0.0; 3];
        let err = roi_pool_backward_into(
            &[1.0],
            &[ArgMax::NONE],
            map,
            &list,
            &config,
            &ParallelConfig::serial(),
            &mut short,
        )
        .unwrap_err();
        assert_eq!(err, RoiPoolError::dimension_mismatch("feature_gradient", 4, 3));
        assert_eq!(short, vec![0.0; 3]);
    }

    #[test]
    fn test_backward_rejects_overflowing_map() {
        let map = FeatureMapDims::new(usize::MAX / 2, 4, 4, 1);
        let err = roi_pool_backward(
            &[],
            &[],
            map,
            &RegionList::default(),
            &RoiPoolConfig::new(2, 2),
            &ParallelConfig::serial(),
        )
        .unwrap_err();
        assert!(matches!(err, RoiPoolError::InvalidConfig { .. }));
    }

    #[test]
    fn test_regions_summed_in_order_across_batches() {
        let map = FeatureMapDims::new(3, 1, 1, 1);
        let list = regions(
            vec![
                Region::new(2, 0, 0.0, 0.0, 0.0, 0.0),
                Region::new(0, 0, 0.0, 0.0, 0.0, 0.0),
                Region::new(2, 0, 0.0, 0.0, 0.0, 0.0),
            ],
            &map,
            PoolMode::AllChannels,
        );
        let argmax = [ArgMax::at(0); 3];

        let grad = roi_pool_backward(
            &[1.0, 2.0, 4.0],
            &argmax,
            map,
            &list,
            &RoiPoolConfig::new(1, 1),
            &ParallelConfig::serial(),
        )
        .unwrap();
        assert_eq!(grad, vec![2.0, 0.0, 5.0]);
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_unallocatable_gradient_is_an_error() {
        let side = i32::MAX as usize;
        let map = FeatureMapDims::new(1, side, side, 1);
        let err = roi_pool_backward(
            &[],
            &[],
            map,
            &RegionList::default(),
            &RoiPoolConfig::new(2, 2),
            &ParallelConfig::serial(),
        )
        .unwrap_err();
        assert!(matches!(err, RoiPoolError::Execution(_)));
    }
}
