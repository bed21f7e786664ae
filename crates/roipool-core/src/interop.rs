//! Interop with `scirs2_core::ndarray_ext` arrays
//!
//! The kernels work on flat buffers. Callers holding arrays can borrow them
//! as a [`FeatureMap`] without copying, as long as the array is in standard
//! (row-major, channels-last) layout.

use scirs2_core::ndarray_ext::{Array4, ArrayView4};

use crate::argmax::ArgMax;
use crate::dims::{FeatureMapDims, PooledDims};
use crate::error::{RoiPoolError, RoiPoolResult};

/// A borrowed `(batch, height, width, channels)` feature map
#[derive(Debug, Clone, Copy)]
pub struct FeatureMap<'a> {
    data: &'a [f32],
    dims: FeatureMapDims,
}

impl<'a> FeatureMap<'a> {
    /// Wrap a flat buffer, checking its length against `dims`
    pub fn new(data: &'a [f32], dims: FeatureMapDims) -> RoiPoolResult<Self> {
        dims.validate()?;
        RoiPoolError::check_len("feature_map", dims.len(), data.len())?;
        Ok(Self { data, dims })
    }

    /// Borrow a standard-layout `(batch, height, width, channels)` array
    ///
    /// # Examples
    ///
    /// ```
    /// use scirs2_core::ndarray_ext::Array4;
    /// use roipool_core::FeatureMap;
    ///
    /// let array = Array4::<f32>::zeros((2, 4, 4, 3));
    /// let map = FeatureMap::from_array(array.view()).unwrap();
    /// assert_eq!(map.dims().batch, 2);
    /// assert_eq!(map.data().len(), 96);
    /// ```
    pub fn from_array(array: ArrayView4<'a, f32>) -> RoiPoolResult<Self> {
        let (batch, height, width, channels) = array.dim();
        let dims = FeatureMapDims::new(batch, height, width, channels);
        let data = array.to_slice().ok_or_else(|| {
            RoiPoolError::Shape("feature map array is not in standard layout".to_string())
        })?;
        Self::new(data, dims)
    }

    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    pub fn dims(&self) -> FeatureMapDims {
        self.dims
    }

    /// Values of batch element `batch`
    #[inline]
    pub fn batch_slice(&self, batch: usize) -> &'a [f32] {
        let len = self.dims.slice_len();
        &self.data[batch * len..(batch + 1) * len]
    }
}

/// Result of a forward pass: pooled values and their argmax records
#[derive(Debug, Clone, PartialEq)]
pub struct PooledOutput {
    pub values: Vec<f32>,
    pub argmax: Vec<ArgMax>,
    pub dims: PooledDims,
}

impl PooledOutput {
    /// Pooled values as a `(region, pooled_height, pooled_width, out_channels)` array
    pub fn values_array(&self) -> RoiPoolResult<Array4<f32>> {
        Array4::from_shape_vec(self.dims.shape(), self.values.clone())
            .map_err(|e| RoiPoolError::Shape(e.to_string()))
    }

    /// Argmax records in the host's `i32` encoding
    pub fn raw_argmax(&self) -> RoiPoolResult<Vec<i32>> {
        self.argmax.iter().map(|a| a.to_raw()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_map_rejects_wrong_length() {
        let data = vec![0.0f32; 15];
        let err = FeatureMap::new(&data, FeatureMapDims::new(1, 4, 4, 1)).unwrap_err();
        assert_eq!(err, RoiPoolError::dimension_mismatch("feature_map", 16, 15));
    }

    #[test]
    fn test_feature_map_batch_slice() {
        let data: Vec<f32> = (0..32).map(|x| x as f32).collect();
        let map = FeatureMap::new(&data, FeatureMapDims::new(2, 4, 4, 1)).unwrap();
        assert_eq!(map.batch_slice(1)[0], 16.0);
        assert_eq!(map.batch_slice(1).len(), 16);
    }

    #[test]
    fn test_from_array_rejects_non_standard_layout() {
        let array = Array4::<f32>::zeros((1, 2, 3, 4));
        let permuted = array.view().permuted_axes([0, 2, 1, 3]);
        assert!(matches!(
            FeatureMap::from_array(permuted),
            Err(RoiPoolError::Shape(_))
        ));
    }

    #[test]
    fn test_values_array_shape() {
        let dims = PooledDims {
            regions: 2,
            pooled_height: 2,
            pooled_width: 2,
            out_channels: 1,
        };
        let output = PooledOutput {
            values: (0..8).map(|x| x as f32).collect(),
            argmax: vec![ArgMax::NONE; 8],
            dims,
        };

        let array = output.values_array().unwrap();
        assert_eq!(array.shape(), &[2, 2, 2, 1]);
        assert_eq!(array[[1, 0, 1, 0]], 5.0);
        assert_eq!(output.raw_argmax().unwrap(), vec![-1; 8]);
    }
}
