//! Error types for ROI pooling
//!
//! Every entry point validates its buffers and region records before writing
//! any output, so a returned error always means the output buffers hold no
//! valid result.
//!
//! # Examples
//!
//! ```
//! use roipool_core::error::{RoiPoolError, RoiPoolResult};
//!
//! fn check_pooled(pooled_height: usize) -> RoiPoolResult<()> {
//!     if pooled_height == 0 {
//!         return Err(RoiPoolError::invalid_config("pooled_height", "must be positive"));
//!     }
//!     Ok(())
//! }
//!
//! assert!(check_pooled(0).is_err());
//! ```

use thiserror::Error;

/// Error type for ROI pooling operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RoiPoolError {
    /// A caller-supplied buffer does not have the length its dimensions imply
    #[error("{buffer}: dimension mismatch - expected {expected} elements, got {actual}")]
    DimensionMismatch {
        buffer: String,
        expected: usize,
        actual: usize,
    },

    /// A configuration value is outside its valid domain
    #[error("invalid configuration '{parameter}': {reason}")]
    InvalidConfig { parameter: String, reason: String },

    /// A region record carries an index that does not address the feature map
    #[error("invalid region {region}: {reason}")]
    InvalidRegion { region: usize, reason: String },

    /// Array shape conversion failed
    #[error("shape error: {0}")]
    Shape(String),

    /// The parallel executor could not run the call
    #[error("execution failed: {0}")]
    Execution(String),
}

/// Result type for ROI pooling operations
pub type RoiPoolResult<T> = Result<T, RoiPoolError>;

impl RoiPoolError {
    /// Create a dimension mismatch error
    pub fn dimension_mismatch(buffer: impl Into<String>, expected: usize, actual: usize) -> Self {
        RoiPoolError::DimensionMismatch {
            buffer: buffer.into(),
            expected,
            actual,
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(parameter: impl Into<String>, reason: impl Into<String>) -> Self {
        RoiPoolError::InvalidConfig {
            parameter: parameter.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid region error
    pub fn invalid_region(region: usize, reason: impl Into<String>) -> Self {
        RoiPoolError::InvalidRegion {
            region,
            reason: reason.into(),
        }
    }

    /// Create an execution error
    pub fn execution(message: impl Into<String>) -> Self {
        RoiPoolError::Execution(message.into())
    }

    /// Check a buffer length against the length its dimensions imply
    pub fn check_len(buffer: &str, expected: usize, actual: usize) -> RoiPoolResult<()> {
        if expected != actual {
            return Err(Self::dimension_mismatch(buffer, expected, actual));
        }
        Ok(())
    }
}
