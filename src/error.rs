//! Error types for the deformation engine

use thiserror::Error;

/// Errors produced while validating inputs or solving a deformation.
///
/// Variants fall into two families: invalid input (the caller passed
/// something the engine refuses to interpret) and numerical failure (the
/// inputs were well formed but the interpolation system cannot be solved).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum WarpError {
    /// Source and target point sequences differ in length
    #[error("source and target point counts differ ({sources} vs {targets})")]
    LengthMismatch { sources: usize, targets: usize },

    /// Image has no pixels
    #[error("image must be non-empty, got {width}x{height}")]
    EmptyImage { width: u32, height: u32 },

    /// A warp parameter is out of its valid range
    #[error("invalid value for {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// A control point has a NaN or infinite coordinate
    #[error("control point {index} has a non-finite coordinate")]
    NonFinitePoint { index: usize },

    /// A point lies outside the current image
    #[error("point ({x}, {y}) is outside the {width}x{height} image")]
    PointOutOfBounds {
        x: f64,
        y: f64,
        width: u32,
        height: u32,
    },

    /// A session operation needs an image and none is loaded
    #[error("no image loaded")]
    NoImage,

    /// Inverse map dimensions do not match the image being resampled
    #[error("inverse map is {map_width}x{map_height}, image is {width}x{height}")]
    MapSizeMismatch {
        map_width: u32,
        map_height: u32,
        width: u32,
        height: u32,
    },

    /// The kernel matrix cannot be inverted
    #[error("singular interpolation system: {reason}")]
    SingularSystem { reason: String },

    /// The solve produced NaN or infinite coefficients
    #[error("interpolation system produced non-finite coefficients")]
    NonFiniteSolution,
}

impl WarpError {
    /// True for errors caused by malformed caller input.
    pub fn is_invalid_input(&self) -> bool {
        !self.is_numerical()
    }

    /// True for errors raised by the linear solve.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            WarpError::SingularSystem { .. } | WarpError::NonFiniteSolution
        )
    }
}

pub type Result<T> = std::result::Result<T, WarpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let mismatch = WarpError::LengthMismatch { sources: 2, targets: 1 };
        assert!(mismatch.is_invalid_input());
        assert!(!mismatch.is_numerical());

        let singular = WarpError::SingularSystem {
            reason: "duplicate".to_string(),
        };
        assert!(singular.is_numerical());
        assert!(!singular.is_invalid_input());
        assert!(WarpError::NonFiniteSolution.is_numerical());
    }

    #[test]
    fn test_error_messages() {
        let err = WarpError::LengthMismatch { sources: 3, targets: 2 };
        assert_eq!(
            err.to_string(),
            "source and target point counts differ (3 vs 2)"
        );
        assert_eq!(
            WarpError::EmptyImage { width: 0, height: 4 }.to_string(),
            "image must be non-empty, got 0x4"
        );
    }
}
