/// An error type for the transform module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum TransformError {
    /// Error when a flat matrix does not have `dims * (dims + 1)` entries.
    #[error("Matrix of length {0} does not describe a {1}d affine transform")]
    InvalidMatrixLength(usize, usize),

    /// Error when an affine transform cannot be inverted.
    #[error("Affine transform is singular")]
    SingularMatrix,

    /// Error when a transform has the wrong number of dimensions.
    #[error("Expected a {expected}d transform, got {actual}d")]
    DimensionMismatch {
        /// The required dimensionality.
        expected: usize,
        /// The dimensionality that was supplied.
        actual: usize,
    },

    /// Error when a falloff shape tag is not recognised.
    #[error("Unknown falloff shape: {0}")]
    UnknownFalloffShape(String),

    /// Error when a mask interpolation tag is not recognised.
    #[error("Unknown mask interpolation type: {0}")]
    UnknownMaskInterpolation(String),

    /// Error when a similarity or rotation mask is built without a similarity transform.
    #[error("Mask interpolation {0} requires a similarity transform")]
    MissingSimilarity(String),
}
