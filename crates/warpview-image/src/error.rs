/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when the pixel coordinates are out of bounds.
    #[error("Pixel coordinates ({0}, {1}) are out of bounds ({2}, {3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the image sizes do not match.
    #[error("Image size mismatch: expected ({0}, {1}), got ({2}, {3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the bounds of an interval do not agree in dimensionality.
    #[error("Interval bounds have different dimensionality ({0} vs {1})")]
    IntervalDimensionMismatch(usize, usize),

    /// Error when an interval cannot be rasterized into a two dimensional image.
    #[error("Interval with {0} dimensions cannot back a 2d image")]
    UnsupportedIntervalDimensions(usize),
}
