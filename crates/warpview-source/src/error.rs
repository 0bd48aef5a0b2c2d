use warpview_image::{ImageError, Interval};
use warpview_transform::TransformError;

use crate::parallel::ParallelError;

/// An error type for the source module.
#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    /// Error when content is requested for a timepoint the source does not hold.
    #[error("Timepoint {0} is not present")]
    TimepointAbsent(usize),

    /// Error when a resolution level does not exist.
    #[error("Level {level} is out of range, the source has {num_levels} levels")]
    LevelOutOfRange {
        /// The requested level.
        level: usize,
        /// Number of levels of the source.
        num_levels: usize,
    },

    /// Error when a pyramid is built with no levels.
    #[error("A source needs at least one resolution level")]
    NoLevels,

    /// Error when a raster would hold more pixels than allowed.
    #[error("Raster over {interval:?} exceeds the limit of {limit} pixels")]
    RasterTooLarge {
        /// The interval that was requested.
        interval: Interval,
        /// The pixel limit in force.
        limit: u64,
    },

    /// Error from the image module.
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Error from the transform module.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Error from parallel rasterisation.
    #[error(transparent)]
    Parallel(#[from] ParallelError),

    /// Error when a configuration cannot be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}
