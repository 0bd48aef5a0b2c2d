use std::sync::Arc;

use serde::{Deserialize, Serialize};
use warpview_image::{Image, Interval};
use warpview_transform::AffineTransform;

use crate::error::SourceError;
use crate::field::RealField;
use crate::interpolation::InterpolationMode;
use crate::mipmap::MipmapOrdering;

/// The pixel type a source reports to renderers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleType {
    /// 8 bit unsigned integers.
    UnsignedByte,
    /// 16 bit unsigned integers.
    UnsignedShort,
    /// 32 bit floats.
    Float,
}

/// Physical size of one sample along each axis.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoxelDimensions {
    /// Unit of the sizes, e.g. `"um"`.
    pub unit: String,
    /// Size along each axis.
    pub size: Vec<f64>,
}

/// Sampled content of one resolution level.
///
/// `image` pixel `(x, y)` sits at grid position `interval.min() + (x, y)` of the level.
#[derive(Clone, Debug, PartialEq)]
pub struct Raster<const C: usize> {
    /// Grid positions covered by the image.
    pub interval: Interval,
    /// The pixel data.
    pub image: Arc<Image<f32, C>>,
}

/// A multi-resolution image source; level 0 is the finest.
///
/// Implementations are shared with rendering threads and must be cheap to query.
pub trait MultiResolutionSource<const C: usize>: Send + Sync {
    /// Whether the source has content for `timepoint`.
    fn is_present(&self, timepoint: usize) -> bool;

    /// Number of resolution levels; fixed for the lifetime of the source.
    fn num_levels(&self) -> usize;

    /// Pixel type of the content.
    fn sample_type(&self) -> SampleType;

    /// Sampled content of `level` at `timepoint`.
    fn level_content(&self, timepoint: usize, level: usize) -> Result<Raster<C>, SourceError>;

    /// The grid positions covered by [`Self::level_content`].
    fn level_interval(&self, timepoint: usize, level: usize) -> Result<Interval, SourceError> {
        Ok(self.level_content(timepoint, level)?.interval)
    }

    /// Continuous content of `level` in level pixel coordinates.
    fn interpolated_content(
        &self,
        timepoint: usize,
        level: usize,
        mode: InterpolationMode,
    ) -> Result<Box<dyn RealField<C>>, SourceError>;

    /// The map from level pixel coordinates to world coordinates.
    fn level_to_world(&self, timepoint: usize, level: usize)
        -> Result<AffineTransform, SourceError>;

    /// Physical voxel size, if known.
    fn voxel_dimensions(&self) -> Option<VoxelDimensions>;

    /// Display name.
    fn name(&self) -> String;

    /// Whether renderers may skip content outside the visible region.
    fn do_bounding_box_culling(&self) -> bool {
        true
    }

    /// The source's own level-ranking policy, if it has one.
    fn mipmap_ordering(&self) -> Option<&dyn MipmapOrdering> {
        None
    }
}

/// Fail unless `timepoint` is present and `level` exists.
pub fn check_level<const C: usize, S: MultiResolutionSource<C> + ?Sized>(
    source: &S,
    timepoint: usize,
    level: usize,
) -> Result<(), SourceError> {
    if !source.is_present(timepoint) {
        return Err(SourceError::TimepointAbsent(timepoint));
    }
    let num_levels = source.num_levels();
    if level >= num_levels {
        return Err(SourceError::LevelOutOfRange { level, num_levels });
    }
    Ok(())
}
