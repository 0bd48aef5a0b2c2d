use std::sync::Arc;

use warpview_image::{Image, ImageError, ImageSize, Interval};
use warpview_transform::AffineTransform;

use crate::error::SourceError;
use crate::field::{ImageField, RealField};
use crate::interpolation::InterpolationMode;
use crate::source::{check_level, MultiResolutionSource, Raster, SampleType, VoxelDimensions};

/// Halve an image by averaging 2x2 blocks.
///
/// Odd sizes round up; the last row or column is averaged with itself.
///
/// # Example
///
/// ```
/// use warpview_image::{Image, ImageSize};
/// use warpview_source::pyramid::pyrdown_box;
///
/// let image = Image::<f32, 1>::new(
///     ImageSize { width: 2, height: 2 },
///     vec![0.0, 1.0, 2.0, 3.0],
/// ).unwrap();
///
/// let down = pyrdown_box(&image).unwrap();
/// assert_eq!(down.as_slice(), &[1.5]);
/// ```
pub fn pyrdown_box<const C: usize>(src: &Image<f32, C>) -> Result<Image<f32, C>, ImageError> {
    let (w, h) = (src.width(), src.height());
    let size = ImageSize {
        width: w.div_ceil(2),
        height: h.div_ceil(2),
    };
    let data = src.as_slice();
    let at = |x: usize, y: usize, k: usize| data[(y.min(h - 1) * w + x.min(w - 1)) * C + k];

    let mut dst = Image::from_size_val(size, 0.0f32)?;
    for (i, pixel) in dst.as_slice_mut().chunks_exact_mut(C).enumerate() {
        let (x, y) = (2 * (i % size.width), 2 * (i / size.width));
        for (k, out) in pixel.iter_mut().enumerate() {
            *out = 0.25 * (at(x, y, k) + at(x + 1, y, k) + at(x, y + 1, k) + at(x + 1, y + 1, k));
        }
    }
    Ok(dst)
}

/// An in-memory image pyramid built by repeated 2x2 averaging.
///
/// Level `l` pixel `p` sits at world position `2^l p + (2^l - 1) / 2`, so pixel centers of
/// all levels line up with the level-0 grid.
#[derive(Clone, Debug)]
pub struct PyramidSource<const C: usize> {
    name: String,
    levels: Vec<Arc<Image<f32, C>>>,
    num_timepoints: usize,
    voxel_dimensions: Option<VoxelDimensions>,
    culling: bool,
}

impl<const C: usize> PyramidSource<C> {
    /// Build `num_levels` levels from `base`, present at a single timepoint.
    ///
    /// # Errors
    ///
    /// If `num_levels` is zero or `base` is empty.
    pub fn new(
        name: impl Into<String>,
        base: Image<f32, C>,
        num_levels: usize,
    ) -> Result<Self, SourceError> {
        if num_levels == 0 {
            return Err(SourceError::NoLevels);
        }
        if base.width() == 0 || base.height() == 0 {
            return Err(ImageError::InvalidImageSize(1, 1, base.width(), base.height()).into());
        }

        let mut levels = vec![Arc::new(base)];
        for _ in 1..num_levels {
            let next = pyrdown_box(levels[levels.len() - 1].as_ref())?;
            levels.push(Arc::new(next));
        }

        Ok(Self {
            name: name.into(),
            levels,
            num_timepoints: 1,
            voxel_dimensions: None,
            culling: true,
        })
    }

    /// The same content at timepoints `0..num_timepoints`.
    pub fn with_timepoints(mut self, num_timepoints: usize) -> Self {
        self.num_timepoints = num_timepoints;
        self
    }

    /// Attach physical voxel dimensions.
    pub fn with_voxel_dimensions(mut self, voxel_dimensions: VoxelDimensions) -> Self {
        self.voxel_dimensions = Some(voxel_dimensions);
        self
    }

    /// Set the bounding-box culling flag reported to renderers.
    pub fn with_culling(mut self, culling: bool) -> Self {
        self.culling = culling;
        self
    }

    /// The image of `level`, if it exists.
    pub fn level_image(&self, level: usize) -> Option<&Arc<Image<f32, C>>> {
        self.levels.get(level)
    }
}

impl<const C: usize> MultiResolutionSource<C> for PyramidSource<C> {
    fn is_present(&self, timepoint: usize) -> bool {
        timepoint < self.num_timepoints
    }

    fn num_levels(&self) -> usize {
        self.levels.len()
    }

    fn sample_type(&self) -> SampleType {
        SampleType::Float
    }

    fn level_content(&self, timepoint: usize, level: usize) -> Result<Raster<C>, SourceError> {
        check_level::<C, _>(self, timepoint, level)?;
        let image = self.levels[level].clone();
        Ok(Raster {
            interval: Interval::from_size(image.size()),
            image,
        })
    }

    fn level_interval(&self, timepoint: usize, level: usize) -> Result<Interval, SourceError> {
        check_level::<C, _>(self, timepoint, level)?;
        Ok(Interval::from_size(self.levels[level].size()))
    }

    fn interpolated_content(
        &self,
        timepoint: usize,
        level: usize,
        mode: InterpolationMode,
    ) -> Result<Box<dyn RealField<C>>, SourceError> {
        let raster = self.level_content(timepoint, level)?;
        Ok(Box::new(ImageField::new(raster, mode)))
    }

    fn level_to_world(
        &self,
        timepoint: usize,
        level: usize,
    ) -> Result<AffineTransform, SourceError> {
        check_level::<C, _>(self, timepoint, level)?;
        let scale = (1u64 << level) as f64;
        let offset = 0.5 * (scale - 1.0);
        Ok(AffineTransform::new_2d([scale, 0.0, offset, 0.0, scale, offset]))
    }

    fn voxel_dimensions(&self) -> Option<VoxelDimensions> {
        self.voxel_dimensions.clone()
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn do_bounding_box_culling(&self) -> bool {
        self.culling
    }
}
