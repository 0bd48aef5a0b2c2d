use std::sync::{Arc, PoisonError, RwLock};

use warpview_image::Interval;
use warpview_transform::{AffineTransform, BoundingBoxEstimator, CoordinateTransform, TransformError};

use crate::error::SourceError;
use crate::field::RealField;
use crate::interpolation::InterpolationMode;
use crate::parallel::{rasterize, ExecutionStrategy};
use crate::source::{check_level, MultiResolutionSource, Raster, SampleType, VoxelDimensions};

#[derive(Clone)]
struct MagnitudeField {
    warp: CoordinateTransform,
    baseline: CoordinateTransform,
    warped: Vec<f64>,
    base: Vec<f64>,
}

impl MagnitudeField {
    fn new(warp: &CoordinateTransform, baseline: &CoordinateTransform) -> Self {
        let n = warp.num_target_dimensions();
        Self {
            warp: warp.copy(),
            baseline: baseline.copy(),
            warped: vec![0.0; n],
            base: vec![0.0; n],
        }
    }

    fn magnitude(&mut self, point: &[f64]) -> f64 {
        self.warp.apply(point, &mut self.warped);
        self.baseline.apply(point, &mut self.base);
        self.warped
            .iter()
            .zip(&self.base)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt()
    }
}

impl RealField<1> for MagnitudeField {
    fn num_dimensions(&self) -> usize {
        self.warp.num_source_dimensions()
    }

    fn sample(&mut self, position: &[f64]) -> [f32; 1] {
        [self.magnitude(position) as f32]
    }

    fn box_clone(&self) -> Box<dyn RealField<1>> {
        Box::new(self.clone())
    }
}

struct MagnitudeTransforms {
    warp: CoordinateTransform,
    baseline: CoordinateTransform,
}

/// Displacement between a warp and a baseline transform, as a single-level scalar source.
///
/// The value at `x` is `|warp(x) - baseline(x)|`. The domain is the world-space bounding box
/// of the target's finest level, and the level-to-world transform is the identity.
pub struct WarpMagnitudeField {
    name: String,
    domain: Interval,
    voxel_dimensions: VoxelDimensions,
    execution: ExecutionStrategy,
    transforms: RwLock<Arc<MagnitudeTransforms>>,
}

fn check_pair(warp: &CoordinateTransform, baseline: &CoordinateTransform) -> Result<(), TransformError> {
    for (expected, actual) in [
        (warp.num_source_dimensions(), baseline.num_source_dimensions()),
        (warp.num_target_dimensions(), baseline.num_target_dimensions()),
    ] {
        if expected != actual {
            return Err(TransformError::DimensionMismatch { expected, actual });
        }
    }
    Ok(())
}

impl WarpMagnitudeField {
    /// A magnitude field over the domain of `target`.
    ///
    /// # Errors
    ///
    /// If the geometry of the target's finest level cannot be read, or if `warp` and
    /// `baseline` differ in dimensionality.
    pub fn new<const C: usize>(
        name: &str,
        target: &dyn MultiResolutionSource<C>,
        warp: CoordinateTransform,
        baseline: CoordinateTransform,
    ) -> Result<Self, SourceError> {
        check_pair(&warp, &baseline)?;

        let mut to_world = CoordinateTransform::from(target.level_to_world(0, 0)?);
        let domain = BoundingBoxEstimator::default()
            .estimate_pixel_interval(&mut to_world, &target.level_interval(0, 0)?);

        let unit = target
            .voxel_dimensions()
            .map_or_else(|| "pix".to_string(), |v| v.unit);
        let dims = domain.num_dimensions();

        Ok(Self {
            name: name.to_string(),
            domain,
            voxel_dimensions: VoxelDimensions {
                unit,
                size: vec![1.0; dims],
            },
            execution: ExecutionStrategy::default(),
            transforms: RwLock::new(Arc::new(MagnitudeTransforms { warp, baseline })),
        })
    }

    /// Rasterise with `execution`.
    pub fn with_execution(mut self, execution: ExecutionStrategy) -> Self {
        self.execution = execution;
        self
    }

    /// The domain in world pixel coordinates.
    pub fn domain(&self) -> &Interval {
        &self.domain
    }

    fn transforms(&self) -> Arc<MagnitudeTransforms> {
        self.transforms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn field(&self) -> MagnitudeField {
        let t = self.transforms();
        MagnitudeField::new(&t.warp, &t.baseline)
    }

    /// Replace the warp.
    ///
    /// # Errors
    ///
    /// If `warp` differs from the baseline in dimensionality.
    pub fn set_warp(&self, warp: CoordinateTransform) -> Result<(), SourceError> {
        let mut guard = self.transforms.write().unwrap_or_else(PoisonError::into_inner);
        check_pair(&warp, &guard.baseline)?;
        let baseline = guard.baseline.copy();
        *guard = Arc::new(MagnitudeTransforms { warp, baseline });
        Ok(())
    }

    /// Replace the baseline.
    ///
    /// # Errors
    ///
    /// If `baseline` differs from the warp in dimensionality.
    pub fn set_baseline(&self, baseline: CoordinateTransform) -> Result<(), SourceError> {
        let mut guard = self.transforms.write().unwrap_or_else(PoisonError::into_inner);
        check_pair(&guard.warp, &baseline)?;
        let warp = guard.warp.copy();
        *guard = Arc::new(MagnitudeTransforms { warp, baseline });
        Ok(())
    }

    /// A copy of the baseline.
    pub fn baseline(&self) -> CoordinateTransform {
        self.transforms().baseline.copy()
    }

    /// The displacement magnitude at `point`.
    pub fn magnitude_at(&self, point: &[f64]) -> f64 {
        self.field().magnitude(point)
    }

    /// The largest magnitude over `points`, or zero for no points.
    pub fn max_over_points<P: AsRef<[f64]>>(&self, points: &[P]) -> f64 {
        let mut field = self.field();
        points
            .iter()
            .map(|p| field.magnitude(p.as_ref()))
            .fold(0.0, f64::max)
    }

    /// Smallest and largest value of the rasterised domain.
    ///
    /// # Errors
    ///
    /// If rasterisation fails.
    pub fn min_max(&self) -> Result<(f32, f32), SourceError> {
        let raster = self.level_content(0, 0)?;
        Ok(raster
            .image
            .as_slice()
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            }))
    }
}

impl MultiResolutionSource<1> for WarpMagnitudeField {
    fn is_present(&self, timepoint: usize) -> bool {
        timepoint == 0
    }

    fn num_levels(&self) -> usize {
        1
    }

    fn sample_type(&self) -> SampleType {
        SampleType::Float
    }

    fn level_content(&self, timepoint: usize, level: usize) -> Result<Raster<1>, SourceError> {
        check_level::<1, _>(self, timepoint, level)?;
        let image = rasterize(&self.field(), &self.domain, self.execution)?;
        Ok(Raster {
            interval: self.domain.clone(),
            image: Arc::new(image),
        })
    }

    fn level_interval(&self, timepoint: usize, level: usize) -> Result<Interval, SourceError> {
        check_level::<1, _>(self, timepoint, level)?;
        Ok(self.domain.clone())
    }

    fn interpolated_content(
        &self,
        timepoint: usize,
        level: usize,
        _mode: InterpolationMode,
    ) -> Result<Box<dyn RealField<1>>, SourceError> {
        check_level::<1, _>(self, timepoint, level)?;
        Ok(Box::new(self.field()))
    }

    fn level_to_world(
        &self,
        timepoint: usize,
        level: usize,
    ) -> Result<AffineTransform, SourceError> {
        check_level::<1, _>(self, timepoint, level)?;
        Ok(AffineTransform::identity(self.domain.num_dimensions()))
    }

    fn voxel_dimensions(&self) -> Option<VoxelDimensions> {
        Some(self.voxel_dimensions.clone())
    }

    fn name(&self) -> String {
        self.name.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::WarpMagnitudeField;
    use crate::error::SourceError;
    use crate::pyramid::PyramidSource;
    use crate::source::MultiResolutionSource;
    use approx::assert_relative_eq;
    use warpview_image::{Image, ImageSize, Interval};
    use warpview_transform::{AffineTransform, CoordinateTransform};

    fn target() -> Result<PyramidSource<1>, SourceError> {
        let base = Image::<f32, 1>::from_size_val(ImageSize { width: 4, height: 3 }, 0.0)?;
        PyramidSource::new("target", base, 2)
    }

    #[test]
    fn magnitude_of_scaling() -> Result<(), SourceError> {
        let field = WarpMagnitudeField::new::<1>(
            "mag",
            &target()?,
            AffineTransform::scaling(2, 2.0).into(),
            CoordinateTransform::identity(2),
        )?;
        assert_eq!(field.domain(), &Interval::new(vec![0, 0], vec![3, 2])?);
        assert_relative_eq!(field.magnitude_at(&[3.0, 4.0]), 5.0);
        assert_eq!(field.max_over_points::<[f64; 2]>(&[]), 0.0);

        let (lo, hi) = field.min_max()?;
        assert_eq!(lo, 0.0);
        assert_relative_eq!(hi, 13f32.sqrt());
        assert_eq!(field.voxel_dimensions().map(|v| v.unit), Some("pix".into()));
        Ok(())
    }

    #[test]
    fn magnitude_rejects_mismatched_baseline() -> Result<(), SourceError> {
        let field = WarpMagnitudeField::new::<1>(
            "mag",
            &target()?,
            CoordinateTransform::identity(2),
            CoordinateTransform::identity(2),
        )?;
        assert!(field.set_baseline(CoordinateTransform::identity(3)).is_err());
        field.set_warp(AffineTransform::translation(&[0.0, 1.0]).into())?;
        assert_relative_eq!(field.magnitude_at(&[7.0, 7.0]), 1.0);
        Ok(())
    }
}
