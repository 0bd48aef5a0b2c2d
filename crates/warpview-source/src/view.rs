use std::sync::{Arc, Mutex, PoisonError, RwLock};

use warpview_image::{ImageError, Interval};
use warpview_transform::{
    AffineTransform, BoundingBoxEstimator, CoordinateTransform, TransformError, TransformSequence,
};

use crate::config::WarpViewConfig;
use crate::error::SourceError;
use crate::field::{RealField, TransformedField};
use crate::interpolation::InterpolationMode;
use crate::mipmap::{MipmapHints, MipmapOrdering, MipmapOrderingAdapter};
use crate::parallel::{raster_pixels, rasterize};
use crate::source::{check_level, MultiResolutionSource, Raster, SampleType, VoxelDimensions};

/// Decides whether renderers may cull a view by its bounding box.
pub type CullingOverride = Arc<dyn Fn() -> bool + Send + Sync>;

// the transform and the intervals derived from it are only ever published together
struct WarpSnapshot {
    is_transformed: bool,
    transform: Option<Arc<CoordinateTransform>>,
    bounding_intervals: Arc<[Interval]>,
    estimator: BoundingBoxEstimator,
}

impl WarpSnapshot {
    fn active_transform(&self) -> Option<&CoordinateTransform> {
        if self.is_transformed {
            self.transform.as_deref()
        } else {
            None
        }
    }

    fn clone_shallow(&self) -> Self {
        Self {
            is_transformed: self.is_transformed,
            transform: self.transform.clone(),
            bounding_intervals: self.bounding_intervals.clone(),
            estimator: self.estimator,
        }
    }
}

// a transform with its intervals, computed but not yet visible to readers
pub(crate) struct PreparedTransform {
    transform: Arc<CoordinateTransform>,
    estimator: BoundingBoxEstimator,
    bounding_intervals: Arc<[Interval]>,
}

/// A multi-resolution source seen through an optional coordinate transform.
///
/// While not transformed, or while no transform is set, every query is forwarded to the
/// wrapped source unchanged. While transformed, content of each level is the wrapped
/// content resampled through `level_to_world⁻¹ ∘ transform ∘ level_to_world`, restricted to
/// a per-level bounding interval. The transform maps view positions to wrapped-source
/// positions, both in world coordinates.
///
/// Warped content is expressed in the level's own pixel grid and [`Self::level_to_world`]
/// reports the identity while transformed.
///
/// Readers never block on a transform replacement for longer than a pointer swap: the
/// transform and its bounding intervals are computed off to the side and then published as
/// one immutable snapshot.
pub struct TransformedSourceView<const C: usize> {
    source: Arc<dyn MultiResolutionSource<C>>,
    suffix: String,
    config: WarpViewConfig,
    culling_override: Option<CullingOverride>,
    state: RwLock<Arc<WarpSnapshot>>,
    writer: Mutex<()>,
}

impl<const C: usize> TransformedSourceView<C> {
    /// Wrap `source`; the view is named `"{name}_{suffix}"`, or just `name` for an empty
    /// suffix.
    ///
    /// # Errors
    ///
    /// If the level intervals of the wrapped source at timepoint 0 cannot be read.
    pub fn new(
        source: Arc<dyn MultiResolutionSource<C>>,
        suffix: impl Into<String>,
        config: WarpViewConfig,
    ) -> Result<Self, SourceError> {
        let view = Self {
            source,
            suffix: suffix.into(),
            config,
            culling_override: None,
            state: RwLock::new(Arc::new(WarpSnapshot {
                is_transformed: false,
                transform: None,
                bounding_intervals: Arc::from(Vec::new()),
                estimator: config.estimator,
            })),
            writer: Mutex::new(()),
        };

        let intervals = view.compute_intervals(None, &config.estimator)?;
        view.publish(|s| WarpSnapshot {
            bounding_intervals: intervals,
            ..s.clone_shallow()
        });
        Ok(view)
    }

    /// Replace the default culling rule with `f`.
    pub fn with_culling_override(mut self, f: CullingOverride) -> Self {
        self.culling_override = Some(f);
        self
    }

    /// The wrapped source.
    pub fn wrapped(&self) -> &Arc<dyn MultiResolutionSource<C>> {
        &self.source
    }

    /// Name of the wrapped source.
    pub fn original_name(&self) -> String {
        self.source.name()
    }

    /// The view settings.
    pub fn config(&self) -> &WarpViewConfig {
        &self.config
    }

    fn snapshot(&self) -> Arc<WarpSnapshot> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // callers hold the writer lock
    fn publish(&self, f: impl FnOnce(&WarpSnapshot) -> WarpSnapshot) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        let next = f(&state);
        *state = Arc::new(next);
    }

    /// Install `transform` and recompute the bounding interval of every level.
    ///
    /// A transform without an exact inverse is wrapped in a bounded iterative solver. Runs
    /// in time proportional to the number of levels; call it off the render thread.
    ///
    /// # Errors
    ///
    /// If `transform` is not two dimensional, or the level geometry of the wrapped source
    /// cannot be read.
    pub fn set_transform(&self, transform: CoordinateTransform) -> Result<(), SourceError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let prepared = self.prepare_transform(transform)?;
        self.publish_prepared(prepared);
        Ok(())
    }

    // everything set_transform computes, without publishing it
    pub(crate) fn prepare_transform(
        &self,
        transform: CoordinateTransform,
    ) -> Result<PreparedTransform, SourceError> {
        for dims in [
            transform.num_source_dimensions(),
            transform.num_target_dimensions(),
        ] {
            if dims != 2 {
                return Err(TransformError::DimensionMismatch {
                    expected: 2,
                    actual: dims,
                }
                .into());
            }
        }

        let estimator = self.snapshot().estimator;
        let transform = transform.into_invertible(self.config.solver);
        let intervals = self.compute_intervals(Some(&transform), &estimator)?;
        Ok(PreparedTransform {
            transform: Arc::new(transform),
            estimator,
            bounding_intervals: intervals,
        })
    }

    pub(crate) fn install(&self, prepared: PreparedTransform) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish_prepared(prepared);
    }

    fn publish_prepared(&self, prepared: PreparedTransform) {
        self.publish(|s| WarpSnapshot {
            transform: Some(prepared.transform),
            estimator: prepared.estimator,
            bounding_intervals: prepared.bounding_intervals,
            ..s.clone_shallow()
        });
    }

    /// Remove the transform; the view passes content through even while transformed.
    ///
    /// # Errors
    ///
    /// If the level intervals of the wrapped source cannot be read.
    pub fn clear_transform(&self) -> Result<(), SourceError> {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let estimator = self.snapshot().estimator;
        let intervals = self.compute_intervals(None, &estimator)?;
        self.publish(|s| WarpSnapshot {
            transform: None,
            bounding_intervals: intervals,
            ..s.clone_shallow()
        });
        Ok(())
    }

    /// Switch between pass-through and warped content. The transform and intervals are kept.
    pub fn set_transformed(&self, is_transformed: bool) {
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(|s| WarpSnapshot {
            is_transformed,
            ..s.clone_shallow()
        });
    }

    /// Whether the view shows warped content.
    pub fn is_transformed(&self) -> bool {
        self.snapshot().is_transformed
    }

    /// A copy of the installed transform, whether or not it is currently shown.
    pub fn active_transform(&self) -> Option<CoordinateTransform> {
        self.snapshot().transform.as_deref().map(CoordinateTransform::copy)
    }

    /// Use `estimator` with `subdivisions` samples per edge and recompute the intervals.
    ///
    /// # Errors
    ///
    /// If the level geometry of the wrapped source cannot be read.
    pub fn set_bounding_box_estimator(
        &self,
        estimator: BoundingBoxEstimator,
        subdivisions: usize,
    ) -> Result<(), SourceError> {
        let estimator = BoundingBoxEstimator::new(estimator.method, subdivisions);
        let _writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        let snapshot = self.snapshot();
        let intervals = self.compute_intervals(snapshot.transform.as_deref(), &estimator)?;
        self.publish(|s| WarpSnapshot {
            estimator,
            bounding_intervals: intervals,
            ..s.clone_shallow()
        });
        Ok(())
    }

    /// The estimator used for bounding intervals.
    pub fn bounding_box_estimator(&self) -> BoundingBoxEstimator {
        self.snapshot().estimator
    }

    /// The cached bounding interval of `level`.
    pub fn bounding_interval(&self, level: usize) -> Option<Interval> {
        self.snapshot().bounding_intervals.get(level).cloned()
    }

    /// Warped content of `level` restricted to `region`, in view pixel coordinates.
    ///
    /// Renderers that only need their viewport use this instead of rasterising the whole
    /// bounding interval, which can be very large for a zooming-out transform. Without a
    /// transform the wrapped content is returned unchanged.
    ///
    /// # Errors
    ///
    /// If the timepoint or level is not present, `region` is not two dimensional, or the
    /// clipped region holds more than `max_raster_pixels` pixels.
    pub fn region_content(
        &self,
        timepoint: usize,
        level: usize,
        region: &Interval,
    ) -> Result<Raster<C>, SourceError> {
        let snapshot = self.snapshot();
        let Some(transform) = snapshot.active_transform() else {
            return self.source.level_content(timepoint, level);
        };
        check_level::<C, _>(self, timepoint, level)?;
        let bounds = &snapshot.bounding_intervals[level];
        if region.num_dimensions() != bounds.num_dimensions() {
            return Err(ImageError::UnsupportedIntervalDimensions(region.num_dimensions()).into());
        }
        self.rasterize_warped(transform, timepoint, level, bounds.intersect(region))
    }

    fn rasterize_warped(
        &self,
        transform: &CoordinateTransform,
        timepoint: usize,
        level: usize,
        interval: Interval,
    ) -> Result<Raster<C>, SourceError> {
        let limit = self.config.max_raster_pixels;
        if !raster_pixels(&interval).is_some_and(|n| n <= limit) {
            log::warn!("refusing to rasterise {interval:?} of {}", self.name());
            return Err(SourceError::RasterTooLarge { interval, limit });
        }
        let field = self.warped_field(transform, timepoint, level, self.config.interpolation)?;
        let image = rasterize(field.as_ref(), &interval, self.config.execution)?;
        Ok(Raster {
            interval,
            image: Arc::new(image),
        })
    }

    fn compute_intervals(
        &self,
        transform: Option<&CoordinateTransform>,
        estimator: &BoundingBoxEstimator,
    ) -> Result<Arc<[Interval]>, SourceError> {
        let num_levels = self.source.num_levels();
        let mut intervals = Vec::with_capacity(num_levels);
        for level in 0..num_levels {
            let native = self.source.level_interval(0, level)?;
            let interval = match transform {
                Some(t) => self.estimate_level_interval(t, level, native, estimator)?,
                None => native,
            };
            intervals.push(interval);
        }
        log::debug!(
            "recomputed {num_levels} bounding intervals for {}",
            self.name()
        );
        Ok(intervals.into())
    }

    fn estimate_level_interval(
        &self,
        transform: &CoordinateTransform,
        level: usize,
        native: Interval,
        estimator: &BoundingBoxEstimator,
    ) -> Result<Interval, SourceError> {
        let to_world = self.source.level_to_world(0, level)?;
        let Ok(to_pixel) = to_world.inverse() else {
            log::warn!(
                "level {level} of {} has a singular level-to-world transform",
                self.original_name()
            );
            return Ok(native);
        };

        let seq = level_sequence(to_world, transform, to_pixel);
        let estimate = estimator.estimate_preimage(
            &seq,
            &native.to_real(),
            self.config.bounding_box_solver,
        );
        match estimate {
            Some(interval) => Ok(interval.to_pixel_interval()),
            None => {
                log::warn!("transform of {} has no inverse", self.name());
                Ok(native)
            }
        }
    }

    fn warped_field(
        &self,
        transform: &CoordinateTransform,
        timepoint: usize,
        level: usize,
        mode: InterpolationMode,
    ) -> Result<Box<dyn RealField<C>>, SourceError> {
        let inner = self.source.interpolated_content(timepoint, level, mode)?;
        let to_world = self.source.level_to_world(timepoint, level)?;
        let to_pixel = to_world.inverse()?;
        Ok(Box::new(TransformedField::new(
            inner,
            level_sequence(to_world, transform, to_pixel),
        )))
    }
}

// level pixels -> world -> transform -> world -> level pixels
fn level_sequence(
    to_world: AffineTransform,
    transform: &CoordinateTransform,
    to_pixel: AffineTransform,
) -> CoordinateTransform {
    CoordinateTransform::Sequence(
        TransformSequence::new()
            .then(to_world)
            .then(transform.copy())
            .then(to_pixel),
    )
}

impl<const C: usize> MultiResolutionSource<C> for TransformedSourceView<C> {
    fn is_present(&self, timepoint: usize) -> bool {
        self.source.is_present(timepoint)
    }

    fn num_levels(&self) -> usize {
        self.source.num_levels()
    }

    fn sample_type(&self) -> SampleType {
        self.source.sample_type()
    }

    fn level_content(&self, timepoint: usize, level: usize) -> Result<Raster<C>, SourceError> {
        let snapshot = self.snapshot();
        let Some(transform) = snapshot.active_transform() else {
            return self.source.level_content(timepoint, level);
        };

        check_level::<C, _>(self, timepoint, level)?;
        let interval = snapshot.bounding_intervals[level].clone();
        self.rasterize_warped(transform, timepoint, level, interval)
    }

    fn level_interval(&self, timepoint: usize, level: usize) -> Result<Interval, SourceError> {
        let snapshot = self.snapshot();
        if snapshot.active_transform().is_none() {
            return self.source.level_interval(timepoint, level);
        }
        check_level::<C, _>(self, timepoint, level)?;
        Ok(snapshot.bounding_intervals[level].clone())
    }

    fn interpolated_content(
        &self,
        timepoint: usize,
        level: usize,
        mode: InterpolationMode,
    ) -> Result<Box<dyn RealField<C>>, SourceError> {
        let snapshot = self.snapshot();
        match snapshot.active_transform() {
            Some(transform) => {
                check_level::<C, _>(self, timepoint, level)?;
                self.warped_field(transform, timepoint, level, mode)
            }
            None => self.source.interpolated_content(timepoint, level, mode),
        }
    }

    fn level_to_world(
        &self,
        timepoint: usize,
        level: usize,
    ) -> Result<AffineTransform, SourceError> {
        if self.snapshot().is_transformed {
            check_level::<C, _>(self, timepoint, level)?;
            Ok(AffineTransform::identity(2))
        } else {
            self.source.level_to_world(timepoint, level)
        }
    }

    fn voxel_dimensions(&self) -> Option<VoxelDimensions> {
        self.source.voxel_dimensions()
    }

    fn name(&self) -> String {
        if self.suffix.is_empty() {
            self.source.name()
        } else {
            format!("{}_{}", self.source.name(), self.suffix)
        }
    }

    fn do_bounding_box_culling(&self) -> bool {
        match &self.culling_override {
            Some(f) => f(),
            None => !self.is_transformed() && self.source.do_bounding_box_culling(),
        }
    }

    fn mipmap_ordering(&self) -> Option<&dyn MipmapOrdering> {
        Some(self)
    }
}

impl<const C: usize> MipmapOrdering for TransformedSourceView<C> {
    fn mipmap_hints(
        &self,
        screen_transform: &AffineTransform,
        timepoint: usize,
        previous_timepoint: usize,
    ) -> Result<MipmapHints, SourceError> {
        MipmapOrderingAdapter::new(self.source.as_ref()).mipmap_hints(
            screen_transform,
            timepoint,
            previous_timepoint,
        )
    }
}
