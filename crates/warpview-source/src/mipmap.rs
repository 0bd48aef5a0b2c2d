use warpview_transform::AffineTransform;

use crate::error::SourceError;
use crate::source::MultiResolutionSource;

// voxels up to this many screen pixels wide still count as screen resolution
const SCREEN_PIXEL_TOLERANCE: f64 = 1.01;

/// Rendering and prefetching priority of one level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LevelHint {
    /// The resolution level.
    pub level: usize,
    /// Position in the render order, zero first.
    pub render_order: usize,
    /// Position in the prefetch order, zero first.
    pub prefetch_order: usize,
}

/// Which levels to render for a view, in priority order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MipmapHints {
    /// Levels sorted by render order.
    pub levels: Vec<LevelHint>,
    /// Whether a coarser level may be shown while the preferred one is not ready.
    pub coarser_fallback: bool,
    /// Whether the hints must be recomputed after the next paint.
    pub renew_hints_after_painting_once: bool,
}

impl MipmapHints {
    /// The preferred level.
    pub fn best_level(&self) -> Option<usize> {
        self.levels.first().map(|h| h.level)
    }
}

/// A policy ranking resolution levels for rendering.
pub trait MipmapOrdering: Send + Sync {
    /// Rank the levels for a view with `screen_transform` (world to screen).
    fn mipmap_hints(
        &self,
        screen_transform: &AffineTransform,
        timepoint: usize,
        previous_timepoint: usize,
    ) -> Result<MipmapHints, SourceError>;
}

/// Ranks the levels of a source, using the source's own policy when it has one.
pub struct MipmapOrderingAdapter<'a, const C: usize> {
    source: &'a dyn MultiResolutionSource<C>,
}

impl<'a, const C: usize> MipmapOrderingAdapter<'a, C> {
    /// Rank the levels of `source`.
    pub fn new(source: &'a dyn MultiResolutionSource<C>) -> Self {
        Self { source }
    }

    /// Width in screen pixels of one voxel of `level`, the largest over all axes.
    pub fn voxel_screen_size(
        &self,
        screen_transform: &AffineTransform,
        timepoint: usize,
        level: usize,
    ) -> Result<f64, SourceError> {
        let m = screen_transform.concatenate(&self.source.level_to_world(timepoint, level)?);
        let n = m.num_dimensions();
        Ok((0..n)
            .map(|c| (0..n).map(|r| m.get(r, c).powi(2)).sum::<f64>().sqrt())
            .fold(0.0, f64::max))
    }

    fn default_hints(
        &self,
        screen_transform: &AffineTransform,
        timepoint: usize,
        previous_timepoint: usize,
    ) -> Result<MipmapHints, SourceError> {
        let num_levels = self.source.num_levels();

        // coarsest level whose voxels are not larger than a screen pixel
        let mut best = 0;
        for level in (0..num_levels).rev() {
            if self.voxel_screen_size(screen_transform, timepoint, level)?
                <= SCREEN_PIXEL_TOLERANCE
            {
                best = level;
                break;
            }
        }

        let levels = (best..num_levels)
            .enumerate()
            .map(|(order, level)| LevelHint {
                level,
                render_order: order,
                prefetch_order: order,
            })
            .collect();

        Ok(MipmapHints {
            levels,
            coarser_fallback: best + 1 < num_levels,
            renew_hints_after_painting_once: timepoint != previous_timepoint,
        })
    }
}

impl<const C: usize> MipmapOrdering for MipmapOrderingAdapter<'_, C> {
    fn mipmap_hints(
        &self,
        screen_transform: &AffineTransform,
        timepoint: usize,
        previous_timepoint: usize,
    ) -> Result<MipmapHints, SourceError> {
        match self.source.mipmap_ordering() {
            Some(ordering) => ordering.mipmap_hints(screen_transform, timepoint, previous_timepoint),
            None => self.default_hints(screen_transform, timepoint, previous_timepoint),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MipmapOrdering, MipmapOrderingAdapter};
    use crate::error::SourceError;
    use crate::pyramid::PyramidSource;
    use warpview_image::{Image, ImageSize};
    use warpview_transform::AffineTransform;

    #[test]
    fn best_level_follows_zoom() -> Result<(), SourceError> {
        let base = Image::<f32, 1>::from_size_val(ImageSize { width: 64, height: 64 }, 0.0)?;
        let source = PyramidSource::new("p", base, 4)?.with_timepoints(2);
        let adapter = MipmapOrderingAdapter::<1>::new(&source);

        // one screen pixel per world unit: full resolution
        let hints = adapter.mipmap_hints(&AffineTransform::identity(2), 0, 0)?;
        assert_eq!(hints.best_level(), Some(0));
        assert_eq!(hints.levels.len(), 4);
        assert!(hints.coarser_fallback);
        assert!(!hints.renew_hints_after_painting_once);

        // zoomed out by four: level 2 voxels cover one screen pixel
        let hints = adapter.mipmap_hints(&AffineTransform::scaling(2, 0.25), 1, 0)?;
        assert_eq!(hints.best_level(), Some(2));
        assert_eq!(hints.levels.iter().map(|h| h.level).collect::<Vec<_>>(), vec![2, 3]);
        assert!(hints.renew_hints_after_painting_once);

        // zoomed out a lot: only the coarsest level
        let hints = adapter.mipmap_hints(&AffineTransform::scaling(2, 0.01), 0, 0)?;
        assert_eq!(hints.best_level(), Some(3));
        assert!(!hints.coarser_fallback);
        Ok(())
    }
}
