use std::sync::Arc;

use warpview_transform::{BoundingBoxEstimator, CoordinateTransform};

use crate::config::WarpViewConfig;
use crate::error::SourceError;
use crate::source::MultiResolutionSource;
use crate::view::TransformedSourceView;

/// A view of a source together with a view of its volatile companion.
///
/// Both views always carry the same transform, toggle and estimator; the companion holds an
/// independent copy of the transform.
pub struct SourcePair<const C: usize> {
    /// View of the primary source.
    pub primary: Arc<TransformedSourceView<C>>,
    /// View of the volatile companion, if there is one.
    pub companion: Option<Arc<TransformedSourceView<C>>>,
}

impl<const C: usize> SourcePair<C> {
    /// Wrap `source` and, if given, its `volatile` companion with the same suffix and settings.
    ///
    /// # Errors
    ///
    /// If either view cannot be created.
    pub fn wrap(
        source: Arc<dyn MultiResolutionSource<C>>,
        volatile: Option<Arc<dyn MultiResolutionSource<C>>>,
        suffix: &str,
        config: WarpViewConfig,
    ) -> Result<Self, SourceError> {
        let primary = Arc::new(TransformedSourceView::new(source, suffix, config)?);
        let companion = volatile
            .map(|v| TransformedSourceView::new(v, suffix, config).map(Arc::new))
            .transpose()?;
        Ok(Self { primary, companion })
    }

    fn views(&self) -> impl Iterator<Item = &Arc<TransformedSourceView<C>>> {
        std::iter::once(&self.primary).chain(self.companion.iter())
    }

    /// Install `transform` in both views.
    ///
    /// Both views are prepared before either is updated, so a failure leaves the pair as it
    /// was.
    ///
    /// # Errors
    ///
    /// If either view rejects the transform.
    pub fn set_transform(&self, transform: &CoordinateTransform) -> Result<(), SourceError> {
        let prepared = self
            .views()
            .map(|view| Ok((view, view.prepare_transform(transform.copy())?)))
            .collect::<Result<Vec<_>, SourceError>>()?;
        for (view, p) in prepared {
            view.install(p);
        }
        Ok(())
    }

    /// Remove the transform from both views.
    ///
    /// # Errors
    ///
    /// If either view cannot recompute its intervals.
    pub fn clear_transform(&self) -> Result<(), SourceError> {
        for view in self.views() {
            view.clear_transform()?;
        }
        Ok(())
    }

    /// Toggle both views.
    pub fn set_transformed(&self, is_transformed: bool) {
        for view in self.views() {
            view.set_transformed(is_transformed);
        }
    }

    /// Change the estimator of both views.
    ///
    /// # Errors
    ///
    /// If either view cannot recompute its intervals.
    pub fn set_bounding_box_estimator(
        &self,
        estimator: BoundingBoxEstimator,
        subdivisions: usize,
    ) -> Result<(), SourceError> {
        for view in self.views() {
            view.set_bounding_box_estimator(estimator, subdivisions)?;
        }
        Ok(())
    }
}
