use serde::{Deserialize, Serialize};
use warpview_transform::{BoundingBoxEstimator, InverseSolverConfig};

use crate::error::SourceError;
use crate::interpolation::InterpolationMode;
use crate::parallel::ExecutionStrategy;

/// Settings of a [`crate::TransformedSourceView`].
///
/// Every field has a default, so a JSON document only needs the fields it changes:
///
/// ```
/// use warpview_source::WarpViewConfig;
///
/// let config = WarpViewConfig::from_json(r#"{ "estimator": { "samples_per_dim": 9 } }"#).unwrap();
/// assert_eq!(config.estimator.samples_per_dim, 9);
/// assert_eq!(config.bounding_box_solver.max_iters, 500);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarpViewConfig {
    /// How bounding intervals are estimated.
    pub estimator: BoundingBoxEstimator,
    /// Solver used when a warp is made invertible.
    pub solver: InverseSolverConfig,
    /// Solver used while estimating bounding intervals.
    pub bounding_box_solver: InverseSolverConfig,
    /// Parallelism of warped rasterisation.
    pub execution: ExecutionStrategy,
    /// Interpolation of warped content.
    pub interpolation: InterpolationMode,
    /// Largest number of pixels a warped level is rasterised into.
    pub max_raster_pixels: u64,
}

impl Default for WarpViewConfig {
    fn default() -> Self {
        Self {
            estimator: BoundingBoxEstimator::default(),
            solver: InverseSolverConfig::default(),
            bounding_box_solver: InverseSolverConfig::default().with_max_iters(500),
            execution: ExecutionStrategy::default(),
            interpolation: InterpolationMode::default(),
            max_raster_pixels: 1 << 26,
        }
    }
}

impl WarpViewConfig {
    /// Parse a configuration from JSON.
    ///
    /// # Errors
    ///
    /// If the document is malformed.
    pub fn from_json(json: &str) -> Result<Self, SourceError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::WarpViewConfig;
    use crate::error::SourceError;
    use crate::parallel::ExecutionStrategy;
    use warpview_transform::EstimationMethod;

    #[test]
    fn config_partial_json() -> Result<(), SourceError> {
        let config = WarpViewConfig::from_json(
            r#"{ "execution": { "Fixed": 3 }, "estimator": { "method": "Corners" } }"#,
        )?;
        assert_eq!(config.execution, ExecutionStrategy::Fixed(3));
        assert_eq!(config.estimator.method, EstimationMethod::Corners);
        assert_eq!(config.estimator.samples_per_dim, 5);
        assert_eq!(config.solver.max_iters, 200);
        assert_eq!(config.max_raster_pixels, 1 << 26);

        let config = WarpViewConfig::from_json(r#"{ "max_raster_pixels": 4096 }"#)?;
        assert_eq!(config.max_raster_pixels, 4096);
        Ok(())
    }

    #[test]
    fn config_rejects_garbage() {
        assert!(matches!(
            WarpViewConfig::from_json("{ \"execution\": 12 }"),
            Err(SourceError::Config(_))
        ));
    }
}
