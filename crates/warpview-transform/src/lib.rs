#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Transforms
//!
//! Every coordinate map is a [`CoordinateTransform`], a closed set of variants sharing one
//! `apply`/`copy`/`inverse` contract:
//!
//! - [`AffineTransform`]: n-dimensional affine map with a closed-form inverse.
//! - [`Warp`]: any stateless forward map (e.g. a fitted thin-plate spline).
//! - [`IterativeInverse`]: wraps a forward map and inverts it numerically.
//! - [`TransformSequence`]: composition, applied first to last.
//! - [`TransformBlend`]: `w(x) a(x) + (1 - w(x)) b(x)` for a weight field `w`.
//!
//! Applying a transform takes `&mut self` because some variants keep solver scratch state.
//! Use [`CoordinateTransform::copy`] to give every thread its own instance.
//!
//! ```
//! use warpview_transform::{AffineTransform, CoordinateTransform};
//!
//! let mut t = CoordinateTransform::from(AffineTransform::new_2d([2.0, 0.0, 1.0, 0.0, 2.0, -1.0]));
//! assert_eq!(t.apply_vec(&[1.0, 1.0]), vec![3.0, 1.0]);
//! ```

/// n-dimensional affine transforms.
pub mod affine;

/// bounding-box estimation through arbitrary transforms.
pub mod bbox;

/// spatially weighted blending of two transforms.
pub mod blend;

/// 2d affine decomposition and interpolation.
pub mod decomposition;

/// Error types for the transform module.
pub mod error;

/// small geometry helpers.
pub mod geom;

/// numeric inversion of forward-only transforms.
pub mod inverse;

/// plateau spherical masks and masked transform construction.
pub mod mask;

/// parameter records exchanged with the persistence layer.
pub mod record;

/// the closed transform enum and composition.
pub mod transform;

pub use crate::affine::AffineTransform;
pub use crate::bbox::{BoundingBoxEstimator, EstimationMethod};
pub use crate::blend::{blend, ConstantField, ScalarField, TransformBlend};
pub use crate::decomposition::{
    AffineInterpolator, LinearAffineInterpolator, ScalesAngle, SimilarityInterpolator,
};
pub use crate::error::TransformError;
pub use crate::inverse::{InverseSolverConfig, IterativeInverse, SolveReport};
pub use crate::mask::{FalloffShape, MaskInterpolation, MaskParameters, PlateauSphericalMask};
pub use crate::record::{BoundedRange, MaskRecord, TransformRecord};
pub use crate::transform::{CoordinateTransform, TransformSequence, Warp};
