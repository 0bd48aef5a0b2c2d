#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! A [`TransformedSourceView`] wraps any [`MultiResolutionSource`] and shows it through a
//! coordinate transform without copying pixels up front. Content is resampled on request,
//! restricted to per-level bounding intervals that are recomputed whenever the transform
//! changes.
//!
//! ```
//! use std::sync::Arc;
//! use warpview_image::{Image, ImageSize};
//! use warpview_source::{MultiResolutionSource, PyramidSource, TransformedSourceView, WarpViewConfig};
//! use warpview_transform::AffineTransform;
//!
//! let base = Image::<f32, 1>::from_size_val(ImageSize { width: 8, height: 8 }, 1.0).unwrap();
//! let source = Arc::new(PyramidSource::new("moving", base, 2).unwrap());
//! let view = TransformedSourceView::<1>::new(source, "xfm", WarpViewConfig::default()).unwrap();
//!
//! view.set_transform(AffineTransform::translation(&[2.0, 0.0]).into()).unwrap();
//! view.set_transformed(true);
//! assert_eq!(view.name(), "moving_xfm");
//! assert_eq!(view.level_interval(0, 0).unwrap().min(), &[-2, 0]);
//! ```

/// view settings loaded from JSON.
pub mod config;

/// Error types for the source module.
pub mod error;

/// paired views of a source and its volatile companion.
pub mod factory;

/// continuous fields sampled at real positions.
pub mod field;

/// pixel interpolation kernels.
pub mod interpolation;

/// displacement magnitude between two transforms.
pub mod magnitude;

/// resolution level ordering for renderers.
pub mod mipmap;

/// parallel rasterisation of fields.
pub mod parallel;

/// in-memory image pyramids.
pub mod pyramid;

/// the multi-resolution source contract.
pub mod source;

/// the lazily transformed view.
pub mod view;

pub use crate::config::WarpViewConfig;
pub use crate::error::SourceError;
pub use crate::factory::SourcePair;
pub use crate::field::{ImageField, RealField, TransformedField};
pub use crate::interpolation::InterpolationMode;
pub use crate::magnitude::WarpMagnitudeField;
pub use crate::mipmap::{LevelHint, MipmapHints, MipmapOrdering, MipmapOrderingAdapter};
pub use crate::parallel::{raster_pixels, rasterize, ExecutionStrategy, ParallelError};
pub use crate::pyramid::PyramidSource;
pub use crate::source::{MultiResolutionSource, Raster, SampleType, VoxelDimensions};
pub use crate::view::{CullingOverride, TransformedSourceView};
