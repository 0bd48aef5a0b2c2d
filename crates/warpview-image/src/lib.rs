#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Error types for the image module.
pub mod error;

/// image representation for warped sources.
pub mod image;

/// axis-aligned integer and real boxes.
pub mod interval;

pub use crate::error::ImageError;
pub use crate::image::{Image, ImageSize};
pub use crate::interval::{Interval, RealInterval};
