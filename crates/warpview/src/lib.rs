#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use warpview_image as image;

#[doc(inline)]
pub use warpview_source as source;

#[doc(inline)]
pub use warpview_transform as transform;
