use warpview_transform::CoordinateTransform;

use crate::interpolation::{interpolate_pixel, InterpolationMode};
use crate::source::Raster;

/// Continuous content that can be sampled at any real position.
///
/// Sampling may update internal scratch state, so each thread samples its own
/// [`RealField::box_clone`].
pub trait RealField<const C: usize>: Send + Sync {
    /// Number of dimensions of the sample positions.
    fn num_dimensions(&self) -> usize;

    /// The value at `position`.
    fn sample(&mut self, position: &[f64]) -> [f32; C];

    /// An independent copy of the field.
    fn box_clone(&self) -> Box<dyn RealField<C>>;
}

impl<const C: usize> Clone for Box<dyn RealField<C>> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

/// A raster interpolated in its level's pixel grid; zero outside the raster.
#[derive(Clone, Debug)]
pub struct ImageField<const C: usize> {
    raster: Raster<C>,
    mode: InterpolationMode,
}

impl<const C: usize> ImageField<C> {
    /// Interpolate `raster` with `mode`.
    pub fn new(raster: Raster<C>, mode: InterpolationMode) -> Self {
        Self { raster, mode }
    }

    /// The sampled raster.
    pub fn raster(&self) -> &Raster<C> {
        &self.raster
    }
}

impl<const C: usize> RealField<C> for ImageField<C> {
    fn num_dimensions(&self) -> usize {
        2
    }

    fn sample(&mut self, position: &[f64]) -> [f32; C] {
        let min = self.raster.interval.min();
        let u = position[0] - min[0] as f64;
        let v = position[1] - min[1] as f64;
        interpolate_pixel(&self.raster.image, u, v, self.mode)
    }

    fn box_clone(&self) -> Box<dyn RealField<C>> {
        Box::new(self.clone())
    }
}

/// A field sampled through a coordinate transform: `value(x) = inner(transform(x))`.
pub struct TransformedField<const C: usize> {
    inner: Box<dyn RealField<C>>,
    transform: CoordinateTransform,
    buffer: Vec<f64>,
}

impl<const C: usize> TransformedField<C> {
    /// Sample `inner` at the image of each position under `transform`.
    pub fn new(inner: Box<dyn RealField<C>>, transform: CoordinateTransform) -> Self {
        let buffer = vec![0.0; transform.num_target_dimensions()];
        Self {
            inner,
            transform,
            buffer,
        }
    }

    /// The transform from sample positions to `inner` positions.
    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }
}

impl<const C: usize> RealField<C> for TransformedField<C> {
    fn num_dimensions(&self) -> usize {
        self.transform.num_source_dimensions()
    }

    fn sample(&mut self, position: &[f64]) -> [f32; C] {
        self.transform.apply(position, &mut self.buffer);
        self.inner.sample(&self.buffer)
    }

    fn box_clone(&self) -> Box<dyn RealField<C>> {
        Box::new(Self {
            inner: self.inner.box_clone(),
            transform: self.transform.copy(),
            buffer: self.buffer.clone(),
        })
    }
}
