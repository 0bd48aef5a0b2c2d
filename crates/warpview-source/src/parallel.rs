use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use warpview_image::{Image, Interval};

use crate::error::SourceError;
use crate::field::RealField;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how rasterisation is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ExecutionStrategy {
    /// Run sequentially on the current thread.
    ///
    /// Useful for small rasters, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Use the global Rayon thread pool to process rows in parallel.
    #[default]
    ParallelRows,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use this primarily for benchmarking or specific isolation needs.
    Fixed(usize),
}

/// Number of grid positions in `interval`, or `None` if the count overflows.
pub fn raster_pixels(interval: &Interval) -> Option<u64> {
    (0..interval.num_dimensions()).try_fold(1u64, |n, d| n.checked_mul(interval.dimension(d)))
}

/// Sample `field` at every grid position of a 2d `interval`.
///
/// Pixel `(x, y)` of the result holds the value at `interval.min() + (x, y)`. Every worker
/// thread samples its own copy of the field.
///
/// # Errors
///
/// If the interval is not two dimensional or its samples do not fit in memory.
pub fn rasterize<const C: usize>(
    field: &dyn RealField<C>,
    interval: &Interval,
    strategy: ExecutionStrategy,
) -> Result<Image<f32, C>, SourceError> {
    let size = interval.image_size()?;
    let max_samples = (isize::MAX as usize / std::mem::size_of::<f32>()) as u64;
    let fits = raster_pixels(interval)
        .and_then(|n| n.checked_mul(C as u64))
        .is_some_and(|n| n <= max_samples);
    if !fits {
        return Err(SourceError::RasterTooLarge {
            interval: interval.clone(),
            limit: max_samples / C.max(1) as u64,
        });
    }
    let mut image = Image::from_size_val(size, 0.0f32)?;
    if interval.is_empty() {
        return Ok(image);
    }

    let (x0, y0) = (interval.min()[0], interval.min()[1]);
    let row_len = size.width * C;
    let fill_row = |f: &mut Box<dyn RealField<C>>, (row, chunk): (usize, &mut [f32])| {
        let y = (y0 + row as i64) as f64;
        for (col, pixel) in chunk.chunks_exact_mut(C).enumerate() {
            let x = (x0 + col as i64) as f64;
            pixel.copy_from_slice(&f.sample(&[x, y]));
        }
    };

    match strategy {
        ExecutionStrategy::Serial => {
            let mut f = field.box_clone();
            image
                .as_slice_mut()
                .chunks_exact_mut(row_len)
                .enumerate()
                .for_each(|row| fill_row(&mut f, row));
        }
        ExecutionStrategy::ParallelRows => {
            image
                .as_slice_mut()
                .par_chunks_exact_mut(row_len)
                .enumerate()
                .for_each_init(|| field.box_clone(), fill_row);
        }
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n).into());
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;
            pool.install(|| {
                image
                    .as_slice_mut()
                    .par_chunks_exact_mut(row_len)
                    .enumerate()
                    .for_each_init(|| field.box_clone(), fill_row);
            });
        }
    }

    Ok(image)
}
