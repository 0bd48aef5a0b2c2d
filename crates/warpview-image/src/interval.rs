use serde::{Deserialize, Serialize};

use crate::error::ImageError;
use crate::image::ImageSize;

/// An axis-aligned box on the integer grid.
///
/// Both `min` and `max` are inclusive, following the pixel-index convention: an image of
/// width `w` covers `[0, w - 1]` along x.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    min: Vec<i64>,
    max: Vec<i64>,
}

impl Interval {
    /// Create a new interval from its inclusive corners.
    ///
    /// # Errors
    ///
    /// If `min` and `max` have different lengths.
    pub fn new(min: Vec<i64>, max: Vec<i64>) -> Result<Self, ImageError> {
        if min.len() != max.len() {
            return Err(ImageError::IntervalDimensionMismatch(min.len(), max.len()));
        }
        Ok(Self { min, max })
    }

    /// The pixel interval `[0, width - 1] x [0, height - 1]` of an image.
    pub fn from_size(size: ImageSize) -> Self {
        Self {
            min: vec![0, 0],
            max: vec![size.width as i64 - 1, size.height as i64 - 1],
        }
    }

    /// Number of dimensions of the interval.
    pub fn num_dimensions(&self) -> usize {
        self.min.len()
    }

    /// Inclusive lower corner.
    pub fn min(&self) -> &[i64] {
        &self.min
    }

    /// Inclusive upper corner.
    pub fn max(&self) -> &[i64] {
        &self.max
    }

    /// Number of grid positions along dimension `d`; zero when empty along `d`.
    pub fn dimension(&self, d: usize) -> u64 {
        if self.max[d] < self.min[d] {
            0
        } else {
            (self.max[d] - self.min[d]) as u64 + 1
        }
    }

    /// Whether the interval holds no grid position.
    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(lo, hi)| hi < lo)
    }

    /// Whether `position` lies inside the interval.
    pub fn contains(&self, position: &[i64]) -> bool {
        position.len() == self.num_dimensions()
            && position
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(p, (lo, hi))| lo <= p && p <= hi)
    }

    /// Intersection of two intervals. The result may be empty.
    pub fn intersect(&self, other: &Interval) -> Interval {
        assert_eq!(
            self.num_dimensions(),
            other.num_dimensions(),
            "cannot intersect intervals of different dimensionality"
        );
        Interval {
            min: self.min.iter().zip(&other.min).map(|(a, b)| *a.max(b)).collect(),
            max: self.max.iter().zip(&other.max).map(|(a, b)| *a.min(b)).collect(),
        }
    }

    /// The same box with real-valued corners.
    pub fn to_real(&self) -> RealInterval {
        RealInterval {
            min: self.min.iter().map(|&v| v as f64).collect(),
            max: self.max.iter().map(|&v| v as f64).collect(),
        }
    }

    /// The size of a 2d image that covers this interval.
    ///
    /// # Errors
    ///
    /// If the interval is not two dimensional.
    pub fn image_size(&self) -> Result<ImageSize, ImageError> {
        if self.num_dimensions() != 2 {
            return Err(ImageError::UnsupportedIntervalDimensions(
                self.num_dimensions(),
            ));
        }
        Ok(ImageSize {
            width: self.dimension(0) as usize,
            height: self.dimension(1) as usize,
        })
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Interval {:?} -> {:?}", self.min, self.max)
    }
}

/// An axis-aligned box in continuous coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealInterval {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl RealInterval {
    /// Create a new interval from its corners.
    ///
    /// # Errors
    ///
    /// If `min` and `max` have different lengths.
    pub fn new(min: Vec<f64>, max: Vec<f64>) -> Result<Self, ImageError> {
        if min.len() != max.len() {
            return Err(ImageError::IntervalDimensionMismatch(min.len(), max.len()));
        }
        Ok(Self { min, max })
    }

    /// A degenerate interval holding a single point.
    pub fn from_point(point: &[f64]) -> Self {
        Self {
            min: point.to_vec(),
            max: point.to_vec(),
        }
    }

    /// Smallest interval containing every point; `None` for an empty iterator.
    pub fn enclosing<'a>(points: impl IntoIterator<Item = &'a [f64]>) -> Option<Self> {
        let mut points = points.into_iter();
        let mut interval = Self::from_point(points.next()?);
        for p in points {
            interval.extend(p);
        }
        Some(interval)
    }

    /// Number of dimensions of the interval.
    pub fn num_dimensions(&self) -> usize {
        self.min.len()
    }

    /// Lower corner.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Upper corner.
    pub fn max(&self) -> &[f64] {
        &self.max
    }

    /// Whether the interval is empty along any dimension.
    pub fn is_empty(&self) -> bool {
        self.min.iter().zip(&self.max).any(|(lo, hi)| hi < lo)
    }

    /// Grow the interval so that it contains `point`.
    pub fn extend(&mut self, point: &[f64]) {
        assert_eq!(
            point.len(),
            self.num_dimensions(),
            "point dimensionality does not match the interval"
        );
        for (d, &p) in point.iter().enumerate() {
            self.min[d] = self.min[d].min(p);
            self.max[d] = self.max[d].max(p);
        }
    }

    /// Whether `point` lies inside the closed interval, with tolerance `eps`.
    pub fn contains(&self, point: &[f64], eps: f64) -> bool {
        point.len() == self.num_dimensions()
            && point
                .iter()
                .zip(self.min.iter().zip(&self.max))
                .all(|(p, (lo, hi))| lo - eps <= *p && *p <= hi + eps)
    }

    /// Smallest integer interval containing this one (floor of min, ceil of max).
    pub fn to_pixel_interval(&self) -> Interval {
        Interval {
            min: self.min.iter().map(|v| v.floor() as i64).collect(),
            max: self.max.iter().map(|v| v.ceil() as i64).collect(),
        }
    }
}
