use serde::{Deserialize, Serialize};
use warpview_image::{Interval, RealInterval};

use crate::inverse::InverseSolverConfig;
use crate::transform::CoordinateTransform;

/// Which points of a box are pushed through the transform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimationMethod {
    /// Only the `2^n` corners. Exact for affine transforms.
    Corners,
    /// A regular grid over every face of the box.
    #[default]
    Faces,
    /// A regular grid over the whole box.
    Volume,
}

/// Estimates axis-aligned bounding boxes of boxes mapped through a transform.
///
/// The estimate is the bounding box of the images of a finite set of sample points, so it
/// is exact for affine transforms and a close approximation for smooth, monotonic warps. A
/// warp that folds content between samples can escape it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundingBoxEstimator {
    /// Which points are sampled.
    pub method: EstimationMethod,
    /// Samples along each edge of the box, at least two.
    pub samples_per_dim: usize,
}

impl Default for BoundingBoxEstimator {
    fn default() -> Self {
        Self {
            method: EstimationMethod::Faces,
            samples_per_dim: 5,
        }
    }
}

impl BoundingBoxEstimator {
    /// Create an estimator; `samples_per_dim` is raised to two if smaller.
    pub fn new(method: EstimationMethod, samples_per_dim: usize) -> Self {
        Self {
            method,
            samples_per_dim: samples_per_dim.max(2),
        }
    }

    fn steps(&self) -> usize {
        match self.method {
            EstimationMethod::Corners => 2,
            _ => self.samples_per_dim.max(2),
        }
    }

    /// Visit every sample point of `interval`.
    pub fn for_each_sample(&self, interval: &RealInterval, mut f: impl FnMut(&[f64])) {
        let n = interval.num_dimensions();
        let k = self.steps();
        let faces_only = self.method == EstimationMethod::Faces;
        let (min, max) = (interval.min(), interval.max());

        let mut index = vec![0usize; n];
        let mut point = vec![0.0; n];
        loop {
            let on_face = index.iter().any(|&i| i == 0 || i == k - 1);
            if !faces_only || on_face || n == 0 {
                for d in 0..n {
                    let t = index[d] as f64 / (k - 1) as f64;
                    point[d] = min[d] + t * (max[d] - min[d]);
                }
                f(&point);
            }

            // odometer increment over the sample grid
            let mut d = 0;
            while d < n {
                index[d] += 1;
                if index[d] < k {
                    break;
                }
                index[d] = 0;
                d += 1;
            }
            if d == n {
                return;
            }
        }
    }

    /// The sample points of `interval`.
    pub fn sample_points(&self, interval: &RealInterval) -> Vec<Vec<f64>> {
        let mut points = Vec::new();
        self.for_each_sample(interval, |p| points.push(p.to_vec()));
        points
    }

    /// Bounding box of `interval` mapped forward through `transform`.
    ///
    /// `transform` is used as scratch; pass a copy when it is shared.
    pub fn estimate_real_interval(
        &self,
        transform: &mut CoordinateTransform,
        interval: &RealInterval,
    ) -> RealInterval {
        let mut target = vec![0.0; transform.num_target_dimensions()];
        let mut out: Option<RealInterval> = None;
        self.for_each_sample(interval, |p| {
            transform.apply(p, &mut target);
            match out.as_mut() {
                Some(o) => o.extend(&target),
                None => out = Some(RealInterval::from_point(&target)),
            }
        });
        out.unwrap_or_else(|| interval.clone())
    }

    /// Like [`Self::estimate_real_interval`], rounded outwards to the integer grid.
    pub fn estimate_pixel_interval(
        &self,
        transform: &mut CoordinateTransform,
        interval: &Interval,
    ) -> Interval {
        self.estimate_real_interval(transform, &interval.to_real())
            .to_pixel_interval()
    }

    /// The region of input space that `transform` maps onto `output`.
    ///
    /// The transform is copied, made invertible with a bounded numeric solver if needed,
    /// inverted, and then the samples of `output` are pushed through the inverse. Returns
    /// `None` if no inverse can be formed.
    pub fn estimate_preimage(
        &self,
        transform: &CoordinateTransform,
        output: &RealInterval,
        config: InverseSolverConfig,
    ) -> Option<RealInterval> {
        let mut forward = transform.copy().into_invertible(config);
        forward.set_solver_config(config);
        let mut inverse = forward.inverse()?;
        Some(self.estimate_real_interval(&mut inverse, output))
    }
}
