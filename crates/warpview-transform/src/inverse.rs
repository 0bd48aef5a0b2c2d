use faer::prelude::SpSolver;
use serde::{Deserialize, Serialize};

use crate::transform::CoordinateTransform;

/// Parameters of the numeric inverse solver.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InverseSolverConfig {
    /// Maximum number of Newton iterations per point.
    pub max_iters: usize,
    /// Residual norm below which a solution is accepted.
    pub tolerance: f64,
    /// Step used for the finite-difference Jacobian.
    pub finite_difference_step: f64,
    /// Smallest line-search step before giving up on an iteration.
    pub min_step: f64,
}

impl Default for InverseSolverConfig {
    fn default() -> Self {
        Self {
            max_iters: 200,
            tolerance: 1e-6,
            finite_difference_step: 1e-4,
            min_step: 1e-6,
        }
    }
}

impl InverseSolverConfig {
    /// Same configuration with a different iteration limit.
    pub fn with_max_iters(self, max_iters: usize) -> Self {
        Self { max_iters, ..self }
    }
}

/// Outcome of the last numeric inversion.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolveReport {
    /// Iterations performed.
    pub iterations: usize,
    /// Residual norm of the returned point.
    pub error: f64,
    /// Whether the residual fell below the tolerance.
    pub converged: bool,
}

#[derive(Clone, Debug, Default)]
struct Scratch {
    x: Vec<f64>,
    fx: Vec<f64>,
    residual: Vec<f64>,
    trial: Vec<f64>,
    ftrial: Vec<f64>,
    jacobian: Vec<f64>,
    step: Vec<f64>,
}

impl Scratch {
    fn resize(&mut self, n: usize) {
        for v in [
            &mut self.x,
            &mut self.fx,
            &mut self.residual,
            &mut self.trial,
            &mut self.ftrial,
            &mut self.step,
        ] {
            v.resize(n, 0.0);
        }
        self.jacobian.resize(n * n, 0.0);
    }
}

/// A square transform inverted numerically.
///
/// The forward map is applied as is; the inverse solves `f(x) = y` with a damped Newton
/// iteration on a finite-difference Jacobian, bounded by [`InverseSolverConfig::max_iters`].
/// When the bound is hit the best estimate found so far is returned.
#[derive(Clone, Debug)]
pub struct IterativeInverse {
    forward: Box<CoordinateTransform>,
    config: InverseSolverConfig,
    inverted: bool,
    scratch: Scratch,
    report: SolveReport,
}

impl IterativeInverse {
    /// Wrap `forward`.
    ///
    /// # Panics
    ///
    /// If the source and target dimensionality of `forward` differ.
    pub fn new(forward: CoordinateTransform, config: InverseSolverConfig) -> Self {
        assert_eq!(
            forward.num_source_dimensions(),
            forward.num_target_dimensions(),
            "only square transforms can be inverted iteratively"
        );
        Self {
            forward: Box::new(forward),
            config,
            inverted: false,
            scratch: Scratch::default(),
            report: SolveReport::default(),
        }
    }

    /// The wrapped forward transform.
    pub fn forward(&self) -> &CoordinateTransform {
        &self.forward
    }

    /// Number of dimensions.
    pub fn num_dimensions(&self) -> usize {
        self.forward.num_source_dimensions()
    }

    /// The solver configuration.
    pub fn config(&self) -> InverseSolverConfig {
        self.config
    }

    /// Replace the solver configuration, including that of nested transforms.
    pub fn set_config(&mut self, config: InverseSolverConfig) {
        self.config = config;
        self.forward.set_solver_config(config);
    }

    /// Whether `apply` runs the numeric inverse.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// A copy with forward and inverse swapped.
    pub fn inverted(&self) -> Self {
        let mut copy = self.clone();
        copy.inverted = !copy.inverted;
        copy
    }

    /// Report of the most recent numeric inversion by this instance.
    pub fn last_report(&self) -> SolveReport {
        self.report
    }

    /// Apply the transform in its current direction.
    pub fn apply(&mut self, source: &[f64], target: &mut [f64]) {
        if self.inverted {
            self.apply_inverse(source, target);
        } else {
            self.forward.apply(source, target);
        }
    }

    /// Solve `f(x) = source` and write `x` into `target`.
    pub fn apply_inverse(&mut self, source: &[f64], target: &mut [f64]) {
        let n = self.num_dimensions();
        self.report = self.solve(&source[..n]);
        target[..n].copy_from_slice(&self.scratch.x[..n]);
    }

    fn solve(&mut self, y: &[f64]) -> SolveReport {
        let n = y.len();
        let cfg = self.config;
        let Self {
            forward, scratch, ..
        } = self;
        scratch.resize(n);

        // the target point is the initial guess
        scratch.x.copy_from_slice(y);
        forward.apply(&scratch.x, &mut scratch.fx);
        let mut error = residual(&scratch.fx, y, &mut scratch.residual);

        let mut iterations = 0;
        while error > cfg.tolerance && iterations < cfg.max_iters {
            iterations += 1;

            // forward-difference jacobian, column by column
            let h = cfg.finite_difference_step;
            for c in 0..n {
                scratch.trial.copy_from_slice(&scratch.x);
                scratch.trial[c] += h;
                forward.apply(&scratch.trial, &mut scratch.ftrial);
                for r in 0..n {
                    scratch.jacobian[r * n + c] = (scratch.ftrial[r] - scratch.fx[r]) / h;
                }
            }

            let jacobian = faer::Mat::<f64>::from_fn(n, n, |r, c| scratch.jacobian[r * n + c]);
            let rhs = faer::Mat::<f64>::from_fn(n, 1, |r, _| -scratch.residual[r]);
            let newton = (jacobian.determinant() != 0.0)
                .then(|| jacobian.partial_piv_lu().solve(rhs))
                .filter(|d| (0..n).all(|r| d.read(r, 0).is_finite()));
            match newton {
                Some(d) => {
                    for (r, s) in scratch.step.iter_mut().enumerate() {
                        *s = d.read(r, 0);
                    }
                }
                // fall back to moving straight against the residual
                None => {
                    for (s, r) in scratch.step.iter_mut().zip(&scratch.residual) {
                        *s = -r;
                    }
                }
            }

            let mut alpha = 1.0;
            let mut improved = false;
            while alpha >= cfg.min_step {
                for ((p, x), s) in scratch.trial.iter_mut().zip(&scratch.x).zip(&scratch.step) {
                    *p = x + alpha * s;
                }
                forward.apply(&scratch.trial, &mut scratch.ftrial);
                let trial = residual_norm(&scratch.ftrial, y);
                if trial < error {
                    std::mem::swap(&mut scratch.x, &mut scratch.trial);
                    std::mem::swap(&mut scratch.fx, &mut scratch.ftrial);
                    error = residual(&scratch.fx, y, &mut scratch.residual);
                    improved = true;
                    break;
                }
                alpha *= 0.5;
            }

            if !improved {
                break;
            }
        }

        let converged = error <= cfg.tolerance;
        if !converged {
            log::trace!(
                "inverse did not converge after {iterations} iterations, residual {error:e}"
            );
        }

        SolveReport {
            iterations,
            error,
            converged,
        }
    }
}

fn residual(fx: &[f64], y: &[f64], out: &mut [f64]) -> f64 {
    let mut sum = 0.0;
    for ((o, a), b) in out.iter_mut().zip(fx).zip(y) {
        *o = a - b;
        sum += *o * *o;
    }
    sum.sqrt()
}

fn residual_norm(fx: &[f64], y: &[f64]) -> f64 {
    fx.iter()
        .zip(y)
        .map(|(a, b)| (a - b) * (a - b))
        .sum::<f64>()
        .sqrt()
}

#[cfg(test)]
mod tests {
    use super::{InverseSolverConfig, IterativeInverse};
    use crate::{AffineTransform, CoordinateTransform, Warp};
    use approx::assert_relative_eq;

    #[derive(Debug)]
    struct Swirl;

    impl Warp for Swirl {
        fn num_source_dimensions(&self) -> usize {
            2
        }

        fn num_target_dimensions(&self) -> usize {
            2
        }

        fn apply(&self, s: &[f64], t: &mut [f64]) {
            let a = 0.05 * (s[0] * s[0] + s[1] * s[1]).sqrt();
            let (sin, cos) = a.sin_cos();
            t[0] = cos * s[0] - sin * s[1];
            t[1] = sin * s[0] + cos * s[1];
        }
    }

    #[derive(Debug)]
    struct Collapse;

    impl Warp for Collapse {
        fn num_source_dimensions(&self) -> usize {
            2
        }

        fn num_target_dimensions(&self) -> usize {
            2
        }

        fn apply(&self, s: &[f64], t: &mut [f64]) {
            t[0] = s[0] + s[1];
            t[1] = s[0] + s[1];
        }
    }

    #[test]
    fn inverse_steps_along_residual_when_jacobian_is_singular() {
        let mut inv =
            IterativeInverse::new(CoordinateTransform::warp(Collapse), InverseSolverConfig::default())
                .inverted();
        let mut x = [0.0; 2];
        inv.apply(&[1.0, 1.0], &mut x);
        assert!(inv.last_report().converged);
        assert_relative_eq!(x[0] + x[1], 1.0, epsilon = 1e-9);
    }

    #[test]
    fn inverse_converges() {
        let mut inv =
            IterativeInverse::new(CoordinateTransform::warp(Swirl), InverseSolverConfig::default());
        let mut y = [0.0; 2];
        inv.apply(&[3.0, 4.0], &mut y);

        let mut x = [0.0; 2];
        inv.apply_inverse(&y, &mut x);
        let report = inv.last_report();
        assert!(report.converged);
        assert!(report.iterations <= 200);
        assert_relative_eq!(x[0], 3.0, epsilon = 1e-5);
        assert_relative_eq!(x[1], 4.0, epsilon = 1e-5);
    }

    #[test]
    fn inverse_respects_iteration_limit() {
        let config = InverseSolverConfig {
            max_iters: 1,
            tolerance: 1e-14,
            ..Default::default()
        };
        let mut inv = IterativeInverse::new(CoordinateTransform::warp(Swirl), config).inverted();
        let mut x = [0.0; 2];
        inv.apply(&[20.0, -35.0], &mut x);
        let report = inv.last_report();
        assert_eq!(report.iterations, 1);
        assert!(!report.converged);
        assert!(x.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn inverse_of_affine_in_one_step() {
        let affine = AffineTransform::new_2d([2.0, 1.0, 3.0, 0.0, 4.0, -2.0]);
        let mut inv = IterativeInverse::new(affine.clone().into(), Default::default()).inverted();
        let y = affine.apply_vec(&[1.0, 1.0]);
        let mut x = [0.0; 2];
        inv.apply(&y, &mut x);
        assert!(inv.last_report().iterations <= 2);
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-6);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn config_from_partial_json() -> Result<(), serde_json::Error> {
        let config: InverseSolverConfig = serde_json::from_str(r#"{ "max_iters": 500 }"#)?;
        assert_eq!(config, InverseSolverConfig::default().with_max_iters(500));
        Ok(())
    }
}
