use std::fmt;
use std::sync::Arc;

use crate::affine::AffineTransform;
use crate::blend::TransformBlend;
use crate::inverse::{InverseSolverConfig, IterativeInverse};

/// A stateless forward coordinate map.
///
/// Implement this for transforms computed by other libraries, for example a thin-plate spline
/// fitted to landmarks. Implementations are shared between copies, so `apply` must not rely
/// on interior mutability.
pub trait Warp: Send + Sync + fmt::Debug {
    /// Number of dimensions of the points this map accepts.
    fn num_source_dimensions(&self) -> usize;

    /// Number of dimensions of the points this map produces.
    fn num_target_dimensions(&self) -> usize;

    /// Map `source` into `target`.
    fn apply(&self, source: &[f64], target: &mut [f64]);
}

/// A coordinate transform.
///
/// Instances are replaced wholesale rather than edited. Applying may touch internal scratch
/// buffers, so each thread must work on its own [`CoordinateTransform::copy`].
#[derive(Clone, Debug)]
pub enum CoordinateTransform {
    /// An affine map with a closed-form inverse.
    Affine(AffineTransform),
    /// A general forward-only map.
    Warp(Arc<dyn Warp>),
    /// A map inverted by bounded numeric iteration.
    Iterative(IterativeInverse),
    /// A composition of transforms applied first to last.
    Sequence(TransformSequence),
    /// A spatially weighted blend of two transforms.
    Blend(TransformBlend),
}

impl CoordinateTransform {
    /// The identity in `dims` dimensions.
    pub fn identity(dims: usize) -> Self {
        Self::Affine(AffineTransform::identity(dims))
    }

    /// Wrap a [`Warp`] implementation.
    pub fn warp(warp: impl Warp + 'static) -> Self {
        Self::Warp(Arc::new(warp))
    }

    /// Short tag naming the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Affine(_) => "affine",
            Self::Warp(_) => "warp",
            Self::Iterative(_) => "iterative",
            Self::Sequence(_) => "sequence",
            Self::Blend(_) => "blend",
        }
    }

    /// Number of dimensions of the points this transform accepts.
    pub fn num_source_dimensions(&self) -> usize {
        match self {
            Self::Affine(a) => a.num_dimensions(),
            Self::Warp(w) => w.num_source_dimensions(),
            Self::Iterative(i) => i.num_dimensions(),
            Self::Sequence(s) => s.num_source_dimensions(),
            Self::Blend(b) => b.num_source_dimensions(),
        }
    }

    /// Number of dimensions of the points this transform produces.
    pub fn num_target_dimensions(&self) -> usize {
        match self {
            Self::Affine(a) => a.num_dimensions(),
            Self::Warp(w) => w.num_target_dimensions(),
            Self::Iterative(i) => i.num_dimensions(),
            Self::Sequence(s) => s.num_target_dimensions(),
            Self::Blend(b) => b.num_target_dimensions(),
        }
    }

    /// Map `source` into `target`.
    ///
    /// `source` must hold at least [`Self::num_source_dimensions`] values and `target` at
    /// least [`Self::num_target_dimensions`].
    pub fn apply(&mut self, source: &[f64], target: &mut [f64]) {
        match self {
            Self::Affine(a) => a.apply(source, target),
            Self::Warp(w) => w.apply(source, target),
            Self::Iterative(i) => i.apply(source, target),
            Self::Sequence(s) => s.apply(source, target),
            Self::Blend(b) => b.apply(source, target),
        }
    }

    /// Map `source` and return the result as a new vector.
    pub fn apply_vec(&mut self, source: &[f64]) -> Vec<f64> {
        let mut target = vec![0.0; self.num_target_dimensions()];
        self.apply(source, &mut target);
        target
    }

    /// A deep copy, independent of `self` for use on another thread.
    ///
    /// Nested transforms and solver state are duplicated; [`Warp`] implementations and blend
    /// weight fields are immutable and therefore shared.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Whether [`Self::inverse`] returns a transform.
    pub fn is_invertible(&self) -> bool {
        match self {
            Self::Affine(a) => a.inverse().is_ok(),
            Self::Iterative(_) => true,
            Self::Sequence(s) => s.steps().iter().all(|t| t.is_invertible()),
            Self::Warp(_) | Self::Blend(_) => false,
        }
    }

    /// The inverse transform, if this variant provides one.
    ///
    /// Blends and plain warps do not; wrap them with [`Self::into_invertible`] first.
    pub fn inverse(&self) -> Option<Self> {
        match self {
            Self::Affine(a) => a.inverse().ok().map(Self::Affine),
            Self::Iterative(i) => Some(Self::Iterative(i.inverted())),
            Self::Sequence(s) => s
                .steps()
                .iter()
                .rev()
                .map(|t| t.inverse())
                .collect::<Option<Vec<_>>>()
                .map(|steps| Self::Sequence(TransformSequence::from_steps(steps))),
            Self::Warp(_) | Self::Blend(_) => None,
        }
    }

    /// Make the transform invertible, wrapping it in an [`IterativeInverse`] if needed.
    ///
    /// Transforms that are already invertible, and transforms whose source and target
    /// dimensionality differ, are returned unchanged.
    pub fn into_invertible(self, config: InverseSolverConfig) -> Self {
        if self.is_invertible() || self.num_source_dimensions() != self.num_target_dimensions() {
            return self;
        }
        Self::Iterative(IterativeInverse::new(self, config))
    }

    /// Replace the solver configuration of every nested [`IterativeInverse`].
    pub fn set_solver_config(&mut self, config: InverseSolverConfig) {
        match self {
            Self::Iterative(i) => i.set_config(config),
            Self::Sequence(s) => s
                .steps_mut()
                .iter_mut()
                .for_each(|t| t.set_solver_config(config)),
            Self::Blend(b) => b.set_solver_config(config),
            Self::Affine(_) | Self::Warp(_) => {}
        }
    }
}

impl From<AffineTransform> for CoordinateTransform {
    fn from(affine: AffineTransform) -> Self {
        Self::Affine(affine)
    }
}

/// A composition of transforms, applied first to last.
///
/// The target dimensionality of each step must equal the source dimensionality of the next;
/// violating this is a programming error and panics on [`TransformSequence::push`].
#[derive(Clone, Debug, Default)]
pub struct TransformSequence {
    steps: Vec<CoordinateTransform>,
    buffer_a: Vec<f64>,
    buffer_b: Vec<f64>,
}

impl TransformSequence {
    /// An empty sequence, which maps every point to itself.
    pub fn new() -> Self {
        Self::default()
    }

    /// A sequence of the given steps.
    pub fn from_steps(steps: impl IntoIterator<Item = CoordinateTransform>) -> Self {
        let mut seq = Self::new();
        for step in steps {
            seq.push(step);
        }
        seq
    }

    /// Append a step.
    ///
    /// # Panics
    ///
    /// If the step's source dimensionality differs from the previous step's target.
    pub fn push(&mut self, step: CoordinateTransform) {
        if let Some(last) = self.steps.last() {
            assert_eq!(
                last.num_target_dimensions(),
                step.num_source_dimensions(),
                "cannot append a {}d {} step after a step producing {}d points",
                step.num_source_dimensions(),
                step.kind(),
                last.num_target_dimensions()
            );
        }
        self.steps.push(step);
    }

    /// Builder form of [`Self::push`].
    pub fn then(mut self, step: impl Into<CoordinateTransform>) -> Self {
        self.push(step.into());
        self
    }

    /// The steps in application order.
    pub fn steps(&self) -> &[CoordinateTransform] {
        &self.steps
    }

    pub(crate) fn steps_mut(&mut self) -> &mut [CoordinateTransform] {
        &mut self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the sequence has no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Source dimensionality of the first step, zero when empty.
    pub fn num_source_dimensions(&self) -> usize {
        self.steps.first().map_or(0, |t| t.num_source_dimensions())
    }

    /// Target dimensionality of the last step, zero when empty.
    pub fn num_target_dimensions(&self) -> usize {
        self.steps.last().map_or(0, |t| t.num_target_dimensions())
    }

    /// Map `source` through every step into `target`.
    pub fn apply(&mut self, source: &[f64], target: &mut [f64]) {
        let Self {
            steps,
            buffer_a,
            buffer_b,
        } = self;

        let Some(first) = steps.first() else {
            let n = source.len().min(target.len());
            target[..n].copy_from_slice(&source[..n]);
            return;
        };

        buffer_a.clear();
        buffer_a.extend_from_slice(&source[..first.num_source_dimensions()]);
        for step in steps.iter_mut() {
            buffer_b.clear();
            buffer_b.resize(step.num_target_dimensions(), 0.0);
            step.apply(buffer_a, buffer_b);
            std::mem::swap(buffer_a, buffer_b);
        }
        target[..buffer_a.len()].copy_from_slice(buffer_a);
    }
}

#[cfg(test)]
mod tests {
    use super::{CoordinateTransform, TransformSequence, Warp};
    use crate::{AffineTransform, InverseSolverConfig};
    use approx::assert_relative_eq;

    #[derive(Debug)]
    struct Cubic;

    impl Warp for Cubic {
        fn num_source_dimensions(&self) -> usize {
            2
        }

        fn num_target_dimensions(&self) -> usize {
            2
        }

        fn apply(&self, source: &[f64], target: &mut [f64]) {
            target[0] = source[0] + 0.01 * source[0].powi(3);
            target[1] = source[1] + 0.1 * source[0];
        }
    }

    #[derive(Debug)]
    struct Lift;

    impl Warp for Lift {
        fn num_source_dimensions(&self) -> usize {
            2
        }

        fn num_target_dimensions(&self) -> usize {
            3
        }

        fn apply(&self, source: &[f64], target: &mut [f64]) {
            target[..2].copy_from_slice(&source[..2]);
            target[2] = 0.0;
        }
    }

    #[test]
    fn sequence_applies_in_order() {
        let mut seq = CoordinateTransform::Sequence(
            TransformSequence::new()
                .then(AffineTransform::translation(&[1.0, 0.0]))
                .then(AffineTransform::scaling(2, 3.0)),
        );
        assert_eq!(seq.apply_vec(&[0.0, 1.0]), vec![3.0, 3.0]);
    }

    #[test]
    fn sequence_empty_is_identity() {
        let mut seq = TransformSequence::new();
        let mut out = [0.0; 2];
        seq.apply(&[4.0, 5.0], &mut out);
        assert_eq!(out, [4.0, 5.0]);
    }

    #[test]
    #[should_panic(expected = "cannot append")]
    fn sequence_dimension_mismatch_panics() {
        let _ = TransformSequence::new()
            .then(CoordinateTransform::warp(Lift))
            .then(AffineTransform::identity(2));
    }

    #[test]
    fn sequence_inverse_reverses_steps() {
        let seq = CoordinateTransform::Sequence(
            TransformSequence::new()
                .then(AffineTransform::translation(&[1.0, 0.0]))
                .then(AffineTransform::scaling(2, 2.0)),
        );
        let mut forward = seq.copy();
        let mut inverse = seq.inverse().expect("affine sequence is invertible");
        let p = forward.apply_vec(&[0.5, -2.0]);
        let q = inverse.apply_vec(&p);
        assert_relative_eq!(q[0], 0.5, epsilon = 1e-12);
        assert_relative_eq!(q[1], -2.0, epsilon = 1e-12);
    }

    #[test]
    fn warp_becomes_invertible() {
        let warp = CoordinateTransform::warp(Cubic);
        assert!(!warp.is_invertible());
        assert!(warp.inverse().is_none());

        let wrapped = warp.into_invertible(InverseSolverConfig::default());
        assert_eq!(wrapped.kind(), "iterative");

        let mut forward = wrapped.copy();
        let mut inverse = wrapped.inverse().expect("iterative transforms invert");
        let x = [1.5, -0.5];
        let y = forward.apply_vec(&x);
        let back = inverse.apply_vec(&y);
        assert_relative_eq!(back[0], x[0], epsilon = 1e-5);
        assert_relative_eq!(back[1], x[1], epsilon = 1e-5);
    }

    #[test]
    fn non_square_warp_is_left_alone() {
        let lift = CoordinateTransform::warp(Lift).into_invertible(InverseSolverConfig::default());
        assert_eq!(lift.kind(), "warp");
    }
}
