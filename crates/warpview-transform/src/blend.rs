use std::fmt;
use std::sync::Arc;

use crate::inverse::InverseSolverConfig;
use crate::transform::CoordinateTransform;

/// A real-valued field over coordinate space, used as a blend weight.
pub trait ScalarField: Send + Sync + fmt::Debug {
    /// The value at `point`.
    fn value(&self, point: &[f64]) -> f64;
}

/// A field with the same value everywhere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstantField(pub f64);

impl ScalarField for ConstantField {
    fn value(&self, _point: &[f64]) -> f64 {
        self.0
    }
}

/// `w(x) * a(x) + (1 - w(x)) * b(x)`.
///
/// The weight is sampled at the source point. Weights outside `[0, 1]` extrapolate.
#[derive(Clone, Debug)]
pub struct TransformBlend {
    a: Box<CoordinateTransform>,
    b: Box<CoordinateTransform>,
    weight: Arc<dyn ScalarField>,
    out_a: Vec<f64>,
    out_b: Vec<f64>,
}

impl TransformBlend {
    /// Blend `a` and `b` with `weight`.
    ///
    /// # Panics
    ///
    /// If `a` and `b` differ in source or target dimensionality.
    pub fn new(a: CoordinateTransform, b: CoordinateTransform, weight: Arc<dyn ScalarField>) -> Self {
        assert!(
            a.num_source_dimensions() == b.num_source_dimensions()
                && a.num_target_dimensions() == b.num_target_dimensions(),
            "blended transforms must have equal dimensionality"
        );
        let n = a.num_target_dimensions();
        Self {
            a: Box::new(a),
            b: Box::new(b),
            weight,
            out_a: vec![0.0; n],
            out_b: vec![0.0; n],
        }
    }

    /// The transform weighted by `w`.
    pub fn a(&self) -> &CoordinateTransform {
        &self.a
    }

    /// The transform weighted by `1 - w`.
    pub fn b(&self) -> &CoordinateTransform {
        &self.b
    }

    /// The weight field.
    pub fn weight(&self) -> &Arc<dyn ScalarField> {
        &self.weight
    }

    /// Number of source dimensions.
    pub fn num_source_dimensions(&self) -> usize {
        self.a.num_source_dimensions()
    }

    /// Number of target dimensions.
    pub fn num_target_dimensions(&self) -> usize {
        self.a.num_target_dimensions()
    }

    /// Map `source` into `target`.
    pub fn apply(&mut self, source: &[f64], target: &mut [f64]) {
        let w = self.weight.value(source);
        self.a.apply(source, &mut self.out_a);
        self.b.apply(source, &mut self.out_b);
        for ((t, pa), pb) in target.iter_mut().zip(&self.out_a).zip(&self.out_b) {
            *t = w * pa + (1.0 - w) * pb;
        }
    }

    pub(crate) fn set_solver_config(&mut self, config: InverseSolverConfig) {
        self.a.set_solver_config(config);
        self.b.set_solver_config(config);
    }
}

/// Shorthand for a [`CoordinateTransform::Blend`].
pub fn blend(
    a: CoordinateTransform,
    b: CoordinateTransform,
    weight: Arc<dyn ScalarField>,
) -> CoordinateTransform {
    CoordinateTransform::Blend(TransformBlend::new(a, b, weight))
}
