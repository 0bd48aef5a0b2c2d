use faer::prelude::SpSolver;
use glam::{DAffine2, DMat2, DVec2};
use serde::{Deserialize, Serialize};

use crate::error::TransformError;

/// An n-dimensional affine transform `x -> A x + t`.
///
/// The matrix is stored row major as `dims` rows of `dims + 1` entries, the last column being
/// the translation. For two dimensions this is the familiar `[a, b, tx, c, d, ty]` layout.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AffineTransform {
    dims: usize,
    matrix: Vec<f64>,
}

impl AffineTransform {
    /// The identity transform in `dims` dimensions.
    pub fn identity(dims: usize) -> Self {
        let mut matrix = vec![0.0; dims * (dims + 1)];
        for d in 0..dims {
            matrix[d * (dims + 1) + d] = 1.0;
        }
        Self { dims, matrix }
    }

    /// Create a transform from a row-major `dims x (dims + 1)` matrix.
    ///
    /// # Errors
    ///
    /// If the matrix does not have `dims * (dims + 1)` entries.
    pub fn from_row_major(dims: usize, matrix: Vec<f64>) -> Result<Self, TransformError> {
        if matrix.len() != dims * (dims + 1) {
            return Err(TransformError::InvalidMatrixLength(matrix.len(), dims));
        }
        Ok(Self { dims, matrix })
    }

    /// Create a 2d transform from `[a, b, tx, c, d, ty]`.
    pub fn new_2d(m: [f64; 6]) -> Self {
        Self {
            dims: 2,
            matrix: m.to_vec(),
        }
    }

    /// A pure translation by `offset`.
    pub fn translation(offset: &[f64]) -> Self {
        let mut t = Self::identity(offset.len());
        for (d, &o) in offset.iter().enumerate() {
            t.set(d, t.dims, o);
        }
        t
    }

    /// An isotropic scaling by `scale` about the origin.
    pub fn scaling(dims: usize, scale: f64) -> Self {
        let mut t = Self::identity(dims);
        for d in 0..dims {
            t.set(d, d, scale);
        }
        t
    }

    /// Number of source (and target) dimensions.
    pub fn num_dimensions(&self) -> usize {
        self.dims
    }

    /// Matrix entry at `(row, col)`; `col == dims` addresses the translation.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.matrix[row * (self.dims + 1) + col]
    }

    /// Set the matrix entry at `(row, col)`.
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.matrix[row * (self.dims + 1) + col] = value;
    }

    /// The row-major matrix.
    pub fn as_slice(&self) -> &[f64] {
        &self.matrix
    }

    /// Apply the transform to `source`, writing into `target`.
    pub fn apply(&self, source: &[f64], target: &mut [f64]) {
        let n = self.dims;
        for (r, out) in target.iter_mut().take(n).enumerate() {
            let row = &self.matrix[r * (n + 1)..(r + 1) * (n + 1)];
            let mut acc = row[n];
            for (a, x) in row[..n].iter().zip(source) {
                acc += a * x;
            }
            *out = acc;
        }
    }

    /// Apply the transform and return the result as a new vector.
    pub fn apply_vec(&self, source: &[f64]) -> Vec<f64> {
        let mut target = vec![0.0; self.dims];
        self.apply(source, &mut target);
        target
    }

    /// The composition `self ∘ other`, i.e. `other` is applied first.
    pub fn concatenate(&self, other: &AffineTransform) -> Self {
        assert_eq!(
            self.dims, other.dims,
            "cannot concatenate affine transforms of different dimensionality"
        );
        let n = self.dims;
        let mut out = Self::identity(n);
        for r in 0..n {
            for c in 0..=n {
                let mut acc = if c == n { self.get(r, n) } else { 0.0 };
                for k in 0..n {
                    acc += self.get(r, k) * other.get(k, c);
                }
                out.set(r, c, acc);
            }
        }
        out
    }

    /// The composition `other ∘ self`, i.e. `self` is applied first.
    pub fn pre_concatenate(&self, other: &AffineTransform) -> Self {
        other.concatenate(self)
    }

    /// The inverse transform.
    ///
    /// # Errors
    ///
    /// If the linear part is singular.
    pub fn inverse(&self) -> Result<Self, TransformError> {
        let n = self.dims;
        let linear = faer::Mat::<f64>::from_fn(n, n, |r, c| self.get(r, c));
        if linear.determinant() == 0.0 {
            return Err(TransformError::SingularMatrix);
        }

        // solve A X = I with one lu factorisation
        let linear_inv = linear
            .partial_piv_lu()
            .solve(faer::Mat::<f64>::identity(n, n));

        let mut inv = Self::identity(n);
        for r in 0..n {
            let mut offset = 0.0;
            for c in 0..n {
                let v = linear_inv.read(r, c);
                if !v.is_finite() {
                    return Err(TransformError::SingularMatrix);
                }
                inv.set(r, c, v);
                offset -= v * self.get(c, n);
            }
            inv.set(r, n, offset);
        }

        Ok(inv)
    }

    /// Whether every entry is within `eps` of the identity.
    pub fn is_identity(&self, eps: f64) -> bool {
        self.matrix
            .iter()
            .zip(Self::identity(self.dims).matrix.iter())
            .all(|(a, b)| (a - b).abs() <= eps)
    }

    /// The transform as a glam `DAffine2`; `None` unless two dimensional.
    pub fn to_daffine2(&self) -> Option<DAffine2> {
        if self.dims != 2 {
            return None;
        }
        let m = &self.matrix;
        Some(DAffine2::from_mat2_translation(
            DMat2::from_cols(DVec2::new(m[0], m[3]), DVec2::new(m[1], m[4])),
            DVec2::new(m[2], m[5]),
        ))
    }

    /// Create a 2d transform from a glam `DAffine2`.
    pub fn from_daffine2(a: DAffine2) -> Self {
        let (m, t) = (a.matrix2, a.translation);
        Self::new_2d([m.x_axis.x, m.y_axis.x, t.x, m.x_axis.y, m.y_axis.y, t.y])
    }
}

#[cfg(test)]
mod tests {
    use super::AffineTransform;
    use crate::TransformError;
    use approx::assert_relative_eq;

    #[test]
    fn affine_from_row_major_length() {
        assert_eq!(
            AffineTransform::from_row_major(3, vec![0.0; 6]),
            Err(TransformError::InvalidMatrixLength(6, 3))
        );
    }

    #[test]
    fn affine_apply_and_inverse() -> Result<(), TransformError> {
        let t = AffineTransform::new_2d([0.0, -2.0, 3.0, 2.0, 0.0, -1.0]);
        let p = t.apply_vec(&[1.0, 2.0]);
        assert_eq!(p, vec![-1.0, 1.0]);

        let inv = t.inverse()?;
        let q = inv.apply_vec(&p);
        assert_relative_eq!(q[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(q[1], 2.0, epsilon = 1e-12);

        assert!(t.concatenate(&inv).is_identity(1e-12));
        Ok(())
    }

    #[test]
    fn affine_inverse_3d() -> Result<(), TransformError> {
        #[rustfmt::skip]
        let t = AffineTransform::from_row_major(3, vec![
            2.0, 0.0, 0.0, 1.0,
            0.0, 0.0, 3.0, 2.0,
            0.0, 1.0, 0.0, 3.0,
        ])?;
        let inv = t.inverse()?;
        assert!(inv.concatenate(&t).is_identity(1e-12));
        Ok(())
    }

    #[test]
    fn affine_singular_3d() -> Result<(), TransformError> {
        #[rustfmt::skip]
        let t = AffineTransform::from_row_major(3, vec![
            1.0, 2.0, 3.0, 0.0,
            2.0, 4.0, 6.0, 1.0,
            0.0, 0.0, 1.0, 2.0,
        ])?;
        assert_eq!(t.inverse(), Err(TransformError::SingularMatrix));
        Ok(())
    }

    #[test]
    fn affine_singular() {
        let t = AffineTransform::new_2d([1.0, 2.0, 0.0, 2.0, 4.0, 0.0]);
        assert_eq!(t.inverse(), Err(TransformError::SingularMatrix));
    }

    #[test]
    fn affine_concatenate_order() {
        let scale = AffineTransform::scaling(2, 2.0);
        let shift = AffineTransform::translation(&[1.0, 0.0]);
        // shift first, then scale
        assert_eq!(scale.concatenate(&shift).apply_vec(&[0.0, 0.0]), vec![2.0, 0.0]);
        // scale first, then shift
        assert_eq!(scale.pre_concatenate(&shift).apply_vec(&[0.0, 0.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn affine_glam_roundtrip() {
        let t = AffineTransform::new_2d([1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let back = t.to_daffine2().map(AffineTransform::from_daffine2);
        assert_eq!(back, Some(t));
        assert!(AffineTransform::identity(3).to_daffine2().is_none());
    }
}
