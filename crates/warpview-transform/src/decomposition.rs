use glam::{DAffine2, DMat2, DVec2};

use crate::affine::AffineTransform;
use crate::error::TransformError;

/// Per-axis scales and rotation angle of a 2d linear map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScalesAngle {
    /// Scale of the first row.
    pub scale_x: f64,
    /// Scale of the second row.
    pub scale_y: f64,
    /// Rotation angle in radians.
    pub angle: f64,
}

impl ScalesAngle {
    /// Mean of both scales.
    pub fn mean_scale(&self) -> f64 {
        0.5 * (self.scale_x + self.scale_y)
    }

    /// The linear map these parameters describe, see [`from_scales_angle`].
    pub fn to_affine(&self) -> AffineTransform {
        from_scales_angle(self.scale_x, self.scale_y, self.angle)
    }
}

fn linear_part(t: &AffineTransform) -> Result<[f64; 4], TransformError> {
    if t.num_dimensions() != 2 {
        return Err(TransformError::DimensionMismatch {
            expected: 2,
            actual: t.num_dimensions(),
        });
    }
    Ok([t.get(0, 0), t.get(0, 1), t.get(1, 0), t.get(1, 1)])
}

/// Decompose `[[a, b], [c, d]]` into signed scales and angle.
///
/// `angle = atan2(-b, a)`, `scale_x = sign(a) |(a, b)|`, `scale_y = sign(d) |(c, d)|`.
/// A negative scale encodes a flip, which is ambiguous with a rotation by π.
pub fn scales_angle(t: &AffineTransform) -> Result<ScalesAngle, TransformError> {
    let [a, b, c, d] = linear_part(t)?;
    let sa = if a >= 0.0 { 1.0 } else { -1.0 };
    let sd = if d >= 0.0 { 1.0 } else { -1.0 };
    Ok(ScalesAngle {
        scale_x: sa * a.hypot(b),
        scale_y: sd * c.hypot(d),
        angle: (-b).atan2(a),
    })
}

/// Like [`scales_angle`] but never reports a flip: both scales are non-negative.
///
/// The center of rotation is accepted for interface compatibility; scales and angle of a
/// linear map do not depend on it, so it does not affect the result.
pub fn scales_angle_centered(
    t: &AffineTransform,
    _center: [f64; 2],
) -> Result<ScalesAngle, TransformError> {
    let [a, b, c, d] = linear_part(t)?;
    Ok(ScalesAngle {
        scale_x: a.hypot(b),
        scale_y: c.hypot(d),
        angle: (-b).atan2(a),
    })
}

/// The linear map `[[sx cos, -sx sin], [sy sin, sy cos]]`.
pub fn from_scales_angle(scale_x: f64, scale_y: f64, angle: f64) -> AffineTransform {
    let (sin, cos) = angle.sin_cos();
    AffineTransform::new_2d([
        scale_x * cos,
        -scale_x * sin,
        0.0,
        scale_y * sin,
        scale_y * cos,
        0.0,
    ])
}

/// Rotation by `angle` about `center`.
pub fn centered_rotation(angle: f64, center: [f64; 2]) -> AffineTransform {
    centered_similarity(angle, 1.0, center)
}

/// Rotation by `angle` and isotropic scaling by `scale` about `center`.
pub fn centered_similarity(angle: f64, scale: f64, center: [f64; 2]) -> AffineTransform {
    let c = DVec2::from(center);
    let m = DMat2::from_angle(angle) * scale;
    AffineTransform::from_daffine2(DAffine2::from_mat2_translation(m, c - m * c))
}

/// A one-parameter family of affine transforms.
pub trait AffineInterpolator {
    /// The transform at `t`; `t = 0` is the start and `t = 1` the end state.
    fn get(&self, t: f64) -> AffineTransform;
}

/// Interpolates from the identity to a 2d similarity about a fixed center.
///
/// Angle and mean scale vary linearly in `t`, and the translation is recomputed so that the
/// center travels in a straight line from itself to its image under the end transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimilarityInterpolator {
    theta_diff: f64,
    scale_diff: f64,
    center: DVec2,
    p_diff: DVec2,
}

impl SimilarityInterpolator {
    /// Interpolate rotation and scale of `end` about `center`.
    ///
    /// # Errors
    ///
    /// If `end` is not two dimensional.
    pub fn new(end: &AffineTransform, center: [f64; 2]) -> Result<Self, TransformError> {
        let params = scales_angle_centered(end, center)?;
        Self::build(end, center, params.angle, params.mean_scale() - 1.0)
    }

    /// Interpolate only the rotation of `end` about `center`; scale is held at one.
    ///
    /// # Errors
    ///
    /// If `end` is not two dimensional.
    pub fn rotation_only(end: &AffineTransform, center: [f64; 2]) -> Result<Self, TransformError> {
        let params = scales_angle_centered(end, center)?;
        Self::build(end, center, params.angle, 0.0)
    }

    fn build(
        end: &AffineTransform,
        center: [f64; 2],
        theta_diff: f64,
        scale_diff: f64,
    ) -> Result<Self, TransformError> {
        let end = end.to_daffine2().ok_or(TransformError::DimensionMismatch {
            expected: 2,
            actual: end.num_dimensions(),
        })?;
        let c = DVec2::from(center);
        Ok(Self {
            theta_diff,
            scale_diff,
            center: c,
            p_diff: end.transform_point2(c) - c,
        })
    }

    /// The center of rotation.
    pub fn center(&self) -> [f64; 2] {
        self.center.into()
    }

    /// Total rotation between start and end.
    pub fn theta_diff(&self) -> f64 {
        self.theta_diff
    }

    /// Total change of mean scale between start and end.
    pub fn scale_diff(&self) -> f64 {
        self.scale_diff
    }

    /// The transform at `t` as a glam affine.
    pub fn get_affine2(&self, t: f64) -> DAffine2 {
        let m = DMat2::from_angle(t * self.theta_diff) * (1.0 + t * self.scale_diff);
        let target = self.center + t * self.p_diff;
        DAffine2::from_mat2_translation(m, target - m * self.center)
    }
}

impl AffineInterpolator for SimilarityInterpolator {
    fn get(&self, t: f64) -> AffineTransform {
        AffineTransform::from_daffine2(self.get_affine2(t))
    }
}

/// Entry-wise linear interpolation between two affine transforms.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearAffineInterpolator {
    start: AffineTransform,
    end: AffineTransform,
}

impl LinearAffineInterpolator {
    /// Interpolate from `start` to `end`.
    ///
    /// # Errors
    ///
    /// If the two transforms differ in dimensionality.
    pub fn new(start: AffineTransform, end: AffineTransform) -> Result<Self, TransformError> {
        if start.num_dimensions() != end.num_dimensions() {
            return Err(TransformError::DimensionMismatch {
                expected: start.num_dimensions(),
                actual: end.num_dimensions(),
            });
        }
        Ok(Self { start, end })
    }

    /// Interpolate from the identity to `end`.
    pub fn from_identity(end: AffineTransform) -> Self {
        Self {
            start: AffineTransform::identity(end.num_dimensions()),
            end,
        }
    }
}

impl AffineInterpolator for LinearAffineInterpolator {
    fn get(&self, t: f64) -> AffineTransform {
        let mut out = self.start.clone();
        let n = out.num_dimensions();
        for r in 0..n {
            for c in 0..=n {
                let v = (1.0 - t) * self.start.get(r, c) + t * self.end.get(r, c);
                out.set(r, c, v);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn signed_decomposition_reports_flip() -> Result<(), TransformError> {
        let t = from_scales_angle(2.0, 3.0, 0.3);
        let p = scales_angle(&t)?;
        assert_relative_eq!(p.scale_x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(p.scale_y, 3.0, epsilon = 1e-12);
        assert_relative_eq!(p.angle, 0.3, epsilon = 1e-12);

        // past a quarter turn the diagonal goes negative and the scales follow
        let flipped = scales_angle(&from_scales_angle(2.0, 2.0, PI - 0.1))?;
        assert!(flipped.scale_x < 0.0 && flipped.scale_y < 0.0);
        Ok(())
    }

    #[test]
    fn centered_similarity_fixes_center() {
        let c = [-10.0, 20.0];
        let t = centered_similarity(0.7, 1.5, c);
        let p = t.apply_vec(&c);
        assert_relative_eq!(p[0], c[0], epsilon = 1e-12);
        assert_relative_eq!(p[1], c[1], epsilon = 1e-12);
        assert!(centered_rotation(0.0, c).is_identity(1e-12));
    }

    #[test]
    fn decomposition_requires_2d() {
        assert_eq!(
            scales_angle(&AffineTransform::identity(3)),
            Err(TransformError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        );
    }

    #[test]
    fn linear_interpolator_midpoint() -> Result<(), TransformError> {
        let interp = LinearAffineInterpolator::new(
            AffineTransform::identity(2),
            AffineTransform::new_2d([3.0, 0.0, 4.0, 0.0, 3.0, -2.0]),
        )?;
        assert_eq!(
            interp.get(0.5),
            AffineTransform::new_2d([2.0, 0.0, 2.0, 0.0, 2.0, -1.0])
        );
        assert!(interp.get(0.0).is_identity(0.0));
        Ok(())
    }

    #[test]
    fn rotation_only_keeps_scale() -> Result<(), TransformError> {
        let c = [1.0, 2.0];
        let end = centered_similarity(0.5, 3.0, c);
        let interp = SimilarityInterpolator::rotation_only(&end, c)?;
        assert_relative_eq!(interp.theta_diff(), 0.5, epsilon = 1e-12);
        assert_eq!(interp.scale_diff(), 0.0);
        assert_relative_eq!(crate::geom::det2d(&interp.get(1.0)), 1.0, epsilon = 1e-12);
        Ok(())
    }
}
