use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::affine::AffineTransform;
use crate::blend::{blend, ScalarField};
use crate::decomposition::SimilarityInterpolator;
use crate::error::TransformError;
use crate::geom::{smallest_enclosing_sphere, squared_distance};
use crate::transform::{CoordinateTransform, TransformSequence, Warp};

/// How a mask falls off outside its plateau.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FalloffShape {
    /// Half cosine period from one to zero over one sigma.
    #[default]
    Cosine,
    /// Gaussian with standard deviation sigma.
    Gaussian,
    /// Linear ramp from one to zero over one sigma.
    Linear,
}

impl FalloffShape {
    /// The persisted tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "COSINE",
            Self::Gaussian => "GAUSSIAN",
            Self::Linear => "LINEAR",
        }
    }
}

impl FromStr for FalloffShape {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "COSINE" => Ok(Self::Cosine),
            "GAUSSIAN" => Ok(Self::Gaussian),
            "LINEAR" => Ok(Self::Linear),
            _ => Err(TransformError::UnknownFalloffShape(s.to_string())),
        }
    }
}

impl fmt::Display for FalloffShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The persisted parameters of a [`PlateauSphericalMask`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskParameters {
    /// Falloff outside the plateau.
    pub fall_off_shape: FalloffShape,
    /// Squared radius of the plateau.
    pub squared_radius: f64,
    /// Squared width of the falloff.
    pub squared_sigma: f64,
    /// Plateau center.
    pub center: Vec<f64>,
}

/// A weight field equal to one inside a sphere and falling off to zero outside it.
#[derive(Clone, Debug, PartialEq)]
pub struct PlateauSphericalMask {
    shape: FalloffShape,
    squared_radius: f64,
    squared_sigma: f64,
    radius: f64,
    sigma: f64,
    center: Vec<f64>,
}

impl PlateauSphericalMask {
    /// A mask around `center`.
    pub fn new(center: Vec<f64>, squared_radius: f64, squared_sigma: f64, shape: FalloffShape) -> Self {
        Self {
            shape,
            squared_radius,
            squared_sigma,
            radius: squared_radius.sqrt(),
            sigma: squared_sigma.sqrt(),
            center,
        }
    }

    /// A mask from its persisted parameters.
    pub fn from_parameters(p: MaskParameters) -> Self {
        Self::new(p.center, p.squared_radius, p.squared_sigma, p.fall_off_shape)
    }

    /// The persisted parameters.
    pub fn parameters(&self) -> MaskParameters {
        MaskParameters {
            fall_off_shape: self.shape,
            squared_radius: self.squared_radius,
            squared_sigma: self.squared_sigma,
            center: self.center.clone(),
        }
    }

    /// A mask whose plateau encloses `points`, see [`smallest_enclosing_sphere`].
    pub fn enclosing<P: AsRef<[f64]>>(
        points: &[P],
        squared_sigma: f64,
        shape: FalloffShape,
    ) -> Option<Self> {
        let (center, squared_radius) = smallest_enclosing_sphere(points)?;
        Some(Self::new(center, squared_radius, squared_sigma, shape))
    }

    /// Falloff shape.
    pub fn shape(&self) -> FalloffShape {
        self.shape
    }

    /// Plateau center.
    pub fn center(&self) -> &[f64] {
        &self.center
    }

    /// Squared plateau radius.
    pub fn squared_radius(&self) -> f64 {
        self.squared_radius
    }

    /// Squared falloff width.
    pub fn squared_sigma(&self) -> f64 {
        self.squared_sigma
    }

    /// Change the falloff shape.
    pub fn set_shape(&mut self, shape: FalloffShape) {
        self.shape = shape;
    }

    /// Move the plateau.
    pub fn set_center(&mut self, center: Vec<f64>) {
        self.center = center;
    }

    /// Change the squared plateau radius.
    pub fn set_squared_radius(&mut self, squared_radius: f64) {
        self.squared_radius = squared_radius;
        self.radius = squared_radius.sqrt();
    }

    /// Change the squared falloff width.
    pub fn set_squared_sigma(&mut self, squared_sigma: f64) {
        self.squared_sigma = squared_sigma;
        self.sigma = squared_sigma.sqrt();
    }
}

impl ScalarField for PlateauSphericalMask {
    fn value(&self, point: &[f64]) -> f64 {
        let r2 = squared_distance(point, &self.center);
        if r2 <= self.squared_radius {
            return 1.0;
        }
        if self.sigma <= 0.0 {
            return 0.0;
        }

        let t = r2.sqrt() - self.radius;
        match self.shape {
            FalloffShape::Gaussian => (-0.5 * t * t / self.squared_sigma).exp(),
            FalloffShape::Cosine if t < self.sigma => 0.5 + 0.5 * (PI * t / self.sigma).cos(),
            FalloffShape::Cosine => 0.0,
            FalloffShape::Linear => (1.0 - t / self.sigma).max(0.0),
        }
    }
}

/// How a mask combines a warp with its surroundings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MaskInterpolation {
    /// The warp applies everywhere.
    #[default]
    None,
    /// Blend between the warp and the identity.
    Linear,
    /// Warp, then a similarity scaled by the mask.
    Similarity,
    /// Warp, then a rotation scaled by the mask.
    Rotation,
}

impl MaskInterpolation {
    /// The persisted tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Linear => "LINEAR",
            Self::Similarity => "SIMILARITY",
            Self::Rotation => "ROTATION",
        }
    }
}

impl FromStr for MaskInterpolation {
    type Err = TransformError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Self::None),
            "LINEAR" => Ok(Self::Linear),
            "SIMILARITY" => Ok(Self::Similarity),
            "ROTATION" => Ok(Self::Rotation),
            _ => Err(TransformError::UnknownMaskInterpolation(s.to_string())),
        }
    }
}

impl fmt::Display for MaskInterpolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A 2d similarity whose interpolation parameter is the mask value at the input point.
#[derive(Debug)]
pub struct MaskedSimilarity {
    interpolator: SimilarityInterpolator,
    mask: Arc<dyn ScalarField>,
}

impl MaskedSimilarity {
    /// Combine an interpolator with a weight field.
    pub fn new(interpolator: SimilarityInterpolator, mask: Arc<dyn ScalarField>) -> Self {
        Self { interpolator, mask }
    }
}

impl Warp for MaskedSimilarity {
    fn num_source_dimensions(&self) -> usize {
        2
    }

    fn num_target_dimensions(&self) -> usize {
        2
    }

    fn apply(&self, source: &[f64], target: &mut [f64]) {
        let t = self.mask.value(source);
        let p = self
            .interpolator
            .get_affine2(t)
            .transform_point2(glam::DVec2::new(source[0], source[1]));
        target[0] = p.x;
        target[1] = p.y;
    }
}

/// Combine `warp` with `mask` according to `kind`.
///
/// `similarity` is the similarity part of the landmark fit, required by the
/// [`MaskInterpolation::Similarity`] and [`MaskInterpolation::Rotation`] kinds, which
/// interpolate it about the mask center.
///
/// # Errors
///
/// If a similarity is required but missing, or is not two dimensional.
pub fn build_masked_transform(
    kind: MaskInterpolation,
    warp: CoordinateTransform,
    mask: Arc<PlateauSphericalMask>,
    similarity: Option<&AffineTransform>,
) -> Result<CoordinateTransform, TransformError> {
    let dims = warp.num_target_dimensions();
    match kind {
        MaskInterpolation::None => Ok(warp),
        MaskInterpolation::Linear => Ok(blend(warp, CoordinateTransform::identity(dims), mask)),
        MaskInterpolation::Similarity | MaskInterpolation::Rotation => {
            let sim = similarity.ok_or_else(|| TransformError::MissingSimilarity(kind.to_string()))?;
            let center = match mask.center() {
                &[x, y] => [x, y],
                other => {
                    return Err(TransformError::DimensionMismatch {
                        expected: 2,
                        actual: other.len(),
                    })
                }
            };
            let interpolator = if kind == MaskInterpolation::Similarity {
                SimilarityInterpolator::new(sim, center)?
            } else {
                SimilarityInterpolator::rotation_only(sim, center)?
            };
            let masked = CoordinateTransform::warp(MaskedSimilarity::new(interpolator, mask));
            Ok(CoordinateTransform::Sequence(
                TransformSequence::new().then(warp).then(masked),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::decomposition::centered_rotation;
    use approx::assert_relative_eq;

    #[test]
    fn mask_plateau_and_falloff() {
        let mut mask = PlateauSphericalMask::new(vec![0.0, 0.0], 4.0, 1.0, FalloffShape::Linear);
        assert_eq!(mask.value(&[1.0, 1.0]), 1.0);
        assert_relative_eq!(mask.value(&[2.5, 0.0]), 0.5);
        assert_eq!(mask.value(&[4.0, 0.0]), 0.0);

        mask.set_shape(FalloffShape::Cosine);
        assert_relative_eq!(mask.value(&[2.5, 0.0]), 0.5, epsilon = 1e-12);
        assert_eq!(mask.value(&[3.5, 0.0]), 0.0);

        mask.set_shape(FalloffShape::Gaussian);
        assert_relative_eq!(mask.value(&[3.0, 0.0]), (-0.5f64).exp());
    }

    #[test]
    fn tags_parse() -> Result<(), TransformError> {
        assert_eq!("gaussian".parse::<FalloffShape>()?, FalloffShape::Gaussian);
        assert_eq!("ROTATION".parse::<MaskInterpolation>()?, MaskInterpolation::Rotation);
        assert_eq!(
            "SPLINE".parse::<MaskInterpolation>(),
            Err(TransformError::UnknownMaskInterpolation("SPLINE".into()))
        );
        Ok(())
    }

    #[test]
    fn masked_linear_is_identity_far_away() -> Result<(), TransformError> {
        let mask = Arc::new(PlateauSphericalMask::new(vec![0.0, 0.0], 1.0, 1.0, FalloffShape::Cosine));
        let warp = CoordinateTransform::from(AffineTransform::translation(&[5.0, 0.0]));
        let mut t = build_masked_transform(MaskInterpolation::Linear, warp, mask, None)?;
        assert_eq!(t.apply_vec(&[0.5, 0.0]), vec![5.5, 0.0]);
        assert_eq!(t.apply_vec(&[10.0, 0.0]), vec![10.0, 0.0]);
        Ok(())
    }

    #[test]
    fn masked_similarity_needs_similarity() {
        let mask = Arc::new(PlateauSphericalMask::new(vec![0.0, 0.0], 1.0, 1.0, FalloffShape::Cosine));
        let res = build_masked_transform(
            MaskInterpolation::Similarity,
            CoordinateTransform::identity(2),
            mask,
            None,
        );
        assert_eq!(res.err(), Some(TransformError::MissingSimilarity("SIMILARITY".into())));
    }

    #[test]
    fn masked_rotation_inside_plateau() -> Result<(), TransformError> {
        let center = [1.0, 1.0];
        let mask = Arc::new(PlateauSphericalMask::new(center.to_vec(), 100.0, 1.0, FalloffShape::Cosine));
        let rotation = centered_rotation(std::f64::consts::FRAC_PI_2, center);
        let mut t = build_masked_transform(
            MaskInterpolation::Rotation,
            CoordinateTransform::identity(2),
            mask,
            Some(&rotation),
        )?;
        let p = t.apply_vec(&[2.0, 1.0]);
        assert_relative_eq!(p[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(p[1], 2.0, epsilon = 1e-12);
        Ok(())
    }
}
