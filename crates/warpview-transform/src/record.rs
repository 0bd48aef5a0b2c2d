use serde::{Deserialize, Serialize};

use crate::mask::{MaskInterpolation, MaskParameters, PlateauSphericalMask};

/// An intensity range `[min, max]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundedRange {
    /// Lower bound.
    pub min: f64,
    /// Upper bound.
    pub max: f64,
}

/// The `mask` part of a [`TransformRecord`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskRecord {
    /// Shape of the mask; absent when the mask comes from an image rather than a sphere.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<MaskParameters>,
    /// Display range of the mask.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<BoundedRange>,
    /// How the mask combines the warp with its surroundings.
    pub interpolation_type: MaskInterpolation,
}

impl MaskRecord {
    /// Capture the state of a masked transform.
    pub fn from_state(
        mask: Option<&PlateauSphericalMask>,
        range: Option<BoundedRange>,
        interpolation_type: MaskInterpolation,
    ) -> Self {
        Self {
            parameters: mask.map(PlateauSphericalMask::parameters),
            range,
            interpolation_type,
        }
    }

    /// Rebuild the spherical mask, if the record describes one.
    pub fn mask(&self) -> Option<PlateauSphericalMask> {
        self.parameters.clone().map(PlateauSphericalMask::from_parameters)
    }
}

/// Everything needed to rebuild a landmark transform.
///
/// The landmark table is carried as opaque JSON; the other fields map onto
/// [`crate::CoordinateTransform`] construction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformRecord {
    /// The transform kind tag, e.g. `"Thin Plate Spline"` or `"Affine"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// The point correspondences.
    pub landmarks: serde_json::Value,
    /// Mask settings, present only for masked transforms.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask: Option<MaskRecord>,
}

impl TransformRecord {
    /// Serialize to a JSON string.
    ///
    /// # Errors
    ///
    /// If serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse from a JSON string.
    ///
    /// # Errors
    ///
    /// If the string is not a valid record.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
