//! `eb2.*` parameters.

use serde::Deserialize;

use crate::error::EbError;
use crate::shape::EbShape;

/// Embedded-boundary parameters, read from the `eb2` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EbConfig {
    /// Geometry name: `all_regular`, `sphere`, or `plane`.
    pub geom_type: String,
    /// Sphere center.
    pub sphere_center: [f64; 3],
    /// Sphere radius.
    pub sphere_radius: f64,
    /// `true` if fluid fills the sphere's interior.
    pub sphere_has_fluid_inside: bool,
    /// A point on the plane.
    pub plane_point: [f64; 3],
    /// Plane normal, pointing into the body.
    pub plane_normal: [f64; 3],
}

impl EbConfig {
    /// Name of the geometry with no embedded boundary.
    pub const ALL_REGULAR: &'static str = "all_regular";

    /// Check parameters and resolve the geometry they describe.
    pub fn validate(&self) -> Result<EbShape, EbError> {
        match self.geom_type.as_str() {
            Self::ALL_REGULAR => Ok(EbShape::AllRegular),
            "sphere" => {
                if !(self.sphere_radius.is_finite() && self.sphere_radius > 0.0) {
                    return Err(EbError::InvalidParameter {
                        field: "sphere_radius",
                        reason: format!("must be positive and finite, got {}", self.sphere_radius),
                    });
                }
                Ok(EbShape::Sphere {
                    center: self.sphere_center,
                    radius: self.sphere_radius,
                    fluid_inside: self.sphere_has_fluid_inside,
                })
            }
            "plane" => {
                let norm = self.plane_normal.iter().map(|n| n * n).sum::<f64>().sqrt();
                if !(norm.is_finite() && norm > 0.0) {
                    return Err(EbError::InvalidParameter {
                        field: "plane_normal",
                        reason: "must be a non-zero vector".into(),
                    });
                }
                Ok(EbShape::Plane {
                    point: self.plane_point,
                    normal: self.plane_normal.map(|n| n / norm),
                })
            }
            other => Err(EbError::UnknownGeometry { name: other.into() }),
        }
    }
}

impl Default for EbConfig {
    fn default() -> Self {
        Self {
            geom_type: Self::ALL_REGULAR.into(),
            sphere_center: [0.5; 3],
            sphere_radius: 0.25,
            sphere_has_fluid_inside: false,
            plane_point: [0.5; 3],
            plane_normal: [1.0, 0.0, 0.0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_all_regular() {
        assert_eq!(EbConfig::default().validate().unwrap(), EbShape::AllRegular);
    }

    #[test]
    fn unknown_geometry_is_rejected() {
        let cfg = EbConfig {
            geom_type: "torus".into(),
            ..EbConfig::default()
        };
        assert_eq!(
            cfg.validate().unwrap_err(),
            EbError::UnknownGeometry { name: "torus".into() }
        );
    }

    #[test]
    fn plane_normal_is_normalized() {
        let cfg = EbConfig {
            geom_type: "plane".into(),
            plane_normal: [0.0, 3.0, 4.0],
            ..EbConfig::default()
        };
        let EbShape::Plane { normal, .. } = cfg.validate().unwrap() else {
            panic!("expected a plane");
        };
        assert!((normal[1] - 0.6).abs() < 1e-12);
        assert!((normal[2] - 0.8).abs() < 1e-12);
    }

    #[test]
    fn degenerate_parameters_fail() {
        let sphere = EbConfig {
            geom_type: "sphere".into(),
            sphere_radius: 0.0,
            ..EbConfig::default()
        };
        assert!(matches!(
            sphere.validate(),
            Err(EbError::InvalidParameter { field: "sphere_radius", .. })
        ));
        let plane = EbConfig {
            geom_type: "plane".into(),
            plane_normal: [0.0; 3],
            ..EbConfig::default()
        };
        assert!(plane.validate().is_err());
    }
}
