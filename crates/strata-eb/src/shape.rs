//! Implicit-function geometries.

/// A boundary described by a signed-distance level set.
///
/// The level set is negative in fluid and positive inside the body.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum EbShape {
    /// No boundary: every point is fluid.
    AllRegular,
    /// A sphere with fluid either inside or outside.
    Sphere {
        /// Center.
        center: [f64; 3],
        /// Radius.
        radius: f64,
        /// `true` if the interior is fluid.
        fluid_inside: bool,
    },
    /// A half-space; the unit normal points into the body.
    Plane {
        /// A point on the plane.
        point: [f64; 3],
        /// Unit normal.
        normal: [f64; 3],
    },
}

impl EbShape {
    /// Signed distance from `x` to the boundary.
    pub fn level_set(&self, x: [f64; 3]) -> f64 {
        match *self {
            Self::AllRegular => f64::NEG_INFINITY,
            Self::Sphere {
                center,
                radius,
                fluid_inside,
            } => {
                let r = (0..3).map(|d| (x[d] - center[d]).powi(2)).sum::<f64>().sqrt();
                if fluid_inside {
                    r - radius
                } else {
                    radius - r
                }
            }
            Self::Plane { point, normal } => (0..3).map(|d| (x[d] - point[d]) * normal[d]).sum(),
        }
    }

    /// `true` if `x` lies in fluid.
    pub fn is_fluid(&self, x: [f64; 3]) -> bool {
        self.level_set(x) < 0.0
    }

    /// `true` for any geometry that actually has a boundary.
    pub fn has_boundary(&self) -> bool {
        !matches!(self, Self::AllRegular)
    }

    /// Geometry name as used in `eb2.geom_type`.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AllRegular => "all_regular",
            Self::Sphere { .. } => "sphere",
            Self::Plane { .. } => "plane",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_sign_follows_fluid_side() {
        let outside = EbShape::Sphere {
            center: [0.0; 3],
            radius: 1.0,
            fluid_inside: false,
        };
        assert!(outside.is_fluid([2.0, 0.0, 0.0]));
        assert!(!outside.is_fluid([0.5, 0.0, 0.0]));
        let inside = EbShape::Sphere {
            center: [0.0; 3],
            radius: 1.0,
            fluid_inside: true,
        };
        assert!(inside.is_fluid([0.5, 0.0, 0.0]));
        assert!((inside.level_set([3.0, 0.0, 0.0]) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn plane_normal_points_into_body() {
        let p = EbShape::Plane {
            point: [0.5, 0.0, 0.0],
            normal: [1.0, 0.0, 0.0],
        };
        assert!(p.is_fluid([0.25, 9.0, 9.0]));
        assert!(!p.is_fluid([0.75, 0.0, 0.0]));
    }

    #[test]
    fn all_regular_is_fluid_everywhere() {
        assert!(EbShape::AllRegular.is_fluid([1e9, -1e9, 0.0]));
        assert!(!EbShape::AllRegular.has_boundary());
    }
}
