//! Physical geometry of one refinement level.

use serde::Deserialize;
use strata_core::{IndexBox, IntVect, SPACEDIM};

/// Coordinate system of the physical domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoordSys {
    /// Cartesian `(x, y, z)`.
    #[default]
    Cartesian,
    /// Axisymmetric `(r, z)`.
    Rz,
    /// Spherical `(r)`.
    Spherical,
}

impl CoordSys {
    /// Integer code written into dataset headers.
    pub fn code(self) -> i32 {
        match self {
            Self::Cartesian => 0,
            Self::Rz => 1,
            Self::Spherical => 2,
        }
    }

    /// Inverse of [`CoordSys::code`].
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Cartesian),
            1 => Some(Self::Rz),
            2 => Some(Self::Spherical),
            _ => None,
        }
    }
}

/// Index domain plus the physical box it maps onto.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    domain: IndexBox,
    prob_lo: [f64; SPACEDIM],
    prob_hi: [f64; SPACEDIM],
    coord: CoordSys,
}

impl Geometry {
    /// Map the cell-centered `domain` onto `[prob_lo, prob_hi]`.
    pub fn new(
        domain: IndexBox,
        prob_lo: [f64; SPACEDIM],
        prob_hi: [f64; SPACEDIM],
        coord: CoordSys,
    ) -> Self {
        Self {
            domain,
            prob_lo,
            prob_hi,
            coord,
        }
    }

    /// Index-space domain.
    pub fn domain(&self) -> IndexBox {
        self.domain
    }

    /// Physical lower corner.
    pub fn prob_lo(&self) -> [f64; SPACEDIM] {
        self.prob_lo
    }

    /// Physical upper corner.
    pub fn prob_hi(&self) -> [f64; SPACEDIM] {
        self.prob_hi
    }

    /// Coordinate system.
    pub fn coord_sys(&self) -> CoordSys {
        self.coord
    }

    /// Cell width along each direction.
    pub fn cell_size(&self) -> [f64; SPACEDIM] {
        let n = self.domain.length();
        std::array::from_fn(|d| (self.prob_hi[d] - self.prob_lo[d]) / f64::from(n.get(d)))
    }

    /// Geometry of the next finer level: same physical box, refined index space.
    pub fn refine(&self, ratio: &IntVect) -> Self {
        Self {
            domain: self.domain.refine(ratio),
            ..self.clone()
        }
    }

    /// Physical coordinates of the center of cell `iv`.
    pub fn cell_center(&self, iv: &IntVect) -> [f64; SPACEDIM] {
        let dx = self.cell_size();
        let lo = self.domain.lo();
        std::array::from_fn(|d| self.prob_lo[d] + (f64::from(iv.get(d) - lo.get(d)) + 0.5) * dx[d])
    }

    /// Physical coordinates of node `iv`.
    pub fn node_position(&self, iv: &IntVect) -> [f64; SPACEDIM] {
        let dx = self.cell_size();
        let lo = self.domain.lo();
        std::array::from_fn(|d| self.prob_lo[d] + f64::from(iv.get(d) - lo.get(d)) * dx[d])
    }

    /// Physical volume of one cell.
    pub fn cell_volume(&self) -> f64 {
        self.cell_size().iter().product()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_cube(n: i32) -> Geometry {
        Geometry::new(
            IndexBox::from_extent(IntVect::splat(n)),
            [0.0; 3],
            [1.0; 3],
            CoordSys::Cartesian,
        )
    }

    #[test]
    fn refinement_halves_cell_size() {
        let g = unit_cube(8);
        let f = g.refine(&IntVect::splat(2));
        assert_eq!(f.domain().length(), IntVect::splat(16));
        assert!((g.cell_size()[0] - 2.0 * f.cell_size()[0]).abs() < 1e-15);
        assert_eq!(f.prob_hi(), g.prob_hi());
    }

    #[test]
    fn cell_centers_sit_between_nodes() {
        let g = unit_cube(4);
        let c = g.cell_center(&IntVect::new([0, 1, 3]));
        assert!((c[0] - 0.125).abs() < 1e-15);
        assert!((c[1] - 0.375).abs() < 1e-15);
        assert!((c[2] - 0.875).abs() < 1e-15);
        let n = g.node_position(&IntVect::splat(4));
        assert!((n[2] - 1.0).abs() < 1e-15);
    }

    #[test]
    fn coord_codes_round_trip() {
        for c in [CoordSys::Cartesian, CoordSys::Rz, CoordSys::Spherical] {
            assert_eq!(CoordSys::from_code(c.code()), Some(c));
        }
        assert_eq!(CoordSys::from_code(7), None);
    }
}
