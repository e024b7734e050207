//! The per-run embedded-boundary index space.

use strata_core::{IndexBox, IntVect};
use strata_grid::{Fab, Geometry};
use tracing::info;

use crate::config::EbConfig;
use crate::error::EbError;
use crate::shape::EbShape;
use crate::support::{EbGrowCells, EbSupport};

/// Sub-samples per direction when integrating fractions over a cut cell.
const SUBSAMPLES: usize = 4;

/// Cut-cell geometry shared by every level of the hierarchy.
#[derive(Clone, Debug)]
pub struct EbIndexSpace {
    shape: EbShape,
    finest_geom: Geometry,
    max_level: usize,
    support: EbSupport,
    grow: EbGrowCells,
}

impl EbIndexSpace {
    /// Build the index space for `finest_geom`, the geometry of the
    /// deepest configured level.
    ///
    /// Support defaults to [`EbSupport::Full`] with
    /// [`EbGrowCells::default`]; see [`EbIndexSpace::with_support`].
    pub fn build(
        config: &EbConfig,
        finest_geom: &Geometry,
        required_level: usize,
        max_level: usize,
    ) -> Result<Self, EbError> {
        if required_level > max_level {
            return Err(EbError::LevelRange {
                required: required_level,
                max: max_level,
            });
        }
        let shape = config.validate()?;
        info!(
            geom_type = shape.name(),
            max_level,
            domain = %finest_geom.domain(),
            "EB index space built"
        );
        Ok(Self {
            shape,
            finest_geom: finest_geom.clone(),
            max_level,
            support: EbSupport::default(),
            grow: EbGrowCells::default(),
        })
    }

    /// Set the support granularity and grow-cell requirements.
    pub fn with_support(mut self, support: EbSupport, grow: EbGrowCells) -> Self {
        self.support = support;
        self.grow = grow;
        self
    }

    /// The resolved geometry.
    pub fn shape(&self) -> &EbShape {
        &self.shape
    }

    /// Geometry of the deepest level the space was built for.
    pub fn finest_geom(&self) -> &Geometry {
        &self.finest_geom
    }

    /// Deepest level covered.
    pub fn max_level(&self) -> usize {
        self.max_level
    }

    /// Support granularity.
    pub fn support(&self) -> EbSupport {
        self.support
    }

    /// Ghost cells level data must carry at the configured support.
    pub fn required_grow(&self) -> usize {
        self.grow.required_grow(self.support)
    }

    /// `false` exactly for the `all_regular` geometry.
    pub fn has_cut_cells(&self) -> bool {
        self.shape.has_boundary()
    }

    /// Fluid volume fraction of every cell of `bx`, one component.
    pub fn volume_fractions(&self, geom: &Geometry, bx: &IndexBox) -> Fab {
        let mut fab = Fab::new(*bx, 1);
        let dx = geom.cell_size();
        let half_diag = 0.5 * dx.iter().map(|h| h * h).sum::<f64>().sqrt();
        for iv in bx.cells() {
            let center = geom.cell_center(&iv);
            let phi = self.shape.level_set(center);
            let frac = if phi <= -half_diag {
                1.0
            } else if phi >= half_diag {
                0.0
            } else {
                self.sample_cell(center, dx)
            };
            fab.set(&iv, 0, frac);
        }
        fab
    }

    /// Fluid fraction of the low face of every cell of `bx`, one FAB per
    /// direction.
    pub fn area_fractions(&self, geom: &Geometry, bx: &IndexBox) -> [Fab; 3] {
        let dx = geom.cell_size();
        std::array::from_fn(|dir| {
            let mut fab = Fab::new(*bx, 1);
            for iv in bx.cells() {
                let mut face = geom.cell_center(&iv);
                face[dir] -= 0.5 * dx[dir];
                fab.set(&iv, 0, self.sample_face(face, dx, dir));
            }
            fab
        })
    }

    /// Number of cells of `bx` with a volume fraction strictly between
    /// zero and one.
    pub fn cut_cell_count(&self, geom: &Geometry, bx: &IndexBox) -> usize {
        if !self.has_cut_cells() {
            return 0;
        }
        let vf = self.volume_fractions(geom, bx);
        vf.comp(0).iter().filter(|&&v| v > 0.0 && v < 1.0).count()
    }

    fn sample_cell(&self, center: [f64; 3], dx: [f64; 3]) -> f64 {
        let n = SUBSAMPLES;
        let mut fluid = 0usize;
        for iv in IndexBox::from_extent(IntVect::splat(n as i32)).cells() {
            let x = std::array::from_fn(|d| {
                center[d] + dx[d] * ((f64::from(iv.get(d)) + 0.5) / n as f64 - 0.5)
            });
            if self.shape.is_fluid(x) {
                fluid += 1;
            }
        }
        fluid as f64 / (n * n * n) as f64
    }

    fn sample_face(&self, face: [f64; 3], dx: [f64; 3], dir: usize) -> f64 {
        let n = SUBSAMPLES;
        let (a, b) = ((dir + 1) % 3, (dir + 2) % 3);
        let mut fluid = 0usize;
        for i in 0..n {
            for j in 0..n {
                let mut x = face;
                x[a] += dx[a] * ((i as f64 + 0.5) / n as f64 - 0.5);
                x[b] += dx[b] * ((j as f64 + 0.5) / n as f64 - 0.5);
                if self.shape.is_fluid(x) {
                    fluid += 1;
                }
            }
        }
        fluid as f64 / (n * n) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strata_grid::CoordSys;

    fn geom(n: i32) -> Geometry {
        Geometry::new(
            IndexBox::from_extent(IntVect::splat(n)),
            [0.0; 3],
            [1.0; 3],
            CoordSys::Cartesian,
        )
    }

    fn sphere() -> EbConfig {
        EbConfig {
            geom_type: "sphere".into(),
            sphere_center: [0.5; 3],
            sphere_radius: 0.3,
            ..EbConfig::default()
        }
    }

    #[test]
    fn all_regular_has_no_cut_cells() {
        let g = geom(8);
        let eb = EbIndexSpace::build(&EbConfig::default(), &g, 0, 0).unwrap();
        assert!(!eb.has_cut_cells());
        let vf = eb.volume_fractions(&g, &g.domain());
        assert!(vf.comp(0).iter().all(|&v| v == 1.0));
        assert_eq!(eb.cut_cell_count(&g, &g.domain()), 0);
    }

    #[test]
    fn sphere_cuts_cells_and_covers_center() {
        let g = geom(16);
        let eb = EbIndexSpace::build(&sphere(), &g, 1, 1).unwrap();
        assert!(eb.has_cut_cells());
        let vf = eb.volume_fractions(&g, &g.domain());
        assert_eq!(vf.get(&IntVect::splat(8), 0), 0.0);
        assert_eq!(vf.get(&IntVect::zero(), 0), 1.0);
        assert!(eb.cut_cell_count(&g, &g.domain()) > 0);
    }

    #[test]
    fn support_sets_required_grow() {
        let g = geom(8);
        let eb = EbIndexSpace::build(&sphere(), &g, 0, 0)
            .unwrap()
            .with_support(EbSupport::Volume, EbGrowCells { basic: 1, volume: 3, full: 5 });
        assert_eq!(eb.required_grow(), 3);
    }

    #[test]
    fn required_level_is_bounded() {
        let g = geom(8);
        let err = EbIndexSpace::build(&EbConfig::default(), &g, 3, 2).unwrap_err();
        assert_eq!(err, EbError::LevelRange { required: 3, max: 2 });
    }

    #[test]
    fn plane_face_fractions_split_at_boundary() {
        let g = geom(4);
        let cfg = EbConfig {
            geom_type: "plane".into(),
            plane_point: [0.0, 0.5, 0.0],
            plane_normal: [0.0, 1.0, 0.0],
            ..EbConfig::default()
        };
        let eb = EbIndexSpace::build(&cfg, &g, 0, 0).unwrap();
        let [ax, ay, _] = eb.area_fractions(&g, &g.domain());
        // Fluid where y < 0.5, i.e. j in {0, 1}.
        assert_eq!(ax.get(&IntVect::new([1, 0, 0]), 0), 1.0);
        assert_eq!(ax.get(&IntVect::new([1, 3, 0]), 0), 0.0);
        assert_eq!(ay.get(&IntVect::new([0, 1, 0]), 0), 1.0);
    }

    proptest! {
        #[test]
        fn fractions_stay_in_unit_interval(r in 0.05f64..0.6, cx in 0.2f64..0.8) {
            let g = geom(8);
            let cfg = EbConfig {
                sphere_center: [cx, 0.5, 0.5],
                sphere_radius: r,
                ..sphere()
            };
            let eb = EbIndexSpace::build(&cfg, &g, 0, 0).unwrap();
            let vf = eb.volume_fractions(&g, &g.domain());
            prop_assert!(vf.comp(0).iter().all(|&v| (0.0..=1.0).contains(&v)));
        }
    }
}
