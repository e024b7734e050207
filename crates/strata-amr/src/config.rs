//! `amr.*` parameters.

use serde::Deserialize;
use strata_core::{IndexBox, IntVect, VarSet};
use strata_grid::{CoordSys, DistributionStrategy, Geometry};

use crate::error::AmrError;

/// Hierarchy, cadence, and output parameters read from the `amr` section.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AmrConfig {
    /// Deepest refinement level allowed.
    pub max_level: usize,
    /// Cells per direction on level 0.
    pub n_cell: [i32; 3],
    /// Refinement ratio between consecutive levels.
    pub ref_ratio: i32,
    /// Longest box edge, in cells.
    pub max_grid_size: i32,
    /// Coarse steps between regrids; `<= 0` never regrids.
    pub regrid_int: i64,
    /// Coarse steps between plot outputs; `<= 0` disables.
    pub plot_int: i64,
    /// Coarse steps between small plot outputs; `<= 0` disables.
    pub small_plot_int: i64,
    /// Coarse steps between checkpoints; `<= 0` disables.
    pub check_int: i64,
    /// Plot output root.
    pub plot_file: String,
    /// Small plot output root.
    pub small_plot_file: String,
    /// Checkpoint output root.
    pub check_file: String,
    /// Minimum digits of the step suffix on output directories.
    pub file_name_digits: usize,
    /// Master switch for plot output.
    pub plot_files_output: bool,
    /// Master switch for checkpoint output.
    pub checkpoint_files_output: bool,
    /// State components in plot output (`ALL`, `NONE`, or names).
    pub plot_vars: Vec<String>,
    /// State components in small plot output.
    pub small_plot_vars: Vec<String>,
    /// Derived quantities in plot output.
    pub derive_plot_vars: Vec<String>,
    /// Plot encoding: `native` or `hdf5`.
    pub plot_format: String,
    /// Checkpoint directory to restart from.
    pub restart: Option<String>,
    /// Regrid once before stepping when restarting.
    pub regrid_on_restart: bool,
    /// Verbosity; `> 0` reports output timing and per-level progress.
    pub verbose: u32,
    /// Physical lower corner.
    pub prob_lo: [f64; 3],
    /// Physical upper corner.
    pub prob_hi: [f64; 3],
    /// Fraction of each parent's extent a finer level covers.
    pub refine_fraction: f64,
    /// Box-to-rank assignment.
    pub distribution: DistributionStrategy,
    /// Coordinate system.
    pub coord_sys: CoordSys,
    /// Fixed coarse time step; overrides estimation when set.
    pub fixed_dt: Option<f64>,
    /// Factor applied to the first estimated time step.
    pub init_shrink: f64,
    /// Largest growth of the time step between coarse steps.
    pub change_max: f64,
}

impl Default for AmrConfig {
    fn default() -> Self {
        Self {
            max_level: 0,
            n_cell: [32; 3],
            ref_ratio: 2,
            max_grid_size: 32,
            regrid_int: 2,
            plot_int: -1,
            small_plot_int: -1,
            check_int: -1,
            plot_file: "plt".into(),
            small_plot_file: "smallplt".into(),
            check_file: "chk".into(),
            file_name_digits: 5,
            plot_files_output: true,
            checkpoint_files_output: true,
            plot_vars: vec![VarSet::ALL.into()],
            small_plot_vars: Vec::new(),
            derive_plot_vars: Vec::new(),
            plot_format: "native".into(),
            restart: None,
            regrid_on_restart: false,
            verbose: 0,
            prob_lo: [0.0; 3],
            prob_hi: [1.0; 3],
            refine_fraction: 0.5,
            distribution: DistributionStrategy::default(),
            coord_sys: CoordSys::default(),
            fixed_dt: None,
            init_shrink: 1.0,
            change_max: 1.1,
        }
    }
}

impl AmrConfig {
    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), AmrError> {
        if self.n_cell.iter().any(|&n| n <= 0) {
            return Err(AmrError::Config {
                field: "n_cell",
                reason: format!("every entry must be positive, got {:?}", self.n_cell),
            });
        }
        if self.max_level > 0 && self.ref_ratio < 2 {
            return Err(AmrError::Config {
                field: "ref_ratio",
                reason: format!("must be at least 2 with refinement, got {}", self.ref_ratio),
            });
        }
        if self.max_grid_size <= 0 {
            return Err(AmrError::Config {
                field: "max_grid_size",
                reason: format!("must be positive, got {}", self.max_grid_size),
            });
        }
        if (0..3).any(|d| !(self.prob_hi[d] > self.prob_lo[d])) {
            return Err(AmrError::Config {
                field: "prob_hi",
                reason: format!("{:?} must exceed prob_lo {:?}", self.prob_hi, self.prob_lo),
            });
        }
        if !(self.refine_fraction > 0.0 && self.refine_fraction <= 1.0) {
            return Err(AmrError::Config {
                field: "refine_fraction",
                reason: format!("must lie in (0, 1], got {}", self.refine_fraction),
            });
        }
        if let Some(dt) = self.fixed_dt {
            if !(dt.is_finite() && dt > 0.0) {
                return Err(AmrError::Config {
                    field: "fixed_dt",
                    reason: format!("must be positive and finite, got {dt}"),
                });
            }
        }
        if !(self.init_shrink > 0.0 && self.init_shrink <= 1.0) {
            return Err(AmrError::Config {
                field: "init_shrink",
                reason: format!("must lie in (0, 1], got {}", self.init_shrink),
            });
        }
        if !(self.change_max >= 1.0) {
            return Err(AmrError::Config {
                field: "change_max",
                reason: format!("must be at least 1, got {}", self.change_max),
            });
        }
        Ok(())
    }

    /// Geometry of level 0.
    pub fn coarse_geometry(&self) -> Geometry {
        Geometry::new(
            IndexBox::from_extent(IntVect::new(self.n_cell)),
            self.prob_lo,
            self.prob_hi,
            self.coord_sys,
        )
    }

    /// Refinement ratio as a vector.
    pub fn ref_ratio_vect(&self) -> IntVect {
        IntVect::splat(self.ref_ratio)
    }

    /// Plot-variable filter for full output.
    pub fn plot_var_set(&self) -> VarSet {
        VarSet::from_names(&self.plot_vars)
    }

    /// Plot-variable filter for small output.
    pub fn small_plot_var_set(&self) -> VarSet {
        VarSet::from_names(&self.small_plot_vars)
    }

    /// Derived-quantity filter for full output.
    pub fn derive_var_set(&self) -> VarSet {
        VarSet::from_names(&self.derive_plot_vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        AmrConfig::default().validate().unwrap();
    }

    #[test]
    fn section_fills_missing_fields_with_defaults() {
        let cfg: AmrConfig = toml::from_str(
            r#"
            max_level = 1
            n_cell = [16, 16, 8]
            plot_int = 5
            derive_plot_vars = ["magvel"]
            distribution = "round_robin"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.max_level, 1);
        assert_eq!(cfg.n_cell, [16, 16, 8]);
        assert_eq!(cfg.plot_int, 5);
        assert_eq!(cfg.check_file, "chk");
        assert_eq!(cfg.distribution, DistributionStrategy::RoundRobin);
        assert!(cfg.derive_var_set().contains("magvel"));
        assert!(cfg.plot_var_set().contains("anything"));
        assert!(cfg.small_plot_var_set().is_empty());
    }

    #[test]
    fn invalid_fields_are_named() {
        let cases: [(AmrConfig, &str); 4] = [
            (AmrConfig { n_cell: [8, 0, 8], ..Default::default() }, "n_cell"),
            (AmrConfig { max_level: 1, ref_ratio: 1, ..Default::default() }, "ref_ratio"),
            (AmrConfig { refine_fraction: 0.0, ..Default::default() }, "refine_fraction"),
            (AmrConfig { fixed_dt: Some(-1.0), ..Default::default() }, "fixed_dt"),
        ];
        for (cfg, expected) in cases {
            match cfg.validate() {
                Err(AmrError::Config { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected config error for {expected}, got {other:?}"),
            }
        }
    }
}
