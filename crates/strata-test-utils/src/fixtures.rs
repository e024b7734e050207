//! Reusable configurations.
//!
//! - [`amr_config`]: a small two-level hierarchy writing under a scratch
//!   directory, every interval disabled.
//! - [`single_level`]: the same without refinement.
//! - [`sphere`]: an embedded sphere with fluid outside.

use std::path::Path;

use strata_amr::AmrConfig;
use strata_eb::EbConfig;

/// `root` joined with `name`, as the string roots output paths expect.
pub fn output_root(root: &Path, name: &str) -> String {
    root.join(name).display().to_string()
}

/// An 8³ coarse domain in 4³ boxes with one level of refinement. Plot,
/// small plot, and checkpoint roots live under `root`.
pub fn amr_config(root: &Path) -> AmrConfig {
    AmrConfig {
        max_level: 1,
        n_cell: [8; 3],
        max_grid_size: 4,
        regrid_int: 2,
        plot_file: output_root(root, "plt"),
        small_plot_file: output_root(root, "smallplt"),
        check_file: output_root(root, "chk"),
        ..AmrConfig::default()
    }
}

/// [`amr_config`] with `max_level = 0`.
pub fn single_level(root: &Path) -> AmrConfig {
    AmrConfig {
        max_level: 0,
        ..amr_config(root)
    }
}

/// A sphere of radius 0.25 centered in the unit cube.
pub fn sphere() -> EbConfig {
    EbConfig {
        geom_type: "sphere".into(),
        sphere_center: [0.5; 3],
        sphere_radius: 0.25,
        sphere_has_fluid_inside: false,
        ..EbConfig::default()
    }
}
