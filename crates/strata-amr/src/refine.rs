//! Static nested refinement.
//!
//! Level `l + 1` covers the centered `refine_fraction` of level `l`'s
//! refined region, so the hierarchy's layout depends only on
//! configuration.

use strata_core::{IndexBox, IntVect, SPACEDIM};
use strata_grid::{BoxArray, Geometry};

use crate::config::AmrConfig;
use crate::error::AmrError;

/// The centered `fraction` of `parent`, refined by `ratio`.
pub fn nested_region(parent: &IndexBox, fraction: f64, ratio: &IntVect) -> IndexBox {
    let len = parent.length();
    let mut lo = parent.lo();
    let mut hi = parent.hi();
    for d in 0..SPACEDIM {
        let n = len.get(d);
        let keep = ((f64::from(n) * fraction).round() as i32).clamp(1, n);
        lo.0[d] += (n - keep) / 2;
        hi.0[d] = lo.0[d] + keep - 1;
    }
    IndexBox::new(lo, hi).refine(ratio)
}

/// Geometry of every level up to `config.max_level`.
pub fn level_geometries(config: &AmrConfig) -> Vec<Geometry> {
    let ratio = config.ref_ratio_vect();
    let mut geoms = vec![config.coarse_geometry()];
    for l in 1..=config.max_level {
        let finer = geoms[l - 1].refine(&ratio);
        geoms.push(finer);
    }
    geoms
}

/// Refined region of every level up to `config.max_level`, in that
/// level's index space.
pub fn level_regions(config: &AmrConfig) -> Vec<IndexBox> {
    let ratio = config.ref_ratio_vect();
    let mut regions = vec![config.coarse_geometry().domain()];
    for l in 1..=config.max_level {
        let region = nested_region(&regions[l - 1], config.refine_fraction, &ratio);
        regions.push(region);
    }
    regions
}

/// Box array of level `level`.
pub fn level_box_array(config: &AmrConfig, level: usize) -> Result<BoxArray, AmrError> {
    let region = level_regions(config)
        .get(level)
        .copied()
        .ok_or_else(|| AmrError::Config {
            field: "max_level",
            reason: format!("level {level} exceeds max_level {}", config.max_level),
        })?;
    Ok(BoxArray::from_domain(&region, &IntVect::splat(config.max_grid_size))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn half_region_is_centered() {
        let parent = IndexBox::from_extent(IntVect::splat(16));
        let r = nested_region(&parent, 0.5, &IntVect::splat(2));
        assert_eq!(r, IndexBox::new(IntVect::splat(8), IntVect::splat(23)));
    }

    #[test]
    fn three_level_layout_nests() {
        let cfg = AmrConfig {
            max_level: 2,
            n_cell: [16, 16, 16],
            max_grid_size: 8,
            ..AmrConfig::default()
        };
        let geoms = level_geometries(&cfg);
        assert_eq!(geoms.len(), 3);
        assert_eq!(geoms[2].domain().length(), IntVect::splat(64));
        let ba2 = level_box_array(&cfg, 2).unwrap();
        assert_eq!(ba2.minimal_box(), IndexBox::new(IntVect::splat(24), IntVect::splat(39)));
        assert!(level_box_array(&cfg, 3).is_err());
    }

    proptest! {
        #[test]
        fn refined_region_stays_inside_refined_parent(
            n in 1i32..40,
            fraction in 0.01f64..=1.0,
            ratio in 2i32..5,
        ) {
            let parent = IndexBox::new(IntVect::splat(3), IntVect::splat(3 + n - 1));
            let ratio = IntVect::splat(ratio);
            let child = nested_region(&parent, fraction, &ratio);
            prop_assert!(!child.is_empty());
            prop_assert!(parent.refine(&ratio).contains_box(&child));
        }
    }
}
