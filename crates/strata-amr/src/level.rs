//! The per-level physics seam.

use std::io::Write;
use std::path::Path;

use strata_core::{DeriveList, DescriptorList, StateTypeId};
use strata_eb::EbIndexSpace;
use strata_grid::{BoxArray, DistributionMapping, FabArena, Geometry, MultiFab};

use crate::error::AmrError;

/// Numerical state and update rules of one refinement level.
///
/// The hierarchy owns one boxed `LevelPhysics` per level and drives it
/// through these calls; it never looks inside the state itself.
pub trait LevelPhysics: Send {
    /// Level index.
    fn level(&self) -> usize;

    /// Geometry of the level.
    fn geom(&self) -> &Geometry;

    /// Cell-centered box array of the level.
    fn box_array(&self) -> &BoxArray;

    /// Distribution of the level's boxes.
    fn distribution_map(&self) -> &DistributionMapping;

    /// State types this level carries.
    fn descriptors(&self) -> &DescriptorList;

    /// Derived quantities this level can compute.
    fn derives(&self) -> &DeriveList;

    /// Current data of state type `ty`.
    fn state(&self, ty: StateTypeId) -> Option<&MultiFab>;

    /// Time of the current data of state type `ty`.
    fn state_time(&self, ty: StateTypeId) -> Option<f64>;

    /// Fill every state type with initial conditions at `time`.
    fn init_data(&mut self, time: f64) -> Result<(), AmrError>;

    /// Advance from `time` by `dt`. `iteration` counts sub-steps within
    /// the parent step, `1..=ncycle`. Returns this rank's estimate of the
    /// next stable time step.
    fn advance(&mut self, time: f64, dt: f64, iteration: usize, ncycle: usize) -> Result<f64, AmrError>;

    /// This rank's estimate of a stable time step for the current state.
    fn est_time_step(&self) -> f64;

    /// Compute derived quantity `name` at `time` with `ngrow` ghost cells.
    fn derive(&self, name: &str, time: f64, ngrow: usize) -> Result<MultiFab, AmrError>;

    /// `false` once the physics cannot take another step.
    fn ok_to_continue(&self) -> bool {
        true
    }

    /// Replace state type `ty` with `data`, valid at `time`. `data` has the
    /// layout of [`state`](LevelPhysics::state).
    fn restore_state(&mut self, ty: StateTypeId, data: MultiFab, time: f64) -> Result<(), AmrError>;

    /// Hook run on the coordinator after a full plot dataset is written;
    /// `header` is the dataset's `Header` opened for appending.
    fn write_plot_post(&self, _dir: &Path, _header: &mut dyn Write) -> Result<(), AmrError> {
        Ok(())
    }
}

/// Everything a builder needs besides the level's own layout.
#[derive(Clone, Copy, Debug)]
pub struct LevelContext<'a> {
    /// This rank.
    pub rank: usize,
    /// Ranks in the group.
    pub nprocs: usize,
    /// Arena recording FAB storage.
    pub arena: &'a FabArena,
    /// Embedded boundary, if one is active.
    pub eb: Option<&'a EbIndexSpace>,
    /// Ghost cells state must carry beyond the physics' own needs.
    pub ngrow: usize,
}

/// Creates levels and declares what they carry.
pub trait LevelBuilder: Send {
    /// State types every level carries.
    fn descriptors(&self) -> DescriptorList;

    /// Derived quantities every level can compute.
    fn derives(&self) -> DeriveList;

    /// Build level `level` over `ba` distributed by `dm`. State is
    /// allocated but not initialized.
    fn build(
        &self,
        level: usize,
        geom: &Geometry,
        ba: &BoxArray,
        dm: &DistributionMapping,
        ctx: &LevelContext<'_>,
    ) -> Result<Box<dyn LevelPhysics>, AmrError>;
}
