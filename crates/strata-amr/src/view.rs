//! Read-only access to the hierarchy, and the output callback.

use strata_comm::Communicator;
use strata_core::{IntVect, PlotKind, RunError};
use strata_eb::EbIndexSpace;
use strata_grid::{FabArena, Geometry};

use crate::level::LevelPhysics;

/// What output code may read from a hierarchy.
pub trait HierarchyView {
    /// Index of the finest existing level.
    fn finest_level(&self) -> usize;

    /// Level `lev`, if it exists.
    fn level(&self, lev: usize) -> Option<&dyn LevelPhysics>;

    /// Geometry of every existing level, coarsest first.
    fn geoms(&self) -> &[Geometry];

    /// Step counter of every existing level.
    fn level_steps(&self) -> &[i64];

    /// Refinement ratio below each existing level but the finest.
    fn ref_ratios(&self) -> &[IntVect];

    /// Time step of every existing level.
    fn dt_level(&self) -> &[f64];

    /// Cumulative simulated time.
    fn cum_time(&self) -> f64;

    /// Embedded boundary, if one is attached.
    fn eb(&self) -> Option<&EbIndexSpace>;

    /// Arena recording FAB storage on this rank.
    fn arena(&self) -> &FabArena;

    /// Step counter of level 0.
    fn coarse_step(&self) -> i64 {
        self.level_steps().first().copied().unwrap_or(0)
    }
}

/// Receives the output events the hierarchy schedules while stepping.
pub trait OutputSink {
    /// Write a plot dataset of flavor `kind`.
    fn write_plot(
        &mut self,
        hierarchy: &dyn HierarchyView,
        kind: PlotKind,
        comm: &dyn Communicator,
    ) -> Result<(), RunError>;

    /// Write a checkpoint.
    fn checkpoint(&mut self, hierarchy: &dyn HierarchyView, comm: &dyn Communicator) -> Result<(), RunError>;
}
