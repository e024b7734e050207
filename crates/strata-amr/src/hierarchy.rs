//! The level hierarchy and its sub-cycled time stepping.

use std::path::Path;

use strata_comm::{Communicator, COORDINATOR};
use strata_core::{IntVect, PlotKind, StateTypeId};
use strata_eb::EbIndexSpace;
use strata_grid::{BoxArray, DistributionMapping, FabArena, Geometry};
use tracing::{debug, info};

use crate::config::AmrConfig;
use crate::error::AmrError;
use crate::level::{LevelBuilder, LevelContext, LevelPhysics};
use crate::refine::{level_box_array, level_geometries};
use crate::view::{HierarchyView, OutputSink};

/// All refinement levels plus the clocks that advance them.
pub struct AmrHierarchy {
    pub(crate) config: AmrConfig,
    builder: Box<dyn LevelBuilder>,
    all_geoms: Vec<Geometry>,
    all_ratios: Vec<IntVect>,
    pub(crate) levels: Vec<Box<dyn LevelPhysics>>,
    pub(crate) level_steps: Vec<i64>,
    pub(crate) dt_level: Vec<f64>,
    pub(crate) dt_estimate: Vec<f64>,
    pub(crate) cum_time: f64,
    eb: Option<EbIndexSpace>,
    arena: FabArena,
    rank: usize,
    pub(crate) nprocs: usize,
    pub(crate) restart_step: Option<i64>,
}

impl AmrHierarchy {
    /// An empty hierarchy for rank `rank` of `nprocs`. Levels are created
    /// by [`init`](AmrHierarchy::init).
    pub fn new(
        config: AmrConfig,
        builder: Box<dyn LevelBuilder>,
        rank: usize,
        nprocs: usize,
    ) -> Result<Self, AmrError> {
        config.validate()?;
        let all_geoms = level_geometries(&config);
        let all_ratios = vec![config.ref_ratio_vect(); config.max_level];
        Ok(Self {
            config,
            builder,
            all_geoms,
            all_ratios,
            levels: Vec::new(),
            level_steps: Vec::new(),
            dt_level: Vec::new(),
            dt_estimate: Vec::new(),
            cum_time: 0.0,
            eb: None,
            arena: FabArena::new(),
            rank,
            nprocs,
            restart_step: None,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &AmrConfig {
        &self.config
    }

    /// The builder's level-independent state registry.
    pub fn builder(&self) -> &dyn LevelBuilder {
        self.builder.as_ref()
    }

    /// Deepest level allowed.
    pub fn max_level(&self) -> usize {
        self.config.max_level
    }

    /// Geometry of level `lev`, existing or not.
    pub fn geom(&self, lev: usize) -> Option<&Geometry> {
        self.all_geoms.get(lev)
    }

    /// Geometry of the deepest allowed level.
    pub fn max_level_geom(&self) -> &Geometry {
        &self.all_geoms[self.config.max_level]
    }

    /// Attach the embedded boundary. Must precede [`init`](AmrHierarchy::init)
    /// so levels are built with its ghost-cell requirement.
    pub fn attach_eb(&mut self, eb: EbIndexSpace) {
        self.eb = Some(eb);
    }

    /// Step the run restarted from, if it restarted.
    pub fn restart_step(&self) -> Option<i64> {
        self.restart_step
    }

    /// `true` if [`init`](AmrHierarchy::init) loaded a checkpoint.
    pub fn is_restart(&self) -> bool {
        self.restart_step.is_some()
    }

    /// `true` if a restart asks for a regrid before stepping.
    pub fn regrid_on_restart(&self) -> bool {
        self.config.regrid_on_restart
    }

    /// `true` while every level can take another step.
    pub fn ok_to_continue(&self) -> bool {
        self.levels.iter().all(|l| l.ok_to_continue())
    }

    /// Create every level, either from initial conditions at `strt_time`
    /// or from the checkpoint named by `amr.restart`.
    ///
    /// A fresh start reports step-0 output to `sink` according to the
    /// configured intervals; a restart reports nothing.
    pub fn init(
        &mut self,
        strt_time: f64,
        stop_time: f64,
        sink: &mut dyn OutputSink,
        comm: &dyn Communicator,
    ) -> Result<(), AmrError> {
        if let Some(chk) = self.config.restart.clone() {
            return self.restart(Path::new(&chk), comm);
        }
        self.cum_time = strt_time;
        for lev in 0..=self.config.max_level {
            let ba = level_box_array(&self.config, lev)?;
            let dm = DistributionMapping::new(&ba, self.nprocs, self.config.distribution);
            let mut level = self.build_level(lev, &ba, &dm)?;
            level.init_data(strt_time)?;
            self.levels.push(level);
        }
        self.level_steps = vec![0; self.levels.len()];
        self.compute_initial_dt(stop_time, comm)?;
        if comm.is_coordinator() {
            info!(
                finest_level = self.finest_level(),
                time = self.cum_time,
                dt = self.dt_level[0],
                "hierarchy initialized"
            );
        }
        self.scheduled_output(sink, comm)
    }

    /// Advance level 0 by one step, sub-cycling finer levels, then report
    /// any output due at the new step to `sink`.
    pub fn coarse_time_step(
        &mut self,
        stop_time: f64,
        sink: &mut dyn OutputSink,
        comm: &dyn Communicator,
    ) -> Result<(), AmrError> {
        self.compute_new_dt(stop_time, comm)?;
        let step = self.level_steps[0];
        if self.config.max_level > 0
            && self.config.regrid_int > 0
            && step > 0
            && step % self.config.regrid_int == 0
        {
            self.regrid(self.cum_time, comm)?;
        }
        self.time_step(0, self.cum_time, 1, 1)?;
        self.cum_time += self.dt_level[0];
        if comm.is_coordinator() {
            info!(
                "STEP = {} TIME = {} DT = {}",
                self.level_steps[0], self.cum_time, self.dt_level[0]
            );
        }
        self.scheduled_output(sink, comm)
    }

    /// Rebuild the finer levels at `time` without advancing.
    pub fn regrid_only(&mut self, time: f64, comm: &dyn Communicator) -> Result<(), AmrError> {
        if comm.is_coordinator() {
            info!(time, "regridding without advancing");
        }
        self.regrid(time, comm)
    }

    /// Rebuild levels `1..=max_level` on fresh layouts and move existing
    /// data onto them. Levels that did not exist are initialized at `time`.
    pub fn regrid(&mut self, time: f64, comm: &dyn Communicator) -> Result<(), AmrError> {
        let ratio = f64::from(self.config.ref_ratio);
        for lev in 1..=self.config.max_level {
            let ba = level_box_array(&self.config, lev)?;
            let dm = DistributionMapping::new(&ba, self.nprocs, self.config.distribution);
            let mut fresh = self.build_level(lev, &ba, &dm)?;
            fresh.init_data(time)?;
            match self.levels.get(lev) {
                Some(old) => {
                    let types: Vec<(StateTypeId, usize)> =
                        fresh.descriptors().iter().map(|(ty, d)| (ty, d.ncomp())).collect();
                    for (ty, ncomp) in types {
                        let (Some(src), Some(dst)) = (old.state(ty), fresh.state(ty)) else {
                            continue;
                        };
                        let mut data = dst.clone();
                        data.parallel_copy_from(src, 0, 0, ncomp.min(src.ncomp()), comm)?;
                        let t = old.state_time(ty).unwrap_or(time);
                        fresh.restore_state(ty, data, t)?;
                    }
                    self.levels[lev] = fresh;
                }
                None => {
                    self.levels.push(fresh);
                    self.level_steps.push(self.level_steps[lev - 1] * self.config.ref_ratio as i64);
                    self.dt_level.push(self.dt_level[lev - 1] / ratio);
                    self.dt_estimate.push(self.dt_estimate[lev - 1] / ratio);
                }
            }
        }
        if comm.is_coordinator() {
            debug!(finest_level = self.finest_level(), time, "regrid complete");
        }
        Ok(())
    }

    pub(crate) fn build_level(
        &self,
        lev: usize,
        ba: &BoxArray,
        dm: &DistributionMapping,
    ) -> Result<Box<dyn LevelPhysics>, AmrError> {
        let ctx = LevelContext {
            rank: self.rank,
            nprocs: self.nprocs,
            arena: &self.arena,
            eb: self.eb.as_ref(),
            ngrow: self.eb.as_ref().map_or(0, EbIndexSpace::required_grow),
        };
        self.builder.build(lev, &self.all_geoms[lev], ba, dm, &ctx)
    }

    fn time_step(&mut self, lev: usize, time: f64, iteration: usize, ncycle: usize) -> Result<(), AmrError> {
        let dt = self.dt_level[lev];
        if self.config.verbose > 0 && self.rank == COORDINATOR {
            debug!(level = lev, step = self.level_steps[lev], dt, "ADVANCE");
        }
        let est = self.levels[lev].advance(time, dt, iteration, ncycle)?;
        self.dt_estimate[lev] = if iteration == 1 {
            est
        } else {
            self.dt_estimate[lev].min(est)
        };
        self.level_steps[lev] += 1;
        if lev < self.finest_level() {
            let r = self.config.ref_ratio as usize;
            for i in 1..=r {
                let sub_time = time + (i - 1) as f64 * self.dt_level[lev + 1];
                self.time_step(lev + 1, sub_time, i, r)?;
            }
        }
        Ok(())
    }

    fn compute_initial_dt(&mut self, stop_time: f64, comm: &dyn Communicator) -> Result<(), AmrError> {
        let estimates: Vec<f64> = self.levels.iter().map(|l| l.est_time_step()).collect();
        self.dt_estimate = estimates.clone();
        let dt0 = match self.config.fixed_dt {
            Some(dt) => dt,
            None => self.coarse_dt_from(&estimates, comm)? * self.config.init_shrink,
        };
        self.set_dt_levels(dt0, stop_time)
    }

    fn compute_new_dt(&mut self, stop_time: f64, comm: &dyn Communicator) -> Result<(), AmrError> {
        let dt0 = match self.config.fixed_dt {
            Some(dt) => dt,
            None => {
                let estimates = self.dt_estimate.clone();
                let est = self.coarse_dt_from(&estimates, comm)?;
                est.min(self.config.change_max * self.dt_level[0])
            }
        };
        self.set_dt_levels(dt0, stop_time)
    }

    /// Smallest per-level estimate, across ranks, scaled to level 0.
    fn coarse_dt_from(&self, estimates: &[f64], comm: &dyn Communicator) -> Result<f64, AmrError> {
        let ratio = f64::from(self.config.ref_ratio);
        let mut dt0 = f64::INFINITY;
        for (lev, &est) in estimates.iter().enumerate() {
            let global = comm.all_reduce_min_f64(est)?;
            dt0 = dt0.min(global * ratio.powi(lev as i32));
        }
        Ok(dt0)
    }

    fn set_dt_levels(&mut self, mut dt0: f64, stop_time: f64) -> Result<(), AmrError> {
        if stop_time >= 0.0 && self.cum_time + dt0 > stop_time && stop_time > self.cum_time {
            dt0 = stop_time - self.cum_time;
        }
        if !(dt0.is_finite() && dt0 > 0.0) {
            return Err(AmrError::TimeStep {
                dt: dt0,
                step: self.level_steps.first().copied().unwrap_or(0),
            });
        }
        let ratio = f64::from(self.config.ref_ratio);
        self.dt_level = (0..self.levels.len())
            .map(|lev| dt0 / ratio.powi(lev as i32))
            .collect();
        Ok(())
    }

    fn scheduled_output(&self, sink: &mut dyn OutputSink, comm: &dyn Communicator) -> Result<(), AmrError> {
        let step = self.level_steps[0];
        let due = |interval: i64| interval > 0 && step % interval == 0;
        if due(self.config.check_int) {
            sink.checkpoint(self, comm)?;
        }
        if due(self.config.plot_int) {
            sink.write_plot(self, PlotKind::Full, comm)?;
        }
        if due(self.config.small_plot_int) {
            sink.write_plot(self, PlotKind::Small, comm)?;
        }
        Ok(())
    }
}

impl HierarchyView for AmrHierarchy {
    fn finest_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    fn level(&self, lev: usize) -> Option<&dyn LevelPhysics> {
        self.levels.get(lev).map(|l| l.as_ref())
    }

    fn geoms(&self) -> &[Geometry] {
        &self.all_geoms[..self.levels.len()]
    }

    fn level_steps(&self) -> &[i64] {
        &self.level_steps
    }

    fn ref_ratios(&self) -> &[IntVect] {
        &self.all_ratios[..self.levels.len().saturating_sub(1)]
    }

    fn dt_level(&self) -> &[f64] {
        &self.dt_level
    }

    fn cum_time(&self) -> f64 {
        self.cum_time
    }

    fn eb(&self) -> Option<&EbIndexSpace> {
        self.eb.as_ref()
    }

    fn arena(&self) -> &FabArena {
        &self.arena
    }
}

impl std::fmt::Debug for AmrHierarchy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AmrHierarchy")
            .field("finest_level", &self.finest_level())
            .field("level_steps", &self.level_steps)
            .field("cum_time", &self.cum_time)
            .field("dt_level", &self.dt_level)
            .field("restart_step", &self.restart_step)
            .finish_non_exhaustive()
    }
}
