//! The run state machine.

use std::io::BufRead;
use std::path::PathBuf;

use strata_amr::{AmrConfig, AmrHierarchy, HierarchyView, LevelBuilder};
use strata_comm::Communicator;
use strata_core::{PlotKind, RunError};
use strata_eb::EbConfig;
use strata_plotfile::DatasetWriter;
use tracing::{debug, info};

use crate::lifecycle::build_eb;
use crate::output::OutputManager;
use crate::params::RunParams;
use crate::pause::pause_for_debug;
use crate::timing::{log_timestamp, report_heap, RunMark, RunTimer, RunTimings};

/// Where a [`Driver`] is in its run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DriverPhase {
    /// Validating parameters and building the hierarchy.
    Init,
    /// Regridding a restarted state that is already finished.
    RegridOnly,
    /// Taking coarse steps.
    Running,
    /// Flushing the terminal state. Terminal.
    Done,
}

/// What a completed run did.
#[derive(Clone, Debug, PartialEq)]
pub struct RunSummary {
    /// Coarse steps counted at the end, including any before a restart.
    pub steps: i64,
    /// Cumulative simulated time at the end.
    pub final_time: f64,
    /// Plot dataset holding the terminal state, if plotting is enabled
    /// and selects anything.
    pub final_plot: Option<PathBuf>,
    /// Checkpoint holding the terminal state, if checkpointing is enabled.
    pub final_checkpoint: Option<PathBuf>,
    /// Wall-clock timings.
    pub timings: RunTimings,
}

/// Drives one run from parameters to terminal output.
///
/// Every rank of the process group runs its own `Driver` in lockstep;
/// each call that takes a communicator is collective.
pub struct Driver<W> {
    params: RunParams,
    hierarchy: AmrHierarchy,
    output: OutputManager<W>,
    phase: DriverPhase,
    timer: RunTimer,
}

impl<W: DatasetWriter> Driver<W> {
    /// Validate `params`, set up the embedded boundary, and create an
    /// empty hierarchy. No level exists until [`Driver::init`].
    ///
    /// Invalid start or stop parameters fail here, before anything is
    /// built.
    pub fn new(
        params: RunParams,
        amr: AmrConfig,
        eb: &EbConfig,
        builder: Box<dyn LevelBuilder>,
        writer: W,
        comm: &dyn Communicator,
    ) -> Result<Self, RunError> {
        let timer = RunTimer::start();
        params.validate()?;
        let output = OutputManager::new(&amr, writer);
        let mut hierarchy = AmrHierarchy::new(amr, builder, comm.rank(), comm.size())?;
        if let Some(eb) = build_eb(eb, &hierarchy)? {
            hierarchy.attach_eb(eb);
        }
        Ok(Self {
            params,
            hierarchy,
            output,
            phase: DriverPhase::Init,
            timer,
        })
    }

    /// Current phase.
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// The hierarchy.
    pub fn hierarchy(&self) -> &AmrHierarchy {
        &self.hierarchy
    }

    /// The output manager.
    pub fn output(&self) -> &OutputManager<W> {
        &self.output
    }

    /// Run every phase to completion. `pause_input` is read by the
    /// coordinator when `pause_for_debug` is set, before the hierarchy is
    /// built; the wait is not counted in the run time.
    pub fn run(mut self, comm: &dyn Communicator, pause_input: &mut dyn BufRead) -> Result<RunSummary, RunError> {
        if self.params.pause_for_debug {
            pause_for_debug(pause_input, comm)?;
            self.timer = RunTimer::start();
        }
        log_timestamp(comm, RunMark::Start);
        self.init(comm)?;
        self.advance(comm)?;
        self.finish(comm)
    }

    /// Build or restore the hierarchy, then enter
    /// [`DriverPhase::RegridOnly`] if a restarted state asks for it.
    pub fn init(&mut self, comm: &dyn Communicator) -> Result<(), RunError> {
        self.hierarchy
            .init(self.params.strt_time, self.params.stop_time, &mut self.output, comm)?;
        if let Some(step) = self.hierarchy.restart_step() {
            if let Some(dir) = &self.hierarchy.config().restart {
                self.output.checkpointer_mut().note_restart(step, PathBuf::from(dir));
            }
        }
        self.timer.mark_init();

        if self.regrid_only_due() {
            self.phase = DriverPhase::RegridOnly;
            self.hierarchy.regrid_only(self.hierarchy.cum_time(), comm)?;
        }
        self.phase = DriverPhase::Running;
        Ok(())
    }

    /// `true` if `amr.regrid_on_restart` is set and the loaded state
    /// already satisfies the stop condition.
    pub fn regrid_only_due(&self) -> bool {
        self.hierarchy.regrid_on_restart()
            && self
                .params
                .stop_reached(self.hierarchy.coarse_step(), self.hierarchy.cum_time())
    }

    /// Take coarse steps until a limit is reached or the physics stops.
    pub fn advance(&mut self, comm: &dyn Communicator) -> Result<(), RunError> {
        while self.hierarchy.ok_to_continue()
            && self
                .params
                .may_continue(self.hierarchy.coarse_step(), self.hierarchy.cum_time())
        {
            self.hierarchy
                .coarse_time_step(self.params.stop_time, &mut self.output, comm)?;
        }
        if comm.is_coordinator() {
            debug!(
                steps = self.hierarchy.coarse_step(),
                time = self.hierarchy.cum_time(),
                "step loop finished"
            );
        }
        Ok(())
    }

    /// Flush the terminal state, tear the hierarchy down, and report.
    pub fn finish(mut self, comm: &dyn Communicator) -> Result<RunSummary, RunError> {
        self.phase = DriverPhase::Done;
        self.output.flush_final(&self.hierarchy, comm)?;
        let steps = self.hierarchy.coarse_step();
        let final_time = self.hierarchy.cum_time();
        let arena = self.hierarchy.arena().clone();
        let composer = self.output.composer();
        let final_plot = (composer.last_step(PlotKind::Full) == Some(steps))
            .then(|| composer.last_dir(PlotKind::Full).map(PathBuf::from))
            .flatten();
        let checkpointer = self.output.checkpointer();
        let final_checkpoint = (checkpointer.last_step() == Some(steps))
            .then(|| checkpointer.last_dir().map(PathBuf::from))
            .flatten();
        log_timestamp(comm, RunMark::End);
        drop(self.hierarchy);

        let timings = self.timer.finish(comm)?;
        report_heap(&arena, comm)?;
        if comm.is_coordinator() {
            info!(steps, final_time, "run complete");
        }
        Ok(RunSummary {
            steps,
            final_time,
            final_plot,
            final_checkpoint,
            timings,
        })
    }
}

impl<W> std::fmt::Debug for Driver<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Driver")
            .field("phase", &self.phase)
            .field("params", &self.params)
            .field("hierarchy", &self.hierarchy)
            .finish_non_exhaustive()
    }
}
