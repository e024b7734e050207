//! Checkpoint output.

use std::path::{Path, PathBuf};
use std::time::Instant;

use strata_amr::{AmrConfig, HierarchyView};
use strata_comm::Communicator;
use strata_core::RunError;
use strata_grid::MultiFab;
use strata_plotfile::{concatenate, state_dir, write_checkpoint_header, CheckpointHeader, DatasetWriter, PlotRequest};
use tracing::info;

use crate::sync::coordinator_outcome;

/// Writes checkpoints: every component of every state type on every
/// level, one dataset per state type, plus a top-level `Header` with
/// the clocks needed to resume.
#[derive(Clone, Debug)]
pub struct Checkpointer {
    check_file: String,
    file_name_digits: usize,
    enabled: bool,
    verbose: bool,
    last_checkpoint_step: Option<i64>,
    last_dir: Option<PathBuf>,
}

impl Checkpointer {
    /// A checkpointer using the `amr.*` checkpoint parameters.
    pub fn new(config: &AmrConfig) -> Self {
        Self {
            check_file: config.check_file.clone(),
            file_name_digits: config.file_name_digits,
            enabled: config.checkpoint_files_output,
            verbose: config.verbose > 0,
            last_checkpoint_step: None,
            last_dir: None,
        }
    }

    /// Step of the last checkpoint written or restarted from.
    pub fn last_step(&self) -> Option<i64> {
        self.last_checkpoint_step
    }

    /// Directory of the last checkpoint written or restarted from.
    pub fn last_dir(&self) -> Option<&Path> {
        self.last_dir.as_deref()
    }

    /// Record that the run resumed from checkpoint `dir` at `step`.
    pub fn note_restart(&mut self, step: i64, dir: PathBuf) {
        self.last_checkpoint_step = Some(step);
        self.last_dir = Some(dir);
    }

    /// Write a checkpoint of the hierarchy's current state. Returns its
    /// directory, or `None` if checkpointing is disabled. Collective.
    pub fn checkpoint(
        &mut self,
        hierarchy: &dyn HierarchyView,
        writer: &dyn DatasetWriter,
        comm: &dyn Communicator,
    ) -> Result<Option<PathBuf>, RunError> {
        if !self.enabled {
            return Ok(None);
        }
        let start = Instant::now();
        let step = hierarchy.coarse_step();
        let dir = PathBuf::from(concatenate(&self.check_file, step, self.file_name_digits));
        let coarse = hierarchy
            .level(0)
            .ok_or_else(|| RunError::collaborator("level hierarchy", "no levels to checkpoint"))?;

        let mut state_types = Vec::new();
        for (ty, desc) in coarse.descriptors().iter() {
            let mut levels: Vec<&MultiFab> = Vec::with_capacity(hierarchy.finest_level() + 1);
            for lev in 0..=hierarchy.finest_level() {
                let state = hierarchy.level(lev).and_then(|l| l.state(ty)).ok_or_else(|| {
                    RunError::collaborator(
                        "level registry",
                        format!("level {lev} has no state type '{}'", desc.name()),
                    )
                })?;
                levels.push(state);
            }
            let time = coarse.state_time(ty).unwrap_or_else(|| hierarchy.cum_time());
            let request = PlotRequest {
                dir: &state_dir(&dir, desc.name()),
                levels: &levels,
                var_names: desc.comp_names(),
                geoms: hierarchy.geoms(),
                time,
                level_steps: hierarchy.level_steps(),
                ref_ratios: hierarchy.ref_ratios(),
                eb: None,
            };
            writer.write(&request, comm)?;
            state_types.push(desc.name().to_string());
        }

        let header = comm.is_coordinator().then(|| {
            write_checkpoint_header(
                &dir,
                &CheckpointHeader {
                    finest_level: hierarchy.finest_level(),
                    cum_time: hierarchy.cum_time(),
                    level_steps: hierarchy.level_steps().to_vec(),
                    dt_level: hierarchy.dt_level().to_vec(),
                    state_types,
                },
            )
            .map_err(RunError::from)
        });
        coordinator_outcome(comm, header)?;

        self.last_checkpoint_step = Some(step);
        self.last_dir = Some(dir.clone());
        if comm.is_coordinator() {
            info!("CHECKPOINT: file = {}", dir.display());
        }
        if self.verbose {
            if let Some(secs) = comm.reduce_max_f64(start.elapsed().as_secs_f64())? {
                info!("checkPoint() time = {secs} secs.");
            }
        }
        Ok(Some(dir))
    }
}
