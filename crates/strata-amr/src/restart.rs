//! Rebuilding the hierarchy from a checkpoint.

use std::path::Path;

use strata_comm::Communicator;
use strata_grid::DistributionMapping;
use strata_plotfile::{read_checkpoint_header, read_plotfile, state_dir};
use tracing::info;

use crate::error::AmrError;
use crate::hierarchy::AmrHierarchy;
use crate::refine::level_box_array;
use crate::view::HierarchyView;

impl AmrHierarchy {
    /// Load clocks and state from checkpoint `dir`. Levels finer than
    /// `max_level` in the checkpoint are dropped; state types the
    /// checkpoint lacks keep their initial conditions.
    pub(crate) fn restart(&mut self, dir: &Path, comm: &dyn Communicator) -> Result<(), AmrError> {
        let restart_err = |reason: String| AmrError::Restart {
            path: dir.display().to_string(),
            reason,
        };
        let header = read_checkpoint_header(dir)?;
        let finest = header.finest_level.min(self.config.max_level);
        self.cum_time = header.cum_time;

        for lev in 0..=finest {
            let ba = level_box_array(&self.config, lev)?;
            let dm = DistributionMapping::new(&ba, self.nprocs, self.config.distribution);
            let mut level = self.build_level(lev, &ba, &dm)?;
            level.init_data(header.cum_time)?;
            self.levels.push(level);
        }

        for name in &header.state_types {
            let data = read_plotfile(&state_dir(dir, name))?;
            for lev in 0..=finest {
                let level = &mut self.levels[lev];
                let (ty, ncomp) = level
                    .descriptors()
                    .find(name)
                    .map(|(ty, d)| (ty, d.ncomp()))
                    .ok_or_else(|| restart_err(format!("state type '{name}' is not registered")))?;
                let mut mf = level
                    .state(ty)
                    .cloned()
                    .ok_or(AmrError::UnknownStateType { level: lev, ty })?;
                let saved = data
                    .levels
                    .get(lev)
                    .ok_or_else(|| restart_err(format!("'{name}' has no level {lev}")))?;
                saved.fill(&mut mf, 0, 0, ncomp.min(saved.cell_header.ncomp))?;
                level.restore_state(ty, mf, header.cum_time)?;
            }
        }

        let (Some(steps), Some(dts)) = (header.level_steps.get(..=finest), header.dt_level.get(..=finest)) else {
            return Err(restart_err(format!("header lacks clocks for {} levels", finest + 1)));
        };
        self.level_steps = steps.to_vec();
        self.dt_level = dts.to_vec();
        self.dt_estimate = self.dt_level.clone();
        self.restart_step = Some(self.level_steps[0]);
        if comm.is_coordinator() {
            info!(
                checkpoint = %dir.display(),
                step = self.level_steps[0],
                time = self.cum_time,
                finest_level = self.finest_level(),
                "restarted"
            );
        }
        Ok(())
    }
}
