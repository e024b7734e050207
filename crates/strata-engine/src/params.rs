//! Run parameters and the bundle of every subsystem's configuration.

use serde::Deserialize;
use strata_amr::AmrConfig;
use strata_core::RunError;
use strata_eb::EbConfig;

use crate::error::ParamError;
use crate::table::ParamTable;

// ── RunParams ──────────────────────────────────────────────────────

/// Top-level parameters controlling when the run stops.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunParams {
    /// Coarse steps to take; negative means unlimited.
    pub max_step: i64,
    /// Simulated time at which the run starts. Must be non-negative.
    pub strt_time: f64,
    /// Simulated time at which the run stops; negative means unlimited.
    pub stop_time: f64,
    /// Block on the coordinator for a line of input before initialization.
    pub pause_for_debug: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            max_step: -1,
            strt_time: 0.0,
            stop_time: -1.0,
            pause_for_debug: false,
        }
    }
}

impl RunParams {
    /// Read the top-level keys of `table`.
    pub fn from_table(table: &ParamTable) -> Result<Self, ParamError> {
        let d = Self::default();
        Ok(Self {
            max_step: table.query_or("max_step", d.max_step)?,
            strt_time: table.query_or("strt_time", d.strt_time)?,
            stop_time: table.query_or("stop_time", d.stop_time)?,
            pause_for_debug: table.query_or("pause_for_debug", d.pause_for_debug)?,
        })
    }

    /// Check that the run can start and can stop.
    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.strt_time >= 0.0) {
            return Err(ParamError::invalid(
                "strt_time",
                format!("must be non-negative, got {}", self.strt_time),
            ));
        }
        if self.max_step < 0 && self.stop_time < 0.0 {
            return Err(ParamError::invalid(
                "max_step",
                "exiting because neither max_step nor stop_time is non-negative",
            ));
        }
        Ok(())
    }

    /// `true` once `steps` or `time` has reached a configured limit.
    pub fn stop_reached(&self, steps: i64, time: f64) -> bool {
        (self.max_step >= 0 && steps >= self.max_step) || (self.stop_time >= 0.0 && time >= self.stop_time)
    }

    /// `true` while neither limit has been reached.
    pub fn may_continue(&self, steps: i64, time: f64) -> bool {
        (self.max_step < 0 || steps < self.max_step) && (self.stop_time < 0.0 || time < self.stop_time)
    }
}

// ── ParallelConfig ─────────────────────────────────────────────────

/// `parallel.*` parameters.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Ranks in the process group.
    pub nprocs: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self { nprocs: 1 }
    }
}

impl ParallelConfig {
    /// Check the group size.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.nprocs == 0 {
            return Err(ParamError::invalid("parallel.nprocs", "must be at least 1"));
        }
        Ok(())
    }
}

// ── RunConfig ──────────────────────────────────────────────────────

/// Every configuration the driver reads from a [`ParamTable`].
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Top-level parameters.
    pub run: RunParams,
    /// `amr.*`.
    pub amr: AmrConfig,
    /// `eb2.*`.
    pub eb: EbConfig,
    /// `parallel.*`.
    pub parallel: ParallelConfig,
}

impl RunConfig {
    /// Read every section. `eb2.geom_type` is defaulted to
    /// [`EbConfig::ALL_REGULAR`] first if no source set it.
    pub fn from_table(table: &mut ParamTable) -> Result<Self, RunError> {
        table.add_default("eb2.geom_type", EbConfig::ALL_REGULAR)?;
        let parallel: ParallelConfig = table.section("parallel")?;
        parallel.validate()?;
        Ok(Self {
            run: RunParams::from_table(table)?,
            amr: table.section("amr")?,
            eb: table.section("eb2")?,
            parallel,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn unlimited_run_is_rejected() {
        let p = RunParams::default();
        assert!(matches!(p.validate(), Err(ParamError::Invalid { ref key, .. }) if key == "max_step"));
    }

    #[test]
    fn negative_start_time_is_rejected() {
        let p = RunParams {
            strt_time: -1.0,
            max_step: 5,
            ..RunParams::default()
        };
        let err = p.validate().unwrap_err();
        assert!(matches!(err, ParamError::Invalid { ref key, .. } if key == "strt_time"));
        assert_eq!(RunError::from(err).exit_code(), 2);
    }

    #[test]
    fn either_limit_is_enough() {
        let by_step = RunParams {
            max_step: 0,
            ..RunParams::default()
        };
        let by_time = RunParams {
            stop_time: 1.0,
            ..RunParams::default()
        };
        assert!(by_step.validate().is_ok());
        assert!(by_time.validate().is_ok());
        assert!(!by_step.may_continue(0, 0.0));
        assert!(by_time.may_continue(100, 0.5));
        assert!(by_time.stop_reached(0, 1.0));
    }

    #[test]
    fn geometry_defaults_to_all_regular() {
        let mut table = ParamTable::from_toml("max_step = 1\n", Path::new("in.toml")).unwrap();
        let cfg = RunConfig::from_table(&mut table).unwrap();
        assert_eq!(cfg.eb.geom_type, EbConfig::ALL_REGULAR);
        assert_eq!(cfg.parallel.nprocs, 1);
        assert_eq!(cfg.run.max_step, 1);

        let mut table = ParamTable::new();
        table.apply_override("eb2.geom_type=sphere").unwrap();
        let cfg = RunConfig::from_table(&mut table).unwrap();
        assert_eq!(cfg.eb.geom_type, "sphere");
    }

    #[test]
    fn zero_ranks_is_a_usage_error() {
        let mut table = ParamTable::new();
        table.apply_override("parallel.nprocs=0").unwrap();
        assert!(matches!(RunConfig::from_table(&mut table), Err(RunError::Usage { .. })));
    }
}
