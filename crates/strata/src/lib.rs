//! Strata: a time-stepping driver and plot/checkpoint composer for
//! block-structured adaptive mesh refinement.
//!
//! This is the facade crate. It re-exports every sub-crate and ships the
//! `strata` binary, which reads a TOML inputs file plus `key=value`
//! overrides and runs the reference relaxation physics on a thread-backed
//! process group.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use strata::prelude::*;
//!
//! let mut table = ParamTable::new();
//! table.apply_override("max_step=2").unwrap();
//! let config = RunConfig::from_table(&mut table).unwrap();
//! let builder = RelaxationBuilder::new(PhysicsConfig::default());
//! let driver = Driver::new(
//!     config.run,
//!     config.amr,
//!     &config.eb,
//!     Box::new(builder),
//!     PlotfileWriter::new(HeaderFormat::Native),
//!     &SerialComm,
//! )
//! .unwrap();
//! let summary = driver.run(&SerialComm, &mut std::io::empty()).unwrap();
//! assert_eq!(summary.steps, 2);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `strata-core` | Index space, descriptors, variable filters, `RunError` |
//! | [`comm`] | `strata-comm` | `Communicator`, serial and thread-backed groups |
//! | [`grid`] | `strata-grid` | Box arrays, distribution, FABs, `MultiFab` |
//! | [`eb`] | `strata-eb` | Embedded-boundary geometry and volume fractions |
//! | [`plotfile`] | `strata-plotfile` | Dataset and checkpoint layout |
//! | [`amr`] | `strata-amr` | The level hierarchy and its physics seam |
//! | [`engine`] | `strata-engine` | Driver, plot composer, checkpoints, parameters |
//! | [`physics`] | `strata-physics` | Reference relaxation physics |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Index space, descriptors, and the run error taxonomy (`strata-core`).
pub use strata_core as types;

/// Collective operations over a process group (`strata-comm`).
pub use strata_comm as comm;

/// Distributed field storage (`strata-grid`).
pub use strata_grid as grid;

/// Embedded-boundary geometry (`strata-eb`).
pub use strata_eb as eb;

/// On-disk dataset layout (`strata-plotfile`).
pub use strata_plotfile as plotfile;

/// The adaptive level hierarchy (`strata-amr`).
///
/// Implement [`amr::LevelBuilder`] and [`amr::LevelPhysics`] to plug in a
/// solver.
pub use strata_amr as amr;

/// The run driver and output composition (`strata-engine`).
pub use strata_engine as engine;

/// Reference relaxation physics (`strata-physics`).
pub use strata_physics as physics;

/// Common imports for driving a run.
pub mod prelude {
    pub use strata_amr::{AmrConfig, HierarchyView, LevelBuilder, LevelContext, LevelPhysics};
    pub use strata_comm::{Communicator, SerialComm, ThreadGroup};
    pub use strata_core::{PlotKind, RunError, StateTypeId, VarSet};
    pub use strata_eb::EbConfig;
    pub use strata_engine::{
        Driver, DriverPhase, Invocation, ParamTable, RunConfig, RunParams, RunSummary,
    };
    pub use strata_physics::{PhysicsConfig, RelaxationBuilder};
    pub use strata_plotfile::{DatasetWriter, HeaderFormat, PlotfileWriter};
}
