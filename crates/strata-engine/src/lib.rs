//! Time-stepping driver and plot/checkpoint output composer.
//!
//! The [`Driver`] sequences a run through [`DriverPhase::Init`], an
//! optional [`DriverPhase::RegridOnly`] pass, the [`DriverPhase::Running`]
//! step loop, and [`DriverPhase::Done`], where the terminal state is
//! always flushed to a checkpoint and a plot. Output goes through the
//! [`PlotComposer`] and [`Checkpointer`], which assemble per-level
//! datasets from the hierarchy and hand them to a
//! [`DatasetWriter`](strata_plotfile::DatasetWriter).
//!
//! Parameters come from a [`ParamTable`]: a TOML inputs file plus inline
//! `key=value` overrides.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod composer;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod output;
pub mod params;
pub mod pause;
mod sync;
pub mod table;
pub mod timing;

pub use checkpoint::Checkpointer;
pub use composer::{ComposerConfig, PlotComposer, Selection};
pub use driver::{Driver, DriverPhase, RunSummary};
pub use error::ParamError;
pub use lifecycle::{build_eb, header_format, BuildInfo, Invocation, EB_GROW_CELLS, EB_SUPPORT};
pub use output::OutputManager;
pub use params::{ParallelConfig, RunConfig, RunParams};
pub use pause::pause_for_debug;
pub use table::ParamTable;
pub use timing::{log_timestamp, report_heap, RunMark, RunTimer, RunTimings};
