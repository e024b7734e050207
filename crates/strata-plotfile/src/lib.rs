//! Multi-level plot and checkpoint datasets.
//!
//! A dataset is a directory holding one shared text `Header`, and per
//! level a `Cell_H` box table plus one `Cell_D_<rank>` data file per rank:
//!
//! ```text
//! <dir>/Header
//! <dir>/Level_0/Cell_H
//! <dir>/Level_0/Cell_D_00000
//! <dir>/Level_0/Cell_D_00001
//! <dir>/Level_1/...
//! ```
//!
//! Only the coordinator rank writes `Header` and `Cell_H`; every rank
//! writes its own data file. [`PlotfileWriter`] is the
//! [`DatasetWriter`] used by the driver, and [`read_plotfile`] loads a
//! dataset back for restart and verification.
//!
//! Checkpoints reuse the same layout, one dataset per state type, with an
//! extra top-level [`CheckpointHeader`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod cell_header;
pub mod checkpoint;
pub mod error;
pub mod fab_io;
pub mod header;
pub mod path;
pub mod reader;
pub mod request;
mod wire;
pub mod writer;

pub use cell_header::{CellHeader, FabOnDisk};
pub use checkpoint::{read_checkpoint_header, state_dir, write_checkpoint_header, CheckpointHeader};
pub use error::PlotfileError;
pub use header::{LevelHeader, PlotHeader};
pub use path::{append_header, concatenate, level_dir, HEADER_FILE};
pub use reader::{read_plotfile, LevelData, PlotfileData};
pub use request::{DatasetWriter, HeaderFormat, PlotRequest, WriteSummary};
pub use writer::{PlotfileWriter, VFRAC_NAME};
