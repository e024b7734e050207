//! The writer seam: what a dataset write receives and returns.

use std::path::{Path, PathBuf};

use strata_comm::Communicator;
use strata_core::IntVect;
use strata_eb::EbIndexSpace;
use strata_grid::{Geometry, MultiFab};

use crate::error::PlotfileError;

/// Encoding of the dataset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HeaderFormat {
    /// Text headers and raw binary data blocks.
    #[default]
    Native,
    /// HDF5 container. Not implemented.
    Hdf5,
}

/// Everything needed to write one multi-level dataset.
#[derive(Clone, Copy, Debug)]
pub struct PlotRequest<'a> {
    /// Output directory.
    pub dir: &'a Path,
    /// One field per level, coarsest first.
    pub levels: &'a [&'a MultiFab],
    /// Component names, shared by every level.
    pub var_names: &'a [String],
    /// Geometry per level.
    pub geoms: &'a [Geometry],
    /// Reference time of the dataset.
    pub time: f64,
    /// Step counter per level.
    pub level_steps: &'a [i64],
    /// Refinement ratio between level `l` and `l + 1`.
    pub ref_ratios: &'a [IntVect],
    /// Embedded-boundary geometry, if one is active.
    pub eb: Option<&'a EbIndexSpace>,
}

impl PlotRequest<'_> {
    /// Index of the finest level in the request.
    pub fn finest_level(&self) -> usize {
        self.levels.len().saturating_sub(1)
    }

    /// Check that every per-level slice agrees with `levels` and that the
    /// name list matches the component count.
    pub fn validate(&self) -> Result<(), PlotfileError> {
        let nlevels = self.levels.len();
        if nlevels == 0 {
            return Err(PlotfileError::Request {
                detail: "no levels".into(),
            });
        }
        if self.geoms.len() != nlevels || self.level_steps.len() != nlevels {
            return Err(PlotfileError::Request {
                detail: format!(
                    "{nlevels} levels but {} geometries and {} step counters",
                    self.geoms.len(),
                    self.level_steps.len()
                ),
            });
        }
        if self.ref_ratios.len() + 1 < nlevels {
            return Err(PlotfileError::Request {
                detail: format!("{nlevels} levels need {} refinement ratios", nlevels - 1),
            });
        }
        for (l, mf) in self.levels.iter().enumerate() {
            if mf.ncomp() != self.var_names.len() {
                return Err(PlotfileError::Request {
                    detail: format!(
                        "level {l} has {} components but {} names",
                        mf.ncomp(),
                        self.var_names.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// What a completed write produced.
#[derive(Clone, Debug, PartialEq)]
pub struct WriteSummary {
    /// Dataset directory.
    pub dir: PathBuf,
    /// Names written to the header, including any appended by the writer.
    pub var_names: Vec<String>,
    /// Number of levels written.
    pub nlevels: usize,
    /// `true` if cut-cell volume fractions were appended.
    pub cut_cell_variant: bool,
    /// Data bytes written by this rank.
    pub bytes_written: u64,
}

/// Serializes a multi-level dataset.
///
/// Collective: every rank calls `write` with the same request shape and
/// every rank returns the same success or failure.
pub trait DatasetWriter {
    /// Write `request` to `request.dir`.
    fn write(
        &self,
        request: &PlotRequest<'_>,
        comm: &dyn Communicator,
    ) -> Result<WriteSummary, PlotfileError>;
}
