//! The output sink the hierarchy reports scheduled events to.

use std::path::PathBuf;

use strata_amr::{AmrConfig, HierarchyView, OutputSink};
use strata_comm::Communicator;
use strata_core::{PlotKind, RunError};
use strata_plotfile::DatasetWriter;

use crate::checkpoint::Checkpointer;
use crate::composer::{ComposerConfig, PlotComposer};

/// Routes plot and checkpoint events through one writer.
#[derive(Debug)]
pub struct OutputManager<W> {
    composer: PlotComposer,
    checkpointer: Checkpointer,
    writer: W,
}

impl<W: DatasetWriter> OutputManager<W> {
    /// Output configured by `config`, written through `writer`.
    pub fn new(config: &AmrConfig, writer: W) -> Self {
        Self {
            composer: PlotComposer::new(ComposerConfig::from_amr(config)),
            checkpointer: Checkpointer::new(config),
            writer,
        }
    }

    /// The plot composer.
    pub fn composer(&self) -> &PlotComposer {
        &self.composer
    }

    /// The checkpointer.
    pub fn checkpointer(&self) -> &Checkpointer {
        &self.checkpointer
    }

    /// Mutable access to the checkpointer.
    pub fn checkpointer_mut(&mut self) -> &mut Checkpointer {
        &mut self.checkpointer
    }

    /// The writer.
    pub fn writer(&self) -> &W {
        &self.writer
    }

    /// Write a checkpoint and a full plot of the terminal state unless
    /// the last of each already covers the current step. Returns the
    /// directories this call wrote.
    pub fn flush_final(
        &mut self,
        hierarchy: &dyn HierarchyView,
        comm: &dyn Communicator,
    ) -> Result<(Option<PathBuf>, Option<PathBuf>), RunError> {
        let step = hierarchy.coarse_step();
        let behind = |last: Option<i64>| last.map_or(true, |s| s < step);
        let mut checkpoint = None;
        if behind(self.checkpointer.last_step()) {
            checkpoint = self.checkpointer.checkpoint(hierarchy, &self.writer, comm)?;
        }
        let mut plot = None;
        if behind(self.composer.last_step(PlotKind::Full)) {
            plot = self.composer.compose(PlotKind::Full, hierarchy, &self.writer, comm)?;
        }
        Ok((checkpoint, plot))
    }
}

impl<W: DatasetWriter> OutputSink for OutputManager<W> {
    fn write_plot(
        &mut self,
        hierarchy: &dyn HierarchyView,
        kind: PlotKind,
        comm: &dyn Communicator,
    ) -> Result<(), RunError> {
        self.composer.compose(kind, hierarchy, &self.writer, comm).map(drop)
    }

    fn checkpoint(&mut self, hierarchy: &dyn HierarchyView, comm: &dyn Communicator) -> Result<(), RunError> {
        self.checkpointer.checkpoint(hierarchy, &self.writer, comm).map(drop)
    }
}
