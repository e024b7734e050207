//! Assembling plot datasets from the hierarchy.
//!
//! A plot dataset holds, per level, one ghost-free field whose components
//! are the selected state components (in registry order) followed by the
//! components of every selected derived quantity. Both plot flavors run
//! through [`PlotComposer::compose`]; [`PlotKind`] picks the filter, the
//! output root, and whether derived quantities are included.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use strata_amr::{AmrConfig, HierarchyView, LevelPhysics};
use strata_comm::Communicator;
use strata_core::{IndexType, PlotKind, RunError, StateTypeId, VarSet};
use strata_grid::MultiFab;
use strata_plotfile::{append_header, concatenate, DatasetWriter, PlotRequest};
use tracing::info;

use crate::sync::coordinator_outcome;

// ── Selection ──────────────────────────────────────────────────────

/// The variables one plot flavor writes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    /// Selected state components as `(state type, component)`, in
    /// registry order.
    pub plot_vars: Vec<(StateTypeId, usize)>,
    /// Selected derived quantities, in registry order. Always empty for
    /// [`PlotKind::Small`].
    pub derive_names: Vec<String>,
}

impl Selection {
    /// Resolve the selection against `level`'s registries.
    ///
    /// A state component is selected if its type is cell-centered and
    /// `plot` passes its name. Derived quantities are considered for
    /// [`PlotKind::Full`] only and must be cell-centered and pass
    /// `derive`.
    pub fn resolve(kind: PlotKind, level: &dyn LevelPhysics, plot: &VarSet, derive: &VarSet) -> Self {
        let plot_vars = level
            .descriptors()
            .iter()
            .filter(|(_, desc)| desc.index_type() == IndexType::Cell)
            .flat_map(|(ty, desc)| {
                desc.comp_names()
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| plot.contains(name))
                    .map(move |(comp, _)| (ty, comp))
            })
            .collect();
        let derive_names = if kind.is_regular() {
            level
                .derives()
                .iter()
                .filter(|rec| rec.index_type() == IndexType::Cell && derive.contains(rec.name()))
                .map(|rec| rec.name().to_string())
                .collect()
        } else {
            Vec::new()
        };
        Self {
            plot_vars,
            derive_names,
        }
    }

    /// `true` if nothing would be written.
    pub fn is_empty(&self) -> bool {
        self.plot_vars.is_empty() && self.derive_names.is_empty()
    }

    /// Component names of the dataset, matching its component order.
    pub fn var_names(&self, level: &dyn LevelPhysics) -> Result<Vec<String>, RunError> {
        let mut names = Vec::with_capacity(self.plot_vars.len());
        for &(ty, comp) in &self.plot_vars {
            let name = level
                .descriptors()
                .get(ty)
                .and_then(|d| d.comp_name(comp))
                .ok_or_else(|| missing(level.level(), format!("state type {ty} component {comp}")))?;
            names.push(name.to_string());
        }
        for derive in &self.derive_names {
            let rec = level
                .derives()
                .get(derive)
                .ok_or_else(|| missing(level.level(), format!("derived quantity '{derive}'")))?;
            names.extend(rec.variable_names().iter().cloned());
        }
        Ok(names)
    }
}

fn missing(level: usize, what: String) -> RunError {
    RunError::collaborator("level registry", format!("level {level} has no {what}"))
}

// ── ComposerConfig ─────────────────────────────────────────────────

/// The output parameters the composer reads.
#[derive(Clone, Debug, PartialEq)]
pub struct ComposerConfig {
    /// Root of full plot directory names.
    pub plot_file: String,
    /// Root of small plot directory names.
    pub small_plot_file: String,
    /// Minimum digits of the step in directory names.
    pub file_name_digits: usize,
    /// `false` disables plot output altogether.
    pub enabled: bool,
    /// State components for full plots.
    pub plot_vars: VarSet,
    /// State components for small plots.
    pub small_plot_vars: VarSet,
    /// Derived quantities for full plots.
    pub derive_plot_vars: VarSet,
    /// Announce each dataset before writing it and report write timings.
    pub verbose: bool,
}

impl ComposerConfig {
    /// Read the plot parameters of `config`.
    pub fn from_amr(config: &AmrConfig) -> Self {
        Self {
            plot_file: config.plot_file.clone(),
            small_plot_file: config.small_plot_file.clone(),
            file_name_digits: config.file_name_digits,
            enabled: config.plot_files_output,
            plot_vars: config.plot_var_set(),
            small_plot_vars: config.small_plot_var_set(),
            derive_plot_vars: config.derive_var_set(),
            verbose: config.verbose > 0,
        }
    }

    fn root(&self, kind: PlotKind) -> &str {
        match kind {
            PlotKind::Full => &self.plot_file,
            PlotKind::Small => &self.small_plot_file,
        }
    }

    fn filter(&self, kind: PlotKind) -> &VarSet {
        match kind {
            PlotKind::Full => &self.plot_vars,
            PlotKind::Small => &self.small_plot_vars,
        }
    }
}

// ── PlotComposer ───────────────────────────────────────────────────

/// Writes full and small plot datasets.
///
/// Each flavor's [`Selection`] is resolved on its first `compose` call
/// against the finest level existing then, and reused for the rest of
/// the run.
#[derive(Clone, Debug)]
pub struct PlotComposer {
    config: ComposerConfig,
    full: Option<Selection>,
    small: Option<Selection>,
    last_plot_step: Option<i64>,
    last_small_plot_step: Option<i64>,
    last_dirs: [Option<PathBuf>; 2],
}

impl PlotComposer {
    /// A composer that has not resolved anything yet.
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            config,
            full: None,
            small: None,
            last_plot_step: None,
            last_small_plot_step: None,
            last_dirs: [None, None],
        }
    }

    /// The configuration.
    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    /// The memoized selection of `kind`, if resolved.
    pub fn selection(&self, kind: PlotKind) -> Option<&Selection> {
        match kind {
            PlotKind::Full => self.full.as_ref(),
            PlotKind::Small => self.small.as_ref(),
        }
    }

    /// Step of the last dataset written for `kind`.
    pub fn last_step(&self, kind: PlotKind) -> Option<i64> {
        match kind {
            PlotKind::Full => self.last_plot_step,
            PlotKind::Small => self.last_small_plot_step,
        }
    }

    /// Directory of the last dataset written for `kind`.
    pub fn last_dir(&self, kind: PlotKind) -> Option<&Path> {
        self.last_dirs[usize::from(!kind.is_regular())].as_deref()
    }

    /// Write a `kind` dataset for the hierarchy's current state.
    ///
    /// Returns the dataset directory, or `None` if plotting is disabled
    /// or nothing is selected; in that case no directory is created.
    /// Collective.
    pub fn compose(
        &mut self,
        kind: PlotKind,
        hierarchy: &dyn HierarchyView,
        writer: &dyn DatasetWriter,
        comm: &dyn Communicator,
    ) -> Result<Option<PathBuf>, RunError> {
        if !self.config.enabled {
            return Ok(None);
        }
        let selection = self.resolve(kind, hierarchy)?.clone();
        if selection.is_empty() {
            return Ok(None);
        }
        let start = Instant::now();
        let step = hierarchy.coarse_step();
        let dir = PathBuf::from(concatenate(
            self.config.root(kind),
            step,
            self.config.file_name_digits,
        ));
        let time = reference_time(hierarchy);
        if self.config.verbose && comm.is_coordinator() {
            info!("{}", announce_line(kind, &dir));
        }

        let finest = hierarchy.finest_level();
        let mut datasets = Vec::with_capacity(finest + 1);
        let mut names = Vec::new();
        for lev in 0..=finest {
            let level = level_at(hierarchy, lev)?;
            let level_names = selection.var_names(level)?;
            datasets.push(build_dataset(level, &selection, level_names.len(), time, hierarchy, comm)?);
            if lev == 0 {
                names = level_names;
            } else if level_names != names {
                return Err(RunError::collaborator(
                    "level registry",
                    format!("level {lev} names its plot variables differently from level 0"),
                ));
            }
        }

        let refs: Vec<&MultiFab> = datasets.iter().collect();
        let request = PlotRequest {
            dir: &dir,
            levels: &refs,
            var_names: &names,
            geoms: hierarchy.geoms(),
            time,
            level_steps: hierarchy.level_steps(),
            ref_ratios: hierarchy.ref_ratios(),
            eb: hierarchy.eb(),
        };
        let summary = writer.write(&request, comm)?;
        drop(datasets);

        if kind.is_regular() {
            let post = comm
                .is_coordinator()
                .then(|| write_post(hierarchy, &summary.dir));
            coordinator_outcome(comm, post)?;
        }

        match kind {
            PlotKind::Full => self.last_plot_step = Some(step),
            PlotKind::Small => self.last_small_plot_step = Some(step),
        }
        self.last_dirs[usize::from(!kind.is_regular())] = Some(dir.clone());
        if self.config.verbose {
            let elapsed = comm.reduce_max_f64(start.elapsed().as_secs_f64())?;
            if let Some(secs) = elapsed {
                info!("Write {} time = {secs} seconds", kind.noun());
            }
        }
        Ok(Some(dir))
    }

    fn resolve(&mut self, kind: PlotKind, hierarchy: &dyn HierarchyView) -> Result<&Selection, RunError> {
        let slot = match kind {
            PlotKind::Full => &mut self.full,
            PlotKind::Small => &mut self.small,
        };
        if slot.is_none() {
            let finest = level_at(hierarchy, hierarchy.finest_level())?;
            *slot = Some(Selection::resolve(
                kind,
                finest,
                self.config.filter(kind),
                &self.config.derive_plot_vars,
            ));
        }
        slot.as_ref()
            .ok_or_else(|| RunError::collaborator("plot composer", "selection unresolved"))
    }
}

fn level_at(hierarchy: &dyn HierarchyView, lev: usize) -> Result<&dyn LevelPhysics, RunError> {
    hierarchy
        .level(lev)
        .ok_or_else(|| RunError::collaborator("level hierarchy", format!("level {lev} does not exist")))
}

/// Time derived quantities are evaluated at: level 0's state time.
fn reference_time(hierarchy: &dyn HierarchyView) -> f64 {
    hierarchy
        .level(0)
        .and_then(|l| l.descriptors().iter().next().and_then(|(ty, _)| l.state_time(ty)))
        .unwrap_or_else(|| hierarchy.cum_time())
}

fn build_dataset(
    level: &dyn LevelPhysics,
    selection: &Selection,
    ncomp: usize,
    time: f64,
    hierarchy: &dyn HierarchyView,
    comm: &dyn Communicator,
) -> Result<MultiFab, RunError> {
    let lev = level.level();
    let mut out = MultiFab::new(
        level.box_array().clone(),
        level.distribution_map().clone(),
        ncomp,
        0,
        comm.rank(),
        hierarchy.arena(),
    )?;
    let mut cnt = 0;
    for &(ty, comp) in &selection.plot_vars {
        let state = level
            .state(ty)
            .ok_or_else(|| missing(lev, format!("state type {ty}")))?;
        MultiFab::copy(&mut out, state, comp, cnt, 1, 0)?;
        cnt += 1;
    }
    for name in &selection.derive_names {
        let derived = level.derive(name, time, 0)?;
        let n = derived.ncomp();
        MultiFab::copy(&mut out, &derived, 0, cnt, n, 0)?;
        cnt += n;
    }
    if cnt != ncomp {
        return Err(RunError::collaborator(
            "level registry",
            format!("level {lev} produced {cnt} components for {ncomp} names"),
        ));
    }
    Ok(out)
}

fn announce_line(kind: PlotKind, dir: &Path) -> String {
    format!("{}: file = {}", kind.label(), dir.display())
}

/// Run every level's post-plot hook against the dataset's `Header`.
fn write_post(hierarchy: &dyn HierarchyView, dir: &Path) -> Result<(), RunError> {
    let mut header = append_header(dir)?;
    for lev in 0..=hierarchy.finest_level() {
        level_at(hierarchy, lev)?.write_plot_post(dir, &mut header)?;
    }
    header.flush().map_err(|e| RunError::Io {
        path: dir.join(strata_plotfile::HEADER_FILE).display().to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_line_names_kind_and_directory() {
        assert_eq!(
            announce_line(PlotKind::Full, Path::new("plt00040")),
            "PLOTFILE: file = plt00040"
        );
        assert_eq!(
            announce_line(PlotKind::Small, Path::new("out/smallplt00040")),
            "SMALL PLOTFILE: file = out/smallplt00040"
        );
    }
}
