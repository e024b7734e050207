//! Test utilities and mock types for Strata development.
//!
//! Provides a mock level physics ([`MockLevel`], built by [`MockBuilder`])
//! whose state values encode where they came from, and a
//! [`RecordingWriter`] that captures dataset requests in memory and only
//! creates each dataset's directory and an empty `Header`.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

use strata_amr::{AmrError, LevelBuilder, LevelContext, LevelPhysics};
use strata_comm::Communicator;
use strata_core::{DeriveList, DeriveRec, DescriptorList, IndexType, StateDescriptor, StateTypeId};
use strata_grid::{BoxArray, DistributionMapping, FabArena, Geometry, MultiFab};
use strata_plotfile::{DatasetWriter, PlotRequest, PlotfileError, WriteSummary, HEADER_FILE, VFRAC_NAME};

/// Value a [`MockLevel`] stores in component `comp` of state type `ty`
/// on level `level`.
pub fn state_value(level: usize, ty: StateTypeId, comp: usize) -> f64 {
    (1000 * level + 100 * ty.index() + comp) as f64
}

/// Value a [`MockLevel`] derives for component `comp` of the derived
/// quantity registered at position `index`.
pub fn derive_value(level: usize, index: usize, comp: usize) -> f64 {
    -((1000 * level + 100 * index + comp) as f64) - 1.0
}

// ── Registries ────────────────────────────────────────────────────

/// `State` (cell: `density`, `temp`) and `Nodal` (node: `phi_nd`).
pub fn standard_descriptors() -> DescriptorList {
    let mut list = DescriptorList::new();
    list.add(StateDescriptor::new("State", IndexType::Cell, 1, ["density", "temp"]));
    list.add(StateDescriptor::new("Nodal", IndexType::Node, 0, ["phi_nd"]));
    list
}

/// `magvel` (one component) and `velocity` (`u`, `v`, `w`).
pub fn standard_derives() -> DeriveList {
    let mut list = DeriveList::new();
    list.add(DeriveRec::scalar("magvel"));
    list.add(DeriveRec::new("velocity", ["u", "v", "w"]));
    list
}

/// [`standard_descriptors`] with a third cell component, `pressure`.
pub fn extended_descriptors() -> DescriptorList {
    let mut list = DescriptorList::new();
    list.add(StateDescriptor::new("State", IndexType::Cell, 1, ["density", "temp", "pressure"]));
    list.add(StateDescriptor::new("Nodal", IndexType::Node, 0, ["phi_nd"]));
    list
}

/// Only node-centered state and no derived quantities: nothing plottable.
pub fn unplottable_descriptors() -> DescriptorList {
    let mut list = DescriptorList::new();
    list.add(StateDescriptor::new("Nodal", IndexType::Node, 0, ["phi_nd"]));
    list
}

// ── MockBuilder ───────────────────────────────────────────────────

/// Builds [`MockLevel`]s sharing one advance counter, and counts its
/// own builds and the `init_data` calls of what it built.
#[derive(Clone, Debug)]
pub struct MockBuilder {
    pub descriptors: DescriptorList,
    pub derives: DeriveList,
    /// Time step every level estimates.
    pub dt: f64,
    /// Fail the advance call with this 1-based index, counted over all
    /// levels.
    pub fail_on_advance: Option<usize>,
    /// `ok_to_continue` turns false after this many advances.
    pub stop_after: Option<usize>,
    /// Registry used from this level upward instead of `descriptors`.
    pub fine_descriptors: Option<(usize, DescriptorList)>,
    pub advances: Arc<Mutex<usize>>,
    pub builds: Arc<Mutex<usize>>,
    pub inits: Arc<Mutex<usize>>,
}

impl MockBuilder {
    pub fn standard() -> Self {
        Self {
            descriptors: standard_descriptors(),
            derives: standard_derives(),
            dt: 0.1,
            fail_on_advance: None,
            stop_after: None,
            fine_descriptors: None,
            advances: Arc::new(Mutex::new(0)),
            builds: Arc::new(Mutex::new(0)),
            inits: Arc::new(Mutex::new(0)),
        }
    }

    pub fn unplottable() -> Self {
        Self {
            descriptors: unplottable_descriptors(),
            derives: DeriveList::new(),
            ..Self::standard()
        }
    }

    pub fn with_dt(mut self, dt: f64) -> Self {
        self.dt = dt;
        self
    }

    pub fn failing_on(mut self, advance: usize) -> Self {
        self.fail_on_advance = Some(advance);
        self
    }

    pub fn stopping_after(mut self, advances: usize) -> Self {
        self.stop_after = Some(advances);
        self
    }

    /// Levels from `level` upward register `descriptors` instead.
    pub fn with_fine_descriptors(mut self, level: usize, descriptors: DescriptorList) -> Self {
        self.fine_descriptors = Some((level, descriptors));
        self
    }

    /// Advance calls made so far by every level built.
    pub fn advance_count(&self) -> usize {
        *lock(&self.advances)
    }

    /// Levels built so far.
    pub fn build_count(&self) -> usize {
        *lock(&self.builds)
    }

    /// `init_data` calls made so far by every level built.
    pub fn init_count(&self) -> usize {
        *lock(&self.inits)
    }

    fn descriptors_for(&self, level: usize) -> &DescriptorList {
        match &self.fine_descriptors {
            Some((from, list)) if level >= *from => list,
            _ => &self.descriptors,
        }
    }
}

impl LevelBuilder for MockBuilder {
    fn descriptors(&self) -> DescriptorList {
        self.descriptors.clone()
    }

    fn derives(&self) -> DeriveList {
        self.derives.clone()
    }

    fn build(
        &self,
        level: usize,
        geom: &Geometry,
        ba: &BoxArray,
        dm: &DistributionMapping,
        ctx: &LevelContext<'_>,
    ) -> Result<Box<dyn LevelPhysics>, AmrError> {
        *lock(&self.builds) += 1;
        let descriptors = self.descriptors_for(level).clone();
        let mut states = Vec::new();
        for (_, desc) in descriptors.iter() {
            let ba = ba.convert(desc.index_type());
            let ngrow = desc.ngrow().max(ctx.ngrow);
            states.push(MultiFab::new(ba, dm.clone(), desc.ncomp(), ngrow, ctx.rank, ctx.arena)?);
        }
        Ok(Box::new(MockLevel {
            level,
            geom: geom.clone(),
            ba: ba.clone(),
            dm: dm.clone(),
            rank: ctx.rank,
            arena: ctx.arena.clone(),
            ngrow: ctx.ngrow,
            descriptors,
            derives: self.derives.clone(),
            states,
            time: 0.0,
            dt: self.dt,
            fail_on_advance: self.fail_on_advance,
            stop_after: self.stop_after,
            advances: Arc::clone(&self.advances),
            inits: Arc::clone(&self.inits),
        }))
    }
}

// ── MockLevel ─────────────────────────────────────────────────────

/// Level physics whose every state value is [`state_value`] and whose
/// derived values are [`derive_value`].
#[derive(Debug)]
pub struct MockLevel {
    level: usize,
    geom: Geometry,
    ba: BoxArray,
    dm: DistributionMapping,
    rank: usize,
    arena: FabArena,
    pub ngrow: usize,
    descriptors: DescriptorList,
    derives: DeriveList,
    states: Vec<MultiFab>,
    time: f64,
    dt: f64,
    fail_on_advance: Option<usize>,
    stop_after: Option<usize>,
    advances: Arc<Mutex<usize>>,
    inits: Arc<Mutex<usize>>,
}

impl LevelPhysics for MockLevel {
    fn level(&self) -> usize {
        self.level
    }

    fn geom(&self) -> &Geometry {
        &self.geom
    }

    fn box_array(&self) -> &BoxArray {
        &self.ba
    }

    fn distribution_map(&self) -> &DistributionMapping {
        &self.dm
    }

    fn descriptors(&self) -> &DescriptorList {
        &self.descriptors
    }

    fn derives(&self) -> &DeriveList {
        &self.derives
    }

    fn state(&self, ty: StateTypeId) -> Option<&MultiFab> {
        self.states.get(ty.index())
    }

    fn state_time(&self, ty: StateTypeId) -> Option<f64> {
        (ty.index() < self.states.len()).then_some(self.time)
    }

    fn init_data(&mut self, time: f64) -> Result<(), AmrError> {
        *lock(&self.inits) += 1;
        for (t, mf) in self.states.iter_mut().enumerate() {
            let ty = StateTypeId(t as u32);
            for (_, fab) in mf.iter_mut() {
                for comp in 0..fab.ncomp() {
                    fab.comp_mut(comp).fill(state_value(self.level, ty, comp));
                }
            }
        }
        self.time = time;
        Ok(())
    }

    fn advance(&mut self, time: f64, dt: f64, _iteration: usize, _ncycle: usize) -> Result<f64, AmrError> {
        let n = {
            let mut count = lock(&self.advances);
            *count += 1;
            *count
        };
        if self.fail_on_advance == Some(n) {
            return Err(AmrError::level(self.level, format!("advance {n} failed")));
        }
        self.time = time + dt;
        Ok(self.dt / f64::from(2u32.pow(self.level as u32)))
    }

    fn est_time_step(&self) -> f64 {
        self.dt / f64::from(2u32.pow(self.level as u32))
    }

    fn derive(&self, name: &str, _time: f64, ngrow: usize) -> Result<MultiFab, AmrError> {
        let (index, rec) = self
            .derives
            .iter()
            .enumerate()
            .find(|(_, r)| r.name() == name)
            .ok_or_else(|| AmrError::UnknownDerive { name: name.into() })?;
        let mut out = MultiFab::new(
            self.ba.clone(),
            self.dm.clone(),
            rec.num_derive(),
            ngrow,
            self.rank,
            &self.arena,
        )?;
        for (_, fab) in out.iter_mut() {
            for comp in 0..fab.ncomp() {
                fab.comp_mut(comp).fill(derive_value(self.level, index, comp));
            }
        }
        Ok(out)
    }

    fn ok_to_continue(&self) -> bool {
        self.stop_after.map_or(true, |n| *lock(&self.advances) < n)
    }

    fn restore_state(&mut self, ty: StateTypeId, data: MultiFab, time: f64) -> Result<(), AmrError> {
        let level = self.level;
        let slot = self
            .states
            .get_mut(ty.index())
            .ok_or(AmrError::UnknownStateType { level, ty })?;
        *slot = data;
        self.time = time;
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

// ── RecordingWriter ───────────────────────────────────────────────

/// What one [`DatasetWriter::write`] call received.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedWrite {
    pub dir: PathBuf,
    pub var_names: Vec<String>,
    /// Component count of each level's field.
    pub ncomp: Vec<usize>,
    /// Ghost width of each level's field.
    pub ngrow: Vec<usize>,
    /// `(min, max)` of every component over this rank's boxes, per level.
    pub ranges: Vec<Vec<Option<(f64, f64)>>>,
    pub time: f64,
    pub level_steps: Vec<i64>,
    pub cut_cell_variant: bool,
}

/// Captures dataset requests. On the coordinator it creates the dataset
/// directory and an empty `Header`, so post-write hooks can append to it.
#[derive(Clone, Debug, Default)]
pub struct RecordingWriter {
    writes: Arc<Mutex<Vec<RecordedWrite>>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every write so far, oldest first.
    pub fn writes(&self) -> Vec<RecordedWrite> {
        lock(&self.writes).clone()
    }

    /// Writes whose directory name starts with `root`.
    pub fn writes_under(&self, root: &str) -> Vec<RecordedWrite> {
        self.writes()
            .into_iter()
            .filter(|w| w.dir.to_string_lossy().starts_with(root))
            .collect()
    }
}

impl DatasetWriter for RecordingWriter {
    fn write(&self, request: &PlotRequest<'_>, comm: &dyn Communicator) -> Result<WriteSummary, PlotfileError> {
        request.validate()?;
        if comm.is_coordinator() {
            let header = request.dir.join(HEADER_FILE);
            fs::create_dir_all(request.dir)
                .and_then(|()| fs::write(&header, ""))
                .map_err(|e| PlotfileError::MetadataOpen {
                    path: header.display().to_string(),
                    reason: e.to_string(),
                })?;
        }
        let cut_cell_variant = request.eb.is_some_and(|eb| eb.has_cut_cells());
        let mut var_names = request.var_names.to_vec();
        if cut_cell_variant {
            var_names.push(VFRAC_NAME.to_string());
        }
        let record = RecordedWrite {
            dir: request.dir.to_path_buf(),
            var_names: var_names.clone(),
            ncomp: request.levels.iter().map(|mf| mf.ncomp()).collect(),
            ngrow: request.levels.iter().map(|mf| mf.ngrow()).collect(),
            ranges: request
                .levels
                .iter()
                .map(|mf| (0..mf.ncomp()).map(|c| mf.local_min_max(c)).collect())
                .collect(),
            time: request.time,
            level_steps: request.level_steps.to_vec(),
            cut_cell_variant,
        };
        lock(&self.writes).push(record);
        Ok(WriteSummary {
            dir: request.dir.to_path_buf(),
            var_names,
            nlevels: request.levels.len(),
            cut_cell_variant,
            bytes_written: 0,
        })
    }
}
