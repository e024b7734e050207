//! The relaxation level and its builder.

use std::f64::consts::TAU;
use std::fs;
use std::io::Write;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use strata_amr::{AmrError, LevelBuilder, LevelContext, LevelPhysics};
use strata_core::{DeriveList, DescriptorList, IndexType, RunError, StateDescriptor, StateTypeId};
use strata_grid::{BoxArray, DistributionMapping, FabArena, Geometry, MultiFab};
use tracing::debug;

use crate::config::PhysicsConfig;
use crate::derive::{self, DENSITY, TEMP, XMOM};

/// ID of the cell-centered state type.
pub const STATE_TYPE: StateTypeId = StateTypeId(0);
/// ID of the node-centered state type.
pub const NODAL_TYPE: StateTypeId = StateTypeId(1);

/// Name of the provenance file written next to level 0 of a plot.
pub const JOB_INFO_FILE: &str = "job_info";

/// Builds [`RelaxationLevel`]s.
#[derive(Clone, Debug)]
pub struct RelaxationBuilder {
    config: PhysicsConfig,
    job_info: Option<String>,
}

impl RelaxationBuilder {
    /// A builder for levels using `config`.
    pub fn new(config: PhysicsConfig) -> Self {
        Self {
            config,
            job_info: None,
        }
    }

    /// Text level 0 writes to `job_info` after every full plot.
    pub fn with_job_info(mut self, text: String) -> Self {
        self.job_info = Some(text);
        self
    }
}

fn descriptor_list() -> DescriptorList {
    let mut list = DescriptorList::new();
    list.add(StateDescriptor::new(
        "State",
        IndexType::Cell,
        1,
        ["density", "xmom", "ymom", "zmom", "temp"],
    ));
    list.add(StateDescriptor::new("Nodal", IndexType::Node, 0, ["phi_nd"]));
    list
}

impl LevelBuilder for RelaxationBuilder {
    fn descriptors(&self) -> DescriptorList {
        descriptor_list()
    }

    fn derives(&self) -> DeriveList {
        derive::derive_list()
    }

    fn build(
        &self,
        level: usize,
        geom: &Geometry,
        ba: &BoxArray,
        dm: &DistributionMapping,
        ctx: &LevelContext<'_>,
    ) -> Result<Box<dyn LevelPhysics>, AmrError> {
        let descriptors = descriptor_list();
        let state_desc = descriptors
            .get(STATE_TYPE)
            .ok_or(AmrError::UnknownStateType { level, ty: STATE_TYPE })?;
        let ngrow = state_desc.ngrow().max(ctx.ngrow);
        let state = MultiFab::new(
            ba.clone(),
            dm.clone(),
            state_desc.ncomp(),
            ngrow,
            ctx.rank,
            ctx.arena,
        )?;
        let nodal = MultiFab::new(ba.convert(IndexType::Node), dm.clone(), 1, 0, ctx.rank, ctx.arena)?;
        let (lo, hi) = (geom.prob_lo(), geom.prob_hi());
        Ok(Box::new(RelaxationLevel {
            level,
            geom: geom.clone(),
            ba: ba.clone(),
            dm: dm.clone(),
            rank: ctx.rank,
            arena: ctx.arena.clone(),
            config: self.config.clone(),
            descriptors,
            derives: derive::derive_list(),
            center: std::array::from_fn(|d| 0.5 * (lo[d] + hi[d])),
            state,
            nodal,
            state_time: 0.0,
            nodal_time: 0.0,
            job_info: (level == 0).then(|| self.job_info.clone()).flatten(),
        }))
    }
}

/// One level of the relaxation model.
#[derive(Debug)]
pub struct RelaxationLevel {
    level: usize,
    geom: Geometry,
    ba: BoxArray,
    dm: DistributionMapping,
    rank: usize,
    arena: FabArena,
    config: PhysicsConfig,
    descriptors: DescriptorList,
    derives: DeriveList,
    center: [f64; 3],
    state: MultiFab,
    nodal: MultiFab,
    state_time: f64,
    nodal_time: f64,
    job_info: Option<String>,
}

impl RelaxationLevel {
    fn nodal_value(&self, x: [f64; 3], time: f64) -> f64 {
        let spatial: f64 = x.iter().map(|xi| (TAU * xi).sin()).product();
        spatial * (-self.config.damping * time).exp()
    }

    fn check_state(&self) -> Result<(), AmrError> {
        for (i, fab) in self.state.iter() {
            if let Some((lo, _)) = fab.min_max(DENSITY, &self.ba.boxes()[i]) {
                if !(lo.is_finite() && lo > 0.0) {
                    return Err(AmrError::level(
                        self.level,
                        format!("density {lo} in box {i} is not positive"),
                    ));
                }
            }
        }
        Ok(())
    }
}

impl LevelPhysics for RelaxationLevel {
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
        match ty {
            STATE_TYPE => Some(&self.state),
            NODAL_TYPE => Some(&self.nodal),
            _ => None,
        }
    }

    fn state_time(&self, ty: StateTypeId) -> Option<f64> {
        match ty {
            STATE_TYPE => Some(self.state_time),
            NODAL_TYPE => Some(self.nodal_time),
            _ => None,
        }
    }

    fn init_data(&mut self, time: f64) -> Result<(), AmrError> {
        let cfg = &self.config;
        for (i, fab) in self.state.iter_mut() {
            let seed = cfg.seed ^ ((self.level as u64) << 32) ^ i as u64;
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            for iv in fab.bx().cells() {
                let rho = cfg.rho0 * (1.0 + cfg.perturbation * (rng.gen::<f64>() - 0.5));
                fab.set(&iv, DENSITY, rho);
                for d in 0..3 {
                    fab.set(&iv, XMOM + d, rho * cfg.velocity[d]);
                }
                fab.set(&iv, TEMP, cfg.t_ambient);
            }
        }
        let values: Vec<(usize, Vec<f64>)> = self
            .nodal
            .iter()
            .map(|(i, fab)| {
                let v = fab
                    .bx()
                    .cells()
                    .map(|iv| self.nodal_value(self.geom.node_position(&iv), time))
                    .collect();
                (i, v)
            })
            .collect();
        for ((_, fab), (_, v)) in self.nodal.iter_mut().zip(values) {
            fab.comp_mut(0).copy_from_slice(&v);
        }
        self.state_time = time;
        self.nodal_time = time;
        Ok(())
    }

    fn advance(&mut self, time: f64, dt: f64, iteration: usize, ncycle: usize) -> Result<f64, AmrError> {
        let relax = (-self.config.relax_rate * dt).exp();
        let damp = (-self.config.damping * dt).exp();
        let cfg = &self.config;
        let geom = &self.geom;
        let center = self.center;
        for (_, fab) in self.state.iter_mut() {
            for iv in fab.bx().cells() {
                let target = cfg.target_temp(geom.cell_center(&iv), center);
                let t = fab.get(&iv, TEMP);
                fab.set(&iv, TEMP, target + (t - target) * relax);
                for d in 0..3 {
                    let m = fab.get(&iv, XMOM + d);
                    fab.set(&iv, XMOM + d, m * damp);
                }
            }
        }
        for (_, fab) in self.nodal.iter_mut() {
            for v in fab.comp_mut(0) {
                *v *= damp;
            }
        }
        self.state_time = time + dt;
        self.nodal_time = time + dt;
        self.check_state()?;
        debug!(level = self.level, iteration, ncycle, time = self.state_time, "advanced");
        Ok(self.est_time_step())
    }

    fn est_time_step(&self) -> f64 {
        let rate = self.config.relax_rate.max(self.config.damping);
        let mut dt = if rate > 0.0 { 1.0 / rate } else { f64::INFINITY };
        let dx = self.geom.cell_size().into_iter().fold(f64::INFINITY, f64::min);
        for (i, fab) in self.state.iter() {
            for iv in self.ba.boxes()[i].cells() {
                let rho = fab.get(&iv, DENSITY);
                let speed = (0..3)
                    .map(|d| (fab.get(&iv, XMOM + d) / rho).abs())
                    .fold(0.0, f64::max);
                if speed > 0.0 {
                    dt = dt.min(dx / speed);
                }
            }
        }
        self.config.cfl * dt
    }

    fn derive(&self, name: &str, _time: f64, ngrow: usize) -> Result<MultiFab, AmrError> {
        let rec = self
            .derives
            .get(name)
            .ok_or_else(|| AmrError::UnknownDerive { name: name.into() })?;
        if ngrow > self.state.ngrow() {
            return Err(AmrError::level(
                self.level,
                format!("'{name}' asked for {ngrow} ghost cells, state has {}", self.state.ngrow()),
            ));
        }
        let mut out = MultiFab::new(
            self.ba.clone(),
            self.dm.clone(),
            rec.num_derive(),
            ngrow,
            self.rank,
            &self.arena,
        )?;
        for ((i, dst), (_, src)) in out.iter_mut().zip(self.state.iter()) {
            let region = self.ba.boxes()[i].grow(ngrow as i32);
            if !derive::fill(name, src, &region, dst) {
                return Err(AmrError::UnknownDerive { name: name.into() });
            }
        }
        Ok(out)
    }

    fn ok_to_continue(&self) -> bool {
        self.state_time.is_finite()
    }

    fn restore_state(&mut self, ty: StateTypeId, data: MultiFab, time: f64) -> Result<(), AmrError> {
        let (slot, slot_time) = match ty {
            STATE_TYPE => (&mut self.state, &mut self.state_time),
            NODAL_TYPE => (&mut self.nodal, &mut self.nodal_time),
            _ => return Err(AmrError::UnknownStateType { level: self.level, ty }),
        };
        if data.box_array() != slot.box_array() || data.ncomp() != slot.ncomp() {
            return Err(AmrError::level(
                self.level,
                format!("restored data for state type {ty} does not match the level layout"),
            ));
        }
        *slot = data;
        *slot_time = time;
        Ok(())
    }

    fn write_plot_post(&self, dir: &Path, _header: &mut dyn Write) -> Result<(), AmrError> {
        let Some(info) = &self.job_info else {
            return Ok(());
        };
        let path = dir.join(JOB_INFO_FILE);
        fs::write(&path, info).map_err(|e| {
            AmrError::Output(RunError::Io {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::{IndexBox, IntVect};
    use strata_grid::{CoordSys, DistributionStrategy};

    fn build(job_info: Option<&str>) -> (Box<dyn LevelPhysics>, FabArena) {
        let arena = FabArena::new();
        let geom = Geometry::new(
            IndexBox::from_extent(IntVect::splat(8)),
            [0.0; 3],
            [1.0; 3],
            CoordSys::Cartesian,
        );
        let ba = BoxArray::from_domain(&geom.domain(), &IntVect::splat(4)).unwrap();
        let dm = DistributionMapping::new(&ba, 1, DistributionStrategy::Knapsack);
        let mut builder = RelaxationBuilder::new(PhysicsConfig::default());
        if let Some(text) = job_info {
            builder = builder.with_job_info(text.into());
        }
        let ctx = LevelContext {
            rank: 0,
            nprocs: 1,
            arena: &arena,
            eb: None,
            ngrow: 2,
        };
        let level = builder.build(0, &geom, &ba, &dm, &ctx).unwrap();
        (level, arena)
    }

    #[test]
    fn eb_grow_cells_widen_state_ghosts() {
        let (level, _arena) = build(None);
        assert_eq!(level.state(STATE_TYPE).unwrap().ngrow(), 2);
        assert_eq!(level.state(NODAL_TYPE).unwrap().ix_type(), IndexType::Node);
        assert!(level.state(StateTypeId(9)).is_none());
    }

    #[test]
    fn advance_relaxes_and_reports_time() {
        let (mut level, _arena) = build(None);
        level.init_data(0.0).unwrap();
        let before = level.state(STATE_TYPE).unwrap().local_min_max(TEMP).unwrap();
        let dt = level.est_time_step();
        assert!(dt > 0.0 && dt.is_finite());
        let next = level.advance(0.0, dt, 1, 1).unwrap();
        assert!(next > 0.0);
        assert_eq!(level.state_time(STATE_TYPE), Some(dt));
        let after = level.state(STATE_TYPE).unwrap().local_min_max(TEMP).unwrap();
        assert!(after.1 > before.1);
    }

    #[test]
    fn derives_match_registered_shapes() {
        let (mut level, _arena) = build(None);
        level.init_data(0.0).unwrap();
        let vel = level.derive("velocity", 0.0, 0).unwrap();
        assert_eq!(vel.ncomp(), 3);
        let (lo, hi) = vel.local_min_max(0).unwrap();
        assert!((lo - 1.0).abs() < 1e-12 && (hi - 1.0).abs() < 1e-12);
        assert!(matches!(
            level.derive("vorticity", 0.0, 0),
            Err(AmrError::UnknownDerive { .. })
        ));
        assert!(level.derive("magvel", 0.0, 5).is_err());
    }

    #[test]
    fn initial_density_is_reproducible() {
        let (mut a, _x) = build(None);
        let (mut b, _y) = build(None);
        a.init_data(0.0).unwrap();
        b.init_data(0.0).unwrap();
        let sa = a.state(STATE_TYPE).unwrap().local_sum(DENSITY);
        let sb = b.state(STATE_TYPE).unwrap().local_sum(DENSITY);
        assert_eq!(sa, sb);
    }

    #[test]
    fn restore_rejects_foreign_layout() {
        let (mut level, arena) = build(None);
        let ba = BoxArray::from_domain(&IndexBox::from_extent(IntVect::splat(8)), &IntVect::splat(8)).unwrap();
        let dm = DistributionMapping::new(&ba, 1, DistributionStrategy::RoundRobin);
        let other = MultiFab::new(ba, dm, 5, 1, 0, &arena).unwrap();
        assert!(level.restore_state(STATE_TYPE, other, 1.0).is_err());
        let same = level.state(STATE_TYPE).unwrap().clone();
        level.restore_state(STATE_TYPE, same, 1.0).unwrap();
        assert_eq!(level.state_time(STATE_TYPE), Some(1.0));
    }

    #[test]
    fn level_zero_writes_job_info() {
        let dir = tempfile::tempdir().unwrap();
        let (level, _arena) = build(Some("inputs = inputs.toml\n"));
        let mut sink = Vec::new();
        level.write_plot_post(dir.path(), &mut sink).unwrap();
        let text = fs::read_to_string(dir.path().join(JOB_INFO_FILE)).unwrap();
        assert_eq!(text, "inputs = inputs.toml\n");
    }
}
