//! Distributed multi-component field over a level's box array.

use strata_comm::Communicator;
use strata_core::{IndexBox, IndexType};

use crate::arena::FabArena;
use crate::box_array::BoxArray;
use crate::distribution::DistributionMapping;
use crate::error::GridError;
use crate::fab::{check_range, Fab};

/// One FAB per box, stored only on the box's owner rank.
///
/// Each local FAB covers its valid box grown by `ngrow` ghost points.
#[derive(Clone, Debug)]
pub struct MultiFab {
    ba: BoxArray,
    dm: DistributionMapping,
    ncomp: usize,
    ngrow: usize,
    fabs: Vec<(usize, Fab)>,
}

impl MultiFab {
    /// Allocate zero-filled FABs for the boxes `rank` owns.
    pub fn new(
        ba: BoxArray,
        dm: DistributionMapping,
        ncomp: usize,
        ngrow: usize,
        rank: usize,
        arena: &FabArena,
    ) -> Result<Self, GridError> {
        if dm.len() != ba.len() {
            return Err(GridError::DistributionSize {
                mapped: dm.len(),
                boxes: ba.len(),
            });
        }
        let fabs = dm
            .local_indices(rank)
            .into_iter()
            .map(|i| {
                let bx = ba.boxes()[i].grow(ngrow as i32);
                (i, Fab::new_in(bx, ncomp, arena))
            })
            .collect();
        Ok(Self {
            ba,
            dm,
            ncomp,
            ngrow,
            fabs,
        })
    }

    /// The box array.
    pub fn box_array(&self) -> &BoxArray {
        &self.ba
    }

    /// The distribution mapping.
    pub fn distribution_map(&self) -> &DistributionMapping {
        &self.dm
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Ghost width.
    pub fn ngrow(&self) -> usize {
        self.ngrow
    }

    /// Index type of the data.
    pub fn ix_type(&self) -> IndexType {
        self.ba.ix_type()
    }

    /// Number of FABs held by this rank.
    pub fn local_len(&self) -> usize {
        self.fabs.len()
    }

    /// `(box index, fab)` for every local FAB.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &Fab)> {
        self.fabs.iter().map(|(i, f)| (*i, f))
    }

    /// Mutable `(box index, fab)` for every local FAB.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut Fab)> {
        self.fabs.iter_mut().map(|(i, f)| (*i, f))
    }

    /// Local FAB for box `i`, if this rank owns it.
    pub fn fab(&self, i: usize) -> Option<&Fab> {
        self.fabs.iter().find(|(j, _)| *j == i).map(|(_, f)| f)
    }

    /// Valid (ghost-free) region of box `i`.
    pub fn valid_box(&self, i: usize) -> Option<IndexBox> {
        self.ba.get(i).copied()
    }

    /// Set every value, ghosts included.
    pub fn set_val(&mut self, v: f64) {
        for (_, fab) in &mut self.fabs {
            fab.fill(v);
        }
    }

    /// Copy `ncomp` components of `src` into `dst` over each valid box
    /// grown by `ngrow`. Both must share box array and distribution.
    pub fn copy(
        dst: &mut MultiFab,
        src: &MultiFab,
        src_comp: usize,
        dst_comp: usize,
        ncomp: usize,
        ngrow: usize,
    ) -> Result<(), GridError> {
        if dst.ba != src.ba {
            return Err(GridError::LayoutMismatch {
                detail: "box arrays differ".into(),
            });
        }
        if dst.dm != src.dm {
            return Err(GridError::LayoutMismatch {
                detail: "distribution mappings differ".into(),
            });
        }
        check_range(src_comp, ncomp, src.ncomp)?;
        check_range(dst_comp, ncomp, dst.ncomp)?;
        let available = src.ngrow.min(dst.ngrow);
        if ngrow > available {
            return Err(GridError::GhostWidth {
                requested: ngrow,
                available,
            });
        }
        for ((i, dfab), (_, sfab)) in dst.fabs.iter_mut().zip(&src.fabs) {
            let region = dst.ba.boxes()[*i].grow(ngrow as i32);
            dfab.copy_from(sfab, &region, src_comp, dst_comp, ncomp)?;
        }
        Ok(())
    }

    /// Fill valid regions of `self` from the valid regions of `src`,
    /// which may have any box array and distribution of the same index
    /// type. Points `src` does not cover are left untouched.
    ///
    /// Collective: every rank must call it.
    pub fn parallel_copy_from(
        &mut self,
        src: &MultiFab,
        src_comp: usize,
        dst_comp: usize,
        ncomp: usize,
        comm: &dyn Communicator,
    ) -> Result<(), GridError> {
        check_range(src_comp, ncomp, src.ncomp)?;
        check_range(dst_comp, ncomp, self.ncomp)?;
        if src.ix_type() != self.ix_type() {
            return Err(GridError::LayoutMismatch {
                detail: "index types differ".into(),
            });
        }
        let mut payload = Vec::new();
        for (i, fab) in src.iter() {
            let mut valid = Fab::new(src.ba.boxes()[i], ncomp);
            valid.copy_from(fab, &src.ba.boxes()[i], src_comp, 0, ncomp)?;
            valid.encode(&mut payload);
        }
        let blocks = comm.all_gather_bytes(payload)?;
        for block in &blocks {
            let mut rest = block.as_slice();
            while !rest.is_empty() {
                let (piece, used) = Fab::decode(rest)?;
                rest = &rest[used..];
                for (i, dfab) in &mut self.fabs {
                    if let Some(overlap) = self.ba.boxes()[*i].intersect(&piece.bx()) {
                        dfab.copy_from(&piece, &overlap, 0, dst_comp, ncomp)?;
                    }
                }
            }
        }
        Ok(())
    }

    /// Local minimum and maximum of `comp` over valid regions.
    pub fn local_min_max(&self, comp: usize) -> Option<(f64, f64)> {
        self.fabs
            .iter()
            .filter_map(|(i, fab)| fab.min_max(comp, &self.ba.boxes()[*i]))
            .reduce(|(a, b), (c, d)| (a.min(c), b.max(d)))
    }

    /// Local sum of `comp` over valid regions.
    pub fn local_sum(&self, comp: usize) -> f64 {
        self.fabs
            .iter()
            .map(|(i, fab)| {
                self.ba.boxes()[*i]
                    .cells()
                    .map(|iv| fab.get(&iv, comp))
                    .sum::<f64>()
            })
            .sum()
    }
}
