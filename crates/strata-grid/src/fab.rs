//! Multi-component data over a single box.

use strata_core::{IndexBox, IndexType, IntVect, SPACEDIM};

use crate::arena::{FabArena, Lease};
use crate::error::GridError;

/// A fortran-array-box: `ncomp` values at every point of a box.
///
/// Storage is component-major; within a component points are ordered
/// x-fastest, matching [`IndexBox::offset`].
#[derive(Debug)]
pub struct Fab {
    bx: IndexBox,
    ncomp: usize,
    data: Vec<f64>,
    lease: Option<Lease>,
}

impl Fab {
    /// A zero-filled FAB not tracked by any arena.
    pub fn new(bx: IndexBox, ncomp: usize) -> Self {
        Self {
            bx,
            ncomp,
            data: vec![0.0; bx.num_pts() * ncomp],
            lease: None,
        }
    }

    /// A zero-filled FAB whose storage is recorded in `arena`.
    pub fn new_in(bx: IndexBox, ncomp: usize, arena: &FabArena) -> Self {
        let mut fab = Self::new(bx, ncomp);
        fab.lease = Some(arena.lease(fab.data.len() * std::mem::size_of::<f64>()));
        fab
    }

    /// Box covered, ghost cells included.
    pub fn bx(&self) -> IndexBox {
        self.bx
    }

    /// Number of components.
    pub fn ncomp(&self) -> usize {
        self.ncomp
    }

    /// Raw storage, component-major.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Values of one component.
    pub fn comp(&self, comp: usize) -> &[f64] {
        let n = self.bx.num_pts();
        &self.data[comp * n..(comp + 1) * n]
    }

    /// Mutable values of one component.
    pub fn comp_mut(&mut self, comp: usize) -> &mut [f64] {
        let n = self.bx.num_pts();
        &mut self.data[comp * n..(comp + 1) * n]
    }

    /// Value at `iv` for component `comp`.
    pub fn get(&self, iv: &IntVect, comp: usize) -> f64 {
        self.data[self.index(iv, comp)]
    }

    /// Set the value at `iv` for component `comp`.
    pub fn set(&mut self, iv: &IntVect, comp: usize, v: f64) {
        let i = self.index(iv, comp);
        self.data[i] = v;
    }

    /// Set every value of every component.
    pub fn fill(&mut self, v: f64) {
        self.data.fill(v);
    }

    /// Copy `ncomp` components from `src` over `region`, which must lie
    /// inside both boxes.
    pub fn copy_from(
        &mut self,
        src: &Fab,
        region: &IndexBox,
        src_comp: usize,
        dst_comp: usize,
        ncomp: usize,
    ) -> Result<(), GridError> {
        check_range(src_comp, ncomp, src.ncomp)?;
        check_range(dst_comp, ncomp, self.ncomp)?;
        if !self.bx.contains_box(region) || !src.bx.contains_box(region) {
            return Err(GridError::InvalidBox {
                bx: *region,
                reason: format!("not inside both {} and {}", self.bx, src.bx),
            });
        }
        for c in 0..ncomp {
            for iv in region.cells() {
                let v = src.get(&iv, src_comp + c);
                self.set(&iv, dst_comp + c, v);
            }
        }
        Ok(())
    }

    /// Minimum and maximum of component `comp` over `region`, or `None`
    /// if the region is empty.
    pub fn min_max(&self, comp: usize, region: &IndexBox) -> Option<(f64, f64)> {
        region.cells().map(|iv| self.get(&iv, comp)).fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
    }

    /// Serialize as box, component count, then little-endian values.
    pub fn encode(&self, out: &mut Vec<u8>) {
        for d in 0..SPACEDIM {
            out.extend_from_slice(&self.bx.lo().get(d).to_le_bytes());
        }
        for d in 0..SPACEDIM {
            out.extend_from_slice(&self.bx.hi().get(d).to_le_bytes());
        }
        out.push(match self.bx.ix_type() {
            IndexType::Cell => 0,
            IndexType::Node => 1,
        });
        out.extend_from_slice(&(self.ncomp as u32).to_le_bytes());
        for v in &self.data {
            out.extend_from_slice(&v.to_le_bytes());
        }
    }

    /// Inverse of [`Fab::encode`]. Returns the FAB and the bytes consumed.
    pub fn decode(buf: &[u8]) -> Result<(Self, usize), GridError> {
        let mut cur = Cursor { buf, pos: 0 };
        let mut corner = || -> Result<IntVect, GridError> {
            let mut v = [0i32; SPACEDIM];
            for x in &mut v {
                *x = i32::from_le_bytes(cur.take()?);
            }
            Ok(IntVect::new(v))
        };
        let lo = corner()?;
        let hi = corner()?;
        let ix_type = match cur.take::<1>()?[0] {
            0 => IndexType::Cell,
            1 => IndexType::Node,
            t => {
                return Err(GridError::MalformedBlock {
                    detail: format!("unknown index type tag {t}"),
                })
            }
        };
        let ncomp = u32::from_le_bytes(cur.take()?) as usize;
        let mut fab = Self::new(IndexBox::with_type(lo, hi, ix_type), ncomp);
        for v in &mut fab.data {
            *v = f64::from_le_bytes(cur.take()?);
        }
        Ok((fab, cur.pos))
    }

    fn index(&self, iv: &IntVect, comp: usize) -> usize {
        comp * self.bx.num_pts() + self.bx.offset(iv)
    }
}

impl Clone for Fab {
    fn clone(&self) -> Self {
        Self {
            bx: self.bx,
            ncomp: self.ncomp,
            data: self.data.clone(),
            lease: self.lease.as_ref().map(Lease::renew),
        }
    }
}

impl PartialEq for Fab {
    fn eq(&self, other: &Self) -> bool {
        self.bx == other.bx && self.ncomp == other.ncomp && self.data == other.data
    }
}

pub(crate) fn check_range(start: usize, n: usize, ncomp: usize) -> Result<(), GridError> {
    if start + n > ncomp {
        return Err(GridError::ComponentRange {
            start,
            end: start + n,
            ncomp,
        });
    }
    Ok(())
}

struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl Cursor<'_> {
    fn take<const N: usize>(&mut self) -> Result<[u8; N], GridError> {
        let bytes = self
            .buf
            .get(self.pos..self.pos + N)
            .ok_or_else(|| GridError::MalformedBlock {
                detail: format!("truncated at byte {}", self.pos),
            })?;
        self.pos += N;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(n: i32) -> IndexBox {
        IndexBox::from_extent(IntVect::splat(n))
    }

    #[test]
    fn components_are_stored_contiguously() {
        let mut fab = Fab::new(cube(2), 2);
        fab.set(&IntVect::new([1, 0, 0]), 1, 7.0);
        assert_eq!(fab.comp(1)[1], 7.0);
        assert_eq!(fab.data()[8 + 1], 7.0);
    }

    #[test]
    fn copy_respects_component_offsets() {
        let mut src = Fab::new(cube(4), 3);
        src.comp_mut(2).fill(5.0);
        let mut dst = Fab::new(cube(4), 1);
        dst.copy_from(&src, &cube(4), 2, 0, 1).unwrap();
        assert!(dst.data().iter().all(|&v| v == 5.0));
        let err = dst.copy_from(&src, &cube(4), 2, 0, 2).unwrap_err();
        assert!(matches!(err, GridError::ComponentRange { .. }));
    }

    #[test]
    fn encoded_block_decodes_and_reports_length() {
        let mut fab = Fab::new(IndexBox::new(IntVect::new([-1, 0, 2]), IntVect::new([1, 1, 3])), 2);
        for (i, v) in fab.comp_mut(0).iter_mut().enumerate() {
            *v = i as f64;
        }
        let mut buf = Vec::new();
        fab.encode(&mut buf);
        buf.push(0xff);
        let (back, used) = Fab::decode(&buf).unwrap();
        assert_eq!(back, fab);
        assert_eq!(used, buf.len() - 1);
        assert!(Fab::decode(&buf[..10]).is_err());
    }

    #[test]
    fn arena_tracks_clones_and_drops() {
        let arena = FabArena::new();
        let fab = Fab::new_in(cube(2), 1, &arena);
        let copy = fab.clone();
        assert_eq!(arena.live_bytes(), 2 * 8 * 8);
        drop(fab);
        drop(copy);
        assert_eq!(arena.live_bytes(), 0);
        assert_eq!(arena.heap_space_used(), 128);
    }

    #[test]
    fn min_max_over_region() {
        let mut fab = Fab::new(cube(2), 1);
        fab.set(&IntVect::zero(), 0, -3.0);
        fab.set(&IntVect::unit(), 0, 4.0);
        assert_eq!(fab.min_max(0, &cube(2)), Some((-3.0, 4.0)));
    }
}
