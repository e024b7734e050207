//! Integer index space: [`IntVect`], [`IndexType`], and [`IndexBox`].
//!
//! All boxes are inclusive on both ends and iterate in x-fastest order,
//! which is also the memory layout of every data block in the workspace.

use std::fmt;
use std::ops::{Add, Mul, Sub};
use std::str::FromStr;

/// Spatial dimensionality of the index space.
pub const SPACEDIM: usize = 3;

// ── IntVect ────────────────────────────────────────────────────────

/// A point (or extent) in the integer index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct IntVect(pub [i32; SPACEDIM]);

impl IntVect {
    /// Construct from explicit components.
    pub const fn new(v: [i32; SPACEDIM]) -> Self {
        Self(v)
    }

    /// All components equal to `v`.
    pub const fn splat(v: i32) -> Self {
        Self([v; SPACEDIM])
    }

    /// The origin.
    pub const fn zero() -> Self {
        Self::splat(0)
    }

    /// All components equal to one.
    pub const fn unit() -> Self {
        Self::splat(1)
    }

    /// Component `dir`.
    pub fn get(&self, dir: usize) -> i32 {
        self.0[dir]
    }

    /// `true` if every component of `self` is `<=` the matching component of `other`.
    pub fn all_le(&self, other: &Self) -> bool {
        self.0.iter().zip(other.0.iter()).all(|(a, b)| a <= b)
    }

    /// `true` if every component is strictly positive.
    pub fn all_positive(&self) -> bool {
        self.0.iter().all(|&v| v > 0)
    }

    /// Largest component.
    pub fn max_component(&self) -> i32 {
        self.0.iter().copied().max().unwrap_or(0)
    }

    /// Product of all components, widened to avoid overflow.
    pub fn product(&self) -> i64 {
        self.0.iter().map(|&v| i64::from(v)).product()
    }

    /// Componentwise minimum.
    pub fn elementwise_min(&self, other: &Self) -> Self {
        let mut out = *self;
        for d in 0..SPACEDIM {
            out.0[d] = out.0[d].min(other.0[d]);
        }
        out
    }

    /// Componentwise maximum.
    pub fn elementwise_max(&self, other: &Self) -> Self {
        let mut out = *self;
        for d in 0..SPACEDIM {
            out.0[d] = out.0[d].max(other.0[d]);
        }
        out
    }

    /// Componentwise floor division by `ratio`.
    pub fn coarsen(&self, ratio: &Self) -> Self {
        let mut out = *self;
        for d in 0..SPACEDIM {
            out.0[d] = self.0[d].div_euclid(ratio.0[d]);
        }
        out
    }
}

impl Add for IntVect {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut out = self;
        for d in 0..SPACEDIM {
            out.0[d] += rhs.0[d];
        }
        out
    }
}

impl Sub for IntVect {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        let mut out = self;
        for d in 0..SPACEDIM {
            out.0[d] -= rhs.0[d];
        }
        out
    }
}

impl Mul for IntVect {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut out = self;
        for d in 0..SPACEDIM {
            out.0[d] *= rhs.0[d];
        }
        out
    }
}

impl fmt::Display for IntVect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{},{})", self.0[0], self.0[1], self.0[2])
    }
}

impl FromStr for IntVect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("malformed IntVect '{s}'"))?;
        let parts: Vec<&str> = inner.split(',').collect();
        if parts.len() != SPACEDIM {
            return Err(format!("expected {SPACEDIM} components in '{s}'"));
        }
        let mut out = Self::zero();
        for (d, part) in parts.iter().enumerate() {
            out.0[d] = part
                .trim()
                .parse()
                .map_err(|e| format!("bad component '{part}' in '{s}': {e}"))?;
        }
        Ok(out)
    }
}

// ── IndexType ──────────────────────────────────────────────────────

/// Where data lives relative to a mesh cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum IndexType {
    /// Data at cell centers.
    #[default]
    Cell,
    /// Data at cell corners (nodes) in every direction.
    Node,
}

impl IndexType {
    /// `true` for cell-centered data.
    pub fn is_cell_centered(self) -> bool {
        matches!(self, Self::Cell)
    }

    fn marker(self) -> i32 {
        match self {
            Self::Cell => 0,
            Self::Node => 1,
        }
    }
}

// ── IndexBox ───────────────────────────────────────────────────────

/// An inclusive rectangular region of index space with an index type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexBox {
    lo: IntVect,
    hi: IntVect,
    ix_type: IndexType,
}

impl IndexBox {
    /// A cell-centered box spanning `lo..=hi`.
    pub fn new(lo: IntVect, hi: IntVect) -> Self {
        Self {
            lo,
            hi,
            ix_type: IndexType::Cell,
        }
    }

    /// A box of the given index type spanning `lo..=hi`.
    pub fn with_type(lo: IntVect, hi: IntVect, ix_type: IndexType) -> Self {
        Self { lo, hi, ix_type }
    }

    /// A cell-centered box `[0, n-1]` in every direction.
    pub fn from_extent(n: IntVect) -> Self {
        Self::new(IntVect::zero(), n - IntVect::unit())
    }

    /// Lower corner.
    pub fn lo(&self) -> IntVect {
        self.lo
    }

    /// Upper corner (inclusive).
    pub fn hi(&self) -> IntVect {
        self.hi
    }

    /// Index type of this box.
    pub fn ix_type(&self) -> IndexType {
        self.ix_type
    }

    /// `true` if the box contains no points.
    pub fn is_empty(&self) -> bool {
        (0..SPACEDIM).any(|d| self.hi.0[d] < self.lo.0[d])
    }

    /// Number of points along each direction.
    pub fn length(&self) -> IntVect {
        self.hi - self.lo + IntVect::unit()
    }

    /// Total number of points.
    pub fn num_pts(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            self.length().product() as usize
        }
    }

    /// `true` if `iv` lies inside the box.
    pub fn contains(&self, iv: &IntVect) -> bool {
        self.lo.all_le(iv) && iv.all_le(&self.hi)
    }

    /// `true` if `other` lies entirely inside the box.
    pub fn contains_box(&self, other: &Self) -> bool {
        other.is_empty() || (self.contains(&other.lo) && self.contains(&other.hi))
    }

    /// Intersection of two boxes of the same index type, if non-empty.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self.ix_type != other.ix_type {
            return None;
        }
        let bx = Self::with_type(
            self.lo.elementwise_max(&other.lo),
            self.hi.elementwise_min(&other.hi),
            self.ix_type,
        );
        (!bx.is_empty()).then_some(bx)
    }

    /// Grow by `n` points on every side.
    pub fn grow(&self, n: i32) -> Self {
        Self::with_type(
            self.lo - IntVect::splat(n),
            self.hi + IntVect::splat(n),
            self.ix_type,
        )
    }

    /// Refine by `ratio`.
    pub fn refine(&self, ratio: &IntVect) -> Self {
        match self.ix_type {
            IndexType::Cell => Self::new(
                self.lo * *ratio,
                (self.hi + IntVect::unit()) * *ratio - IntVect::unit(),
            ),
            IndexType::Node => Self::with_type(self.lo * *ratio, self.hi * *ratio, IndexType::Node),
        }
    }

    /// Coarsen by `ratio`, rounding outward.
    pub fn coarsen(&self, ratio: &IntVect) -> Self {
        match self.ix_type {
            IndexType::Cell => Self::new(self.lo.coarsen(ratio), self.hi.coarsen(ratio)),
            IndexType::Node => {
                let mut hi = self.hi.coarsen(ratio);
                for d in 0..SPACEDIM {
                    if self.hi.0[d].rem_euclid(ratio.0[d]) != 0 {
                        hi.0[d] += 1;
                    }
                }
                Self::with_type(self.lo.coarsen(ratio), hi, IndexType::Node)
            }
        }
    }

    /// Convert to another index type (cells ↔ surrounding nodes).
    pub fn convert(&self, ix_type: IndexType) -> Self {
        match (self.ix_type, ix_type) {
            (IndexType::Cell, IndexType::Node) => {
                Self::with_type(self.lo, self.hi + IntVect::unit(), IndexType::Node)
            }
            (IndexType::Node, IndexType::Cell) => Self::new(self.lo, self.hi - IntVect::unit()),
            _ => *self,
        }
    }

    /// Linear offset of `iv` in x-fastest order. `iv` must lie in the box.
    pub fn offset(&self, iv: &IntVect) -> usize {
        let len = self.length();
        let rel = *iv - self.lo;
        (rel.0[0] as usize)
            + (len.0[0] as usize) * ((rel.0[1] as usize) + (len.0[1] as usize) * (rel.0[2] as usize))
    }

    /// Iterate every point in x-fastest order.
    pub fn cells(&self) -> Cells {
        Cells {
            bx: *self,
            next: (!self.is_empty()).then_some(self.lo),
        }
    }

    /// Split into boxes no longer than `max_size` along any direction.
    ///
    /// The pieces tile the box exactly and are ordered x-fastest.
    pub fn chop(&self, max_size: &IntVect) -> Vec<Self> {
        if self.is_empty() {
            return Vec::new();
        }
        let mut ranges: [Vec<(i32, i32)>; SPACEDIM] = Default::default();
        for (d, range) in ranges.iter_mut().enumerate() {
            let step = max_size.0[d].max(1);
            let mut lo = self.lo.0[d];
            while lo <= self.hi.0[d] {
                let hi = (lo + step - 1).min(self.hi.0[d]);
                range.push((lo, hi));
                lo = hi + 1;
            }
        }
        let mut out = Vec::with_capacity(ranges.iter().map(Vec::len).product());
        for &(klo, khi) in &ranges[2] {
            for &(jlo, jhi) in &ranges[1] {
                for &(ilo, ihi) in &ranges[0] {
                    out.push(Self::with_type(
                        IntVect::new([ilo, jlo, klo]),
                        IntVect::new([ihi, jhi, khi]),
                        self.ix_type,
                    ));
                }
            }
        }
        out
    }
}

impl fmt::Display for IndexBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.ix_type.marker();
        write!(f, "({} {} ({t},{t},{t}))", self.lo, self.hi)
    }
}

impl FromStr for IndexBox {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("malformed box '{s}'"))?;
        let parts: Vec<&str> = inner.split_whitespace().collect();
        if parts.len() != 3 {
            return Err(format!("expected lo, hi and type in '{s}'"));
        }
        let lo: IntVect = parts[0].parse()?;
        let hi: IntVect = parts[1].parse()?;
        let ty: IntVect = parts[2].parse()?;
        let ix_type = if ty == IntVect::unit() {
            IndexType::Node
        } else if ty == IntVect::zero() {
            IndexType::Cell
        } else {
            return Err(format!("unsupported index type {ty} in '{s}'"));
        };
        Ok(Self::with_type(lo, hi, ix_type))
    }
}

/// Iterator over the points of an [`IndexBox`], x fastest.
pub struct Cells {
    bx: IndexBox,
    next: Option<IntVect>,
}

impl Iterator for Cells {
    type Item = IntVect;

    fn next(&mut self) -> Option<IntVect> {
        let current = self.next?;
        let mut iv = current;
        let mut d = 0;
        loop {
            if d == SPACEDIM {
                self.next = None;
                break;
            }
            iv.0[d] += 1;
            if iv.0[d] <= self.bx.hi.0[d] {
                self.next = Some(iv);
                break;
            }
            iv.0[d] = self.bx.lo.0[d];
            d += 1;
        }
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn arb_box() -> impl Strategy<Value = IndexBox> {
        (
            prop::array::uniform3(-8i32..8),
            prop::array::uniform3(1i32..6),
        )
            .prop_map(|(lo, len)| {
                let lo = IntVect::new(lo);
                IndexBox::new(lo, lo + IntVect::new(len) - IntVect::unit())
            })
    }

    #[test]
    fn display_matches_parse() {
        let bx = IndexBox::new(IntVect::new([0, -2, 3]), IntVect::new([7, 5, 9]));
        assert_eq!(bx.to_string(), "((0,-2,3) (7,5,9) (0,0,0))");
        assert_eq!(bx.to_string().parse::<IndexBox>().unwrap(), bx);
    }

    #[test]
    fn node_conversion_adds_one_point() {
        let bx = IndexBox::from_extent(IntVect::splat(4));
        let nd = bx.convert(IndexType::Node);
        assert_eq!(nd.length(), IntVect::splat(5));
        assert_eq!(nd.convert(IndexType::Cell), bx);
    }

    #[test]
    fn cells_iterates_x_fastest() {
        let bx = IndexBox::new(IntVect::zero(), IntVect::new([1, 1, 0]));
        let pts: Vec<IntVect> = bx.cells().collect();
        assert_eq!(
            pts,
            vec![
                IntVect::new([0, 0, 0]),
                IntVect::new([1, 0, 0]),
                IntVect::new([0, 1, 0]),
                IntVect::new([1, 1, 0]),
            ]
        );
        for (i, iv) in pts.iter().enumerate() {
            assert_eq!(bx.offset(iv), i);
        }
    }

    #[test]
    fn intersect_clips_each_axis_independently() {
        let a = IndexBox::new(IntVect::new([0, 4, 0]), IntVect::splat(7));
        let b = IndexBox::new(IntVect::new([4, 0, 0]), IntVect::splat(7));
        let overlap = a.intersect(&b).unwrap();
        assert_eq!(overlap.lo(), IntVect::new([4, 4, 0]));
        assert_eq!(overlap.hi(), IntVect::splat(7));

        let c = IndexBox::new(IntVect::new([2, 0, 5]), IntVect::new([9, 5, 9]));
        let overlap = a.intersect(&c).unwrap();
        assert_eq!(overlap.lo(), IntVect::new([2, 4, 5]));
        assert_eq!(overlap.hi(), IntVect::new([7, 5, 7]));

        let disjoint = IndexBox::new(IntVect::new([0, 0, 0]), IntVect::new([7, 3, 7]));
        assert!(a.intersect(&disjoint).is_none());
    }

    #[test]
    fn elementwise_bounds_differ_from_ordering() {
        let a = IntVect::new([1, 9, 0]);
        let b = IntVect::new([5, 2, 3]);
        assert_eq!(a.elementwise_max(&b), IntVect::new([5, 9, 3]));
        assert_eq!(a.elementwise_min(&b), IntVect::new([1, 2, 0]));
    }

    #[test]
    fn intersect_rejects_mixed_types() {
        let bx = IndexBox::from_extent(IntVect::splat(4));
        assert!(bx.intersect(&bx.convert(IndexType::Node)).is_none());
    }

    proptest! {
        #[test]
        fn coarsen_inverts_refine(bx in arb_box(), r in 1i32..5) {
            let ratio = IntVect::splat(r);
            prop_assert_eq!(bx.refine(&ratio).coarsen(&ratio), bx);
        }

        #[test]
        fn chop_tiles_the_box(bx in arb_box(), m in 1i32..4) {
            let pieces = bx.chop(&IntVect::splat(m));
            let total: usize = pieces.iter().map(IndexBox::num_pts).sum();
            prop_assert_eq!(total, bx.num_pts());
            for p in &pieces {
                prop_assert!(bx.contains_box(p));
                prop_assert!(p.length().max_component() <= m);
            }
        }

        #[test]
        fn intersection_commutes(a in arb_box(), b in arb_box()) {
            prop_assert_eq!(a.intersect(&b), b.intersect(&a));
        }

        #[test]
        fn cell_count_matches_num_pts(bx in arb_box()) {
            prop_assert_eq!(bx.cells().count(), bx.num_pts());
        }
    }
}
