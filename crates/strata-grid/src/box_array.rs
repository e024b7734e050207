//! Ordered collections of disjoint boxes tiling a level.

use strata_core::{IndexBox, IndexType, IntVect};

use crate::error::GridError;

/// The grids of one level, in a fixed order.
///
/// Box indices are stable for the lifetime of the array and are what a
/// [`DistributionMapping`](crate::DistributionMapping) assigns to ranks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BoxArray {
    boxes: Vec<IndexBox>,
    ix_type: IndexType,
}

impl BoxArray {
    /// Tile `domain` with boxes no longer than `max_grid_size`.
    pub fn from_domain(domain: &IndexBox, max_grid_size: &IntVect) -> Result<Self, GridError> {
        if domain.is_empty() {
            return Err(GridError::InvalidBox {
                bx: *domain,
                reason: "domain is empty".into(),
            });
        }
        if !max_grid_size.all_positive() {
            return Err(GridError::InvalidBox {
                bx: *domain,
                reason: format!("max_grid_size {max_grid_size} must be positive"),
            });
        }
        Ok(Self {
            boxes: domain.chop(max_grid_size),
            ix_type: domain.ix_type(),
        })
    }

    /// Wrap an explicit list of boxes, which must be non-empty and share
    /// one index type.
    pub fn from_boxes(boxes: Vec<IndexBox>) -> Result<Self, GridError> {
        let Some(first) = boxes.first() else {
            return Err(GridError::LayoutMismatch {
                detail: "box array must hold at least one box".into(),
            });
        };
        let ix_type = first.ix_type();
        if let Some(bad) = boxes.iter().find(|b| b.is_empty() || b.ix_type() != ix_type) {
            return Err(GridError::InvalidBox {
                bx: *bad,
                reason: "empty or of mixed index type".into(),
            });
        }
        Ok(Self { boxes, ix_type })
    }

    /// Number of boxes.
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// `true` if the array holds no boxes.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Box `i`.
    pub fn get(&self, i: usize) -> Option<&IndexBox> {
        self.boxes.get(i)
    }

    /// All boxes in order.
    pub fn boxes(&self) -> &[IndexBox] {
        &self.boxes
    }

    /// Iterate boxes in order.
    pub fn iter(&self) -> impl Iterator<Item = &IndexBox> {
        self.boxes.iter()
    }

    /// Index type shared by every box.
    pub fn ix_type(&self) -> IndexType {
        self.ix_type
    }

    /// The same tiling with every box converted to `ix_type`.
    pub fn convert(&self, ix_type: IndexType) -> Self {
        Self {
            boxes: self.boxes.iter().map(|b| b.convert(ix_type)).collect(),
            ix_type,
        }
    }

    /// Refine every box.
    pub fn refine(&self, ratio: &IntVect) -> Self {
        Self {
            boxes: self.boxes.iter().map(|b| b.refine(ratio)).collect(),
            ix_type: self.ix_type,
        }
    }

    /// Coarsen every box.
    pub fn coarsen(&self, ratio: &IntVect) -> Self {
        Self {
            boxes: self.boxes.iter().map(|b| b.coarsen(ratio)).collect(),
            ix_type: self.ix_type,
        }
    }

    /// Total points over all boxes.
    pub fn num_pts(&self) -> usize {
        self.boxes.iter().map(IndexBox::num_pts).sum()
    }

    /// Smallest box enclosing every box in the array.
    pub fn minimal_box(&self) -> IndexBox {
        let mut iter = self.boxes.iter();
        let Some(first) = iter.next() else {
            return IndexBox::new(IntVect::zero(), IntVect::splat(-1));
        };
        let (lo, hi) = iter.fold((first.lo(), first.hi()), |(lo, hi), b| {
            (lo.elementwise_min(&b.lo()), hi.elementwise_max(&b.hi()))
        });
        IndexBox::with_type(lo, hi, self.ix_type)
    }

    /// `(index, overlap)` for every box intersecting `bx`.
    pub fn intersections(&self, bx: &IndexBox) -> Vec<(usize, IndexBox)> {
        self.boxes
            .iter()
            .enumerate()
            .filter_map(|(i, b)| b.intersect(bx).map(|o| (i, o)))
            .collect()
    }
}
