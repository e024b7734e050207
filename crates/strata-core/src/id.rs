//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a state type registered with the level hierarchy.
///
/// State types are registered once, before the hierarchy is built, and
/// assigned sequential IDs. `StateTypeId(n)` corresponds to the n-th entry
/// of the [`DescriptorList`](crate::DescriptorList).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateTypeId(pub u32);

impl StateTypeId {
    /// The index of this state type in its descriptor list.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StateTypeId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
