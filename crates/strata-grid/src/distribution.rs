//! Assignment of boxes to ranks.

use serde::Deserialize;

use crate::box_array::BoxArray;
use crate::error::GridError;

/// How boxes are spread over ranks.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributionStrategy {
    /// Box `i` goes to rank `i % nprocs`.
    RoundRobin,
    /// Largest boxes first, each to the least-loaded rank.
    #[default]
    Knapsack,
}

/// Owner rank of every box in a [`BoxArray`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DistributionMapping {
    owners: Vec<usize>,
}

impl DistributionMapping {
    /// Distribute `ba` over `nprocs` ranks.
    pub fn new(ba: &BoxArray, nprocs: usize, strategy: DistributionStrategy) -> Self {
        let nprocs = nprocs.max(1);
        let owners = match strategy {
            DistributionStrategy::RoundRobin => (0..ba.len()).map(|i| i % nprocs).collect(),
            DistributionStrategy::Knapsack => knapsack(ba, nprocs),
        };
        Self { owners }
    }

    /// Use an explicit owner list.
    pub fn from_owners(ba: &BoxArray, owners: Vec<usize>) -> Result<Self, GridError> {
        if owners.len() != ba.len() {
            return Err(GridError::DistributionSize {
                mapped: owners.len(),
                boxes: ba.len(),
            });
        }
        Ok(Self { owners })
    }

    /// Owner of box `i`.
    pub fn owner(&self, i: usize) -> Option<usize> {
        self.owners.get(i).copied()
    }

    /// Owner of every box, in box order.
    pub fn owners(&self) -> &[usize] {
        &self.owners
    }

    /// Number of boxes mapped.
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    /// `true` if no boxes are mapped.
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Indices of the boxes owned by `rank`, ascending.
    pub fn local_indices(&self, rank: usize) -> Vec<usize> {
        self.owners
            .iter()
            .enumerate()
            .filter_map(|(i, &o)| (o == rank).then_some(i))
            .collect()
    }
}

fn knapsack(ba: &BoxArray, nprocs: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..ba.len()).collect();
    // Stable on ties so every rank computes the same mapping.
    order.sort_by_key(|&i| std::cmp::Reverse(ba.boxes()[i].num_pts()));
    let mut load = vec![0usize; nprocs];
    let mut owners = vec![0usize; ba.len()];
    for i in order {
        let (rank, _) = load
            .iter()
            .enumerate()
            .min_by_key(|&(r, &l)| (l, r))
            .unwrap_or((0, &0));
        owners[i] = rank;
        load[rank] += ba.boxes()[i].num_pts();
    }
    owners
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use strata_core::{IndexBox, IntVect};

    fn tiled(n: i32, max: i32) -> BoxArray {
        BoxArray::from_domain(&IndexBox::from_extent(IntVect::splat(n)), &IntVect::splat(max))
            .unwrap()
    }

    #[test]
    fn round_robin_cycles_ranks() {
        let ba = tiled(8, 4);
        let dm = DistributionMapping::new(&ba, 3, DistributionStrategy::RoundRobin);
        assert_eq!(dm.owners(), &[0, 1, 2, 0, 1, 2, 0, 1]);
        assert_eq!(dm.local_indices(2), vec![2, 5]);
    }

    #[test]
    fn single_rank_owns_everything() {
        let ba = tiled(8, 4);
        let dm = DistributionMapping::new(&ba, 1, DistributionStrategy::Knapsack);
        assert_eq!(dm.local_indices(0).len(), ba.len());
    }

    #[test]
    fn explicit_owners_must_match_length() {
        let ba = tiled(8, 4);
        let err = DistributionMapping::from_owners(&ba, vec![0, 1]).unwrap_err();
        assert!(matches!(err, GridError::DistributionSize { mapped: 2, boxes: 8 }));
    }

    proptest! {
        #[test]
        fn knapsack_balances_equal_boxes(nprocs in 1usize..6) {
            let ba = tiled(16, 4);
            let dm = DistributionMapping::new(&ba, nprocs, DistributionStrategy::Knapsack);
            let counts: Vec<usize> = (0..nprocs).map(|r| dm.local_indices(r).len()).collect();
            let min = *counts.iter().min().unwrap();
            let max = *counts.iter().max().unwrap();
            prop_assert!(max - min <= 1);
            prop_assert_eq!(counts.iter().sum::<usize>(), ba.len());
        }
    }
}
