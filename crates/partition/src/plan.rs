//! Longest-processing-time-first bin packing
//!
//! Serializing a shard costs roughly time proportional to its size, so
//! balancing estimated sizes across bins approximates the smallest makespan.
//!
//! # Algorithm
//!
//! 1. Stable-sort entry indices by estimate, largest first
//! 2. Keep one running total per bin, all starting at zero
//! 3. Give each entry to the bin with the smallest total (lowest index on ties)
//! 4. Sort each bin's indices ascending
//!
//! # Guarantee
//!
//! `max(total) - min(total) <= largest single estimate`: an entry only ever
//! lands on the current minimum, so the spread can only grow up to that
//! entry's size.

use shardline_core::{Error, Result};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// One bin of a plan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bin {
    /// Entry indices in ascending order
    pub indices: Vec<usize>,
    /// Sum of the estimates of those entries
    pub total: u64,
}

impl Bin {
    /// Number of entries in this bin
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Check if bin is empty
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Assignment of entries to bins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPlan {
    bins: Vec<Bin>,
    largest: u64,
}

impl PartitionPlan {
    /// Pack entries with the given size estimates into `bins` bins.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `bins` is zero.
    pub fn compute(sizes: &[u64], bins: usize) -> Result<Self> {
        if bins == 0 {
            return Err(Error::InvalidConfig(
                "worker count must be at least 1".to_string(),
            ));
        }

        let mut order: Vec<usize> = (0..sizes.len()).collect();
        // sort_by is stable: equal sizes keep payload iteration order
        order.sort_by(|&a, &b| sizes[b].cmp(&sizes[a]));

        let mut out = vec![Bin::default(); bins];
        let mut heap: BinaryHeap<Reverse<(u64, usize)>> =
            (0..bins).map(|bin| Reverse((0, bin))).collect();

        for entry in order {
            let Some(Reverse((total, bin))) = heap.pop() else {
                unreachable!("heap holds one slot per bin");
            };
            let total = total + sizes[entry];
            out[bin].indices.push(entry);
            out[bin].total = total;
            heap.push(Reverse((total, bin)));
        }

        for bin in &mut out {
            bin.indices.sort_unstable();
        }

        Ok(Self {
            bins: out,
            largest: sizes.iter().copied().max().unwrap_or(0),
        })
    }

    /// Bins in index order
    pub fn bins(&self) -> &[Bin] {
        &self.bins
    }

    /// Consume the plan, returning its bins
    pub fn into_bins(self) -> Vec<Bin> {
        self.bins
    }

    /// Estimated total of every bin, in index order
    pub fn totals(&self) -> Vec<u64> {
        self.bins.iter().map(|b| b.total).collect()
    }

    /// Largest bin total minus smallest bin total
    pub fn spread(&self) -> u64 {
        let max = self.bins.iter().map(|b| b.total).max().unwrap_or(0);
        let min = self.bins.iter().map(|b| b.total).min().unwrap_or(0);
        max - min
    }

    /// Largest single entry estimate
    pub fn largest(&self) -> u64 {
        self.largest
    }

    /// Number of entries across all bins
    pub fn entries(&self) -> usize {
        self.bins.iter().map(Bin::len).sum()
    }
}
