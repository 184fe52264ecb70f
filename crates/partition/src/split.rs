//! Splitting a payload into balanced shards
//!
//! [`Partitioner::split`] plans the bins up front (it needs every estimate)
//! but rehydrates shards lazily: each call to `next()` moves one bin's entries
//! out of the payload, so no entry is ever cloned.

use crate::plan::{Bin, PartitionPlan};
use shardline_core::{Key, Payload, Result, Shard, Value};
use tracing::debug;

/// Size-balanced partitioner for a fixed worker count.
#[derive(Debug, Clone, Copy)]
pub struct Partitioner {
    workers: usize,
}

impl Partitioner {
    /// Create a partitioner producing `workers` shards.
    ///
    /// # Errors
    ///
    /// `InvalidConfig` if `workers` is zero.
    pub fn new(workers: usize) -> Result<Self> {
        // Reuse the plan's validation so both entry points agree.
        PartitionPlan::compute(&[], workers)?;
        Ok(Self { workers })
    }

    /// Number of shards produced
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Plan the bins for a payload without consuming it.
    pub fn plan(&self, payload: &Payload) -> Result<PartitionPlan> {
        PartitionPlan::compute(&payload.entry_sizes(), self.workers)
    }

    /// Split a payload into exactly `workers` shards.
    pub fn split(&self, payload: Payload) -> Result<Shards> {
        let plan = self.plan(&payload)?;
        debug!(
            workers = self.workers,
            entries = payload.len(),
            spread = plan.spread(),
            "Partitioned payload"
        );

        let totals = plan.totals();
        let source = match payload {
            Payload::Mapping(m) => Source::Mapping(m.into_iter().map(Some).collect()),
            Payload::Sequence(s) => Source::Sequence(s.into_iter().map(Some).collect()),
        };

        Ok(Shards {
            source,
            bins: plan.into_bins().into_iter(),
            totals,
        })
    }
}

enum Source {
    Mapping(Vec<Option<(Key, Value)>>),
    Sequence(Vec<Option<Value>>),
}

/// Lazy iterator over the shards of one payload, in bin order.
///
/// Yields exactly as many shards as the partitioner has workers; empty bins
/// yield empty shards of the payload's shape.
pub struct Shards {
    source: Source,
    bins: std::vec::IntoIter<Bin>,
    totals: Vec<u64>,
}

impl Shards {
    /// Estimated total of every bin, in index order
    pub fn totals(&self) -> &[u64] {
        &self.totals
    }
}

impl Iterator for Shards {
    type Item = Shard;

    fn next(&mut self) -> Option<Shard> {
        let bin = self.bins.next()?;
        let shard = match &mut self.source {
            Source::Mapping(entries) => Shard::Mapping(
                bin.indices
                    .iter()
                    .filter_map(|&i| entries[i].take())
                    .collect(),
            ),
            Source::Sequence(elements) => Shard::Sequence(
                bin.indices
                    .iter()
                    .filter_map(|&i| elements[i].take().map(|v| (i as u64, v)))
                    .collect(),
            ),
        };
        Some(shard)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.bins.size_hint()
    }
}

impl ExactSizeIterator for Shards {}
