//! Partitioning Tests
//!
//! Shard balance as observed through plans and dump reports.

use crate::*;
use shardline::shardline_partition::{PartitionPlan, Partitioner};

/// {0: [0]*100, 1: [0]*10, 2: [0]*50}
fn skewed_mapping() -> Payload {
    [(0, 100), (1, 10), (2, 50)]
        .into_iter()
        .map(|(k, n)| (Key::Int(k), Value::Array(vec![Value::Int(0); n])))
        .collect()
}

#[test]
fn test_skewed_mapping_entry_sizes() {
    // key 8 + container 8 + 8 per int
    assert_eq!(skewed_mapping().entry_sizes(), vec![816, 96, 416]);
}

#[test]
fn test_skewed_mapping_plan() {
    let plan = Partitioner::new(2).unwrap().plan(&skewed_mapping()).unwrap();
    assert_eq!(plan.bins()[0].indices, vec![0]);
    assert_eq!(plan.bins()[1].indices, vec![1, 2]);
    assert_eq!(plan.totals(), vec![816, 512]);
    assert!(plan.spread() <= plan.largest());
}

#[test]
fn test_dump_report_carries_plan_totals() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller(2);

    let report = m.dump_to(skewed_mapping(), &channel).unwrap();
    assert_eq!(report.totals, vec![816, 512]);
    assert_eq!(report.entries, 3);
    assert_eq!(m.load_from(&channel).unwrap(), skewed_mapping());
}

#[test]
fn test_more_workers_than_entries_leaves_empty_bins() {
    let plan = PartitionPlan::compute(&[5, 3], 4).unwrap();
    assert_eq!(plan.totals(), vec![5, 3, 0, 0]);
    assert_eq!(plan.entries(), 2);
}

#[test]
fn test_every_shard_gets_a_sink() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller(5);

    let report = m.dump_to(sample_sequence(3), &channel).unwrap();
    assert_eq!(report.manifest.len(), 5);
    assert_eq!(report.totals.iter().filter(|t| **t == 0).count(), 2);
    for (i, sink) in report.manifest.sinks().iter().enumerate() {
        assert_eq!(sink, &dir.path().join(format!("run_{}", i)));
        assert!(sink.exists());
    }
}

#[test]
fn test_balance_bound_on_larger_payload() {
    let payload = sample_mapping(1000);
    for workers in [2, 3, 7, 16] {
        let plan = Partitioner::new(workers).unwrap().plan(&payload).unwrap();
        assert_eq!(plan.entries(), payload.len());
        assert!(
            plan.spread() <= plan.largest(),
            "workers {}: spread {} > largest {}",
            workers,
            plan.spread(),
            plan.largest()
        );
    }
}
