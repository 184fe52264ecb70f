//! Failure Path Tests
//!
//! Worker failures, rejected inputs and corrupt sinks.

use crate::*;
use shardline::{Error, WorkerExit};
use std::fs::{self, OpenOptions};

/// {"a": 39 chars, "b": 29, "c": 19, "d": 9}: one entry per bin with 4 workers
fn four_strings() -> Payload {
    [("a", 39), ("b", 29), ("c", 19), ("d", 9)]
        .into_iter()
        .map(|(k, n)| (Key::from(k), Value::String("v".repeat(n))))
        .collect()
}

// =============================================================================
// WORKER FAILURES
// =============================================================================

#[test]
fn test_failing_worker_reported_by_shard() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller_with(4, Arc::new(FailOnKey(Key::from("c"))));

    let err = m.dump_to(four_strings(), &channel).unwrap_err();
    assert!(
        matches!(
            err,
            Error::WorkerFailed {
                shard: 2,
                exit: WorkerExit::Code(1)
            }
        ),
        "got {:?}",
        err
    );
    assert_eq!(err.failed_shard(), Some(2));

    for index in [0, 1, 3] {
        let sink = dir.path().join(format!("run_{}", index));
        assert!(fs::metadata(&sink).unwrap().len() > 0, "sink {} is empty", index);
    }
    assert_eq!(fs::metadata(dir.path().join("run_2")).unwrap().len(), 0);
}

#[test]
fn test_inline_failure_returns_underlying_error() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller_with(1, Arc::new(FailOnKey(Key::from("c"))));

    let err = m.dump_to(four_strings(), &channel).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)), "got {:?}", err);
}

#[test]
fn test_panicking_worker_exits_101() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller_with(2, Arc::new(Panicking));

    let err = m.dump_to(sample_mapping(10), &channel).unwrap_err();
    assert!(
        matches!(
            err,
            Error::WorkerFailed {
                shard: 0,
                exit: WorkerExit::Code(101)
            }
        ),
        "got {:?}",
        err
    );
}

// =============================================================================
// REJECTED INPUTS
// =============================================================================

#[test]
fn test_directory_channel_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("chan");
    fs::create_dir(&channel).unwrap();

    let err = marshaller(2).dump_to(sample_mapping(5), &channel).unwrap_err();
    assert!(err.is_configuration(), "got {:?}", err);
    assert!(!dir.path().join("chan_0").exists());
}

#[test]
fn test_scalar_payload_rejected() {
    let err: Error = Payload::from_json(serde_json::json!(42))
        .unwrap_err()
        .into();
    assert!(err.is_configuration());
}

#[test]
fn test_unknown_backend_rejected_at_build() {
    let err = Marshaller::builder().backend("pickle").build().unwrap_err();
    assert!(err.is_configuration());
    assert!(err.to_string().contains("pickle"));
}

#[test]
fn test_zero_workers_rejected_at_build() {
    let err = Marshaller::builder().workers(0).build().unwrap_err();
    assert!(err.is_configuration());
}

// =============================================================================
// CORRUPT SINKS
// =============================================================================

#[test]
fn test_trailing_bytes_in_sink() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller(2);
    m.dump_to(sample_mapping(20), &channel).unwrap();

    let mut sink = OpenOptions::new()
        .append(true)
        .open(dir.path().join("run_0"))
        .unwrap();
    sink.write_all(&[0x00]).unwrap();
    drop(sink);

    let err = m.load_from(&channel).unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)), "got {:?}", err);
}

#[test]
fn test_truncated_sink() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller(2);
    m.dump_to(sample_mapping(20), &channel).unwrap();

    let sink = dir.path().join("run_1");
    let bytes = fs::read(&sink).unwrap();
    fs::write(&sink, &bytes[..bytes.len() / 2]).unwrap();

    let err = m.load_from(&channel).unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)), "got {:?}", err);
}

#[test]
fn test_shape_mismatch_between_shards() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller(2);
    m.dump_to(sample_mapping(20), &channel).unwrap();

    let foreign = BincodeBackend
        .encode(&Shard::Sequence(vec![(0, Value::Int(1))]))
        .unwrap();
    fs::write(dir.path().join("run_1"), foreign).unwrap();

    let err = m.load_from(&channel).unwrap_err();
    assert!(
        matches!(err, Error::Deserialize(ref msg) if msg.contains("shape mismatch")),
        "got {:?}",
        err
    );
}

#[test]
fn test_missing_sink() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    let m = marshaller(3);
    m.dump_to(sample_mapping(20), &channel).unwrap();
    fs::remove_file(dir.path().join("run_2")).unwrap();

    let err = m.load_from(&channel).unwrap_err();
    assert!(
        matches!(err, Error::Io(ref e) if e.kind() == std::io::ErrorKind::NotFound),
        "got {:?}",
        err
    );
}

#[test]
fn test_corrupt_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    fs::write(&channel, [0xFF, 0xFE, 0x00]).unwrap();

    let err = marshaller(2).load_from(&channel).unwrap_err();
    assert!(matches!(err, Error::Deserialize(_)), "got {:?}", err);
}

#[test]
fn test_dump_refuses_existing_sink() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    fs::write(dir.path().join("run_1"), b"keep me").unwrap();

    let err = marshaller(3).dump_to(sample_mapping(5), &channel).unwrap_err();
    assert!(matches!(err, Error::Resource { .. }), "got {:?}", err);
    assert!(!channel.exists());
    assert!(!dir.path().join("run_0").exists());
    assert_eq!(fs::read(dir.path().join("run_1")).unwrap(), b"keep me");
}
