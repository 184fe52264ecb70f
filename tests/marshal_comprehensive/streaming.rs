//! Streaming-Mode Tests
//!
//! The primary channel is a FIFO, so every test runs the loader on its own
//! thread. Forked workers inherit every open descriptor of the test process,
//! so streaming tests hold a lock to keep one run's pipes out of another's
//! workers.

use crate::*;
use shardline::{Error, WorkerExit};
use std::fs::File;
use std::sync::{Mutex, MutexGuard};
use std::thread;

static STREAMING: Mutex<()> = Mutex::new(());

fn serial() -> MutexGuard<'static, ()> {
    STREAMING.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Dump `payload` into the FIFO at `channel` while a thread loads it.
fn stream(m: &Marshaller, payload: Payload, channel: &Path) -> (DumpReport, Payload) {
    let loader = m.clone();
    let path = channel.to_path_buf();
    let handle = thread::spawn(move || loader.load_from(&path));
    let report = m.dump_to(payload, channel).unwrap();
    let loaded = handle.join().unwrap().unwrap();
    (report, loaded)
}

#[test]
fn test_streaming_matches_disk() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let m = marshaller(3);
    let payload = sample_mapping(300);

    let disk = dir.path().join("disk");
    m.dump_to(payload.clone(), &disk).unwrap();
    let from_disk = m.load_from(&disk).unwrap();

    let fifo = dir.path().join("pipe");
    make_fifo(&fifo);
    let (report, from_fifo) = stream(&m, payload.clone(), &fifo);

    assert_eq!(report.mode, ChannelMode::Streaming);
    assert_eq!(from_fifo, from_disk);
    assert_eq!(from_fifo, payload);
}

#[test]
fn test_streaming_sequence_single_worker() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("pipe");
    make_fifo(&fifo);
    let m = marshaller(1);
    let payload = sample_sequence(200);

    let (report, loaded) = stream(&m, payload.clone(), &fifo);
    assert_eq!(report.manifest.sinks(), &[dir.path().join("pipe_0")]);
    assert_eq!(loaded, payload);
}

#[test]
fn test_streaming_every_backend() {
    let _guard = serial();
    for backend in ["bincode", "msgpack", "json"] {
        let dir = tempfile::tempdir().unwrap();
        let fifo = dir.path().join("pipe");
        make_fifo(&fifo);
        let m = marshaller_with_backend(2, backend);
        let payload = sample_sequence(60);

        let (_, loaded) = stream(&m, payload.clone(), &fifo);
        assert_eq!(loaded, payload, "backend {}", backend);
    }
}

#[test]
fn test_streaming_dump_without_loader_times_out() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("pipe");
    make_fifo(&fifo);
    let m = Marshaller::builder()
        .workers(2)
        .allow_oversubscription()
        .wait_timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let err = m.dump_to(sample_mapping(10), &fifo).unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }), "got {:?}", err);
    assert!(!dir.path().join("pipe_0").exists());
    assert!(!dir.path().join("pipe_1").exists());
}

#[test]
fn test_streaming_load_cancelled_from_another_thread() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("pipe");
    make_fifo(&fifo);
    let token = CancelToken::new();
    let m = Marshaller::builder()
        .sequential()
        .no_timeout()
        .cancel_token(token.clone())
        .build()
        .unwrap();

    let handle = thread::spawn(move || m.load_from(&fifo));
    thread::sleep(Duration::from_millis(200));
    token.cancel();

    let err = handle.join().unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }), "got {:?}", err);
}

#[test]
fn test_anonymous_pipe_channel() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let (read_end, write_end) = nix::unistd::pipe().unwrap();
    let m = marshaller(2);
    let payload = sample_mapping(40);

    let loader = m.clone();
    let handle = thread::spawn(move || {
        let channel = HandleChannel::from_file(File::from(read_end)).unwrap();
        loader.load(channel)
    });

    let channel = HandleChannel::from_file(File::from(write_end))
        .unwrap()
        .with_location(dir.path().join("anon"));
    assert_eq!(ManifestSink::mode(&channel), ChannelMode::Streaming);
    let report = m.dump(payload.clone(), channel).unwrap();

    assert_eq!(report.manifest.sinks()[0], dir.path().join("anon_0"));
    assert_eq!(handle.join().unwrap().unwrap(), payload);
}

#[test]
fn test_streaming_late_shards_wait_for_their_turn() {
    // The loader spends about a second on sink 0; worker 1 must not spend its
    // 300ms bound waiting for a reader while that drain is progressing
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("pipe");
    make_fifo(&fifo);
    let m = trickling_marshaller(2);
    let payload = sample_mapping(50);

    let (report, loaded) = stream(&m, payload.clone(), &fifo);
    assert_eq!(report.workers, 2);
    assert_eq!(loaded, payload);
}

#[test]
fn test_streaming_worker_failure_reported_by_shard() {
    let _guard = serial();
    let dir = tempfile::tempdir().unwrap();
    let fifo = dir.path().join("pipe");
    make_fifo(&fifo);
    let m = marshaller_with(4, Arc::new(FailOnKey(Key::from("c"))));
    // One entry per bin: "a" -> 0, "b" -> 1, "c" -> 2, "d" -> 3
    let payload: Payload = [("a", 39), ("b", 29), ("c", 19), ("d", 9)]
        .into_iter()
        .map(|(k, n)| (Key::from(k), Value::String("v".repeat(n))))
        .collect();

    let loader = m.clone();
    let path = fifo.clone();
    let handle = thread::spawn(move || loader.load_from(&path));

    let started = std::time::Instant::now();
    let err = m.dump_to(payload, &fifo).unwrap_err();
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
    assert!(started.elapsed() < TEST_TIMEOUT / 3, "took {:?}", started.elapsed());

    let load_err = handle.join().unwrap().unwrap_err();
    assert!(matches!(load_err, Error::Deserialize(_)), "got {:?}", load_err);
}
