//! Primary Channel Tests
//!
//! Manifest exchange through paths and caller-owned handles.

use crate::*;
use shardline::Manifest;
use std::fs;
use std::io::Cursor;

#[test]
fn test_handle_channel_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let m = marshaller(3);
    let payload = sample_mapping(30);

    let sink = HandleChannel::new(Vec::new(), ChannelMode::Disk).with_location(dir.path().join("mem"));
    let report = m.dump(payload.clone(), sink).unwrap();
    let text = report.manifest.encode().unwrap();

    let source = HandleChannel::new(Cursor::new(text.into_bytes()), ChannelMode::Disk);
    let (loaded, load_report) = m.load_with_report(source).unwrap();
    assert_eq!(loaded, payload);
    assert_eq!(load_report.shards, 3);
    assert_eq!(load_report.entries, payload.len());
}

#[test]
fn test_handle_without_location_uses_sink_base() {
    let dir = tempfile::tempdir().unwrap();
    let m = Marshaller::builder()
        .workers(2)
        .allow_oversubscription()
        .sink_base(dir.path().join("base"))
        .build()
        .unwrap();

    let report = m
        .dump(sample_sequence(10), HandleChannel::new(Vec::new(), ChannelMode::Disk))
        .unwrap();
    assert_eq!(
        report.manifest.sinks(),
        &[dir.path().join("base_0"), dir.path().join("base_1")]
    );
}

#[test]
fn test_handle_without_location_or_sink_base() {
    let err = marshaller(2)
        .dump(sample_sequence(10), HandleChannel::new(Vec::new(), ChannelMode::Disk))
        .unwrap_err();
    assert!(err.is_configuration(), "got {:?}", err);
}

#[test]
fn test_file_channel_overwrites_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    fs::write(&channel, "stale contents\n").unwrap();

    let m = marshaller(2);
    let payload = sample_sequence(15);
    m.dump(payload.clone(), FileChannel::new(&channel).unwrap())
        .unwrap();

    let text = fs::read_to_string(&channel).unwrap();
    assert!(!text.contains("stale"));
    assert_eq!(m.load(FileChannel::new(&channel).unwrap()).unwrap(), payload);
}

#[test]
fn test_manifest_lists_absolute_sinks_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let channel = dir.path().join("run");
    marshaller(3).dump_to(sample_mapping(5), &channel).unwrap();

    let manifest = Manifest::parse(&fs::read_to_string(&channel).unwrap()).unwrap();
    assert_eq!(manifest.len(), 3);
    for (i, sink) in manifest.sinks().iter().enumerate() {
        assert_eq!(sink, &dir.path().join(format!("run_{}", i)));
    }
}

#[test]
fn test_channel_mode_detection() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("file");
    let fifo = dir.path().join("fifo");
    fs::write(&file, b"").unwrap();
    make_fifo(&fifo);

    assert_eq!(ChannelMode::detect(&file).unwrap(), ChannelMode::Disk);
    assert_eq!(ChannelMode::detect(&fifo).unwrap(), ChannelMode::Streaming);
    assert_eq!(
        ChannelMode::detect(&dir.path().join("absent")).unwrap(),
        ChannelMode::Disk
    );
    assert!(ChannelMode::detect(dir.path()).is_err());
}
