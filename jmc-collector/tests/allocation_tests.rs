//! Volume allocation over a crawled collector
//!
//! Builds a small archive on disk, hashes it, and runs successive
//! allocations to check scoring, packing and history bookkeeping.

use std::path::Path;

use jmc_collector::services::{FileScanner, HashRunner, VolumeAllocator};
use jmc_collector::{Collector, VolumeId};
use jmc_common::{CollectionRule, DigestAlgorithm, Error};
use std::collections::BTreeMap;
use tempfile::TempDir;

/// Directory item with one file of `size` bytes and a `.jmtag` value
fn make_item(root: &Path, name: &str, value: u8, size: usize) {
    let dir = root.join("projects").join(name);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("data.bin"), vec![value; size]).unwrap();
    std::fs::write(dir.join(".jmtag"), format!("value = {}\n", value)).unwrap();
}

fn scan_and_hash(root: &Path) -> Collector {
    let mut collections = BTreeMap::new();
    collections.insert("projects".to_string(), CollectionRule::Directories);
    let mut collector = FileScanner::new().scan_collector(root, &collections).unwrap();

    let report = HashRunner::new(DigestAlgorithm::Sha1, Some(2))
        .unwrap()
        .hash_collector(&mut collector);
    assert!(report.is_complete(), "unexpected hash failures: {:?}", report.failures);
    collector
}

fn archive() -> TempDir {
    let temp_dir = TempDir::new().unwrap();
    make_item(temp_dir.path(), "ten", 10, 100);
    make_item(temp_dir.path(), "one", 1, 100);
    make_item(temp_dir.path(), "five", 5, 100);
    temp_dir
}

#[test]
fn test_first_volume_prefers_high_value() {
    let temp_dir = archive();
    let mut collector = scan_and_hash(temp_dir.path());
    let allocator = VolumeAllocator::new(250).unwrap();

    let plan = allocator.plan(collector.iter_items(), 0).unwrap();
    assert_eq!(plan.volume_id, VolumeId::FIRST);
    assert_eq!(plan.member_ids(), vec!["projects/ten", "projects/five"]);
    assert_eq!(plan.used_bytes, 200);
    assert_eq!(plan.deferred.len(), 1);
    assert_eq!(plan.deferred[0].id, "projects/one");

    let sealed = allocator.allocate_next_volume(&mut collector).unwrap();
    assert_eq!(sealed.volume.id(), VolumeId::FIRST);
    assert_eq!(sealed.volume.size(), 200);
    assert_eq!(sealed.deferred, vec!["projects/one".to_string()]);
    assert_eq!(collector.total_volumes(), 1);

    let ten = collector.find_item("projects/ten").unwrap();
    assert_eq!(ten.volumes(), &[VolumeId::FIRST]);
    let one = collector.find_item("projects/one").unwrap();
    assert!(one.volumes().is_empty());
}

#[test]
fn test_second_volume_rotates_in_deferred_items() {
    let temp_dir = archive();
    let mut collector = scan_and_hash(temp_dir.path());
    let allocator = VolumeAllocator::new(250).unwrap();
    allocator.allocate_next_volume(&mut collector).unwrap();

    let plan = allocator
        .plan(collector.iter_items(), collector.total_volumes())
        .unwrap();
    let alphas: Vec<(String, f64)> = plan
        .members
        .iter()
        .chain(plan.deferred.iter())
        .map(|s| (s.id.clone(), s.alpha))
        .collect();

    // Value 10 always scores 1; value 5 was just stored once
    assert_eq!(alphas[0], ("projects/ten".to_string(), 1.0));
    assert_eq!(alphas[1].0, "projects/one");
    assert!((alphas[1].1 - 0.1).abs() < 1e-12);
    assert_eq!(alphas[2], ("projects/five".to_string(), -0.5));

    let sealed = allocator.allocate_next_volume(&mut collector).unwrap();
    assert_eq!(sealed.volume.id(), VolumeId::new(2));
    assert_eq!(
        sealed.volume.members(),
        &["projects/ten".to_string(), "projects/one".to_string()]
    );

    let ten = collector.find_item("projects/ten").unwrap();
    assert_eq!(ten.volumes(), &[VolumeId::new(1), VolumeId::new(2)]);
    collector.validate_history().unwrap();
}

#[test]
fn test_huge_item_never_allocated() {
    let temp_dir = archive();
    make_item(temp_dir.path(), "big", 10, 300);
    let mut collector = scan_and_hash(temp_dir.path());
    let allocator = VolumeAllocator::new(250).unwrap();

    for _ in 0..3 {
        let sealed = allocator.allocate_next_volume(&mut collector).unwrap();
        assert_eq!(sealed.skipped_huge, vec!["projects/big".to_string()]);
        assert!(!sealed.volume.contains("projects/big"));
        assert!(sealed.volume.size() <= allocator.capacity());
    }
    assert!(collector.find_item("projects/big").unwrap().volumes().is_empty());
}

#[test]
fn test_volumes_respect_capacity() {
    let temp_dir = TempDir::new().unwrap();
    for (i, size) in [120usize, 80, 60, 45, 30, 10].iter().enumerate() {
        make_item(temp_dir.path(), &format!("item{}", i), (i as u8 % 10) + 1, *size);
    }
    let mut collector = scan_and_hash(temp_dir.path());
    let allocator = VolumeAllocator::new(150).unwrap();

    for _ in 0..5 {
        let sealed = allocator.allocate_next_volume(&mut collector).unwrap();
        let member_size: u64 = sealed
            .volume
            .members()
            .iter()
            .map(|id| collector.find_item(id).unwrap().size())
            .sum();
        assert_eq!(member_size, sealed.volume.size());
        assert!(member_size <= 150);
    }
    collector.validate_history().unwrap();
}

#[test]
fn test_unhashed_items_are_held_back() {
    let temp_dir = archive();
    let mut collections = BTreeMap::new();
    collections.insert("projects".to_string(), CollectionRule::Directories);
    let mut collector = FileScanner::new()
        .scan_collector(temp_dir.path(), &collections)
        .unwrap();

    let allocator = VolumeAllocator::new(250).unwrap();
    let sealed = allocator.allocate_next_volume(&mut collector).unwrap();
    assert!(sealed.volume.members().is_empty());
    assert_eq!(sealed.unresolved.len(), 3);
}

#[test]
fn test_unhashed_huge_item_still_listed_as_huge() {
    let temp_dir = TempDir::new().unwrap();
    make_item(temp_dir.path(), "big", 10, 300);
    let mut collections = BTreeMap::new();
    collections.insert("projects".to_string(), CollectionRule::Directories);
    let collector = FileScanner::new()
        .scan_collector(temp_dir.path(), &collections)
        .unwrap();

    let plan = VolumeAllocator::new(250)
        .unwrap()
        .plan(collector.iter_items(), 0)
        .unwrap();
    assert_eq!(plan.skipped_huge, vec!["projects/big".to_string()]);
    assert!(plan.unresolved.is_empty());
}

#[test]
fn test_zero_capacity_rejected() {
    match VolumeAllocator::new(0) {
        Err(Error::PreconditionViolation(_)) => {}
        other => panic!("Expected PreconditionViolation, got {:?}", other),
    }
}
