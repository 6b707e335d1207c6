//! Content hashing: file digests, directory digests and the parallel runner

use std::collections::BTreeMap;
use std::path::Path;

use jmc_collector::services::content_hasher::{composite_digest, digest_bytes, digest_file};
use jmc_collector::services::{FileScanner, HashRunner};
use jmc_collector::{File, Item, Value};
use jmc_common::{CollectionRule, DigestAlgorithm, Error};
use tempfile::TempDir;

fn hashed_file(path: &str, relative: &str, content: &[u8]) -> File {
    File::new(path, relative, content.len() as u64)
        .with_digest(digest_bytes(DigestAlgorithm::Sha1, content))
}

fn album(order: &[usize]) -> Item {
    let members = [
        ("cover.jpg", b"jpeg".as_slice()),
        ("disc1/track01.flac", b"first".as_slice()),
        ("disc1/track02.flac", b"second".as_slice()),
    ];
    let files = order
        .iter()
        .map(|&i| {
            let (rel, content) = members[i];
            hashed_file(&format!("music/album/{}", rel), rel, content)
        })
        .collect();
    Item::directory("music", "album", files, Value::default()).unwrap()
}

#[test]
fn test_directory_digest_ignores_discovery_order() {
    let mut a = album(&[0, 1, 2]);
    let mut b = album(&[2, 0, 1]);
    assert!(a.resolve_digest(DigestAlgorithm::Sha1).unwrap());
    assert!(b.resolve_digest(DigestAlgorithm::Sha1).unwrap());
    assert_eq!(a.digest(), b.digest());
}

#[test]
fn test_directory_digest_depends_on_names() {
    let files = vec![hashed_file("music/x/a", "a", b"same")];
    let renamed = vec![hashed_file("music/x/b", "b", b"same")];
    assert_ne!(
        composite_digest(DigestAlgorithm::Sha1, &files),
        composite_digest(DigestAlgorithm::Sha1, &renamed)
    );
}

#[test]
fn test_file_digest_deterministic() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("data.bin");
    std::fs::write(&path, b"abc").unwrap();

    let first = digest_file(DigestAlgorithm::Sha1, &path).unwrap();
    let second = digest_file(DigestAlgorithm::Sha1, &path).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.as_str(), "a9993e364706816aba3e25717850c26c9cd0d89d");

    let sha256 = digest_file(DigestAlgorithm::Sha256, &path).unwrap();
    assert_eq!(sha256.as_str().len(), 64);
}

#[test]
fn test_missing_file_is_hash_io_error() {
    match digest_file(DigestAlgorithm::Sha1, Path::new("/nonexistent/file.bin")) {
        Err(Error::HashIo { path, .. }) => assert_eq!(path, Path::new("/nonexistent/file.bin")),
        other => panic!("Expected HashIo error, got {:?}", other),
    }
}

#[test]
fn test_compute_all_keeps_positions() {
    let temp_dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..50 {
        let path = temp_dir.path().join(format!("f{:02}", i));
        if i != 17 {
            std::fs::write(&path, format!("content {}", i)).unwrap();
        }
        paths.push(path);
    }

    let runner = HashRunner::new(DigestAlgorithm::Sha1, Some(4)).unwrap();
    let results = runner.compute_all(&paths);
    assert_eq!(results.len(), paths.len());

    for (i, result) in results.iter().enumerate() {
        if i == 17 {
            assert!(result.is_err());
        } else {
            let expected = digest_bytes(DigestAlgorithm::Sha1, format!("content {}", i).as_bytes());
            assert_eq!(result.as_ref().unwrap(), &expected);
        }
    }
}

#[test]
fn test_hash_collector_resolves_items() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("docs")).unwrap();
    std::fs::write(root.join("docs/a.txt"), b"alpha").unwrap();
    std::fs::write(root.join("docs/b.txt"), b"beta").unwrap();
    std::fs::create_dir_all(root.join("photos/2024")).unwrap();
    std::fs::write(root.join("photos/2024/img.raw"), b"pixels").unwrap();

    let mut collections = BTreeMap::new();
    collections.insert("docs".to_string(), CollectionRule::Files);
    collections.insert("photos".to_string(), CollectionRule::Directories);
    let mut collector = FileScanner::new().scan_collector(root, &collections).unwrap();

    let runner = HashRunner::new(DigestAlgorithm::Sha1, Some(2)).unwrap();
    let report = runner.hash_collector(&mut collector);
    assert!(report.is_complete());
    assert_eq!(report.files_hashed, 3);
    assert_eq!(report.items_resolved, 3);

    let doc = collector.find_item("docs/a.txt").unwrap();
    assert_eq!(doc.digest(), Some(&digest_bytes(DigestAlgorithm::Sha1, b"alpha")));
    assert!(collector.find_item("photos/2024").unwrap().digest().is_some());

    // Already known digests are not recomputed
    let again = runner.hash_collector(&mut collector);
    assert_eq!(again.files_hashed, 0);
    assert_eq!(again.files_cached, 3);
}

#[test]
fn test_hash_collector_reports_failures() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    std::fs::create_dir_all(root.join("photos/trip")).unwrap();
    std::fs::write(root.join("photos/trip/one.jpg"), b"one").unwrap();
    std::fs::write(root.join("photos/trip/two.jpg"), b"two").unwrap();

    let mut collections = BTreeMap::new();
    collections.insert("photos".to_string(), CollectionRule::Directories);
    let mut collector = FileScanner::new().scan_collector(root, &collections).unwrap();

    // Vanishes between crawl and hash
    std::fs::remove_file(root.join("photos/trip/two.jpg")).unwrap();

    let report = HashRunner::new(DigestAlgorithm::Sha1, Some(2))
        .unwrap()
        .hash_collector(&mut collector);
    assert!(!report.is_complete());
    assert_eq!(report.files_hashed, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.unresolved_items, vec!["photos/trip".to_string()]);
    assert!(collector.find_item("photos/trip").unwrap().digest().is_none());
}
