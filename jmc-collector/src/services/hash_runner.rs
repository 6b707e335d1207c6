//! Parallel file hashing
//!
//! Hashing is the only parallel workload. A fixed-size rayon pool (one
//! worker per available core by default) hashes one file per task; results
//! come back in input order whatever order the workers finish in. A failed
//! file never aborts the others: its error takes its slot in the results.
//!
//! The pool blocks its caller. From async code, run it under
//! `tokio::task::spawn_blocking`.

use crate::models::{Collector, Digest};
use crate::services::content_hasher;
use jmc_common::{DigestAlgorithm, Error, Result};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info, warn};

/// A file that could not be hashed
#[derive(Debug)]
pub struct HashFailure {
    pub path: PathBuf,
    pub error: Error,
}

/// Summary of hashing a whole collector
#[derive(Debug, Default)]
pub struct HashReport {
    /// Files that received a digest in this run
    pub files_hashed: usize,
    /// Files skipped because their digest was already known
    pub files_cached: usize,
    pub failures: Vec<HashFailure>,
    /// Items whose digest is now resolved
    pub items_resolved: usize,
    /// Items still missing a digest (at least one member failed)
    pub unresolved_items: Vec<String>,
}

impl HashReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.unresolved_items.is_empty()
    }
}

/// Reusable bounded hashing pool
pub struct HashRunner {
    pool: rayon::ThreadPool,
    algorithm: DigestAlgorithm,
    workers: usize,
}

impl HashRunner {
    /// Build a pool of `workers` threads, or one per available core
    pub fn new(algorithm: DigestAlgorithm, workers: Option<usize>) -> Result<Self> {
        let workers = match workers {
            Some(0) => {
                return Err(Error::Config(
                    "Hash worker count must be greater than zero".to_string(),
                ))
            }
            Some(n) => n,
            None => std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("jmc-hash-{}", i))
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build hash pool: {}", e)))?;

        debug!(workers, algorithm = algorithm.name(), "Hash pool ready");
        Ok(Self {
            pool,
            algorithm,
            workers,
        })
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Hash every path; `results[i]` belongs to `paths[i]`
    pub fn compute_all<P>(&self, paths: &[P]) -> Vec<Result<Digest>>
    where
        P: AsRef<Path> + Sync,
    {
        let total = paths.len();
        let processed = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        let algorithm = self.algorithm;

        let results: Vec<Result<Digest>> = self.pool.install(|| {
            paths
                .par_iter()
                .map(|path| {
                    let result = content_hasher::digest_file(algorithm, path.as_ref());
                    if result.is_err() {
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % 100 == 0 {
                        debug!("Hashing progress: {}/{}", done, total);
                    }
                    result
                })
                .collect()
        });

        debug!(
            total,
            failed = failed.load(Ordering::Relaxed),
            "Hash batch complete"
        );
        results
    }

    /// Hash every file of `collector` that has no digest yet, then fold item
    /// digests
    ///
    /// An item's digest is folded only once every member resolved; items
    /// with a failed member are listed in the report and stay unresolved.
    pub fn hash_collector(&self, collector: &mut Collector) -> HashReport {
        let mut report = HashReport::default();

        let pending: Vec<PathBuf> = collector
            .iter_files()
            .filter(|f| f.digest().is_none())
            .map(|f| collector.absolute_path(f))
            .collect();
        report.files_cached = collector.iter_files().count() - pending.len();

        info!(
            files = pending.len(),
            cached = report.files_cached,
            workers = self.workers,
            "Hashing collector files"
        );
        let start = std::time::Instant::now();
        let results = self.compute_all(&pending);

        // Same traversal and filter as above, so results line up with files.
        let mut results = pending.into_iter().zip(results);
        let algorithm = self.algorithm;
        for item in collector.iter_items_mut() {
            for file in item.files_mut().iter_mut().filter(|f| f.digest().is_none()) {
                let Some((path, result)) = results.next() else {
                    break;
                };
                match result.and_then(|digest| file.set_digest(digest)) {
                    Ok(()) => report.files_hashed += 1,
                    Err(error) => {
                        warn!(path = %path.display(), error = %error, "Failed to hash file");
                        report.failures.push(HashFailure { path, error });
                    }
                }
            }

            match item.resolve_digest(algorithm) {
                Ok(true) => report.items_resolved += 1,
                Ok(false) => report.unresolved_items.push(item.id()),
                Err(error) => {
                    warn!(item = %item.id(), error = %error, "Item digest conflict");
                    report.unresolved_items.push(item.id());
                }
            }
        }

        info!(
            hashed = report.files_hashed,
            failed = report.failures.len(),
            items_resolved = report.items_resolved,
            unresolved = report.unresolved_items.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Hashing complete"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(HashRunner::new(DigestAlgorithm::Sha1, Some(0)).is_err());
    }

    #[test]
    fn test_default_workers() {
        let runner = HashRunner::new(DigestAlgorithm::Sha1, None).unwrap();
        assert!(runner.workers() >= 1);
    }

    #[test]
    fn test_empty_input() {
        let runner = HashRunner::new(DigestAlgorithm::Sha1, Some(2)).unwrap();
        let paths: Vec<PathBuf> = Vec::new();
        assert!(runner.compute_all(&paths).is_empty());
    }
}
