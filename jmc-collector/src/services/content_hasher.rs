//! Content hashing
//!
//! Digests identify content: hashing identical bytes always yields the same
//! digest. A directory item is identified by the digest of its canonical
//! table, one `"<digest> <relative_path>"` line per member in sorted-path
//! order, joined with `\n`.

use crate::models::{Digest, File};
use jmc_common::{DigestAlgorithm, Error, Result};
use sha1::Sha1;
use sha2::{Digest as _, Sha256};
use std::io::{ErrorKind, Read};
use std::path::Path;

/// Read size for streaming file content (1MB)
const CHUNK_SIZE: usize = 1024 * 1024;

/// Digest of an in-memory byte slice
pub fn digest_bytes(algorithm: DigestAlgorithm, bytes: &[u8]) -> Digest {
    let hex = match algorithm {
        DigestAlgorithm::Sha1 => format!("{:x}", Sha1::digest(bytes)),
        DigestAlgorithm::Sha256 => format!("{:x}", Sha256::digest(bytes)),
    };
    Digest::from_hasher_output(hex)
}

/// Digest of everything a reader yields
pub fn digest_reader<R: Read>(algorithm: DigestAlgorithm, reader: R) -> std::io::Result<Digest> {
    let hex = match algorithm {
        DigestAlgorithm::Sha1 => format!("{:x}", stream::<Sha1, R>(reader)?.finalize()),
        DigestAlgorithm::Sha256 => format!("{:x}", stream::<Sha256, R>(reader)?.finalize()),
    };
    Ok(Digest::from_hasher_output(hex))
}

/// Digest of a file's content
///
/// An unreadable file is reported as [`Error::HashIo`] carrying the path.
pub fn digest_file(algorithm: DigestAlgorithm, path: &Path) -> Result<Digest> {
    let file = std::fs::File::open(path).map_err(|e| Error::hash_io(path, e))?;
    let digest = digest_reader(algorithm, file).map_err(|e| Error::hash_io(path, e))?;

    tracing::trace!(path = %path.display(), digest = %digest, "Hashed file");
    Ok(digest)
}

/// Canonical table of a set of files
///
/// Files are ordered by relative path here, so the table never depends on
/// the order the caller passes them in.
pub fn digest_table(files: &[File]) -> String {
    let mut sorted: Vec<&File> = files.iter().collect();
    sorted.sort_by(|a, b| a.relative_path().cmp(b.relative_path()));
    sorted
        .iter()
        .map(|f| f.table_line())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Digest of the canonical table of `files`
pub fn composite_digest(algorithm: DigestAlgorithm, files: &[File]) -> Digest {
    digest_bytes(algorithm, digest_table(files).as_bytes())
}

/// Feed `reader` through a fresh hasher in fixed-size chunks
fn stream<D: sha2::Digest, R: Read>(mut reader: R) -> std::io::Result<D> {
    let mut hasher = D::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher)
}
