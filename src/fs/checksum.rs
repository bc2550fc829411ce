//! Streaming file checksums for copy verification.

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};

use crate::utils::errors::{BackupError, Result};

/// Read size for the digest loop; bounds memory on arbitrarily large data
/// files.
const BLOCK_SIZE: usize = 1024 * 1024;

/// Content digest of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileDigest([u8; 32]);

impl fmt::Display for FileDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Compute the SHA-256 digest of a file, reading it in fixed-size blocks.
pub fn digest(path: &Path) -> Result<FileDigest> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BLOCK_SIZE];

    loop {
        let read = file.read(&mut buffer)?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(FileDigest(hasher.finalize().into()))
}

/// Compare two regular files by digest.
///
/// Both paths must exist and be regular files; anything else is a caller
/// error, not an I/O condition.
pub fn files_match(a: &Path, b: &Path) -> Result<bool> {
    for path in [a, b] {
        if !path.is_file() {
            return Err(BackupError::Precondition(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
    }

    Ok(digest(a)? == digest(b)?)
}
