use super::error::{ModuleReadError, Result};
use super::module::ContentDigest;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Computes a fixed-length digest of a file's bytes
///
/// Must be deterministic: identical bytes always give the same digest.
pub trait ContentHasher: Send + Sync {
    fn hash(&self, path: &Path) -> Result<ContentDigest>;
}

/// Streaming SHA-256 over the file contents
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl ContentHasher for Sha256Hasher {
    fn hash(&self, path: &Path) -> Result<ContentDigest> {
        let mut file = File::open(path).map_err(|e| ModuleReadError::from_io(path, e))?;
        let mut hasher = Sha256::new();
        io::copy(&mut file, &mut hasher).map_err(|e| ModuleReadError::from_io(path, e))?;
        Ok(ContentDigest::new(hasher.finalize().into()))
    }
}
