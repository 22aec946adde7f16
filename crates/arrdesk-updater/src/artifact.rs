//! Artifact verification.
//!
//! Checks downloaded update artifacts against the size and SHA-256 digest
//! the release feed published. Digests are compared in constant time.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::UpdateError;
use crate::release::ReleaseAsset;

/// Buffer size for reading files during hash computation.
const HASH_BUFFER_SIZE: usize = 8192;

/// Parse a hex SHA-256 digest.
pub fn parse_sha256(hex_digest: &str) -> Result<[u8; 32], UpdateError> {
    let bytes = hex::decode(hex_digest.trim())
        .map_err(|e| UpdateError::Parse(format!("invalid sha256 digest: {e}")))?;
    bytes
        .try_into()
        .map_err(|_| UpdateError::Parse("sha256 digest must be 32 bytes".to_string()))
}

/// Compute the SHA-256 hash of a file.
pub fn compute_hash(path: &Path) -> Result<[u8; 32], UpdateError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; HASH_BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hasher.finalize().into())
}

/// What a downloaded artifact must look like.
///
/// Either check is skipped when the feed did not publish the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactVerifier {
    expected_size: Option<u64>,
    expected_hash: Option<[u8; 32]>,
}

impl ArtifactVerifier {
    pub fn new(expected_size: Option<u64>, expected_hash: Option<[u8; 32]>) -> Self {
        Self {
            expected_size,
            expected_hash,
        }
    }

    /// Build a verifier from a release asset.
    pub fn for_asset(asset: &ReleaseAsset) -> Result<Self, UpdateError> {
        let expected_hash = asset.sha256.as_deref().map(parse_sha256).transpose()?;
        Ok(Self::new(asset.size, expected_hash))
    }

    pub fn expected_size(&self) -> Option<u64> {
        self.expected_size
    }

    /// Check a byte count against the expected size.
    pub fn verify_size(&self, actual: u64) -> Result<(), UpdateError> {
        match self.expected_size {
            Some(expected) if expected != actual => {
                tracing::error!(expected, actual, "Artifact size mismatch");
                Err(UpdateError::SizeMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }

    /// Check a computed digest against the expected hash.
    pub fn verify_hash(&self, actual: &[u8; 32]) -> Result<(), UpdateError> {
        let Some(expected) = &self.expected_hash else {
            return Ok(());
        };
        if actual.ct_eq(expected).unwrap_u8() != 1 {
            tracing::error!(
                expected = %hex::encode(expected),
                actual = %hex::encode(actual),
                "Artifact hash mismatch"
            );
            return Err(UpdateError::HashMismatch {
                expected: hex::encode(expected),
                actual: hex::encode(actual),
            });
        }
        Ok(())
    }

    /// Verify a file on disk.
    pub fn verify(&self, path: &Path) -> Result<(), UpdateError> {
        let size = std::fs::metadata(path)?.len();
        self.verify_size(size)?;
        if self.expected_hash.is_some() {
            self.verify_hash(&compute_hash(path)?)?;
        }
        tracing::debug!(path = %path.display(), size, "Artifact verified");
        Ok(())
    }
}
