//! SHA-256 of staged archives.

use super::error::{ErrorExt, Result};
use crate::bail;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK: usize = 64 * 1024;

/// Hex SHA-256 of a file.
///
/// # Arguments
///
/// * `path` - Archive to hash
///
/// # Returns
///
/// Lowercase hex digest (64 characters).
pub async fn calculate_sha256(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path)
        .await
        .fs_context("reading metadata for hashing", path)?;
    if !metadata.is_file() {
        bail!("Cannot hash {}: not a regular file", path.display());
    }

    let mut file = tokio::fs::File::open(path)
        .await
        .fs_context("opening file for hashing", path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; CHUNK];
    let mut total = 0u64;
    loop {
        let n = file
            .read(&mut buffer)
            .await
            .fs_context("reading file for hashing", path)?;
        if n == 0 {
            break;
        }
        hasher.update(&buffer[..n]);
        total += n as u64;
    }
    if total != metadata.len() {
        bail!("{} changed while hashing", path.display());
    }
    Ok(format!("{:x}", hasher.finalize()))
}
