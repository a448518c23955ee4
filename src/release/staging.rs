//! Stages the release artifact under its final name.

use super::archive::create_archive;
use super::checksum::calculate_sha256;
use super::config::ArchiveFormat;
use super::error::{ErrorExt, Result};
use std::path::{Path, PathBuf};

/// Archive ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedArtifact {
    /// File name, also used as the release asset name
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub sha256: String,
    pub format: ArchiveFormat,
}

impl StagedArtifact {
    pub fn checksum_path(&self) -> PathBuf {
        checksum_path(&self.path)
    }
}

fn checksum_path(artifact: &Path) -> PathBuf {
    let mut name = artifact.as_os_str().to_os_string();
    name.push(".sha256");
    PathBuf::from(name)
}

/// Writes archives into the artifact directory.
pub struct ArtifactStager {
    artifact_dir: PathBuf,
}

impl ArtifactStager {
    /// Creates a stager for `artifact_dir`, which is created on demand.
    pub fn new(artifact_dir: PathBuf) -> Self {
        Self { artifact_dir }
    }

    /// Archives `bundle_dir` as `name` and moves it into place.
    ///
    /// # Arguments
    ///
    /// * `bundle_dir` - Build output to compress
    /// * `name` - Final artifact file name, extension included
    /// * `format` - Archive container format
    ///
    /// # Returns
    ///
    /// The staged artifact. The archive is built under a temporary name and
    /// renamed, so the final path either holds a complete archive or the
    /// previous one.
    pub async fn stage(&self, bundle_dir: &Path, name: &str, format: ArchiveFormat) -> Result<StagedArtifact> {
        tokio::fs::create_dir_all(&self.artifact_dir)
            .await
            .fs_context("creating artifact directory", &self.artifact_dir)?;

        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let temp_path = self.artifact_dir.join(format!(".{}.{}.tmp", name, &suffix[..8]));
        let final_path = self.artifact_dir.join(name);

        let size = match create_archive(bundle_dir, &temp_path, format).await {
            Ok(size) => size,
            Err(e) => {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e);
            }
        };
        let sha256 = calculate_sha256(&temp_path).await?;

        // rename() replaces on unix; windows needs the target gone first
        #[cfg(windows)]
        if tokio::fs::try_exists(&final_path).await.unwrap_or(false) {
            tokio::fs::remove_file(&final_path)
                .await
                .fs_context("removing previous artifact", &final_path)?;
        }
        tokio::fs::rename(&temp_path, &final_path)
            .await
            .fs_context("moving artifact into place", &final_path)?;

        let sidecar = checksum_path(&final_path);
        tokio::fs::write(&sidecar, format!("{}  {}\n", sha256, name))
            .await
            .fs_context("writing checksum file", &sidecar)?;

        log::info!(
            "Staged {} ({} bytes, sha256={})",
            final_path.display(),
            size,
            sha256
        );
        Ok(StagedArtifact {
            name: name.to_string(),
            path: final_path,
            size,
            sha256,
            format,
        })
    }
}
