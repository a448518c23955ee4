//! Release host abstraction: the operations the publisher needs from a
//! service that stores tagged releases with downloadable assets.

use super::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// A file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    pub size: u64,
}

/// A release as reported by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: u64,
    pub tag_name: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    #[serde(default)]
    pub target_commitish: String,
    /// Upload endpoint template, when the host uses a separate one
    #[serde(default)]
    pub upload_url: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// Title, notes and target of a release being created or published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseSpec {
    pub tag_name: String,
    pub name: String,
    pub body: String,
    pub target_commitish: String,
}

/// Operations on a release host.
///
/// Implementations: [`super::GitHubHost`] for real publications and
/// [`super::MemoryHost`] for dry runs.
pub trait ReleaseHost: Send + Sync {
    /// Every release, drafts included.
    fn list_releases(&self) -> impl Future<Output = Result<Vec<Release>>> + Send;

    /// The published release carrying `tag`, if any. Drafts are never
    /// returned.
    fn find_release_by_tag(&self, tag: &str) -> impl Future<Output = Result<Option<Release>>> + Send;

    /// Creates a draft, non-prerelease release.
    fn create_draft(&self, spec: &ReleaseSpec) -> impl Future<Output = Result<Release>> + Send;

    /// Attaches `body` to `release` as asset `name`.
    fn upload_asset(
        &self,
        release: &Release,
        name: &str,
        content_type: &str,
        body: Bytes,
    ) -> impl Future<Output = Result<ReleaseAsset>> + Send;

    /// Turns a draft into the published, non-prerelease, latest release.
    fn publish_release(&self, release_id: u64, spec: &ReleaseSpec) -> impl Future<Output = Result<Release>> + Send;

    /// Deletes a release. Deleting a missing release succeeds.
    fn delete_release(&self, release_id: u64) -> impl Future<Output = Result<()>> + Send;

    /// Deletes a git tag. Deleting a missing tag succeeds.
    fn delete_tag(&self, tag: &str) -> impl Future<Output = Result<()>> + Send;
}
