//! In-memory release host used by `publish --dry-run`.
//!
//! Mirrors the host semantics the publisher relies on: drafts have no tag
//! until published, tag lookups skip drafts, deletes are idempotent. Single
//! operations can be made to fail to exercise error paths.

use super::error::{Error, Result};
use super::host::{Release, ReleaseAsset, ReleaseHost, ReleaseSpec};
use bytes::Bytes;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// Host operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostOperation {
    List,
    FindByTag,
    CreateDraft,
    UploadAsset,
    Publish,
    DeleteRelease,
    DeleteTag,
}

impl HostOperation {
    fn name(self) -> &'static str {
        match self {
            Self::List => "list releases",
            Self::FindByTag => "find release by tag",
            Self::CreateDraft => "create draft",
            Self::UploadAsset => "upload asset",
            Self::Publish => "publish release",
            Self::DeleteRelease => "delete release",
            Self::DeleteTag => "delete tag",
        }
    }
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    releases: Vec<Release>,
    /// tag name -> commit
    tags: BTreeMap<String, String>,
    asset_data: BTreeMap<u64, Bytes>,
    failing: HashSet<HostOperation>,
    journal: Vec<String>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn check(&mut self, op: HostOperation, detail: &str) -> Result<()> {
        self.journal.push(format!("{} {}", op.name(), detail));
        if self.failing.contains(&op) {
            return Err(Error::host(op.name(), "injected failure"));
        }
        Ok(())
    }
}

/// Release host kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryHost {
    state: Mutex<State>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves plain data behind; keep going.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds a published release with one asset, as if created earlier.
    pub fn seed_published(&self, tag: &str, commit: &str, asset_name: &str, data: &[u8]) -> Release {
        let mut state = self.state();
        let release_id = state.next_id();
        let asset_id = state.next_id();
        let release = Release {
            id: release_id,
            tag_name: tag.to_string(),
            name: Some(tag.to_string()),
            body: None,
            draft: false,
            prerelease: false,
            target_commitish: commit.to_string(),
            upload_url: None,
            assets: vec![ReleaseAsset {
                id: asset_id,
                name: asset_name.to_string(),
                size: data.len() as u64,
            }],
        };
        state.tags.insert(tag.to_string(), commit.to_string());
        state.asset_data.insert(asset_id, Bytes::copy_from_slice(data));
        state.releases.push(release.clone());
        release
    }

    /// Makes every later call of `op` fail.
    pub fn fail_on(&self, op: HostOperation) {
        self.state().failing.insert(op);
    }

    pub fn clear_failures(&self) {
        self.state().failing.clear();
    }

    /// Snapshot of all releases.
    pub fn releases(&self) -> Vec<Release> {
        self.state().releases.clone()
    }

    /// Snapshot of all tags and the commits they point to.
    pub fn tags(&self) -> BTreeMap<String, String> {
        self.state().tags.clone()
    }

    /// Uploaded bytes of an asset.
    pub fn asset_data(&self, asset_id: u64) -> Option<Bytes> {
        self.state().asset_data.get(&asset_id).cloned()
    }

    /// Every operation attempted so far, in order.
    pub fn journal(&self) -> Vec<String> {
        self.state().journal.clone()
    }
}

impl ReleaseHost for MemoryHost {
    async fn list_releases(&self) -> Result<Vec<Release>> {
        let mut state = self.state();
        state.check(HostOperation::List, "")?;
        Ok(state.releases.clone())
    }

    async fn find_release_by_tag(&self, tag: &str) -> Result<Option<Release>> {
        let mut state = self.state();
        state.check(HostOperation::FindByTag, tag)?;
        Ok(state
            .releases
            .iter()
            .find(|r| !r.draft && r.tag_name == tag)
            .cloned())
    }

    async fn create_draft(&self, spec: &ReleaseSpec) -> Result<Release> {
        let mut state = self.state();
        state.check(HostOperation::CreateDraft, &spec.tag_name)?;
        let release = Release {
            id: state.next_id(),
            tag_name: spec.tag_name.clone(),
            name: Some(spec.name.clone()),
            body: Some(spec.body.clone()),
            draft: true,
            prerelease: false,
            target_commitish: spec.target_commitish.clone(),
            upload_url: None,
            assets: Vec::new(),
        };
        state.releases.push(release.clone());
        Ok(release)
    }

    async fn upload_asset(&self, release: &Release, name: &str, _content_type: &str, body: Bytes) -> Result<ReleaseAsset> {
        let mut state = self.state();
        state.check(HostOperation::UploadAsset, name)?;
        let asset = ReleaseAsset {
            id: state.next_id(),
            name: name.to_string(),
            size: body.len() as u64,
        };
        let target = state
            .releases
            .iter_mut()
            .find(|r| r.id == release.id)
            .ok_or_else(|| Error::host("upload asset", format!("release {} not found", release.id)))?;
        if target.assets.iter().any(|a| a.name == name) {
            return Err(Error::host("upload asset", format!("asset {} already exists", name)));
        }
        target.assets.push(asset.clone());
        state.asset_data.insert(asset.id, body);
        Ok(asset)
    }

    async fn publish_release(&self, release_id: u64, spec: &ReleaseSpec) -> Result<Release> {
        let mut state = self.state();
        state.check(HostOperation::Publish, &spec.tag_name)?;
        let tags_has = state.tags.contains_key(&spec.tag_name);
        let target = state
            .releases
            .iter_mut()
            .find(|r| r.id == release_id)
            .ok_or_else(|| Error::host("publish release", format!("release {} not found", release_id)))?;
        target.tag_name = spec.tag_name.clone();
        target.name = Some(spec.name.clone());
        target.body = Some(spec.body.clone());
        target.target_commitish = spec.target_commitish.clone();
        target.draft = false;
        target.prerelease = false;
        let published = target.clone();
        // An existing tag is reused as-is, like a real host does
        if !tags_has {
            state
                .tags
                .insert(spec.tag_name.clone(), spec.target_commitish.clone());
        }
        Ok(published)
    }

    async fn delete_release(&self, release_id: u64) -> Result<()> {
        let mut state = self.state();
        state.check(HostOperation::DeleteRelease, &release_id.to_string())?;
        if let Some(pos) = state.releases.iter().position(|r| r.id == release_id) {
            let removed = state.releases.remove(pos);
            for asset in removed.assets {
                state.asset_data.remove(&asset.id);
            }
        }
        Ok(())
    }

    async fn delete_tag(&self, tag: &str) -> Result<()> {
        let mut state = self.state();
        state.check(HostOperation::DeleteTag, tag)?;
        state.tags.remove(tag);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(tag: &str) -> ReleaseSpec {
        ReleaseSpec {
            tag_name: tag.into(),
            name: "n".into(),
            body: "b".into(),
            target_commitish: "abc".into(),
        }
    }

    #[tokio::test]
    async fn drafts_are_invisible_to_tag_lookup() {
        let host = MemoryHost::new();
        let draft = host.create_draft(&spec("latest")).await.unwrap();
        assert!(host.find_release_by_tag("latest").await.unwrap().is_none());
        assert!(host.tags().is_empty());

        host.publish_release(draft.id, &spec("latest")).await.unwrap();
        let found = host.find_release_by_tag("latest").await.unwrap().unwrap();
        assert_eq!(found.id, draft.id);
        assert_eq!(host.tags().get("latest").map(String::as_str), Some("abc"));
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let host = MemoryHost::new();
        host.fail_on(HostOperation::CreateDraft);
        assert!(matches!(
            host.create_draft(&spec("x")).await,
            Err(Error::Host { .. })
        ));
        host.clear_failures();
        assert!(host.create_draft(&spec("x")).await.is_ok());
    }

    #[tokio::test]
    async fn deletes_are_idempotent() {
        let host = MemoryHost::new();
        let seeded = host.seed_published("latest", "old", "a.zip", b"zip");
        host.delete_release(seeded.id).await.unwrap();
        host.delete_release(seeded.id).await.unwrap();
        host.delete_tag("latest").await.unwrap();
        host.delete_tag("latest").await.unwrap();
        assert!(host.releases().is_empty());
        assert!(host.asset_data(seeded.assets[0].id).is_none());
    }
}
