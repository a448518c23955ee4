//! Replaces the release under a label with a freshly staged artifact.
//!
//! The new release is fully assembled as a draft under a unique staging tag
//! before the old one is touched. Only then is the old release removed and the
//! draft published under the label. A closing sweep removes duplicates left by
//! interrupted or concurrent runs, so the host converges to one release per
//! label.

use super::config::NotesConfig;
use super::error::{ErrorExt, Result};
use super::host::{Release, ReleaseHost, ReleaseSpec};
use super::staging::StagedArtifact;
use bytes::Bytes;
use handlebars::Handlebars;
use serde::Serialize;

/// Rendered release title and body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseNotes {
    pub name: String,
    pub body: String,
}

/// Values available to the notes template.
#[derive(Debug, Clone, Serialize)]
pub struct NotesContext<'a> {
    pub label: &'a str,
    pub commit: &'a str,
    pub platform: &'a str,
    pub date: String,
    pub asset: &'a str,
}

/// Renders the configured title and body.
pub fn render_notes(config: &NotesConfig, context: &NotesContext<'_>) -> Result<ReleaseNotes> {
    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    Ok(ReleaseNotes {
        name: handlebars.render_template(&config.name, context)?,
        body: handlebars.render_template(&config.body, context)?,
    })
}

/// What a publication did.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// The release now carrying the label
    pub release: Release,
    /// Previous release under the label, if one was removed
    pub replaced: Option<u64>,
    /// Leftover releases removed by the sweep
    pub swept: Vec<u64>,
    /// Tolerated failures during cleanup
    pub warnings: Vec<String>,
}

/// Publishes artifacts under one label on one host.
pub struct Publisher<'h, H> {
    host: &'h H,
    label: String,
}

impl<'h, H: ReleaseHost> Publisher<'h, H> {
    pub fn new(host: &'h H, label: impl Into<String>) -> Self {
        Self {
            host,
            label: label.into(),
        }
    }

    fn staging_prefix(&self) -> String {
        format!("{}-staging-", self.label)
    }

    /// Publishes `artifact` as the sole asset of the release under the label.
    ///
    /// # Arguments
    ///
    /// * `artifact` - Staged archive to upload
    /// * `notes` - Release title and body
    /// * `commit` - Commit (or branch) the label tag is created at
    ///
    /// # Returns
    ///
    /// The publication outcome. Errors before the old release is removed
    /// leave it untouched.
    pub async fn publish(
        &self,
        artifact: &StagedArtifact,
        notes: &ReleaseNotes,
        commit: &str,
    ) -> Result<PublishOutcome> {
        let mut warnings = Vec::new();
        let data = Bytes::from(
            tokio::fs::read(&artifact.path)
                .await
                .fs_context("reading staged artifact", &artifact.path)?,
        );

        // 1. Assemble the replacement as a draft
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let staging_tag = format!("{}{}", self.staging_prefix(), &suffix[..8]);
        let draft_spec = ReleaseSpec {
            tag_name: staging_tag.clone(),
            name: notes.name.clone(),
            body: notes.body.clone(),
            target_commitish: commit.to_string(),
        };
        log::info!("Creating draft release {}", staging_tag);
        let draft = self.host.create_draft(&draft_spec).await?;

        log::info!(
            "Uploading {} ({} bytes) to draft {}",
            artifact.name,
            data.len(),
            draft.id
        );
        if let Err(e) = self
            .host
            .upload_asset(&draft, &artifact.name, artifact.format.content_type(), data)
            .await
        {
            log::error!("Asset upload failed: {}", e);
            if let Err(cleanup) = self.host.delete_release(draft.id).await {
                log::warn!("Failed to remove draft {}: {}", draft.id, cleanup);
            }
            return Err(e);
        }

        // 2. Remove the previous publication; failures are tolerated
        let replaced = match self.host.find_release_by_tag(&self.label).await {
            Ok(Some(existing)) => {
                log::info!("Deleting previous '{}' release {}", self.label, existing.id);
                match self.host.delete_release(existing.id).await {
                    Ok(()) => Some(existing.id),
                    Err(e) => {
                        warn(&mut warnings, format!("could not delete release {}: {}", existing.id, e));
                        None
                    }
                }
            }
            Ok(None) => {
                log::info!("No previous '{}' release found", self.label);
                None
            }
            Err(e) => {
                warn(&mut warnings, format!("could not look up '{}' release: {}", self.label, e));
                None
            }
        };
        if let Err(e) = self.host.delete_tag(&self.label).await {
            warn(&mut warnings, format!("could not delete tag '{}': {}", self.label, e));
        }

        // 3. Publish the draft under the label
        let publish_spec = ReleaseSpec {
            tag_name: self.label.clone(),
            ..draft_spec
        };
        let release = self
            .host
            .publish_release(draft.id, &publish_spec)
            .await
            .inspect_err(|e| log::error!("Publishing draft {} failed: {}", draft.id, e))?;
        log::info!("Published release {} as '{}' at {}", release.id, self.label, commit);

        // 4. Converge: nothing else may carry the label or a staging tag
        let swept = self.sweep(release.id, &mut warnings).await;

        Ok(PublishOutcome {
            release,
            replaced,
            swept,
            warnings,
        })
    }

    async fn sweep(&self, keep: u64, warnings: &mut Vec<String>) -> Vec<u64> {
        let releases = match self.host.list_releases().await {
            Ok(releases) => releases,
            Err(e) => {
                warn(warnings, format!("could not list releases for cleanup: {}", e));
                return Vec::new();
            }
        };

        let prefix = self.staging_prefix();
        let mut swept = Vec::new();
        for release in releases {
            let stale = release.id != keep
                && (release.tag_name == self.label || release.tag_name.starts_with(&prefix));
            if !stale {
                continue;
            }
            log::info!("Removing leftover release {} ({})", release.id, release.tag_name);
            match self.host.delete_release(release.id).await {
                Ok(()) => swept.push(release.id),
                Err(e) => {
                    warn(warnings, format!("could not delete leftover release {}: {}", release.id, e));
                    continue;
                }
            }
            // The label tag now belongs to the new release
            if !release.draft && release.tag_name != self.label {
                if let Err(e) = self.host.delete_tag(&release.tag_name).await {
                    warn(warnings, format!("could not delete tag '{}': {}", release.tag_name, e));
                }
            }
        }
        swept
    }
}

fn warn(warnings: &mut Vec<String>, message: String) {
    log::warn!("{}", message);
    warnings.push(message);
}
