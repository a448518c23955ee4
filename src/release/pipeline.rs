//! build -> archive -> stage -> publish, for one platform.

use super::build::BuildRunner;
use super::config::{ReleaseConfig, TargetPlatform};
use super::error::Result;
use super::host::ReleaseHost;
use super::lock::PublishLock;
use super::publisher::{NotesContext, PublishOutcome, Publisher, render_notes};
use super::staging::{ArtifactStager, StagedArtifact};
use super::trigger::Trigger;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Default wait for a concurrent publication of the same label.
pub const DEFAULT_LOCK_WAIT: Duration = Duration::from_secs(600);

/// Per-run inputs that are not part of `release.toml`.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub workspace: PathBuf,
    pub platform: TargetPlatform,
    /// Target commit; resolved from CI or git when absent
    pub commit: Option<String>,
    pub lock_wait: Duration,
}

/// Result of a pipeline run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The trigger does not publish
    Skipped { reason: String },
    Published {
        artifact: StagedArtifact,
        commit: String,
        outcome: PublishOutcome,
    },
}

/// Release pipeline for one platform.
pub struct ReleasePipeline<'a> {
    config: &'a ReleaseConfig,
    options: PipelineOptions,
}

impl<'a> ReleasePipeline<'a> {
    pub fn new(config: &'a ReleaseConfig, options: PipelineOptions) -> Self {
        Self { config, options }
    }

    /// Runs every stage against `host`.
    ///
    /// The build and staging happen before the lock is taken and before the
    /// host is contacted, so a failed build never changes the host.
    pub async fn run<H: ReleaseHost>(&self, trigger: &Trigger, host: &H) -> Result<PipelineOutcome> {
        if let Err(reason) = trigger.should_publish(&self.config.main_branch) {
            log::info!("Not publishing: {}", reason);
            return Ok(PipelineOutcome::Skipped { reason });
        }
        let platform = self.options.platform;
        let workspace = &self.options.workspace;
        log::info!(
            "Release run: trigger={}, platform={}, label={}",
            trigger,
            platform,
            self.config.label
        );

        let build = BuildRunner::new(self.config, workspace, platform).run().await?;

        let stager = ArtifactStager::new(workspace.join(&self.config.artifact_dir));
        let artifact = stager
            .stage(
                &build.bundle_dir,
                &self.config.artifact_name(platform),
                self.config.archive.format,
            )
            .await?;

        let commit = resolve_commit(self.options.commit.as_deref(), workspace, &self.config.main_branch).await;
        let notes = render_notes(
            &self.config.notes,
            &NotesContext {
                label: &self.config.label,
                commit: &commit,
                platform: platform.as_str(),
                date: chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string(),
                asset: &artifact.name,
            },
        )?;

        let lock = PublishLock::acquire(
            &self.config.lock_dir(workspace),
            &self.config.label,
            self.options.lock_wait,
        )
        .await?;
        let outcome = Publisher::new(host, self.config.label.clone())
            .publish(&artifact, &notes, &commit)
            .await;
        drop(lock);

        Ok(PipelineOutcome::Published {
            artifact,
            commit,
            outcome: outcome?,
        })
    }
}

/// Commit the release points at: explicit value, then `GITHUB_SHA`, then
/// `git rev-parse HEAD`, then the main branch name.
pub async fn resolve_commit(explicit: Option<&str>, workspace: &Path, main_branch: &str) -> String {
    if let Some(commit) = explicit.map(str::trim).filter(|c| !c.is_empty()) {
        return commit.to_string();
    }
    if let Ok(sha) = std::env::var("GITHUB_SHA") {
        let sha = sha.trim();
        if !sha.is_empty() {
            return sha.to_string();
        }
    }

    let output = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .current_dir(workspace)
        .output()
        .await;
    match output {
        Ok(output) if output.status.success() => {
            let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !sha.is_empty() {
                return sha;
            }
        }
        Ok(output) => log::debug!(
            "git rev-parse failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ),
        Err(e) => log::debug!("git not runnable: {}", e),
    }

    log::warn!("Could not determine commit; targeting branch '{}'", main_branch);
    main_branch.to_string()
}
