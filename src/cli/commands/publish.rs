//! `publish`: build the desktop bundle and replace the labelled release.

use crate::cli::RuntimeConfig;
use crate::cli::args::PublishArgs;
use crate::error::Result;
use crate::release::{
    Context, Error, GitHubHost, MemoryHost, PipelineOptions, PipelineOutcome, ReleaseConfig, ReleaseHost,
    ReleasePipeline, TargetPlatform, Trigger, parse_repository, validate_label,
};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "release.toml";

pub async fn execute(args: PublishArgs, runtime: &RuntimeConfig) -> Result<i32> {
    let (config_path, optional) = match &args.config {
        Some(path) => (path.clone(), false),
        None => (args.workspace.join(CONFIG_FILE_NAME), true),
    };
    let mut config = ReleaseConfig::load(&config_path, optional)?;
    if let Some(label) = &args.label {
        validate_label(label)?;
        config.label = label.clone();
    }

    let options = PipelineOptions {
        workspace: args.workspace.clone(),
        platform: args.platform.unwrap_or_else(TargetPlatform::host),
        commit: args.commit.clone(),
        lock_wait: Duration::from_secs(args.lock_wait),
    };
    let pipeline = ReleasePipeline::new(&config, options);
    let trigger = Trigger::from_env();

    if args.dry_run {
        runtime
            .output()
            .warn("Dry run: publishing to an in-memory release host");
        let host = MemoryHost::new();
        let code = run(&pipeline, &trigger, &host, runtime).await?;
        for release in host.releases() {
            runtime.output().indent(&format!(
                "would hold release '{}' ({}) with assets: {}",
                release.tag_name,
                if release.draft { "draft" } else { "published" },
                release
                    .assets
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }
        return Ok(code);
    }

    let repository = args
        .repository
        .as_deref()
        .or(config.repository.as_deref())
        .context("No repository configured; pass --repository owner/name or set GITHUB_REPOSITORY")?;
    let (owner, repo) = parse_repository(repository)?;
    let token = args.token.as_deref().ok_or(Error::MissingToken)?;
    let host = GitHubHost::new(&args.github_api_url, &owner, &repo, token)?;

    run(&pipeline, &trigger, &host, runtime).await
}

async fn run<H: ReleaseHost>(
    pipeline: &ReleasePipeline<'_>,
    trigger: &Trigger,
    host: &H,
    runtime: &RuntimeConfig,
) -> Result<i32> {
    let output = runtime.output();
    output.progress(&format!("Release triggered by {}", trigger));

    match pipeline.run(trigger, host).await? {
        PipelineOutcome::Skipped { reason } => {
            output.warn(&format!("Nothing published: {}", reason));
        }
        PipelineOutcome::Published {
            artifact,
            commit,
            outcome,
        } => {
            output.success(&format!(
                "Published {} ({} bytes) as '{}' at {}",
                artifact.name, artifact.size, outcome.release.tag_name, commit
            ));
            output.indent(&format!("sha256 {}", artifact.sha256));
            if let Some(old) = outcome.replaced {
                output.indent(&format!("replaced release {}", old));
            }
            if !outcome.swept.is_empty() {
                output.indent(&format!("removed {} leftover release(s)", outcome.swept.len()));
            }
            for warning in &outcome.warnings {
                output.warn(warning);
            }
        }
    }
    Ok(0)
}
