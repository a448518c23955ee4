//! Runs the packaging toolchain and validates its output directory.

use super::config::{ReleaseConfig, TargetPlatform};
use super::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// Grace period for the build process to exit after being killed.
const KILL_GRACE: Duration = Duration::from_secs(10);

/// Number of trailing stderr lines quoted in a build failure.
const STDERR_TAIL: usize = 20;

/// A finished build.
#[derive(Debug, Clone)]
pub struct BuildOutput {
    /// Bundle directory produced by the toolchain
    pub bundle_dir: PathBuf,
    pub duration: Duration,
}

/// Packaging toolchain invocation for one platform.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    workspace: PathBuf,
    output_dir: PathBuf,
    timeout: Duration,
}

impl BuildRunner {
    /// Creates a runner from release settings.
    ///
    /// # Arguments
    ///
    /// * `config` - Release settings (command, args, env, output dir, timeout)
    /// * `workspace` - Directory the command runs in
    /// * `platform` - Substituted for `{platform}` in args and output dir
    pub fn new(config: &ReleaseConfig, workspace: &Path, platform: TargetPlatform) -> Self {
        Self {
            program: config.build.command.clone(),
            args: config.build_args(platform),
            env: config
                .build
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            workspace: workspace.to_path_buf(),
            output_dir: config.build_output_dir(workspace, platform),
            timeout: Duration::from_secs(config.build.timeout_secs),
        }
    }

    /// Printable command line.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Runs the build, streaming its output into the log.
    ///
    /// # Returns
    ///
    /// The bundle directory, which is guaranteed to exist and be non-empty.
    pub async fn run(&self) -> Result<BuildOutput> {
        let program = which::which(&self.program).map_err(|e| {
            log::debug!("'{}' not resolvable: {}", self.program, e);
            Error::ToolNotFound {
                tool: self.program.clone(),
            }
        })?;
        log::info!("Running build: {}", self.command_line());
        log::debug!("Resolved build tool: {}", program.display());

        let started = std::time::Instant::now();
        let mut child = Command::new(&program)
            .args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::BuildFailed {
                command: self.command_line(),
                reason: e.to_string(),
            })?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        let streams = async {
            tokio::join!(
                async {
                    if let Some(stdout) = stdout {
                        let mut lines = BufReader::new(stdout).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            log::info!("[build] {}", line);
                        }
                    }
                },
                async {
                    let mut captured = Vec::new();
                    if let Some(stderr) = stderr {
                        let mut lines = BufReader::new(stderr).lines();
                        while let Ok(Some(line)) = lines.next_line().await {
                            log::warn!("[build] {}", line);
                            captured.push(line);
                        }
                    }
                    captured
                }
            )
        };

        let finished = tokio::time::timeout(self.timeout, async {
            let (_, stderr_lines) = streams.await;
            let status = child.wait().await;
            (status, stderr_lines)
        })
        .await;

        let (status, stderr_lines) = match finished {
            Ok((Ok(status), stderr_lines)) => (status, stderr_lines),
            Ok((Err(e), _)) => {
                return Err(Error::BuildFailed {
                    command: self.command_line(),
                    reason: e.to_string(),
                });
            }
            Err(_elapsed) => {
                log::error!(
                    "Build timed out after {} seconds, terminating",
                    self.timeout.as_secs()
                );
                if let Err(e) = child.kill().await {
                    log::warn!("Failed to kill build process: {}", e);
                }
                let _ = tokio::time::timeout(KILL_GRACE, child.wait()).await;
                return Err(Error::BuildFailed {
                    command: self.command_line(),
                    reason: format!("timed out after {} seconds", self.timeout.as_secs()),
                });
            }
        };

        if !status.success() {
            let tail_start = stderr_lines.len().saturating_sub(STDERR_TAIL);
            let tail = stderr_lines[tail_start..].join("\n");
            return Err(Error::BuildFailed {
                command: self.command_line(),
                reason: match status.code() {
                    Some(code) if tail.is_empty() => format!("exit code {}", code),
                    Some(code) => format!("exit code {}\n{}", code, tail),
                    None => "terminated by signal".to_string(),
                },
            });
        }

        verify_bundle_dir(&self.output_dir).await.map_err(|reason| Error::BuildFailed {
            command: self.command_line(),
            reason,
        })?;

        let duration = started.elapsed();
        log::info!(
            "Build finished in {:.1}s: {}",
            duration.as_secs_f64(),
            self.output_dir.display()
        );
        Ok(BuildOutput {
            bundle_dir: self.output_dir.clone(),
            duration,
        })
    }
}

/// Checks that the build left a non-empty directory behind.
async fn verify_bundle_dir(dir: &Path) -> std::result::Result<(), String> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(format!("output directory {} was not created", dir.display()));
        }
        Err(e) => return Err(format!("cannot read {}: {}", dir.display(), e)),
    };
    match entries.next_entry().await {
        Ok(Some(_)) => Ok(()),
        Ok(None) => Err(format!("output directory {} is empty", dir.display())),
        Err(e) => Err(format!("cannot read {}: {}", dir.display(), e)),
    }
}
