//! `release.toml`: what to build, how to archive it, where to publish it.
//!
//! Every field has a default, so an empty or absent file describes the stock
//! pipeline: `flet build <platform>` into `build/<platform>`, zipped and
//! published under the `latest` label.

use super::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Placeholder replaced by the platform identifier in build args, output
/// directory and archive name.
pub const PLATFORM_PLACEHOLDER: &str = "{platform}";

/// Default release label.
pub const DEFAULT_LABEL: &str = "latest";

/// Desktop platform a bundle is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TargetPlatform {
    Linux,
    Macos,
    Windows,
}

impl TargetPlatform {
    /// Platform of the running host.
    pub fn host() -> Self {
        if cfg!(target_os = "macos") {
            Self::Macos
        } else if cfg!(target_os = "windows") {
            Self::Windows
        } else {
            Self::Linux
        }
    }

    /// Identifier passed to the packaging toolchain.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Macos => "macos",
            Self::Windows => "windows",
        }
    }
}

impl std::fmt::Display for TargetPlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum ArchiveFormat {
    #[default]
    #[serde(rename = "zip")]
    Zip,
    #[serde(rename = "tar.gz")]
    TarGz,
}

impl ArchiveFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Zip => "zip",
            Self::TarGz => "tar.gz",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Zip => "application/zip",
            Self::TarGz => "application/gzip",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
    pub command: String,
    pub args: Vec<String>,
    /// Bundle directory produced by the command, relative to the workspace
    pub output_dir: String,
    pub env: BTreeMap<String, String>,
    pub timeout_secs: u64,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            command: "flet".to_string(),
            args: vec!["build".to_string(), PLATFORM_PLACEHOLDER.to_string()],
            output_dir: format!("build/{}", PLATFORM_PLACEHOLDER),
            env: BTreeMap::from([("PYTHONIOENCODING".to_string(), "utf-8".to_string())]),
            timeout_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ArchiveConfig {
    pub format: ArchiveFormat,
    /// Artifact name without extension
    pub name: String,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            format: ArchiveFormat::Zip,
            name: format!("docupipe-{}", PLATFORM_PLACEHOLDER),
        }
    }
}

/// Release title and handlebars body template.
///
/// The body sees `label`, `commit`, `platform`, `date` and `asset`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NotesConfig {
    pub name: String,
    pub body: String,
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self {
            name: "Latest build".to_string(),
            body: "Automated {{platform}} build of {{commit}} ({{date}}).\n\nAsset: {{asset}}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReleaseConfig {
    pub label: String,
    /// `owner/name`; falls back to `GITHUB_REPOSITORY`
    pub repository: Option<String>,
    pub main_branch: String,
    pub artifact_dir: PathBuf,
    /// Directory for the publication lock file; defaults to the artifact dir
    pub lock_dir: Option<PathBuf>,
    pub build: BuildConfig,
    pub archive: ArchiveConfig,
    pub notes: NotesConfig,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            repository: None,
            main_branch: "main".to_string(),
            artifact_dir: PathBuf::from("target/release-artifacts"),
            lock_dir: None,
            build: BuildConfig::default(),
            archive: ArchiveConfig::default(),
            notes: NotesConfig::default(),
        }
    }
}

impl ReleaseConfig {
    /// Loads `path`; a missing file yields the defaults when `optional`.
    pub fn load(path: &Path, optional: bool) -> Result<Self> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if optional && e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No {} found; using default release settings", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(Error::Fs {
                    context: "reading release config".to_string(),
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        validate_label(&self.label)?;
        if self.build.command.trim().is_empty() {
            return Err(Error::InvalidConfig("build.command must not be empty".into()));
        }
        if self.build.output_dir.trim().is_empty() {
            return Err(Error::InvalidConfig("build.output_dir must not be empty".into()));
        }
        if self.archive.name.trim().is_empty() || self.archive.name.contains(['/', '\\']) {
            return Err(Error::InvalidConfig(format!(
                "archive.name '{}' must be a plain file name",
                self.archive.name
            )));
        }
        if let Some(repo) = &self.repository {
            parse_repository(repo)?;
        }
        Ok(())
    }

    pub fn build_args(&self, platform: TargetPlatform) -> Vec<String> {
        self.build.args.iter().map(|a| expand(a, platform)).collect()
    }

    pub fn build_output_dir(&self, workspace: &Path, platform: TargetPlatform) -> PathBuf {
        workspace.join(expand(&self.build.output_dir, platform))
    }

    /// Artifact file name including extension.
    pub fn artifact_name(&self, platform: TargetPlatform) -> String {
        format!(
            "{}.{}",
            expand(&self.archive.name, platform),
            self.archive.format.extension()
        )
    }

    pub fn lock_dir(&self, workspace: &Path) -> PathBuf {
        workspace.join(self.lock_dir.as_ref().unwrap_or(&self.artifact_dir))
    }
}

/// Replaces every `{platform}` in `template`.
pub fn expand(template: &str, platform: TargetPlatform) -> String {
    template.replace(PLATFORM_PLACEHOLDER, platform.as_str())
}

/// Checks that a label is usable as a git tag name.
pub fn validate_label(label: &str) -> Result<()> {
    let invalid = label.is_empty()
        || label.starts_with('-')
        || label.starts_with('/')
        || label.ends_with('/')
        || label.ends_with(".lock")
        || label.contains("..")
        || label.contains("@{")
        || label
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || "~^:?*[\\".contains(c));
    if invalid {
        return Err(Error::InvalidConfig(format!("'{}' is not a valid release label", label)));
    }
    Ok(())
}

/// Splits `owner/name`.
pub fn parse_repository(repo: &str) -> Result<(String, String)> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner.to_string(), name.to_string()))
        }
        _ => Err(Error::InvalidConfig(format!(
            "repository '{}' must look like owner/name",
            repo
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_stock_pipeline() {
        let config = ReleaseConfig::parse("").unwrap();
        assert_eq!(config.label, "latest");
        assert_eq!(config.build_args(TargetPlatform::Macos), vec!["build", "macos"]);
        assert_eq!(
            config.build_output_dir(Path::new("/ws"), TargetPlatform::Windows),
            PathBuf::from("/ws/build/windows")
        );
        assert_eq!(config.artifact_name(TargetPlatform::Linux), "docupipe-linux.zip");
        assert_eq!(config.build.env.get("PYTHONIOENCODING").map(String::as_str), Some("utf-8"));
    }

    #[test]
    fn parses_overrides() {
        let config = ReleaseConfig::parse(
            r#"
label = "nightly"
repository = "acme/desktop"

[build]
command = "sh"
args = ["-c", "make {platform}"]
output_dir = "dist/{platform}"

[archive]
format = "tar.gz"
name = "acme-{platform}"
"#,
        )
        .unwrap();

        assert_eq!(config.label, "nightly");
        assert_eq!(config.build_args(TargetPlatform::Linux), vec!["-c", "make linux"]);
        assert_eq!(config.artifact_name(TargetPlatform::Linux), "acme-linux.tar.gz");
        assert_eq!(config.archive.format.content_type(), "application/gzip");
        // Untouched sections keep their defaults
        assert_eq!(config.build.timeout_secs, 3600);
        assert_eq!(config.main_branch, "main");
    }

    #[test]
    fn shipped_release_toml_matches_defaults() {
        let shipped = ReleaseConfig::parse(include_str!("../../release.toml")).unwrap();
        let defaults = ReleaseConfig::default();
        assert_eq!(shipped.build_args(TargetPlatform::Windows), defaults.build_args(TargetPlatform::Windows));
        assert_eq!(shipped.artifact_name(TargetPlatform::Windows), "docupipe-windows.zip");
        assert_eq!(shipped.build.env, defaults.build.env);
        assert_eq!(shipped.artifact_dir, defaults.artifact_dir);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(ReleaseConfig::parse("lable = \"x\"").is_err());
    }

    #[test]
    fn labels_must_be_tag_safe() {
        for bad in ["", "-x", "a b", "a..b", "x.lock", "a:b", "ref/"] {
            assert!(validate_label(bad).is_err(), "{bad:?} should be rejected");
        }
        for good in ["latest", "v1.2.3", "builds/latest"] {
            assert!(validate_label(good).is_ok(), "{good:?} should be accepted");
        }
    }

    #[test]
    fn repository_shape() {
        assert_eq!(
            parse_repository("acme/desktop").unwrap(),
            ("acme".to_string(), "desktop".to_string())
        );
        assert!(parse_repository("acme").is_err());
        assert!(parse_repository("a/b/c").is_err());
        assert!(ReleaseConfig::parse("repository = \"nope\"").is_err());
    }

    #[test]
    fn missing_optional_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = ReleaseConfig::load(&dir.path().join("release.toml"), true).unwrap();
        assert_eq!(config.label, DEFAULT_LABEL);
        assert!(ReleaseConfig::load(&dir.path().join("release.toml"), false).is_err());
    }
}
