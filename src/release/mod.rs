//! Release publisher: builds the desktop bundle for a platform, archives it
//! and publishes it as the single release under a fixed label.
//!
//! Stages run strictly in order (see [`ReleasePipeline`]). Publications of
//! the same label are serialized by [`PublishLock`] and use a draft-first
//! protocol (see [`Publisher`]), so a failed run never removes the previous
//! release before its replacement exists.

mod archive;
mod build;
mod checksum;
mod config;
mod error;
mod github;
mod host;
mod lock;
mod memory;
mod pipeline;
mod publisher;
mod staging;
mod trigger;

pub use archive::create_archive;
pub use build::{BuildOutput, BuildRunner};
pub use checksum::calculate_sha256;
pub use config::{
    ArchiveConfig, ArchiveFormat, BuildConfig, DEFAULT_LABEL, NotesConfig, PLATFORM_PLACEHOLDER,
    ReleaseConfig, TargetPlatform, expand, parse_repository, validate_label,
};
pub use error::{Context, Error, ErrorExt, Result};
pub use github::{DEFAULT_GITHUB_API_URL, GitHubHost, default_retry_policy};
pub use host::{Release, ReleaseAsset, ReleaseHost, ReleaseSpec};
pub use lock::{PublishLock, lock_path};
pub use memory::{HostOperation, MemoryHost};
pub use pipeline::{DEFAULT_LOCK_WAIT, PipelineOptions, PipelineOutcome, ReleasePipeline, resolve_commit};
pub use publisher::{NotesContext, PublishOutcome, Publisher, ReleaseNotes, render_notes};
pub use staging::{ArtifactStager, StagedArtifact};
pub use trigger::Trigger;
