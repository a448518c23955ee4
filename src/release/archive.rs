//! Compresses a bundle directory into a single archive.
//!
//! Entries are stored relative to the bundle directory. Symlinks are kept as
//! links (application bundles rely on them) and unix permissions survive.

use super::config::ArchiveFormat;
use super::error::{Error, ErrorExt, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use walkdir::WalkDir;

/// Writes `source_dir` into `dest` and returns the archive size in bytes.
///
/// Runs on the blocking pool.
pub async fn create_archive(source_dir: &Path, dest: &Path, format: ArchiveFormat) -> Result<u64> {
    let source_dir = source_dir.to_path_buf();
    let dest = dest.to_path_buf();

    tokio::task::spawn_blocking(move || {
        log::info!(
            "Creating {} archive {} from {}",
            format.extension(),
            dest.display(),
            source_dir.display()
        );
        match format {
            ArchiveFormat::Zip => write_zip(&source_dir, &dest)?,
            ArchiveFormat::TarGz => write_tar_gz(&source_dir, &dest)?,
        }
        let size = std::fs::metadata(&dest)
            .fs_context("reading archive metadata", &dest)?
            .len();
        log::info!("Archive written: {} ({} bytes)", dest.display(), size);
        Ok(size)
    })
    .await
    .map_err(|e| Error::GenericError(format!("archive task panicked: {}", e)))?
}

/// Archive entry name: relative path with forward slashes.
fn entry_name(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn write_zip(source_dir: &Path, dest: &Path) -> Result<()> {
    use zip::CompressionMethod;
    use zip::write::SimpleFileOptions;

    let file = File::create(dest).fs_context("creating archive", dest)?;
    let mut zip = zip::ZipWriter::new(BufWriter::new(file));

    for entry in WalkDir::new(source_dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let Some(name) = entry_name(source_dir, entry.path()) else {
            continue;
        };
        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .unix_permissions(unix_mode(entry.path()));
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let target = std::fs::read_link(entry.path()).fs_context("reading symlink", entry.path())?;
            zip.add_symlink(name, target.to_string_lossy().into_owned(), options)?;
        } else if file_type.is_dir() {
            zip.add_directory(name, options)?;
        } else {
            zip.start_file(name, options)?;
            let mut input = File::open(entry.path()).fs_context("opening bundle file", entry.path())?;
            std::io::copy(&mut input, &mut zip).fs_context("writing archive entry", entry.path())?;
        }
    }

    let mut writer = zip.finish()?;
    writer.flush().fs_context("flushing archive", dest)?;
    Ok(())
}

fn write_tar_gz(source_dir: &Path, dest: &Path) -> Result<()> {
    let file = File::create(dest).fs_context("creating archive", dest)?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut tar = tar::Builder::new(encoder);
    tar.follow_symlinks(false);

    for entry in WalkDir::new(source_dir).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let Some(name) = entry_name(source_dir, entry.path()) else {
            continue;
        };
        tar.append_path_with_name(entry.path(), &name)
            .map_err(|e| Error::ArchiveFailed {
                path: entry.path().to_path_buf(),
                reason: e.to_string(),
            })?;
    }

    let encoder = tar.into_inner().fs_context("finishing tar stream", dest)?;
    let mut writer = encoder.finish().fs_context("finishing gzip stream", dest)?;
    writer.flush().fs_context("flushing archive", dest)?;
    Ok(())
}

#[cfg(unix)]
fn unix_mode(path: &Path) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    std::fs::symlink_metadata(path)
        .map(|m| m.permissions().mode() & 0o7777)
        .unwrap_or(0o644)
}

#[cfg(not(unix))]
fn unix_mode(path: &Path) -> u32 {
    if path.is_dir() { 0o755 } else { 0o644 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tempfile::TempDir;

    fn bundle() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("DocuPipe.app/Contents")).unwrap();
        std::fs::write(dir.path().join("DocuPipe.app/Contents/Info.plist"), b"<plist/>").unwrap();
        std::fs::write(dir.path().join("README.txt"), b"hello").unwrap();
        dir
    }

    #[tokio::test]
    async fn zip_contains_relative_entries() {
        let src = bundle();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("bundle.zip");

        let size = create_archive(src.path(), &dest, ArchiveFormat::Zip).await.unwrap();
        assert!(size > 0);

        let mut archive = zip::ZipArchive::new(File::open(&dest).unwrap()).unwrap();
        let mut contents = String::new();
        archive
            .by_name("DocuPipe.app/Contents/Info.plist")
            .unwrap()
            .read_to_string(&mut contents)
            .unwrap();
        assert_eq!(contents, "<plist/>");
        assert!(archive.by_name("README.txt").is_ok());
    }

    #[tokio::test]
    async fn tar_gz_contains_relative_entries() {
        let src = bundle();
        let out = TempDir::new().unwrap();
        let dest = out.path().join("bundle.tar.gz");

        create_archive(src.path(), &dest, ArchiveFormat::TarGz).await.unwrap();

        let decoder = flate2::read::GzDecoder::new(File::open(&dest).unwrap());
        let mut archive = tar::Archive::new(decoder);
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().any(|n| n.trim_end_matches('/') == "DocuPipe.app/Contents/Info.plist"));
        assert!(names.iter().any(|n| n == "README.txt"));
    }

    #[test]
    fn entry_names_use_forward_slashes() {
        let root = Path::new("/b");
        assert_eq!(entry_name(root, &root.join("a").join("c")).as_deref(), Some("a/c"));
        assert_eq!(entry_name(root, root), None);
    }
}
