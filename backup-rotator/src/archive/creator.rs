//! Archive creation.
//!
//! The orchestrator talks to an [`ArchiveCreator`] rather than to tar
//! directly, so tests can substitute failing or instrumented creators.
//!
//! Contract: on success a complete archive exists at the destination path;
//! on any failure nothing does. [`TarGzCreator`] honours this by writing to
//! a temp file next to the destination and renaming into place only once the
//! archive is fully written.

use crate::utils::errors::{Result, RotatorError};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::Path;
use tracing::warn;
use walkdir::WalkDir;

/// Produces one compressed archive from a source directory.
pub trait ArchiveCreator: Send + Sync {
    /// Create an archive of `source_dir` at `destination` and return its
    /// size in bytes. On failure `destination` must not exist.
    fn create(&self, source_dir: &Path, destination: &Path) -> Result<u64>;
}

/// Options for tar.gz creation.
#[derive(Debug, Clone)]
pub struct TarGzOptions {
    /// Entries whose file name contains one of these patterns are pruned
    /// from the archive, subtrees included.
    pub exclude_patterns: Vec<String>,

    /// Gzip compression level (0-9).
    pub compression_level: u32,
}

impl Default for TarGzOptions {
    fn default() -> Self {
        Self {
            exclude_patterns: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                ".DS_Store".to_string(),
            ],
            compression_level: 6,
        }
    }
}

/// Streams a directory tree through tar + gzip.
pub struct TarGzCreator {
    options: TarGzOptions,
}

impl TarGzCreator {
    pub fn new(options: TarGzOptions) -> Self {
        Self { options }
    }

    fn is_excluded(&self, entry: &walkdir::DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.options
            .exclude_patterns
            .iter()
            .any(|pattern| name.contains(pattern.as_str()))
    }

    /// Write the full archive to `out`. Entries are stored under the source
    /// directory's base name so extraction yields a single root directory.
    fn write_archive(&self, source_dir: &Path, out: &Path) -> Result<()> {
        let file = File::create(out)?;
        let gz = GzEncoder::new(file, Compression::new(self.options.compression_level));
        let mut builder = tar::Builder::new(gz);
        builder.follow_symlinks(false);

        let root_name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "backup".to_string());

        let walker = WalkDir::new(source_dir)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(e));

        for entry in walker {
            let entry = entry.map_err(|e| RotatorError::Creation(e.to_string()))?;
            let relative = entry
                .path()
                .strip_prefix(source_dir)
                .unwrap_or_else(|_| entry.path());
            if relative.as_os_str().is_empty() {
                // The source directory itself.
                continue;
            }

            let archive_path = Path::new(&root_name).join(relative);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                builder.append_dir(&archive_path, entry.path())?;
            } else if file_type.is_file() {
                let mut f = File::open(entry.path())?;
                builder.append_file(&archive_path, &mut f)?;
            }
            // Symlinks are not archived.
        }

        let gz = builder.into_inner()?;
        gz.finish()?;
        Ok(())
    }
}

impl ArchiveCreator for TarGzCreator {
    fn create(&self, source_dir: &Path, destination: &Path) -> Result<u64> {
        let parent = destination.parent().ok_or_else(|| {
            RotatorError::Creation(format!(
                "destination {} has no parent directory",
                destination.display()
            ))
        })?;
        let tmp = parent.join(format!(".{}.tmp", uuid::Uuid::new_v4()));

        if let Err(e) = self.write_archive(source_dir, &tmp) {
            if let Err(rm) = std::fs::remove_file(&tmp) {
                if rm.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %tmp.display(), error = %rm, "Failed to remove partial archive");
                }
            }
            return Err(e);
        }

        if let Err(e) = std::fs::rename(&tmp, destination) {
            let _ = std::fs::remove_file(&tmp);
            return Err(RotatorError::Creation(format!(
                "could not move archive into place: {e}"
            )));
        }

        Ok(std::fs::metadata(destination)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::fs;
    use std::io::Read;
    use tempfile::TempDir;

    fn creator() -> TarGzCreator {
        TarGzCreator::new(TarGzOptions::default())
    }

    /// List entry paths of a tar.gz archive.
    fn archive_entries(path: &Path) -> HashSet<String> {
        let file = File::open(path).unwrap();
        let gz = flate2::read::GzDecoder::new(file);
        let mut tar = tar::Archive::new(gz);

        tar.entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().to_string())
            .collect()
    }

    #[test]
    fn creates_archive_and_reports_size() {
        let source_root = TempDir::new().unwrap();
        let source = source_root.path().join("docs");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("file1.txt"), b"content1").unwrap();
        fs::create_dir(source.join("sub")).unwrap();
        fs::write(source.join("sub/file2.txt"), b"content2").unwrap();

        let dest_root = TempDir::new().unwrap();
        let destination = dest_root.path().join("docs_20260807_101530.tar.gz");

        let size = creator().create(&source, &destination).unwrap();
        assert!(destination.exists());
        assert!(size > 0);
        assert_eq!(size, fs::metadata(&destination).unwrap().len());
    }

    #[test]
    fn archive_unpacks_to_original_contents() {
        let source_root = TempDir::new().unwrap();
        let source = source_root.path().join("docs");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("notes.md"), b"hello backup").unwrap();

        let dest_root = TempDir::new().unwrap();
        let destination = dest_root.path().join("docs_20260807_101530.tar.gz");
        creator().create(&source, &destination).unwrap();

        let unpack = TempDir::new().unwrap();
        let file = File::open(&destination).unwrap();
        let gz = flate2::read::GzDecoder::new(file);
        tar::Archive::new(gz).unpack(unpack.path()).unwrap();

        let mut restored = String::new();
        File::open(unpack.path().join("docs/notes.md"))
            .unwrap()
            .read_to_string(&mut restored)
            .unwrap();
        assert_eq!(restored, "hello backup");
    }

    #[test]
    fn missing_source_leaves_no_destination_or_temp_files() {
        let dest_root = TempDir::new().unwrap();
        let destination = dest_root.path().join("gone_20260807_101530.tar.gz");

        let result = creator().create(Path::new("/nonexistent/source"), &destination);
        assert!(result.is_err());
        assert!(!destination.exists());

        let leftovers: Vec<_> = fs::read_dir(dest_root.path()).unwrap().collect();
        assert!(leftovers.is_empty(), "no partial files may remain");
    }

    #[test]
    fn excluded_subtrees_are_pruned() {
        let source_root = TempDir::new().unwrap();
        let source = source_root.path().join("project");
        fs::create_dir(&source).unwrap();
        fs::write(source.join("keep.txt"), b"keep").unwrap();
        fs::create_dir(source.join(".git")).unwrap();
        fs::write(source.join(".git/config"), b"secret").unwrap();
        fs::create_dir(source.join("node_modules")).unwrap();
        fs::write(source.join("node_modules/pkg.js"), b"js").unwrap();

        let dest_root = TempDir::new().unwrap();
        let destination = dest_root.path().join("project_20260807_101530.tar.gz");
        creator().create(&source, &destination).unwrap();

        let entries = archive_entries(&destination);
        assert!(entries.contains("project/keep.txt"));
        assert!(!entries.iter().any(|p| p.contains(".git")));
        assert!(!entries.iter().any(|p| p.contains("node_modules")));
    }
}
