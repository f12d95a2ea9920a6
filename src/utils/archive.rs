//! Archiver: compresses a raw dump into a timestamped archive
//!
//! Archives are written under a `.partial` name and renamed into place only
//! once complete, so a finished-looking archive is never truncated. The raw
//! dump is removed after every attempt.

use super::dump::DumpArtifact;
use super::layout::ArchiveLayout;
use crate::config::{ArchiveFormat, TargetDescriptor};
use chrono::NaiveDateTime;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A finished archive on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Archive {0:?} already exists")]
    AlreadyExists(PathBuf),

    #[error("Failed to {action} {path:?}: {source}{}", permission_hint(.source))]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Compression failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

fn permission_hint(err: &io::Error) -> &'static str {
    if err.kind() == io::ErrorKind::PermissionDenied {
        " (check permissions of the backup directory)"
    } else {
        ""
    }
}

impl ArchiveError {
    fn io(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> ArchiveError {
        let path = path.to_path_buf();
        move |source| ArchiveError::Io {
            action,
            path,
            source,
        }
    }
}

/// Abstraction over archive creation, enabling mocking in tests
pub trait ArchiveOperations: Send + Sync {
    /// Compress `artifact` into the target's archive for `timestamp`.
    ///
    /// The raw artifact is gone afterwards whether or not this succeeds.
    fn archive(
        &self,
        target: &TargetDescriptor,
        artifact: &DumpArtifact,
        timestamp: NaiveDateTime,
    ) -> Result<ArchiveFile, ArchiveError>;
}

/// Filesystem archiver producing zip or bzip2 containers
#[derive(Debug, Clone)]
pub struct FsArchiver {
    layout: ArchiveLayout,
}

impl FsArchiver {
    pub fn new(layout: ArchiveLayout) -> Self {
        Self { layout }
    }

    fn compress(
        &self,
        target: &TargetDescriptor,
        artifact: &DumpArtifact,
        timestamp: NaiveDateTime,
    ) -> Result<ArchiveFile, ArchiveError> {
        let dir = self.layout.target_dir(&target.name);
        fs::create_dir_all(&dir).map_err(ArchiveError::io("create directory", &dir))?;

        let final_path = self.layout.archive_path(&target.name, &timestamp);
        if final_path.exists() {
            return Err(ArchiveError::AlreadyExists(final_path));
        }

        let partial_path = partial_path(&final_path);
        let entry_name = self.layout.entry_name(&target.name, &timestamp);

        let written = self
            .write_container(&artifact.path, &partial_path, &entry_name)
            .and_then(|size| {
                fs::rename(&partial_path, &final_path)
                    .map_err(ArchiveError::io("rename archive", &partial_path))?;
                Ok(size)
            });

        match written {
            Ok(size_bytes) => Ok(ArchiveFile {
                path: final_path,
                size_bytes,
                timestamp,
            }),
            Err(e) => {
                remove_if_present(&partial_path, "partial archive");
                Err(e)
            }
        }
    }

    /// Write the container and return its size
    fn write_container(&self, source: &Path, dest: &Path, entry_name: &str) -> Result<u64, ArchiveError> {
        let mut reader = BufReader::new(
            File::open(source).map_err(ArchiveError::io("open dump", source))?,
        );
        let file = File::create(dest).map_err(ArchiveError::io("create archive", dest))?;

        let file = match self.layout.format() {
            ArchiveFormat::Zip => {
                let mut zip = zip::ZipWriter::new(file);
                let options = zip::write::SimpleFileOptions::default()
                    .compression_method(zip::CompressionMethod::Deflated)
                    .large_file(true);
                zip.start_file(entry_name, options)?;
                io::copy(&mut reader, &mut zip).map_err(ArchiveError::io("write archive", dest))?;
                zip.finish()?
            }
            ArchiveFormat::Bzip2 => {
                let mut encoder = bzip2::write::BzEncoder::new(file, bzip2::Compression::best());
                io::copy(&mut reader, &mut encoder).map_err(ArchiveError::io("write archive", dest))?;
                let mut file = encoder.finish().map_err(ArchiveError::io("write archive", dest))?;
                file.flush().map_err(ArchiveError::io("write archive", dest))?;
                file
            }
        };

        file.sync_all().map_err(ArchiveError::io("sync archive", dest))?;
        let size = file
            .metadata()
            .map_err(ArchiveError::io("stat archive", dest))?
            .len();
        Ok(size)
    }
}

impl ArchiveOperations for FsArchiver {
    fn archive(
        &self,
        target: &TargetDescriptor,
        artifact: &DumpArtifact,
        timestamp: NaiveDateTime,
    ) -> Result<ArchiveFile, ArchiveError> {
        debug!(
            "Compressing {:?} ({} bytes) for '{}'",
            artifact.path, artifact.size_bytes, target.name
        );

        let result = self.compress(target, artifact, timestamp);

        // The raw dump never outlives this step
        remove_if_present(&artifact.path, "raw dump");

        if let Ok(archive) = &result {
            info!(
                "Created archive {:?} ({} bytes)",
                archive.path, archive.size_bytes
            );
        }

        result
    }
}

/// `{path}.partial`
fn partial_path(final_path: &Path) -> PathBuf {
    let mut name: OsString = final_path.as_os_str().to_owned();
    name.push(".partial");
    PathBuf::from(name)
}

fn remove_if_present(path: &Path, what: &str) {
    match fs::remove_file(path) {
        Ok(()) => debug!("Removed {} {:?}", what, path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {} {:?}: {}", what, path, e),
    }
}

/// Mock implementation for testing
/// Available for use in external test crates
#[allow(dead_code)]
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::{Arc, Mutex};

    /// Mock archiver that records calls and never touches the filesystem
    /// beyond removing the raw artifact
    #[derive(Clone, Default)]
    pub struct MockArchiveOps {
        /// Target names in the order they were archived
        pub calls: Arc<Mutex<Vec<String>>>,
        /// Targets whose archive step should fail
        failing: Arc<Mutex<HashSet<String>>>,
    }

    impl MockArchiveOps {
        pub fn new() -> Self {
            Self::default()
        }

        /// Configure archiving of `target` to fail with a permission error
        pub fn with_failing_target(self, target: &str) -> Self {
            self.failing.lock().unwrap().insert(target.to_string());
            self
        }

        /// Get archived target names in call order
        pub fn get_calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        /// Check if a target was archived
        pub fn was_archived(&self, target: &str) -> bool {
            self.calls.lock().unwrap().iter().any(|c| c == target)
        }
    }

    impl ArchiveOperations for MockArchiveOps {
        fn archive(
            &self,
            target: &TargetDescriptor,
            artifact: &DumpArtifact,
            timestamp: NaiveDateTime,
        ) -> Result<ArchiveFile, ArchiveError> {
            self.calls.lock().unwrap().push(target.name.clone());
            let _ = fs::remove_file(&artifact.path);

            if self.failing.lock().unwrap().contains(&target.name) {
                return Err(ArchiveError::Io {
                    action: "create archive",
                    path: artifact.path.with_extension("zip"),
                    source: io::Error::new(io::ErrorKind::PermissionDenied, "Mock archive failure"),
                });
            }

            Ok(ArchiveFile {
                path: artifact.path.with_extension("zip"),
                size_bytes: artifact.size_bytes / 2,
                timestamp,
            })
        }
    }
}
