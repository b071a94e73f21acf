//! Filesystem adapter
//!
//! A uniform view of "does this cache directory exist" and "where is the
//! user's home" over either the distributed filesystem or the local disk.
//! The backend is selected once by the host and handed to the engine.

pub mod hdfs;
pub mod local;

pub use hdfs::HdfsFileSystem;
pub use local::LocalFileSystem;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::warn;

use crate::config::{FilesystemConfig, FsBackend};
use crate::logging::{operations, services};

/// Filesystem backend consulted by the cache engine
pub trait FileSystem: Send + Sync {
    /// Backend name used in logs and CLI output
    fn name(&self) -> &'static str;

    /// Canonical home directory of the invoking user (`/user/<name>/`)
    fn homedir(&self) -> PathBuf;

    /// Whether `path` exists as a directory.
    ///
    /// Never fails: any backend error reads as `false`, which only costs an
    /// extra recomputation.
    fn exists(&self, path: &Path) -> bool;

    /// Whether paths of this backend can be opened directly on local disk
    fn is_local(&self) -> bool;

    /// Copy the local directory `local` to `path`, replacing what was there
    fn put_dir(&self, local: &Path, path: &Path) -> Result<()>;

    /// Copy the directory `path` to `local`, which must not exist yet
    fn get_dir(&self, path: &Path, local: &Path) -> Result<()>;
}

/// Home directory following the Hadoop `/user/<name>/` convention
pub(crate) fn user_homedir() -> PathBuf {
    PathBuf::from(format!("/user/{}/", whoami::username()))
}

/// Build the filesystem backend described by the configuration
///
/// `auto` prefers the distributed filesystem and falls back to the local
/// one with a warning when no Hadoop client is usable.
pub fn select_filesystem(config: &FilesystemConfig) -> Result<Arc<dyn FileSystem>> {
    match config.backend {
        FsBackend::Local => Ok(Arc::new(LocalFileSystem::new())),
        FsBackend::Hdfs => {
            let hdfs = HdfsFileSystem::new(&config.hadoop_bin)
                .context("Failed to initialize HDFS backend")?;
            Ok(Arc::new(hdfs))
        }
        FsBackend::Auto => match HdfsFileSystem::new(&config.hadoop_bin) {
            Ok(hdfs) => Ok(Arc::new(hdfs)),
            Err(e) => {
                warn!(
                    service = services::FS,
                    operation = operations::SELECT,
                    error = %e,
                    "No HDFS configured. Falling back to local filesystem"
                );
                Ok(Arc::new(LocalFileSystem::new()))
            }
        },
    }
}
