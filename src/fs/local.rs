use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use super::FileSystem;
use crate::logging::{operations, services};

/// Local disk backend
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }
}

/// Recursively copy the directory `from` to `to`
fn copy_tree(from: &Path, to: &Path) -> Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.with_context(|| format!("Failed to read {}", from.display()))?;
        let relative = entry
            .path()
            .strip_prefix(from)
            .context("Walked outside of the source directory")?;
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)
                .with_context(|| format!("Failed to create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "Failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

impl FileSystem for LocalFileSystem {
    fn name(&self) -> &'static str {
        "local"
    }

    fn homedir(&self) -> PathBuf {
        super::user_homedir()
    }

    fn exists(&self, path: &Path) -> bool {
        let exists = path.is_dir();
        debug!(
            service = services::FS,
            operation = operations::EXISTS,
            path = %path.display(),
            exists,
            "local existence check"
        );
        exists
    }

    fn is_local(&self) -> bool {
        true
    }

    fn put_dir(&self, local: &Path, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
        }
        copy_tree(local, path)
    }

    fn get_dir(&self, path: &Path, local: &Path) -> Result<()> {
        if !path.is_dir() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }
        copy_tree(path, local)
    }
}
