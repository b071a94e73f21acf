pub mod config;
pub mod inspect;
pub mod status;

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;

use sparkcache::cli::CommonArgs;
use sparkcache::config::SparkCacheConfig;
use sparkcache::fs::{select_filesystem, FileSystem};
use sparkcache::magic::{resolve_cache_dir, resolve_session_name};

/// Filesystem backend and cache directory for a command
pub struct Context {
    pub fs: Arc<dyn FileSystem>,
    pub dir: PathBuf,
}

impl Context {
    pub fn load(common: &CommonArgs, config: &SparkCacheConfig) -> Result<Self> {
        let fs = select_filesystem(&config.filesystem)?;
        let session = resolve_session_name(common.session.as_deref(), &config.cache);
        let dir = resolve_cache_dir(
            common.cachedir.as_deref(),
            config.cache.dir.as_deref(),
            &fs.homedir(),
            &session,
        );

        Ok(Self { fs, dir })
    }
}
