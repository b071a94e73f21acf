//! The `%%sparkcache` cell magic
//!
//! ```text
//! %%sparkcache df1 df2
//! df1 = ...
//! df2 = ...
//! ```
//!
//! If `<home>/sparkcache/<session>/df1` or `.../df2` does not exist the cell
//! runs and both variables are saved there as Parquet. Otherwise the cell is
//! skipped and the variables are loaded into the session's namespace.

use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::Console;
use crate::cli::MagicArgs;
use crate::config::{CacheConfig, SparkCacheConfig};
use crate::engine::{clean_vars, CacheEngine, CacheRequest, Outcome, Policy, Session};
use crate::error::CacheError;
use crate::fs::{select_filesystem, FileSystem};
use crate::store::TableStore;

const DEFAULT_SESSION_NAME: &str = "default";

/// Cache directory precedence: per-call override, configured default,
/// then `<home>/sparkcache/<session-name>`
pub fn resolve_cache_dir(
    override_dir: Option<&str>,
    configured_dir: Option<&str>,
    home: &Path,
    session_name: &str,
) -> PathBuf {
    override_dir
        .filter(|dir| !dir.trim().is_empty())
        .or_else(|| configured_dir.filter(|dir| !dir.trim().is_empty()))
        .map(PathBuf::from)
        .unwrap_or_else(|| home.join("sparkcache").join(session_name))
}

/// Session name from the host, else from the configuration, else "default"
pub fn resolve_session_name(host: Option<&str>, config: &CacheConfig) -> String {
    host.filter(|name| !name.trim().is_empty())
        .or(config.session_name.as_deref())
        .unwrap_or(DEFAULT_SESSION_NAME)
        .to_string()
}

/// Binds the engine to a configuration and a session name
pub struct SparkCacheMagic<T> {
    engine: CacheEngine<T>,
    config: SparkCacheConfig,
    session_name: String,
}

impl<T: TableStore> SparkCacheMagic<T> {
    pub fn new(engine: CacheEngine<T>, config: SparkCacheConfig, session_name: impl Into<String>) -> Self {
        Self {
            engine,
            config,
            session_name: session_name.into(),
        }
    }

    /// Build the filesystem backend and engine described by `config`
    ///
    /// `make_tables` receives the selected backend, so existence checks and
    /// table I/O always see the same filesystem.
    pub fn from_config<F>(
        config: SparkCacheConfig,
        make_tables: F,
        console: Console,
        session_name: Option<&str>,
    ) -> Result<Self>
    where
        F: FnOnce(Arc<dyn FileSystem>) -> T,
    {
        let fs: Arc<dyn FileSystem> = select_filesystem(&config.filesystem)?;
        let tables = make_tables(Arc::clone(&fs));
        let engine = CacheEngine::new(fs, tables, console)
            .with_cell_error_policy(config.cache.on_cell_error);
        let session_name = resolve_session_name(session_name, &config.cache);
        Ok(Self::new(engine, config, session_name))
    }

    pub fn engine(&self) -> &CacheEngine<T> {
        &self.engine
    }

    pub fn session_name(&self) -> &str {
        &self.session_name
    }

    /// Turn a magic line and cell body into an engine request
    pub fn request(&self, line: &str, cell: &str) -> Result<CacheRequest, CacheError> {
        let words = shlex::split(line)
            .ok_or_else(|| CacheError::Config(format!("Unbalanced quotes in: {}", line)))?;
        let args = MagicArgs::try_parse_from(words)
            .map_err(|e| CacheError::Config(e.to_string()))?;

        let dir = resolve_cache_dir(
            args.cachedir.as_deref(),
            self.config.cache.dir.as_deref(),
            &self.engine.filesystem().homedir(),
            &self.session_name,
        );

        Ok(CacheRequest {
            cell: cell.to_string(),
            dir,
            variables: clean_vars(&args.vars),
            policy: Policy {
                force: args.force,
                read: args.read,
            },
            verbose: !args.silent && self.config.cache.verbose,
        })
    }

    /// Run the magic: `line` is the text after `%%sparkcache`
    pub fn invoke<S>(&self, session: &mut S, line: &str, cell: &str) -> Result<Outcome, CacheError>
    where
        S: Session<Value = T::Table>,
    {
        let request = self.request(line, cell)?;
        self.engine.cache(session, &request)
    }
}
