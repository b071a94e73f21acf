// Library interface for sparkcache
// Hosts embed the engine through these modules; the binary only inspects caches.

pub mod capture;
pub mod cli;
pub mod config;
pub mod config_discovery;
pub mod engine;
pub mod error;
pub mod fs;
pub mod logging;
pub mod magic;
pub mod store;

// Re-export commonly used types
pub use capture::{CapturedOutput, Console, DisplayData, MemorySink, OutputSink, TerminalSink};
pub use config::{CellErrorPolicy, SparkCacheConfig};
pub use engine::{CacheEngine, CacheRequest, CellSession, Outcome, Policy, Session};
pub use error::CacheError;
pub use fs::{select_filesystem, FileSystem, HdfsFileSystem, LocalFileSystem};
pub use magic::{resolve_cache_dir, SparkCacheMagic};
pub use store::{ParquetTableStore, TableStore, VariableStore};
