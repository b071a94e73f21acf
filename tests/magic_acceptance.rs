/// Acceptance tests for the `%%sparkcache` magic line
mod common;

use arrow::record_batch::RecordBatch;
use common::{orders, CELL};
use sparkcache::config::FsBackend;
use sparkcache::{
    CacheError, CellSession, Console, MemorySink, Outcome, ParquetTableStore, Session,
    SparkCacheConfig, SparkCacheMagic,
};
use std::cell::Cell;
use std::rc::Rc;
use tempfile::TempDir;

struct MagicNotebook {
    magic: SparkCacheMagic<ParquetTableStore>,
    session: CellSession<RecordBatch>,
    sink: MemorySink,
    runs: Rc<Cell<usize>>,
}

fn setup(config: SparkCacheConfig) -> MagicNotebook {
    let mut config = config;
    config.filesystem.backend = FsBackend::Local;
    let sink = MemorySink::new();
    let console = Console::new(sink.clone());
    let magic = SparkCacheMagic::from_config(
        config,
        ParquetTableStore::with_filesystem,
        console.clone(),
        Some("etl"),
    )
    .unwrap();

    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    let mut session = CellSession::new(console);
    session.register(CELL, move |ns, _console| {
        counter.set(counter.get() + 1);
        ns.insert("orders".to_string(), orders(counter.get()));
        Ok(())
    });

    MagicNotebook {
        magic,
        session,
        sink,
        runs,
    }
}

#[test]
fn test_magic_saves_then_loads() {
    let temp = TempDir::new().unwrap();
    let dir = temp.path().join("cache");
    let MagicNotebook {
        magic,
        mut session,
        sink,
        runs,
    } = setup(SparkCacheConfig::default());
    let line = format!("-d {} orders", dir.display());

    let first = magic.invoke(&mut session, &line, CELL).unwrap();
    let second = magic.invoke(&mut session, &line, CELL).unwrap();

    assert!(matches!(first, Outcome::Saved { .. }));
    assert!(matches!(second, Outcome::Loaded { .. }));
    assert_eq!(runs.get(), 1);
    assert_eq!(session.variable("orders"), Some(orders(1)));
    assert!(sink.stdout().contains("[Saved variables 'orders'"));
    assert!(sink.stdout().contains("[Skipped the cell's code"));
}

#[test]
fn test_magic_uses_configured_directory_and_silent_flag() {
    let temp = TempDir::new().unwrap();
    let mut config = SparkCacheConfig::default();
    config.cache.dir = Some(temp.path().join("configured").display().to_string());
    let MagicNotebook {
        magic,
        mut session,
        sink,
        ..
    } = setup(config);

    magic.invoke(&mut session, "-s orders", CELL).unwrap();

    assert!(temp.path().join("configured").join("orders").is_dir());
    assert!(sink.stdout().is_empty());
}

#[test]
fn test_magic_read_flag_on_empty_cache() {
    let temp = TempDir::new().unwrap();
    let MagicNotebook {
        magic,
        mut session,
        runs,
        ..
    } = setup(SparkCacheConfig::default());
    let line = format!("--read -d {} orders", temp.path().display());

    let err = magic.invoke(&mut session, &line, CELL).unwrap_err();

    assert!(matches!(err, CacheError::MissingVariables { .. }));
    assert_eq!(runs.get(), 0);
}

#[test]
fn test_magic_force_and_read_conflict() {
    let temp = TempDir::new().unwrap();
    let MagicNotebook {
        magic,
        mut session,
        runs,
        ..
    } = setup(SparkCacheConfig::default());
    let line = format!("-f -r -d {} orders", temp.path().display());

    let err = magic.invoke(&mut session, &line, CELL).unwrap_err();

    assert!(matches!(err, CacheError::Config(_)));
    assert_eq!(runs.get(), 0);
}
