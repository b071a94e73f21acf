// Common test utilities shared across acceptance tests
//
// Every test gets its own temp directory as cache root, a local filesystem
// backend, real Parquet files and an in-memory console, so tests can run in
// parallel without touching HDFS or the user's home.

use arrow::array::{Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use sparkcache::{
    CacheEngine, CellSession, Console, FileSystem, LocalFileSystem, MemorySink, ParquetTableStore,
};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use tempfile::TempDir;

/// Small table of customers
#[allow(dead_code)]
pub fn customers() -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, true),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![1, 2, 3])),
            Arc::new(StringArray::from(vec![Some("ada"), None, Some("linus")])),
        ],
    )
    .unwrap()
}

/// Table of order totals, tagged with `run` so recomputation is visible
#[allow(dead_code)]
pub fn orders(run: usize) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("order_id", DataType::Int64, false),
        Field::new("total", DataType::Float64, false),
    ]));
    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Int64Array::from(vec![10, 11])),
            Arc::new(Float64Array::from(vec![run as f64, 2.5])),
        ],
    )
    .unwrap()
}

/// Isolated engine + session over a temp cache directory
#[allow(dead_code)]
pub struct TestNotebook {
    _temp_dir: TempDir,
    pub cache_dir: PathBuf,
    pub sink: MemorySink,
    pub engine: CacheEngine<ParquetTableStore>,
    pub session: CellSession<RecordBatch>,
    pub runs: Rc<Cell<usize>>,
}

/// Cell defining `customers` and `orders`
#[allow(dead_code)]
pub const CELL: &str = "customers, orders = load_and_join()";

#[allow(dead_code)]
impl TestNotebook {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("c1");
        let sink = MemorySink::new();
        let console = Console::new(sink.clone());
        let fs: Arc<dyn FileSystem> = Arc::new(LocalFileSystem::new());
        let engine = CacheEngine::new(fs, ParquetTableStore::new(), console.clone());

        let runs = Rc::new(Cell::new(0));
        let counter = Rc::clone(&runs);
        let mut session = CellSession::new(console);
        session.register(CELL, move |ns, console| {
            counter.set(counter.get() + 1);
            console.println("joining tables");
            ns.insert("customers".to_string(), customers());
            ns.insert("orders".to_string(), orders(counter.get()));
            Ok(())
        });

        Self {
            _temp_dir: temp_dir,
            cache_dir,
            sink,
            engine,
            session,
            runs,
        }
    }

    #[allow(dead_code)]
    pub fn variable_dir(&self, name: &str) -> PathBuf {
        self.cache_dir.join(name)
    }
}

/// Write a fake `hadoop` client into `dir` whose namespace lives below
/// `namenode`, so nothing it stores is visible at the same local path
#[cfg(unix)]
#[allow(dead_code)]
pub fn fake_hadoop(dir: &std::path::Path, namenode: &std::path::Path) -> PathBuf {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    let bin = dir.join("hadoop");
    let script = format!(
        r#"#!/bin/sh
ROOT='{}'
case "$1" in
  version) echo "Hadoop 3.3.6"; exit 0 ;;
  fs) shift ;;
  *) exit 2 ;;
esac
op="$1"; shift
case "$op" in
  -test) [ "$1" = "-d" ] && [ -d "$ROOT$2" ] ;;
  -mkdir) [ "$1" = "-p" ] && shift; mkdir -p "$ROOT$1" ;;
  -rm) while [ "${{1#-}}" != "$1" ]; do shift; done; rm -rf "$ROOT$1" ;;
  -put) [ "$1" = "-f" ] && shift; rm -rf "$ROOT$2"; cp -R "$1" "$ROOT$2" ;;
  -get) cp -R "$ROOT$1" "$2" ;;
  *) exit 2 ;;
esac
"#,
        namenode.display()
    );

    let mut file = std::fs::File::create(&bin).unwrap();
    file.write_all(script.as_bytes()).unwrap();
    file.sync_all().unwrap();
    drop(file);
    let mut perms = std::fs::metadata(&bin).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&bin, perms).unwrap();
    bin
}

/// Where the fake client keeps `path`
#[allow(dead_code)]
pub fn in_namenode(namenode: &std::path::Path, path: &std::path::Path) -> PathBuf {
    PathBuf::from(format!("{}{}", namenode.display(), path.display()))
}
