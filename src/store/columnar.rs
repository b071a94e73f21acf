/// Parquet table store
///
/// Each variable is a directory of Parquet part files plus a `_SUCCESS`
/// marker, the layout distributed writers produce:
///
/// ```text
/// <cache dir>/<variable>/part-00000.parquet
/// <cache dir>/<variable>/_SUCCESS
/// ```
///
/// Tables on a remote backend are staged in a local temporary directory and
/// transferred through the same [`FileSystem`] the engine checks existence
/// with.
use anyhow::{Context, Result};
use arrow::compute::concat_batches;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use walkdir::WalkDir;

use super::TableStore;
use crate::fs::FileSystem;

const PART_FILE: &str = "part-00000.parquet";
const SUCCESS_MARKER: &str = "_SUCCESS";
const STAGED_TABLE: &str = "table";

/// Stores Arrow record batches as Parquet
#[derive(Clone, Default)]
pub struct ParquetTableStore {
    remote: Option<Arc<dyn FileSystem>>,
}

impl ParquetTableStore {
    /// Store reading and writing the local disk directly
    pub fn new() -> Self {
        Self::default()
    }

    /// Store over the given backend; remote backends are staged locally
    pub fn with_filesystem(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            remote: (!fs.is_local()).then_some(fs),
        }
    }

    pub fn is_staged(&self) -> bool {
        self.remote.is_some()
    }

    fn staging_dir() -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix("sparkcache-")
            .tempdir()
            .context("Failed to create staging directory")
    }

    /// Parquet part files of a table directory, in name order
    fn part_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut parts = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry =
                entry.with_context(|| format!("Failed to list table directory: {}", dir.display()))?;
            let path = entry.path();
            if entry.file_type().is_file()
                && path.extension().and_then(|ext| ext.to_str()) == Some("parquet")
            {
                parts.push(path.to_path_buf());
            }
        }
        parts.sort();
        Ok(parts)
    }

    fn read_dir(path: &Path) -> Result<RecordBatch> {
        if !path.is_dir() {
            anyhow::bail!("Path does not exist: {}", path.display());
        }

        let parts = Self::part_files(path)?;
        if parts.is_empty() {
            anyhow::bail!("No parquet files found in {}", path.display());
        }

        let mut schema = None;
        let mut batches = Vec::new();
        for part in &parts {
            let file = File::open(part)
                .with_context(|| format!("Failed to open {}", part.display()))?;
            let builder = ParquetRecordBatchReaderBuilder::try_new(file)
                .with_context(|| format!("Failed to read parquet footer: {}", part.display()))?;
            if schema.is_none() {
                schema = Some(builder.schema().clone());
            }
            let reader = builder
                .build()
                .with_context(|| format!("Failed to read {}", part.display()))?;
            for batch in reader {
                batches.push(batch.with_context(|| format!("Failed to decode {}", part.display()))?);
            }
        }

        let schema = schema.context("Table has no schema")?;
        concat_batches(&schema, &batches)
            .with_context(|| format!("Parts of {} have incompatible schemas", path.display()))
    }

    fn write_dir(table: &RecordBatch, path: &Path) -> Result<()> {
        if path.exists() {
            fs::remove_dir_all(path)
                .with_context(|| format!("Failed to remove previous table: {}", path.display()))?;
        }
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create table directory: {}", path.display()))?;

        let part = path.join(PART_FILE);
        let file =
            File::create(&part).with_context(|| format!("Failed to create {}", part.display()))?;

        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, table.schema(), Some(props))
            .context("Failed to create parquet writer")?;
        writer
            .write(table)
            .with_context(|| format!("Failed to write {}", part.display()))?;
        writer
            .close()
            .with_context(|| format!("Failed to finish {}", part.display()))?;

        File::create(path.join(SUCCESS_MARKER))
            .with_context(|| format!("Failed to mark {} complete", path.display()))?;

        Ok(())
    }
}

impl TableStore for ParquetTableStore {
    type Table = RecordBatch;

    fn read_table(&self, path: &Path) -> Result<RecordBatch> {
        match &self.remote {
            None => Self::read_dir(path),
            Some(fs) => {
                let staging = Self::staging_dir()?;
                let local = staging.path().join(STAGED_TABLE);
                fs.get_dir(path, &local)?;
                Self::read_dir(&local)
            }
        }
    }

    fn write_table(&self, table: &RecordBatch, path: &Path) -> Result<()> {
        match &self.remote {
            None => Self::write_dir(table, path),
            Some(fs) => {
                let staging = Self::staging_dir()?;
                let local = staging.path().join(STAGED_TABLE);
                Self::write_dir(table, &local)?;
                fs.put_dir(&local, path)
            }
        }
    }
}
