//! Variable store
//!
//! Persists named tables under a cache directory, one sub-path per variable.

pub mod columnar;

pub use columnar::ParquetTableStore;

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::logging::{operations, services, status};

/// Columnar table backend (the compute engine's read/write surface)
pub trait TableStore {
    /// In-memory table handle
    type Table;

    /// Read the table stored at `path`
    fn read_table(&self, path: &Path) -> Result<Self::Table>;

    /// Write `table` to `path`, replacing whatever was there
    fn write_table(&self, table: &Self::Table, path: &Path) -> Result<()>;
}

/// Sub-path of a variable inside a cache directory
pub fn variable_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(name)
}

/// Reads and writes sets of named tables below a base directory
pub struct VariableStore<T> {
    tables: T,
}

impl<T: TableStore> VariableStore<T> {
    pub fn new(tables: T) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &T {
        &self.tables
    }

    /// Write every variable to `<dir>/<name>` with overwrite semantics
    ///
    /// Not atomic across variables: a failure part-way leaves the earlier
    /// variables written, and the next invocation recomputes.
    pub fn save(&self, dir: &Path, variables: &BTreeMap<String, T::Table>) -> Result<(), CacheError> {
        for (name, table) in variables {
            let path = variable_path(dir, name);
            self.tables
                .write_table(table, &path)
                .map_err(|source| CacheError::Save {
                    name: name.clone(),
                    path: path.clone(),
                    source,
                })?;
            debug!(
                service = services::STORE,
                operation = operations::SAVE,
                variable = %name,
                path = %path.display(),
                "variable written"
            );
        }

        info!(
            service = services::STORE,
            operation = operations::SAVE,
            status = status::SUCCESS,
            path = %dir.display(),
            count = variables.len(),
            "variables saved"
        );
        Ok(())
    }

    /// Read every requested variable from `<dir>/<name>`
    ///
    /// All or nothing: when any read fails the result is
    /// [`CacheError::MissingVariables`] listing every name that failed.
    pub fn load(&self, dir: &Path, names: &[String]) -> Result<BTreeMap<String, T::Table>, CacheError> {
        let mut loaded = BTreeMap::new();
        let mut missing = Vec::new();

        for name in names {
            let path = variable_path(dir, name);
            match self.tables.read_table(&path) {
                Ok(table) => {
                    loaded.insert(name.clone(), table);
                }
                Err(e) => {
                    debug!(
                        service = services::STORE,
                        operation = operations::LOAD,
                        status = status::MISS,
                        variable = %name,
                        path = %path.display(),
                        error = %e,
                        "variable could not be read"
                    );
                    missing.push(name.clone());
                }
            }
        }

        if !missing.is_empty() {
            return Err(CacheError::MissingVariables {
                path: dir.to_path_buf(),
                names: missing,
            });
        }

        info!(
            service = services::STORE,
            operation = operations::LOAD,
            status = status::SUCCESS,
            path = %dir.display(),
            count = loaded.len(),
            "variables loaded"
        );
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// In-memory table store keyed by path
    #[derive(Default)]
    struct MemoryTables {
        tables: RefCell<HashMap<PathBuf, String>>,
        fail_writes: bool,
    }

    impl TableStore for MemoryTables {
        type Table = String;

        fn read_table(&self, path: &Path) -> Result<String> {
            self.tables
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("Path does not exist: {}", path.display()))
        }

        fn write_table(&self, table: &String, path: &Path) -> Result<()> {
            if self.fail_writes {
                anyhow::bail!("disk full");
            }
            self.tables
                .borrow_mut()
                .insert(path.to_path_buf(), table.clone());
            Ok(())
        }
    }

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_save_writes_one_sub_path_per_variable() {
        let store = VariableStore::new(MemoryTables::default());
        store
            .save(Path::new("/tmp/c1"), &vars(&[("a", "1"), ("b", "2")]))
            .unwrap();

        let tables = store.tables().tables.borrow();
        assert_eq!(tables.get(Path::new("/tmp/c1/a")).map(String::as_str), Some("1"));
        assert_eq!(tables.get(Path::new("/tmp/c1/b")).map(String::as_str), Some("2"));
    }

    #[test]
    fn test_save_overwrites_previous_value() {
        let store = VariableStore::new(MemoryTables::default());
        let dir = Path::new("/tmp/c1");
        store.save(dir, &vars(&[("a", "old")])).unwrap();
        store.save(dir, &vars(&[("a", "new")])).unwrap();

        let loaded = store.load(dir, &["a".to_string()]).unwrap();
        assert_eq!(loaded["a"], "new");
    }

    #[test]
    fn test_load_reports_every_missing_name() {
        let store = VariableStore::new(MemoryTables::default());
        let dir = Path::new("/tmp/c1");
        store.save(dir, &vars(&[("b", "2")])).unwrap();

        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let err = store.load(dir, &names).unwrap_err();

        match err {
            CacheError::MissingVariables { path, names } => {
                assert_eq!(path, PathBuf::from("/tmp/c1"));
                assert_eq!(names, vec!["a".to_string(), "c".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_save_failure_names_variable() {
        let store = VariableStore::new(MemoryTables {
            fail_writes: true,
            ..Default::default()
        });

        let err = store
            .save(Path::new("/tmp/c1"), &vars(&[("a", "1")]))
            .unwrap_err();
        assert!(matches!(err, CacheError::Save { ref name, .. } if name == "a"));
    }
}
