/// Distributed filesystem backend
///
/// Uses the Hadoop command-line client, which carries the cluster
/// configuration of the machine it runs on.
use anyhow::{Context, Result};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

use super::FileSystem;
use crate::logging::{operations, services, status};

#[derive(Debug, Clone)]
pub struct HdfsFileSystem {
    hadoop: PathBuf,
}

impl HdfsFileSystem {
    /// Locate and probe the Hadoop client
    ///
    /// Fails when the binary is not on PATH or does not run, which is how a
    /// machine without a configured cluster presents itself.
    pub fn new(hadoop_bin: &str) -> Result<Self> {
        let hadoop = which::which(hadoop_bin)
            .with_context(|| format!("Could not find '{}' in PATH", hadoop_bin))?;

        let probe = Command::new(&hadoop)
            .arg("version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .with_context(|| format!("Failed to run {}", hadoop.display()))?;

        if !probe.success() {
            anyhow::bail!(
                "'{} version' exited with {}",
                hadoop.display(),
                probe.code().unwrap_or(-1)
            );
        }

        info!(
            service = services::FS,
            operation = operations::SELECT,
            client = %hadoop.display(),
            "Using HDFS backend"
        );

        Ok(Self { hadoop })
    }

    pub fn client(&self) -> &Path {
        &self.hadoop
    }

    /// Run `hadoop fs <args>`, failing with the client's stderr
    fn run_fs<I, S>(&self, args: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<OsString> = args
            .into_iter()
            .map(|arg| arg.as_ref().to_os_string())
            .collect();
        let rendered = args
            .iter()
            .map(|arg| arg.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");

        let output = Command::new(&self.hadoop)
            .arg("fs")
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run hadoop fs {}", rendered))?;

        if !output.status.success() {
            anyhow::bail!(
                "'hadoop fs {}' exited with {}: {}",
                rendered,
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}

impl FileSystem for HdfsFileSystem {
    fn name(&self) -> &'static str {
        "hdfs"
    }

    fn homedir(&self) -> PathBuf {
        super::user_homedir()
    }

    fn exists(&self, path: &Path) -> bool {
        let result = Command::new(&self.hadoop)
            .args(["fs", "-test", "-d"])
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match result {
            Ok(exit) => {
                debug!(
                    service = services::FS,
                    operation = operations::EXISTS,
                    path = %path.display(),
                    exists = exit.success(),
                    "hdfs existence check"
                );
                exit.success()
            }
            Err(e) => {
                debug!(
                    service = services::FS,
                    operation = operations::EXISTS,
                    status = status::ERROR,
                    path = %path.display(),
                    error = %e,
                    "hdfs existence check failed, treating as missing"
                );
                false
            }
        }
    }

    fn is_local(&self) -> bool {
        false
    }

    fn put_dir(&self, local: &Path, path: &Path) -> Result<()> {
        self.run_fs([OsStr::new("-rm"), OsStr::new("-r"), OsStr::new("-f"), path.as_os_str()])?;
        if let Some(parent) = path.parent() {
            self.run_fs([OsStr::new("-mkdir"), OsStr::new("-p"), parent.as_os_str()])?;
        }
        self.run_fs([OsStr::new("-put"), OsStr::new("-f"), local.as_os_str(), path.as_os_str()])?;

        debug!(
            service = services::FS,
            operation = operations::SAVE,
            path = %path.display(),
            "uploaded directory"
        );
        Ok(())
    }

    fn get_dir(&self, path: &Path, local: &Path) -> Result<()> {
        self.run_fs([OsStr::new("-get"), path.as_os_str(), local.as_os_str()])?;

        debug!(
            service = services::FS,
            operation = operations::LOAD,
            path = %path.display(),
            "downloaded directory"
        );
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write a fake `hadoop` whose namespace lives below `root`
    fn fake_hadoop(dir: &Path, root: &Path) -> PathBuf {
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
            root.display()
        );
        let mut file = fs::File::create(&bin).unwrap();
        file.write_all(script.as_bytes()).unwrap();
        file.sync_all().unwrap();
        drop(file);
        let mut perms = fs::metadata(&bin).unwrap().permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&bin, perms).unwrap();
        bin
    }

    fn in_root(root: &Path, path: &Path) -> PathBuf {
        PathBuf::from(format!("{}{}", root.display(), path.display()))
    }

    #[test]
    #[serial]
    fn test_exists_checks_the_cluster_namespace() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("namenode");
        let bin = fake_hadoop(temp.path(), &root);
        let cached = temp.path().join("cache").join("df");
        fs::create_dir_all(in_root(&root, &cached)).unwrap();
        let local_only = temp.path().join("cache").join("local");
        fs::create_dir_all(&local_only).unwrap();

        let hdfs = HdfsFileSystem::new(bin.to_str().unwrap()).unwrap();
        assert_eq!(hdfs.name(), "hdfs");
        assert!(!hdfs.is_local());
        assert!(hdfs.exists(&cached));
        assert!(!hdfs.exists(&local_only));
    }

    #[test]
    #[serial]
    fn test_put_and_get_round_trip_through_client() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("namenode");
        let bin = fake_hadoop(temp.path(), &root);
        let hdfs = HdfsFileSystem::new(bin.to_str().unwrap()).unwrap();

        let staged = temp.path().join("staged");
        fs::create_dir_all(&staged).unwrap();
        fs::write(staged.join("part-00000.parquet"), b"v2").unwrap();
        let remote = PathBuf::from("/user/tester/sparkcache/app/df");
        fs::create_dir_all(in_root(&root, &remote)).unwrap();
        fs::write(in_root(&root, &remote).join("part-00001.parquet"), b"stale").unwrap();

        hdfs.put_dir(&staged, &remote).unwrap();

        assert!(hdfs.exists(&remote));
        assert!(!in_root(&root, &remote).join("part-00001.parquet").exists());

        let fetched = temp.path().join("fetched");
        hdfs.get_dir(&remote, &fetched).unwrap();
        assert_eq!(fs::read(fetched.join("part-00000.parquet")).unwrap(), b"v2");
    }

    #[test]
    #[serial]
    fn test_get_of_missing_directory_fails() {
        let temp = TempDir::new().unwrap();
        let bin = fake_hadoop(temp.path(), &temp.path().join("namenode"));
        let hdfs = HdfsFileSystem::new(bin.to_str().unwrap()).unwrap();

        let err = hdfs
            .get_dir(Path::new("/user/tester/missing"), &temp.path().join("out"))
            .unwrap_err();
        assert!(err.to_string().contains("-get"));
    }

    #[test]
    fn test_new_fails_for_missing_binary() {
        assert!(HdfsFileSystem::new("sparkcache-no-such-hadoop-binary").is_err());
    }

    #[test]
    #[serial]
    fn test_exists_is_false_when_client_disappears() {
        let temp = TempDir::new().unwrap();
        let bin = fake_hadoop(temp.path(), &temp.path().join("namenode"));
        let hdfs = HdfsFileSystem::new(bin.to_str().unwrap()).unwrap();

        fs::remove_file(&bin).unwrap();
        assert!(!hdfs.exists(temp.path()));
    }
}
