//! Local filesystem backend.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::error::Result;

use super::{FileInfo, FileSystem, FILE_SCHEME};

/// Backend for the local filesystem (`file:` scheme).
#[derive(Debug, Default)]
pub struct LocalFs;

impl LocalFs {
    pub fn new() -> Self {
        Self
    }

    fn collect_files(path: &Path, out: &mut Vec<FileInfo>) -> Result<()> {
        if path.is_file() {
            out.push(file_info(path)?);
        } else if path.is_dir() {
            for entry in fs::read_dir(path)? {
                Self::collect_files(&entry?.path(), out)?;
            }
        }
        Ok(())
    }
}

fn file_info(path: &Path) -> Result<FileInfo> {
    let mtime = fs::metadata(path)?.modified()?;
    Ok(FileInfo {
        path: path.display().to_string(),
        mod_time_ms: DateTime::<Utc>::from(mtime).timestamp_millis(),
    })
}

impl FileSystem for LocalFs {
    fn scheme(&self) -> &str {
        FILE_SCHEME
    }

    fn data_in(&self, path: &str) -> Result<bool> {
        let path = Path::new(path);
        if path.is_file() {
            return Ok(true);
        }
        if path.is_dir() {
            let mut infos = Vec::new();
            Self::collect_files(path, &mut infos)?;
            return Ok(!infos.is_empty());
        }
        Ok(false)
    }

    fn file_infos(&self, path: &str) -> Result<Vec<FileInfo>> {
        let mut infos = Vec::new();
        Self::collect_files(Path::new(path), &mut infos)?;
        Ok(infos)
    }

    fn rm(&self, path: &str) -> Result<()> {
        let path = Path::new(path);
        if path.is_dir() {
            fs::remove_dir_all(path)?;
        } else if path.is_file() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn mv(&self, src: &str, dst: &str) -> Result<()> {
        if let Some(parent) = Path::new(dst).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::rename(src, dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn data_in_false_for_missing_path() {
        let temp = TempDir::new().unwrap();
        let fs_backend = LocalFs::new();
        let missing = temp.path().join("nope").display().to_string();
        assert!(!fs_backend.data_in(&missing).unwrap());
    }

    #[test]
    fn data_in_false_for_empty_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("empty");
        fs::create_dir(&dir).unwrap();

        let fs_backend = LocalFs::new();
        assert!(!fs_backend.data_in(&dir.display().to_string()).unwrap());
    }

    #[test]
    fn data_in_true_for_directory_with_files() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("part-0"), "x").unwrap();

        let fs_backend = LocalFs::new();
        assert!(fs_backend.data_in(&dir.display().to_string()).unwrap());
    }

    #[test]
    fn file_infos_recurses_into_subdirectories() {
        let temp = TempDir::new().unwrap();
        let nested = temp.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("deep.csv"), "x").unwrap();
        fs::write(temp.path().join("top.csv"), "y").unwrap();

        let fs_backend = LocalFs::new();
        let infos = fs_backend
            .file_infos(&temp.path().display().to_string())
            .unwrap();
        assert_eq!(infos.len(), 2);
    }

    #[test]
    fn mv_creates_destination_parent() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("src"), "x").unwrap();

        let fs_backend = LocalFs::new();
        let dst = temp.path().join("sub/dst");
        fs_backend
            .mv(
                &temp.path().join("src").display().to_string(),
                &dst.display().to_string(),
            )
            .unwrap();
        assert!(dst.exists());
    }

    #[test]
    fn rm_removes_directory_recursively() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("part-0"), "x").unwrap();

        let fs_backend = LocalFs::new();
        fs_backend.rm(&dir.display().to_string()).unwrap();
        assert!(!dir.exists());
    }
}
