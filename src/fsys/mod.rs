//! Uniform view over one or more storage backends.
//!
//! All artifact access in the engine goes through [`FsFacade`]: existence
//! checks, newest/oldest modification times, deletes and renames. Backends
//! are keyed by a scheme prefix (`file:` by default); paths without a scheme
//! belong to the `file` backend and are resolved against the workflow base
//! directory rather than the process CWD.

pub mod local;

pub use local::LocalFs;

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use anyhow::anyhow;

use crate::error::Result;

/// The default backend scheme.
pub const FILE_SCHEME: &str = "file";

/// A single file together with its modification time in epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub path: String,
    pub mod_time_ms: i64,
}

/// Capability set every storage backend provides.
///
/// Backends receive scheme-stripped paths; the facade owns scheme handling.
pub trait FileSystem {
    /// Scheme this backend serves, without the trailing colon.
    fn scheme(&self) -> &str;

    /// True iff a regular data artifact exists at `path`.
    ///
    /// A directory counts when it contains at least one file.
    fn data_in(&self, path: &str) -> Result<bool>;

    /// All files at `path`: the file itself, or a recursive scan when `path`
    /// is a directory.
    fn file_infos(&self, path: &str) -> Result<Vec<FileInfo>>;

    /// Remove `path`, tolerating absence.
    fn rm(&self, path: &str) -> Result<()>;

    /// Rename `src` to `dst`; both are on this backend.
    fn mv(&self, src: &str, dst: &str) -> Result<()>;
}

/// Scheme of a path string, defaulting to [`FILE_SCHEME`].
pub fn path_scheme(path: &str) -> &str {
    match path.split_once(':') {
        Some((scheme, _))
            if !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) =>
        {
            scheme
        }
        _ => FILE_SCHEME,
    }
}

/// Strip the scheme prefix from a path string, if present.
pub fn path_filename(path: &str) -> &str {
    match path.split_once(':') {
        Some((scheme, rest))
            if !scheme.is_empty()
                && scheme.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()) =>
        {
            rest
        }
        _ => path,
    }
}

/// Lexically normalize a path: resolve `.` and `..` without touching disk.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Facade over all registered backends.
///
/// Carries the workflow base directory so relative `file` paths land in the
/// right place regardless of the process CWD.
pub struct FsFacade {
    base_dir: PathBuf,
    backends: HashMap<String, Box<dyn FileSystem>>,
}

impl FsFacade {
    /// Create a facade with the default `file` backend.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let mut facade = Self {
            base_dir: base_dir.into(),
            backends: HashMap::new(),
        };
        facade.register(Box::new(LocalFs::new()));
        facade
    }

    /// Register an additional backend, replacing any previous one for the
    /// same scheme.
    pub fn register(&mut self, backend: Box<dyn FileSystem>) {
        self.backends.insert(backend.scheme().to_string(), backend);
    }

    /// Base directory relative `file` paths resolve against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Backend serving the given path.
    pub fn get_fs(&self, path: &str) -> Result<&dyn FileSystem> {
        let scheme = path_scheme(path);
        self.backends
            .get(scheme)
            .map(|b| b.as_ref())
            .ok_or_else(|| anyhow!("no filesystem backend for scheme '{}'", scheme).into())
    }

    /// Canonical form of a path: absolute and scheme-prefixed.
    pub fn normalized_path(&self, path: &str) -> String {
        let scheme = path_scheme(path);
        let bare = path_filename(path);

        let absolute = if scheme == FILE_SCHEME {
            let p = Path::new(bare);
            if p.is_absolute() {
                normalize_lexically(p)
            } else {
                normalize_lexically(&self.base_dir.join(p))
            }
        } else {
            normalize_lexically(Path::new(bare))
        };

        format!("{}:{}", scheme, absolute.display())
    }

    /// User-facing form: the `file:` scheme is stripped, others are kept.
    pub fn display_path(&self, path: &str) -> String {
        let normalized = self.normalized_path(path);
        if path_scheme(&normalized) == FILE_SCHEME {
            path_filename(&normalized).to_string()
        } else {
            normalized
        }
    }

    /// True iff a regular data artifact exists at `path`.
    pub fn data_in(&self, path: &str) -> Result<bool> {
        let normalized = self.normalized_path(path);
        self.get_fs(&normalized)?.data_in(path_filename(&normalized))
    }

    /// The newest file at or under `path`.
    pub fn newest_in(&self, path: &str) -> Result<FileInfo> {
        self.extreme_in(path, true)
    }

    /// The oldest file at or under `path`.
    pub fn oldest_in(&self, path: &str) -> Result<FileInfo> {
        self.extreme_in(path, false)
    }

    fn extreme_in(&self, path: &str, newest: bool) -> Result<FileInfo> {
        let normalized = self.normalized_path(path);
        let infos = self
            .get_fs(&normalized)?
            .file_infos(path_filename(&normalized))?;

        let picked = if newest {
            infos.into_iter().max_by_key(|i| i.mod_time_ms)
        } else {
            infos.into_iter().min_by_key(|i| i.mod_time_ms)
        };

        picked.ok_or_else(|| anyhow!("no files found at '{}'", path).into())
    }

    /// Remove `path`, tolerating absence.
    pub fn rm(&self, path: &str) -> Result<()> {
        let normalized = self.normalized_path(path);
        self.get_fs(&normalized)?.rm(path_filename(&normalized))
    }

    /// Rename `src` to `dst`. Both must live on the same backend.
    pub fn mv(&self, src: &str, dst: &str) -> Result<()> {
        let src_norm = self.normalized_path(src);
        let dst_norm = self.normalized_path(dst);

        if path_scheme(&src_norm) != path_scheme(&dst_norm) {
            return Err(anyhow!(
                "cannot move across filesystems: '{}' -> '{}'",
                src,
                dst
            )
            .into());
        }

        self.get_fs(&src_norm)?
            .mv(path_filename(&src_norm), path_filename(&dst_norm))
    }
}
