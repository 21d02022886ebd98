//! Per-run staging directory.
//!
//! A [`Workspace`] owns the directory that holds downloaded segments, concat
//! manifests and intermediate outputs for one run. Downloads go to a
//! `segments/` subdirectory so a remote file name can never shadow a manifest
//! or intermediate output. A configured directory is
//! wiped and recreated on open; without one a temporary directory is used.
//! Either way the directory is removed when the workspace is dropped, unless
//! it was asked to keep its contents.

use std::path::{Component, Path, PathBuf};

use segmerge_core::{Error, GroupTag, PlanLayout, Result};
use tempfile::TempDir;

/// Subdirectory that holds downloaded segments.
const SEGMENTS_DIR: &str = "segments";

/// Resolve `path` to an absolute path with `.`, `..` and symlinks resolved.
///
/// Components that do not exist yet are appended to the canonical form of
/// their nearest existing ancestor, so the result is usable for containment
/// checks before a directory is created.
pub fn normalize_path(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut resolved = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                resolved.pop();
            }
            other => {
                resolved.push(other);
                if resolved.exists() {
                    resolved = resolved.canonicalize()?;
                }
            }
        }
    }
    Ok(resolved)
}

enum Root {
    Temp(Option<TempDir>),
    Fixed(PathBuf),
}

/// Staging area for one merge run.
///
/// # Example
///
/// ```no_run
/// use segmerge_av::Workspace;
///
/// let workspace = Workspace::temporary().unwrap();
/// let local = workspace.segment_path("seg001.ts");
/// // ... download into `local`, merge, then let the workspace drop ...
/// # drop(local);
/// ```
pub struct Workspace {
    root: Root,
    dir: PathBuf,
    keep: bool,
}

impl Workspace {
    /// Create a workspace in a fresh temporary directory.
    pub fn temporary() -> Result<Self> {
        let temp_dir = tempfile::Builder::new()
            .prefix("segmerge-")
            .tempdir()
            .map_err(|e| Error::tool("workspace", format!("failed to create temp dir: {e}")))?;
        let dir = temp_dir.path().to_path_buf();
        std::fs::create_dir_all(dir.join(SEGMENTS_DIR))?;

        Ok(Self {
            root: Root::Temp(Some(temp_dir)),
            dir,
            keep: false,
        })
    }

    /// Open a workspace at `dir`, removing anything already there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] if `dir` resolves to the current
    /// directory or one of its ancestors, and [`Error::Io`] if the directory
    /// cannot be reset.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        let resolved = normalize_path(&dir)?;
        let cwd = normalize_path(&std::env::current_dir()?)?;
        if cwd.starts_with(&resolved) {
            return Err(Error::Validation(format!(
                "refusing to use {} as work directory: it contains the current directory",
                dir.display()
            )));
        }

        match std::fs::remove_dir_all(&dir) {
            Ok(()) => tracing::debug!("cleared stale work directory {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        std::fs::create_dir_all(dir.join(SEGMENTS_DIR))?;

        Ok(Self {
            root: Root::Fixed(dir.clone()),
            dir,
            keep: false,
        })
    }

    /// Open the configured directory, or a temporary one when `None`.
    pub fn open(dir: Option<&Path>) -> Result<Self> {
        match dir {
            Some(dir) => Self::at(dir),
            None => Self::temporary(),
        }
    }

    /// Keep the directory and its contents after the workspace is dropped.
    pub fn keep(&mut self, keep: bool) -> &mut Self {
        self.keep = keep;
        self
    }

    /// Path to the work directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Directory that downloaded segments are staged in.
    pub fn segments_dir(&self) -> PathBuf {
        self.dir.join(SEGMENTS_DIR)
    }

    /// Local destination for a downloaded segment.
    pub fn segment_path(&self, file_name: &str) -> PathBuf {
        self.segments_dir().join(file_name)
    }

    /// Intermediate output path for a group.
    pub fn intermediate_path(&self, tag: GroupTag) -> PathBuf {
        self.plan_layout("").intermediate_path(tag)
    }

    /// The plan layout for this workspace and the given final output.
    pub fn plan_layout(&self, output: impl Into<PathBuf>) -> PlanLayout {
        PlanLayout::new(&self.dir, output)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.keep {
            if let Root::Temp(temp_dir) = &mut self.root {
                if let Some(temp_dir) = temp_dir.take() {
                    #[allow(deprecated)]
                    let kept = temp_dir.into_path();
                    tracing::info!("keeping work directory {}", kept.display());
                }
            }
            return;
        }

        if let Root::Fixed(dir) = &self.root {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                tracing::warn!("failed to remove work directory {}: {e}", dir.display());
            }
        }
        // A TempDir removes itself when dropped.
    }
}
