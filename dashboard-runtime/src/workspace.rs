//! Workspace-scoped file access.
//!
//! Every client-supplied path is joined to the workspace root and resolved
//! lexically (no symlink lookups) before anything touches the filesystem.
//! A resolution that leaves the root is rejected with
//! [`DashboardError::AccessDenied`] before any existence check runs.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use crate::error::{DashboardError, Result};
use crate::util::iso_timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

/// One immediate child of a listed directory.
#[derive(Clone, Debug, Serialize)]
pub struct DirEntryInfo {
    pub name: String,
    /// Path relative to the workspace root, `/`-separated.
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    pub size: u64,
    pub modified: Option<String>,
}

/// Result of reading a workspace path: file content or a directory listing.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FileView {
    File { content: String, path: String },
    Directory { files: Vec<DirEntryInfo> },
}

#[derive(Clone, Debug)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Anchor a workspace at `root`. Relative roots are made absolute against
    /// the current directory, then normalized.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let absolute = std::path::absolute(root.as_ref()).map_err(|err| {
            DashboardError::Storage(format!(
                "Invalid workspace root '{}': {err}",
                root.as_ref().display()
            ))
        })?;
        Ok(Self {
            root: normalize_lexically(&absolute),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `relative` under the root.
    ///
    /// Leading separators are stripped, so `/notes.md` means `<root>/notes.md`.
    /// An empty path resolves to the root itself.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let trimmed = relative.trim_start_matches(['/', '\\']);
        let candidate = normalize_lexically(&self.root.join(trimmed));

        // Component-wise: "/ws-other" does not start with "/ws".
        if candidate.starts_with(&self.root) {
            Ok(candidate)
        } else {
            tracing::warn!(path = %relative, "rejected path outside workspace");
            Err(DashboardError::AccessDenied(relative.to_string()))
        }
    }

    /// `/`-separated path of `absolute` relative to the root (empty for the root).
    pub fn relative_path(&self, absolute: &Path) -> String {
        absolute
            .strip_prefix(&self.root)
            .unwrap_or(absolute)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Read a file's content or list a directory's immediate children.
    pub async fn view(&self, relative: &str) -> Result<FileView> {
        let target = self.resolve(relative)?;

        let metadata = match tokio::fs::metadata(&target).await {
            Ok(m) => m,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(DashboardError::NotFound(relative.to_string()));
            }
            Err(err) => return Err(err.into()),
        };

        if metadata.is_dir() {
            let files = self.list_dir(&target).await?;
            Ok(FileView::Directory { files })
        } else {
            let bytes = tokio::fs::read(&target).await?;
            Ok(FileView::File {
                content: String::from_utf8_lossy(&bytes).into_owned(),
                path: self.relative_path(&target),
            })
        }
    }

    /// Immediate children of `dir`, in the order the OS enumerates them.
    async fn list_dir(&self, dir: &Path) -> Result<Vec<DirEntryInfo>> {
        let mut entries = tokio::fs::read_dir(dir).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let child = entry.path();
            // Follow symlinks like a plain stat; fall back to the link itself
            // when its target is gone.
            let metadata = match tokio::fs::metadata(&child).await {
                Ok(m) => m,
                Err(_) => entry.metadata().await?,
            };

            files.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: self.relative_path(&child),
                kind: if metadata.is_dir() {
                    EntryKind::Folder
                } else {
                    EntryKind::File
                },
                size: metadata.len(),
                modified: metadata.modified().ok().map(iso_timestamp),
            });
        }

        Ok(files)
    }

    /// Overwrite `relative` with `content`, creating parent directories.
    /// Returns the root-relative path written.
    pub async fn write(&self, relative: &str, content: &str) -> Result<String> {
        let target = self.resolve(relative)?;
        if target == self.root {
            return Err(DashboardError::Validation("path is required".into()));
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, content.as_bytes()).await?;

        tracing::debug!(path = %target.display(), bytes = content.len(), "wrote workspace file");
        Ok(self.relative_path(&target))
    }
}

/// Resolve `.` and `..` without consulting the filesystem. `..` at the
/// filesystem root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(segment) => out.push(segment),
        }
    }
    out
}
