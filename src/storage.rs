//! File storage for screenshots and downloads
//!
//! Files are never overwritten: saving `report.pdf` twice yields `report.pdf`
//! then `report_1.pdf`. Stored files can be published as links the test
//! report can render.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Where captured files go and how they are referenced from the report
pub trait Storage: Send + Sync {
    /// Save `content` under a fresh name derived from `base_name`
    ///
    /// Relative base names are resolved against the store's root. Returns the
    /// absolute path written.
    fn save(&self, base_name: &Path, extension: &str, content: &[u8]) -> Result<PathBuf>;

    /// Report link for a stored file, `None` when it cannot be published
    fn link_for(&self, path: &Path) -> Option<String>;

    /// Local path for a report link or plain path
    fn path_for(&self, link: &str) -> PathBuf;
}

/// Local directory store
///
/// With a link prefix, files below the root are published as
/// `{prefix}/{relative path}`.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    link_prefix: Option<String>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            link_prefix: None,
        }
    }

    /// Publish stored files under a URL prefix such as `files`
    pub fn with_link_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.link_prefix = Some(prefix.into().trim_end_matches('/').to_string());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Storage for FileStore {
    fn save(&self, base_name: &Path, extension: &str, content: &[u8]) -> Result<PathBuf> {
        let base = if base_name.is_absolute() {
            base_name.to_path_buf()
        } else {
            self.root.join(base_name)
        };
        if let Some(parent) = base.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut index = 0u32;
        loop {
            let candidate = numbered(&base, index, extension);
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(mut file) => {
                    file.write_all(content)?;
                    let path = fs::canonicalize(&candidate)?;
                    tracing::debug!("Saved {} bytes to {}", content.len(), path.display());
                    return Ok(path);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => index += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn link_for(&self, path: &Path) -> Option<String> {
        let prefix = self.link_prefix.as_ref()?;
        let root = fs::canonicalize(&self.root).ok()?;
        let relative = path.strip_prefix(&root).ok()?;
        let parts: Vec<_> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect();
        Some(format!("{}/{}", prefix, parts.join("/")))
    }

    fn path_for(&self, link: &str) -> PathBuf {
        match &self.link_prefix {
            Some(prefix) => match link.strip_prefix(prefix.as_str()).and_then(|r| r.strip_prefix('/')) {
                Some(relative) => self.root.join(relative),
                None => PathBuf::from(link),
            },
            None => PathBuf::from(link),
        }
    }
}

/// `base.ext`, then `base_1.ext`, `base_2.ext`, ...
fn numbered(base: &Path, index: u32, extension: &str) -> PathBuf {
    let mut name = base.as_os_str().to_os_string();
    if index > 0 {
        name.push(format!("_{index}"));
    }
    if !extension.is_empty() {
        name.push(".");
        name.push(extension);
    }
    PathBuf::from(name)
}
