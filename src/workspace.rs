//! Order-scoped scratch space for intermediate render files.
//!
//! Each invoice gets its own directory named after a fresh request id, so
//! concurrent renders never share a path. The directory and everything in it
//! is removed when the workspace is closed or dropped.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

use crate::error::QrError;
use crate::layout::ImageRef;

#[derive(Debug)]
pub struct RenderWorkspace {
    id: Uuid,
    dir: TempDir,
    files: Vec<PathBuf>,
}

impl RenderWorkspace {
    /// Create a workspace under `parent`.
    pub fn in_dir(parent: &Path) -> io::Result<Self> {
        let id = Uuid::new_v4();
        let dir = tempfile::Builder::new()
            .prefix(&format!("fatura-{id}-"))
            .tempdir_in(parent)?;
        tracing::debug!(workspace = %dir.path().display(), "render workspace created");
        Ok(Self {
            id,
            dir,
            files: Vec::new(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Store an encoded QR image as `qr-N.png`.
    pub fn write_image(&mut self, png: &[u8]) -> Result<ImageRef, QrError> {
        let path = self.dir.path().join(format!("qr-{}.png", self.files.len()));
        fs::write(&path, png)?;
        self.files.push(path.clone());
        Ok(ImageRef { path })
    }

    /// Files written so far, in creation order.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Delete the directory and its files. Returns how many files it held.
    pub fn close(self) -> io::Result<usize> {
        let count = self.files.len();
        let path = self.dir.path().to_path_buf();
        self.dir.close()?;
        tracing::debug!(workspace = %path.display(), files = count, "render workspace released");
        Ok(count)
    }
}
