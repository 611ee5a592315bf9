//! Uploaded file storage
//!
//! Files live flat in one directory. Client-supplied names are reduced to
//! their final path component, so nothing can be written or removed outside
//! that directory.

use std::path::{Path, PathBuf};

use serde::Serialize;
use tokio::fs;
use tracing::info;

use crate::error::{AppError, AppResult};

/// A stored file as reported to clients
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    pub path: String,
    pub size: u64,
}

/// Final path component of a client-supplied name
///
/// Both `/` and `\` count as separators. Returns `None` when nothing usable
/// is left (empty, `.` or `..`).
pub fn sanitize_filename(name: &str) -> Option<String> {
    let last = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    match last {
        "" | "." | ".." => None,
        other => Some(other.to_string()),
    }
}

/// Directory-backed file store
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> AppResult<(String, PathBuf)> {
        let filename = sanitize_filename(name)
            .ok_or_else(|| AppError::BadRequest(format!("Invalid file name: {:?}", name)))?;
        let path = self.root.join(&filename);
        Ok((filename, path))
    }

    fn describe(filename: String, path: &Path, size: u64) -> StoredFile {
        StoredFile {
            filename,
            path: path.to_string_lossy().into_owned(),
            size,
        }
    }

    /// Write a file, replacing any existing file of the same name
    pub async fn save(&self, name: &str, data: &[u8]) -> AppResult<StoredFile> {
        let (filename, path) = self.resolve(name)?;
        fs::create_dir_all(&self.root).await?;
        fs::write(&path, data).await?;

        info!(filename = %filename, size = data.len(), "File stored");
        Ok(Self::describe(filename, &path, data.len() as u64))
    }

    /// All regular files, sorted by name; a missing directory lists as empty
    pub async fn list(&self) -> AppResult<Vec<StoredFile>> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                let filename = entry.file_name().to_string_lossy().into_owned();
                files.push(Self::describe(filename, &entry.path(), metadata.len()));
            }
        }
        files.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(files)
    }

    /// Remove a file; a missing file is `NotFound`
    pub async fn delete(&self, name: &str) -> AppResult<String> {
        let (filename, path) = self.resolve(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(filename = %filename, "File deleted");
                Ok(filename)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound(format!("File {} not found", filename)))
            }
            Err(e) => Err(e.into()),
        }
    }
}
