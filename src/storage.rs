// src/storage.rs

//! Local file storage for uploaded presentations.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

/// File extensions accepted for topic presentations.
pub const PRESENTATION_EXTENSIONS: &[&str] = &["pdf", "ppt", "pptx"];

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unsupported file type: {0}")]
    UnsupportedType(String),

    #[error("File exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Abstraction over where uploaded files live.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores `data` and returns the generated file name.
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError>;

    /// Removes a stored file. Missing files are not an error.
    async fn delete(&self, file_name: &str) -> Result<(), StorageError>;

    /// Public URL under which a stored file is served.
    fn public_url(&self, file_name: &str) -> String;
}

/// Stores files in a directory on disk, served at `/uploads`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    root: PathBuf,
    max_bytes: usize,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            root: root.into(),
            max_bytes,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates the storage directory if needed.
    pub async fn init(&self) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    // Generated names never contain separators, but stored names come back
    // from the database so they are checked before touching the disk.
    fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        let candidate = Path::new(file_name);
        match candidate.file_name() {
            Some(name) if name == candidate.as_os_str() => Some(self.root.join(name)),
            _ => None,
        }
    }
}

/// Lower-cased extension of `name` if it is an accepted presentation type.
pub fn presentation_extension(name: &str) -> Result<String, StorageError> {
    let ext = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if PRESENTATION_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(StorageError::UnsupportedType(name.to_string()))
    }
}

#[async_trait]
impl FileStorage for LocalStorage {
    async fn save(&self, original_name: &str, data: &[u8]) -> Result<String, StorageError> {
        let ext = presentation_extension(original_name)?;
        if data.len() > self.max_bytes {
            return Err(StorageError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
        tokio::fs::write(self.root.join(&file_name), data).await?;
        tracing::info!("Stored presentation {} ({} bytes)", file_name, data.len());

        Ok(file_name)
    }

    async fn delete(&self, file_name: &str) -> Result<(), StorageError> {
        let Some(path) = self.resolve(file_name) else {
            tracing::warn!("Refusing to delete suspicious file name {:?}", file_name);
            return Ok(());
        };

        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn public_url(&self, file_name: &str) -> String {
        format!("/uploads/{}", file_name)
    }
}
