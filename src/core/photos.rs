//! Photo storage collaborator.
//!
//! Photos live outside the database, so writes cannot join a database
//! transaction. Callers write photos inside an open transaction and commit only
//! after every write succeeded; [`write_fan_out`] makes a multi-target write
//! all-or-nothing on its own.

use crate::errors::{Error, Result};
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

/// Key/value store for photo bytes. Keys are relative, slash-separated paths
/// such as `meals/12.jpg`.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Writes `bytes` under `key`, replacing any previous content.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Removes `key`. Removing a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}

/// An uploaded photo waiting to be stored.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    /// Raw image bytes
    pub bytes: Vec<u8>,
    /// File extension without the dot, lowercase
    pub extension: String,
}

impl PhotoUpload {
    /// Validates the extension and normalises it to lowercase.
    pub fn new(bytes: Vec<u8>, extension: &str) -> Result<Self> {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        if !matches!(extension.as_str(), "jpg" | "jpeg" | "png" | "gif" | "webp") {
            return Err(Error::validation(format!(
                "Unsupported photo type '{extension}', expected jpg, jpeg, png, gif or webp"
            )));
        }
        if bytes.is_empty() {
            return Err(Error::validation("Photo is empty"));
        }
        Ok(Self { bytes, extension })
    }

    /// Builds an upload from a file name such as `lunch.PNG`.
    pub fn from_filename(bytes: Vec<u8>, filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default();
        Self::new(bytes, extension)
    }

    /// Storage key for this photo attached to record `id` of `folder`.
    #[must_use]
    pub fn key_for(&self, folder: &str, id: i64) -> String {
        format!("{folder}/{id}.{}", self.extension)
    }

    /// Key for the copy of a meal photo attached to record `id` of `folder`.
    ///
    /// Scoped by the meal so that it never names an object the record
    /// already points at; the old object survives until the swap commits.
    #[must_use]
    pub fn meal_copy_key_for(&self, folder: &str, id: i64, meal_id: i64) -> String {
        format!("{folder}/{id}-meal{meal_id}.{}", self.extension)
    }
}

/// Writes the same bytes under every key, or none of them.
///
/// On the first failure, keys already written are removed again and the
/// write error is returned.
pub async fn write_fan_out(store: &dyn PhotoStore, keys: &[String], bytes: &[u8]) -> Result<()> {
    for (index, key) in keys.iter().enumerate() {
        if let Err(e) = store.put(key, bytes).await {
            tracing::warn!("Photo write to {key} failed, removing {index} earlier writes");
            delete_quietly(store, &keys[..index]).await;
            return Err(e);
        }
    }
    Ok(())
}

/// Removes keys, logging failures instead of returning them. Used after the
/// database has already committed, when a stale file is the only consequence.
pub async fn delete_quietly(store: &dyn PhotoStore, keys: &[String]) {
    for key in keys {
        if let Err(e) = store.delete(key).await {
            tracing::warn!("Could not remove photo {key}: {e}");
        }
    }
}

/// Stores photos as files under a root directory.
#[derive(Debug, Clone)]
pub struct LocalPhotoStore {
    root: PathBuf,
}

impl LocalPhotoStore {
    /// Creates a store rooted at `root`. The directory is created lazily.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !safe {
            return Err(Error::Photo {
                message: format!("Invalid photo key '{key}'"),
            });
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl PhotoStore for LocalPhotoStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await.map_err(|e| Error::Photo {
            message: format!("Failed to write {}: {e}", path.display()),
        })
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Photo {
                message: format!("Failed to remove {}: {e}", path.display()),
            }),
        }
    }
}
