/// Upload storage on the local filesystem
///
/// Files are written under a root directory with a generated key
/// `{uuid}.{subtype}`; the original client name is kept only in the
/// database row.
///
/// # Example
///
/// ```no_run
/// use taskboard_shared::storage::FileStorage;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let storage = FileStorage::new("tmp/uploads");
/// let key = storage.save(b"hello", Some("txt")).await?;
/// assert_eq!(storage.read(&key).await?, b"hello");
/// # Ok(())
/// # }
/// ```

use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

/// Maximum accepted upload size
pub const MAX_UPLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Error type for file storage
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("File exceeds the {max} byte limit")]
    TooLarge { max: usize },

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory-backed upload store
#[derive(Debug, Clone)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes bytes under a new key and returns the key
    pub async fn save(&self, bytes: &[u8], subtype: Option<&str>) -> Result<String, StorageError> {
        if bytes.len() > MAX_UPLOAD_BYTES {
            return Err(StorageError::TooLarge {
                max: MAX_UPLOAD_BYTES,
            });
        }

        let key = match subtype.filter(|s| is_safe_extension(s)) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&key), bytes).await?;

        debug!(key = %key, size = bytes.len(), "Stored upload");
        Ok(key)
    }

    /// Reads back a stored file
    pub async fn read(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Ok(tokio::fs::read(self.path_for(key)?).await?)
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let safe = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

        if !safe {
            return Err(StorageError::InvalidKey(key.to_string()));
        }

        Ok(self.root.join(key))
    }
}

fn is_safe_extension(ext: &str) -> bool {
    !ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric())
}
