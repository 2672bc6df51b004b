// Image storage on the local filesystem. Files are served statically under
// /images, the database only keeps the file name.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};

pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Opens the store, creating the directory if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> AppResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::StorageError(format!(
                "Failed to create image directory {}: {}",
                dir.display(),
                e
            ))
        })?;
        info!("Image store at {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Resolves a stored file name. Names that could escape the directory
    /// are rejected.
    pub fn path_for(&self, file_name: &str) -> AppResult<PathBuf> {
        let valid = !file_name.is_empty()
            && file_name != "."
            && file_name != ".."
            && !file_name.contains(['/', '\\', '\0']);
        if !valid {
            return Err(AppError::BadRequest(format!("Invalid file name: {:?}", file_name)));
        }
        Ok(self.dir.join(file_name))
    }

    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> AppResult<()> {
        let path = self.path_for(file_name)?;
        tokio::fs::write(&path, bytes).await.map_err(|e| {
            AppError::StorageError(format!("Failed to write {}: {}", path.display(), e))
        })?;
        debug!("Stored image {} ({} bytes)", file_name, bytes.len());
        Ok(())
    }

    pub async fn exists(&self, file_name: &str) -> AppResult<bool> {
        let path = self.path_for(file_name)?;
        Ok(tokio::fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Removes a stored file. A file that is already gone is not an error.
    pub async fn remove(&self, file_name: &str) -> AppResult<()> {
        let path = self.path_for(file_name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!("Removed image {}", file_name);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!("Image {} was already missing", file_name);
                Ok(())
            }
            Err(e) => Err(AppError::StorageError(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_and_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::open(temp_dir.path().join("images")).await.unwrap();

        store.save("a.jpg", b"jpeg").await.unwrap();
        assert!(store.exists("a.jpg").await.unwrap());

        store.remove("a.jpg").await.unwrap();
        assert!(!store.exists("a.jpg").await.unwrap());

        // Already gone
        store.remove("a.jpg").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::open(temp_dir.path()).await.unwrap();

        for name in ["", "..", "../etc/passwd", "a/b.jpg", "a\\b.jpg"] {
            assert!(matches!(store.path_for(name), Err(AppError::BadRequest(_))), "{}", name);
        }
    }
}
