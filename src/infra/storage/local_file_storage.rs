use std::path::{Component, Path, PathBuf};
use async_trait::async_trait;
use tokio::fs;
use tracing::debug;
use crate::domain::ports::FileStorage;
use crate::error::AppError;

/// Stores objects as plain files below `root`. Keys are relative paths.
pub struct LocalFileStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalFileStorage {
    pub fn new(root: impl Into<PathBuf>, public_base: &str) -> Self {
        Self {
            root: root.into(),
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if key.is_empty() || !safe {
            return Err(AppError::Validation(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn save(&self, key: &str, data: &[u8]) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, data).await?;
        debug!("Stored {} bytes at {}", data.len(), path.display());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Vec<u8>, AppError> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::NotFound("Stored file not found".into()))
            }
            Err(e) => Err(AppError::Storage(e)),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.resolve(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(e)),
        }
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root() -> PathBuf {
        std::env::temp_dir().join(format!("eventhub-storage-{}", uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn save_load_delete() {
        let root = temp_root();
        let storage = LocalFileStorage::new(&root, "http://localhost:3000/files/");

        storage.save("events/e1/slides.pdf", b"%PDF").await.unwrap();
        assert_eq!(storage.load("events/e1/slides.pdf").await.unwrap(), b"%PDF");

        storage.delete("events/e1/slides.pdf").await.unwrap();
        assert!(matches!(storage.load("events/e1/slides.pdf").await, Err(AppError::NotFound(_))));
        // Deleting twice is fine.
        storage.delete("events/e1/slides.pdf").await.unwrap();

        let _ = std::fs::remove_dir_all(root);
    }

    #[tokio::test]
    async fn keys_cannot_escape_the_root() {
        let storage = LocalFileStorage::new(temp_root(), "http://localhost");
        assert!(storage.save("../outside", b"x").await.is_err());
        assert!(storage.save("/etc/passwd", b"x").await.is_err());
        assert!(storage.load("").await.is_err());
    }

    #[test]
    fn public_url_joins_base_and_key() {
        let storage = LocalFileStorage::new("/tmp", "https://cdn.example.org/");
        assert_eq!(storage.public_url("avatars/u1.png"), "https://cdn.example.org/avatars/u1.png");
    }
}
