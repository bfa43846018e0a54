use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

/// Keyed file storage. Keys are relative, slash separated paths such as
/// `images/cv/experience/<uuid>.png`; the key prefix doubles as the public
/// URL path of the stored file.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Moves a local file under `key`, replacing whatever is stored there.
    async fn persist_file(&self, source: &Path, key: &str) -> Result<()>;
    async fn delete_file(&self, key: &str) -> Result<()>;
    async fn file_exists(&self, key: &str) -> Result<bool>;
}

/// Storage rooted at the public directory that is also served over HTTP.
pub struct LocalStorageService {
    root: PathBuf,
}

impl LocalStorageService {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Resolves a key to a path under the root, refusing anything that
    /// could escape it.
    pub fn resolve(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            return Err(anyhow!("Invalid storage key: {}", key));
        }
        Ok(self.root.join(relative))
    }

    async fn ensure_parent(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageService for LocalStorageService {
    async fn persist_file(&self, source: &Path, key: &str) -> Result<()> {
        let dest = self.resolve(key)?;
        Self::ensure_parent(&dest).await?;

        // rename fails across filesystems (tmpfs -> disk); fall back to copy
        if let Err(e) = tokio::fs::rename(source, &dest).await {
            tracing::debug!("rename {} failed ({}), copying", source.display(), e);
            tokio::fs::copy(source, &dest).await?;
            if let Err(e) = tokio::fs::remove_file(source).await {
                tracing::warn!("Failed to remove temp file {}: {}", source.display(), e);
            }
        }
        Ok(())
    }

    async fn delete_file(&self, key: &str) -> Result<()> {
        let path = self.resolve(key)?;
        tokio::fs::remove_file(&path).await?;
        Ok(())
    }

    async fn file_exists(&self, key: &str) -> Result<bool> {
        let path = self.resolve(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_rejects_traversal() {
        let storage = LocalStorageService::new("/srv/public");
        assert!(storage.resolve("images/cv/a.png").is_ok());
        assert!(storage.resolve("../etc/passwd").is_err());
        assert!(storage.resolve("images/../../x").is_err());
        assert!(storage.resolve("/etc/passwd").is_err());
        assert!(storage.resolve("").is_err());
    }

    #[tokio::test]
    async fn test_persist_and_delete() {
        let root = tempfile::tempdir().unwrap();
        let storage = LocalStorageService::new(root.path());

        let src = root.path().join("incoming.bin");
        tokio::fs::write(&src, b"payload").await.unwrap();

        storage
            .persist_file(&src, "images/cv/test/file.png")
            .await
            .unwrap();
        assert!(!src.exists());
        assert!(storage.file_exists("images/cv/test/file.png").await.unwrap());
        assert_eq!(
            tokio::fs::read(root.path().join("images/cv/test/file.png"))
                .await
                .unwrap(),
            b"payload"
        );

        storage.delete_file("images/cv/test/file.png").await.unwrap();
        assert!(!storage.file_exists("images/cv/test/file.png").await.unwrap());
        assert!(storage.delete_file("images/cv/test/file.png").await.is_err());
    }
}
