use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs as tokio_fs;

use super::{validate_object_path, ObjectStorage, StorageError, StoredObject};

/// Stores objects under `root`; nested object paths are flattened into one
/// file name so the `/uploads/:name` route can serve them.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn file_name(path: &str) -> String {
        path.replace('/', "_")
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(
        &self,
        path: &str,
        _content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<StoredObject, StorageError> {
        let path = validate_object_path(path)?;
        let name = Self::file_name(path);

        tokio_fs::create_dir_all(&self.root).await?;
        tokio_fs::write(self.root.join(&name), bytes).await?;

        Ok(StoredObject {
            url: format!("{}/uploads/{}", self.public_base_url, name),
            path: path.to_string(),
        })
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        let path = validate_object_path(path)?;
        match tokio_fs::remove_file(self.root.join(Self::file_name(path))).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    fn local_dir(&self) -> Option<&Path> {
        Some(&self.root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_delete_round_trip_on_disk() {
        let dir = std::env::temp_dir().join(format!("storage-{}", uuid::Uuid::new_v4()));
        let storage = LocalStorage::new(&dir, "http://localhost:3000/");

        let stored = storage
            .put("products/shirt.png", "image/png", vec![1, 2, 3])
            .await
            .unwrap();
        assert_eq!(stored.path, "products/shirt.png");
        assert_eq!(stored.url, "http://localhost:3000/uploads/products_shirt.png");
        assert_eq!(std::fs::read(dir.join("products_shirt.png")).unwrap(), vec![1, 2, 3]);

        storage.delete("products/shirt.png").await.unwrap();
        assert!(!dir.join("products_shirt.png").exists());
        // Deleting twice is not an error.
        storage.delete("products/shirt.png").await.unwrap();

        let _ = std::fs::remove_dir_all(dir);
    }
}
