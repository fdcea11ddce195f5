//! Disk-backed blob store for submitted ID documents.
//!
//! Documents live under `{root}/id-documents/{user_id}/{file_name}` and are
//! served back through the documents route, so the stored URL is stable
//! across restarts.

use crate::errors::{AppError, Result};
use crate::utils::validation::Validator;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Debug)]
pub struct DocumentStore {
    root: PathBuf,
}

/// Handle to a stored blob: the path on disk and the URL clients retrieve
/// it from.
#[derive(Debug, Clone)]
pub struct StoredDocument {
    pub path: PathBuf,
    pub url: String,
}

impl DocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(root.join("id-documents"))
            .map_err(|e| AppError::StorageError(format!("Failed to create document root: {}", e)))?;
        Ok(Self { root })
    }

    fn document_path(&self, user_id: &Uuid, file_name: &str) -> PathBuf {
        self.root
            .join("id-documents")
            .join(user_id.to_string())
            .join(file_name)
    }

    pub fn url_for(user_id: &Uuid, file_name: &str) -> String {
        format!("/api/documents/{}/{}", user_id, file_name)
    }

    /// Write the document bytes, overwriting any previous upload with the
    /// same name.
    pub async fn store(&self, user_id: &Uuid, file_name: &str, bytes: &[u8]) -> Result<StoredDocument> {
        Validator::validate_file_name(file_name)?;
        let path = self.document_path(user_id, file_name);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::StorageError(format!("Failed to create directory: {}", e)))?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to store document: {}", e)))?;
        Ok(StoredDocument {
            path,
            url: Self::url_for(user_id, file_name),
        })
    }

    /// Read a stored document back, for the documents route.
    pub async fn read(&self, user_id: &Uuid, file_name: &str) -> Result<Vec<u8>> {
        Validator::validate_file_name(file_name)?;
        let path = self.document_path(user_id, file_name);
        tokio::fs::read(&path)
            .await
            .map_err(|_| AppError::NotFound(format!("No document at {}/{}", user_id, file_name)))
    }

    /// Compensating delete for a submission whose database writes failed.
    pub async fn remove(&self, doc: &StoredDocument) -> Result<()> {
        tokio::fs::remove_file(&doc.path)
            .await
            .map_err(|e| AppError::StorageError(format!("Failed to remove document: {}", e)))
    }

    /// Content type for serving, derived from the stored file extension.
    pub fn content_type_for(file_name: &str) -> &'static str {
        match Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .as_deref()
        {
            Some("jpg") | Some("jpeg") => "image/jpeg",
            Some("png") => "image/png",
            Some("pdf") => "application/pdf",
            _ => "application/octet-stream",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn store_then_read_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        let user_id = Uuid::new_v4();

        let doc = store.store(&user_id, "passport.png", b"png-bytes").await.unwrap();
        assert_eq!(doc.url, format!("/api/documents/{}/passport.png", user_id));

        let bytes = store.read(&user_id, "passport.png").await.unwrap();
        assert_eq!(bytes, b"png-bytes");
    }

    #[tokio::test]
    async fn remove_deletes_the_blob() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        let user_id = Uuid::new_v4();

        let doc = store.store(&user_id, "id.pdf", b"pdf").await.unwrap();
        store.remove(&doc).await.unwrap();
        assert!(store.read(&user_id, "id.pdf").await.is_err());
    }

    #[tokio::test]
    async fn refuses_traversal_file_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::new(dir.path()).unwrap();
        let user_id = Uuid::new_v4();

        assert!(store.store(&user_id, "../escape.png", b"x").await.is_err());
        assert!(store.read(&user_id, "../../etc/passwd").await.is_err());
    }

    #[test]
    fn content_types_follow_extension() {
        assert_eq!(DocumentStore::content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(DocumentStore::content_type_for("a.PNG"), "image/png");
        assert_eq!(DocumentStore::content_type_for("a.pdf"), "application/pdf");
        assert_eq!(DocumentStore::content_type_for("a.bin"), "application/octet-stream");
    }
}
