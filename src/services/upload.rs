use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use uuid::Uuid;

#[derive(Clone)]
pub struct UploadConfig {
    pub upload_dir: String,
}

impl UploadConfig {
    pub fn from_env() -> Self {
        Self {
            upload_dir: std::env::var("UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()),
        }
    }
}

const MAX_FILE_SIZE: usize = 5 * 1024 * 1024; // 5 MB
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "image/webp"];

pub const ITEMS_DIR: &str = "items";
pub const PROOFS_DIR: &str = "proofs";

/// Where uploaded files end up. Returns a stable public URL for each stored object.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, data: &[u8]) -> AppResult<String>;
}

pub type SharedStorage = Arc<dyn ObjectStorage>;

/// Files on local disk, served by the router under `/uploads`.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.upload_dir),
        }
    }
}

#[async_trait]
impl ObjectStorage for LocalStorage {
    async fn put(&self, key: &str, data: &[u8]) -> AppResult<String> {
        let path = self.root.join(key);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| AppError::Storage(format!("Failed to create upload directory: {}", e)))?;
        }
        fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to write {}: {}", key, e)))?;
        Ok(format!("/uploads/{}", key))
    }
}

/// A file read from a multipart body, not yet stored.
#[derive(Debug, Clone)]
pub struct PendingFile {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Validate file magic bytes match the declared content type.
fn validate_magic_bytes(data: &[u8], content_type: &str) -> bool {
    match content_type {
        "image/jpeg" => data.len() >= 3 && data[..3] == [0xFF, 0xD8, 0xFF],
        "image/png" => data.len() >= 4 && data[..4] == [0x89, 0x50, 0x4E, 0x47],
        "image/gif" => data.len() >= 4 && data[..4] == [0x47, 0x49, 0x46, 0x38],
        "image/webp" => {
            data.len() >= 12
                && data[..4] == [0x52, 0x49, 0x46, 0x46]
                && data[8..12] == [0x57, 0x45, 0x42, 0x50]
        }
        _ => false,
    }
}

fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

pub struct UploadService;

impl UploadService {
    /// Check size, declared type and content. Returns the file extension to use.
    pub fn validate_image(data: &[u8], content_type: &str) -> AppResult<&'static str> {
        if data.len() > MAX_FILE_SIZE {
            return Err(AppError::PayloadTooLarge);
        }

        if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
            return Err(AppError::Validation(format!(
                "Unsupported file type: {}. Allowed: jpeg, png, gif, webp",
                content_type
            )));
        }

        if !validate_magic_bytes(data, content_type) {
            return Err(AppError::Validation(
                "File content does not match declared content type".to_string(),
            ));
        }

        extension_for(content_type)
            .ok_or_else(|| AppError::Validation("Unsupported file type".to_string()))
    }

    /// Validate and store one image. Returns its public URL.
    pub async fn save_image(
        storage: &dyn ObjectStorage,
        data: &[u8],
        content_type: &str,
        subdirectory: &str,
    ) -> AppResult<String> {
        let ext = Self::validate_image(data, content_type)?;
        let key = format!("{}/{}.{}", subdirectory, Uuid::new_v4(), ext);
        storage.put(&key, data).await
    }

    /// Validate every file before storing any, then store them in order.
    /// Fails on the first error; nothing is recorded by the caller in that case.
    pub async fn save_all(
        storage: &dyn ObjectStorage,
        files: &[PendingFile],
        subdirectory: &str,
    ) -> AppResult<Vec<String>> {
        for file in files {
            Self::validate_image(&file.data, &file.content_type)?;
        }

        let mut urls = Vec::with_capacity(files.len());
        for file in files {
            urls.push(Self::save_image(storage, &file.data, &file.content_type, subdirectory).await?);
        }
        Ok(urls)
    }
}
