//! Content-addressed blob storage
//!
//! Stores the original PDF bytes using their SHA-256 hash as reference.
//! Files are organized in a two-level directory structure for performance.
//!
//! Example: hash "abcd1234..." is stored at "blobs/ab/cd/abcd1234..."

use crate::error::{AppError, Result};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// Content-addressed blob store
#[derive(Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a new blob store at the given root directory
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Initialize the blob store (create directory if needed)
    pub async fn initialize(&self) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        tracing::info!("Blob store initialized at: {:?}", self.root);
        Ok(())
    }

    /// Write data to blob store, returns the SHA-256 reference.
    ///
    /// `name` only labels the write in the logs; identical bytes under
    /// different names share one blob.
    pub async fn write(&self, data: &[u8], name: &str) -> Result<String> {
        let hash = calculate_hash(data);

        if self.exists(&hash).await? {
            tracing::debug!("Blob already exists: {} ({})", hash, name);
            return Ok(hash);
        }

        let path = self.get_path(&hash)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        // Write to temp file first (atomic write)
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;

        fs::rename(temp_path, &path).await?;

        tracing::info!("Stored blob {} for {} ({} bytes)", hash, name, data.len());

        Ok(hash)
    }

    /// Read data from blob store
    pub async fn read(&self, hash: &str) -> Result<Vec<u8>> {
        let path = self.get_path(hash)?;

        if !path.exists() {
            return Err(AppError::BlobNotFound(hash.to_string()));
        }

        let mut file = fs::File::open(&path).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;

        tracing::debug!("Read blob: {} ({} bytes)", hash, data.len());

        Ok(data)
    }

    /// Check if a blob exists
    pub async fn exists(&self, hash: &str) -> Result<bool> {
        match self.get_path(hash) {
            Ok(path) => Ok(path.exists()),
            Err(_) => Ok(false),
        }
    }

    /// Get file path for a hash
    fn get_path(&self, hash: &str) -> Result<PathBuf> {
        if !is_blob_ref(hash) {
            return Err(AppError::BlobNotFound(hash.to_string()));
        }

        // Two-level directory structure: blobs/ab/cd/abcd1234...
        let prefix1 = &hash[0..2];
        let prefix2 = &hash[2..4];
        Ok(self.root.join(prefix1).join(prefix2).join(hash))
    }

    /// List all blobs
    pub async fn list_all(&self) -> Result<Vec<String>> {
        let mut hashes = Vec::new();
        self.scan_directory(&self.root, &mut hashes).await?;
        Ok(hashes)
    }

    fn scan_directory<'a>(
        &'a self,
        dir: &'a Path,
        hashes: &'a mut Vec<String>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            if !dir.exists() {
                return Ok(());
            }

            let mut entries = fs::read_dir(dir).await?;

            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();

                if path.is_dir() {
                    self.scan_directory(&path, hashes).await?;
                } else if path.is_file() {
                    if let Some(hash) = path.file_name().and_then(|name| name.to_str()) {
                        if is_blob_ref(hash) {
                            hashes.push(hash.to_string());
                        }
                    }
                }
            }

            Ok(())
        })
    }

    /// Get blob store root directory
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Calculate SHA-256 hash of data
fn calculate_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// References are 64 lowercase hex characters
fn is_blob_ref(hash: &str) -> bool {
    hash.len() == 64
        && hash
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}
