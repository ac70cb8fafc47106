// 📤 Upload Service - files in, stable URIs out
//
// The editing session only ever sees URIs. LocalUploadService stores each
// file under the SHA-256 of its bytes, so re-uploading the same picture
// yields the same URI.

use crate::error::{CatalogError, CatalogResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One file picked by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        UploadFile {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    /// Content address: hex SHA-256 of the bytes
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        format!("{:x}", hasher.finalize())
    }

    /// Lower-cased extension of the original name, if any
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .map(str::to_lowercase)
    }

    /// Stored name: "<hash>.<ext>" or just "<hash>"
    pub fn stored_name(&self) -> String {
        match self.extension() {
            Some(ext) => format!("{}.{}", self.content_hash(), ext),
            None => self.content_hash(),
        }
    }
}

#[async_trait]
pub trait UploadService: Send + Sync {
    /// Store a batch; one URI per file, same order. All or nothing.
    async fn upload(&self, files: Vec<UploadFile>) -> CatalogResult<Vec<String>>;
}

/// Writes files to a local directory and serves them under `base_url`
#[derive(Debug, Clone)]
pub struct LocalUploadService {
    root: PathBuf,
    base_url: String,
}

impl LocalUploadService {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        LocalUploadService {
            root: root.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn uri_for(&self, stored_name: &str) -> String {
        format!("{}/{}", self.base_url, stored_name)
    }
}

#[async_trait]
impl UploadService for LocalUploadService {
    async fn upload(&self, files: Vec<UploadFile>) -> CatalogResult<Vec<String>> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        for file in &files {
            if file.bytes.is_empty() {
                return Err(CatalogError::Validation(format!(
                    "file `{}` is empty",
                    file.file_name
                )));
            }
        }

        tokio::fs::create_dir_all(&self.root).await?;

        let mut uris = Vec::with_capacity(files.len());
        for file in &files {
            let stored_name = file.stored_name();
            let path = self.root.join(&stored_name);

            if tokio::fs::try_exists(&path).await? {
                debug!(file = %file.file_name, stored = %stored_name, "already stored");
            } else {
                tokio::fs::write(&path, &file.bytes).await?;
                debug!(file = %file.file_name, stored = %stored_name, bytes = file.bytes.len(), "stored");
            }
            uris.push(self.uri_for(&stored_name));
        }

        info!(count = uris.len(), "upload batch stored");
        Ok(uris)
    }
}
