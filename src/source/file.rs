use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncReadExt;

use crate::error::{WizardError, WizardResult};

/// A file picked for upload. The content hash is computed on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMetadata {
    path: PathBuf,
    name: String,
    size_bytes: u64,
    content_hash: Option<String>,
}

impl FileMetadata {
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
            size_bytes,
            content_hash: None,
        }
    }

    /// Stat a file on disk.
    pub async fn from_path(path: &Path) -> WizardResult<Self> {
        let metadata = fs::metadata(path).await.map_err(|e| {
            WizardError::Validation(format!("cannot read {}: {}", path.display(), e))
        })?;

        if !metadata.is_file() {
            return Err(WizardError::Validation(format!(
                "{} is not a file",
                path.display()
            )));
        }

        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio")
            .to_string();

        Ok(Self::new(path, name, metadata.len()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// The hash if it has been computed already.
    pub fn known_hash(&self) -> Option<&str> {
        self.content_hash.as_deref()
    }

    /// SHA-256 of the file contents, hex encoded.
    pub async fn content_hash(&mut self) -> WizardResult<&str> {
        if self.content_hash.is_none() {
            let hash = compute_sha256(&self.path).await.map_err(|e| {
                WizardError::Validation(format!("cannot hash {}: {}", self.path.display(), e))
            })?;
            self.content_hash = Some(hash);
        }
        Ok(self.content_hash.as_deref().unwrap_or_default())
    }
}

async fn compute_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; 64 * 1024];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_from_path_and_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meeting.wav");
        std::fs::write(&path, b"abc").unwrap();

        let mut file = FileMetadata::from_path(&path).await.unwrap();
        assert_eq!(file.name(), "meeting.wav");
        assert_eq!(file.size_bytes(), 3);
        assert!(file.known_hash().is_none());

        let hash = file.content_hash().await.unwrap().to_string();
        assert_eq!(
            hash,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(file.known_hash(), Some(hash.as_str()));
    }

    #[tokio::test]
    async fn test_missing_file_is_a_validation_error() {
        let err = FileMetadata::from_path(Path::new("/nonexistent/meeting.wav"))
            .await
            .unwrap_err();
        assert!(matches!(err, WizardError::Validation(_)));
    }
}
