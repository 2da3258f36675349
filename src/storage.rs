use crate::crop::EncodedRaster;
use crate::errors::{CropError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a stored crop ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredArtifact {
    pub key: String,
    pub location: PathBuf,
    pub size_bytes: usize,
}

/// Persistence for finished crops (logo, favicon, background ...).
pub trait ArtifactStore {
    fn put(&self, artifact: &EncodedRaster) -> Result<StoredArtifact>;
    fn get(&self, key: &str) -> Result<Vec<u8>>;
}

/// Stores each artifact as `<uuid>.<ext>` in one directory.
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The platform data directory, if one can be resolved.
    pub fn default_location() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "brandcrop", "brandcrop")
            .map(|dirs| dirs.data_dir().join("artifacts"))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.contains(|c: char| c == '/' || c == '\\')
            && !key.contains("..");
        if !valid {
            return Err(CropError::source_unavailable(format!("invalid artifact key '{}'", key)));
        }
        Ok(self.root.join(key))
    }
}

impl ArtifactStore for FileStore {
    fn put(&self, artifact: &EncodedRaster) -> Result<StoredArtifact> {
        let key = format!("{}.{}", uuid::Uuid::new_v4(), artifact.format.extension());
        let location = self.path_for(&key)?;
        fs::write(&location, &artifact.bytes)?;

        tracing::info!("Stored {} ({} bytes)", key, artifact.bytes.len());
        Ok(StoredArtifact {
            key,
            location,
            size_bytes: artifact.bytes.len(),
        })
    }

    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Err(CropError::source_unavailable(format!(
                "no artifact stored under '{}'",
                key
            )));
        }
        Ok(fs::read(path)?)
    }
}
