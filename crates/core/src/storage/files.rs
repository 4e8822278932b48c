//! Node scoped file storage.
use std::path::Path;
use std::path::PathBuf;

use crate::dht::Did;
use crate::error::Error;
use crate::error::Result;

/// Files received through `StoreFile` live under `<data_dir>/<node id>/`, one file per
/// name. Only bare names are accepted so a peer cannot write outside that directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Storage for node `did` under `data_dir`. Nothing is created until the first write.
    pub fn new(data_dir: impl AsRef<Path>, did: Did) -> Self {
        Self {
            root: data_dir.as_ref().join(did.to_string()),
        }
    }

    /// The node scoped directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Reject empty names, `.`, `..` and anything holding a path separator.
    pub fn validate_name(name: &str) -> Result<()> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains('/')
            || name.contains('\\')
            || name.contains('\0')
        {
            return Err(Error::InvalidFileName(name.to_string()));
        }
        Ok(())
    }

    fn path_of(&self, name: &str) -> Result<PathBuf> {
        Self::validate_name(name)?;
        Ok(self.root.join(name))
    }

    /// Write `data` as `name`, replacing any previous content.
    pub async fn write(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_of(name)?;
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(&path, data).await?;
        tracing::debug!("stored {} bytes at {:?}", data.len(), path);
        Ok(path)
    }

    /// Read the whole content of `name`.
    pub async fn read(&self, name: &str) -> Result<Vec<u8>> {
        let path = self.path_of(name)?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Delete `name`. A missing file is not an error.
    pub async fn remove(&self, name: &str) -> Result<()> {
        let path = self.path_of(name)?;
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
