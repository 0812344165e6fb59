use std::fmt;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::error::LoadError;

/// Where a dataset comes from.
#[derive(Debug, Clone)]
pub enum DataSource {
    /// A user-chosen file, already read into memory.
    Upload { name: String, bytes: Arc<[u8]> },
    /// The remote default dataset.
    Remote { url: String },
}

impl DataSource {
    pub fn remote(url: impl Into<String>) -> Self {
        DataSource::Remote { url: url.into() }
    }

    pub fn upload(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        DataSource::Upload {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a local file into an upload source.
    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(DataSource::upload(name, bytes))
    }

    /// Fingerprint of this source's identity.
    ///
    /// Uploads are keyed by content, so the same bytes under a different
    /// file name hit the same cache entry. Remote sources are keyed by URL.
    pub fn key(&self) -> SourceKey {
        let mut hasher = Sha256::new();
        match self {
            DataSource::Upload { bytes, .. } => {
                hasher.update(b"upload:");
                hasher.update(bytes);
            }
            DataSource::Remote { url } => {
                hasher.update(b"remote:");
                hasher.update(url.as_bytes());
            }
        }
        SourceKey(hasher.finalize().into())
    }

    /// Short label for status messages.
    pub fn label(&self) -> &str {
        match self {
            DataSource::Upload { name, .. } => name,
            DataSource::Remote { url } => url,
        }
    }
}

/// SHA-256 fingerprint of a [`DataSource`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceKey([u8; 32]);

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..6] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceKey({self})")
    }
}
