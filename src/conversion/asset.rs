use std::path::{Path, PathBuf};

/// A named blob of bytes produced by an exporter. The exporter never touches
/// the filesystem itself, callers decide where and how to write assets.
#[derive(Debug, PartialEq)]
pub struct Asset {
    pub bytes: Vec<u8>,
    path: PathBuf,
}

impl Asset {
    pub fn new(bytes: Vec<u8>, path: impl AsRef<Path>) -> Self {
        Self {
            bytes,
            path: path.as_ref().into(),
        }
    }

    /// Get a reference to the asset's path.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn name(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> &str {
        self.path
            .extension()
            .and_then(|extension| extension.to_str())
            .unwrap_or_default()
    }
}
