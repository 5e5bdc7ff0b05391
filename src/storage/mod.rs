//! Artifact storage subsystem.
//!
//! # Responsibilities
//! - Write exactly one file per artifact under the output directory
//! - Refuse to overwrite an existing record (create-if-absent)
//! - Derive collision-resistant artifact names (naming.rs)
//!
//! # Design Decisions
//! - Synchronous std::fs; async callers move it onto the blocking pool
//! - The filesystem's create-new atomicity is the only locking
//! - A partially written file is removed before the error is returned

pub mod naming;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub use naming::ArtifactNames;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("refusing to overwrite existing file {}", path.display())]
    NameCollision { path: PathBuf },

    #[error("failed to write {}: {source}", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("output directory {} is unusable: {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },

    #[error("invalid artifact name {0:?}")]
    InvalidName(String),
}

impl StorageError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageError::NameCollision { .. } => "name_collision",
            StorageError::WriteError { .. } => "write_error",
            StorageError::InvalidDirectory { .. } => "invalid_directory",
            StorageError::InvalidName(_) => "invalid_name",
        }
    }
}

/// A file written by [`store`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub logical_name: String,
    pub byte_length: u64,
    pub destination_path: PathBuf,
}

/// Write `content` to `directory/logical_name`, failing if the file exists.
pub fn store(logical_name: &str, content: &[u8], directory: &Path) -> Result<StoredFile, StorageError> {
    validate_name(logical_name)?;

    match fs::metadata(directory) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => {
            return Err(StorageError::InvalidDirectory {
                path: directory.to_path_buf(),
                reason: "not a directory".to_string(),
            })
        }
        Err(e) => {
            return Err(StorageError::InvalidDirectory {
                path: directory.to_path_buf(),
                reason: e.to_string(),
            })
        }
    }

    let path = directory.join(logical_name);
    let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Err(StorageError::NameCollision { path })
        }
        Err(source) => return Err(StorageError::WriteError { path, source }),
    };

    if let Err(source) = file.write_all(content).and_then(|_| file.sync_all()) {
        drop(file);
        let _ = fs::remove_file(&path);
        return Err(StorageError::WriteError { path, source });
    }

    Ok(StoredFile {
        logical_name: logical_name.to_string(),
        byte_length: content.len() as u64,
        destination_path: path,
    })
}

fn validate_name(name: &str) -> Result<(), StorageError> {
    let bad = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);
    if bad {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Storage bound to one output directory.
#[derive(Debug, Clone)]
pub struct StorageSink {
    directory: PathBuf,
}

impl StorageSink {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Create the output directory (and parents) if missing.
    pub fn ensure_directory(&self) -> Result<(), StorageError> {
        fs::create_dir_all(&self.directory).map_err(|e| StorageError::InvalidDirectory {
            path: self.directory.clone(),
            reason: e.to_string(),
        })
    }

    pub fn store(&self, logical_name: &str, content: &[u8]) -> Result<StoredFile, StorageError> {
        store(logical_name, content, &self.directory)
    }
}
