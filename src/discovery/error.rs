use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that abort a discovery run, each naming the offending module path
#[derive(Error, Debug)]
pub enum ModuleReadError {
    #[error("Missing module: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("Unreadable module {}: {reason}", path.display())]
    Unreadable { path: PathBuf, reason: String },

    #[error("IO error reading module {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ModuleReadError {
    /// Classify an IO failure, mapping `NotFound` to [`ModuleReadError::NotFound`]
    pub fn from_io(path: &Path, source: io::Error) -> Self {
        if source.kind() == io::ErrorKind::NotFound {
            ModuleReadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ModuleReadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    pub fn unreadable(path: &Path, reason: impl ToString) -> Self {
        ModuleReadError::Unreadable {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Path of the module that failed
    pub fn path(&self) -> &Path {
        match self {
            ModuleReadError::NotFound { path }
            | ModuleReadError::Unreadable { path, .. }
            | ModuleReadError::Io { path, .. } => path,
        }
    }
}

/// Result type for module reads
pub type Result<T> = std::result::Result<T, ModuleReadError>;
