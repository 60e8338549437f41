use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transaction source [{path:?}] does not exist")]
    MissingTransactions {
        path: PathBuf
    },
    #[error("Could not read [{path:?}]: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error
    },
    #[error("Could not parse CSV [{path:?}]: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error
    }
}

impl SourceError {
    pub fn missing_transactions(path: &Path) -> Self {
        Self::MissingTransactions { path: path.to_path_buf() }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv { path: path.to_path_buf(), source }
    }
}
