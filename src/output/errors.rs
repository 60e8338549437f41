use std::path::{Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("Could not write output [{path:?}]: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error
    },
    #[error("Could not encode output [{path:?}]: {source}")]
    Csv {
        path: PathBuf,
        source: csv::Error
    }
}

impl OutputError {
    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv { path: path.to_path_buf(), source }
    }
}
