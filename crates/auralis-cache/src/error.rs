use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("corrupt cache record: {0}")]
    Corrupt(String),

    #[error("unsupported cache record version {0}")]
    UnsupportedVersion(u16),
}
