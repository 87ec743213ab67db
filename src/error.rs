use std::path::PathBuf;

use thiserror::Error;

use crate::tlv::TlvError;

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("input path does not exist: {0}")]
    InputNotFound(PathBuf),

    #[error("unable to open {path}: {source}")]
    OpenFailure {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error(transparent)]
    Tlv(#[from] TlvError),

    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("reference to offset {0:#010x} not present in the archive")]
    DanglingReference(u64),

    #[error("reference to offset {0:#010x} does not resolve to owned content")]
    MalformedReference(u64),

    #[error("compression failed: {0}")]
    Compression(std::io::Error),

    #[error("decompression failed: {0}")]
    Decompression(std::io::Error),
}
