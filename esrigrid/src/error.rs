use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("missing header key {0}")]
    MissingKey(&'static str),

    #[error("invalid header value {value:?} for {key}")]
    HeaderValue { key: String, value: String },

    #[error("invalid grid dimensions {0}x{1}")]
    Dimensions(usize, usize),

    #[error("expected {expected} samples, found {found}")]
    SampleCount { expected: usize, found: usize },

    #[error("invalid sample {0:?}")]
    Sample(String),

    #[error("invalid grid file len {0} for {1}")]
    FileLen(u64, PathBuf),

    #[error("unsupported grid format {0}")]
    Format(PathBuf),
}
