use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("MRC error on {path:?}: {source}")]
    Mrc {
        path: PathBuf,
        #[source]
        source: mrc::Error,
    },

    #[error("invalid MRC header: {0}")]
    InvalidHeader(String),

    #[error("unsupported MRC mode {0}")]
    UnsupportedMode(i32),

    #[error("truncated MRC data: expected {expected} bytes, found {actual}")]
    Truncated { expected: u64, actual: u64 },

    #[error("MRC files must have the same shape. File 1: {first:?}, File 2: {second:?}")]
    ShapeMismatch {
        first: (usize, usize, usize),
        second: (usize, usize, usize),
    },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("degenerate input: {0}")]
    Degenerate(String),

    #[error("failed to write report: {0}")]
    Report(#[source] std::io::Error),

    #[error("failed to draw {path:?}: {message}")]
    Plot { path: PathBuf, message: String },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| Error::Io { path, source }
    }

    pub(crate) fn mrc(path: impl Into<PathBuf>) -> impl FnOnce(mrc::Error) -> Self {
        let path = path.into();
        move |source| Error::Mrc { path, source }
    }

    pub(crate) fn plot<E: std::fmt::Display>(path: impl Into<PathBuf>) -> impl FnOnce(E) -> Self {
        let path = path.into();
        move |e| Error::Plot {
            path,
            message: e.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
