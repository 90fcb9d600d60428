//! Fatal error conditions
//!
//! Anything that is merely "nothing to rewrite" is a [`SkipReason`](crate::rewriter::SkipReason),
//! not an error. Everything here aborts the run with a non-zero exit.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a rewrite
#[derive(Error, Debug)]
pub enum RewriteError {
    /// The bundler did not produce the entry document
    #[error("entry document not found: {path} (did the bundler run?)")]
    MissingDocument { path: PathBuf },

    /// The bundler did not produce the asset directory
    #[error("asset directory not found: {path} (did the bundler run?)")]
    MissingAssetDir { path: PathBuf },

    #[error("failed to read {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RewriteError {
    /// Map a read failure, turning `NotFound` into the matching "missing" variant
    pub(crate) fn from_read(path: PathBuf, source: io::Error, is_dir: bool) -> Self {
        match source.kind() {
            io::ErrorKind::NotFound if is_dir => Self::MissingAssetDir { path },
            io::ErrorKind::NotFound => Self::MissingDocument { path },
            _ => Self::Read { path, source },
        }
    }
}
