//! Error types for the mathtbl crate.

use std::fmt;
use std::path::PathBuf;

/// Result type for mathtbl operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a container.
#[derive(Debug)]
pub enum Error {
    /// Reading the container from disk failed.
    Io {
        /// The file that could not be read.
        path: PathBuf,
        /// The error message.
        message: String,
    },
    /// The container bytes could not be decoded.
    Decode(mathtbl_decode::DecodeError),
    /// The decompressor rejected its input.
    Decompress {
        /// The error message.
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io { path, message } => {
                write!(f, "failed to read {}: {message}", path.display())
            }
            Error::Decode(e) => write!(f, "decode error: {e}"),
            Error::Decompress { message } => write!(f, "decompression failed: {message}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Decode(e) => Some(e),
            _ => None,
        }
    }
}

impl From<mathtbl_decode::DecodeError> for Error {
    fn from(e: mathtbl_decode::DecodeError) -> Self {
        Error::Decode(e)
    }
}
