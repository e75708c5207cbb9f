//! Error types for decoding operations.

use std::fmt;
use std::io;

/// Errors that can occur while decoding a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A value the known files always agree on did not match.
    StructuralAssertionFailure {
        field: &'static str,
        expected: u64,
        actual: u64,
        position: u64,
    },
    /// A seek or basis landed outside the stream.
    OutOfBounds { position: u64, stream_length: u64 },
    /// A read needed more bytes than the stream has left.
    TruncatedStream {
        position: u64,
        needed: u64,
        stream_length: u64,
    },
    /// A sub-chunk carried a tag with no known layout.
    UnknownSubChunkType { tag: u32 },
    /// A chunk descriptor carried a type tag with no known layout.
    UnknownChunkKind { tag: u16 },
    /// `pop_basis` was called with no basis pushed.
    BasisUnderflow,
    /// Pixel planes for this texture format cannot be decoded.
    UnsupportedPixelFormat { format: u8 },
    /// The underlying byte source failed.
    Io { kind: io::ErrorKind, message: String },
}

impl DecodeError {
    /// Whether this error aborts the whole decode under every policy.
    ///
    /// A failing byte source or an unbalanced basis stack leaves nothing
    /// trustworthy to continue with.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::BasisUnderflow | Self::Io { .. })
    }

    /// Whether this error abandons the chunk it occurred in.
    ///
    /// Offsets inside that chunk can no longer be trusted, so its remaining
    /// sub-chunks are not attempted; sibling chunks still decode.
    #[must_use]
    pub fn aborts_chunk(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. } | Self::TruncatedStream { .. })
    }

    /// The absolute stream offset the error refers to, if any.
    #[must_use]
    pub fn position(&self) -> Option<u64> {
        match self {
            Self::StructuralAssertionFailure { position, .. }
            | Self::OutOfBounds { position, .. }
            | Self::TruncatedStream { position, .. } => Some(*position),
            _ => None,
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StructuralAssertionFailure {
                field,
                expected,
                actual,
                position,
            } => {
                write!(
                    f,
                    "structural assertion failed for {field} at {position:#x}: expected {expected:#x}, got {actual:#x}"
                )
            }
            Self::OutOfBounds {
                position,
                stream_length,
            } => {
                write!(
                    f,
                    "offset {position:#x} out of bounds for stream of {stream_length:#x} bytes"
                )
            }
            Self::TruncatedStream {
                position,
                needed,
                stream_length,
            } => {
                write!(
                    f,
                    "stream truncated: {needed} bytes needed at {position:#x}, stream is {stream_length:#x} bytes"
                )
            }
            Self::UnknownSubChunkType { tag } => write!(f, "unknown sub-chunk type {tag:#010x}"),
            Self::UnknownChunkKind { tag } => write!(f, "unknown chunk kind {tag:#06x}"),
            Self::BasisUnderflow => write!(f, "offset basis popped with none pushed"),
            Self::UnsupportedPixelFormat { format } => {
                write!(f, "pixel decoding for texture format {format:#04x} is not supported")
            }
            Self::Io { kind, message } => write!(f, "i/o error ({kind:?}): {message}"),
        }
    }
}

impl std::error::Error for DecodeError {}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        Self::Io {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Result type for decoding operations.
pub type DecodeResult<T> = Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let truncated = DecodeError::TruncatedStream {
            position: 0,
            needed: 4,
            stream_length: 2,
        };
        let out_of_bounds = DecodeError::OutOfBounds {
            position: 9,
            stream_length: 8,
        };
        assert!(!truncated.is_fatal());
        assert!(truncated.aborts_chunk());
        assert!(!out_of_bounds.is_fatal());
        assert!(out_of_bounds.aborts_chunk());
        assert!(DecodeError::BasisUnderflow.is_fatal());
        assert!(!DecodeError::BasisUnderflow.aborts_chunk());
        assert!(!DecodeError::UnknownSubChunkType { tag: 7 }.is_fatal());
        assert!(!DecodeError::UnknownChunkKind { tag: 0xFF01 }.is_fatal());
        assert!(
            !DecodeError::StructuralAssertionFailure {
                field: "padding",
                expected: 0,
                actual: 1,
                position: 0x10,
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_display_includes_position() {
        let err = DecodeError::StructuralAssertionFailure {
            field: "header end",
            expected: 0x800,
            actual: 0x400,
            position: 4,
        };
        let text = err.to_string();
        assert!(text.contains("header end"));
        assert!(text.contains("0x800"));
        assert!(text.contains("0x4"));
        assert_eq!(err.position(), Some(4));
    }

    #[test]
    fn test_from_io_error() {
        let io = io::Error::other("disk on fire");
        let err = DecodeError::from(io);
        assert!(matches!(
            err,
            DecodeError::Io {
                kind: io::ErrorKind::Other,
                ..
            }
        ));
        assert!(err.is_fatal());
    }
}
