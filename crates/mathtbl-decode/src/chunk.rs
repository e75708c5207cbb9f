//! Routing chunk bodies to their decoders.

use crate::cursor::{ByteSource, RelativeCursor};
use crate::directory::Chunk;
use crate::environment::{Environment, decode_environment};
use crate::error::{DecodeError, DecodeResult};
use crate::options::{DecodeOptions, Diagnostic, Validator};
use crate::texture::{TextureSet, decode_texture_set};

/// Type tag of texture/palette chunks.
pub const TEXTURE_CHUNK_TAG: u16 = 0xFFFF;

/// Sentinel-style tags no known file uses for either kind.
const RESERVED_CHUNK_TAGS: std::ops::RangeInclusive<u16> = 0xFF00..=0xFFFE;

/// What a chunk's type tag says its body holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    Environment,
    TextureSet,
    Unknown(u16),
}

impl ChunkKind {
    #[must_use]
    pub fn classify(type_tag: u16) -> Self {
        match type_tag {
            TEXTURE_CHUNK_TAG => Self::TextureSet,
            tag if RESERVED_CHUNK_TAGS.contains(&tag) => Self::Unknown(tag),
            _ => Self::Environment,
        }
    }
}

/// A decoded chunk body.
#[derive(Debug, Clone, PartialEq)]
pub enum ChunkBody {
    Environment(Environment),
    TextureSet(TextureSet),
}

/// The result of decoding one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkOutcome {
    /// `None` when the chunk was skipped.
    pub body: Option<ChunkBody>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Decode a single chunk body.
///
/// `index` is the chunk's position in the directory and only labels
/// diagnostics. Each call is independent of every other chunk, so separate
/// cursors over the same bytes can decode chunks in parallel.
///
/// A chunk that fails, including one whose offsets run out of bounds, comes
/// back with no body and a dropped diagnostic. Only errors the options
/// escalate are returned.
pub fn decode_chunk<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    chunk: &Chunk,
    index: usize,
    options: &DecodeOptions,
) -> DecodeResult<ChunkOutcome> {
    let mut diagnostics = Vec::new();

    let result = match ChunkKind::classify(chunk.type_tag) {
        ChunkKind::Environment => decode_environment(
            cursor,
            chunk.physical_offset,
            index,
            options,
            &mut diagnostics,
        )
        .map(ChunkBody::Environment),
        ChunkKind::TextureSet => {
            let mut validator = Validator::new(options);
            let result = decode_texture_set(cursor, chunk.physical_offset, &mut validator);
            for note in validator.take_notes() {
                diagnostics.push(Diagnostic {
                    chunk: Some(index),
                    sub_chunk: None,
                    dropped: false,
                    error: note,
                });
            }
            result.map(ChunkBody::TextureSet)
        }
        ChunkKind::Unknown(tag) => Err(DecodeError::UnknownChunkKind { tag }),
    };

    match result {
        Ok(body) => Ok(ChunkOutcome {
            body: Some(body),
            diagnostics,
        }),
        Err(error) if options.escalates(&error) => Err(error),
        Err(error) => {
            tracing::warn!(chunk = index, %error, "skipping chunk");
            diagnostics.push(Diagnostic {
                chunk: Some(index),
                sub_chunk: None,
                dropped: true,
                error,
            });
            Ok(ChunkOutcome {
                body: None,
                diagnostics,
            })
        }
    }
}
