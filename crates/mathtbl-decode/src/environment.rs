//! Environment chunks and their tagged sub-chunks.
//!
//! # Format
//!
//! An environment chunk begins with `count: u32` and `count` sub-chunk
//! offsets, relative to the chunk start, where `0` marks an empty slot. Each
//! sub-chunk begins with a `u32` tag that selects its layout.
//!
//! The two environment layouts share a body after a zero-filled prologue
//! (3 words for the standard layout, 11 for the compact one):
//!
//! - `unknown_count: u32` (N)
//! - offsets, relative to the chunk start, of the matrix table (N matrices),
//!   the stage-chunk identifier table (N records), the validation table
//!   (N words of `0x0002_FFFF`), the collision table and the mesh table
//!
//! A zero collision or mesh offset means the sub-chunk has no such table.
//!
//! A stage-chunk identifier record is 16 bytes: the bytes `[1, index, 0, 0]`
//! followed by three `u32` words. Only the marker and the two zero bytes are
//! checked.

use crate::collision::{CollisionFace, decode_collision_faces};
use crate::cursor::{ByteSource, RelativeCursor};
use crate::error::{DecodeError, DecodeResult};
use crate::mesh::{MeshSet, decode_mesh_sets};
use crate::options::{DecodeOptions, Diagnostic, Risk, Validator};
use crate::transform::TransformMatrix;

pub const TAG_PADDING: u32 = 0x0000_0000;
pub const TAG_STANDARD_ENVIRONMENT: u32 = 0x0100_0040;
pub const TAG_COMPACT_ENVIRONMENT: u32 = 0x0101_0060;
pub const TAG_MINOR: u32 = 0x0002_0014;

const STANDARD_PROLOGUE_WORDS: usize = 3;
const COMPACT_PROLOGUE_WORDS: usize = 11;
const VALIDATION_ENTRY: u32 = 0x0002_FFFF;
const IDENTIFIER_MARKER: u8 = 1;
const MINOR_MARKER: u32 = 1;

/// The layout selected by a sub-chunk tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubChunkTag {
    Padding,
    StandardEnvironment,
    CompactEnvironment,
    Minor,
    Unknown(u32),
}

impl From<u32> for SubChunkTag {
    fn from(tag: u32) -> Self {
        match tag {
            TAG_PADDING => Self::Padding,
            TAG_STANDARD_ENVIRONMENT => Self::StandardEnvironment,
            TAG_COMPACT_ENVIRONMENT => Self::CompactEnvironment,
            TAG_MINOR => Self::Minor,
            other => Self::Unknown(other),
        }
    }
}

/// Identifies the stage chunk a transform slot belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageChunkIdentifier {
    pub index: u8,
    pub unknown1: u32,
    pub unknown2: u32,
    pub unknown3: u32,
}

/// The tables reachable from a standard or compact environment sub-chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EnvironmentTables {
    pub matrices: Vec<TransformMatrix>,
    pub identifiers: Vec<StageChunkIdentifier>,
    pub collision_groups: Vec<Vec<CollisionFace>>,
    pub mesh_groups: Vec<Vec<MeshSet>>,
}

/// The small two-word record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinorRecord {
    pub value: u32,
}

/// A decoded sub-chunk body.
#[derive(Debug, Clone, PartialEq)]
pub enum SubChunk {
    Padding,
    StandardEnvironment(EnvironmentTables),
    CompactEnvironment(EnvironmentTables),
    Minor(MinorRecord),
    /// A tag with no known layout; its body is not read.
    Unknown(u32),
}

impl SubChunk {
    #[must_use]
    pub fn tables(&self) -> Option<&EnvironmentTables> {
        match self {
            Self::StandardEnvironment(tables) | Self::CompactEnvironment(tables) => Some(tables),
            _ => None,
        }
    }
}

/// A sub-chunk together with the slot and tag it was found under.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedSubChunk {
    pub slot: usize,
    pub tag: u32,
    pub variant: SubChunk,
}

/// A decoded environment chunk.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    /// Slot count as declared by the chunk, including empty slots.
    pub declared_slots: u32,
    pub sub_chunks: Vec<TaggedSubChunk>,
}

impl Environment {
    pub fn tables(&self) -> impl Iterator<Item = &EnvironmentTables> {
        self.sub_chunks.iter().filter_map(|s| s.variant.tables())
    }

    pub fn matrices(&self) -> impl Iterator<Item = &TransformMatrix> {
        self.tables().flat_map(|t| t.matrices.iter())
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &StageChunkIdentifier> {
        self.tables().flat_map(|t| t.identifiers.iter())
    }

    pub fn collision_faces(&self) -> impl Iterator<Item = &CollisionFace> {
        self.tables()
            .flat_map(|t| t.collision_groups.iter())
            .flatten()
    }

    pub fn mesh_sets(&self) -> impl Iterator<Item = &MeshSet> {
        self.tables().flat_map(|t| t.mesh_groups.iter()).flatten()
    }
}

/// Decode the environment chunk whose body starts at `chunk_base`.
///
/// Recoverable problems in individual sub-chunks are appended to
/// `diagnostics` under `chunk`; the sub-chunk is dropped and its siblings are
/// still decoded. Bounds and truncation errors end the whole chunk and are
/// returned.
pub fn decode_environment<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    chunk_base: u64,
    chunk: usize,
    options: &DecodeOptions,
    diagnostics: &mut Vec<Diagnostic>,
) -> DecodeResult<Environment> {
    cursor.with_basis(chunk_base, |cursor| {
        cursor.seek_relative(0)?;
        let declared_slots = cursor.read_u32()?;
        cursor.ensure_available(u64::from(declared_slots) * 4)?;
        let offsets = (0..declared_slots)
            .map(|_| cursor.read_u32())
            .collect::<DecodeResult<Vec<_>>>()?;

        let mut sub_chunks = Vec::new();
        for (slot, offset) in offsets.into_iter().enumerate() {
            if offset == 0 {
                continue;
            }

            let mut validator = Validator::new(options);
            let result = cursor.with_basis(chunk_base, |cursor| {
                cursor.seek_relative(u64::from(offset))?;
                let tag = cursor.read_u32()?;
                tracing::debug!(chunk, slot, offset, tag, "sub-chunk");
                let variant = decode_sub_chunk(cursor, tag, &mut validator)?;
                Ok(TaggedSubChunk { slot, tag, variant })
            });

            for note in validator.take_notes() {
                diagnostics.push(Diagnostic {
                    chunk: Some(chunk),
                    sub_chunk: Some(slot),
                    dropped: false,
                    error: note,
                });
            }

            match result {
                Ok(sub_chunk) => {
                    if let SubChunk::Unknown(tag) = sub_chunk.variant {
                        tracing::warn!(chunk, slot, tag, "unknown sub-chunk type");
                        diagnostics.push(Diagnostic {
                            chunk: Some(chunk),
                            sub_chunk: Some(slot),
                            dropped: true,
                            error: DecodeError::UnknownSubChunkType { tag },
                        });
                    }
                    sub_chunks.push(sub_chunk);
                }
                Err(error) if error.aborts_chunk() || options.escalates(&error) => {
                    return Err(error);
                }
                Err(error) => {
                    tracing::warn!(chunk, slot, %error, "skipping sub-chunk");
                    diagnostics.push(Diagnostic {
                        chunk: Some(chunk),
                        sub_chunk: Some(slot),
                        dropped: true,
                        error,
                    });
                }
            }
        }

        Ok(Environment {
            declared_slots,
            sub_chunks,
        })
    })
}

fn decode_sub_chunk<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    tag: u32,
    validator: &mut Validator,
) -> DecodeResult<SubChunk> {
    match SubChunkTag::from(tag) {
        SubChunkTag::Padding => {
            validator.expect_zero_words(cursor, "padding sub-chunk", 3)?;
            Ok(SubChunk::Padding)
        }
        SubChunkTag::StandardEnvironment => {
            validator.expect_zero_words(cursor, "environment prologue", STANDARD_PROLOGUE_WORDS)?;
            Ok(SubChunk::StandardEnvironment(decode_tables(cursor, validator)?))
        }
        SubChunkTag::CompactEnvironment => {
            validator.expect_zero_words(cursor, "environment prologue", COMPACT_PROLOGUE_WORDS)?;
            Ok(SubChunk::CompactEnvironment(decode_tables(cursor, validator)?))
        }
        SubChunkTag::Minor => {
            validator.expect_u32(cursor, "minor record marker", MINOR_MARKER, Risk::Low)?;
            Ok(SubChunk::Minor(MinorRecord {
                value: cursor.read_u32()?,
            }))
        }
        SubChunkTag::Unknown(tag) => Ok(SubChunk::Unknown(tag)),
    }
}

/// Read the shared environment body. Offsets resolve against the chunk basis.
fn decode_tables<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    validator: &mut Validator,
) -> DecodeResult<EnvironmentTables> {
    let count = cursor.read_u32()?;
    let matrix_offset = cursor.read_u32()?;
    let identifier_offset = cursor.read_u32()?;
    let validation_offset = cursor.read_u32()?;
    let collision_offset = cursor.read_u32()?;
    let mesh_offset = cursor.read_u32()?;

    let mut tables = EnvironmentTables::default();

    if count > 0 {
        cursor.seek_relative(u64::from(matrix_offset))?;
        tables.matrices = read_matrices(cursor, count)?;

        cursor.seek_relative(u64::from(identifier_offset))?;
        tables.identifiers = read_identifiers(cursor, count, validator)?;

        cursor.seek_relative(u64::from(validation_offset))?;
        cursor.ensure_available(u64::from(count) * 4)?;
        for _ in 0..count {
            validator.expect_u32(cursor, "validation entry", VALIDATION_ENTRY, Risk::Low)?;
        }
    }

    if collision_offset != 0 {
        let collision_base = cursor.resolve(u64::from(collision_offset))?;
        tables.collision_groups = decode_collision_faces(cursor, collision_base, validator)?;
    }

    if mesh_offset != 0 {
        let mesh_base = cursor.resolve(u64::from(mesh_offset))?;
        tables.mesh_groups = decode_mesh_sets(cursor, mesh_base, validator)?;
    }

    Ok(tables)
}

fn read_matrices<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    count: u32,
) -> DecodeResult<Vec<TransformMatrix>> {
    cursor.ensure_available(u64::from(count) * 64)?;
    (0..count)
        .map(|_| cursor.read_mat4().map(TransformMatrix::from))
        .collect()
}

fn read_identifiers<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    count: u32,
    validator: &mut Validator,
) -> DecodeResult<Vec<StageChunkIdentifier>> {
    cursor.ensure_available(u64::from(count) * 16)?;
    (0..count)
        .map(|_| {
            validator.expect_u8(cursor, "identifier marker", IDENTIFIER_MARKER, Risk::Low)?;
            let index = cursor.read_u8()?;
            validator.expect_u8(cursor, "identifier padding", 0, Risk::Low)?;
            validator.expect_u8(cursor, "identifier padding", 0, Risk::Low)?;
            Ok(StageChunkIdentifier {
                index,
                unknown1: cursor.read_u32()?,
                unknown2: cursor.read_u32()?,
                unknown3: cursor.read_u32()?,
            })
        })
        .collect()
}
