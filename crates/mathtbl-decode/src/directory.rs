//! The top-level chunk directory.
//!
//! # Format
//!
//! - `chunk_count: u32`
//! - `header_end: u32`, always `0x800`; the first chunk body starts here
//! - `signature: [u8; 8]`, `MATH_TBL`
//! - `chunk_count` descriptors of `size: u32, block_count: u16, tag_a: u16,
//!   tag_b: u16, type_tag: u16`, each padded to 16 bytes
//!
//! Chunk bodies follow one another, each starting on the next 0x800 page
//! after the end of the previous one.

use crate::cursor::{ByteSource, RelativeCursor, align_up};
use crate::error::{DecodeError, DecodeResult};

/// Alignment of chunk bodies.
pub const PAGE_SIZE: u64 = 0x800;

/// Expected end of the header page.
pub const HEADER_END: u32 = 0x800;

pub const SIGNATURE: &[u8; 8] = b"MATH_TBL";

const DESCRIPTOR_ALIGNMENT: u64 = 0x10;

/// A chunk descriptor with its resolved physical offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk {
    pub byte_size: u32,
    pub block_count: u16,
    pub tag_a: u16,
    pub tag_b: u16,
    pub type_tag: u16,
    /// Absolute offset of the chunk body.
    pub physical_offset: u64,
}

impl Chunk {
    /// Offset one past the end of the chunk body.
    #[must_use]
    pub fn end(&self) -> u64 {
        self.physical_offset + u64::from(self.byte_size)
    }
}

/// Read the directory and lay out every chunk body.
///
/// Header mismatches are always errors: without a trusted header nothing
/// after it can be located.
pub fn read_directory<R: ByteSource>(cursor: &mut RelativeCursor<R>) -> DecodeResult<Vec<Chunk>> {
    cursor.seek_absolute(0)?;
    let chunk_count = cursor.read_u32()?;

    let header_end_position = cursor.position();
    let header_end = cursor.read_u32()?;
    if header_end != HEADER_END {
        return Err(DecodeError::StructuralAssertionFailure {
            field: "header end",
            expected: HEADER_END.into(),
            actual: header_end.into(),
            position: header_end_position,
        });
    }

    let signature_position = cursor.position();
    let signature = cursor.read_array::<8>()?;
    if &signature != SIGNATURE {
        return Err(DecodeError::StructuralAssertionFailure {
            field: "signature",
            expected: u64::from_le_bytes(*SIGNATURE),
            actual: u64::from_le_bytes(signature),
            position: signature_position,
        });
    }

    cursor.ensure_available(u64::from(chunk_count) * DESCRIPTOR_ALIGNMENT)?;
    let mut chunks = Vec::with_capacity(chunk_count as usize);
    let mut physical_offset = u64::from(header_end);
    for index in 0..chunk_count {
        let byte_size = cursor.read_u32()?;
        let block_count = cursor.read_u16()?;
        let tag_a = cursor.read_u16()?;
        let tag_b = cursor.read_u16()?;
        let type_tag = cursor.read_u16()?;
        cursor.align_to(DESCRIPTOR_ALIGNMENT)?;

        let chunk = Chunk {
            byte_size,
            block_count,
            tag_a,
            tag_b,
            type_tag,
            physical_offset,
        };
        tracing::debug!(
            index,
            offset = chunk.physical_offset,
            size = chunk.byte_size,
            type_tag = chunk.type_tag,
            "chunk"
        );
        chunks.push(chunk);

        physical_offset = align_up(chunk.end(), PAGE_SIZE);
    }

    Ok(chunks)
}
