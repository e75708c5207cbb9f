//! Collision face tables.
//!
//! # Format
//!
//! All offsets are relative to the start of the collision table.
//!
//! - `byte_length: u32`, covering the entry list that follows
//! - entries of `(vertex_table_offset: u32, face_count: u32)` until the end;
//!   an entry with either field zero is a hole
//! - each vertex table: `face_count: u32`, three zero words, then the faces
//!
//! A face is `kind: u16, flags: u16, unknown: u32, associated_chunk: u32`,
//! a zero word and three `Vec4` corners. Quads carry a fourth corner;
//! triangles instead end in four zero words, so both are 80 bytes.

use glam::Vec4;

use crate::cursor::{ByteSource, RelativeCursor};
use crate::error::{DecodeError, DecodeResult};
use crate::options::{Risk, Validator};

const FACE_KIND_TRIANGLE: u16 = 2;
const FACE_KIND_QUAD: u16 = 3;

/// Size of one face record on disk, for either kind.
const FACE_SIZE: u64 = 80;

/// Polygon kind of a collision face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceKind {
    Triangle,
    Quad,
}

/// Corners of a collision face; the arity follows from the kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FaceShape {
    Triangle([Vec4; 3]),
    Quad([Vec4; 4]),
}

/// A single collision polygon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionFace {
    pub flags: u16,
    pub unknown: u32,
    pub associated_chunk_index: u32,
    pub shape: FaceShape,
}

impl CollisionFace {
    #[must_use]
    pub fn kind(&self) -> FaceKind {
        match self.shape {
            FaceShape::Triangle(_) => FaceKind::Triangle,
            FaceShape::Quad(_) => FaceKind::Quad,
        }
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vec4] {
        match &self.shape {
            FaceShape::Triangle(v) => v,
            FaceShape::Quad(v) => v,
        }
    }
}

/// Decode the collision table starting at `collision_base`.
///
/// Returns one group per non-hole entry, in table order.
pub fn decode_collision_faces<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    collision_base: u64,
    validator: &mut Validator,
) -> DecodeResult<Vec<Vec<CollisionFace>>> {
    cursor.with_basis(collision_base, |cursor| {
        cursor.seek_relative(0)?;
        let byte_length = cursor.read_u32()?;
        let end = cursor.position() + u64::from(byte_length);

        let mut groups = Vec::new();
        while cursor.position() < end {
            let vertex_table_offset = cursor.read_u32()?;
            let face_count = cursor.read_u32()?;
            if vertex_table_offset == 0 || face_count == 0 {
                continue;
            }

            let resume = cursor.position();
            cursor.seek_relative(u64::from(vertex_table_offset))?;
            groups.push(read_face_group(cursor, face_count, validator)?);
            cursor.seek_absolute(resume)?;
        }

        validator.check(
            "collision table end",
            end,
            cursor.position(),
            cursor.position(),
            Risk::High,
        )?;

        Ok(groups)
    })
}

fn read_face_group<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    face_count: u32,
    validator: &mut Validator,
) -> DecodeResult<Vec<CollisionFace>> {
    validator.expect_u32(cursor, "restated face count", face_count, Risk::Low)?;
    validator.expect_zero_words(cursor, "vertex table padding", 3)?;

    cursor.ensure_available(u64::from(face_count) * FACE_SIZE)?;
    (0..face_count)
        .map(|_| read_face(cursor, validator))
        .collect()
}

fn read_face<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    validator: &mut Validator,
) -> DecodeResult<CollisionFace> {
    let kind_position = cursor.position();
    let kind = cursor.read_u16()?;
    let flags = cursor.read_u16()?;
    let unknown = cursor.read_u32()?;
    let associated_chunk_index = cursor.read_u32()?;
    validator.expect_u32(cursor, "face reserved word", 0, Risk::Low)?;

    let a = cursor.read_vec4()?;
    let b = cursor.read_vec4()?;
    let c = cursor.read_vec4()?;

    let shape = match kind {
        FACE_KIND_TRIANGLE => {
            // Triangles pad out to the quad's size.
            validator.expect_zero_words(cursor, "triangle padding", 4)?;
            FaceShape::Triangle([a, b, c])
        }
        FACE_KIND_QUAD => FaceShape::Quad([a, b, c, cursor.read_vec4()?]),
        other => {
            return Err(DecodeError::StructuralAssertionFailure {
                field: "face kind",
                expected: FACE_KIND_TRIANGLE.into(),
                actual: other.into(),
                position: kind_position,
            });
        }
    };

    Ok(CollisionFace {
        flags,
        unknown,
        associated_chunk_index,
        shape,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, ByteWriter};
    use crate::options::DecodeOptions;
    use proptest::prelude::*;

    fn triangle(seed: f32) -> CollisionFace {
        CollisionFace {
            flags: 0x0101,
            unknown: 7,
            associated_chunk_index: 3,
            shape: FaceShape::Triangle([
                Vec4::new(seed, 0.0, 0.0, 1.0),
                Vec4::new(0.0, seed, 0.0, 1.0),
                Vec4::new(0.0, 0.0, seed, 1.0),
            ]),
        }
    }

    fn quad(seed: f32) -> CollisionFace {
        CollisionFace {
            flags: 0x0202,
            unknown: 9,
            associated_chunk_index: 4,
            shape: FaceShape::Quad([
                Vec4::new(seed, 0.0, 0.0, 1.0),
                Vec4::new(seed, seed, 0.0, 1.0),
                Vec4::new(0.0, seed, 0.0, 1.0),
                Vec4::new(0.0, 0.0, 0.0, 1.0),
            ]),
        }
    }

    fn decode(bytes: &[u8], options: &DecodeOptions) -> DecodeResult<Vec<Vec<CollisionFace>>> {
        let mut cursor = RelativeCursor::from_bytes(bytes);
        let mut validator = Validator::new(options);
        decode_collision_faces(&mut cursor, 0, &mut validator)
    }

    #[test]
    fn test_single_hole_is_empty() {
        let mut w = ByteWriter::new();
        w.u32(8).u32(0).u32(0);
        let groups = decode(&w.into_inner(), &DecodeOptions::strict()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_half_hole_is_skipped() {
        let mut w = ByteWriter::new();
        // Offset set but no faces, then faces but no offset.
        w.u32(16).u32(0x40).u32(0).u32(0).u32(5);
        let groups = decode(&w.into_inner(), &DecodeOptions::strict()).unwrap();
        assert!(groups.is_empty());
    }

    #[test]
    fn test_mixed_faces_keep_arity() {
        let faces = [triangle(1.0), quad(2.0), triangle(3.0)];
        let table = fixtures::collision_table(&[Some(&faces[..])]);
        let groups = decode(&table, &DecodeOptions::strict()).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], faces);
        for face in &groups[0] {
            match face.kind() {
                FaceKind::Triangle => assert_eq!(face.vertices().len(), 3),
                FaceKind::Quad => assert_eq!(face.vertices().len(), 4),
            }
        }
    }

    #[test]
    fn test_groups_around_holes() {
        let first = [quad(1.0)];
        let second = [triangle(2.0), triangle(4.0)];
        let table = fixtures::collision_table(&[Some(&first[..]), None, Some(&second[..]), None]);
        let groups = decode(&table, &DecodeOptions::strict()).unwrap();
        assert_eq!(groups, vec![first.to_vec(), second.to_vec()]);
    }

    #[test]
    fn test_relative_to_collision_base() {
        let faces = [triangle(5.0)];
        let table = fixtures::collision_table(&[Some(&faces[..])]);
        let mut bytes = vec![0xAA; 0x30];
        bytes.extend_from_slice(&table);

        let mut cursor = RelativeCursor::from_bytes(&bytes);
        let mut validator = Validator::new(&DecodeOptions::strict());
        let groups = decode_collision_faces(&mut cursor, 0x30, &mut validator).unwrap();
        assert_eq!(groups, vec![faces.to_vec()]);
        assert_eq!(cursor.depth(), 0);
    }

    #[test]
    fn test_unknown_face_kind_is_structural() {
        let mut table = fixtures::collision_table(&[Some(&[triangle(1.0)][..])]);
        // Entry list is 8 bytes, vertex table header is 16 bytes.
        let kind_at = 4 + 8 + 16;
        table[kind_at] = 5;
        let err = decode(&table, &DecodeOptions::lenient()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::StructuralAssertionFailure {
                field: "face kind",
                actual: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_restated_count_substituted_when_lenient() {
        let faces = [triangle(1.0), triangle(2.0)];
        let mut table = fixtures::collision_table(&[Some(&faces[..])]);
        table[12] = 9;

        assert!(decode(&table, &DecodeOptions::default()).is_err());

        let mut cursor = RelativeCursor::from_bytes(&table);
        let mut validator = Validator::new(&DecodeOptions::lenient());
        let groups = decode_collision_faces(&mut cursor, 0, &mut validator).unwrap();
        assert_eq!(groups, vec![faces.to_vec()]);
        assert_eq!(validator.take_notes().len(), 1);
    }

    #[test]
    fn test_straddling_entry_fails() {
        let mut w = ByteWriter::new();
        // Length ends halfway through the only entry.
        w.u32(4).u32(0).u32(0);
        let err = decode(&w.into_inner(), &DecodeOptions::lenient()).unwrap_err();
        assert!(matches!(
            err,
            DecodeError::StructuralAssertionFailure {
                field: "collision table end",
                ..
            }
        ));
    }

    #[test]
    fn test_truncated_faces() {
        let mut table = fixtures::collision_table(&[Some(&[quad(1.0), quad(2.0)][..])]);
        table.truncate(table.len() - 10);
        assert!(matches!(
            decode(&table, &DecodeOptions::default()),
            Err(DecodeError::TruncatedStream { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_hole_runs_end_exactly(holes in 0usize..16) {
            let groups: Vec<Option<&[CollisionFace]>> = vec![None; holes];
            let table = fixtures::collision_table(&groups);
            let mut cursor = RelativeCursor::from_bytes(&table);
            let mut validator = Validator::new(&DecodeOptions::strict());
            let decoded = decode_collision_faces(&mut cursor, 0, &mut validator).unwrap();
            prop_assert!(decoded.is_empty());
            prop_assert_eq!(cursor.position(), 4 + 8 * holes as u64);
        }

        #[test]
        fn prop_misaligned_length_is_rejected(entries in 1u32..8, short in 1u32..8) {
            let mut w = ByteWriter::new();
            w.u32(entries * 8 - short);
            for _ in 0..entries {
                w.u32(0).u32(0);
            }
            let bytes = w.into_inner();
            let result = decode(&bytes, &DecodeOptions::lenient());
            let is_table_end_failure = matches!(
                result,
                Err(DecodeError::StructuralAssertionFailure { field: "collision table end", .. })
            );
            prop_assert!(is_table_end_failure);
        }

        #[test]
        fn prop_group_layout(kinds in proptest::collection::vec(any::<bool>(), 1..12)) {
            let faces: Vec<CollisionFace> = kinds
                .iter()
                .enumerate()
                .map(|(i, is_quad)| if *is_quad { quad(i as f32) } else { triangle(i as f32) })
                .collect();
            let table = fixtures::collision_table(&[Some(&faces[..])]);
            let decoded = decode(&table, &DecodeOptions::strict()).unwrap();
            prop_assert_eq!(&decoded[0], &faces);
        }
    }
}
