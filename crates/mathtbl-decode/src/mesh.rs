//! Renderable mesh set tables.
//!
//! # Format
//!
//! Offsets are relative to the start of the mesh table.
//!
//! - `byte_length: u32`, covering the entry list that follows
//! - entries of `(mesh_table_offset: u32, mesh_table_length: u32)`; an entry
//!   with either field zero is a hole
//! - each entry points at `mesh_table_length` bytes of back-to-back mesh sets
//!
//! A mesh set starts with a fixed block of twelve words:
//!
//! | Word | Contents | Checked |
//! |------|----------|---------|
//! | 0 | `8` | yes |
//! | 1 | `0` | yes |
//! | 2..=7 | `header_fields`, vary between sets | no |
//! | 8 | `vertex_count` | no |
//! | 9..=11 | `0` | yes |
//!
//! Three separate blocks of `vertex_count` items follow: positions (`Vec3`
//! plus a word), UVs (`Vec2`) and RGBA8 colours.

use glam::{Vec2, Vec3};

use crate::Rgba8;
use crate::cursor::{ByteSource, RelativeCursor};
use crate::error::DecodeResult;
use crate::options::{Risk, Validator};

const MESH_HEADER_MARKER: u32 = 8;

/// Bytes per vertex across the three blocks.
const VERTEX_STRIDE: u64 = 16 + 8 + 4;

/// A mesh vertex position with the word stored after it.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MeshVertex {
    pub position: Vec3,
    pub extra: u32,
}

/// One batch of renderable geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshSet {
    /// Header words 2 to 7, which vary between sets and are not checked.
    pub header_fields: [u32; 6],
    pub vertex_count: u32,
    pub vertices: Vec<MeshVertex>,
    pub uvs: Vec<Vec2>,
    pub colors: Vec<Rgba8>,
}

impl MeshSet {
    /// Whether the three vertex arrays agree with the declared count.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        let count = self.vertex_count as usize;
        self.vertices.len() == count && self.uvs.len() == count && self.colors.len() == count
    }
}

/// Decode the mesh table starting at `mesh_base`.
///
/// Returns the mesh sets of each non-hole entry, in table order.
pub fn decode_mesh_sets<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    mesh_base: u64,
    validator: &mut Validator,
) -> DecodeResult<Vec<Vec<MeshSet>>> {
    cursor.with_basis(mesh_base, |cursor| {
        cursor.seek_relative(0)?;
        let byte_length = cursor.read_u32()?;
        let end = cursor.position() + u64::from(byte_length);

        let mut groups = Vec::new();
        while cursor.position() < end {
            let mesh_table_offset = cursor.read_u32()?;
            let mesh_table_length = cursor.read_u32()?;
            if mesh_table_offset == 0 || mesh_table_length == 0 {
                continue;
            }

            let resume = cursor.position();
            cursor.seek_relative(u64::from(mesh_table_offset))?;
            groups.push(read_mesh_run(cursor, mesh_table_length, validator)?);
            cursor.seek_absolute(resume)?;
        }

        validator.check(
            "mesh table end",
            end,
            cursor.position(),
            cursor.position(),
            Risk::High,
        )?;

        Ok(groups)
    })
}

fn read_mesh_run<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    length: u32,
    validator: &mut Validator,
) -> DecodeResult<Vec<MeshSet>> {
    let end = cursor.position() + u64::from(length);
    cursor.ensure_available(u64::from(length))?;

    let mut sets = Vec::new();
    while cursor.position() < end {
        sets.push(read_mesh_set(cursor, validator)?);
    }

    validator.check(
        "mesh run end",
        end,
        cursor.position(),
        cursor.position(),
        Risk::High,
    )?;

    Ok(sets)
}

fn read_mesh_set<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    validator: &mut Validator,
) -> DecodeResult<MeshSet> {
    validator.expect_u32(cursor, "mesh header marker", MESH_HEADER_MARKER, Risk::Low)?;
    validator.expect_u32(cursor, "mesh header padding", 0, Risk::Low)?;
    let mut header_fields = [0u32; 6];
    for field in &mut header_fields {
        *field = cursor.read_u32()?;
    }

    let vertex_count = cursor.read_u32()?;
    validator.expect_zero_words(cursor, "mesh vertex count padding", 3)?;

    cursor.ensure_available(u64::from(vertex_count) * VERTEX_STRIDE)?;
    let count = vertex_count as usize;

    let mut vertices = Vec::with_capacity(count);
    for _ in 0..count {
        vertices.push(MeshVertex {
            position: cursor.read_vec3()?,
            extra: cursor.read_u32()?,
        });
    }

    let mut uvs = Vec::with_capacity(count);
    for _ in 0..count {
        uvs.push(cursor.read_vec2()?);
    }

    let mut colors = Vec::with_capacity(count);
    for _ in 0..count {
        colors.push(cursor.read_rgba()?);
    }

    Ok(MeshSet {
        header_fields,
        vertex_count,
        vertices,
        uvs,
        colors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::fixtures::{self, ByteWriter};
    use crate::options::DecodeOptions;
    use proptest::prelude::*;

    fn mesh(vertex_count: u32) -> MeshSet {
        let count = vertex_count as usize;
        MeshSet {
            header_fields: [1, 2, 3, 4, 5, 6],
            vertex_count,
            vertices: (0..count)
                .map(|i| MeshVertex {
                    position: Vec3::splat(i as f32),
                    extra: 0x8000,
                })
                .collect(),
            uvs: (0..count).map(|i| Vec2::new(i as f32 / 8.0, 0.5)).collect(),
            colors: (0..count)
                .map(|i| Rgba8 {
                    r: i as u8,
                    g: 0x80,
                    b: 0x40,
                    a: 0xFF,
                })
                .collect(),
        }
    }

    fn decode(bytes: &[u8], options: &DecodeOptions) -> DecodeResult<Vec<Vec<MeshSet>>> {
        let mut cursor = RelativeCursor::from_bytes(bytes);
        let mut validator = Validator::new(options);
        decode_mesh_sets(&mut cursor, 0, &mut validator)
    }

    #[test]
    fn test_empty_table() {
        let mut w = ByteWriter::new();
        w.u32(0);
        assert!(
            decode(&w.into_inner(), &DecodeOptions::strict())
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_parallel_arrays() {
        let sets = [mesh(3), mesh(0), mesh(5)];
        let table = fixtures::mesh_table(&[Some(&sets[..])]);
        let groups = decode(&table, &DecodeOptions::strict()).unwrap();

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0], sets);
        for set in &groups[0] {
            assert!(set.is_consistent());
        }
    }

    #[test]
    fn test_holes_between_runs() {
        let a = [mesh(2)];
        let b = [mesh(1), mesh(4)];
        let table = fixtures::mesh_table(&[None, Some(&a[..]), None, Some(&b[..])]);
        let groups = decode(&table, &DecodeOptions::strict()).unwrap();
        assert_eq!(groups, vec![a.to_vec(), b.to_vec()]);
    }

    #[test]
    fn test_header_marker_checked() {
        let mut table = fixtures::mesh_table(&[Some(&[mesh(1)][..])]);
        // Entry list is 8 bytes; the run starts right after it.
        table[12] = 7;

        assert!(matches!(
            decode(&table, &DecodeOptions::default()),
            Err(DecodeError::StructuralAssertionFailure {
                field: "mesh header marker",
                expected: 8,
                actual: 7,
                ..
            })
        ));

        let mut cursor = RelativeCursor::from_bytes(&table);
        let mut validator = Validator::new(&DecodeOptions::lenient());
        let groups = decode_mesh_sets(&mut cursor, 0, &mut validator).unwrap();
        assert_eq!(groups[0], vec![mesh(1)]);
        assert_eq!(validator.take_notes().len(), 1);
    }

    #[test]
    fn test_only_fixed_header_words_are_checked() {
        let mut set = mesh(1);
        set.header_fields = [0xFFFF_FFFF, 0, 0x8000_0000, 7, 0x10, 0xDEAD_BEEF];
        let table = fixtures::mesh_table(&[Some(&[set.clone()][..])]);
        let groups = decode(&table, &DecodeOptions::strict()).unwrap();
        assert_eq!(groups[0], vec![set]);

        let mut padded = table.clone();
        // Run starts at 12; word 10 of the set header sits at 12 + 40.
        padded[52] = 1;
        assert!(matches!(
            decode(&padded, &DecodeOptions::default()),
            Err(DecodeError::StructuralAssertionFailure {
                field: "mesh vertex count padding",
                ..
            })
        ));

        let mut padded = table;
        padded[16] = 3;
        assert!(matches!(
            decode(&padded, &DecodeOptions::default()),
            Err(DecodeError::StructuralAssertionFailure {
                field: "mesh header padding",
                expected: 0,
                actual: 3,
                ..
            })
        ));
    }

    #[test]
    fn test_run_length_overshoot_is_rejected() {
        let mut table = fixtures::mesh_table(&[Some(&[mesh(2)][..])]);
        // Shorten the declared run so the mesh set spills over its end.
        let declared = u32::from_le_bytes(table[8..12].try_into().unwrap());
        table[8..12].copy_from_slice(&(declared - 4).to_le_bytes());

        assert!(matches!(
            decode(&table, &DecodeOptions::lenient()),
            Err(DecodeError::StructuralAssertionFailure {
                field: "mesh run end",
                ..
            })
        ));
    }

    #[test]
    fn test_vertex_count_beyond_stream() {
        let mut w = ByteWriter::new();
        w.u32(8).u32(12).u32(48);
        w.u32(8).u32(0).u32(0).u32(0).u32(0).u32(0).u32(0).u32(0);
        w.u32(0xFFFF_FFFF).u32(0).u32(0).u32(0);
        assert!(matches!(
            decode(&w.into_inner(), &DecodeOptions::default()),
            Err(DecodeError::TruncatedStream { .. })
        ));
    }

    proptest! {
        #[test]
        fn prop_hole_runs_end_exactly(holes in 0usize..16) {
            let groups: Vec<Option<&[MeshSet]>> = vec![None; holes];
            let table = fixtures::mesh_table(&groups);
            let mut cursor = RelativeCursor::from_bytes(&table);
            let mut validator = Validator::new(&DecodeOptions::strict());
            let decoded = decode_mesh_sets(&mut cursor, 0, &mut validator).unwrap();
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
                Err(DecodeError::StructuralAssertionFailure { field: "mesh table end", .. })
            );
            prop_assert!(is_table_end_failure);
        }

        #[test]
        fn prop_arrays_match_declared_count(counts in proptest::collection::vec(0u32..24, 1..6)) {
            let sets: Vec<MeshSet> = counts.iter().map(|&n| mesh(n)).collect();
            let table = fixtures::mesh_table(&[Some(&sets[..])]);
            let groups = decode(&table, &DecodeOptions::strict()).unwrap();
            for (decoded, &n) in groups[0].iter().zip(&counts) {
                prop_assert_eq!(decoded.vertices.len(), n as usize);
                prop_assert_eq!(decoded.uvs.len(), n as usize);
                prop_assert_eq!(decoded.colors.len(), n as usize);
            }
        }
    }
}
