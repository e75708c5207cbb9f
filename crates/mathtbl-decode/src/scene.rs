//! Whole-container decoding.

use crate::chunk::{ChunkBody, ChunkOutcome, decode_chunk};
use crate::cursor::{ByteSource, RelativeCursor};
use crate::directory::{Chunk, read_directory};
use crate::environment::Environment;
use crate::error::DecodeResult;
use crate::options::{DecodeOptions, Diagnostic};
use crate::texture::TextureSet;

/// A directory entry and whatever its body decoded to.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedChunk {
    pub chunk: Chunk,
    /// `None` when the chunk was skipped; see the scene's diagnostics.
    pub body: Option<ChunkBody>,
}

/// Everything decoded from one container.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SceneData {
    pub chunks: Vec<DecodedChunk>,
    pub diagnostics: Vec<Diagnostic>,
}

impl SceneData {
    /// Pair directory entries with their outcomes, in directory order.
    #[must_use]
    pub fn from_outcomes(chunks: Vec<Chunk>, outcomes: Vec<ChunkOutcome>) -> Self {
        let mut scene = Self::default();
        for (chunk, outcome) in chunks.into_iter().zip(outcomes) {
            scene.diagnostics.extend(outcome.diagnostics);
            scene.chunks.push(DecodedChunk {
                chunk,
                body: outcome.body,
            });
        }
        scene
    }

    pub fn environments(&self) -> impl Iterator<Item = &Environment> {
        self.chunks.iter().filter_map(|c| match &c.body {
            Some(ChunkBody::Environment(environment)) => Some(environment),
            _ => None,
        })
    }

    pub fn texture_sets(&self) -> impl Iterator<Item = &TextureSet> {
        self.chunks.iter().filter_map(|c| match &c.body {
            Some(ChunkBody::TextureSet(set)) => Some(set),
            _ => None,
        })
    }

    /// Whether every chunk decoded without a diagnostic.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Decode a container with the default options.
pub fn decode<R: ByteSource>(source: R) -> DecodeResult<SceneData> {
    decode_with_options(source, &DecodeOptions::default())
}

/// Decode a container, chunk by chunk, on the calling thread.
pub fn decode_with_options<R: ByteSource>(
    source: R,
    options: &DecodeOptions,
) -> DecodeResult<SceneData> {
    let mut cursor = RelativeCursor::new(source)?;
    let chunks = read_directory(&mut cursor)?;

    let outcomes = chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| decode_chunk(&mut cursor, chunk, index, options))
        .collect::<DecodeResult<Vec<_>>>()?;

    Ok(SceneData::from_outcomes(chunks, outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::fixtures::{self, ChunkSpec, EnvironmentSpec, SubChunkSpec, TextureSpec};
    use crate::{Rgba8, SubChunk};
    use glam::Mat4;
    use std::io::Cursor;

    #[test]
    fn test_single_padding_environment() {
        let bytes = fixtures::container(&[ChunkSpec::environment(
            0,
            fixtures::environment_chunk(&[SubChunkSpec::Padding]),
        )]);
        let scene = decode(Cursor::new(bytes)).unwrap();

        assert!(scene.is_clean());
        assert_eq!(scene.chunks.len(), 1);
        let environment = scene.environments().next().unwrap();
        assert_eq!(environment.sub_chunks[0].variant, SubChunk::Padding);
        assert_eq!(environment.matrices().count(), 0);
        assert_eq!(environment.identifiers().count(), 0);
        assert_eq!(environment.collision_faces().count(), 0);
        assert_eq!(environment.mesh_sets().count(), 0);
    }

    #[test]
    fn test_texture_pair() {
        let bytes = fixtures::container(&[ChunkSpec::texture(fixtures::texture_chunk(&[
            TextureSpec {
                format: 0x13,
                width: 32,
                height: 32,
                palette_width: 2,
                palette_height: 1,
                palette: vec![Rgba8::default(); 2],
            },
        ]))]);
        let scene = decode(Cursor::new(bytes)).unwrap();

        let set = scene.texture_sets().next().unwrap();
        assert_eq!(set.declared_count, 2);
        assert_eq!(set.descriptors().count(), 1);
        assert_eq!(set.textures[0].palette_entries.len(), 2);
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let spec = EnvironmentSpec {
            matrices: vec![Mat4::IDENTITY; 2],
            identifiers: vec![
                crate::StageChunkIdentifier {
                    index: 0,
                    unknown1: 1,
                    unknown2: 2,
                    unknown3: 3,
                };
                2
            ],
            collision: Some(fixtures::collision_table(&[Some(
                &fixtures::sample_faces()[..],
            )])),
            mesh: Some(fixtures::mesh_table(&[Some(&fixtures::sample_meshes()[..])])),
            ..EnvironmentSpec::default()
        };
        let bytes = fixtures::container(&[
            ChunkSpec::environment(
                1,
                fixtures::environment_chunk(&[SubChunkSpec::Environment(spec)]),
            ),
            ChunkSpec::environment(2, fixtures::environment_chunk(&[SubChunkSpec::Minor(3)])),
        ]);

        let first = decode(Cursor::new(&bytes)).unwrap();
        let second = decode(Cursor::new(&bytes)).unwrap();
        assert_eq!(first, second);
        assert!(first.is_clean());
    }

    #[test]
    fn test_out_of_bounds_chunk_does_not_discard_siblings() {
        let mut bytes = fixtures::container(&[
            ChunkSpec::environment(1, fixtures::environment_chunk(&[SubChunkSpec::Padding])),
            ChunkSpec::environment(2, fixtures::environment_chunk(&[SubChunkSpec::Padding])),
        ]);
        // Point the second chunk's only slot far outside the file.
        bytes[0x1004..0x1008].copy_from_slice(&0x00FF_0000u32.to_le_bytes());

        let scene = decode(Cursor::new(&bytes)).unwrap();
        assert_eq!(scene.chunks.len(), 2);
        assert_eq!(scene.environments().count(), 1);
        assert!(scene.chunks[1].body.is_none());
        assert_eq!(scene.diagnostics.len(), 1);
        assert_eq!(scene.diagnostics[0].chunk, Some(1));
        assert!(scene.diagnostics[0].dropped);
        assert!(matches!(
            scene.diagnostics[0].error,
            DecodeError::OutOfBounds { .. }
        ));

        assert!(matches!(
            decode_with_options(Cursor::new(&bytes), &DecodeOptions::strict()),
            Err(DecodeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_truncated_matrix_table_drops_chunk() {
        let spec = EnvironmentSpec {
            matrices: vec![Mat4::IDENTITY; 4],
            identifiers: vec![
                crate::StageChunkIdentifier {
                    index: 0,
                    unknown1: 0,
                    unknown2: 0,
                    unknown3: 0,
                };
                4
            ],
            ..EnvironmentSpec::default()
        };
        let (body, layout) =
            fixtures::environment_chunk_with_layout(&[SubChunkSpec::Environment(spec)]);
        let bytes = fixtures::container(&[ChunkSpec::environment(1, body)]);
        let truncated = &bytes[..0x800 + layout.matrix_tables[0] + 64 + 20];

        let scene = decode(Cursor::new(truncated)).unwrap();
        assert_eq!(scene.chunks.len(), 1);
        assert!(scene.chunks[0].body.is_none());
        assert!(matches!(
            scene.diagnostics[0].error,
            DecodeError::TruncatedStream { .. }
        ));
    }

    #[test]
    fn test_diagnostics_are_collected_across_chunks() {
        let bytes = fixtures::container(&[
            ChunkSpec::environment(
                1,
                fixtures::environment_chunk(&[SubChunkSpec::Raw {
                    tag: 0x7777,
                    body: Vec::new(),
                }]),
            ),
            ChunkSpec {
                type_tag: 0xFF80,
                tag_a: 0,
                tag_b: 0,
                body: vec![0; 16],
            },
            ChunkSpec::environment(3, fixtures::environment_chunk(&[SubChunkSpec::Padding])),
        ]);
        let scene = decode(Cursor::new(bytes)).unwrap();

        assert_eq!(scene.chunks.len(), 3);
        assert!(scene.chunks[1].body.is_none());
        assert_eq!(scene.environments().count(), 2);
        assert_eq!(scene.diagnostics.len(), 2);
        assert_eq!(scene.diagnostics[0].chunk, Some(0));
        assert_eq!(
            scene.diagnostics[1].error,
            DecodeError::UnknownChunkKind { tag: 0xFF80 }
        );
    }
}
