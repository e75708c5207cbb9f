//! Builders for synthetic containers used by tests.
//!
//! Everything here writes the layouts the decoders read, so tests can state
//! what they want decoded instead of spelling out offsets by hand.

use byteorder::{LittleEndian, WriteBytesExt};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::Rgba8;
use crate::collision::{CollisionFace, FaceShape};
use crate::chunk::TEXTURE_CHUNK_TAG;
use crate::directory::{HEADER_END, PAGE_SIZE, SIGNATURE};
use crate::environment::{
    StageChunkIdentifier, TAG_COMPACT_ENVIRONMENT, TAG_MINOR, TAG_PADDING,
    TAG_STANDARD_ENVIRONMENT,
};
use crate::mesh::MeshSet;

fn len32(n: usize) -> u32 {
    u32::try_from(n).expect("fixture larger than 4 GiB")
}

/// Little-endian byte sink with chaining writes.
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn u16(&mut self, value: u16) -> &mut Self {
        self.buf
            .write_u16::<LittleEndian>(value)
            .expect("writing to a Vec cannot fail");
        self
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        self.buf
            .write_u32::<LittleEndian>(value)
            .expect("writing to a Vec cannot fail");
        self
    }

    pub fn f32(&mut self, value: f32) -> &mut Self {
        self.buf
            .write_f32::<LittleEndian>(value)
            .expect("writing to a Vec cannot fail");
        self
    }

    pub fn vec2(&mut self, v: Vec2) -> &mut Self {
        self.f32(v.x).f32(v.y)
    }

    pub fn vec3(&mut self, v: Vec3) -> &mut Self {
        self.f32(v.x).f32(v.y).f32(v.z)
    }

    pub fn vec4(&mut self, v: Vec4) -> &mut Self {
        self.f32(v.x).f32(v.y).f32(v.z).f32(v.w)
    }

    pub fn mat4(&mut self, m: &Mat4) -> &mut Self {
        for value in m.to_cols_array() {
            self.f32(value);
        }
        self
    }

    pub fn rgba(&mut self, c: Rgba8) -> &mut Self {
        self.bytes(&[c.r, c.g, c.b, c.a])
    }

    pub fn bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(data);
        self
    }

    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.buf.resize(self.buf.len() + count, 0);
        self
    }

    /// Zero-pad up to the next multiple of `alignment`.
    pub fn align(&mut self, alignment: usize) -> &mut Self {
        let aligned = self.buf.len().div_ceil(alignment) * alignment;
        self.buf.resize(aligned, 0);
        self
    }

    /// Overwrite a previously written word.
    pub fn patch_u32(&mut self, at: usize, value: u32) -> &mut Self {
        self.buf[at..at + 4].copy_from_slice(&value.to_le_bytes());
        self
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode a collision table; `None` or an empty group becomes a hole.
#[must_use]
pub fn collision_table(groups: &[Option<&[CollisionFace]>]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u32(len32(groups.len() * 8));
    let entries_at = w.len();
    w.zeros(groups.len() * 8);

    for (i, group) in groups.iter().enumerate() {
        let Some(faces) = group.filter(|f| !f.is_empty()) else {
            continue;
        };
        let table_at = w.len();
        w.u32(len32(faces.len())).zeros(12);
        for face in faces {
            write_face(&mut w, face);
        }
        w.patch_u32(entries_at + i * 8, len32(table_at));
        w.patch_u32(entries_at + i * 8 + 4, len32(faces.len()));
    }

    w.into_inner()
}

fn write_face(w: &mut ByteWriter, face: &CollisionFace) {
    let kind = match face.shape {
        FaceShape::Triangle(_) => 2,
        FaceShape::Quad(_) => 3,
    };
    w.u16(kind)
        .u16(face.flags)
        .u32(face.unknown)
        .u32(face.associated_chunk_index)
        .u32(0);
    for vertex in face.vertices() {
        w.vec4(*vertex);
    }
    if let FaceShape::Triangle(_) = face.shape {
        w.zeros(16);
    }
}

/// Encode a mesh table; `None` or an empty run becomes a hole.
#[must_use]
pub fn mesh_table(groups: &[Option<&[MeshSet]>]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    w.u32(len32(groups.len() * 8));
    let entries_at = w.len();
    w.zeros(groups.len() * 8);

    for (i, group) in groups.iter().enumerate() {
        let Some(sets) = group.filter(|s| !s.is_empty()) else {
            continue;
        };
        let run_at = w.len();
        for set in sets {
            write_mesh_set(&mut w, set);
        }
        w.patch_u32(entries_at + i * 8, len32(run_at));
        w.patch_u32(entries_at + i * 8 + 4, len32(w.len() - run_at));
    }

    w.into_inner()
}

fn write_mesh_set(w: &mut ByteWriter, set: &MeshSet) {
    w.u32(8).u32(0);
    for field in set.header_fields {
        w.u32(field);
    }
    w.u32(set.vertex_count).zeros(12);
    for vertex in &set.vertices {
        w.vec3(vertex.position).u32(vertex.extra);
    }
    for uv in &set.uvs {
        w.vec2(*uv);
    }
    for color in &set.colors {
        w.rgba(*color);
    }
}

/// One texture/palette pair to encode.
#[derive(Debug, Clone)]
pub struct TextureSpec {
    pub format: u8,
    pub width: u16,
    pub height: u16,
    pub palette_width: u16,
    pub palette_height: u16,
    pub palette: Vec<Rgba8>,
}

/// Encode a texture chunk body; each spec counts twice towards the header.
#[must_use]
pub fn texture_chunk(specs: &[TextureSpec]) -> Vec<u8> {
    let mut w = ByteWriter::new();
    let count = u8::try_from(specs.len() * 2).expect("too many textures for one chunk");
    w.u8(0).u8(count).u8(0).u8(0).zeros(12);

    let mut palette_offsets = Vec::with_capacity(specs.len());
    for (i, spec) in specs.iter().enumerate() {
        w.u8(1)
            .u8(spec.format)
            .u16(spec.width)
            .u16(spec.height)
            .u16(0)
            .u32(0x1000 + len32(i) * 0x100)
            .u32(0);
        w.u8(2)
            .u8(0)
            .u16(spec.palette_width)
            .u16(spec.palette_height)
            .u16(0);
        palette_offsets.push(w.len());
        w.u32(0).u32(0);
    }

    for (spec, field_at) in specs.iter().zip(palette_offsets) {
        w.align(0x10);
        let palette_at = len32(w.len());
        w.patch_u32(field_at, palette_at);
        for color in &spec.palette {
            w.rgba(*color);
        }
    }

    w.into_inner()
}

/// A standard or compact environment sub-chunk to encode.
#[derive(Debug, Clone)]
pub struct EnvironmentSpec {
    pub compact: bool,
    /// One matrix per slot; also sets the shared count.
    pub matrices: Vec<Mat4>,
    /// Must have as many entries as `matrices`.
    pub identifiers: Vec<StageChunkIdentifier>,
    /// Value written to every validation entry.
    pub validation_value: u32,
    /// Encoded collision table, from [`collision_table`].
    pub collision: Option<Vec<u8>>,
    /// Encoded mesh table, from [`mesh_table`].
    pub mesh: Option<Vec<u8>>,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self {
            compact: false,
            matrices: Vec::new(),
            identifiers: Vec::new(),
            validation_value: 0x0002_FFFF,
            collision: None,
            mesh: None,
        }
    }
}

/// One slot of an environment chunk's sub-chunk table.
#[derive(Debug, Clone)]
pub enum SubChunkSpec {
    Absent,
    Padding,
    Minor(u32),
    Environment(EnvironmentSpec),
    Raw { tag: u32, body: Vec<u8> },
}

/// Where things ended up inside an encoded environment chunk.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentLayout {
    /// Start of each present sub-chunk, in slot order.
    pub sub_chunks: Vec<usize>,
    /// Start of each environment sub-chunk's matrix table.
    pub matrix_tables: Vec<usize>,
}

/// Encode an environment chunk body.
#[must_use]
pub fn environment_chunk(slots: &[SubChunkSpec]) -> Vec<u8> {
    environment_chunk_with_layout(slots).0
}

/// Encode an environment chunk body and report where its parts landed.
#[must_use]
pub fn environment_chunk_with_layout(slots: &[SubChunkSpec]) -> (Vec<u8>, EnvironmentLayout) {
    let mut w = ByteWriter::new();
    let mut layout = EnvironmentLayout::default();

    w.u32(len32(slots.len()));
    let offsets_at = w.len();
    w.zeros(slots.len() * 4);

    for (slot, spec) in slots.iter().enumerate() {
        if matches!(spec, SubChunkSpec::Absent) {
            continue;
        }
        w.align(0x10);
        let start = w.len();
        w.patch_u32(offsets_at + slot * 4, len32(start));
        layout.sub_chunks.push(start);

        match spec {
            SubChunkSpec::Absent => {}
            SubChunkSpec::Padding => {
                w.u32(TAG_PADDING).zeros(12);
            }
            SubChunkSpec::Minor(value) => {
                w.u32(TAG_MINOR).u32(1).u32(*value);
            }
            SubChunkSpec::Raw { tag, body } => {
                w.u32(*tag).bytes(body);
            }
            SubChunkSpec::Environment(env) => {
                let matrix_at = write_environment(&mut w, env);
                layout.matrix_tables.push(matrix_at);
            }
        }
    }

    (w.into_inner(), layout)
}

/// Returns the position of the matrix table.
fn write_environment(w: &mut ByteWriter, env: &EnvironmentSpec) -> usize {
    let (tag, prologue_words) = if env.compact {
        (TAG_COMPACT_ENVIRONMENT, 11)
    } else {
        (TAG_STANDARD_ENVIRONMENT, 3)
    };
    w.u32(tag).zeros(prologue_words * 4);
    w.u32(len32(env.matrices.len()));
    let offsets_at = w.len();
    w.zeros(5 * 4);

    w.align(0x10);
    let matrix_at = w.len();
    if !env.matrices.is_empty() {
        w.patch_u32(offsets_at, len32(matrix_at));
        for matrix in &env.matrices {
            w.mat4(matrix);
        }

        w.align(0x10);
        w.patch_u32(offsets_at + 4, len32(w.len()));
        for identifier in &env.identifiers {
            w.u8(1)
                .u8(identifier.index)
                .u8(0)
                .u8(0)
                .u32(identifier.unknown1)
                .u32(identifier.unknown2)
                .u32(identifier.unknown3);
        }

        w.align(0x10);
        w.patch_u32(offsets_at + 8, len32(w.len()));
        for _ in &env.matrices {
            w.u32(env.validation_value);
        }
    }

    if let Some(collision) = &env.collision {
        w.align(0x10);
        w.patch_u32(offsets_at + 12, len32(w.len()));
        w.bytes(collision);
    }

    if let Some(mesh) = &env.mesh {
        w.align(0x10);
        w.patch_u32(offsets_at + 16, len32(w.len()));
        w.bytes(mesh);
    }

    matrix_at
}

/// A chunk to place in a container.
#[derive(Debug, Clone)]
pub struct ChunkSpec {
    pub type_tag: u16,
    pub tag_a: u16,
    pub tag_b: u16,
    pub body: Vec<u8>,
}

impl ChunkSpec {
    #[must_use]
    pub fn environment(stage: u16, body: Vec<u8>) -> Self {
        Self {
            type_tag: stage,
            tag_a: 0,
            tag_b: 0,
            body,
        }
    }

    #[must_use]
    pub fn texture(body: Vec<u8>) -> Self {
        Self {
            type_tag: TEXTURE_CHUNK_TAG,
            tag_a: 0,
            tag_b: 0,
            body,
        }
    }
}

/// Encode a whole container with page-aligned chunk bodies.
#[must_use]
pub fn container(chunks: &[ChunkSpec]) -> Vec<u8> {
    let page = usize::try_from(PAGE_SIZE).expect("page size fits in usize");
    let mut w = ByteWriter::new();
    w.u32(len32(chunks.len())).u32(HEADER_END).bytes(SIGNATURE);

    for chunk in chunks {
        let size = chunk.body.len();
        w.u32(len32(size))
            .u16(u16::try_from(size.div_ceil(page)).expect("chunk too large"))
            .u16(chunk.tag_a)
            .u16(chunk.tag_b)
            .u16(chunk.type_tag)
            .align(0x10);
    }
    assert!(w.len() <= page, "too many chunks for the header page");

    for chunk in chunks {
        w.align(page);
        w.bytes(&chunk.body);
    }
    w.align(page);

    w.into_inner()
}

/// A triangle and a quad with distinct values.
#[must_use]
pub fn sample_faces() -> Vec<CollisionFace> {
    vec![
        CollisionFace {
            flags: 0x0011,
            unknown: 0xAB,
            associated_chunk_index: 2,
            shape: FaceShape::Triangle([
                Vec4::new(0.0, 0.0, 0.0, 1.0),
                Vec4::new(1.0, 0.0, 0.0, 1.0),
                Vec4::new(0.0, 0.0, 1.0, 1.0),
            ]),
        },
        CollisionFace {
            flags: 0x0022,
            unknown: 0xCD,
            associated_chunk_index: 3,
            shape: FaceShape::Quad([
                Vec4::new(0.0, 1.0, 0.0, 1.0),
                Vec4::new(1.0, 1.0, 0.0, 1.0),
                Vec4::new(1.0, 1.0, 1.0, 1.0),
                Vec4::new(0.0, 1.0, 1.0, 1.0),
            ]),
        },
    ]
}

/// Two small mesh sets.
#[must_use]
pub fn sample_meshes() -> Vec<MeshSet> {
    use crate::mesh::MeshVertex;

    let set = |count: u32, base: f32| {
        let n = count as usize;
        MeshSet {
            header_fields: [count, 0x10, 0x20, 0x30, 0x40, 0x50],
            vertex_count: count,
            vertices: (0..n)
                .map(|i| MeshVertex {
                    position: Vec3::new(base, i as f32, -base),
                    extra: 0x8000,
                })
                .collect(),
            uvs: (0..n).map(|i| Vec2::new(0.25 * i as f32, 1.0)).collect(),
            colors: (0..n)
                .map(|i| Rgba8 {
                    r: 0x10,
                    g: 0x20,
                    b: 0x30,
                    a: u8::try_from(i).unwrap_or(u8::MAX),
                })
                .collect(),
        }
    };
    vec![set(3, 1.0), set(4, -2.0)]
}
