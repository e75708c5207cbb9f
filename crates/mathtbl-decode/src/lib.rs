//! Decode chunked `MATH_TBL` stage containers.
//!
//! A container holds a directory of page-aligned chunks. Environment chunks
//! carry tagged sub-chunks with transform, collision and mesh tables; texture
//! chunks carry texture/palette descriptor pairs. Every offset inside a chunk
//! is relative to the chunk start, which [`RelativeCursor`] resolves through
//! a stack of base offsets.
//!
//! # Design principles
//!
//! - **Synchronous**: No async, no threading primitives
//! - **User-controlled parallelism**: Chunks decode independently through
//!   [`decode_chunk`], so callers decide how to spread them across threads
//! - **Bounded reads**: Declared counts are checked against the stream before
//!   any table is allocated
//!
//! # Example
//!
//! ```ignore
//! let scene = mathtbl_decode::decode(std::fs::File::open("stage.dat")?)?;
//! for environment in scene.environments() {
//!     println!("{} collision faces", environment.collision_faces().count());
//! }
//! ```

pub mod chunk;
pub mod collision;
pub mod cursor;
pub mod directory;
pub mod environment;
mod error;
pub mod mesh;
pub mod options;
mod scene;
pub mod texture;
pub mod transform;

#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;

pub use chunk::{ChunkBody, ChunkKind, ChunkOutcome, decode_chunk};
pub use collision::{CollisionFace, FaceKind, FaceShape};
pub use cursor::{ByteSource, RelativeCursor};
pub use directory::{Chunk, read_directory};
pub use environment::{
    Environment, EnvironmentTables, MinorRecord, StageChunkIdentifier, SubChunk, TaggedSubChunk,
};
pub use error::{DecodeError, DecodeResult};
pub use mesh::{MeshSet, MeshVertex};
pub use options::{DecodeOptions, Diagnostic, ValidationPolicy};
pub use scene::{DecodedChunk, SceneData, decode, decode_with_options};
pub use texture::{PaletteDescriptor, PalettedTexture, TextureDescriptor, TextureSet};
pub use transform::{Transform, TransformMatrix};

/// An 8-bit RGBA colour, as stored in palettes and mesh vertex colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rgba8 {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba8 {
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Channels as `[r, g, b, a]`.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}
