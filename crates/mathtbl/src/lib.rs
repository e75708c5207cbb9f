//! Load and decode `MATH_TBL` stage containers.
//!
//! This crate wraps the synchronous decoder in `mathtbl-decode` with file
//! loading, a pluggable decompression step and optional multi-threaded chunk
//! decoding.
//!
//! # Design principles
//!
//! - **Pluggable backends**: Decompression is a trait; bring your own codec
//! - **Deterministic**: Parallel decoding returns exactly what a sequential
//!   decode returns
//! - **Sync decoding**: No async runtime; parallelism uses a rayon pool
//!
//! # Example
//!
//! ```ignore
//! use mathtbl::{Loader, SceneStats};
//!
//! let scene = Loader::new().with_parallelism(4).load_path("stage/st01.dat")?;
//! let stats = SceneStats::from_scene(&scene);
//! println!("{} collision faces, {} mesh sets", stats.faces(), stats.mesh_sets);
//! ```

pub mod decompress;
mod error;
mod loader;
pub mod types;

pub use decompress::{Decompressor, FnDecompressor, NoDecompression};
pub use error::{Error, Result};
pub use loader::Loader;
pub use types::{Bounds, SceneStats};

// Re-export decode types for convenience.
pub use mathtbl_decode::{
    ChunkBody, CollisionFace, DecodeError, DecodeOptions, Diagnostic, Environment, FaceKind,
    MeshSet, SceneData, SubChunk, TextureSet, ValidationPolicy,
};
