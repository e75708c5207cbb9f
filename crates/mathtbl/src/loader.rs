//! Loading containers from disk or memory.
//!
//! This module provides the main `Loader` type, which reads container bytes,
//! runs them through a decompressor and decodes every chunk, optionally
//! spreading the chunks across a rayon thread pool.

use crate::decompress::{Decompressor, NoDecompression};
use crate::error::{Error, Result};
use mathtbl_decode::{
    ByteSource, Chunk, ChunkOutcome, DecodeOptions, DecodeResult, RelativeCursor, SceneData,
    decode_chunk, read_directory,
};
use rayon::prelude::*;
use std::path::Path;

/// Reads and decodes `MATH_TBL` containers.
///
/// # Example
///
/// ```ignore
/// let loader = Loader::new()
///     .with_options(DecodeOptions::strict())
///     .with_parallelism(4);
/// let scene = loader.load_path("stage/st01.dat")?;
/// ```
#[derive(Debug, Clone)]
pub struct Loader<D: Decompressor = NoDecompression> {
    decompressor: D,
    options: DecodeOptions,
    parallelism: usize,
}

impl Loader<NoDecompression> {
    /// Create a loader for uncompressed containers that decodes on the
    /// calling thread.
    #[must_use]
    pub fn new() -> Self {
        Self {
            decompressor: NoDecompression,
            options: DecodeOptions::default(),
            parallelism: 1,
        }
    }
}

impl Default for Loader<NoDecompression> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Decompressor> Loader<D> {
    /// Replace the decompressor applied before decoding.
    #[must_use]
    pub fn with_decompressor<E: Decompressor>(self, decompressor: E) -> Loader<E> {
        Loader {
            decompressor,
            options: self.options,
            parallelism: self.parallelism,
        }
    }

    /// Set the validation options used for every chunk.
    #[must_use]
    pub fn with_options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Decode chunks on up to `threads` threads. `0` and `1` both mean the
    /// calling thread only.
    #[must_use]
    pub fn with_parallelism(mut self, threads: usize) -> Self {
        self.parallelism = threads.max(1);
        self
    }

    /// Use as many threads as the platform reports available.
    #[must_use]
    pub fn with_available_parallelism(self) -> Self {
        let threads = std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        self.with_parallelism(threads)
    }

    #[must_use]
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    #[must_use]
    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Read and decode the container at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, decompression fails or
    /// the container hits a fatal decode error.
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<SceneData> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "loaded container");
        self.decode_bytes(&data)
    }

    /// Decompress and decode an in-memory container.
    ///
    /// The result does not depend on the configured parallelism.
    ///
    /// # Errors
    ///
    /// Returns an error if decompression fails or the container hits a fatal
    /// decode error.
    pub fn decode_bytes(&self, data: &[u8]) -> Result<SceneData> {
        let bytes = self.decompressor.decompress(data)?;

        let mut cursor = RelativeCursor::from_bytes(&bytes);
        let chunks = read_directory(&mut cursor)?;

        let outcomes = if self.parallelism > 1 && chunks.len() > 1 {
            self.decode_parallel(&bytes, &chunks)?
        } else {
            decode_sequential(&mut cursor, &chunks, &self.options)?
        };

        let scene = SceneData::from_outcomes(chunks, outcomes);
        if !scene.is_clean() {
            tracing::warn!(
                diagnostics = scene.diagnostics.len(),
                "container decoded with diagnostics"
            );
        }
        Ok(scene)
    }

    /// Decode chunks on a dedicated rayon pool, one cursor per worker, and
    /// collect the outcomes in directory order.
    fn decode_parallel(&self, bytes: &[u8], chunks: &[Chunk]) -> DecodeResult<Vec<ChunkOutcome>> {
        let options = &self.options;
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.parallelism)
            .build()
        {
            Ok(pool) => pool,
            Err(e) => {
                tracing::warn!("failed to create thread pool: {e}, decoding on the calling thread");
                let mut cursor = RelativeCursor::from_bytes(bytes);
                return decode_sequential(&mut cursor, chunks, options);
            }
        };
        tracing::debug!(
            chunks = chunks.len(),
            threads = pool.current_num_threads(),
            "decoding in parallel"
        );

        let results: Vec<DecodeResult<ChunkOutcome>> = pool.install(|| {
            chunks
                .par_iter()
                .enumerate()
                .map_init(
                    || RelativeCursor::from_bytes(bytes),
                    |cursor, (index, chunk)| decode_chunk(cursor, chunk, index, options),
                )
                .collect()
        });

        // The first error in directory order, as a sequential decode reports.
        results.into_iter().collect()
    }
}

fn decode_sequential<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    chunks: &[Chunk],
    options: &DecodeOptions,
) -> DecodeResult<Vec<ChunkOutcome>> {
    chunks
        .iter()
        .enumerate()
        .map(|(index, chunk)| decode_chunk(cursor, chunk, index, options))
        .collect()
}
