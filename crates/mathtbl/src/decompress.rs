//! Decompression applied to container bytes before decoding.
//!
//! Some distributions of the stage files are stored compressed. The loader
//! runs every input through a [`Decompressor`] first.
//!
//! # Implementations
//!
//! - [`NoDecompression`]: Passthrough for uncompressed containers
//! - [`FnDecompressor`]: Adapts a closure, for codecs supplied by the caller

use crate::error::{Error, Result};
use std::borrow::Cow;
use std::fmt;

/// Turns stored bytes into raw container bytes.
pub trait Decompressor: Send + Sync {
    /// Decompress `data`.
    ///
    /// Implementations that have nothing to do should return
    /// `Cow::Borrowed(data)` so no copy is made.
    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>>;
}

/// A decompressor that returns its input unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDecompression;

impl NoDecompression {
    /// Create a new passthrough decompressor.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Decompressor for NoDecompression {
    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        Ok(Cow::Borrowed(data))
    }
}

/// A decompressor backed by a closure.
///
/// The closure's error message is wrapped in [`Error::Decompress`].
#[derive(Clone)]
pub struct FnDecompressor<F> {
    f: F,
}

impl<F> FnDecompressor<F>
where
    F: Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync,
{
    #[must_use]
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnDecompressor<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnDecompressor").finish_non_exhaustive()
    }
}

impl<F> Decompressor for FnDecompressor<F>
where
    F: Fn(&[u8]) -> std::result::Result<Vec<u8>, String> + Send + Sync,
{
    fn decompress<'a>(&self, data: &'a [u8]) -> Result<Cow<'a, [u8]>> {
        (self.f)(data)
            .map(Cow::Owned)
            .map_err(|message| Error::Decompress { message })
    }
}
