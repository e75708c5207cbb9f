//! Seekable reader with a stack of offset bases.
//!
//! Offsets inside the container are relative to the start of whichever
//! structure declared them. Descending into such a structure pushes its
//! absolute start as the new basis; `seek_relative` then adds the top of the
//! stack. The stack lives in the cursor value, so two cursors over the same
//! bytes never interfere.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{LittleEndian, ReadBytesExt};
use glam::{Mat4, Vec2, Vec3, Vec4};

use crate::Rgba8;
use crate::error::{DecodeError, DecodeResult};

/// Any random-access byte source the decoder can read from.
pub trait ByteSource: Read + Seek {}

impl<T: Read + Seek> ByteSource for T {}

/// A little-endian reader that resolves offsets against a basis stack.
#[derive(Debug)]
pub struct RelativeCursor<R> {
    inner: R,
    len: u64,
    position: u64,
    bases: Vec<u64>,
}

impl<'a> RelativeCursor<Cursor<&'a [u8]>> {
    /// Create a cursor over an in-memory buffer.
    #[must_use]
    pub fn from_bytes(data: &'a [u8]) -> Self {
        Self {
            len: data.len() as u64,
            inner: Cursor::new(data),
            position: 0,
            bases: Vec::new(),
        }
    }
}

impl<R: ByteSource> RelativeCursor<R> {
    /// Wrap a seekable source, measuring its length up front.
    pub fn new(mut inner: R) -> DecodeResult<Self> {
        let len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self {
            inner,
            len,
            position: 0,
            bases: Vec::new(),
        })
    }

    /// Total length of the underlying stream in bytes.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Whether the underlying stream is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current absolute position.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.position
    }

    /// The basis relative seeks currently resolve against (0 with none pushed).
    #[must_use]
    pub fn basis(&self) -> u64 {
        self.bases.last().copied().unwrap_or(0)
    }

    /// Number of bases currently pushed.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.bases.len()
    }

    /// Bytes left between the current position and the end of the stream.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.len.saturating_sub(self.position)
    }

    /// Move to an absolute offset.
    pub fn seek_absolute(&mut self, position: u64) -> DecodeResult<()> {
        if position > self.len {
            return Err(DecodeError::OutOfBounds {
                position,
                stream_length: self.len,
            });
        }
        self.inner.seek(SeekFrom::Start(position))?;
        self.position = position;
        Ok(())
    }

    /// Move to an offset relative to the current basis.
    pub fn seek_relative(&mut self, offset: u64) -> DecodeResult<()> {
        let position = self
            .basis()
            .checked_add(offset)
            .ok_or(DecodeError::OutOfBounds {
                position: u64::MAX,
                stream_length: self.len,
            })?;
        self.seek_absolute(position)
    }

    /// Resolve a relative offset to an absolute one without moving.
    pub fn resolve(&self, offset: u64) -> DecodeResult<u64> {
        let position = self.basis().saturating_add(offset);
        if position > self.len {
            return Err(DecodeError::OutOfBounds {
                position,
                stream_length: self.len,
            });
        }
        Ok(position)
    }

    /// Make `basis` the origin for subsequent relative seeks.
    pub fn push_basis(&mut self, basis: u64) -> DecodeResult<()> {
        if basis > self.len {
            return Err(DecodeError::OutOfBounds {
                position: basis,
                stream_length: self.len,
            });
        }
        self.bases.push(basis);
        Ok(())
    }

    /// Restore the previous basis.
    pub fn pop_basis(&mut self) -> DecodeResult<u64> {
        self.bases.pop().ok_or(DecodeError::BasisUnderflow)
    }

    /// Run `f` with `basis` pushed, popping it again whether or not `f` fails.
    pub fn with_basis<T>(
        &mut self,
        basis: u64,
        f: impl FnOnce(&mut Self) -> DecodeResult<T>,
    ) -> DecodeResult<T> {
        self.push_basis(basis)?;
        let result = f(self);
        let popped = self.pop_basis();
        let value = result?;
        popped?;
        Ok(value)
    }

    /// Advance to the next multiple of `alignment` (absolute).
    pub fn align_to(&mut self, alignment: u64) -> DecodeResult<()> {
        let aligned = align_up(self.position, alignment);
        if aligned != self.position {
            self.seek_absolute(aligned)?;
        }
        Ok(())
    }

    /// Fail with `TruncatedStream` unless `needed` bytes remain.
    pub fn ensure_available(&self, needed: u64) -> DecodeResult<()> {
        if needed > self.remaining() {
            return Err(DecodeError::TruncatedStream {
                position: self.position,
                needed,
                stream_length: self.len,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> DecodeResult<u8> {
        self.ensure_available(1)?;
        let value = self.inner.read_u8()?;
        self.position += 1;
        Ok(value)
    }

    pub fn read_u16(&mut self) -> DecodeResult<u16> {
        self.ensure_available(2)?;
        let value = self.inner.read_u16::<LittleEndian>()?;
        self.position += 2;
        Ok(value)
    }

    pub fn read_u32(&mut self) -> DecodeResult<u32> {
        self.ensure_available(4)?;
        let value = self.inner.read_u32::<LittleEndian>()?;
        self.position += 4;
        Ok(value)
    }

    pub fn read_f32(&mut self) -> DecodeResult<f32> {
        self.ensure_available(4)?;
        let value = self.inner.read_f32::<LittleEndian>()?;
        self.position += 4;
        Ok(value)
    }

    /// Read a fixed-size byte string such as a signature.
    pub fn read_array<const N: usize>(&mut self) -> DecodeResult<[u8; N]> {
        self.ensure_available(N as u64)?;
        let mut bytes = [0u8; N];
        self.inner.read_exact(&mut bytes)?;
        self.position += N as u64;
        Ok(bytes)
    }

    pub fn read_vec2(&mut self) -> DecodeResult<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> DecodeResult<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec4(&mut self) -> DecodeResult<Vec4> {
        Ok(Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read sixteen floats as a column-major matrix.
    pub fn read_mat4(&mut self) -> DecodeResult<Mat4> {
        self.ensure_available(64)?;
        let mut cols = [0f32; 16];
        for value in &mut cols {
            *value = self.read_f32()?;
        }
        Ok(Mat4::from_cols_array(&cols))
    }

    pub fn read_rgba(&mut self) -> DecodeResult<Rgba8> {
        let [r, g, b, a] = self.read_array::<4>()?;
        Ok(Rgba8 { r, g, b, a })
    }
}

/// Round `value` up to the next multiple of `alignment`.
#[must_use]
pub fn align_up(value: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return value;
    }
    value.div_ceil(alignment) * alignment
}
