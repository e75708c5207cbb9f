//! Texture and palette descriptor tables.
//!
//! A texture chunk starts with `0x00, texture_count: u8, 0x00, 0x00` and three
//! zero words. Descriptors follow as texture/palette pairs of 16-byte
//! records; `texture_count` counts both halves of each pair. Data offsets are
//! relative to the chunk start.
//!
//! Texture record: `[0x01][format][width: u16][height: u16][0: u16]
//! [data_offset: u32][0: u32]`.
//! Palette record: `[0x02][0x00][width: u16][height: u16][0: u16]
//! [data_offset: u32][0: u32]`.
//!
//! Palettes are `width * height` RGBA8 entries. The encoding of the pixel
//! planes themselves is not known, so they are left undecoded.

use crate::Rgba8;
use crate::cursor::{ByteSource, RelativeCursor};
use crate::error::{DecodeError, DecodeResult};
use crate::options::{Risk, Validator};

const TEXTURE_RECORD_TAG: u8 = 1;
const PALETTE_RECORD_TAG: u8 = 2;

/// Where a texture's pixel plane lives and how big it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    pub format: u8,
    pub width: u16,
    pub height: u16,
    pub data_offset: u32,
}

/// Where a palette lives and how many entries it has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteDescriptor {
    pub width: u16,
    pub height: u16,
    pub data_offset: u32,
}

impl PaletteDescriptor {
    /// Number of RGBA entries in the palette.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

/// A texture, its palette descriptor and the palette colours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PalettedTexture {
    pub texture: TextureDescriptor,
    pub palette: PaletteDescriptor,
    pub palette_entries: Vec<Rgba8>,
}

impl PalettedTexture {
    /// Decode the indexed pixel plane.
    ///
    /// Neither known format's bit layout has been worked out, so this always
    /// reports the format as unsupported rather than guessing.
    pub fn decode_pixels(&self) -> DecodeResult<Vec<Rgba8>> {
        Err(DecodeError::UnsupportedPixelFormat {
            format: self.texture.format,
        })
    }
}

/// The contents of a texture chunk.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextureSet {
    /// The count byte from the chunk header.
    pub declared_count: u8,
    pub textures: Vec<PalettedTexture>,
}

impl TextureSet {
    /// Texture descriptors in table order.
    pub fn descriptors(&self) -> impl Iterator<Item = &TextureDescriptor> {
        self.textures.iter().map(|t| &t.texture)
    }
}

/// Decode a texture chunk whose body starts at `chunk_base`.
pub fn decode_texture_set<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    chunk_base: u64,
    validator: &mut Validator,
) -> DecodeResult<TextureSet> {
    cursor.with_basis(chunk_base, |cursor| {
        cursor.seek_relative(0)?;
        validator.expect_u8(cursor, "texture header padding", 0, Risk::Low)?;
        let declared_count = cursor.read_u8()?;
        validator.expect_u8(cursor, "texture header padding", 0, Risk::Low)?;
        validator.expect_u8(cursor, "texture header padding", 0, Risk::Low)?;
        validator.expect_zero_words(cursor, "texture header padding", 3)?;

        let mut textures = Vec::with_capacity(usize::from(declared_count).div_ceil(2));
        for _ in (0..declared_count).step_by(2) {
            let texture = read_texture_record(cursor, validator)?;
            let palette = read_palette_record(cursor, validator)?;

            let resume = cursor.position();
            cursor.seek_relative(u64::from(palette.data_offset))?;
            let palette_entries = read_palette_entries(cursor, &palette)?;
            cursor.seek_absolute(resume)?;

            tracing::debug!(
                format = texture.format,
                width = texture.width,
                height = texture.height,
                palette_entries = palette_entries.len(),
                "texture"
            );
            textures.push(PalettedTexture {
                texture,
                palette,
                palette_entries,
            });
        }

        Ok(TextureSet {
            declared_count,
            textures,
        })
    })
}

fn read_texture_record<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    validator: &mut Validator,
) -> DecodeResult<TextureDescriptor> {
    validator.expect_u8(cursor, "texture record tag", TEXTURE_RECORD_TAG, Risk::High)?;
    let format = cursor.read_u8()?;
    let width = cursor.read_u16()?;
    let height = cursor.read_u16()?;
    validator.expect_u16(cursor, "texture record padding", 0, Risk::Low)?;
    let data_offset = cursor.read_u32()?;
    validator.expect_u32(cursor, "texture record padding", 0, Risk::Low)?;

    Ok(TextureDescriptor {
        format,
        width,
        height,
        data_offset,
    })
}

fn read_palette_record<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    validator: &mut Validator,
) -> DecodeResult<PaletteDescriptor> {
    validator.expect_u8(cursor, "palette record tag", PALETTE_RECORD_TAG, Risk::High)?;
    validator.expect_u8(cursor, "palette record padding", 0, Risk::Low)?;
    let width = cursor.read_u16()?;
    let height = cursor.read_u16()?;
    validator.expect_u16(cursor, "palette record padding", 0, Risk::Low)?;
    let data_offset = cursor.read_u32()?;
    validator.expect_u32(cursor, "palette record padding", 0, Risk::Low)?;

    Ok(PaletteDescriptor {
        width,
        height,
        data_offset,
    })
}

fn read_palette_entries<R: ByteSource>(
    cursor: &mut RelativeCursor<R>,
    palette: &PaletteDescriptor,
) -> DecodeResult<Vec<Rgba8>> {
    let count = palette.entry_count();
    cursor.ensure_available(count as u64 * 4)?;
    (0..count).map(|_| cursor.read_rgba()).collect()
}
