//! Brightness to glyph mapping.

use crate::{AsciiMediaError, Result};

/// Default ramp, ordered from sparsest to densest (16 levels).
pub const DEFAULT_GLYPHS: &[char] = &[
    ' ', '.', ':', ';', ',', '*', 'o', '8', '#', '&', '%', '@', '$', '=', '+', '^',
];

/// An immutable glyph ramp with a precomputed brightness lookup table.
///
/// Index 0 is the "blank" glyph. Every brightness value 0-255 maps to exactly one
/// glyph, and the mapping never decreases as brightness grows.
#[derive(Debug, Clone)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
    lut: [char; 256],
}

impl GlyphRamp {
    pub fn new(glyphs: impl Into<Vec<char>>) -> Result<Self> {
        let glyphs = glyphs.into();
        if glyphs.is_empty() {
            return Err(AsciiMediaError::config("glyph ramp must not be empty"));
        }

        let lut = build_lut(&glyphs);
        Ok(Self { glyphs, lut })
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Ramp index for a brightness value.
    pub fn index_for(&self, brightness: u8) -> usize {
        ramp_index(brightness, self.glyphs.len())
    }

    #[inline]
    pub fn glyph_for(&self, brightness: u8) -> char {
        self.lut[brightness as usize]
    }

    #[inline]
    pub fn glyph_for_rgb(&self, rgb: [u8; 3]) -> char {
        self.glyph_for(brightness(rgb))
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self { glyphs: DEFAULT_GLYPHS.to_vec(), lut: build_lut(DEFAULT_GLYPHS) }
    }
}

/// Average of the three channels, floored.
#[inline]
pub fn brightness([r, g, b]: [u8; 3]) -> u8 {
    ((r as u16 + g as u16 + b as u16) / 3) as u8
}

fn build_lut(glyphs: &[char]) -> [char; 256] {
    let mut lut = [' '; 256];
    for (b, slot) in lut.iter_mut().enumerate() {
        *slot = glyphs[ramp_index(b as u8, glyphs.len())];
    }
    lut
}

// Dividing by 256 keeps 255 inside the ramp; the min() only matters for N > 256.
#[inline]
fn ramp_index(brightness: u8, levels: usize) -> usize {
    (brightness as usize * levels / 256).min(levels - 1)
}
