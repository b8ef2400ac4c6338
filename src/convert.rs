//! Image to glyph grid conversion.

use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use image::{DynamicImage, ImageReader};

use crate::ramp::GlyphRamp;
use crate::svg::VectorDocument;
use crate::{AsciiMediaError, Result};

pub const DEFAULT_FONT_SIZE: u32 = 10;
pub const MAX_FONT_SIZE: u32 = 256;

/// Row-major grid of glyphs, one per resized pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    width: u32,
    height: u32,
    cells: Vec<char>,
}

impl GlyphGrid {
    pub fn from_cells(width: u32, height: u32, cells: Vec<char>) -> Result<Self> {
        if width == 0 || height == 0 || cells.len() != (width as usize * height as usize) {
            return Err(AsciiMediaError::config(format!(
                "{} cells do not fill a {width}x{height} grid",
                cells.len()
            )));
        }
        Ok(Self { width, height, cells })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, x: u32, y: u32) -> Option<char> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.cells.get((y * self.width + x) as usize).copied()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[char]> {
        self.cells.chunks(self.width as usize)
    }
}

/// Grid dimensions for a source of `width`x`height` at `ratio`, never below 1x1.
pub fn grid_dimensions(width: u32, height: u32, ratio: u32) -> (u32, u32) {
    ((width / ratio).max(1), (height / ratio).max(1))
}

/// Converts images to glyph grids and SVG documents.
#[derive(Debug, Clone)]
pub struct Converter {
    ratio: u32,
    font_size: u32,
    ramp: GlyphRamp,
}

impl Converter {
    pub fn new(ratio: u32) -> Result<Self> {
        if ratio == 0 {
            return Err(AsciiMediaError::config("ratio must be a positive integer"));
        }
        Ok(Self { ratio, font_size: DEFAULT_FONT_SIZE, ramp: GlyphRamp::default() })
    }

    pub fn with_font_size(mut self, font_size: u32) -> Self {
        self.font_size = font_size.max(1);
        self
    }

    pub fn with_ramp(mut self, ramp: GlyphRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn ratio(&self) -> u32 {
        self.ratio
    }

    pub fn font_size(&self) -> u32 {
        self.font_size
    }

    pub fn grid(&self, image: &DynamicImage) -> GlyphGrid {
        let rgb = image.to_rgb8();
        let (w, h) = grid_dimensions(rgb.width(), rgb.height(), self.ratio);
        let resized = image::imageops::resize(&rgb, w, h, FilterType::Triangle);

        let cells = resized.pixels().map(|p| self.ramp.glyph_for_rgb(p.0)).collect();
        GlyphGrid { width: w, height: h, cells }
    }

    pub fn document(&self, image: &DynamicImage) -> Result<VectorDocument> {
        VectorDocument::from_grid(&self.grid(image), self.font_size)
    }

    /// Decode `path`, render it and write `<out_dir>/<stem>.svg`.
    pub fn convert_file(&self, path: &Path, out_dir: &Path) -> Result<PathBuf> {
        let image = ImageReader::open(path)?.with_guessed_format()?.decode()?;
        let stem = path
            .file_stem()
            .ok_or_else(|| AsciiMediaError::pipeline(format!("no file stem in '{}'", path.display())))?;
        let mut name = stem.to_os_string();
        name.push(".svg");
        let out_path = out_dir.join(name);
        self.document(&image)?.write_to(&out_path)?;
        Ok(out_path)
    }
}
