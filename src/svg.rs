//! Glyph grid to SVG serialization.

use std::fmt::Write as _;
use std::path::Path;

use crate::convert::GlyphGrid;
use crate::{AsciiMediaError, Result};

const FONT_FAMILY: &str = "Arial";
const FOREGROUND: &str = "white";
const BACKGROUND: &str = "black";

/// One positioned glyph of a [`VectorDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphNode {
    pub x: u32,
    pub y: u32,
    pub glyph: char,
}

/// SVG document with one text node per grid cell, in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorDocument {
    pub width: u32,
    pub height: u32,
    pub font_size: u32,
    pub nodes: Vec<GlyphNode>,
}

impl VectorDocument {
    /// Lay out `grid` with square cells of `font_size` pixels.
    ///
    /// Text baselines sit at the bottom of each cell, so row `y` is placed at
    /// `(y + 1) * font_size`. Fails if the canvas does not fit in `u32`.
    pub fn from_grid(grid: &GlyphGrid, font_size: u32) -> Result<Self> {
        let canvas = |cells: u32| {
            cells.checked_mul(font_size).ok_or_else(|| {
                AsciiMediaError::config(format!(
                    "a {}x{} grid at font size {font_size} is too large to lay out",
                    grid.width(),
                    grid.height()
                ))
            })
        };
        let width = canvas(grid.width())?;
        let height = canvas(grid.height())?;

        // Every coordinate below is bounded by the canvas size.
        let mut nodes = Vec::with_capacity(grid.len());
        for (y, row) in grid.rows().enumerate() {
            for (x, &glyph) in row.iter().enumerate() {
                nodes.push(GlyphNode {
                    x: x as u32 * font_size,
                    y: (y as u32 + 1) * font_size,
                    glyph,
                });
            }
        }

        Ok(Self { width, height, font_size, nodes })
    }

    pub fn to_svg_string(&self) -> String {
        // ~100 bytes per text node
        let mut out = String::with_capacity(256 + self.nodes.len() * 100);
        out.push_str("<?xml version='1.0' encoding='utf-8'?>\n");
        let _ = write!(
            out,
            "<svg xmlns=\"http://www.w3.org/2000/svg\" version=\"1.1\" width=\"{}\" height=\"{}\" style=\"background-color:{BACKGROUND}\">",
            self.width, self.height
        );
        for node in &self.nodes {
            let _ = write!(
                out,
                "<text x=\"{}\" y=\"{}\" font-family=\"{FONT_FAMILY}\" font-size=\"{}\" fill=\"{FOREGROUND}\">",
                node.x, node.y, self.font_size
            );
            push_escaped(&mut out, node.glyph);
            out.push_str("</text>");
        }
        out.push_str("</svg>");
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_svg_string())?;
        Ok(())
    }
}

fn push_escaped(out: &mut String, c: char) {
    match c {
        '&' => out.push_str("&amp;"),
        '<' => out.push_str("&lt;"),
        '>' => out.push_str("&gt;"),
        _ => out.push(c),
    }
}
