//! SVG to PNG rasterization through `rsvg-convert` and ImageMagick `convert`.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::batch::SOURCE_EXTENSIONS;
use crate::command::{CommandRunner, ExternalCommand};
use crate::pool::WorkerPool;
use crate::{AsciiMediaError, Result};

pub const RASTERIZER: &str = "rsvg-convert";
pub const POST_PROCESSOR: &str = "convert";

/// Used when neither an explicit size nor a reference image is available.
pub const DEFAULT_SIZE: (u32, u32) = (550, 978);

/// Where a document's output size comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeSource {
    /// Every document is rendered at this size.
    Fixed(u32, u32),
    /// Each document is rendered at the size of the same-stem image in this directory.
    Siblings(PathBuf),
}

/// Output size for the document named `stem`.
///
/// Tries, in order: `override_size`, then `<reference_dir>/<stem>.{jpg,jpeg,png}`,
/// then [`DEFAULT_SIZE`]. Never fails.
pub fn resolve_target_size(
    stem: &OsStr,
    override_size: Option<(u32, u32)>,
    reference_dir: Option<&Path>,
) -> (u32, u32) {
    if let Some(size) = override_size {
        return size;
    }

    if let Some(dir) = reference_dir {
        for ext in SOURCE_EXTENSIONS {
            let mut name = stem.to_os_string();
            name.push(".");
            name.push(ext);
            let candidate = dir.join(name);
            if !candidate.is_file() {
                continue;
            }
            match image::image_dimensions(&candidate) {
                Ok(size) => return size,
                Err(e) => {
                    tracing::warn!(reference = %candidate.display(), "unreadable reference image: {e}");
                }
            }
        }
    }

    DEFAULT_SIZE
}

impl SizeSource {
    fn size_for(&self, stem: &OsStr) -> (u32, u32) {
        match self {
            SizeSource::Fixed(w, h) => resolve_target_size(stem, Some((*w, *h)), None),
            SizeSource::Siblings(dir) => resolve_target_size(stem, None, Some(dir)),
        }
    }
}

/// Render `svg` into `<out_dir>/<stem>.png` at exactly `width`x`height`, flattened
/// onto black.
pub fn rasterize_document(
    runner: &dyn CommandRunner,
    svg: &Path,
    (width, height): (u32, u32),
    out_dir: &Path,
) -> Result<PathBuf> {
    let stem = svg
        .file_stem()
        .ok_or_else(|| AsciiMediaError::pipeline(format!("no file stem in '{}'", svg.display())))?;
    let file_name = svg.file_name().unwrap_or(stem).to_string_lossy();

    let mut temp_name = stem.to_os_string();
    temp_name.push("_temp.png");
    let temp_png = out_dir.join(temp_name);
    let mut out_name = stem.to_os_string();
    out_name.push(".png");
    let out_png = out_dir.join(out_name);

    let rsvg = ExternalCommand::new(RASTERIZER)
        .args(["-w", &width.to_string(), "-h", &height.to_string()])
        .arg(svg)
        .arg("-o")
        .arg(&temp_png);
    runner.run(&rsvg, &format!("Converting {file_name} to temporary PNG"))?;

    let flatten = ExternalCommand::new(POST_PROCESSOR)
        .arg(&temp_png)
        .args(["-background", "black", "-flatten", "-extent", &format!("{width}x{height}")])
        .arg(&out_png);
    let final_name = out_png.file_name().unwrap_or_default().to_string_lossy();
    runner.run(&flatten, &format!("Generating final PNG {final_name}"))?;

    remove_file_if_exists(&temp_png)?;
    Ok(out_png)
}

/// Rasterize every document on `pool`.
///
/// All documents are attempted; the first tool failure (in input order) is returned.
#[tracing::instrument(skip_all, fields(documents = documents.len(), out_dir = %out_dir.display()))]
pub fn rasterize_batch(
    pool: &WorkerPool,
    runner: &dyn CommandRunner,
    documents: &[PathBuf],
    sizing: &SizeSource,
    out_dir: &Path,
) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(out_dir)?;
    let rendered = pool.try_map(documents, |svg| {
        let size = sizing.size_for(svg.file_stem().unwrap_or_default());
        rasterize_document(runner, svg, size, out_dir)
    })?;
    tracing::info!("Rendered {} PNG files", rendered.len());
    Ok(rendered)
}

pub(crate) fn remove_file_if_exists(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
        _ => Ok(()),
    }
}
