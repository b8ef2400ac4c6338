//! Directory of images to ASCII-art PNGs.

use std::path::{Path, PathBuf};

use crate::batch::{convert_batch, list_source_images, BatchReport};
use crate::command::CommandRunner;
use crate::convert::Converter;
use crate::pool::WorkerPool;
use crate::raster::{rasterize_batch, remove_file_if_exists, SizeSource};
use crate::{AsciiMediaError, Result};

pub const TEMP_SVG_DIR: &str = "temp_svg";

#[derive(Debug)]
pub struct ImageRun {
    pub report: BatchReport,
    pub outputs: Vec<PathBuf>,
}

/// Supported images in `input_dir`, failing if the directory is missing or has none.
pub fn collect_sources(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(AsciiMediaError::config(format!(
            "input directory '{}' does not exist",
            input_dir.display()
        )));
    }
    let sources = list_source_images(input_dir)?;
    if sources.is_empty() {
        return Err(AsciiMediaError::pipeline(format!(
            "no images (.jpg, .jpeg, .png) found in '{}'",
            input_dir.display()
        )));
    }
    Ok(sources)
}

/// Convert every image in `input_dir` into `<output_dir>/<stem>.png`, each rendered
/// at its source's resolution.
///
/// Intermediate SVGs go to `<workspace_root>/temp_svg`, which is removed on success
/// and on failure.
#[tracing::instrument(skip(pool, runner, converter))]
pub fn convert_images(
    pool: &WorkerPool,
    runner: &dyn CommandRunner,
    converter: &Converter,
    input_dir: &Path,
    output_dir: &Path,
    workspace_root: &Path,
) -> Result<ImageRun> {
    let sources = collect_sources(input_dir)?;
    let svg_dir = workspace_root.join(TEMP_SVG_DIR);
    let result = render(pool, runner, converter, &sources, input_dir, output_dir, &svg_dir);
    let _ = std::fs::remove_dir_all(&svg_dir);
    result
}

fn render(
    pool: &WorkerPool,
    runner: &dyn CommandRunner,
    converter: &Converter,
    sources: &[PathBuf],
    input_dir: &Path,
    output_dir: &Path,
    svg_dir: &Path,
) -> Result<ImageRun> {
    std::fs::create_dir_all(svg_dir)?;
    std::fs::create_dir_all(output_dir)?;

    let report = convert_batch(pool, converter, sources, svg_dir)?;
    tracing::info!("Proceeding to PNG rendering...");

    let mut documents: Vec<PathBuf> = report.outputs().map(Path::to_path_buf).collect();
    documents.sort();
    documents.dedup();
    if documents.is_empty() {
        return Err(AsciiMediaError::pipeline("no SVGs were generated, check the conversion errors"));
    }

    let sizing = SizeSource::Siblings(input_dir.to_path_buf());
    let outputs = rasterize_batch(pool, runner, &documents, &sizing, output_dir)?;
    for svg in &documents {
        remove_file_if_exists(svg)?;
    }

    Ok(ImageRun { report, outputs })
}
