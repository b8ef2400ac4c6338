//! Parallel image to SVG conversion with per-item failure capture.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::convert::Converter;
use crate::pool::WorkerPool;
use crate::{AsciiMediaError, Result};

pub const SOURCE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// How many failures the batch summary spells out.
const SHOWN_FAILURES: usize = 5;

/// Outcome of converting one source item. Exactly one of `output`/`error` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl ConversionResult {
    fn from_outcome(source: &Path, outcome: Result<PathBuf>) -> Self {
        match outcome {
            Ok(out) => Self { source: source.to_path_buf(), output: Some(out), error: None },
            Err(e) => Self { source: source.to_path_buf(), output: None, error: Some(e.to_string()) },
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub results: Vec<ConversionResult>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConversionResult> {
        self.results.iter().filter(|r| !r.is_success())
    }

    pub fn failed(&self) -> usize {
        self.failures().count()
    }

    pub fn outputs(&self) -> impl Iterator<Item = &Path> {
        self.results.iter().filter_map(|r| r.output.as_deref())
    }

    pub fn summary_line(&self) -> String {
        format!("Success: {}, Failed: {}", self.succeeded(), self.failed())
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    fn log_summary(&self) {
        tracing::info!("Completed. {}", self.summary_line());
        if self.failed() > 0 {
            tracing::warn!("First {} errors:", self.failed().min(SHOWN_FAILURES));
            for r in self.failures().take(SHOWN_FAILURES) {
                let name = r.source.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
                tracing::warn!("{name} -> {}", r.error.as_deref().unwrap_or_default());
            }
        }
    }
}

/// Supported source images directly inside `dir`, sorted by path.
pub fn list_source_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && has_source_extension(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SOURCE_EXTENSIONS.iter().any(|ok| e.eq_ignore_ascii_case(ok)))
        .unwrap_or(false)
}

/// For each source, the earlier source that already owns its file stem.
fn stem_owners(sources: &[PathBuf]) -> Vec<Option<&Path>> {
    let mut claimed: HashMap<&OsStr, &Path> = HashMap::new();
    sources
        .iter()
        .map(|src| match claimed.entry(src.file_stem()?) {
            Entry::Occupied(owner) => Some(*owner.get()),
            Entry::Vacant(slot) => {
                slot.insert(src);
                None
            }
        })
        .collect()
}

/// Convert every source to `<out_dir>/<stem>.svg` on `pool`.
///
/// Item failures end up in the report; only an empty input set or an unusable output
/// directory fail the call. A source whose stem is already taken by an earlier one
/// (`a.jpg` then `a.png`) fails instead of overwriting its output.
#[tracing::instrument(skip_all, fields(items = sources.len(), out_dir = %out_dir.display()))]
pub fn convert_batch(
    pool: &WorkerPool,
    converter: &Converter,
    sources: &[PathBuf],
    out_dir: &Path,
) -> Result<BatchReport> {
    if sources.is_empty() {
        return Err(AsciiMediaError::pipeline("no source images to convert"));
    }
    std::fs::create_dir_all(out_dir)?;

    tracing::info!("Input files detected: {}", sources.len());
    tracing::info!("Starting conversion with {} workers", pool.workers());

    let items: Vec<(&PathBuf, Option<&Path>)> = sources.iter().zip(stem_owners(sources)).collect();
    let results = pool.map(&items, |&(src, owner)| {
        let outcome = match owner {
            Some(first) => Err(AsciiMediaError::pipeline(format!(
                "output name clashes with '{}'",
                first.display()
            ))),
            None => converter.convert_file(src, out_dir),
        };
        ConversionResult::from_outcome(src, outcome)
    });
    let report = BatchReport { results };
    report.log_summary();
    Ok(report)
}
