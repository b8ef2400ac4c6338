//! Video to ASCII-art video: extract, convert, rasterize, encode, clean up.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::batch::{convert_batch, list_source_images, BatchReport};
use crate::command::{CommandRunner, ExternalCommand};
use crate::convert::Converter;
use crate::pool::WorkerPool;
use crate::raster::{rasterize_batch, SizeSource};
use crate::{AsciiMediaError, Result};

pub const FFMPEG: &str = "ffmpeg";
pub const FFPROBE: &str = "ffprobe";

pub const TEMP_FRAMES_DIR: &str = "temp_frames";
pub const TEMP_SVG_DIR: &str = "temp_svg";
pub const TEMP_PNG_DIR: &str = "temp_output_png";

/// Rate handed to the encoder when the probe gives nothing usable.
pub const FALLBACK_FRAME_RATE: &str = "30/1";

const FRAME_PATTERN: &str = "frame_%09d";

#[derive(Debug)]
pub struct VideoRun {
    pub report: BatchReport,
    pub frame_rate: String,
    pub output: PathBuf,
}

/// Keeps a probed rate such as `30000/1001` verbatim; anything without a `/` is
/// replaced by [`FALLBACK_FRAME_RATE`].
pub fn normalize_frame_rate(probe_output: &str) -> String {
    let rate = probe_output.trim();
    if rate.is_empty() || !rate.contains('/') {
        FALLBACK_FRAME_RATE.to_string()
    } else {
        rate.to_string()
    }
}

/// `<stem>_<YYYYmmddHHMMSS><ext>`, e.g. `clip_20240131235959.mp4`.
pub fn output_file_name(source: &Path, at: DateTime<Local>) -> String {
    let stem = source.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = source
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    format!("{stem}_{}{ext}", at.format("%Y%m%d%H%M%S"))
}

/// 1-based number of the first frame that failed to convert, if any.
///
/// The image2 demuxer stops at the first missing file of a numbered sequence, so the
/// encoded video ends just before this frame.
pub fn first_missing_frame(report: &BatchReport) -> Option<usize> {
    report.results.iter().position(|r| !r.is_success()).map(|i| i + 1)
}

pub struct VideoPipeline<'a> {
    source: PathBuf,
    output_dir: PathBuf,
    converter: Converter,
    pool: &'a WorkerPool,
    runner: &'a dyn CommandRunner,
    frames_dir: PathBuf,
    svg_dir: PathBuf,
    png_dir: PathBuf,
    frame_rate: Option<String>,
}

impl<'a> VideoPipeline<'a> {
    pub fn new(
        source: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
        converter: Converter,
        pool: &'a WorkerPool,
        runner: &'a dyn CommandRunner,
    ) -> Self {
        let mut pipeline = Self {
            source: source.into(),
            output_dir: output_dir.into(),
            converter,
            pool,
            runner,
            frames_dir: PathBuf::new(),
            svg_dir: PathBuf::new(),
            png_dir: PathBuf::new(),
            frame_rate: None,
        };
        pipeline.set_workspace_root(Path::new("."));
        pipeline
    }

    /// Directory under which the three temp directories are created.
    pub fn with_workspace_root(mut self, root: impl AsRef<Path>) -> Self {
        self.set_workspace_root(root.as_ref());
        self
    }

    /// Skip probing and encode at `rate` (e.g. `"24000/1001"`).
    pub fn with_frame_rate(mut self, rate: impl Into<String>) -> Self {
        self.frame_rate = Some(rate.into());
        self
    }

    fn set_workspace_root(&mut self, root: &Path) {
        self.frames_dir = root.join(TEMP_FRAMES_DIR);
        self.svg_dir = root.join(TEMP_SVG_DIR);
        self.png_dir = root.join(TEMP_PNG_DIR);
    }

    pub fn temp_dirs(&self) -> [&Path; 3] {
        [&self.frames_dir, &self.svg_dir, &self.png_dir]
    }

    /// Run every stage in order. Temp directories are removed whether or not a
    /// stage fails.
    #[tracing::instrument(skip(self), fields(source = %self.source.display()))]
    pub fn run(&self) -> Result<VideoRun> {
        let result = self.run_stages();
        self.clean_up();
        result
    }

    fn run_stages(&self) -> Result<VideoRun> {
        let frames = self.extract_frames()?;
        let report = self.convert_frames(&frames)?;
        self.rasterize_frames(&report, &frames)?;
        let (frame_rate, output) = self.encode()?;
        Ok(VideoRun { report, frame_rate, output })
    }

    /// One JPEG per decoded frame (variable frame rate), numbered from 1.
    pub fn extract_frames(&self) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(&self.frames_dir)?;
        let cmd = ExternalCommand::new(FFMPEG)
            .arg("-i")
            .arg(&self.source)
            .args(["-vsync", "vfr", "-q:v", "2", "-threads", &self.pool.workers().to_string()])
            .arg(self.frames_dir.join(format!("{FRAME_PATTERN}.jpg")));
        self.runner.run(&cmd, "Extracting frames")?;

        let frames = list_source_images(&self.frames_dir)?;
        if frames.is_empty() {
            return Err(AsciiMediaError::pipeline(format!(
                "no frames were extracted from '{}'",
                self.source.display()
            )));
        }
        tracing::info!("Extracted {} frames", frames.len());
        Ok(frames)
    }

    pub fn convert_frames(&self, frames: &[PathBuf]) -> Result<BatchReport> {
        let report = convert_batch(self.pool, &self.converter, frames, &self.svg_dir)?;
        tracing::info!("Proceeding to PNG rendering...");
        Ok(report)
    }

    /// Render every converted frame at the size of the first extracted frame.
    pub fn rasterize_frames(&self, report: &BatchReport, frames: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let documents: Vec<PathBuf> = report.outputs().map(Path::to_path_buf).collect();
        if documents.is_empty() {
            return Err(AsciiMediaError::pipeline("no SVGs were found to convert to PNG"));
        }
        if let Some(frame) = first_missing_frame(report) {
            tracing::warn!(
                "frame {frame} failed to convert; the encoded video will end after frame {}",
                frame - 1
            );
        }
        let first = frames
            .first()
            .ok_or_else(|| AsciiMediaError::pipeline("no frames were found to determine the size"))?;
        let (w, h) = image::image_dimensions(first)?;

        let rendered = rasterize_batch(self.pool, self.runner, &documents, &SizeSource::Fixed(w, h), &self.png_dir)?;
        tracing::info!("Proceeding to final video encoding...");
        Ok(rendered)
    }

    /// The override if set, otherwise the source's average frame rate.
    pub fn detect_frame_rate(&self) -> Result<String> {
        if let Some(rate) = &self.frame_rate {
            return Ok(rate.clone());
        }
        let cmd = ExternalCommand::new(FFPROBE)
            .args([
                "-v",
                "error",
                "-select_streams",
                "v:0",
                "-show_entries",
                "stream=avg_frame_rate",
                "-of",
                "default=nw=1:nk=1",
            ])
            .arg(&self.source);
        let out = self.runner.run(&cmd, "Probing source frame rate")?;
        let rate = normalize_frame_rate(&out);
        tracing::info!("Detected source framerate: {rate}");
        Ok(rate)
    }

    /// Encode the rendered frames, copying the source's audio track when it has one.
    pub fn encode(&self) -> Result<(String, PathBuf)> {
        std::fs::create_dir_all(&self.output_dir)?;
        let output = self.output_dir.join(output_file_name(&self.source, Local::now()));
        let frame_rate = self.detect_frame_rate()?;

        let cmd = ExternalCommand::new(FFMPEG)
            .args(["-framerate", &frame_rate, "-i"])
            .arg(self.png_dir.join(format!("{FRAME_PATTERN}.png")))
            .arg("-i")
            .arg(&self.source)
            .args(["-c:v", "libx264", "-pix_fmt", "yuv420p"])
            .args(["-map", "0:v", "-map", "1:a?", "-shortest"])
            .arg(&output);
        self.runner.run(&cmd, "Creating final video")?;
        Ok((frame_rate, output))
    }

    /// Best-effort removal of the temp directories.
    pub fn clean_up(&self) {
        for dir in self.temp_dirs() {
            if let Err(e) = std::fs::remove_dir_all(dir) {
                tracing::debug!(dir = %dir.display(), "temp directory not removed: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn frame_rate_falls_back_without_separator() {
        assert_eq!(normalize_frame_rate(""), "30/1");
        assert_eq!(normalize_frame_rate("garbage"), "30/1");
        assert_eq!(normalize_frame_rate("  \n"), "30/1");
    }

    #[test]
    fn frame_rate_is_passed_through_verbatim() {
        assert_eq!(normalize_frame_rate("30000/1001\n"), "30000/1001");
        assert_eq!(normalize_frame_rate("25/1"), "25/1");
    }

    #[test]
    fn output_name_is_timestamped_and_keeps_extension() {
        let at = Local.with_ymd_and_hms(2024, 1, 31, 23, 59, 58).unwrap();
        assert_eq!(output_file_name(Path::new("/videos/clip.mp4"), at), "clip_20240131235958.mp4");
        assert_eq!(output_file_name(Path::new("raw"), at), "raw_20240131235958");
    }

    #[test]
    fn first_missing_frame_names_the_earliest_gap() {
        use crate::batch::ConversionResult;

        let result = |n: u32, ok: bool| ConversionResult {
            source: PathBuf::from(format!("frame_{n:09}.jpg")),
            output: ok.then(|| PathBuf::from(format!("frame_{n:09}.svg"))),
            error: (!ok).then(|| "decode failed".to_string()),
        };
        let complete = BatchReport { results: vec![result(1, true), result(2, true)] };
        assert_eq!(first_missing_frame(&complete), None);

        let gappy = BatchReport {
            results: vec![result(1, true), result(2, true), result(3, false), result(4, true), result(5, false)],
        };
        assert_eq!(first_missing_frame(&gappy), Some(3));
    }

    #[test]
    fn workspace_root_relocates_temp_dirs() {
        let pool = WorkerPool::new(Some(1)).unwrap();
        let runner = crate::command::SystemRunner;
        let p = VideoPipeline::new("in.mp4", "out", Converter::new(1).unwrap(), &pool, &runner)
            .with_workspace_root("/tmp/work");
        assert_eq!(
            p.temp_dirs(),
            [
                Path::new("/tmp/work/temp_frames"),
                Path::new("/tmp/work/temp_svg"),
                Path::new("/tmp/work/temp_output_png"),
            ]
        );
    }

    #[test]
    fn clean_up_tolerates_missing_dirs() {
        let root = tempfile::tempdir().unwrap();
        let pool = WorkerPool::new(Some(1)).unwrap();
        let runner = crate::command::SystemRunner;
        let p = VideoPipeline::new("in.mp4", "out", Converter::new(1).unwrap(), &pool, &runner)
            .with_workspace_root(root.path());
        std::fs::create_dir_all(root.path().join(TEMP_SVG_DIR).join("nested")).unwrap();
        p.clean_up();
        assert!(p.temp_dirs().iter().all(|d| !d.exists()));
    }
}
