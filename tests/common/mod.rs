#![allow(dead_code)]

use std::ffi::OsStr;
use std::path::Path;
use std::sync::Mutex;

use asciimedia::{AsciiMediaError, CommandRunner, ExternalCommand, Result};
use image::{Rgb, RgbImage};

/// Stands in for ffmpeg, ffprobe, rsvg-convert and convert.
///
/// Every call is recorded, and each tool leaves behind the files the real one
/// would have written, so the pipelines can run end to end.
pub struct FakeTools {
    pub frame_count: u32,
    pub frame_size: (u32, u32),
    pub probe_output: String,
    pub failing_program: Option<String>,
    pub commands: Mutex<Vec<ExternalCommand>>,
}

impl FakeTools {
    pub fn new() -> Self {
        Self {
            frame_count: 0,
            frame_size: (32, 16),
            probe_output: String::new(),
            failing_program: None,
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn with_frames(mut self, count: u32, size: (u32, u32)) -> Self {
        self.frame_count = count;
        self.frame_size = size;
        self
    }

    pub fn with_probe_output(mut self, out: &str) -> Self {
        self.probe_output = out.to_string();
        self
    }

    pub fn failing(mut self, program: &str) -> Self {
        self.failing_program = Some(program.to_string());
        self
    }

    pub fn recorded(&self) -> Vec<ExternalCommand> {
        self.commands.lock().unwrap().clone()
    }

    pub fn calls_to(&self, program: &str) -> Vec<ExternalCommand> {
        self.recorded().into_iter().filter(|c| c.program == program).collect()
    }
}

impl Default for FakeTools {
    fn default() -> Self {
        Self::new()
    }
}

fn solid_png(path: impl AsRef<Path>, (w, h): (u32, u32)) -> Result<()> {
    RgbImage::from_pixel(w, h, Rgb([0, 0, 0])).save(path)?;
    Ok(())
}

/// Raw argument following `flag`; paths may not be UTF-8.
fn arg_after<'a>(command: &'a ExternalCommand, flag: &str) -> Option<&'a OsStr> {
    let pos = command.args.iter().position(|a| a == flag)?;
    command.args.get(pos + 1).map(|a| a.as_os_str())
}

fn parse_extent(extent: &str) -> Option<(u32, u32)> {
    let (w, h) = extent.split_once('x')?;
    Some((w.parse().ok()?, h.parse().ok()?))
}

impl CommandRunner for FakeTools {
    fn run(&self, command: &ExternalCommand, description: &str) -> Result<String> {
        self.commands.lock().unwrap().push(command.clone());
        let missing = |what: &str| AsciiMediaError::ToolFailed {
            description: description.to_string(),
            command: command.to_string(),
            stderr: format!("fake tool: missing {what}"),
        };

        let program = command.program.to_str().unwrap_or_default();
        if self.failing_program.as_deref() == Some(program) {
            return Err(AsciiMediaError::ToolFailed {
                description: description.to_string(),
                command: command.to_string(),
                stderr: "fake tool: forced failure".to_string(),
            });
        }

        match program {
            "ffprobe" => Ok(self.probe_output.clone()),
            "ffmpeg" if command.has_arg("-vsync") => {
                let template = command.last_arg().ok_or_else(|| missing("output template"))?;
                for i in 1..=self.frame_count {
                    let path = template.replace("%09d", &format!("{i:09}"));
                    let shade = (i * 40 % 256) as u8;
                    RgbImage::from_pixel(self.frame_size.0, self.frame_size.1, Rgb([shade, shade, shade]))
                        .save(&path)?;
                }
                Ok(String::new())
            }
            "ffmpeg" => {
                let out = command.last_arg().ok_or_else(|| missing("output path"))?;
                std::fs::write(out, b"fake video")?;
                Ok(String::new())
            }
            "rsvg-convert" => {
                // Deliberately off-size; the post-processor must fix it.
                let out = arg_after(command, "-o").ok_or_else(|| missing("-o"))?;
                solid_png(out, (3, 3))?;
                Ok(String::new())
            }
            "convert" => {
                let input = command.args.first().ok_or_else(|| missing("input"))?;
                if !Path::new(input).exists() {
                    return Err(missing("intermediate raster"));
                }
                let size = command
                    .value_of("-extent")
                    .and_then(parse_extent)
                    .ok_or_else(|| missing("-extent"))?;
                let out = command.args.last().ok_or_else(|| missing("output path"))?;
                solid_png(out, size)?;
                Ok(String::new())
            }
            other => Err(AsciiMediaError::ToolNotFound { program: other.to_string() }),
        }
    }
}
