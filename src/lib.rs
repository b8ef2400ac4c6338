//! Image and video to ASCII art, exported as SVG and rasterized by external tools.

pub mod batch;
pub mod command;
pub mod convert;
pub mod images;
pub mod pool;
pub mod ramp;
pub mod raster;
pub mod svg;
pub mod video;

pub use batch::{convert_batch, list_source_images, BatchReport, ConversionResult};
pub use command::{CommandRunner, ExternalCommand, SystemRunner};
pub use convert::{Converter, GlyphGrid};
pub use images::{convert_images, ImageRun};
pub use pool::WorkerPool;
pub use ramp::GlyphRamp;
pub use raster::{rasterize_batch, rasterize_document, resolve_target_size, SizeSource};
pub use svg::VectorDocument;
pub use video::{VideoPipeline, VideoRun};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AsciiMediaError {
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Pipeline error: {0}")]
    Pipeline(String),
    #[error("Worker pool error: {0}")]
    Pool(String),
    #[error("Command not found: {program}. Make sure it is installed and on PATH.")]
    ToolNotFound { program: String },
    #[error("Failed: {description}\nCommand: {command}{}", detail_suffix(.stderr))]
    ToolFailed {
        description: String,
        command: String,
        stderr: String,
    },
}

fn detail_suffix(stderr: &str) -> String {
    if stderr.is_empty() {
        String::new()
    } else {
        format!("\nDetail:\n{stderr}")
    }
}

impl AsciiMediaError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn pipeline(msg: impl Into<String>) -> Self {
        Self::Pipeline(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, AsciiMediaError>;
