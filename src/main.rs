//! asciimedia CLI - Convert images or videos to ASCII art

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::Context as _;
use asciimedia::command::require_tools;
use asciimedia::convert::MAX_FONT_SIZE;
use asciimedia::images::collect_sources;
use asciimedia::{convert_images, Converter, SystemRunner, VideoPipeline, WorkerPool};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;

const BANNER: &str = r"
::::: ###::::: ######::: ######:: ######: ######::::
:::: ## ##::: ##... ##: ##... ##::: ##::::: ##::::::
::: ##:. ##:: ##:::..:: ##:::..:::: ##::::: ##::::::
:: ##:::. ##:. ######:: ##::::::::: ##::::: ##::::::
:: #########::..... ##: ##::::::::: ##::::: ##::::::
:: ##.... ##: ##::: ##: ##::: ##::: ##::::: ##::::::
:: ##:::: ##:. ######::. ######:: ######: ######::::
:::..::::..::::.....:::::.....::::.....:::.....:::::
: ##:::::##: ########: ########:: ######:::: ###::::
: ###:::###: ##.....:: ##.... ##::  ##::::: ## ##:::
: ####:####: ##::::::: ##:::: ##::: ##:::: ##:. ##::
: ## ### ##: ######::: ##:::: ##::: ##::: ##:::. ##:
: ##. #: ##: ##...:::: ##:::: ##::: ##::: #########:
: ##:.:: ##: ##::::::: ##:::: ##::: ##::: ##.... ##:
: ##:::: ##: ########: ########:: ######: ##:::: ##:
::..::::..:::.......:::.......::::.....:::..::::..::

Transform images or videos into ASCII art.";

const IMAGE_TOOLS: &[(&str, &str)] = &[("rsvg-convert", "--version"), ("convert", "-version")];
const VIDEO_TOOLS: &[(&str, &str)] = &[("ffmpeg", "-version"), ("ffprobe", "-version")];

#[derive(Parser, Debug)]
#[command(name = "asciimedia", version, about = "Transform images or videos into ASCII art", long_about = BANNER)]
#[command(group(ArgGroup::new("source").required(true).args(["input_dir", "video"])))]
struct Args {
    /// Folder with source images (.jpg, .jpeg, .png). Required if --video is not used.
    input_dir: Option<PathBuf>,
    /// Video file to convert into ASCII art. Required if INPUT_DIR is not provided.
    #[arg(short, long)]
    video: Option<PathBuf>,
    /// ASCII resolution ratio (lower = finer detail)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    ratio: u32,
    /// Output directory for the final files
    #[arg(short, long, default_value = "out_ascii")]
    output_dir: PathBuf,
    /// Worker threads (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,
    /// Font size of each glyph cell in the SVG, in pixels
    #[arg(long, default_value = "10", value_parser = clap::value_parser!(u32).range(1..=MAX_FONT_SIZE as i64))]
    font_size: u32,
    /// Frame rate for the encoded video, e.g. 30000/1001 (default: probe the source)
    #[arg(long, requires = "video")]
    framerate: Option<String>,
    /// Write per-file conversion results as JSON
    #[arg(long)]
    report: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let start = Instant::now();
    let outcome = run(&args);

    let elapsed = start.elapsed().as_secs_f64();
    let minutes = (elapsed / 60.0).floor();
    eprintln!("\nTotal processing time: {} min {:.1} sec", minutes as u64, elapsed - minutes * 60.0);

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[Error] {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> anyhow::Result<()> {
    let converter = Converter::new(args.ratio)?.with_font_size(args.font_size);
    let pool = WorkerPool::new(args.workers)?;
    let runner = SystemRunner;

    let report = match (&args.input_dir, &args.video) {
        (None, Some(video)) => {
            require_tools(VIDEO_TOOLS)?;
            require_tools(IMAGE_TOOLS)?;
            let mut pipeline = VideoPipeline::new(video, &args.output_dir, converter, &pool, &runner);
            if let Some(rate) = &args.framerate {
                pipeline = pipeline.with_frame_rate(rate);
            }
            let run = pipeline.run()?;
            println!("ASCII video successfully generated: {}", run.output.display());
            run.report
        }
        (Some(input_dir), None) => {
            // A bad input dir is reported before a missing tool.
            collect_sources(input_dir)?;
            require_tools(IMAGE_TOOLS)?;
            let run = convert_images(&pool, &runner, &converter, input_dir, &args.output_dir, Path::new("."))?;
            println!(
                "ASCII images completed ({}). Files stored in '{}'",
                run.report.summary_line(),
                args.output_dir.display()
            );
            run.report
        }
        _ => anyhow::bail!("specify either an image directory or --video, not both"),
    };

    if let Some(path) = &args.report {
        report
            .write_json(path)
            .with_context(|| format!("write report '{}'", path.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn exactly_one_source_is_required() {
        assert!(Args::try_parse_from(["asciimedia", "-r", "4"]).is_err());
        assert!(Args::try_parse_from(["asciimedia", "imgs", "--video", "a.mp4", "-r", "4"]).is_err());
        let args = Args::try_parse_from(["asciimedia", "--video", "a.mp4", "-r", "4"]).unwrap();
        assert_eq!(args.video.as_deref(), Some(Path::new("a.mp4")));
        assert_eq!(args.output_dir, PathBuf::from("out_ascii"));
    }

    #[test]
    fn ratio_must_be_positive() {
        assert!(Args::try_parse_from(["asciimedia", "imgs"]).is_err());
        assert!(Args::try_parse_from(["asciimedia", "imgs", "-r", "0"]).is_err());
        assert!(Args::try_parse_from(["asciimedia", "imgs", "-r", "-2"]).is_err());
        assert_eq!(Args::try_parse_from(["asciimedia", "imgs", "-r", "3"]).unwrap().ratio, 3);
    }

    #[test]
    fn font_size_is_bounded() {
        let parse = |size: &str| Args::try_parse_from(["asciimedia", "imgs", "-r", "1", "--font-size", size]);
        assert!(parse("0").is_err());
        assert!(parse("257").is_err());
        assert!(parse("50000000").is_err());
        assert_eq!(parse("256").unwrap().font_size, MAX_FONT_SIZE);
    }

    #[test]
    fn framerate_needs_video() {
        assert!(Args::try_parse_from(["asciimedia", "imgs", "-r", "3", "--framerate", "25/1"]).is_err());
    }
}
