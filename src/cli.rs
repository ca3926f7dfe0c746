// ============================================================================
// FilterLab CLI: headless filter chains via command-line arguments
// ============================================================================
//
// Usage examples:
//   filterlab color:128,255,0 contrast:20 -i photo.png -o result.png
//   filterlab contrast -i photo.jpg                    (intensity from settings)
//   filterlab contrast:30 -i *.jpg --output-dir processed/ --format png
//   filterlab -i a.png --history -- color:255,0,0 contrast undo redo
//
// `--input` takes every following value, so steps go before it or after `--`.
//
// Each input gets its own EditSession driven through a SessionRunner, so the
// steps run exactly as they would from an interactive front end.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Instant;

use clap::Parser;

use crate::error::EditError;
use crate::io::{MaxDimensions, SaveFormat};
use crate::ops::Filter;
use crate::session::{Command, EditSession, SessionOptions};
use crate::settings::EditorSettings;
use crate::worker::SessionRunner;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// FilterLab headless image filter runner.
#[derive(Parser, Debug)]
#[command(
    name = "filterlab",
    about = "Apply color and contrast filter chains to image files",
    long_about = "Open each input image, run the given steps in order and save the\n\
                  result. Steps: color:R,G,B  contrast[:N]  undo  redo.\n\n\
                  Example:\n  \
                  filterlab color:128,255,0 contrast:20 -i photo.png -o result.png\n  \
                  filterlab contrast -i *.jpg --output-dir out/ --format png"
)]
pub struct CliArgs {
    /// Input file(s). Glob patterns accepted (e.g. "*.png", "shots/*.jpg").
    #[arg(short, long, required = true, num_args = 1..)]
    pub input: Vec<String>,

    /// Output file path. Only valid for single-file input.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing.
    #[arg(long, value_name = "DIR", conflicts_with = "output")]
    pub output_dir: Option<PathBuf>,

    /// Output format for derived file names: png, jpeg, bmp, tga, tiff.
    /// Defaults to the input's format when it can be written, else png.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1-100). Defaults to the configured value.
    #[arg(short, long, value_name = "1-100", value_parser = clap::value_parser!(u8).range(1..=100))]
    pub quality: Option<u8>,

    /// Edit a preview of at most this height; saving still uses full size.
    #[arg(long, value_name = "PIXELS")]
    pub preview_height: Option<u32>,

    /// Edit at full resolution.
    #[arg(long, conflicts_with = "preview_height")]
    pub full_size: bool,

    /// Print per-file timing and mirror the session log to stderr.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the active filter chain after the steps have run.
    #[arg(long)]
    pub history: bool,

    /// Steps to run in order.
    #[arg(value_name = "STEP")]
    pub steps: Vec<Step>,
}

/// One command-line step.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    Apply(Filter),
    /// `contrast` without a value: use the configured intensity.
    DefaultContrast,
    Undo,
    Redo,
}

impl Step {
    fn command(self, settings: &EditorSettings) -> Command {
        match self {
            Step::Apply(filter) => Command::Apply(filter),
            Step::DefaultContrast => Command::Apply(Filter::contrast(settings.contrast_intensity)),
            Step::Undo => Command::Undo,
            Step::Redo => Command::Redo,
        }
    }
}

impl FromStr for Step {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "undo" => Ok(Step::Undo),
            "redo" => Ok(Step::Redo),
            "contrast" => Ok(Step::DefaultContrast),
            _ => s.parse::<Filter>().map(Step::Apply),
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Apply(filter) => write!(f, "{}", filter),
            Step::DefaultContrast => f.write_str("contrast"),
            Step::Undo => f.write_str("undo"),
            Step::Redo => f.write_str("redo"),
        }
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
/// `0` = all files succeeded, `1` = one or more files failed.
pub fn run(args: CliArgs, settings: &EditorSettings) -> ExitCode {
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let format = match args.format.as_deref() {
        Some(name) => match SaveFormat::from_name(name) {
            Some(f) => Some(f),
            None => {
                eprintln!("error: unsupported output format '{}'.", name);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!(
            "error: could not create output directory '{}': {}",
            dir.display(),
            e
        );
        return ExitCode::FAILURE;
    }

    let options = session_options(&args, settings);
    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }

        let file_start = Instant::now();

        let Some(output_path) = build_output_path(
            input_path,
            args.output.as_deref(),
            args.output_dir.as_deref(),
            format,
        ) else {
            eprintln!(
                "  error: cannot determine output path for '{}'.",
                input_path.display()
            );
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, &args.steps, options, settings) {
            Ok(chain) => {
                if args.history {
                    print_chain(&chain);
                }
                if args.verbose || multi {
                    println!(
                        "  -> {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-file processing pipeline
// ============================================================================

/// Open `input`, run `steps`, save to `output`. Returns the active chain labels.
pub fn run_one(
    input: &Path,
    output: &Path,
    steps: &[Step],
    options: SessionOptions,
    settings: &EditorSettings,
) -> Result<Vec<String>, String> {
    let session = EditSession::new(options);
    let mut runner = SessionRunner::new(session, settings.worker_threads)
        .map_err(|e| format!("worker pool: {}", e))?;

    runner
        .run(Command::Open(input.to_path_buf()))
        .map_err(|e| format!("load failed: {}", e))?;

    for step in steps {
        runner
            .run(step.command(settings))
            .map_err(|e| step_error(*step, e))?;
    }

    runner
        .run(Command::SaveAs(output.to_path_buf()))
        .map_err(|e| format!("save failed: {}", e))?;

    Ok(runner.session().descriptions())
}

fn step_error(step: Step, e: EditError) -> String {
    format!("step '{}' failed: {}", step, e)
}

fn print_chain(chain: &[String]) {
    if chain.is_empty() {
        println!("  (no filters applied)");
    }
    for (i, label) in chain.iter().enumerate() {
        println!("  {}. {}", i + 1, label);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn session_options(args: &CliArgs, settings: &EditorSettings) -> SessionOptions {
    let mut options = SessionOptions::from(settings);
    if args.full_size {
        options.preview = MaxDimensions::NONE;
    } else if let Some(h) = args.preview_height {
        options.preview = if h == 0 { MaxDimensions::NONE } else { MaxDimensions::height(h) };
    }
    if let Some(q) = args.quality {
        options.jpeg_quality = q;
    }
    options
}

/// Expand glob patterns and literal paths into a deduplicated, ordered list.
fn resolve_inputs(patterns: &[String]) -> Vec<PathBuf> {
    let mut result: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        let as_path = Path::new(pattern);

        if as_path.exists() {
            if !result.iter().any(|p| p.as_path() == as_path) {
                result.push(as_path.to_path_buf());
            }
            continue;
        }

        match glob::glob(pattern) {
            Ok(entries) => {
                let mut matched = false;
                for entry in entries.flatten() {
                    if !result.contains(&entry) {
                        result.push(entry);
                    }
                    matched = true;
                }
                if !matched {
                    eprintln!("warning: pattern '{}' matched no files.", pattern);
                }
            }
            Err(e) => {
                eprintln!("warning: invalid glob '{}': {}", pattern, e);
            }
        }
    }

    result
}

/// Compute the output path for a single input file.
///
/// Priority:
/// 1. `--output` (explicit path; its extension picks the format)
/// 2. `--output-dir` (derives the filename from the input stem)
/// 3. Fallback: next to the input, with an `_edited` suffix on the stem
fn build_output_path(
    input: &Path,
    output: Option<&Path>,
    output_dir: Option<&Path>,
    format: Option<SaveFormat>,
) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let format = format
        .or_else(|| SaveFormat::from_path(input).ok())
        .unwrap_or(SaveFormat::Png);
    let ext = format.extension();
    let stem = input.file_stem()?.to_string_lossy().into_owned();

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new("."));
    Some(parent.join(format!("{}_edited.{}", stem, ext)))
}
