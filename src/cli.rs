// ============================================================================
// PixelEditor CLI — headless batch editing via command-line arguments
// ============================================================================
//
// Usage examples:
//   PixelEditor --input sprite.png --script outline.txt --output out.png
//   PixelEditor -i "tiles/*.png" --script recolor.txt --output-dir recolored/
//   PixelEditor --new 16x16 --script icon.txt --output icon.png
//   PixelEditor -i session.pxe --output flat.png
//
// Everything runs synchronously on the current thread.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use crate::canvas::CanvasState;
use crate::io::{PROJECT_EXTENSION, open_canvas, save_canvas};
use crate::ops::script::run_script;
use crate::settings::EngineSettings;
use crate::{log_err, log_info};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// PixelEditor headless batch runner.
#[derive(Parser, Debug)]
#[command(
    name = "PixelEditor",
    about = "PixelEditor headless pixel-art batch editor",
    long_about = "Apply an operation script to PNG images or .pxe projects without\n\
                  opening the editor, or render a script onto a blank canvas.\n\n\
                  Example:\n  \
                  PixelEditor --input sprite.png --script outline.txt --output out.png\n  \
                  PixelEditor --new 32x32 --script icon.txt --output icon.png"
)]
pub struct CliArgs {
    /// Input file(s): PNG images or .pxe projects. Glob patterns accepted.
    #[arg(short, long, num_args = 1.., required_unless_present = "new", conflicts_with = "new")]
    pub input: Vec<String>,

    /// Start from a blank canvas of the given size, e.g. `32x32`.
    #[arg(short, long, value_name = "WxH")]
    pub new: Option<String>,

    /// Operation script applied to every canvas.
    #[arg(short, long, value_name = "SCRIPT")]
    pub script: Option<PathBuf>,

    /// Output file path (.png or .pxe). Only valid for a single canvas.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output directory for batch processing; files keep their stem.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Settings file to use instead of the per-user one.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print per-file timing and write a session log.
    #[arg(short, long)]
    pub verbose: bool,
}

impl CliArgs {
    /// Returns `true` when any batch-mode flag is present in the process arguments.
    pub fn is_cli_mode() -> bool {
        std::env::args().any(|a| matches!(a.as_str(), "--input" | "-i" | "--new" | "-n"))
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run all CLI processing and return an OS exit code.
pub fn run(args: CliArgs) -> ExitCode {
    if args.verbose {
        crate::logger::set_min_level(crate::logger::Level::Info);
        crate::logger::init();
        if let Some(path) = crate::logger::log_path() {
            eprintln!("log: {}", path.display());
        }
    }

    let settings = match &args.config {
        Some(path) => EngineSettings::load_from(path),
        None => EngineSettings::load(),
    };

    let script_source = match &args.script {
        Some(path) => match std::fs::read_to_string(path) {
            Ok(src) => Some(src),
            Err(e) => {
                eprintln!("error: could not read script '{}': {}", path.display(), e);
                return ExitCode::FAILURE;
            }
        },
        None => None,
    };

    if let Some(dir) = &args.output_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("error: could not create output directory '{}': {}", dir.display(), e);
        return ExitCode::FAILURE;
    }

    // -- Blank canvas mode -------------------------------------------------
    if let Some(spec) = &args.new {
        let Some(output) = args.output.as_deref() else {
            eprintln!("error: --new requires --output.");
            return ExitCode::FAILURE;
        };
        return match run_new(spec, output, script_source.as_deref(), &settings) {
            Ok(()) => {
                if args.verbose {
                    println!("  → {}", output.display());
                }
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    // -- File mode ---------------------------------------------------------
    let inputs = resolve_inputs(&args.input);
    if inputs.is_empty() {
        eprintln!("error: no input files matched the given pattern(s).");
        return ExitCode::FAILURE;
    }

    if inputs.len() > 1 && args.output.is_some() && args.output_dir.is_none() {
        eprintln!(
            "error: {} input files given but --output only accepts a single file path.\n\
             Use --output-dir to specify a destination directory for batch processing.",
            inputs.len()
        );
        return ExitCode::FAILURE;
    }

    let total = inputs.len();
    let multi = total > 1;
    let mut any_failure = false;

    for (idx, input_path) in inputs.iter().enumerate() {
        if multi || args.verbose {
            println!("[{}/{}] {}", idx + 1, total, input_path.display());
        }
        let file_start = Instant::now();

        let Some(output_path) =
            build_output_path(input_path, args.output.as_deref(), args.output_dir.as_deref())
        else {
            eprintln!("  error: cannot determine output path for '{}'.", input_path.display());
            any_failure = true;
            continue;
        };

        match run_one(input_path, &output_path, script_source.as_deref(), &settings) {
            Ok(()) => {
                if args.verbose || multi {
                    println!(
                        "  → {} ({:.0}ms)",
                        output_path.display(),
                        file_start.elapsed().as_secs_f64() * 1000.0
                    );
                }
            }
            Err(e) => {
                log_err!("{}: {}", input_path.display(), e);
                eprintln!("  error: {}", e);
                any_failure = true;
            }
        }
    }

    if any_failure { ExitCode::FAILURE } else { ExitCode::SUCCESS }
}

// ============================================================================
// Per-canvas pipelines
// ============================================================================

fn run_one(
    input: &Path,
    output: &Path,
    script: Option<&str>,
    settings: &EngineSettings,
) -> Result<(), String> {
    let mut canvas = open_canvas(input, settings).map_err(|e| format!("load failed: {}", e))?;
    apply_script(&mut canvas, script)?;
    save_canvas(&canvas, output).map_err(|e| format!("save failed: {}", e))
}

fn run_new(
    spec: &str,
    output: &Path,
    script: Option<&str>,
    settings: &EngineSettings,
) -> Result<(), String> {
    let (w, h) = parse_size(spec).ok_or_else(|| format!("invalid size '{}', expected WxH", spec))?;
    let mut canvas = CanvasState::with_settings(w, h, settings).map_err(|e| e.to_string())?;
    apply_script(&mut canvas, script)?;
    save_canvas(&canvas, output).map_err(|e| format!("save failed: {}", e))
}

fn apply_script(canvas: &mut CanvasState, script: Option<&str>) -> Result<(), String> {
    if let Some(src) = script {
        let n = run_script(canvas, src).map_err(|e| format!("script error: {}", e))?;
        log_info!("Script applied: {} command(s)", n);
    }
    Ok(())
}

// ============================================================================
// Helpers
// ============================================================================

/// `WxH` (also accepts `W*H` and an upper-case `X`).
pub fn parse_size(spec: &str) -> Option<(u32, u32)> {
    let (w, h) = spec.trim().split_once(['x', 'X', '*'])?;
    let w: u32 = w.trim().parse().ok()?;
    let h: u32 = h.trim().parse().ok()?;
    (w > 0 && h > 0).then_some((w, h))
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
/// 1. `--output`
/// 2. `--output-dir` joined with the input's file name
/// 3. Next to the input with an `_out` suffix on the stem
fn build_output_path(input: &Path, output: Option<&Path>, output_dir: Option<&Path>) -> Option<PathBuf> {
    if let Some(out) = output {
        return Some(out.to_path_buf());
    }

    let stem = input.file_stem()?.to_string_lossy().into_owned();
    let ext = input
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| e.eq_ignore_ascii_case(PROJECT_EXTENSION))
        .unwrap_or("png");

    if let Some(dir) = output_dir {
        return Some(dir.join(format!("{}.{}", stem, ext)));
    }

    let parent = input.parent().unwrap_or(Path::new(""));
    Some(parent.join(format!("{}_out.{}", stem, ext)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_parsing() {
        assert_eq!(parse_size("32x32"), Some((32, 32)));
        assert_eq!(parse_size(" 16X8 "), Some((16, 8)));
        assert_eq!(parse_size("4*2"), Some((4, 2)));
        assert_eq!(parse_size("0x4"), None);
        assert_eq!(parse_size("32"), None);
        assert_eq!(parse_size("ax4"), None);
    }

    #[test]
    fn output_path_priority() {
        let input = Path::new("art/hero.png");
        assert_eq!(
            build_output_path(input, Some(Path::new("x.png")), Some(Path::new("d"))),
            Some(PathBuf::from("x.png"))
        );
        assert_eq!(
            build_output_path(input, None, Some(Path::new("d"))),
            Some(PathBuf::from("d/hero.png"))
        );
        assert_eq!(build_output_path(input, None, None), Some(PathBuf::from("art/hero_out.png")));
        assert_eq!(
            build_output_path(Path::new("s.PXE"), None, Some(Path::new("d"))),
            Some(PathBuf::from("d/s.PXE"))
        );
    }

    #[test]
    fn new_canvas_pipeline_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ops.txt");
        std::fs::write(&script, "rect 0 0 3 3 #000000 #FF0000\n").unwrap();
        let out = dir.path().join("out.png");

        let args = CliArgs::parse_from([
            "PixelEditor",
            "--new",
            "4x4",
            "--script",
            script.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
            "--config",
            dir.path().join("none.cfg").to_str().unwrap(),
        ]);
        assert_eq!(run(args), ExitCode::SUCCESS);

        let img = image::open(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(1, 1).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn batch_pipeline_processes_glob() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.png", "b.png"] {
            let mut c = CanvasState::new(2, 2).unwrap();
            c.write_pixel(0, 0, crate::ops::color::WHITE);
            crate::io::save_png_file(&c, &dir.path().join(name)).unwrap();
        }
        let script = dir.path().join("ops.txt");
        std::fs::write(&script, "pixel 1 1 #00FF00\n").unwrap();
        let out_dir = dir.path().join("out");
        let pattern = dir.path().join("*.png");

        let args = CliArgs::parse_from([
            "PixelEditor",
            "-i",
            pattern.to_str().unwrap(),
            "-s",
            script.to_str().unwrap(),
            "--output-dir",
            out_dir.to_str().unwrap(),
            "--config",
            dir.path().join("none.cfg").to_str().unwrap(),
        ]);
        assert_eq!(run(args), ExitCode::SUCCESS);
        for name in ["a.png", "b.png"] {
            let img = image::open(out_dir.join(name)).unwrap().to_rgba8();
            assert_eq!(img.get_pixel(1, 1).0, [0, 255, 0, 255]);
            assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn script_error_fails_the_run() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("bad.txt");
        std::fs::write(&script, "explode\n").unwrap();
        let args = CliArgs::parse_from([
            "PixelEditor",
            "--new",
            "2x2",
            "--script",
            script.to_str().unwrap(),
            "--output",
            dir.path().join("o.png").to_str().unwrap(),
            "--config",
            dir.path().join("none.cfg").to_str().unwrap(),
        ]);
        assert_eq!(run(args), ExitCode::FAILURE);
        assert!(!dir.path().join("o.png").exists());
    }
}
