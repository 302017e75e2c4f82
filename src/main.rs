use clap::Parser;
use std::path::{Path, PathBuf};
use tilemark::{config, process, report};

fn version_string() -> &'static str {
    let hash = env!("GIT_HASH");
    if hash.is_empty() {
        env!("CARGO_PKG_VERSION")
    } else {
        // Leaked once at startup — trivial, called exactly once
        Box::leak(format!("{} ({hash})", env!("CARGO_PKG_VERSION")).into_boxed_str())
    }
}

#[derive(Parser)]
#[command(name = "tilemark")]
#[command(about = "Tile a text watermark across every image in a folder tree")]
#[command(long_about = "\
Tile a text watermark across every image in a folder tree

The input directory is walked depth-first in name order; every file with an
allowed extension is watermarked and written to the same relative path under
the output directory:

  photos/                      stamped/
  ├── 2026/                    ├── 2026/
  │   ├── 001.jpg         →    │   ├── 001.jpg     (text tiled on centerline)
  │   └── 002.jpg         →    │   └── 002.jpg
  └── cover.png           →    └── cover.png

The text repeats side by side along the horizontal centerline, as many whole
copies as fit between the margins, centered as a block. Images too narrow for
a single copy are skipped, never clipped.

Options read from config.json (or --config PATH) when present; command-line
flags override file values field by field. Existing outputs are skipped
unless --overwrite is given, so interrupted runs can simply be re-run.")]
#[command(version = version_string())]
struct Cli {
    /// Config file with the same options as the flags below
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Folder to read images from
    #[arg(long)]
    input: Option<PathBuf>,

    /// Folder to write watermarked images to (mirrors the input tree)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Watermark text
    #[arg(long)]
    text: Option<String>,

    /// Watermark image file (not supported; fails with a clear error)
    #[arg(long)]
    wm_image: Option<PathBuf>,

    /// Replace outputs that already exist
    #[arg(long)]
    overwrite: bool,

    /// Comma-separated extension allow-list [default: jpg,jpeg,png]
    #[arg(long)]
    ext: Option<String>,

    /// TTF/OTF font file (falls back to the built-in font)
    #[arg(long)]
    font: Option<PathBuf>,

    /// Fixed font size in pixels [default: 48]
    #[arg(long)]
    font_size: Option<u32>,

    /// Size text relative to each image's height instead of --font-size
    #[arg(long)]
    font_scale: Option<f32>,

    /// Lower clamp for --font-scale sizing [default: 10]
    #[arg(long)]
    font_min_size: Option<u32>,

    /// Upper clamp for --font-scale sizing [default: 512]
    #[arg(long)]
    font_max_size: Option<u32>,

    /// Watermark opacity, 0 to 1 [default: 0.25]
    #[arg(long)]
    opacity: Option<f32>,

    /// Pixels between adjacent copies [default: half the font size]
    #[arg(long)]
    gap: Option<u32>,

    /// Pixels kept clear at the left and right edges [default: 16]
    #[arg(long)]
    margin: Option<u32>,

    /// Draw a dark outline behind the text
    #[arg(long)]
    stroke: bool,

    /// Outline thickness in pixels [default: 2]
    #[arg(long)]
    stroke_width: Option<u32>,

    /// JPEG quality, 1-95 [default: 90]
    #[arg(long)]
    quality: Option<u8>,
}

impl Cli {
    fn overrides(self) -> config::Overrides {
        config::Overrides {
            input: self.input,
            output: self.output,
            text: self.text,
            wm_image: self.wm_image,
            overwrite: self.overwrite,
            ext: self.ext,
            font: self.font,
            font_size: self.font_size,
            font_scale: self.font_scale,
            font_min_size: self.font_min_size,
            font_max_size: self.font_max_size,
            opacity: self.opacity,
            gap: self.gap,
            margin: self.margin,
            stroke: self.stroke,
            stroke_width: self.stroke_width,
            quality: self.quality,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), config::SetupError> {
    let config_path = cli.config.clone();
    let file = load_config(&config_path)?;

    let settings = config::Settings::merge(file, cli.overrides())?;
    settings.validate()?;

    let input = settings.input.clone();
    let output = settings.output.clone();
    let summary = process::run(&settings, |event| {
        report::print_event(event, &input, &output);
    })?;
    report::print_summary(&summary);
    Ok(())
}

/// Load the config file. A missing file downgrades to a warning and the run
/// continues on flags alone; an unreadable or malformed file is fatal.
fn load_config(path: &Path) -> Result<config::FileConfig, config::SetupError> {
    if !path.exists() {
        eprintln!(
            "warning: config file {} not found, using command-line options only",
            path.display()
        );
        return Ok(config::FileConfig::default());
    }
    config::load_file_config(path)
}
