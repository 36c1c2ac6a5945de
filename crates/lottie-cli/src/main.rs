use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use kurbo::Rect;
use lottie_core::{
    AnimatableProperty, Composition, CompositionCache, CompositingCanvas, KeyPath, LottiePlayer,
    PlayerConfig, RecordingBackend,
};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Player configuration file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, global = true, value_enum, default_value_t = LogLevel::Info)]
    log_level: LogLevel,

    /// Log format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one frame to PNG
    Render(RenderArgs),
    /// Resolve a key path pattern (segments separated by '.')
    Keypaths {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(value_name = "PATTERN", default_value = "**")]
        pattern: String,
    },
    /// Print a layer's opacity and position over a frame range
    Sample {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(long)]
        layer: String,
        /// Frame range, e.g. `0..30`
        #[arg(long, value_parser = parse_range, default_value = "0..30")]
        frames: (f32, f32),
        #[arg(long, default_value_t = 1.0)]
        step: f32,
    },
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(value_name = "FILE")]
    file: PathBuf,

    #[arg(long, default_value_t = 0.0)]
    frame: f32,

    /// Output width, defaults to the composition width
    #[arg(long)]
    width: Option<u32>,

    /// Output height, defaults to the composition height
    #[arg(long)]
    height: Option<u32>,

    #[arg(short, long, value_name = "PNG")]
    output: Option<PathBuf>,

    /// Overrides the configured background colour (`#rrggbb`)
    #[arg(long)]
    background: Option<String>,

    /// Overrides the configured images folder
    #[arg(long, value_name = "DIR")]
    images_folder: Option<PathBuf>,

    /// Print the drawing commands instead of rasterizing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Error => write!(f, "error"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogFormat {
    Pretty,
    Json,
}

fn init_logging(level: LogLevel, format: LogFormat) {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .to_string()
                .parse()
                .unwrap_or_else(|_| LevelFilter::INFO.into()),
        )
        .from_env_lossy();

    let subscriber_builder = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => subscriber_builder.json().init(),
        LogFormat::Pretty => subscriber_builder.pretty().init(),
    }
}

fn parse_range(s: &str) -> Result<(f32, f32), String> {
    let (a, b) = s
        .split_once("..")
        .ok_or_else(|| format!("expected `start..end`, got '{s}'"))?;
    let parse = |v: &str| v.trim().parse::<f32>().map_err(|e| format!("'{v}': {e}"));
    let (start, end) = (parse(a)?, parse(b)?);
    if end < start {
        return Err(format!("range end {end} is before start {start}"));
    }
    Ok((start, end))
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_format);

    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => PlayerConfig::from_json_file(path)
            .with_context(|| format!("Loading config {}", path.display()))?,
        None => PlayerConfig::default(),
    };
    let cache = CompositionCache::new(config.cache_capacity)?;

    match cli.command {
        Command::Render(args) => render(&cache, config, args),
        Command::Keypaths { file, pattern } => keypaths(&cache, &file, &pattern),
        Command::Sample {
            file,
            layer,
            frames,
            step,
        } => sample(&cache, &file, &layer, frames, step),
    }
}

fn load(cache: &CompositionCache, path: &Path) -> Result<Arc<Composition>> {
    let key = path.display().to_string();
    cache
        .get_or_load(&key, || {
            let file = fs::File::open(path).map_err(|source| lottie_core::LottieError::ReadFile {
                path: path.to_path_buf(),
                source,
            })?;
            Composition::from_reader(std::io::BufReader::new(file))
        })
        .with_context(|| format!("Loading animation {}", path.display()))
}

fn render(cache: &CompositionCache, mut config: PlayerConfig, args: RenderArgs) -> Result<()> {
    if args.background.is_some() {
        config.background = args.background;
    }
    if args.images_folder.is_some() {
        config.images_folder = args.images_folder;
    } else if config.images_folder.is_none() {
        config.images_folder = args.file.parent().map(Path::to_path_buf);
    }

    let composition = load(cache, &args.file)?;
    let width = args.width.unwrap_or(composition.width());
    let height = args.height.unwrap_or(composition.height());
    if width == 0 || height == 0 {
        bail!("Output size {width}x{height} is empty");
    }

    let mut player = LottiePlayer::new(config)?;
    player.load(composition);
    player.set_frame(args.frame);
    let loaded = player.preload_images().context("Loading image assets")?;
    info!(frame = player.current_frame(), width, height, images = loaded, "Rendering");

    if args.dry_run {
        let mut canvas = CompositingCanvas::new(RecordingBackend::new(), width as f32, height as f32);
        player.render(&mut canvas, Rect::new(0.0, 0.0, width as f64, height as f64));
        for command in canvas.into_backend().commands() {
            println!("{command:?}");
        }
        return Ok(());
    }

    let png = lottie_skia::render_to_png(&player, width as i32, height as i32)?;
    let output = args.output.unwrap_or_else(|| args.file.with_extension("png"));
    fs::write(&output, png).with_context(|| format!("Writing {}", output.display()))?;
    info!(output = %output.display(), "Render complete");
    Ok(())
}

fn keypaths(cache: &CompositionCache, file: &Path, pattern: &str) -> Result<()> {
    let composition = load(cache, file)?;
    let search = KeyPath::parse(pattern)?;
    let resolved = composition.resolve_key_path(&search);
    info!(pattern, matches = resolved.len(), "Resolved key path");

    for path in resolved {
        let properties = path
            .resolved_target()
            .and_then(|id| composition.content(id))
            .map(|content| {
                content
                    .properties()
                    .iter()
                    .map(|(name, _)| *name)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!("{path}  [{properties}]");
    }
    Ok(())
}

fn sample(cache: &CompositionCache, file: &Path, layer_name: &str, frames: (f32, f32), step: f32) -> Result<()> {
    if step <= 0.0 {
        bail!("--step must be positive");
    }
    let composition = load(cache, file)?;
    let layer = composition
        .layers()
        .find_by_name(layer_name)
        .with_context(|| format!("No top-level layer named '{layer_name}'"))?;

    let transform = layer
        .properties()
        .into_iter()
        .find_map(|(_, property)| match property {
            AnimatableProperty::Transform(t) => Some(t),
            _ => None,
        })
        .context("Layer has no transform")?;

    let mut evaluator = transform.evaluator();
    let (start, end) = frames;
    let mut frame = start;
    while frame <= end {
        let value = evaluator.evaluate(layer.local_frame(frame))?;
        let output = serde_json::json!({
            "frame": frame,
            "opacity": value.opacity,
            "position": [value.position.x, value.position.y],
        });
        println!("{output}");
        frame += step;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_range() {
        assert_eq!(parse_range("0..30"), Ok((0.0, 30.0)));
        assert_eq!(parse_range(" 2.5 .. 4 "), Ok((2.5, 4.0)));
        assert!(parse_range("30..0").is_err());
        assert!(parse_range("12").is_err());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "lottie", "sample", "anim.json", "--layer", "Ball", "--frames", "5..10", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, LogLevel::Debug);
        assert!(matches!(cli.command, Command::Sample { frames, ref layer, .. } if frames == (5.0, 10.0) && layer == "Ball"));

        let cli = Cli::try_parse_from(["lottie", "render", "anim.json", "--frame", "12", "--dry-run"]).unwrap();
        assert!(matches!(cli.command, Command::Render(RenderArgs { dry_run: true, frame, .. }) if frame == 12.0));
    }

    #[test]
    fn test_missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cache = CompositionCache::default();
        let err = load(&cache, &dir.path().join("missing.json")).unwrap_err();
        assert!(format!("{err:#}").contains("missing.json"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_keypaths_loads_once_through_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.json");
        fs::write(
            &path,
            serde_json::json!({
                "v": "5.7.0", "ip": 0, "op": 10, "fr": 10, "w": 10, "h": 10,
                "layers": [{"ty": 3, "nm": "Null", "ip": 0, "op": 10, "ks": {}}]
            })
            .to_string(),
        )
        .unwrap();

        let cache = CompositionCache::default();
        keypaths(&cache, &path, "Null").unwrap();
        assert_eq!(cache.len(), 1);
        sample(&cache, &path, "Null", (0.0, 2.0), 1.0).unwrap();
        assert_eq!(cache.len(), 1);
    }
}
