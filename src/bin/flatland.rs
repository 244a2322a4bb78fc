use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

use flatland::sim::RunState;
use flatland::{
    Coordinator, DownloadDir, FfmpegRecorder, Flatland, FlatlandParams, MediaBackend,
    MemoryRecorder, SessionOpts, Surface,
};

#[derive(Parser, Debug)]
#[command(name = "flatland", version, about = "Run one recorded Flatland session")]
struct Cli {
    /// Obstacle coverage ratio (0..=1).
    #[arg(long, default_value_t = 0.25)]
    dispersion: f32,

    /// Number of enemies.
    #[arg(long, default_value_t = 20)]
    enemies: usize,

    /// Hero teleport budget.
    #[arg(long, default_value_t = 5)]
    teleports: u32,

    /// Grid width and height in cells.
    #[arg(long, default_value_t = 64)]
    grid: usize,

    /// World seed (random when omitted).
    #[arg(long)]
    seed: Option<u64>,

    /// Directory the artifact is saved into.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Artifact filename.
    #[arg(long, default_value = "flatland.webm")]
    filename: String,

    /// Capture frame rate in Hz.
    #[arg(long, default_value_t = 10)]
    frame_rate: u32,

    /// Tick period in milliseconds.
    #[arg(long, default_value_t = 100)]
    tick_ms: u64,

    /// MIME type requested from the encoder.
    #[arg(long, default_value = "video/webm; codecs=vp9")]
    mime_type: String,

    /// Record raw RGBA frames in memory instead of encoding through ffmpeg.
    #[arg(long, default_value_t = false)]
    raw: bool,

    /// Write the final frame as a PNG.
    #[arg(long)]
    poster: Option<PathBuf>,

    /// JSON session config; takes precedence over the individual flags.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    params: FlatlandParams,
    opts: SessionOpts,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let (params, opts) = resolve(&cli)?;

    let (width, height) = params.surface_size();
    let surface = Surface::new(width, height)?;

    let outcome = if cli.raw {
        record(surface.clone(), MemoryRecorder, &cli, params, opts)?
    } else {
        record(surface.clone(), FfmpegRecorder, &cli, params, opts)?
    };

    if let Some(poster) = &cli.poster {
        let frame = surface
            .last_frame()
            .context("no frame was rendered; nothing to write as a poster")?;
        if let Some(parent) = poster.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create poster dir '{}'", parent.display()))?;
        }
        frame.write_png(poster)?;
        eprintln!("wrote {}", poster.display());
    }

    eprintln!("{outcome}");
    Ok(())
}

fn resolve(cli: &Cli) -> anyhow::Result<(FlatlandParams, SessionOpts)> {
    if let Some(path) = &cli.config {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config '{}'", path.display()))?;
        let cfg: ConfigFile = serde_json::from_str(&text)
            .with_context(|| format!("parse config '{}'", path.display()))?;
        return Ok((cfg.params, cfg.opts));
    }

    let params = FlatlandParams {
        dispersion: cli.dispersion,
        enemies: cli.enemies,
        teleports: cli.teleports,
        grid_width: cli.grid,
        grid_height: cli.grid,
        seed: cli.seed.unwrap_or_else(rand::random),
    };
    let opts = SessionOpts {
        frame_rate_hz: cli.frame_rate,
        tick_period_ms: cli.tick_ms,
        mime_type: cli.mime_type.clone(),
        filename: cli.filename.clone(),
    };
    Ok((params, opts))
}

fn record<M: MediaBackend>(
    surface: Surface,
    media: M,
    cli: &Cli,
    params: FlatlandParams,
    opts: SessionOpts,
) -> anyhow::Result<String> {
    let controls = DownloadDir::new(&cli.out_dir);
    let mut coord = Coordinator::<Flatland, M, DownloadDir>::new(surface, media, controls, opts);
    let report = coord.run(params)?;

    if let Some(path) = coord.controls().saved_path() {
        eprintln!("wrote {}", path.display());
    }

    let outcome = match coord.simulation().map(Flatland::run_state) {
        Some(RunState::Victory) => "hero victory",
        Some(RunState::Defeat) => "hero defeat",
        _ => "run ended",
    };
    Ok(format!("{outcome} after {} ticks", report.ticks))
}
