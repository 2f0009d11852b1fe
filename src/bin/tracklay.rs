use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    str::FromStr as _,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use tracklay::{
    CancelToken, EncodeProfile, FfmpegSink, FfmpegSinkOpts, FrameGeometry, Fps, GeoPoint,
    LogDiagnostics, Metric, NullLockFilter, OverlaySession, OverlaySessionOpts, PrivacyZone,
    Sample, SolidRenderer, StrictLockFilter, Timeseries, Timestamp, Unit, VecDiagnostics,
};

#[derive(Parser, Debug)]
#[command(name = "tracklay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a telemetry-driven overlay video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Inspect a telemetry file: bounds, diagnostics, metric readouts.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input telemetry JSON (array of samples).
    #[arg(long)]
    telemetry: PathBuf,

    /// Output video path.
    #[arg(long)]
    out: PathBuf,

    /// Output size as WxH, e.g. 1920x1080.
    #[arg(long)]
    size: String,

    /// Output frame rate (integer fps).
    #[arg(long, default_value_t = 30)]
    fps: u32,

    /// Total output frames. Mutually exclusive with --duration-secs.
    #[arg(long, conflicts_with = "duration_secs")]
    frames: Option<u64>,

    /// Output duration in seconds.
    #[arg(long)]
    duration_secs: Option<f64>,

    /// Telemetry-clock time of frame 0, in milliseconds. Aligns the video
    /// with the track when the two clocks do not start together.
    #[arg(long, default_value_t = 0)]
    offset_ms: i64,

    /// GPS lock filtering policy.
    #[arg(long, value_enum, default_value_t = LockChoice::None)]
    gps_lock: LockChoice,

    /// Minimum fix quality for --gps-lock strict (3 = 3D fix).
    #[arg(long, default_value_t = 3)]
    min_fix_quality: u8,

    /// Minimum satellite count for --gps-lock strict.
    #[arg(long, default_value_t = 4)]
    min_satellites: u8,

    /// Maximum satellite count for --gps-lock strict.
    #[arg(long, default_value_t = 40)]
    max_satellites: u8,

    /// Privacy zone as lat,lon,km: positions inside are scrubbed.
    #[arg(long)]
    privacy: Option<String>,

    /// Warn about telemetry gaps wider than this many seconds.
    #[arg(long, default_value_t = 10.0)]
    gap_warn_secs: f64,

    /// Encode profile name from --profiles.
    #[arg(long, requires = "profiles")]
    profile: Option<String>,

    /// JSON file mapping profile names to ffmpeg argument lists.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Background color as RRGGBB hex.
    #[arg(long, default_value = "12141c")]
    bg: String,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Input telemetry JSON (array of samples).
    #[arg(long)]
    telemetry: PathBuf,

    /// Metric to read out (speed, altitude, hr, cadence, temp, lat, lon).
    #[arg(long)]
    metric: Option<String>,

    /// Unit for --metric (defaults to the metric's native unit).
    #[arg(long)]
    unit: Option<String>,

    /// Time to read --metric at, in milliseconds (defaults to track start).
    #[arg(long)]
    at_ms: Option<i64>,

    /// Warn about telemetry gaps wider than this many seconds.
    #[arg(long, default_value_t = 10.0)]
    gap_warn_secs: f64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LockChoice {
    /// Trust every sample's position.
    None,
    /// Require a minimum fix quality and a plausible satellite count.
    Strict,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn read_samples(path: &Path) -> anyhow::Result<Vec<Sample>> {
    let f = File::open(path).with_context(|| format!("open telemetry '{}'", path.display()))?;
    let r = BufReader::new(f);
    let samples: Vec<Sample> = serde_json::from_reader(r).with_context(|| "parse telemetry JSON")?;
    Ok(samples)
}

fn parse_size(s: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = s
        .split_once('x')
        .with_context(|| format!("--size must be WxH, got '{s}'"))?;
    Ok((w.parse()?, h.parse()?))
}

fn parse_privacy(s: &str) -> anyhow::Result<PrivacyZone> {
    let parts: Vec<&str> = s.split(',').collect();
    let [lat, lon, km] = parts.as_slice() else {
        anyhow::bail!("--privacy must be lat,lon,km, got '{s}'");
    };
    Ok(PrivacyZone {
        center: GeoPoint::new(lat.trim().parse()?, lon.trim().parse()?),
        radius_m: km.trim().parse::<f64>()? * 1000.0,
    })
}

fn parse_bg(s: &str) -> anyhow::Result<[u8; 4]> {
    let s = s.trim_start_matches('#');
    if s.len() != 6 {
        anyhow::bail!("--bg must be RRGGBB hex, got '{s}'");
    }
    let r = u8::from_str_radix(&s[0..2], 16)?;
    let g = u8::from_str_radix(&s[2..4], 16)?;
    let b = u8::from_str_radix(&s[4..6], 16)?;
    Ok([r, g, b, 255])
}

fn load_timeseries(
    path: &Path,
    lock: LockChoice,
    strict: StrictLockFilter,
    privacy: Option<&PrivacyZone>,
    diag: &mut VecDiagnostics,
) -> anyhow::Result<Timeseries> {
    let samples = read_samples(path)?;
    let samples = samples
        .into_iter()
        .map(|s| match privacy {
            Some(zone) => zone.apply(s),
            None => s,
        });

    let ts = match lock {
        LockChoice::None => Timeseries::ingest(samples, &NullLockFilter, diag),
        LockChoice::Strict => Timeseries::ingest(samples, &strict, diag),
    };
    if ts.is_empty() {
        anyhow::bail!("telemetry file '{}' contains no samples", path.display());
    }
    Ok(ts)
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let (width, height) = parse_size(&args.size)?;
    let fps = Fps::new(args.fps, 1)?;
    let privacy = args.privacy.as_deref().map(parse_privacy).transpose()?;
    let strict = StrictLockFilter {
        min_quality: args.min_fix_quality,
        min_satellites: args.min_satellites,
        max_satellites: args.max_satellites,
    };

    let mut diag = VecDiagnostics::new();
    let ts = load_timeseries(
        &args.telemetry,
        args.gps_lock,
        strict,
        privacy.as_ref(),
        &mut diag,
    )?;

    let frame_count = match (args.frames, args.duration_secs) {
        (Some(n), _) => n,
        (None, Some(secs)) => fps.frames_for_secs(secs),
        (None, None) => {
            // Default: cover the whole track.
            let (first, last) = ts.bounds()?;
            fps.frames_for_secs(first.millis_until(last) as f64 / 1000.0)
        }
    };

    let geometry = FrameGeometry {
        width,
        height,
        fps,
        frame_count,
        start: Timestamp(args.offset_ms),
    };

    let profile = match (&args.profile, &args.profiles) {
        (Some(name), Some(path)) => Some(EncodeProfile::load(path, name)?),
        _ => None,
    };

    let opts = OverlaySessionOpts {
        gap_threshold_ms: Some((args.gap_warn_secs * 1000.0) as i64),
        ..OverlaySessionOpts::default()
    };
    let session = OverlaySession::new(&ts, geometry, opts)?;

    let mut sink = FfmpegSink::new(FfmpegSinkOpts {
        out_path: args.out.clone(),
        overwrite: true,
        profile,
    });
    let mut renderer = SolidRenderer {
        bg_rgba: parse_bg(&args.bg)?,
    };

    let stats = session.render(
        &mut renderer,
        &mut sink,
        &mut LogDiagnostics,
        &CancelToken::new(),
    )?;

    eprintln!(
        "wrote {} ({} frames)",
        args.out.display(),
        stats.frames_written
    );
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let mut diag = VecDiagnostics::new();
    let ts = load_timeseries(
        &args.telemetry,
        LockChoice::None,
        StrictLockFilter::default(),
        None,
        &mut diag,
    )?;
    ts.scan_gaps((args.gap_warn_secs * 1000.0) as i64, &mut diag);

    let (first, last) = ts.bounds()?;
    println!("samples:  {}", ts.len());
    println!(
        "bounds:   {} .. {} ms ({:.1}s)",
        first.millis(),
        last.millis(),
        first.millis_until(last) as f64 / 1000.0
    );
    for event in &diag.events {
        println!("event:    {event:?}");
    }

    if let Some(name) = &args.metric {
        let metric = Metric::from_str(name)?;
        let unit = match &args.unit {
            Some(u) => Unit::from_str(u)?,
            None => metric.native_unit(),
        };
        let at = Timestamp(args.at_ms.unwrap_or(first.millis()));
        let entry = ts.at(at)?;
        let value = tracklay::read(&entry, metric, unit)?;
        println!("{metric} @ {} ms: {value:.3} {unit}", at.millis());
    }

    Ok(())
}
