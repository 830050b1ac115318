//! ### English
//! Drives a `Presenter` against a simulated fixed-refresh display and prints latency statistics.
//!
//! ### 中文
//! 在模拟的固定刷新率显示上驱动 `Presenter`，并输出延迟统计。

use std::env;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use frame_pacer::sim::VsyncDisplay;
use frame_pacer::{
    ConfirmationWaiter, DeviceHandle, FrameStatsReader, LatencySummary, PacerConfig,
    PacingContext, PresentDescriptor, Presenter, QueueHandle, SurfaceHandle,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "frame_pacer=info,frame_pacer_sim=info";

/// How often the telemetry thread drains its reader.
const TELEMETRY_POLL: Duration = Duration::from_millis(5);

#[derive(Parser, Debug)]
#[command(name = "frame-pacer-sim", version, about = "Frame pacing simulator")]
struct Cli {
    /// Number of frames to present.
    #[arg(long, default_value_t = 240)]
    frames: u64,
    /// Simulated display refresh rate.
    #[arg(long, default_value_t = 60.0)]
    refresh_hz: f64,
    /// Render-ahead limit; overrides the config file. Negative disables throttling.
    #[arg(long, allow_negative_numbers = true)]
    render_ahead: Option<i8>,
    /// Simulated CPU/GPU time spent on each frame before it is presented.
    #[arg(long, default_value_t = 4.0)]
    render_time_ms: f64,
    /// Optional pacer configuration file (TOML).
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let directives = env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.to_owned());
    let env_filter = EnvFilter::builder().parse_lossy(directives);
    tracing_subscriber::fmt()
        .compact()
        .with_writer(io::stderr)
        .with_env_filter(env_filter)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => PacerConfig::load(path)
            .with_context(|| format!("loading pacer config {}", path.display()))?,
        None => PacerConfig::default(),
    };
    if let Some(limit) = cli.render_ahead {
        config.render_ahead_limit = limit;
    }
    let render_time = Duration::from_secs_f64(cli.render_time_ms.max(0.0) / 1000.0);

    info!(
        frames = cli.frames,
        refresh_hz = cli.refresh_hz,
        render_ahead_limit = config.render_ahead_limit,
        ?render_time,
        "starting simulation"
    );

    let context = PacingContext::new(config);
    let display = VsyncDisplay::from_hz(cli.refresh_hz);
    let waiter: Arc<dyn ConfirmationWaiter> = display.clone();
    let presenter = Presenter::new(&context, display.clone(), waiter)
        .context("creating presenter")?;

    let stop = Arc::new(AtomicBool::new(false));
    let telemetry = spawn_telemetry(presenter.reader(), stop.clone())?;

    let surface = SurfaceHandle(1);
    let began = Instant::now();
    for frame in 0..cli.frames {
        if !render_time.is_zero() {
            thread::sleep(render_time);
        }
        let image_index = (frame % 3) as u32;
        let descriptor = PresentDescriptor::single(surface, image_index);
        let outcome = presenter
            .present(QueueHandle(0), &descriptor, DeviceHandle(0))
            .context("presenting frame")?;
        if !outcome.is_success() {
            warn!(frame, code = outcome.0, "present failed");
        }
    }
    let submitted_in = began.elapsed();

    // Let the last frames scan out before shutting the present-wait thread down.
    let drain_until = Instant::now() + display.refresh_interval() * 4;
    while presenter.stats().last_confirmed() < cli.frames && Instant::now() < drain_until {
        thread::sleep(TELEMETRY_POLL);
    }
    drop(presenter);

    stop.store(true, Ordering::Release);
    let (summary, dropped) = match telemetry.join() {
        Ok(result) => result,
        Err(_) => anyhow::bail!("telemetry thread panicked"),
    };

    print_summary(&summary, dropped, cli.frames, submitted_in);
    Ok(())
}

fn spawn_telemetry(
    mut reader: FrameStatsReader,
    stop: Arc<AtomicBool>,
) -> Result<thread::JoinHandle<(LatencySummary, u64)>> {
    thread::Builder::new()
        .name("FramePacerTelemetry".to_string())
        .spawn(move || {
            let mut summary = LatencySummary::default();
            loop {
                let stopping = stop.load(Ordering::Acquire);
                let drained = summary.drain(&mut reader);
                if drained > 0 {
                    debug!(
                        drained,
                        last_latency_micros = summary.last_latency_micros,
                        last_frametime_micros = summary.last_frametime_micros,
                        "telemetry"
                    );
                }
                if stopping {
                    break;
                }
                thread::sleep(TELEMETRY_POLL);
            }
            (summary, reader.dropped())
        })
        .context("spawning telemetry thread")
}

fn print_summary(summary: &LatencySummary, dropped: u64, frames: u64, submitted_in: Duration) {
    let micros = |value: Option<u32>| value.map_or_else(|| "-".to_string(), |v| format!("{v}us"));

    println!("frames presented : {frames} in {submitted_in:.2?}");
    println!("frames confirmed : {}", summary.count);
    println!("records dropped  : {dropped}");
    println!("latency min      : {}", micros(summary.min_latency_micros));
    println!("latency mean     : {}", micros(summary.mean_latency_micros()));
    println!("latency max      : {}", micros(summary.max_latency_micros));
    println!("last frametime   : {}", micros(summary.last_frametime_micros));
}
