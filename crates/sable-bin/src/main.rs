//! Sable demo entrypoint: drives the full render pipeline against the
//! local terminal for a fixed number of frames, then restores the console.

use std::io::stdout;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use core_emit::Renderer;
use core_terminal::{CrosstermBackend, SessionOptions, TerminalBackend, TerminalCapabilities};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;

mod config;
mod scene;

use scene::Scene;

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "sable", version, about = "Sable terminal graphics demo")]
struct Args {
    /// Configuration file path (overrides discovery of `sable.toml`).
    #[arg(long = "config")]
    config: Option<PathBuf>,
    /// Number of frames to run before exiting.
    #[arg(long, default_value_t = 600)]
    frames: u64,
    /// Write one plasma frame as a standalone sixel stream and exit.
    #[arg(long = "dump-sixel")]
    dump_sixel: Option<PathBuf>,
}

/// One-shot path: encode a single frame through the streaming quantizer
/// and write the DCS stream to a file (viewable with `cat` on a
/// sixel-capable terminal).
fn dump_sixel(path: &Path) -> Result<()> {
    let tex = scene::plasma_texture(120, 320, (1, 1), 0.0);
    let stream = core_sixel::encode_rgba(&tex.pixels, tex.w, tex.h, (1, 1))?;
    std::fs::write(path, &stream)?;
    info!(target: "runtime", file = %path.display(), bytes = stream.len(), "sixel dump written");
    Ok(())
}

struct AppStartup {
    backend: CrosstermBackend,
    log_guard: Option<WorkerGuard>,
}

impl AppStartup {
    fn new() -> Self {
        Self {
            backend: CrosstermBackend::new(),
            log_guard: None,
        }
    }

    fn configure_logging(&mut self) -> Result<()> {
        let log_dir = Path::new(".");
        let log_path = log_dir.join("sable.log");
        if log_path.exists() {
            let _ = std::fs::remove_file(&log_path);
        }
        let file_appender = tracing_appender::rolling::never(log_dir, "sable.log");
        let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
        if tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(nb_writer)
            .try_init()
            .is_ok()
        {
            self.log_guard = Some(guard);
        }
        Ok(())
    }

    fn install_panic_hook() {
        static HOOK: Once = Once::new();
        HOOK.call_once(|| {
            let default_panic = std::panic::take_hook();
            std::panic::set_hook(Box::new(move |info| {
                tracing::error!(target: "runtime.panic", ?info, "panic");
                default_panic(info);
            }));
        });
    }
}

fn run(args: Args) -> Result<()> {
    let mut startup = AppStartup::new();
    startup.configure_logging()?;
    AppStartup::install_panic_hook();
    info!(target: "runtime", "startup");

    if let Some(path) = &args.dump_sixel {
        return dump_sixel(path);
    }

    let config = config::load_from(args.config.clone())?;
    let caps = TerminalCapabilities::detect();
    info!(target: "runtime", ?caps, frames = args.frames, "bootstrap complete");

    startup.backend.set_title("sable")?;
    let geometry = startup.backend.geometry()?;
    let _guard = startup.backend.enter_guard(SessionOptions::default())?;

    let mut renderer = Renderer::new(
        geometry.rows,
        geometry.cols,
        geometry.cell_h,
        geometry.cell_w,
    );
    let mut scene = Scene::new(&config);
    let frame_period = Duration::from_secs_f32(1.0 / config.render.fps.max(1) as f32);
    let mut out = stdout();

    for frame in 0..args.frames {
        let frame_start = Instant::now();

        // Geometry can change between frames; a change drops all buffers
        // and forces the next present to repaint fully.
        if let Ok((cols, rows)) = crossterm::terminal::size() {
            let (rows, cols) = (rows as usize, cols as usize);
            if rows != renderer.compositor.rows() || cols != renderer.compositor.cols() {
                renderer.resize(rows, cols);
            }
        }

        renderer.begin_frame();
        scene.compose(&mut renderer)?;
        if let Err(e) = renderer.present(&mut out) {
            error!(target: "render", ?e, "present failed");
            return Err(e.into());
        }

        if frame % 120 == 0 {
            let snap = renderer.metrics();
            tracing::debug!(
                target: "render.metrics",
                frame,
                frames = snap.frames,
                skipped = snap.skipped_frames,
                sixel = snap.sixel_frames,
                cells = snap.cells_emitted,
                bytes = snap.bytes_flushed,
                last_ns = snap.last_present_ns,
                "frame metrics"
            );
        }

        scene.advance(frame_period.as_secs_f32());
        let elapsed = frame_start.elapsed();
        if elapsed < frame_period {
            std::thread::sleep(frame_period - elapsed);
        }
    }

    let snap = renderer.metrics();
    info!(
        target: "runtime",
        frames = snap.frames,
        skipped = snap.skipped_frames,
        sixel_frames = snap.sixel_frames,
        bytes = snap.bytes_flushed,
        "shutdown"
    );
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    run(args)
}
