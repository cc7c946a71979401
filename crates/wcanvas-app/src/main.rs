//! wcanvas: a sandboxed WASM guest paints circles onto a live canvas.
//!
//! The guest module is instantiated once at startup. A background worker asks
//! it for one PNG at a time, and the window's frame callback composites each
//! finished image onto a persistent 300x300 collage.
//!
//! The guest is embedded at build time when a prebuilt module is available
//! (see `build.rs`); `--guest` loads one from disk instead.

mod app;
mod config;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, ValueEnum};
use eframe::egui;
use tracing::info;
use tracing_subscriber::EnvFilter;
use wcanvas_sandbox::{GuestImageSource, GuestProtocol, Pipeline, WasmSandbox};

use crate::app::CollageApp;
use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "wcanvas")]
#[command(author, version, about = "Sandboxed WASM circle collage", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Guest module to load instead of the embedded one
    #[arg(long)]
    guest: Option<PathBuf>,

    /// How to read images out of the guest (default: detect from exports)
    #[arg(long, value_enum)]
    protocol: Option<ProtocolArg>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Frames per second
    #[arg(long)]
    fps: Option<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ProtocolArg {
    ReturnPointer,
    FixedBuffer,
}

impl From<ProtocolArg> for GuestProtocol {
    fn from(arg: ProtocolArg) -> Self {
        match arg {
            ProtocolArg::ReturnPointer => GuestProtocol::ReturnPointer,
            ProtocolArg::FixedBuffer => GuestProtocol::FixedBuffer,
        }
    }
}

#[cfg(embedded_guest)]
fn embedded_guest() -> Option<&'static [u8]> {
    Some(include_bytes!(concat!(env!("OUT_DIR"), "/wcanvas_guest.wasm")))
}

#[cfg(not(embedded_guest))]
fn embedded_guest() -> Option<&'static [u8]> {
    None
}

fn guest_bytes(path: Option<&Path>) -> Result<Cow<'static, [u8]>> {
    match path {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read guest module {}", path.display()))?;
            Ok(Cow::Owned(bytes))
        }
        None => embedded_guest().map(Cow::Borrowed).ok_or_else(|| {
            anyhow!("this build has no embedded guest module; pass --guest <PATH>")
        }),
    }
}

fn init_logging(verbose: u8) {
    let log_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(fps) = cli.fps {
        config.pipeline.frame_rate = fps;
    }
    if let Some(protocol) = cli.protocol {
        config.protocol = Some(protocol.into());
    }

    let bytes = guest_bytes(cli.guest.as_deref())?;
    let sandbox = WasmSandbox::new(config.sandbox.clone()).context("failed to start sandbox")?;
    let module = sandbox
        .load_module_bytes("wcanvas_guest", &bytes)
        .context("failed to compile guest module")?;
    let protocol = match config.protocol {
        Some(protocol) => protocol,
        None => GuestProtocol::detect(&module)?,
    };
    let instance = sandbox
        .instantiate(&module)
        .context("failed to instantiate guest module")?;
    info!(protocol = protocol.name(), bytes = bytes.len(), "guest loaded");

    let source = GuestImageSource::new(instance, protocol);
    let render = Pipeline::spawn(source, &config.pipeline).context("failed to start pipeline")?;

    let frame_interval = config.pipeline.frame_interval();
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("wcanvas")
            .with_inner_size([
                config.pipeline.canvas_width as f32,
                config.pipeline.canvas_height as f32,
            ])
            .with_resizable(false),
        ..Default::default()
    };

    eframe::run_native(
        "wcanvas",
        options,
        Box::new(move |cc| Ok(Box::new(CollageApp::new(&cc.egui_ctx, render, frame_interval)))),
    )
    .map_err(|e| anyhow!("window error: {}", e))
}
