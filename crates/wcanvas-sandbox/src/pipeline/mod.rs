//! Frame-paced generation pipeline.
//!
//! Two execution contexts share nothing but two single-slot channels:
//!
//! ```text
//!  RenderLoop::tick ── try_send(GenerationRequest) ──► [ slot ] ──► worker
//!        ▲                                                             │
//!        └──────── try_recv(GeneratedImage) ◄── [ slot ] ◄── send ─────┘
//! ```
//!
//! A full request slot means the worker is still busy and the frame skips its
//! request; an empty result slot means there is nothing new to composite.
//! Neither is an error. The render loop never blocks. The worker owns the
//! image source (and so the guest's memory), the render loop owns the canvas.

mod render;
mod stats;
mod worker;

pub use render::{FrameReport, RenderLoop, Surface};

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::codec::Bitmap;
use crate::error::{Result, SandboxError};
use worker::Worker;

/// Number of tiles per row and column before positions wrap around.
pub const GRID_SPAN: u64 = 10;

/// Produces one encoded image per call.
///
/// The returned bytes are host-owned; implementations backed by guest memory
/// must finish copying before they return.
pub trait ImageSource {
    /// Generate one PNG-encoded image.
    fn generate(&mut self) -> Result<Vec<u8>>;
}

/// A request for the image at a sequence position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationRequest {
    /// Sequence position, starting at 0
    pub position: u64,
}

/// A decoded image and where on the canvas it goes.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Position the image was requested for
    pub position: u64,
    /// Decoded pixels
    pub bitmap: Bitmap,
    /// Canvas column in pixels
    pub x: u32,
    /// Canvas row in pixels
    pub y: u32,
}

/// Canvas coordinates of the tile for a sequence position.
///
/// Column is `position % 10`, row is `(position / 10) % 10`, both scaled by
/// `tile_size`.
pub fn tile_origin(position: u64, tile_size: u32) -> (u32, u32) {
    let column = (position % GRID_SPAN) as u32;
    let row = ((position / GRID_SPAN) % GRID_SPAN) as u32;
    (column * tile_size, row * tile_size)
}

/// Canvas and pacing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Canvas width in pixels
    pub canvas_width: u32,
    /// Canvas height in pixels
    pub canvas_height: u32,
    /// Spacing between successive images in pixels
    pub tile_size: u32,
    /// Render loop ticks per second
    pub frame_rate: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            canvas_width: 300,
            canvas_height: 300,
            tile_size: 30,
            frame_rate: 60,
        }
    }
}

impl PipelineConfig {
    /// Builder: set the frame rate
    pub fn frame_rate(mut self, fps: u32) -> Self {
        self.frame_rate = fps;
        self
    }

    /// Builder: set the tile size
    pub fn tile_size(mut self, pixels: u32) -> Self {
        self.tile_size = pixels;
        self
    }

    /// Time between render loop ticks.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate.max(1)))
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(SandboxError::Config(format!(
                "canvas must be non-empty, got {}x{}",
                self.canvas_width, self.canvas_height
            )));
        }
        if self.tile_size == 0 {
            return Err(SandboxError::Config("tile_size must be positive".to_string()));
        }
        if self.frame_rate == 0 {
            return Err(SandboxError::Config("frame_rate must be positive".to_string()));
        }
        Ok(())
    }
}

/// Entry point that wires a source, a worker thread and a render loop.
pub struct Pipeline;

impl Pipeline {
    /// Start the background worker around `source` and return the render
    /// loop that feeds it.
    ///
    /// The worker runs until the render loop is dropped or a fatal error
    /// occurs; a fatal error is reported by the next [`RenderLoop::tick`].
    pub fn spawn<S>(source: S, config: &PipelineConfig) -> Result<RenderLoop>
    where
        S: ImageSource + Send + 'static,
    {
        config.validate()?;

        let (request_tx, request_rx) = mpsc::sync_channel::<GenerationRequest>(1);
        let (result_tx, result_rx) = mpsc::sync_channel::<GeneratedImage>(1);

        let worker = Worker::new(source, request_rx, result_tx, config.tile_size);
        let handle = thread::Builder::new()
            .name("wcanvas-worker".to_string())
            .spawn(move || worker.run())?;

        tracing::info!(
            width = config.canvas_width,
            height = config.canvas_height,
            tile = config.tile_size,
            fps = config.frame_rate,
            "pipeline started"
        );

        Ok(RenderLoop::new(
            Canvas::new(config.canvas_width, config.canvas_height),
            request_tx,
            result_rx,
            handle,
        ))
    }
}
