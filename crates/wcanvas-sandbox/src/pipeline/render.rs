//! Non-blocking render loop.

use std::sync::mpsc::{Receiver, SyncSender, TryRecvError, TrySendError};
use std::thread::JoinHandle;

use super::{GeneratedImage, GenerationRequest};
use crate::canvas::Canvas;
use crate::codec::Bitmap;
use crate::error::{Result, SandboxError};

/// Display surface the canvas is presented to every frame.
pub trait Surface {
    /// Show the current canvas.
    fn present(&mut self, canvas: &Bitmap);
}

/// What happened during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Origin of the image composited this frame, if one arrived
    pub composited: Option<(u32, u32)>,
    /// Position requested this frame, if the request slot was free
    pub requested: Option<u64>,
}

/// Frame-driven half of the pipeline. Owns the persistent canvas.
pub struct RenderLoop {
    canvas: Canvas,
    requests: SyncSender<GenerationRequest>,
    results: Receiver<GeneratedImage>,
    next_position: u64,
    worker: Option<JoinHandle<Result<()>>>,
}

impl RenderLoop {
    pub(super) fn new(
        canvas: Canvas,
        requests: SyncSender<GenerationRequest>,
        results: Receiver<GeneratedImage>,
        worker: JoinHandle<Result<()>>,
    ) -> Self {
        Self {
            canvas,
            requests,
            results,
            next_position: 0,
            worker: Some(worker),
        }
    }

    /// Run one frame: composite a finished image if there is one, request the
    /// next image if the worker is idle, then present the canvas.
    ///
    /// Never waits on the worker. Returns the worker's error once it has
    /// stopped.
    pub fn tick(&mut self, surface: &mut dyn Surface) -> Result<FrameReport> {
        let mut report = FrameReport::default();

        match self.results.try_recv() {
            Ok(image) => {
                self.canvas.composite(&image.bitmap, image.x, image.y);
                tracing::trace!(position = image.position, x = image.x, y = image.y, "composited");
                report.composited = Some((image.x, image.y));
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => return Err(self.worker_failure()),
        }

        let request = GenerationRequest {
            position: self.next_position,
        };
        match self.requests.try_send(request) {
            Ok(()) => {
                report.requested = Some(self.next_position);
                self.next_position += 1;
            }
            // Worker still busy
            Err(TrySendError::Full(_)) => {}
            Err(TrySendError::Disconnected(_)) => return Err(self.worker_failure()),
        }

        surface.present(self.canvas.bitmap());
        Ok(report)
    }

    /// The persistent canvas.
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Position the next request will carry.
    pub fn next_position(&self) -> u64 {
        self.next_position
    }

    /// Collect the reason the worker stopped. Only called once a channel has
    /// disconnected, so the worker thread is already returning.
    fn worker_failure(&mut self) -> SandboxError {
        let Some(handle) = self.worker.take() else {
            return SandboxError::WorkerStopped("worker failure already reported".to_string());
        };
        match handle.join() {
            Ok(Err(e)) => e,
            Ok(Ok(())) => SandboxError::WorkerStopped("worker exited without an error".to_string()),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                SandboxError::WorkerStopped(format!("panicked: {}", message))
            }
        }
    }
}
