//! Background generation worker.

use std::sync::mpsc::{Receiver, SyncSender};
use std::time::Instant;

use super::stats::LatencyWindow;
use super::{tile_origin, GeneratedImage, GenerationRequest, ImageSource};
use crate::codec::decode_png;
use crate::error::Result;

/// Cycles between latency summaries.
const SUMMARY_EVERY: u32 = 100;

/// Serially turns requests into decoded images.
pub(super) struct Worker<S> {
    source: S,
    requests: Receiver<GenerationRequest>,
    results: SyncSender<GeneratedImage>,
    tile_size: u32,
    latency: LatencyWindow,
}

impl<S: ImageSource> Worker<S> {
    pub(super) fn new(
        source: S,
        requests: Receiver<GenerationRequest>,
        results: SyncSender<GeneratedImage>,
        tile_size: u32,
    ) -> Self {
        Self {
            source,
            requests,
            results,
            tile_size,
            latency: LatencyWindow::default(),
        }
    }

    /// Loop until the render loop goes away or a cycle fails.
    pub(super) fn run(mut self) -> Result<()> {
        tracing::debug!("generation worker started");

        while let Ok(request) = self.requests.recv() {
            let image = match self.cycle(request) {
                Ok(image) => image,
                Err(e) => {
                    tracing::error!(position = request.position, error = %e, "generation cycle failed");
                    return Err(e);
                }
            };

            // Blocks only while the previous image is still uncollected
            if self.results.send(image).is_err() {
                break;
            }
        }

        tracing::debug!("generation worker stopped");
        Ok(())
    }

    fn cycle(&mut self, request: GenerationRequest) -> Result<GeneratedImage> {
        let start = Instant::now();

        let bytes = self.source.generate()?;
        let bitmap = decode_png(&bytes)?;
        let (x, y) = tile_origin(request.position, self.tile_size);

        let elapsed = start.elapsed();
        tracing::debug!(
            position = request.position,
            bytes = bytes.len(),
            width = bitmap.width(),
            height = bitmap.height(),
            x,
            y,
            us = elapsed.as_micros() as u64,
            "image generated"
        );

        self.latency.record(elapsed);
        if self.latency.cycles() >= SUMMARY_EVERY {
            self.latency.flush();
        }

        Ok(GeneratedImage {
            position: request.position,
            bitmap,
            x,
            y,
        })
    }
}
