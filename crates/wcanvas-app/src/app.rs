//! Window that drives the render loop once per frame.

use std::time::Duration;

use eframe::egui;
use wcanvas_sandbox::{Bitmap, RenderLoop, Surface};

/// Uploads the canvas into an egui texture.
struct TextureSurface {
    ctx: egui::Context,
    texture: Option<egui::TextureHandle>,
}

impl Surface for TextureSurface {
    fn present(&mut self, canvas: &Bitmap) {
        let size = [canvas.width() as usize, canvas.height() as usize];
        let image = egui::ColorImage::from_rgba_unmultiplied(size, canvas.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(image, egui::TextureOptions::NEAREST),
            None => {
                self.texture = Some(self.ctx.load_texture("canvas", image, egui::TextureOptions::NEAREST));
            }
        }
    }
}

/// The collage window.
pub struct CollageApp {
    render: RenderLoop,
    surface: TextureSurface,
    frame_interval: Duration,
}

impl CollageApp {
    /// Create the app for an already running pipeline.
    pub fn new(ctx: &egui::Context, render: RenderLoop, frame_interval: Duration) -> Self {
        Self {
            render,
            surface: TextureSurface {
                ctx: ctx.clone(),
                texture: None,
            },
            frame_interval,
        }
    }
}

impl eframe::App for CollageApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        match self.render.tick(&mut self.surface) {
            Ok(report) => {
                if let Some((x, y)) = report.composited {
                    tracing::trace!(x, y, "frame composited a circle");
                }
            }
            Err(e) => {
                // The sandbox cannot be recovered in-process
                tracing::error!(error = %e, "pipeline failed, exiting");
                std::process::exit(1);
            }
        }

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                if let Some(texture) = &self.surface.texture {
                    ui.image((texture.id(), texture.size_vec2()));
                }
            });

        ctx.request_repaint_after(self.frame_interval);
    }
}
