//! The persistent canvas the render loop accumulates circles onto.

use image::imageops;

use crate::codec::Bitmap;

/// A fixed-size bitmap that is composited onto frame after frame and never
/// cleared.
#[derive(Debug, Clone)]
pub struct Canvas {
    bitmap: Bitmap,
}

impl Canvas {
    /// A fully transparent canvas.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            bitmap: Bitmap::new(width, height),
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.bitmap.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.bitmap.height()
    }

    /// The accumulated image.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Pixel at `(x, y)`, or `None` outside the canvas.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        self.bitmap.get_pixel_checked(x, y).map(|p| p.0)
    }

    /// Whether nothing has been drawn yet.
    pub fn is_blank(&self) -> bool {
        self.bitmap.as_raw().iter().all(|&b| b == 0)
    }

    /// Draw `src` with its top-left corner at `(x, y)` using straight-alpha
    /// source-over. Parts of `src` past the canvas edge are clipped.
    pub fn composite(&mut self, src: &Bitmap, x: u32, y: u32) {
        imageops::overlay(&mut self.bitmap, src, i64::from(x), i64::from(y));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Bitmap {
        Bitmap::from_pixel(width, height, Rgba(rgba))
    }

    #[test]
    fn test_new_canvas_is_blank() {
        let canvas = Canvas::new(300, 300);
        assert!(canvas.is_blank());
        assert_eq!(canvas.width(), 300);
        assert_eq!(canvas.height(), 300);
        assert_eq!(canvas.pixel(300, 0), None);
    }

    #[test]
    fn test_composite_only_touches_destination_rect() {
        let mut canvas = Canvas::new(100, 100);
        canvas.composite(&solid(30, 30, [255, 0, 0, 255]), 30, 60);

        assert_eq!(canvas.pixel(30, 60), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(59, 89), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(29, 60), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(60, 60), Some([0, 0, 0, 0]));
        assert_eq!(canvas.pixel(30, 90), Some([0, 0, 0, 0]));
    }

    #[test]
    fn test_composite_accumulates() {
        let mut canvas = Canvas::new(60, 30);
        canvas.composite(&solid(30, 30, [255, 0, 0, 255]), 0, 0);
        canvas.composite(&solid(30, 30, [0, 0, 255, 255]), 30, 0);

        assert_eq!(canvas.pixel(0, 0), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(30, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_transparent_source_keeps_destination() {
        let mut canvas = Canvas::new(30, 30);
        canvas.composite(&solid(30, 30, [0, 255, 0, 255]), 0, 0);
        canvas.composite(&solid(30, 30, [255, 0, 0, 0]), 0, 0);
        assert_eq!(canvas.pixel(10, 10), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_half_alpha_over_opaque() {
        let mut canvas = Canvas::new(1, 1);
        canvas.composite(&solid(1, 1, [0, 0, 0, 255]), 0, 0);
        canvas.composite(&solid(1, 1, [255, 255, 255, 128]), 0, 0);
        let [r, g, b, a] = canvas.pixel(0, 0).unwrap();
        assert_eq!(a, 255);
        assert!((126..=130).contains(&r));
        assert_eq!(r, g);
        assert_eq!(g, b);
    }

    #[test]
    fn test_composite_clips_at_edges() {
        let mut canvas = Canvas::new(40, 40);
        canvas.composite(&solid(30, 30, [9, 9, 9, 255]), 30, 30);
        assert_eq!(canvas.pixel(39, 39), Some([9, 9, 9, 255]));

        // Entirely off-canvas is a no-op
        canvas.composite(&solid(30, 30, [1, 1, 1, 255]), 300, 300);
        assert_eq!(canvas.pixel(0, 0), Some([0, 0, 0, 0]));
    }
}
