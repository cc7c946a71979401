//! Circle generator that runs inside the wcanvas sandbox.
//!
//! Each call draws a filled circle in a random color on a 30x30 transparent
//! canvas and PNG-encodes it into guest memory. The host finds the bytes in
//! one of two ways:
//!
//! - `generate_packed() -> i64`: location packed as `(offset << 32) | length`.
//!   The buffer stays alive until the next call replaces it.
//! - `generate()` then `buffer_address()` / `buffer_length()`: the image is
//!   written into a fixed-capacity buffer owned by this instance.
//!
//! Build with `cargo build --release --target wasm32-wasip1`.

use std::cell::RefCell;
use std::time::{SystemTime, UNIX_EPOCH};

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Canvas width and height in pixels.
const SIZE: u32 = 30;
const CENTER: f32 = 15.0;
const RADIUS: f32 = 15.0;
/// Samples per axis when estimating edge coverage.
const SUBSAMPLES: u32 = 4;
/// Fixed buffer capacity. A 30x30 RGBA PNG is far smaller even uncompressed.
const BUFFER_CAPACITY: usize = 16 * 1024;

struct Generator {
    rng: SmallRng,
    /// Last image handed out by `generate_packed`
    packed: Vec<u8>,
    fixed: Box<[u8; BUFFER_CAPACITY]>,
    fixed_len: usize,
}

impl Generator {
    fn new() -> Self {
        Self {
            rng: SmallRng::seed_from_u64(clock_seed()),
            packed: Vec::new(),
            fixed: Box::new([0; BUFFER_CAPACITY]),
            fixed_len: 0,
        }
    }

    fn render(&mut self) -> Vec<u8> {
        let color = [self.rng.gen::<u8>(), self.rng.gen::<u8>(), self.rng.gen::<u8>()];
        encode(&draw_circle(color))
    }
}

thread_local! {
    static GENERATOR: RefCell<Generator> = RefCell::new(Generator::new());
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

/// Fraction of the pixel at `(x, y)` covered by the circle.
fn coverage(x: u32, y: u32) -> f32 {
    let step = 1.0 / SUBSAMPLES as f32;
    let mut inside = 0;
    for j in 0..SUBSAMPLES {
        for i in 0..SUBSAMPLES {
            let dx = x as f32 + (i as f32 + 0.5) * step - CENTER;
            let dy = y as f32 + (j as f32 + 0.5) * step - CENTER;
            if dx * dx + dy * dy <= RADIUS * RADIUS {
                inside += 1;
            }
        }
    }
    inside as f32 / (SUBSAMPLES * SUBSAMPLES) as f32
}

fn draw_circle(color: [u8; 3]) -> RgbaImage {
    RgbaImage::from_fn(SIZE, SIZE, |x, y| {
        let alpha = (coverage(x, y) * 255.0).round() as u8;
        Rgba([color[0], color[1], color[2], alpha])
    })
}

/// Encode failure traps the instance; the host cannot recover it.
fn encode(image: &RgbaImage) -> Vec<u8> {
    let mut out = Vec::new();
    PngEncoder::new(&mut out)
        .write_image(image.as_raw(), SIZE, SIZE, ExtendedColorType::Rgba8)
        .expect("PNG encoding failed");
    out
}

/// Draw a new circle and return its location as `(offset << 32) | length`.
///
/// The buffer is owned by the guest and valid until the next call.
#[no_mangle]
pub extern "C" fn generate_packed() -> u64 {
    GENERATOR.with(|generator| {
        let mut generator = generator.borrow_mut();
        generator.packed = generator.render();
        let ptr = generator.packed.as_ptr() as usize as u64;
        (ptr << 32) | generator.packed.len() as u64
    })
}

/// Draw a new circle into the fixed buffer.
#[no_mangle]
pub extern "C" fn generate() {
    GENERATOR.with(|generator| {
        let mut generator = generator.borrow_mut();
        let png = generator.render();
        assert!(
            png.len() <= BUFFER_CAPACITY,
            "encoded image is {} bytes, buffer holds {}",
            png.len(),
            BUFFER_CAPACITY
        );
        generator.fixed[..png.len()].copy_from_slice(&png);
        generator.fixed_len = png.len();
    })
}

/// Address of the fixed buffer in linear memory.
#[no_mangle]
pub extern "C" fn buffer_address() -> u32 {
    GENERATOR.with(|generator| generator.borrow().fixed.as_ptr() as usize as u32)
}

/// Number of valid bytes in the fixed buffer.
#[no_mangle]
pub extern "C" fn buffer_length() -> u32 {
    GENERATOR.with(|generator| generator.borrow().fixed_len as u32)
}
