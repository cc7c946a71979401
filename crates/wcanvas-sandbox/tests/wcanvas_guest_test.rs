//! Integration tests for the sandbox with the real circle generator.
//!
//! Tests load `tests/wcanvas_guest.wasm`, the release build of
//! `crates/wcanvas-guest`. When that file is missing the guest crate is built
//! for `wasm32-wasip1` into the test scratch directory; if that is not
//! possible either (target not installed), the tests are skipped with a note.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::OnceLock;
use std::thread;
use std::time::{Duration, Instant};

use wcanvas_sandbox::{
    decode_png, Bitmap, GuestImageSource, GuestProtocol, ImageSource, Pipeline, PipelineConfig,
    Surface, WasmConfig, WasmInstance, WasmSandbox,
};

const WASM_PATH: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/wcanvas_guest.wasm");
const GUEST_MANIFEST: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../wcanvas-guest/Cargo.toml");

fn build_guest() -> Option<PathBuf> {
    let target_dir = Path::new(env!("CARGO_TARGET_TMPDIR")).join("wcanvas-guest");
    let status = Command::new(env!("CARGO"))
        .args(["build", "--release", "--target", "wasm32-wasip1", "--manifest-path"])
        .arg(GUEST_MANIFEST)
        .arg("--target-dir")
        .arg(&target_dir)
        .status();

    match status {
        Ok(status) if status.success() => {
            Some(target_dir.join("wasm32-wasip1/release/wcanvas_guest.wasm"))
        }
        other => {
            eprintln!(
                "skipping: {} is missing and the guest could not be built ({:?})",
                WASM_PATH, other
            );
            None
        }
    }
}

fn guest_path() -> Option<&'static Path> {
    static GUEST: OnceLock<Option<PathBuf>> = OnceLock::new();
    GUEST
        .get_or_init(|| {
            let prebuilt = PathBuf::from(WASM_PATH);
            if prebuilt.is_file() {
                Some(prebuilt)
            } else {
                build_guest()
            }
        })
        .as_deref()
}

fn instantiate(path: &Path, config: WasmConfig) -> WasmInstance {
    let sandbox = WasmSandbox::new(config).expect("failed to create sandbox");
    let module = sandbox.load_module(path).expect("failed to load module");
    sandbox.instantiate(&module).expect("failed to instantiate")
}

/// Color at the center of a generated circle, which is always fully covered.
fn center_color(bitmap: &Bitmap) -> [u8; 4] {
    bitmap.get_pixel(15, 15).0
}

fn assert_circle(bytes: &[u8]) -> Bitmap {
    assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    let bitmap = decode_png(bytes).expect("guest output should decode");
    assert_eq!(bitmap.dimensions(), (30, 30));
    assert_eq!(center_color(&bitmap)[3], 255);
    assert_eq!(bitmap.get_pixel(0, 0).0[3], 0);
    assert_eq!(bitmap.get_pixel(29, 29).0[3], 0);
    bitmap
}

#[test]
fn test_guest_exports_both_protocols() {
    let Some(path) = guest_path() else { return };
    let sandbox = WasmSandbox::new(WasmConfig::default()).expect("failed to create sandbox");
    let module = sandbox.load_module(path).expect("failed to load module");

    assert_eq!(module.name(), "wcanvas_guest");
    let exports: Vec<&str> = module.exports().collect();
    for name in ["generate_packed", "generate", "buffer_address", "buffer_length"] {
        assert!(exports.contains(&name), "should export '{}'", name);
    }
    assert_eq!(GuestProtocol::detect(&module).unwrap(), GuestProtocol::FixedBuffer);
}

#[test]
fn test_return_pointer_round_trip() {
    let Some(path) = guest_path() else { return };
    let instance = instantiate(path, WasmConfig::default());
    let memory_size = instance.memory_size();
    let mut source = GuestImageSource::new(instance, GuestProtocol::ReturnPointer);

    let first = source.generate().expect("generate_packed failed");
    let first_bitmap = assert_circle(&first);
    assert!(first.len() < memory_size);

    // The guest frees and reallocates its buffer; the host copy is unaffected
    let second = source.generate().expect("generate_packed failed");
    assert_circle(&second);
    assert_ne!(first, second, "two calls should draw two colors");
    assert_eq!(decode_png(&first).unwrap(), first_bitmap);
}

#[test]
fn test_fixed_buffer_round_trip() {
    let Some(path) = guest_path() else { return };
    let mut instance = instantiate(path, WasmConfig::default());

    // The buffer lives at one address for the life of the instance
    let address = instance.call_i32("buffer_address").unwrap().value;
    instance.call_void("generate").unwrap();
    assert_eq!(instance.call_i32("buffer_address").unwrap().value, address);
    assert!(instance.call_i32("buffer_length").unwrap().value > 0);

    let mut source = GuestImageSource::new(instance, GuestProtocol::FixedBuffer);
    let first = source.generate().expect("generate failed");
    let first_color = center_color(&assert_circle(&first));

    // The second call overwrites the guest buffer in place
    let second = source.generate().expect("generate failed");
    assert_circle(&second);
    assert_ne!(first, second, "two calls should draw two colors");
    assert_eq!(center_color(&decode_png(&first).unwrap()), first_color);
}

#[test]
fn test_guest_under_minimal_limits() {
    let Some(path) = guest_path() else { return };
    let instance = instantiate(path, WasmConfig::minimal());
    let mut source = GuestImageSource::new(instance, GuestProtocol::FixedBuffer);

    // Every call starts from the full budget
    for _ in 0..200 {
        assert_circle(&source.generate().expect("generate failed"));
    }
}

struct NullSurface;

impl Surface for NullSurface {
    fn present(&mut self, _canvas: &Bitmap) {}
}

#[test]
fn test_guest_behind_pipeline() {
    let Some(path) = guest_path() else { return };
    let source = GuestImageSource::new(
        instantiate(path, WasmConfig::default()),
        GuestProtocol::ReturnPointer,
    );
    let mut render = Pipeline::spawn(source, &PipelineConfig::default()).unwrap();
    let mut surface = NullSurface;

    let mut origins = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(10);
    while origins.len() < 3 {
        assert!(Instant::now() < deadline, "guest pipeline stalled");
        if let Some(origin) = render.tick(&mut surface).unwrap().composited {
            origins.push(origin);
        }
        thread::sleep(Duration::from_millis(1));
    }

    assert_eq!(origins, vec![(0, 0), (30, 0), (60, 0)]);
    for (x, _) in origins {
        assert_eq!(render.canvas().pixel(x + 15, 15).unwrap()[3], 255);
    }
    assert_eq!(render.canvas().pixel(105, 15), Some([0, 0, 0, 0]));
}
