//! Embeds a prebuilt guest module when one is available.
//!
//! Looks at `WCANVAS_GUEST_WASM`, then at the guest crate's release output,
//! then at the copy the sandbox tests load.
//! When found, the module is copied to `OUT_DIR` and `cfg(embedded_guest)` is
//! set; otherwise the binary needs `--guest <PATH>` at runtime.

use std::env;
use std::path::PathBuf;

const RELEASE_GUEST: &str = "../wcanvas-guest/target/wasm32-wasip1/release/wcanvas_guest.wasm";
const TEST_GUEST: &str = "../wcanvas-sandbox/tests/wcanvas_guest.wasm";

fn main() {
    println!("cargo:rustc-check-cfg=cfg(embedded_guest)");
    println!("cargo:rerun-if-env-changed=WCANVAS_GUEST_WASM");
    println!("cargo:rerun-if-changed={}", RELEASE_GUEST);
    println!("cargo:rerun-if-changed={}", TEST_GUEST);

    let candidate = match env::var_os("WCANVAS_GUEST_WASM") {
        Some(path) => PathBuf::from(path),
        None => [RELEASE_GUEST, TEST_GUEST]
            .iter()
            .map(PathBuf::from)
            .find(|path| path.is_file())
            .unwrap_or_else(|| PathBuf::from(RELEASE_GUEST)),
    };

    if !candidate.is_file() {
        println!(
            "cargo:warning=no prebuilt guest at {}; pass --guest at runtime",
            candidate.display()
        );
        return;
    }

    let Some(out_dir) = env::var_os("OUT_DIR").map(PathBuf::from) else {
        return;
    };
    if let Err(e) = std::fs::copy(&candidate, out_dir.join("wcanvas_guest.wasm")) {
        println!("cargo:warning=failed to copy guest module: {}", e);
        return;
    }
    println!("cargo:rustc-cfg=embedded_guest");
}
