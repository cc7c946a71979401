//! # wcanvas sandbox
//!
//! Host side of the wcanvas demo: a sandboxed WebAssembly guest draws small
//! PNG images, and a frame-paced pipeline copies them out of the guest,
//! decodes them and composites them onto a persistent canvas.
//!
//! ## Data Flow
//!
//! ```text
//! RenderLoop::tick ─► request slot ─► worker ─► guest generate()
//!        ▲                                          │
//!        │                               BufferHandle {offset, length}
//!        │                                          │
//!   Canvas::composite ◄─ result slot ◄─ decode_png ◄─ WasmInstance::copy_out
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wcanvas_sandbox::{GuestImageSource, GuestProtocol, Pipeline, PipelineConfig};
//! use wcanvas_sandbox::{WasmConfig, WasmSandbox};
//!
//! let sandbox = WasmSandbox::new(WasmConfig::default())?;
//! let module = sandbox.load_module_bytes("guest", GUEST_WASM)?;
//! let protocol = GuestProtocol::detect(&module)?;
//! let source = GuestImageSource::new(sandbox.instantiate(&module)?, protocol);
//!
//! let mut render = Pipeline::spawn(source, &PipelineConfig::default())?;
//! loop {
//!     render.tick(&mut surface)?; // once per frame
//! }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod canvas;
pub mod codec;
pub mod error;
pub mod pipeline;
pub mod wasm;

// Re-export main types
pub use canvas::Canvas;
pub use codec::{decode_png, encode_png, Bitmap};
pub use error::{Result, SandboxError};
pub use pipeline::{
    tile_origin, FrameReport, GeneratedImage, GenerationRequest, ImageSource, Pipeline,
    PipelineConfig, RenderLoop, Surface,
};
pub use wasm::{
    BufferHandle, GuestImageSource, GuestProtocol, WasiCapabilities, WasmCallResult, WasmConfig,
    WasmInstance, WasmModule, WasmSandbox,
};
