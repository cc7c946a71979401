//! WebAssembly sandbox for the guest image generator.
//!
//! The guest runs under wasmtime with a WASI preview1 shim that exists only
//! for the guest's language runtime (clock reads, panic output). It cannot
//! reach host memory; the host reads guest memory only through
//! [`WasmInstance::copy_out`], which bounds-checks every [`BufferHandle`].
//!
//! ## Security Model
//!
//! - **Memory isolation**: Each instance has its own linear memory
//! - **Deny-by-default**: The shim has no preopened directories, sockets, env
//!   vars or args; only stdout/stderr can be opened, via [`WasiCapabilities`]
//! - **Bounded calls**: With a fuel limit set, every guest call gets the same
//!   budget and traps if it runs past it
//! - **Bounded reads**: Guest-reported offsets are never trusted unchecked
//!
//! ## Usage
//!
//! ```rust,ignore
//! use wcanvas_sandbox::wasm::{GuestImageSource, GuestProtocol, WasmConfig, WasmSandbox};
//!
//! let sandbox = WasmSandbox::new(WasmConfig::default())?;
//! let module = sandbox.load_module("wcanvas_guest.wasm")?;
//! let protocol = GuestProtocol::detect(&module)?;
//! let source = GuestImageSource::new(sandbox.instantiate(&module)?, protocol);
//! ```

mod buffer;
mod config;
mod guest;
mod runtime;

pub use buffer::BufferHandle;
pub use config::{WasiCapabilities, WasmConfig};
pub use guest::{
    GuestImageSource, GuestProtocol, EXPORT_BUFFER_ADDRESS, EXPORT_BUFFER_LENGTH,
    EXPORT_GENERATE, EXPORT_GENERATE_PACKED,
};
pub use runtime::{WasmCallResult, WasmInstance, WasmModule, WasmSandbox};
