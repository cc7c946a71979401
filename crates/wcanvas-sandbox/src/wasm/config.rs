//! Sandbox settings, loadable from the app's JSON config.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output streams the guest's WASI shim may write to.
///
/// The generator does no I/O of its own; WASI is linked so its language
/// runtime can read the clock and report panics. Both streams start closed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasiCapabilities {
    /// Forward guest stdout to the host's
    pub stdout: bool,

    /// Forward guest stderr to the host's (guest panic messages land here)
    pub stderr: bool,
}

impl WasiCapabilities {
    /// Both streams closed.
    pub fn none() -> Self {
        Self::default()
    }

    /// Stderr only, so a trapping guest explains itself in the host's output.
    pub fn guest_runtime() -> Self {
        Self {
            stderr: true,
            ..Self::default()
        }
    }
}

/// Engine and per-instance limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmConfig {
    /// Streams the guest may write to
    pub capabilities: WasiCapabilities,

    /// Ceiling on each instance's linear memory, in bytes
    pub max_memory: usize,

    /// Fuel granted to every guest call; `None` disables metering.
    ///
    /// The budget is refilled before each call, so a long-running instance
    /// only traps when a single call runs away.
    pub fuel_limit: Option<u64>,

    /// Cranelift optimization level (0-3)
    pub optimization_level: u8,

    /// Enable the SIMD proposal
    pub enable_simd: bool,

    /// wasmtime cache config file for compiled modules
    pub cache_path: Option<PathBuf>,
}

impl Default for WasmConfig {
    fn default() -> Self {
        Self {
            capabilities: WasiCapabilities::guest_runtime(),
            max_memory: 64 * 1024 * 1024,
            fuel_limit: None,
            optimization_level: 2,
            enable_simd: true,
            cache_path: None,
        }
    }
}

impl WasmConfig {
    /// Tight limits: 16 MiB of memory, 1B fuel per call, no output streams.
    pub fn minimal() -> Self {
        Self {
            capabilities: WasiCapabilities::none(),
            max_memory: 16 * 1024 * 1024,
            fuel_limit: Some(1_000_000_000),
            ..Self::default()
        }
    }

    /// Builder: set the memory ceiling
    pub fn max_memory(mut self, bytes: usize) -> Self {
        self.max_memory = bytes;
        self
    }

    /// Builder: set the per-call fuel budget
    pub fn fuel_limit(mut self, fuel: u64) -> Self {
        self.fuel_limit = Some(fuel);
        self
    }
}
