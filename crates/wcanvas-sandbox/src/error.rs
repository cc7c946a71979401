//! Error types for the sandbox crate.

use thiserror::Error;

/// Sandbox error type
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Engine creation, module compilation, linking or instantiation failed
    #[error("sandbox instantiation failed: {0}")]
    Instantiation(String),

    /// The guest does not export a function or memory the host relies on
    #[error("missing guest export: {0}")]
    MissingExport(String),

    /// The guest trapped (panic, abort, fuel exhaustion) during a call
    #[error("guest trapped in '{function}': {message}")]
    Trap {
        /// Export that was being invoked
        function: String,
        /// Trap description from the runtime
        message: String,
    },

    /// A buffer handle pointed outside the guest's linear memory
    #[error("guest memory read out of range: offset={offset} length={length} memory size={memory_size}")]
    OutOfBounds {
        /// Offset reported by the guest
        offset: u32,
        /// Length reported by the guest
        length: u32,
        /// Size of linear memory at the time of the read
        memory_size: usize,
    },

    /// The bytes copied out of the guest are not a valid image
    #[error("image decode failed: {0}")]
    Decode(String),

    /// Image encoding failed on the host side
    #[error("image encode failed: {0}")]
    Encode(String),

    /// The background worker stopped without reporting a pipeline error
    #[error("background worker stopped: {0}")]
    WorkerStopped(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;
