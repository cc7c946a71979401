//! Guest image generator protocols.
//!
//! Two ABIs are supported for getting the encoded image out of the guest:
//!
//! ```text
//! ReturnPointer:  generate_packed() -> i64        (offset << 32) | length
//! FixedBuffer:    generate()
//!                 buffer_address() -> i32
//!                 buffer_length()  -> i32
//! ```
//!
//! In both cases the region belongs to the guest and is only valid until the
//! next guest call. The host never frees it; it copies the bytes out within
//! the same [`ImageSource::generate`] call that produced them.

use serde::{Deserialize, Serialize};

use super::buffer::BufferHandle;
use super::runtime::{WasmInstance, WasmModule};
use crate::error::{Result, SandboxError};
use crate::pipeline::ImageSource;

/// Export returning a packed offset/length pair.
pub const EXPORT_GENERATE_PACKED: &str = "generate_packed";
/// Export filling the guest's fixed buffer.
pub const EXPORT_GENERATE: &str = "generate";
/// Export reporting the fixed buffer's address.
pub const EXPORT_BUFFER_ADDRESS: &str = "buffer_address";
/// Export reporting how many bytes of the fixed buffer are valid.
pub const EXPORT_BUFFER_LENGTH: &str = "buffer_length";

/// How the host retrieves the encoded image from the guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GuestProtocol {
    /// `generate_packed()` returns the buffer location directly.
    ReturnPointer,
    /// `generate()` fills a preallocated buffer described by two queries.
    FixedBuffer,
}

impl GuestProtocol {
    /// Pick the protocol a module supports from its exports.
    ///
    /// The fixed-buffer protocol wins when a module exports both.
    pub fn detect(module: &WasmModule) -> Result<Self> {
        let fixed = [EXPORT_GENERATE, EXPORT_BUFFER_ADDRESS, EXPORT_BUFFER_LENGTH];
        if fixed.iter().all(|name| module.exports_function(name)) {
            return Ok(GuestProtocol::FixedBuffer);
        }
        if module.exports_function(EXPORT_GENERATE_PACKED) {
            return Ok(GuestProtocol::ReturnPointer);
        }
        Err(SandboxError::MissingExport(format!(
            "module '{}' exports neither '{}' nor '{}'/'{}'/'{}'",
            module.name(),
            EXPORT_GENERATE_PACKED,
            EXPORT_GENERATE,
            EXPORT_BUFFER_ADDRESS,
            EXPORT_BUFFER_LENGTH
        )))
    }

    /// Human-readable protocol name.
    pub fn name(&self) -> &'static str {
        match self {
            GuestProtocol::ReturnPointer => "return-pointer",
            GuestProtocol::FixedBuffer => "fixed-buffer",
        }
    }
}

/// An [`ImageSource`] backed by a sandboxed guest instance.
pub struct GuestImageSource {
    instance: WasmInstance,
    protocol: GuestProtocol,
}

impl GuestImageSource {
    /// Wrap an instance that speaks `protocol`.
    pub fn new(instance: WasmInstance, protocol: GuestProtocol) -> Self {
        Self { instance, protocol }
    }

    /// The protocol in use.
    pub fn protocol(&self) -> GuestProtocol {
        self.protocol
    }

    /// Run the guest once and report where it left the encoded image.
    fn invoke(&mut self) -> Result<BufferHandle> {
        match self.protocol {
            GuestProtocol::ReturnPointer => {
                let result = self.instance.call_i64(EXPORT_GENERATE_PACKED)?;
                tracing::trace!(us = result.execution_time_us, "generate_packed returned");
                Ok(BufferHandle::from_packed(result.value as u64))
            }
            GuestProtocol::FixedBuffer => {
                let result = self.instance.call_void(EXPORT_GENERATE)?;
                tracing::trace!(us = result.execution_time_us, "generate returned");
                let offset = self.instance.call_i32(EXPORT_BUFFER_ADDRESS)?.value;
                let length = self.instance.call_i32(EXPORT_BUFFER_LENGTH)?.value;
                Ok(BufferHandle::new(offset as u32, length as u32))
            }
        }
    }
}

impl ImageSource for GuestImageSource {
    fn generate(&mut self) -> Result<Vec<u8>> {
        let handle = self.invoke()?;
        // Must complete before the next guest call can reuse the region
        let bytes = self.instance.copy_out(handle).map_err(|e| {
            tracing::error!(
                module = self.instance.name(),
                offset = handle.offset,
                length = handle.length,
                memory_size = self.instance.memory_size(),
                "guest buffer handle out of range"
            );
            e
        })?;
        Ok(bytes)
    }
}
