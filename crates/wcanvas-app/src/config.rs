//! Application configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use wcanvas_sandbox::{GuestProtocol, PipelineConfig, WasmConfig};

/// Everything the `--config` JSON file can set. Missing fields keep their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Sandbox runtime settings
    pub sandbox: WasmConfig,
    /// Canvas and frame pacing
    pub pipeline: PipelineConfig,
    /// Guest protocol; detected from the module's exports when unset
    pub protocol: Option<GuestProtocol>,
}

impl AppConfig {
    /// Read a JSON config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    /// Parse a JSON config document.
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_is_default() {
        let config = AppConfig::from_json("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.pipeline.canvas_width, 300);
        assert!(config.protocol.is_none());
    }

    #[test]
    fn test_partial_document() {
        let config = AppConfig::from_json(
            r#"{
                "protocol": "fixed-buffer",
                "pipeline": { "frame_rate": 30 },
                "sandbox": { "fuel_limit": 5000000 }
            }"#,
        )
        .unwrap();
        assert_eq!(config.protocol, Some(GuestProtocol::FixedBuffer));
        assert_eq!(config.pipeline.frame_rate, 30);
        assert_eq!(config.pipeline.tile_size, 30);
        assert_eq!(config.sandbox.fuel_limit, Some(5_000_000));
    }

    #[test]
    fn test_unknown_protocol_rejected() {
        assert!(AppConfig::from_json(r#"{"protocol": "shared-memory"}"#).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = AppConfig::load(Path::new("/nonexistent/wcanvas.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read config"));
    }
}
