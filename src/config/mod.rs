use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{RamgenError, Result};

pub mod process;
pub mod sram;

pub use process::{Process, ProcessConfig};
pub use sram::{Memory, MemoryConfig};

/// A batch of macros sharing one technology.
///
/// Technology fields live at the top level; macros are listed under `sram`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchConfig {
    #[serde(flatten)]
    pub process: ProcessConfig,
    #[serde(rename = "sram", default)]
    pub srams: Vec<MemoryConfig>,
}

/// Supported configuration file formats.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Toml,
    Yaml,
}

impl ConfigFormat {
    /// Infers the format from a file extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_lowercase();
        match ext.as_str() {
            "json" => Some(Self::Json),
            "toml" => Some(Self::Toml),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }

    /// Parses `s` in this format.
    pub fn from_str<T: DeserializeOwned>(&self, s: &str) -> std::result::Result<T, String> {
        match *self {
            Self::Json => serde_json::from_str(s).map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(s).map_err(|e| e.to_string()),
            Self::Yaml => serde_yaml::from_str(s).map_err(|e| e.to_string()),
        }
    }
}

/// Reads a batch configuration, choosing the parser by file extension.
pub fn parse_batch_config(path: impl AsRef<Path>) -> Result<BatchConfig> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path).ok_or_else(|| RamgenError::Parse {
        path: path.to_path_buf(),
        reason: "unrecognized extension (expected .json, .toml, .yml, or .yaml)".to_string(),
    })?;
    let contents = std::fs::read_to_string(path)?;
    format.from_str(&contents).map_err(|reason| RamgenError::Parse {
        path: path.to_path_buf(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn parses_json_batch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("batch.json");
        let mut file = std::fs::File::create(&path)?;
        write!(
            file,
            r#"{{
                "tech_nm": 7,
                "voltage": 0.7,
                "metalPrefix": "M",
                "pinWidth_nm": 24,
                "pinPitch_nm": 48,
                "manufacturing_grid_nm": 1,
                "snapWidth_nm": 190,
                "snapHeight_nm": 1400,
                "flipPins": true,
                "sram": [
                    {{"name": "a", "width": 32, "depth": 256, "banks": 1, "rw": 1}},
                    {{"name": "b", "width": 64, "depth": 512, "banks": 2,
                      "r": [1, "left"], "w": [1, "right"], "write_granularity": 8}}
                ]
            }}"#
        )?;
        drop(file);

        let config = parse_batch_config(&path)?;
        assert_eq!(config.srams.len(), 2);
        assert!(config.process.flip_pins);
        assert_eq!(config.process.snap_width_nm, 190);
        let b = config.srams[1].validate()?;
        assert_eq!(b.wmask_width(), 8);
        assert!(b.ports.is_asymmetric());
        Ok(())
    }

    #[test]
    fn parses_toml_batch() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("batch.toml");
        std::fs::write(
            &path,
            r#"
tech_nm = 45
voltage = 1.1
metal_prefix = "metal"
pin_width_nm = 70
pin_pitch_nm = 140
manufacturing_grid_nm = 5

[[sram]]
name = "fakeram45_64x32"
width = 32
depth = 64
banks = 1
rw = 1
"#,
        )?;
        let config = parse_batch_config(&path)?;
        let process = config.process.validate()?;
        assert_eq!(process.metal_layer, "metal4");
        assert_eq!(config.srams[0].validate()?.addr_width(), 6);
        Ok(())
    }

    #[test]
    fn rejects_unknown_extension() {
        let err = parse_batch_config("config.ini").unwrap_err();
        assert!(matches!(err, RamgenError::Parse { .. }));
    }
}
