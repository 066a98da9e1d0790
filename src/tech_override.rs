//! Custom technology overrides.
//!
//! A custom technology is described by a YAML file of scalar parameters. Keys
//! may sit at any nesting depth; the first occurrence of a key in document
//! order wins.

use std::path::{Path, PathBuf};

use log::info;
use serde_yaml::Value;

use crate::error::{RamgenError, Result};
use crate::paths::custom_tech_file;

pub const ACCESS_TIME_NS: &str = "access_time_ns";
pub const CYCLE_TIME_NS: &str = "cycle_time_ns";
pub const FO4_PS: &str = "fo4_ps";
pub const STANDBY_LEAKAGE_PER_BANK_MW: &str = "standby_leakage_per_bank_mW";
pub const CONTACTED_POLY_PITCH_NM: &str = "contacted_poly_pitch_nm";
pub const FIN_PITCH_NM: &str = "finPitch_nm";
pub const T_SETUP_NS: &str = "t_setup_ns";
pub const T_HOLD_NS: &str = "t_hold_ns";
pub const PIN_DYNAMIC_POWER_MW: &str = "pin_dynamic_power_mW";
pub const CAP_INPUT_PF: &str = "cap_input_pf";

/// Parameters a custom technology may replace in a characterization record.
pub const CHARACTERIZATION_KEYS: [&str; 6] = [
    ACCESS_TIME_NS,
    CYCLE_TIME_NS,
    FO4_PS,
    STANDBY_LEAKAGE_PER_BANK_MW,
    CONTACTED_POLY_PITCH_NM,
    FIN_PITCH_NM,
];

#[derive(Debug, Clone, PartialEq)]
pub struct TechOverride {
    pub path: PathBuf,
    values: Vec<(String, f64)>,
}

fn flatten(value: &Value, out: &mut Vec<(String, f64)>) {
    match value {
        Value::Mapping(map) => {
            for (key, value) in map {
                match (key.as_str(), value) {
                    (_, Value::Mapping(_) | Value::Sequence(_)) => flatten(value, out),
                    (Some(key), scalar) => {
                        if let Some(num) = scalar_f64(scalar) {
                            out.push((key.to_string(), num));
                        }
                    }
                    (None, _) => {}
                }
            }
        }
        Value::Sequence(seq) => seq.iter().for_each(|value| flatten(value, out)),
        _ => {}
    }
}

fn scalar_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(num) => num.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl TechOverride {
    /// Looks up `<custom_tech_dir>/<tech_name>.yml`.
    ///
    /// Returns `None` if the file does not exist.
    pub fn find(custom_tech_dir: impl AsRef<Path>, tech_name: &str) -> Result<Option<Self>> {
        let path = custom_tech_file(custom_tech_dir, tech_name);
        if !path.is_file() {
            return Ok(None);
        }
        Self::load(path).map(Some)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let mut tech = Self::from_yaml(&contents).map_err(|reason| RamgenError::Parse {
            path: path.to_path_buf(),
            reason,
        })?;
        tech.path = path.to_path_buf();
        info!("loaded custom technology from {path:?}");
        Ok(tech)
    }

    fn from_yaml(contents: &str) -> std::result::Result<Self, String> {
        let doc: Value = serde_yaml::from_str(contents).map_err(|e| e.to_string())?;
        let mut values = Vec::new();
        flatten(&doc, &mut values);
        Ok(Self {
            path: PathBuf::new(),
            values,
        })
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|&(_, value)| value)
    }

    /// Like [`TechOverride::get`], but a missing key is a configuration error.
    pub fn require(&self, key: &'static str) -> Result<f64> {
        self.get(key).ok_or_else(|| {
            RamgenError::config(
                key,
                format!("missing from custom technology file {:?}", self.path),
            )
        })
    }
}
