use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{RamgenError, Result};
use crate::grid::{is_on_grid, nm};

/// Metal layer index used for signal pins when pins are flipped.
pub const FLIP_PIN_LAYER: u32 = 3;

/// Technology fields as they appear in a configuration file.
///
/// Lengths are integer nanometres. Keys used by older JSON configurations
/// are accepted as aliases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessConfig {
    pub tech_nm: u32,
    pub voltage: f64,
    #[serde(alias = "metalPrefix")]
    pub metal_prefix: String,
    #[serde(default)]
    pub metal_layer: Option<String>,
    #[serde(alias = "pinWidth_nm")]
    pub pin_width_nm: i64,
    #[serde(default, alias = "pinHeight_nm")]
    pub pin_height_nm: Option<i64>,
    #[serde(alias = "pinPitch_nm")]
    pub pin_pitch_nm: i64,
    pub manufacturing_grid_nm: i64,
    #[serde(default = "one", alias = "snapWidth_nm")]
    pub snap_width_nm: i64,
    #[serde(default = "one", alias = "snapHeight_nm")]
    pub snap_height_nm: i64,
    #[serde(default = "one_u32")]
    pub column_mux_factor: u32,
    #[serde(default, alias = "flipPins")]
    pub flip_pins: bool,
    #[serde(default)]
    pub custom_tech_name: Option<String>,
    #[serde(default)]
    pub hybrid: bool,
    #[serde(default)]
    pub contacted_poly_pitch_nm: Option<i64>,
    #[serde(default, alias = "finPitch_nm")]
    pub fin_pitch_nm: Option<i64>,
}

fn one() -> i64 {
    1
}

fn one_u32() -> u32 {
    1
}

/// A validated technology description. All lengths are in micrometres.
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    pub tech_nm: u32,
    pub voltage: f64,
    pub metal_prefix: String,
    pub metal_layer: String,
    pub pin_width: Decimal,
    pub pin_height: Decimal,
    pub pin_pitch: Decimal,
    pub grid: Decimal,
    pub snap_width: Decimal,
    pub snap_height: Decimal,
    pub column_mux_factor: u32,
    pub flip_pins: bool,
    pub custom_tech_name: Option<String>,
    pub hybrid: bool,
    pub contacted_poly_pitch: Option<Decimal>,
    pub fin_pitch: Option<Decimal>,
}

impl ProcessConfig {
    pub fn validate(&self) -> Result<Process> {
        if self.manufacturing_grid_nm <= 0 {
            return Err(RamgenError::config(
                "manufacturing_grid_nm",
                format!("must be positive, got {}", self.manufacturing_grid_nm),
            ));
        }
        for (param, value) in [
            ("pin_width_nm", self.pin_width_nm),
            ("pin_pitch_nm", self.pin_pitch_nm),
            ("snap_width_nm", self.snap_width_nm),
            ("snap_height_nm", self.snap_height_nm),
        ] {
            if value <= 0 {
                return Err(RamgenError::config(
                    param,
                    format!("must be positive, got {value}"),
                ));
            }
        }
        if self.column_mux_factor == 0 {
            return Err(RamgenError::config("column_mux_factor", "must be at least 1"));
        }

        let grid = nm(self.manufacturing_grid_nm);
        let pin_pitch = nm(self.pin_pitch_nm);
        let pin_width = nm(self.pin_width_nm);

        if !is_on_grid(pin_pitch, grid) {
            return Err(RamgenError::config(
                "pin_pitch_nm",
                format!(
                    "pin pitch {} is not a multiple of manufacturing grid {}",
                    self.pin_pitch_nm, self.manufacturing_grid_nm
                ),
            ));
        }

        // The clearance offset from the top and bottom edges is one pin pitch.
        if pin_width > pin_pitch {
            return Err(RamgenError::config(
                "pin_width_nm",
                format!(
                    "pin width {} exceeds the top/bottom clearance offset {}",
                    self.pin_width_nm, self.pin_pitch_nm
                ),
            ));
        }

        let metal_layer = self
            .metal_layer
            .clone()
            .unwrap_or_else(|| format!("{}4", self.metal_prefix));

        let process = Process {
            tech_nm: self.tech_nm,
            voltage: self.voltage,
            metal_prefix: self.metal_prefix.clone(),
            metal_layer,
            pin_width,
            pin_height: nm(self.pin_height_nm.unwrap_or(self.pin_width_nm)),
            pin_pitch,
            grid,
            snap_width: nm(self.snap_width_nm),
            snap_height: nm(self.snap_height_nm),
            column_mux_factor: self.column_mux_factor,
            flip_pins: self.flip_pins,
            custom_tech_name: self.custom_tech_name.clone(),
            hybrid: self.hybrid,
            contacted_poly_pitch: self.contacted_poly_pitch_nm.map(nm),
            fin_pitch: self.fin_pitch_nm.map(nm),
        };
        process.metal_layer_index()?;
        Ok(process)
    }
}

impl Process {
    /// Clearance kept between the pin run and the top and bottom macro edges.
    #[inline]
    pub fn clearance(&self) -> Decimal {
        self.pin_pitch
    }

    /// Technology node in micrometres.
    #[inline]
    pub fn tech_um(&self) -> Decimal {
        Decimal::new(self.tech_nm as i64, 3)
    }

    /// The numeric index of the configured signal layer, e.g. 4 for `M4`.
    pub fn metal_layer_index(&self) -> Result<u32> {
        self.metal_layer
            .strip_prefix(&self.metal_prefix)
            .map(|idx| idx.trim_matches('"'))
            .and_then(|idx| idx.parse().ok())
            .ok_or_else(|| {
                RamgenError::config(
                    "metal_layer",
                    format!(
                        "layer `{}` is not `{}` followed by a layer number",
                        self.metal_layer, self.metal_prefix
                    ),
                )
            })
    }

    /// Name of metal layer `idx`.
    pub fn metal(&self, idx: u32) -> String {
        format!("{}{}", self.metal_prefix, idx)
    }

    /// The layer carrying signal pins.
    pub fn signal_layer(&self) -> String {
        if self.flip_pins {
            self.metal(FLIP_PIN_LAYER)
        } else {
            self.metal_layer.clone()
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    pub(crate) fn process_config() -> ProcessConfig {
        ProcessConfig {
            tech_nm: 7,
            voltage: 0.7,
            metal_prefix: "M".to_string(),
            metal_layer: None,
            pin_width_nm: 24,
            pin_height_nm: None,
            pin_pitch_nm: 48,
            manufacturing_grid_nm: 1,
            snap_width_nm: 190,
            snap_height_nm: 1400,
            column_mux_factor: 1,
            flip_pins: false,
            custom_tech_name: None,
            hybrid: false,
            contacted_poly_pitch_nm: Some(54),
            fin_pitch_nm: Some(27),
        }
    }

    #[test]
    fn converts_nanometres() {
        let process = process_config().validate().unwrap();
        assert_eq!(process.pin_pitch, dec!(0.048));
        assert_eq!(process.pin_width, dec!(0.024));
        assert_eq!(process.pin_height, dec!(0.024));
        assert_eq!(process.grid, dec!(0.001));
        assert_eq!(process.metal_layer, "M4");
        assert_eq!(process.metal_layer_index().unwrap(), 4);
        assert_eq!(process.signal_layer(), "M4");
    }

    #[test]
    fn flipped_pins_use_layer_three() {
        let mut config = process_config();
        config.flip_pins = true;
        let process = config.validate().unwrap();
        assert_eq!(process.signal_layer(), "M3");
    }

    #[test]
    fn rejects_off_grid_pitch() {
        let mut config = process_config();
        config.manufacturing_grid_nm = 5;
        config.pin_pitch_nm = 48;
        config.pin_width_nm = 20;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            RamgenError::Config {
                param: "pin_pitch_nm",
                ..
            }
        ));
    }

    #[test]
    fn rejects_pin_wider_than_clearance() {
        let mut config = process_config();
        config.pin_width_nm = 50;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            RamgenError::Config {
                param: "pin_width_nm",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unprefixed_layer() {
        let mut config = process_config();
        config.metal_layer = Some("metal4".to_string());
        assert!(config.validate().unwrap_err().is_config());
    }
}
