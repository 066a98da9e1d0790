use serde::Serialize;
use tera::Context;

use crate::config::sram::Memory;
use crate::error::Result;
use crate::grid::fmt_um;
use crate::layout::obs::Obstruction;
use crate::layout::power::PowerNet;
use crate::layout::{MacroGeometry, PinDirection, PinRecord, Rect};
use crate::TEMPLATES;

/// Everything needed to write the physical abstract of one macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalView<'a> {
    pub memory: &'a Memory,
    pub geometry: MacroGeometry,
    pub pins: &'a [PinRecord],
    pub power: &'a [PowerNet],
    pub obstructions: &'a [Obstruction],
}

#[derive(Serialize)]
struct LefPinParams {
    name: String,
    direction: &'static str,
    layer: String,
    rect: String,
}

#[derive(Serialize)]
struct LefPowerParams {
    name: &'static str,
    usage: &'static str,
    layer: String,
    rects: Vec<String>,
}

#[derive(Serialize)]
struct LefObsParams {
    layer: String,
    rect: String,
}

#[derive(Serialize)]
struct LefParams {
    properties: bool,
    name: String,
    width_bits: usize,
    depth: usize,
    banks: u32,
    width: String,
    height: String,
    pins: Vec<LefPinParams>,
    power: Vec<LefPowerParams>,
    obs: Vec<LefObsParams>,
}

fn fmt_rect(rect: &Rect) -> String {
    format!(
        "{} {} {} {}",
        fmt_um(rect.x0),
        fmt_um(rect.y0),
        fmt_um(rect.x1),
        fmt_um(rect.y1)
    )
}

impl PinDirection {
    fn lef_name(&self) -> &'static str {
        match self {
            Self::Input => "INPUT",
            Self::Output => "OUTPUT",
        }
    }
}

impl From<&PhysicalView<'_>> for LefParams {
    fn from(view: &PhysicalView<'_>) -> Self {
        Self {
            properties: true,
            name: view.memory.name.to_string(),
            width_bits: view.memory.width,
            depth: view.memory.depth,
            banks: view.memory.banks.count(),
            width: fmt_um(view.geometry.width),
            height: fmt_um(view.geometry.height),
            pins: view
                .pins
                .iter()
                .map(|pin| LefPinParams {
                    name: pin.name.to_string(),
                    direction: pin.direction.lef_name(),
                    layer: pin.layer.to_string(),
                    rect: fmt_rect(&pin.rect),
                })
                .collect(),
            power: view
                .power
                .iter()
                .map(|net| LefPowerParams {
                    name: net.source.net_name(),
                    usage: net.source.lef_use(),
                    layer: net.layer.to_string(),
                    rects: net.straps.iter().map(fmt_rect).collect(),
                })
                .collect(),
            obs: view
                .obstructions
                .iter()
                .map(|ob| LefObsParams {
                    layer: ob.layer.to_string(),
                    rect: fmt_rect(&ob.rect),
                })
                .collect(),
        }
    }
}

/// Renders the LEF abstract.
///
/// When `properties` is false the `PROPERTYDEFINITIONS` block and the macro
/// `PROPERTY` lines are left out.
pub fn generate_lef(view: &PhysicalView<'_>, properties: bool) -> Result<String> {
    let mut params = LefParams::from(view);
    params.properties = properties;
    Ok(TEMPLATES.render("macro.lef", &Context::from_serialize(params)?)?)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::process::tests::process_config;
    use crate::config::sram::tests::memory_config;
    use crate::dims::Dimensions;
    use crate::layout::obs::obstructions;
    use crate::layout::power::power_rails;
    use crate::layout::layout_pins;

    fn render(properties: bool) -> String {
        let process = process_config().validate().unwrap();
        let memory = memory_config("sram32x1024").validate().unwrap();
        let seed = Dimensions {
            width: dec!(20),
            height: dec!(2),
        };
        let layout = layout_pins(&process, &memory, seed).unwrap();
        let power = power_rails(&process, layout.geometry);
        let obs = obstructions(&process, layout.geometry, process.tech_nm).unwrap();
        let view = PhysicalView {
            memory: &memory,
            geometry: layout.geometry,
            pins: &layout.pins,
            power: &power,
            obstructions: &obs,
        };
        generate_lef(&view, properties).unwrap()
    }

    #[test]
    fn header_and_footer() {
        let lef = render(true);
        assert!(lef.starts_with("# Generated by ramgen\nVERSION 5.7 ;\nBUSBITCHARS \"[]\" ;\n"));
        assert!(lef.contains("PROPERTYDEFINITIONS\n  MACRO width INTEGER ;"));
        assert!(lef.contains("  PROPERTY width 32 ;\n  PROPERTY depth 1024 ;\n  PROPERTY banks 1 ;\n"));
        assert!(lef.contains("  FOREIGN sram32x1024 0 0 ;\n  SYMMETRY X Y R90 ;\n"));
        assert!(lef.contains("  SIZE 20.000 BY 3.912 ;\n  CLASS BLOCK ;\n"));
        assert!(lef.ends_with("END sram32x1024\n\nEND LIBRARY\n"));
    }

    #[test]
    fn sections_in_fixed_order() {
        let lef = render(true);
        let first_pin = lef.find("PIN rw0_addr_in[0]").unwrap();
        let clk = lef.find("PIN rw0_clk").unwrap();
        let vss = lef.find("PIN VSS").unwrap();
        let vdd = lef.find("PIN VDD").unwrap();
        let obs = lef.find("  OBS\n").unwrap();
        assert!(first_pin < clk && clk < vss && vss < vdd && vdd < obs);
        assert!(lef.contains("    USE GROUND ;"));
        assert!(lef.contains("    USE POWER ;"));
        assert!(lef.contains("    LAYER M1 ;\n    RECT 0.000 0.000 20.000 3.912 ;\n"));
    }

    #[test]
    fn pin_rect_formatting() {
        let lef = render(true);
        // First address pin is centered half a pin width above the clearance offset.
        assert!(lef.contains(
            "  PIN rw0_addr_in[0]\n    DIRECTION INPUT ;\n    USE SIGNAL ;\n    SHAPE ABUTMENT ;\n    PORT\n      LAYER M4 ;\n      RECT 0.000 0.048 0.024 0.072 ;\n"
        ));
    }

    #[test]
    fn repeated_runs_are_identical() {
        assert_eq!(render(true), render(true));
    }

    #[test]
    fn properties_can_be_left_out() {
        let lef = render(false);
        assert!(!lef.contains("PROPERTY"));
        assert!(lef.contains("BUSBITCHARS \"[]\" ;\nMACRO sram32x1024\n  FOREIGN"));
    }
}
