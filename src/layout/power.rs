use arcstr::ArcStr;
use rust_decimal::Decimal;

use super::{MacroGeometry, Rect};
use crate::config::Process;
use crate::grid::snap;

/// Strap width in minimum pin widths.
pub const STRAP_WIDTH_PINS: u32 = 4;

/// Strap pitch in minimum pin pitches.
pub const STRAP_PITCH_PINS: u32 = 8;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PowerSource {
    Vdd,
    Gnd,
}

impl PowerSource {
    pub fn net_name(&self) -> &'static str {
        match self {
            Self::Vdd => "VDD",
            Self::Gnd => "VSS",
        }
    }

    /// The LEF `USE` keyword of this net.
    pub fn lef_use(&self) -> &'static str {
        match self {
            Self::Vdd => "POWER",
            Self::Gnd => "GROUND",
        }
    }
}

/// Every strap of one supply net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PowerNet {
    pub source: PowerSource,
    pub layer: ArcStr,
    pub straps: Vec<Rect>,
}

/// Periodic ground and power straps on the configured signal layer.
///
/// Without pin flipping, straps run horizontally across the macro and repeat
/// upward; with flipping, they run vertically and repeat to the right. Ground
/// straps start first, power straps one strap pitch later, and each net repeats
/// every two strap pitches up to the far clearance edge.
pub fn power_rails(process: &Process, geometry: MacroGeometry) -> [PowerNet; 2] {
    let grid = process.grid;
    let offset = process.clearance();
    let MacroGeometry { width, height } = geometry;

    let half_width = snap(
        process.pin_width * Decimal::from(STRAP_WIDTH_PINS) / Decimal::TWO,
        grid,
    );
    let strap_pitch = snap(process.pin_pitch * Decimal::from(STRAP_PITCH_PINS), grid);
    let step = strap_pitch * Decimal::TWO;

    let first = if process.flip_pins {
        snap(process.pin_width + offset * Decimal::TWO, grid)
    } else {
        snap(offset, grid)
    };
    let limit = if process.flip_pins {
        width - offset
    } else {
        height - offset
    };

    let straps = |start: Decimal| {
        let mut rects = Vec::new();
        let mut pos = start;
        while pos <= limit {
            rects.push(if process.flip_pins {
                Rect::new(pos - half_width, offset, pos + half_width, height - offset)
            } else {
                Rect::new(offset, pos - half_width, width - offset, pos + half_width)
            });
            pos = snap(pos + step, grid);
        }
        rects
    };

    let layer = ArcStr::from(process.metal_layer.as_str());
    [
        PowerNet {
            source: PowerSource::Gnd,
            layer: layer.clone(),
            straps: straps(first),
        },
        PowerNet {
            source: PowerSource::Vdd,
            layer,
            straps: straps(snap(first + strap_pitch, grid)),
        },
    ]
}
