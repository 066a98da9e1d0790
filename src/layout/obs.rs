use arcstr::ArcStr;
use rust_decimal::Decimal;

use super::{MacroGeometry, Rect};
use crate::config::process::FLIP_PIN_LAYER;
use crate::config::Process;
use crate::error::Result;

/// Name of the technology-wide overlap layer.
pub const OVERLAP_LAYER: &str = "OVERLAP";

/// Technology node whose flows do not accept an overlap obstruction.
pub const NO_OVERLAP_TECH_NM: u32 = 7;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Obstruction {
    pub layer: ArcStr,
    pub rect: Rect,
}

/// Full-macro blockages on every metal layer below the signal layer.
///
/// The flipped pin layer stays open when pins are flipped. An overlap
/// blockage follows unless `tech_nm` is [`NO_OVERLAP_TECH_NM`].
pub fn obstructions(
    process: &Process,
    geometry: MacroGeometry,
    tech_nm: u32,
) -> Result<Vec<Obstruction>> {
    let outline = Rect::new(Decimal::ZERO, Decimal::ZERO, geometry.width, geometry.height);
    let top = process.metal_layer_index()?;

    let mut obs: Vec<_> = (1..top)
        .filter(|&idx| !(process.flip_pins && idx == FLIP_PIN_LAYER))
        .map(|idx| Obstruction {
            layer: process.metal(idx).into(),
            rect: outline,
        })
        .collect();

    if tech_nm != NO_OVERLAP_TECH_NM {
        obs.push(Obstruction {
            layer: OVERLAP_LAYER.into(),
            rect: outline,
        });
    }

    Ok(obs)
}
