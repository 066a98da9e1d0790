//! Seed macro dimensions from the size of the bitcell array.
//!
//! This is a coarse area heuristic, not a physical model. Each bitcell is taken
//! to be ten fin pitches tall and two contacted poly pitches wide; the array is
//! then scaled by banking, column muxing, a fixed periphery margin, and the
//! number of ports. Pin placement may later grow the height further.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::config::sram::{BankCount, Memory, PortSpec};

/// Fixed margin for periphery around the bitcell array.
pub const PERIPHERY_MARGIN: Decimal = dec!(1.2);

/// Height scaling applied when ports are split across both macro edges.
pub const ASYMMETRIC_HEIGHT_SCALE: Decimal = dec!(0.5);

/// Bitcell height in fin pitches.
pub const BITCELL_FINS: Decimal = dec!(10);

/// Bitcell width in contacted poly pitches.
pub const BITCELL_POLYS: Decimal = dec!(2);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayParams {
    pub ports: PortSpec,
    pub contacted_poly_pitch: Decimal,
    pub fin_pitch: Decimal,
    pub column_mux_factor: u32,
    pub width: usize,
    pub depth: usize,
    pub banks: BankCount,
}

impl ArrayParams {
    pub fn new(
        memory: &Memory,
        contacted_poly_pitch: Decimal,
        fin_pitch: Decimal,
        column_mux_factor: u32,
    ) -> Self {
        Self {
            ports: memory.ports,
            contacted_poly_pitch,
            fin_pitch,
            column_mux_factor,
            width: memory.width,
            depth: memory.depth,
            banks: memory.banks,
        }
    }
}

/// Macro outline in micrometres.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Dimensions {
    pub width: Decimal,
    pub height: Decimal,
}

pub fn macro_dimensions(params: &ArrayParams) -> Dimensions {
    let ports = Decimal::from(params.ports.total());
    let xfactor = ports;
    let yfactor = if params.ports.is_asymmetric() {
        ports * ASYMMETRIC_HEIGHT_SCALE
    } else {
        ports
    };

    let bitcell_height = BITCELL_FINS * params.fin_pitch;
    let bitcell_width = BITCELL_POLYS * params.contacted_poly_pitch;

    let mut height = bitcell_height * Decimal::from(params.depth);
    let mut width = bitcell_width * Decimal::from(params.width);

    match params.banks {
        BankCount::B1 => {}
        banks @ (BankCount::B2 | BankCount::B4) => {
            let banks = Decimal::from(banks.count());
            height /= banks;
            width *= banks;
        }
    }

    let cmux = Decimal::from(params.column_mux_factor);
    height /= cmux;
    width *= cmux;

    Dimensions {
        width: width * PERIPHERY_MARGIN * xfactor,
        height: height * PERIPHERY_MARGIN * yfactor,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;
    use crate::config::sram::{PortGroup, Side};

    fn params(banks: BankCount) -> ArrayParams {
        ArrayParams {
            ports: PortSpec {
                read_write: PortGroup {
                    count: 1,
                    side: Side::Left,
                },
                ..Default::default()
            },
            contacted_poly_pitch: dec!(0.054),
            fin_pitch: dec!(0.027),
            column_mux_factor: 1,
            width: 32,
            depth: 1024,
            banks,
        }
    }

    #[test]
    fn single_bank_formula() {
        let dims = macro_dimensions(&params(BankCount::B1));
        // 10 * 0.027 * 1024 * 1.2
        assert_eq!(dims.height, dec!(331.776));
        // 2 * 0.054 * 32 * 1.2
        assert_eq!(dims.width, dec!(4.1472));
    }

    macro_rules! bank_scaling_test {
        ($banks:ident, $n:literal) => {
            paste::paste! {
                #[test]
                fn [<bank_scaling_ $banks:lower>]() {
                    let base = macro_dimensions(&params(BankCount::B1));
                    let banked = macro_dimensions(&params(BankCount::$banks));
                    assert_eq!(banked.height * Decimal::from($n), base.height);
                    assert_eq!(banked.width, base.width * Decimal::from($n));
                }
            }
        };
    }

    bank_scaling_test!(B2, 2);
    bank_scaling_test!(B4, 4);

    #[test]
    fn asymmetric_ports_halve_height_factor() {
        let mut split = params(BankCount::B1);
        split.ports.read = PortGroup {
            count: 1,
            side: Side::Right,
        };
        let mut same = split.clone();
        same.ports.read.side = Side::Left;

        let split = macro_dimensions(&split);
        let same = macro_dimensions(&same);
        assert_eq!(split.width, same.width);
        assert_eq!(split.height * dec!(2), same.height);
    }

    #[test]
    fn column_mux_trades_height_for_width() {
        let base = macro_dimensions(&params(BankCount::B1));
        let mut muxed = params(BankCount::B1);
        muxed.column_mux_factor = 4;
        let muxed = macro_dimensions(&muxed);
        assert_eq!(muxed.height * dec!(4), base.height);
        assert_eq!(muxed.width, base.width * dec!(4));
    }
}
