//! Exact decimal grid arithmetic.
//!
//! All coordinates are [`Decimal`] micrometres. Rounding is always performed on
//! the decimal representation with round-half-up semantics, so repeated pitch
//! additions never drift off the manufacturing grid.

use rust_decimal::{Decimal, RoundingStrategy};

/// An integer number of manufacturing grid units.
pub type GridUnits = i64;

/// Rounds `value` to the nearest multiple of `grid`, with ties rounding up.
pub fn snap(value: Decimal, grid: Decimal) -> Decimal {
    Decimal::from(to_units(value, grid)) * grid
}

/// Converts `value` to an integer number of `grid` units, with ties rounding up.
pub fn to_units(value: Decimal, grid: Decimal) -> GridUnits {
    integral((value / grid).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
}

/// Converts a number of `grid` units back to micrometres.
#[inline]
pub fn from_units(n: GridUnits, grid: Decimal) -> Decimal {
    Decimal::from(n) * grid
}

/// The smallest number of `grid` units covering `value`.
pub fn ceil_units(value: Decimal, grid: Decimal) -> GridUnits {
    integral((value / grid).ceil())
}

/// Rounds `value` up to the next multiple of `increment`.
pub fn ceil_to(value: Decimal, increment: Decimal) -> Decimal {
    Decimal::from(ceil_units(value, increment)) * increment
}

/// Whether `value` is an exact multiple of `grid`.
pub fn is_on_grid(value: Decimal, grid: Decimal) -> bool {
    (value % grid).is_zero()
}

/// Converts an integer nanometre quantity to micrometres without loss.
#[inline]
pub fn nm(value: i64) -> Decimal {
    Decimal::new(value, 3)
}

/// Formats a length with exactly three fractional digits.
pub fn fmt_um(value: Decimal) -> String {
    format!(
        "{:.3}",
        value.round_dp_with_strategy(3, RoundingStrategy::MidpointAwayFromZero)
    )
}

#[inline]
fn integral(value: Decimal) -> GridUnits {
    value.trunc().mantissa() as GridUnits
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn snap_rounds_half_up() {
        assert_eq!(snap(dec!(0.0025), dec!(0.005)), dec!(0.005));
        assert_eq!(snap(dec!(0.0024), dec!(0.005)), dec!(0.000));
        assert_eq!(snap(dec!(1.2345), dec!(0.001)), dec!(1.235));
        assert_eq!(snap(dec!(10.0), dec!(0.005)), dec!(10.0));
    }

    #[test]
    fn accumulated_pitch_stays_on_grid() {
        let grid = dec!(0.001);
        let pitch = dec!(0.048);
        let mut y = dec!(0.051);
        for _ in 0..1000 {
            y = snap(y + pitch, grid);
        }
        assert_eq!(y, dec!(48.051));
        assert!(is_on_grid(y, grid));
    }

    #[test]
    fn unit_round_trip() {
        let grid = dec!(0.005);
        assert_eq!(to_units(dec!(1.23), grid), 246);
        assert_eq!(from_units(246, grid), dec!(1.230));
        assert_eq!(to_units(dec!(0.0075), grid), 2);
        assert_eq!(ceil_units(dec!(0.012), grid), 3);
        assert_eq!(ceil_units(dec!(0.010), grid), 2);
    }

    #[test]
    fn ceil_to_increment() {
        assert_eq!(ceil_to(dec!(10.0001), dec!(0.001)), dec!(10.001));
        assert_eq!(ceil_to(dec!(10.000), dec!(0.001)), dec!(10.000));
        assert_eq!(ceil_to(dec!(3.01), dec!(0.5)), dec!(3.5));
    }

    #[test]
    fn formats_three_places() {
        assert_eq!(fmt_um(dec!(1.5)), "1.500");
        assert_eq!(fmt_um(dec!(0)), "0.000");
        assert_eq!(fmt_um(dec!(2.0005)), "2.001");
        assert_eq!(fmt_um(nm(48)), "0.048");
    }
}
