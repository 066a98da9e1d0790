//! Pin placement and pin-driven macro sizing.
//!
//! Pins of each port class are stacked along the left or right macro edge.
//! Placement proceeds in three sequential passes over the same derived
//! quantities:
//!
//! 1. [`PinInventory`] counts pins, bus/control groups, and port instances per side.
//! 2. [`size_macro`] grows the macro height to fit the larger side, then grows
//!    the pin pitch in whole multiples of the minimum pitch to fill that height.
//! 3. [`place_pins`] walks both sides with independent cursors and assigns every
//!    pin a grid-legal rectangle.

use arcstr::ArcStr;
use itertools::Itertools;
use log::debug;
use rust_decimal::Decimal;

use crate::config::sram::{Memory, PortClass, Side};
use crate::config::Process;
use crate::dims::Dimensions;
use crate::error::{RamgenError, Result};
use crate::grid::{ceil_units, from_units, snap, to_units, GridUnits};

pub mod obs;
pub mod power;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Rect {
    pub x0: Decimal,
    pub y0: Decimal,
    pub x1: Decimal,
    pub y1: Decimal,
}

impl Rect {
    pub fn new(x0: Decimal, y0: Decimal, x1: Decimal, y1: Decimal) -> Self {
        Self { x0, y0, x1, y1 }
    }

    #[inline]
    pub fn height(&self) -> Decimal {
        self.y1 - self.y0
    }

    #[inline]
    pub fn width(&self) -> Decimal {
        self.x1 - self.x0
    }

    /// Center of the rectangle along the y axis.
    #[inline]
    pub fn center_y(&self) -> Decimal {
        (self.y0 + self.y1) / Decimal::TWO
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PinDirection {
    Input,
    Output,
}

/// A placed signal pin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinRecord {
    pub name: ArcStr,
    pub direction: PinDirection,
    pub side: Side,
    pub layer: ArcStr,
    pub rect: Rect,
}

/// The final, grid-snapped macro outline.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MacroGeometry {
    pub width: Decimal,
    pub height: Decimal,
}

/// Placement demand on one macro edge.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct SideDemand {
    /// Signal pins.
    pub pins: usize,
    /// Bus and control groups; each is followed by one gap.
    pub groups: usize,
    /// Port instances; each boundary between instances adds one gap.
    pub ports: usize,
}

impl SideDemand {
    /// Placement steps consumed on this side, counting pins and gaps.
    pub fn items(&self) -> usize {
        self.pins + self.groups + self.ports.saturating_sub(1)
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PinInventory {
    pub left: SideDemand,
    pub right: SideDemand,
}

impl PinInventory {
    pub fn new(memory: &Memory) -> Self {
        let mut inventory = Self::default();
        for class in PortClass::ALL {
            let group = memory.ports.group(class);
            let side = inventory.side_mut(group.side);
            side.pins += group.count * memory.pins_per_port(class);
            side.groups += group.count * groups_per_port(class, memory.has_wmask());
            side.ports += group.count;
        }
        inventory
    }

    pub fn side(&self, side: Side) -> &SideDemand {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    fn side_mut(&mut self, side: Side) -> &mut SideDemand {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }

    /// Placement steps required by the busier side.
    pub fn total_items(&self) -> usize {
        self.left.items().max(self.right.items())
    }
}

/// Number of bus groups (followed by a gap) on one port of `class`.
///
/// Address and data buses each form a group, as does the write mask if present.
/// Trailing control pins are not followed by a gap.
pub fn groups_per_port(class: PortClass, has_wmask: bool) -> usize {
    let wmask = usize::from(has_wmask && class.writes());
    match class {
        PortClass::Read => 2,
        PortClass::Write => 2 + wmask,
        PortClass::ReadWrite => 3 + wmask,
    }
}

/// Half of the pin width along the pitch axis, in grid units (at least one).
pub fn half_pin_units(process: &Process) -> GridUnits {
    ceil_units(process.pin_width / Decimal::TWO, process.grid).max(1)
}

/// Height needed to stack `total_items` placement steps at minimum pitch,
/// including the clearance offset and a half-pin endcap at each end.
pub fn required_height(process: &Process, total_items: usize) -> Decimal {
    let nsteps = Decimal::from(total_items.saturating_sub(1));
    let endcap = from_units(half_pin_units(process), process.grid);
    snap(
        Decimal::TWO * process.clearance() + nsteps * process.pin_pitch + Decimal::TWO * endcap,
        process.grid,
    )
}

/// Grows `height` to `required` if the pins do not fit.
pub fn grow_height(height: Decimal, required: Decimal, grid: Decimal) -> Decimal {
    if required > height {
        snap(required, grid)
    } else {
        height
    }
}

/// The largest whole multiple of the minimum pitch whose `total_items - 1`
/// steps still fit between the endcaps of a macro of the given height.
pub fn grow_pitch(process: &Process, height: Decimal, total_items: usize) -> Decimal {
    let min_pitch = process.pin_pitch;
    let nsteps = Decimal::from(total_items.saturating_sub(1));
    if nsteps.is_zero() {
        return min_pitch;
    }
    let endcap = from_units(half_pin_units(process), process.grid);
    let available = height - Decimal::TWO * process.clearance() - Decimal::TWO * endcap;
    let multiple = (available / (nsteps * min_pitch)).floor().max(Decimal::ONE);
    multiple * min_pitch
}

/// Macro outline and pin pitch after pin-driven growth.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Sizing {
    pub geometry: MacroGeometry,
    pub pitch: Decimal,
    pub inventory: PinInventory,
}

/// Snaps the seed outline to the manufacturing grid, then grows its height and
/// the pin pitch to fit every pin.
pub fn size_macro(process: &Process, memory: &Memory, seed: Dimensions) -> Sizing {
    let grid = process.grid;
    let inventory = PinInventory::new(memory);
    let total_items = inventory.total_items();

    let width = snap(seed.width, grid);
    let seed_height = snap(seed.height, grid);
    let required = required_height(process, total_items);
    let height = grow_height(seed_height, required, grid);
    if height != seed_height {
        debug!(
            "{}: growing height from {seed_height} to {height} to fit {total_items} pin steps",
            memory.name
        );
    }

    let pitch = grow_pitch(process, height, total_items);
    debug!(
        "{}: pin pitch {pitch} (minimum {}), {} left / {} right steps",
        memory.name,
        process.pin_pitch,
        inventory.left.items(),
        inventory.right.items()
    );

    Sizing {
        geometry: MacroGeometry { width, height },
        pitch,
        inventory,
    }
}

struct PinPlacer<'a> {
    geometry: MacroGeometry,
    grid: Decimal,
    pitch: Decimal,
    half_width: GridUnits,
    pin_height: Decimal,
    layer: ArcStr,
    memory: &'a Memory,
    pins: Vec<PinRecord>,
}

impl PinPlacer<'_> {
    /// Places one pin centered at `y` and returns the next center on that side.
    fn add_pin(
        &mut self,
        name: String,
        direction: PinDirection,
        y: Decimal,
        side: Side,
    ) -> Result<Decimal> {
        let center = to_units(y, self.grid);
        let y0 = from_units(center - self.half_width, self.grid);
        let y1 = from_units(center + self.half_width, self.grid);

        if y1 > self.geometry.height {
            return Err(RamgenError::Placement {
                pin: name.into(),
                top: y1,
                height: self.geometry.height,
            });
        }

        let rect = match side {
            Side::Left => Rect::new(Decimal::ZERO, y0, self.pin_height, y1),
            Side::Right => Rect::new(
                self.geometry.width - self.pin_height,
                y0,
                self.geometry.width,
                y1,
            ),
        };
        self.pins.push(PinRecord {
            name: name.into(),
            direction,
            side,
            layer: self.layer.clone(),
            rect,
        });

        Ok(from_units(center + to_units(self.pitch, self.grid), self.grid))
    }

    fn add_bus(
        &mut self,
        prefix: &str,
        bus: &str,
        width: usize,
        direction: PinDirection,
        mut y: Decimal,
        side: Side,
    ) -> Result<Decimal> {
        for bit in 0..width {
            y = self.add_pin(format!("{prefix}_{bus}[{bit}]"), direction, y, side)?;
        }
        Ok(self.gap(y))
    }

    #[inline]
    fn gap(&self, y: Decimal) -> Decimal {
        snap(y + self.pitch, self.grid)
    }

    /// Places every pin of one port instance starting at `y`.
    fn add_port(&mut self, class: PortClass, index: usize, mut y: Decimal, side: Side) -> Result<Decimal> {
        let prefix = format!("{class}{index}");
        let memory = self.memory;

        y = self.add_bus(
            &prefix,
            "addr_in",
            memory.addr_width(),
            PinDirection::Input,
            y,
            side,
        )?;
        if class.writes() {
            y = self.add_bus(&prefix, "wd_in", memory.width, PinDirection::Input, y, side)?;
        }
        if class.reads() {
            y = self.add_bus(&prefix, "rd_out", memory.width, PinDirection::Output, y, side)?;
        }
        if class.writes() && memory.has_wmask() {
            y = self.add_bus(
                &prefix,
                "wmask_in",
                memory.wmask_width(),
                PinDirection::Input,
                y,
                side,
            )?;
        }
        if class.writes() {
            y = self.add_pin(format!("{prefix}_we_in"), PinDirection::Input, y, side)?;
        }
        y = self.add_pin(format!("{prefix}_ce_in"), PinDirection::Input, y, side)?;
        y = self.add_pin(format!("{prefix}_clk"), PinDirection::Input, y, side)?;
        Ok(y)
    }
}

/// Assigns a rectangle to every signal pin, in emission order.
///
/// Left and right edges advance independent cursors starting at the clearance
/// offset plus a half-pin endcap.
pub fn place_pins(
    process: &Process,
    memory: &Memory,
    geometry: MacroGeometry,
    pitch: Decimal,
) -> Result<Vec<PinRecord>> {
    let grid = process.grid;
    let half_width = half_pin_units(process);
    let start = from_units(to_units(snap(process.clearance(), grid), grid) + half_width, grid);

    let mut placer = PinPlacer {
        geometry,
        grid,
        pitch,
        half_width,
        pin_height: snap(process.pin_height, grid),
        layer: process.signal_layer().into(),
        memory,
        pins: Vec::new(),
    };

    let mut left = start;
    let mut right = start;

    for class in PortClass::ALL {
        let group = memory.ports.group(class);
        for index in 0..group.count {
            let cursor = match group.side {
                Side::Left => &mut left,
                Side::Right => &mut right,
            };
            let end = placer.add_port(class, index, *cursor, group.side)?;
            *cursor = snap(end + pitch, grid);
        }
    }

    Ok(placer.pins)
}

/// Sized macro outline with every signal pin placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinLayout {
    pub geometry: MacroGeometry,
    pub pitch: Decimal,
    pub inventory: PinInventory,
    pub pins: Vec<PinRecord>,
}

impl PinLayout {
    pub fn pins_on(&self, side: Side) -> impl Iterator<Item = &PinRecord> {
        self.pins.iter().filter(move |pin| pin.side == side)
    }
}

/// Sizes the macro from its seed outline and places every signal pin.
pub fn layout_pins(process: &Process, memory: &Memory, seed: Dimensions) -> Result<PinLayout> {
    let Sizing {
        geometry,
        pitch,
        inventory,
    } = size_macro(process, memory, seed);
    let pins = place_pins(process, memory, geometry, pitch)?;
    debug!(
        "{}: placed pins [{}]",
        memory.name,
        [Side::Left, Side::Right]
            .iter()
            .map(|&side| format!(
                "{side:?}: {}",
                pins.iter().filter(|pin| pin.side == side).count()
            ))
            .join(", ")
    );
    Ok(PinLayout {
        geometry,
        pitch,
        inventory,
        pins,
    })
}
