use std::fmt::Display;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{RamgenError, Result};

/// The edge of the macro on which a port class places its pins.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Left,
    Right,
}

impl Side {
    fn parse(param: &'static str, s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            other => Err(RamgenError::config(
                param,
                format!("port side must be `left` or `right`, got `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum PortClass {
    Read,
    Write,
    ReadWrite,
}

impl PortClass {
    /// Port classes in pin emission order.
    pub const ALL: [PortClass; 3] = [Self::Read, Self::Write, Self::ReadWrite];

    /// The prefix of every pin name belonging to this class.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Read => "r",
            Self::Write => "w",
            Self::ReadWrite => "rw",
        }
    }

    #[inline]
    pub fn reads(&self) -> bool {
        matches!(self, Self::Read | Self::ReadWrite)
    }

    #[inline]
    pub fn writes(&self) -> bool {
        matches!(self, Self::Write | Self::ReadWrite)
    }
}

impl Display for PortClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.prefix())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BankCount {
    B1 = 1,
    B2 = 2,
    B4 = 4,
}

impl BankCount {
    #[inline]
    pub fn count(&self) -> u32 {
        *self as u32
    }
}

impl TryFrom<usize> for BankCount {
    type Error = RamgenError;

    fn try_from(value: usize) -> Result<Self> {
        match value {
            1 => Ok(Self::B1),
            2 => Ok(Self::B2),
            4 => Ok(Self::B4),
            other => Err(RamgenError::config(
                "banks",
                format!("unsupported number of banks: {other} (must be 1, 2, or 4)"),
            )),
        }
    }
}

/// A port class entry: either a bare count or `[count, side]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortEntry {
    Count(usize),
    Tagged(usize, String),
    List((usize,)),
}

impl Default for PortEntry {
    fn default() -> Self {
        Self::Count(0)
    }
}

/// A macro description as it appears in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryConfig {
    pub name: ArcStr,
    pub width: usize,
    pub depth: usize,
    pub banks: usize,
    #[serde(default)]
    pub r: PortEntry,
    #[serde(default)]
    pub w: PortEntry,
    #[serde(default)]
    pub rw: PortEntry,
    #[serde(default)]
    pub write_granularity: Option<usize>,
    #[serde(default = "default_cache_type", rename = "type")]
    pub cache_type: String,
    #[serde(default = "default_write_mode")]
    pub write_mode: String,
}

fn default_cache_type() -> String {
    "cache".to_string()
}

fn default_write_mode() -> String {
    "write_first".to_string()
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PortGroup {
    pub count: usize,
    pub side: Side,
}

/// Port counts and side affinity of one macro.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PortSpec {
    pub read: PortGroup,
    pub write: PortGroup,
    pub read_write: PortGroup,
}

impl PortSpec {
    pub fn group(&self, class: PortClass) -> PortGroup {
        match class {
            PortClass::Read => self.read,
            PortClass::Write => self.write,
            PortClass::ReadWrite => self.read_write,
        }
    }

    pub fn total(&self) -> usize {
        self.read.count + self.write.count + self.read_write.count
    }

    /// Whether any port class is placed on the right edge.
    pub fn is_asymmetric(&self) -> bool {
        PortClass::ALL
            .iter()
            .any(|&class| self.group(class).side == Side::Right)
    }
}

/// A validated macro description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Memory {
    pub name: ArcStr,
    pub width: usize,
    pub depth: usize,
    pub banks: BankCount,
    pub ports: PortSpec,
    /// Bits per write-mask enable, if the macro has a write mask.
    pub write_granularity: Option<usize>,
    pub cache_type: String,
    pub write_mode: String,
}

impl PortEntry {
    fn validate(&self, param: &'static str) -> Result<PortGroup> {
        Ok(match self {
            Self::Count(count) | Self::List((count,)) => PortGroup {
                count: *count,
                side: Side::Left,
            },
            Self::Tagged(count, side) => PortGroup {
                count: *count,
                side: Side::parse(param, side)?,
            },
        })
    }
}

impl MemoryConfig {
    pub fn validate(&self) -> Result<Memory> {
        if self.width == 0 {
            return Err(RamgenError::config("width", "word width must be positive"));
        }
        if self.depth == 0 {
            return Err(RamgenError::config("depth", "depth must be positive"));
        }
        let banks = BankCount::try_from(self.banks)?;
        let ports = PortSpec {
            read: self.r.validate("r")?,
            write: self.w.validate("w")?,
            read_write: self.rw.validate("rw")?,
        };
        if ports.total() == 0 {
            return Err(RamgenError::config("ports", "at least one port required"));
        }
        if let Some(granularity) = self.write_granularity {
            if granularity == 0 || self.width % granularity != 0 {
                return Err(RamgenError::config(
                    "write_granularity",
                    format!(
                        "width in bits ({}) is not divisible by write granularity ({granularity})",
                        self.width
                    ),
                ));
            }
        }

        Ok(Memory {
            name: self.name.clone(),
            width: self.width,
            depth: self.depth,
            banks,
            ports,
            write_granularity: self.write_granularity,
            cache_type: self.cache_type.clone(),
            write_mode: self.write_mode.clone(),
        })
    }
}

impl Memory {
    /// Number of address bits, `ceil(log2(depth))`.
    #[inline]
    pub fn addr_width(&self) -> usize {
        self.depth.next_power_of_two().trailing_zeros() as usize
    }

    #[inline]
    pub fn has_wmask(&self) -> bool {
        self.write_granularity.is_some()
    }

    /// Number of write-mask bits per writing port; zero without a write mask.
    #[inline]
    pub fn wmask_width(&self) -> usize {
        self.write_granularity
            .map(|granularity| self.width / granularity)
            .unwrap_or(0)
    }

    #[inline]
    pub fn width_in_bytes(&self) -> usize {
        self.width.div_ceil(8)
    }

    #[inline]
    pub fn total_size_bytes(&self) -> usize {
        self.width_in_bytes() * self.depth
    }

    /// Number of signal pins on one port of the given class.
    pub fn pins_per_port(&self, class: PortClass) -> usize {
        let addr = self.addr_width();
        match class {
            PortClass::Read => addr + self.width + 2,
            PortClass::Write => addr + self.width + 3 + self.wmask_width(),
            PortClass::ReadWrite => addr + 2 * self.width + 3 + self.wmask_width(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn memory_config(name: &str) -> MemoryConfig {
        MemoryConfig {
            name: ArcStr::from(name),
            width: 32,
            depth: 1024,
            banks: 1,
            r: PortEntry::Count(0),
            w: PortEntry::Count(0),
            rw: PortEntry::Count(1),
            write_granularity: None,
            cache_type: default_cache_type(),
            write_mode: default_write_mode(),
        }
    }

    #[test]
    fn address_width_is_ceil_log2() {
        let mut config = memory_config("addr");
        config.depth = 256;
        assert_eq!(config.validate().unwrap().addr_width(), 8);
        config.depth = 257;
        assert_eq!(config.validate().unwrap().addr_width(), 9);
        config.depth = 1;
        assert_eq!(config.validate().unwrap().addr_width(), 0);
    }

    #[test]
    fn pin_counts_per_port_class() {
        let mut config = memory_config("pins");
        let memory = config.validate().unwrap();
        assert_eq!(memory.pins_per_port(PortClass::ReadWrite), 77);
        assert_eq!(memory.pins_per_port(PortClass::Read), 44);
        assert_eq!(memory.pins_per_port(PortClass::Write), 45);

        config.write_granularity = Some(8);
        let memory = config.validate().unwrap();
        assert_eq!(memory.wmask_width(), 4);
        assert_eq!(memory.pins_per_port(PortClass::ReadWrite), 81);
        assert_eq!(memory.pins_per_port(PortClass::Write), 49);
        assert_eq!(memory.pins_per_port(PortClass::Read), 44);
    }

    #[test]
    fn rejects_three_banks() {
        let mut config = memory_config("banks");
        config.banks = 3;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RamgenError::Config { param: "banks", .. }));
    }

    #[test]
    fn rejects_zero_ports() {
        let mut config = memory_config("noports");
        config.rw = PortEntry::Count(0);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RamgenError::Config { param: "ports", .. }));
    }

    #[test]
    fn rejects_indivisible_write_granularity() {
        let mut config = memory_config("wmask");
        config.write_granularity = Some(5);
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            RamgenError::Config {
                param: "write_granularity",
                ..
            }
        ));
    }

    #[test]
    fn parses_port_entries() {
        let config: MemoryConfig = serde_json::from_str(
            r#"{"name": "m", "width": 8, "depth": 16, "banks": 2,
                "r": [1, "right"], "w": 2, "rw": [1]}"#,
        )
        .unwrap();
        let memory = config.validate().unwrap();
        assert_eq!(
            memory.ports.read,
            PortGroup {
                count: 1,
                side: Side::Right
            }
        );
        assert_eq!(memory.ports.write.count, 2);
        assert_eq!(memory.ports.read_write.count, 1);
        assert_eq!(memory.ports.read_write.side, Side::Left);
        assert!(memory.ports.is_asymmetric());
        assert_eq!(memory.banks, BankCount::B2);
        assert_eq!(memory.width_in_bytes(), 1);
        assert_eq!(memory.total_size_bytes(), 16);
    }

    #[test]
    fn rejects_unknown_side() {
        let mut config = memory_config("side");
        config.rw = PortEntry::Tagged(1, "top".to_string());
        let err = config.validate().unwrap_err();
        assert!(matches!(err, RamgenError::Config { param: "rw", .. }));
    }
}
