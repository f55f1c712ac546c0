//! Mouse mounting configuration: which port it lives on, which
//! vintage machine's wiring convention to imitate, and the
//! delta-to-movement-unit scale factor.

use std::str::FromStr;

use crate::psm::PortId;

/// The default speed multiplier applied uniformly to both axes
/// (the original applies it uniformly too; see DESIGN.md).
pub const DEFAULT_SPEED: f64 = 1.3;

/// Wiring convention for the mouse quadrature signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    Amiga,
    AtariSt,
}

impl FromStr for Dialect {
    type Err = crate::error::ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "amiga" => Ok(Dialect::Amiga),
            "atari_st" | "atari-st" | "ataris" | "atari" => Ok(Dialect::AtariSt),
            other => Err(crate::error::ConfigError::InvalidDialect(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MouseConfig {
    pub port: PortId,
    pub dialect: Dialect,
    pub speed: f64,
}

impl Default for MouseConfig {
    fn default() -> Self {
        MouseConfig {
            port: PortId::One,
            dialect: Dialect::default(),
            speed: DEFAULT_SPEED,
        }
    }
}
