//! Command-line configuration and the validation pass that turns raw
//! flags into a `PortStateModel`-ready shape before anything else runs.

use clap::Parser;

use crate::error::ConfigError;
use crate::psm::mouse_config::{Dialect, MouseConfig, DEFAULT_SPEED};
use crate::psm::PortId;

#[derive(Debug, Parser)]
#[command(name = "joyemud", about = "Emulates two 9-pin D-sub joystick/mouse ports over I2C")]
pub struct Args {
    /// I2C bus number, as in /dev/i2c-N.
    #[arg(long, default_value_t = 1)]
    pub i2c_bus: u32,

    /// I2C address of the MCP23017 target chip.
    #[arg(long, default_value_t = 0x20, value_parser = parse_hex_or_decimal)]
    pub i2c_address: u16,

    /// Which D-sub port the mouse is wired to.
    #[arg(long, default_value_t = 1)]
    pub mouse_port: u8,

    /// Which D-sub port the first discovered joystick is wired to.
    /// The second joystick, if any, takes whichever port is left.
    #[arg(long, default_value_t = 2)]
    pub joystick1_port: u8,

    /// Wiring convention for the mouse quadrature signal.
    #[arg(long, default_value = "amiga")]
    pub dialect: String,

    /// Movement scale factor applied to both mouse axes.
    #[arg(long, default_value_t = DEFAULT_SPEED)]
    pub speed: f64,

    /// Pin the mouse to a specific /dev/input/eventN instead of
    /// auto-detecting it.
    #[arg(long)]
    pub mouse_device: Option<u32>,

    /// Pin the first joystick to a specific /dev/input/eventN.
    #[arg(long)]
    pub joystick1_device: Option<u32>,

    /// Pin the second joystick to a specific /dev/input/eventN.
    #[arg(long)]
    pub joystick2_device: Option<u32>,

    /// Increase log verbosity; repeatable (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_hex_or_decimal(s: &str) -> Result<u16, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u16::from_str_radix(hex, 16).map_err(|e| e.to_string())
    } else {
        s.parse::<u16>().map_err(|e| e.to_string())
    }
}

/// Validated, ready-to-use configuration. Distinct from `Args` so that
/// the fallible port-number-to-`PortId` conversion happens exactly
/// once, at startup, rather than on every later read.
pub struct Config {
    pub i2c_bus: u32,
    pub i2c_address: u16,
    pub mouse: MouseConfig,
    pub joystick1_port: PortId,
    pub mouse_device: Option<u32>,
    pub joystick1_device: Option<u32>,
    pub joystick2_device: Option<u32>,
    pub verbosity: u8,
}

fn port_id(n: u8) -> Result<PortId, ConfigError> {
    match n {
        1 => Ok(PortId::One),
        2 => Ok(PortId::Two),
        other => Err(ConfigError::InvalidPort(other)),
    }
}

impl Config {
    pub fn from_args(args: Args) -> Result<Self, ConfigError> {
        if args.i2c_address > 0xFF {
            return Err(ConfigError::InvalidAddress(args.i2c_address));
        }
        let mouse_port = port_id(args.mouse_port)?;
        let joystick1_port = port_id(args.joystick1_port)?;
        if mouse_port == joystick1_port {
            return Err(ConfigError::ConflictingPorts(args.mouse_port));
        }
        let dialect: Dialect = args.dialect.parse()?;

        Ok(Config {
            i2c_bus: args.i2c_bus,
            i2c_address: args.i2c_address,
            mouse: MouseConfig {
                port: mouse_port,
                dialect,
                speed: args.speed,
            },
            joystick1_port,
            mouse_device: args.mouse_device,
            joystick1_device: args.joystick1_device,
            joystick2_device: args.joystick2_device,
            verbosity: args.verbose,
        })
    }
}
