//! Error taxonomy: config and device-discovery failures
//! are fatal at startup; I2C and input-read failures are logged and
//! the relevant loop carries on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid I2C bus number {0} - please enter a non-negative integer, eg. 1")]
    InvalidBus(i64),
    #[error("invalid I2C address {0:#04x} - must be between 0x00 and 0xff")]
    InvalidAddress(u16),
    #[error("invalid port assignment {0} - please enter 1 or 2")]
    InvalidPort(u8),
    #[error("mouse port and joystick 1 port cannot both be port {0}")]
    ConflictingPorts(u8),
    #[error("unrecognized mouse emulation dialect {0:?} - please enter \"amiga\" or \"atari_st\"")]
    InvalidDialect(String),
}

#[derive(Debug, Error)]
#[error("no suitable input devices found for emulating either mouse or joysticks")]
pub struct NoInputDevicesError;

#[derive(Debug, Error)]
pub enum I2cError {
    #[error("failed to open I2C bus device {path} (address {address:#04x}): {source}")]
    Open {
        path: String,
        address: u16,
        #[source]
        source: std::io::Error,
    },
    #[error("writing byte {data:#04x} to register {register:#04x} failed: {source}")]
    Write {
        register: u8,
        data: u8,
        #[source]
        source: std::io::Error,
    },
    #[error("reading register {register:#04x} failed: {source}")]
    Read {
        register: u8,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("input device I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Top-level error covering everything that can abort the one-time
/// startup sequence. Nothing inside the engine or input loops ever
/// produces one of these — they log and continue instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    NoInputDevices(#[from] NoInputDevicesError),
    #[error("failed to initialize the I2C target chip: {0}")]
    I2cInit(#[from] I2cError),
}
