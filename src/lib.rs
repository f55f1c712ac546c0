//! Joystick/mouse port emulator: translates modern input devices into
//! the electrical image of two 9-pin D-sub ports, driven out over I2C
//! to an MCP23017 GPIO expander.

pub mod config;
pub mod engine;
pub mod error;
pub mod i2c;
pub mod input_source;
pub mod input_translator;
pub mod logging;
pub mod psm;
