//! I2C sink: the contract this crate draws around the GPIO expander,
//! plus a real `i2cdev`-backed implementation and register constants
//! for the MCP23017 target chip this project was built against.

use crate::error::I2cError;

/// GPIO bank carrying a port's pin state: bank 0 = port 1, bank 1 = port 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bank {
    A,
    B,
}

impl Bank {
    fn offset(self) -> u8 {
        match self {
            Bank::A => 0x00,
            Bank::B => 0x01,
        }
    }
}

/// MCP23017 register base addresses (bank=0 layout, i.e. A/B
/// registers interleaved by +1 rather than split into two pages).
pub mod mcp23017 {
    pub const IODIR: u8 = 0x00;
    pub const GPINTEN: u8 = 0x04;
    pub const GPPU: u8 = 0x0C;
    pub const GPIO: u8 = 0x12;
    pub const IOCON: u8 = 0x05;
}

/// A byte-register read/write sink. Implementors may be
/// a real I2C bus, or (in tests) an in-memory fake.
pub trait I2cSink {
    fn write_byte(&mut self, register: u8, data: u8) -> Result<(), I2cError>;
    /// A read failure is non-fatal and returns a sentinel
    /// (0) rather than propagating, mirroring the original's
    /// `read_i2c` contract; callers that need to distinguish a real
    /// zero from a failed read should use `read_byte` instead.
    fn read_byte_or_sentinel(&mut self, register: u8) -> u8 {
        self.read_byte(register).unwrap_or(0)
    }
    fn read_byte(&mut self, register: u8) -> Result<u8, I2cError>;
}

/// Runs the MCP23017 init sequence this chip requires: BANK=0 layout,
/// both GPIO banks all-output, interrupt-on-change disabled everywhere.
pub fn initialize_mcp23017(sink: &mut dyn I2cSink) -> Result<(), I2cError> {
    // Reset IOCON to BANK=0. If it was already 0 this lands on
    // GPINTENB instead and has no effect, same as the original.
    sink.write_byte(mcp23017::IOCON, 0x00)?;

    sink.write_byte(mcp23017::IODIR + Bank::A.offset(), 0x00)?;
    sink.write_byte(mcp23017::IODIR + Bank::B.offset(), 0x00)?;

    sink.write_byte(mcp23017::GPINTEN + Bank::A.offset(), 0x00)?;
    sink.write_byte(mcp23017::GPINTEN + Bank::B.offset(), 0x00)?;

    Ok(())
}

pub fn write_gpio(sink: &mut dyn I2cSink, bank: Bank, data: u8) -> Result<(), I2cError> {
    sink.write_byte(mcp23017::GPIO + bank.offset(), data)
}

/// A real I2C bus on Linux, via `/dev/i2c-N` and SMBus register I/O.
pub struct LinuxI2cSink {
    device: i2cdev::linux::LinuxI2CDevice,
}

impl LinuxI2cSink {
    pub fn open(bus: u32, address: u16) -> Result<Self, I2cError> {
        let path = format!("/dev/i2c-{bus}");
        let device = i2cdev::linux::LinuxI2CDevice::new(&path, address)
            .map_err(|source| I2cError::Open {
                path,
                address,
                source: to_io_error(source),
            })?;
        Ok(LinuxI2cSink { device })
    }
}

fn to_io_error(err: i2cdev::linux::LinuxI2CError) -> std::io::Error {
    match err {
        i2cdev::linux::LinuxI2CError::Io(e) => e,
        i2cdev::linux::LinuxI2CError::Nix(e) => std::io::Error::from_raw_os_error(e as i32),
    }
}

impl I2cSink for LinuxI2cSink {
    fn write_byte(&mut self, register: u8, data: u8) -> Result<(), I2cError> {
        use embedded_hal::i2c::I2c;
        self.device
            .write(&[register, data])
            .map_err(|source| I2cError::Write {
                register,
                data,
                source: to_io_error(source),
            })
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, I2cError> {
        use embedded_hal::i2c::I2c;
        let mut buf = [0u8; 1];
        self.device
            .write_read(&[register], &mut buf)
            .map_err(|source| I2cError::Read {
                register,
                source: to_io_error(source),
            })?;
        Ok(buf[0])
    }
}

/// In-memory stand-in for tests: records every byte ever written, per
/// register, and returns the last-written value (or 0) on read.
#[derive(Debug, Default)]
pub struct MockI2cSink {
    pub registers: std::collections::HashMap<u8, u8>,
    pub writes: Vec<(u8, u8)>,
    pub fail_next_write: bool,
}

impl I2cSink for MockI2cSink {
    fn write_byte(&mut self, register: u8, data: u8) -> Result<(), I2cError> {
        if self.fail_next_write {
            self.fail_next_write = false;
            return Err(I2cError::Write {
                register,
                data,
                source: std::io::Error::from(std::io::ErrorKind::Other),
            });
        }
        self.registers.insert(register, data);
        self.writes.push((register, data));
        Ok(())
    }

    fn read_byte(&mut self, register: u8) -> Result<u8, I2cError> {
        Ok(*self.registers.get(&register).unwrap_or(&0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sequence_writes_expected_registers() {
        let mut sink = MockI2cSink::default();
        initialize_mcp23017(&mut sink).unwrap();
        assert_eq!(sink.writes, vec![
            (mcp23017::IOCON, 0x00),
            (mcp23017::IODIR, 0x00),
            (mcp23017::IODIR + 1, 0x00),
            (mcp23017::GPINTEN, 0x00),
            (mcp23017::GPINTEN + 1, 0x00),
        ]);
    }

    #[test]
    fn write_gpio_targets_correct_bank() {
        let mut sink = MockI2cSink::default();
        write_gpio(&mut sink, Bank::A, 0x37).unwrap();
        write_gpio(&mut sink, Bank::B, 0x2F).unwrap();
        assert_eq!(sink.registers[&mcp23017::GPIO], 0x37);
        assert_eq!(sink.registers[&(mcp23017::GPIO + 1)], 0x2F);
    }

    #[test]
    fn failed_write_surfaces_as_error() {
        let mut sink = MockI2cSink {
            fail_next_write: true,
            ..Default::default()
        };
        assert!(write_gpio(&mut sink, Bank::A, 0x00).is_err());
    }
}
