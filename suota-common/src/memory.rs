// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! External memory holding the product header and both image banks.
//!
//! Three backends implement [`ExternalMemory`]:
//! - [`SpiFlash`]: 25-series SPI NOR flash over an `embedded_hal` `SpiDevice`
//! - [`I2cEeprom`]: 24-series I2C EEPROM over an `embedded_hal` `I2c` bus
//! - [`RamMemory`]: a byte slice with NOR or EEPROM write semantics, for host tools and tests
mod i2c_eeprom;
mod ram;
mod spi_flash;

use core::fmt;

use embedded_hal::i2c::I2c;
use embedded_hal::spi::SpiDevice;

pub use i2c_eeprom::{AddressWidth, I2cEeprom, I2cEepromConfig};
pub use ram::RamMemory;
pub use spi_flash::{SpiFlash, SpiFlashConfig};

/// Poll budget for busy flash/EEPROM operations.
pub const SPI_FLASH_WAIT: u32 = 2_000_000;

/// Kind of device behind an [`ExternalMemory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryKind {
    SpiFlash,
    I2cEeprom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MemoryError {
    /// The bus transaction failed.
    Bus,
    /// The device stayed busy for the whole poll budget.
    Timeout,
    /// Access outside the device capacity.
    OutOfRange,
    /// The GPIO map does not describe a usable device.
    BadConfig,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bus => f.write_str("bus error"),
            Self::Timeout => f.write_str("device busy timeout"),
            Self::OutOfRange => f.write_str("address out of range"),
            Self::BadConfig => f.write_str("invalid device configuration"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MemoryError {}

/// Byte-addressable external memory.
pub trait ExternalMemory {
    fn kind(&self) -> MemoryKind;

    /// Apply the peer-supplied GPIO map and wake the device.
    fn configure(&mut self, _gpio_map: u32) -> Result<(), MemoryError> {
        Ok(())
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError>;

    /// Program `data` at `addr`. Flash backends expect the range to be erased.
    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError>;

    /// Erase `len` bytes at `addr`. Flash backends require sector alignment.
    fn erase_region(&mut self, addr: u32, len: u32) -> Result<(), MemoryError>;

    /// Erase granularity in bytes.
    fn sector_size(&self) -> u32;

    /// Hand the bus back, e.g. before sleep.
    fn release(&mut self) {}
}

impl<M: ExternalMemory + ?Sized> ExternalMemory for &mut M {
    fn kind(&self) -> MemoryKind {
        (**self).kind()
    }

    fn configure(&mut self, gpio_map: u32) -> Result<(), MemoryError> {
        (**self).configure(gpio_map)
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        (**self).read(addr, buf)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        (**self).write(addr, data)
    }

    fn erase_region(&mut self, addr: u32, len: u32) -> Result<(), MemoryError> {
        (**self).erase_region(addr, len)
    }

    fn sector_size(&self) -> u32 {
        (**self).sector_size()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

/// Either of the two hardware backends, chosen when the board is brought up.
pub enum AnyMemory<S, I> {
    SpiFlash(SpiFlash<S>),
    I2cEeprom(I2cEeprom<I>),
}

impl<S: SpiDevice, I: I2c> ExternalMemory for AnyMemory<S, I> {
    fn kind(&self) -> MemoryKind {
        match self {
            Self::SpiFlash(m) => m.kind(),
            Self::I2cEeprom(m) => m.kind(),
        }
    }

    fn configure(&mut self, gpio_map: u32) -> Result<(), MemoryError> {
        match self {
            Self::SpiFlash(m) => m.configure(gpio_map),
            Self::I2cEeprom(m) => m.configure(gpio_map),
        }
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        match self {
            Self::SpiFlash(m) => m.read(addr, buf),
            Self::I2cEeprom(m) => m.read(addr, buf),
        }
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        match self {
            Self::SpiFlash(m) => m.write(addr, data),
            Self::I2cEeprom(m) => m.write(addr, data),
        }
    }

    fn erase_region(&mut self, addr: u32, len: u32) -> Result<(), MemoryError> {
        match self {
            Self::SpiFlash(m) => m.erase_region(addr, len),
            Self::I2cEeprom(m) => m.erase_region(addr, len),
        }
    }

    fn sector_size(&self) -> u32 {
        match self {
            Self::SpiFlash(m) => m.sector_size(),
            Self::I2cEeprom(m) => m.sector_size(),
        }
    }

    fn release(&mut self) {
        match self {
            Self::SpiFlash(m) => m.release(),
            Self::I2cEeprom(m) => m.release(),
        }
    }
}

/// Check that `[addr, addr + len)` lies inside `capacity`.
pub(crate) fn check_range(addr: u32, len: usize, capacity: u32) -> Result<(), MemoryError> {
    let len = u32::try_from(len).map_err(|_| MemoryError::OutOfRange)?;
    match addr.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(MemoryError::OutOfRange),
    }
}
