// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use embedded_hal::i2c::I2c;

use super::{check_range, ExternalMemory, MemoryError, MemoryKind, SPI_FLASH_WAIT};
use crate::gpio_map::I2cPins;

/// Width of the word address sent after the device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressWidth {
    OneByte,
    TwoBytes,
}

impl AddressWidth {
    /// Bytes addressable before the block-select bits of the device address are used.
    fn block_size(self) -> u32 {
        match self {
            Self::OneByte => 0x100,
            Self::TwoBytes => 0x1_0000,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct I2cEepromConfig {
    /// 7-bit device address.
    pub address: u8,
    pub page_size: u32,
    pub address_width: AddressWidth,
    pub capacity: u32,
    /// Acknowledge polls after a page write before reporting a timeout.
    pub wait_iterations: u32,
}

impl Default for I2cEepromConfig {
    fn default() -> Self {
        Self {
            address: 0x50,
            page_size: 256,
            address_width: AddressWidth::TwoBytes,
            capacity: 0x2_0000,
            wait_iterations: SPI_FLASH_WAIT,
        }
    }
}

/// 24-series I2C EEPROM. Bytes are rewritable, so erase means writing `0xFF`.
pub struct I2cEeprom<I> {
    i2c: I,
    config: I2cEepromConfig,
    pins: Option<I2cPins>,
}

impl<I: I2c> I2cEeprom<I> {
    pub fn new(i2c: I, config: I2cEepromConfig) -> Self {
        Self {
            i2c,
            config,
            pins: None,
        }
    }

    pub fn config(&self) -> &I2cEepromConfig {
        &self.config
    }

    pub fn pins(&self) -> Option<I2cPins> {
        self.pins
    }

    pub fn into_inner(self) -> I {
        self.i2c
    }

    /// Device address and word address bytes for `addr`.
    fn address_of(&self, addr: u32) -> (u8, [u8; 2], usize) {
        let block_select = match self.config.address_width {
            AddressWidth::OneByte => (addr >> 8) as u8,
            AddressWidth::TwoBytes => (addr >> 16) as u8,
        } & 0x07;
        let device = self.config.address | block_select;
        match self.config.address_width {
            AddressWidth::OneByte => (device, [addr as u8, 0], 1),
            AddressWidth::TwoBytes => (device, [(addr >> 8) as u8, addr as u8], 2),
        }
    }

    /// Poll until the device acknowledges again after an internal write cycle.
    fn wait_ready(&mut self, device: u8, word: &[u8]) -> Result<(), MemoryError> {
        for _ in 0..self.config.wait_iterations {
            if self.i2c.write(device, word).is_ok() {
                return Ok(());
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("EEPROM 0x{:02x} did not acknowledge", device);
        Err(MemoryError::Timeout)
    }

    fn write_page(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        let (device, word, word_len) = self.address_of(addr);
        let mut frame = [0u8; 2 + 256];
        let len = word_len + data.len();
        if len > frame.len() {
            return Err(MemoryError::BadConfig);
        }
        frame[..word_len].copy_from_slice(&word[..word_len]);
        frame[word_len..len].copy_from_slice(data);
        self.i2c
            .write(device, &frame[..len])
            .map_err(|_| MemoryError::Bus)?;
        self.wait_ready(device, &word[..word_len])
    }

    /// Split `[addr, addr + len)` at `boundary` and run `f` on each piece.
    fn for_each_chunk<F>(addr: u32, len: usize, boundary: u32, mut f: F) -> Result<(), MemoryError>
    where
        F: FnMut(u32, core::ops::Range<usize>) -> Result<(), MemoryError>,
    {
        let mut offset = 0usize;
        while offset < len {
            let at = addr + offset as u32;
            let room = (boundary - at % boundary) as usize;
            let end = (offset + room).min(len);
            f(at, offset..end)?;
            offset = end;
        }
        Ok(())
    }
}

impl<I: I2c> ExternalMemory for I2cEeprom<I> {
    fn kind(&self) -> MemoryKind {
        MemoryKind::I2cEeprom
    }

    fn configure(&mut self, gpio_map: u32) -> Result<(), MemoryError> {
        let pins = I2cPins::decode(gpio_map);
        let address = u8::try_from(pins.slave_addr)
            .ok()
            .filter(|a| *a <= 0x7F)
            .ok_or(MemoryError::BadConfig)?;
        self.config.address = address;
        self.pins = Some(pins);
        Ok(())
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        check_range(addr, buf.len(), self.config.capacity)?;
        let block = self.config.address_width.block_size();
        let len = buf.len();
        Self::for_each_chunk(addr, len, block, |at, range| {
            let (device, word, word_len) = self.address_of(at);
            self.i2c
                .write_read(device, &word[..word_len], &mut buf[range])
                .map_err(|_| MemoryError::Bus)
        })
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        check_range(addr, data.len(), self.config.capacity)?;
        let page = self.config.page_size;
        Self::for_each_chunk(addr, data.len(), page, |at, range| {
            self.write_page(at, &data[range])
        })
    }

    fn erase_region(&mut self, addr: u32, len: u32) -> Result<(), MemoryError> {
        check_range(addr, len as usize, self.config.capacity)?;
        let blank = [0xFFu8; 256];
        let page = self.config.page_size.min(blank.len() as u32);
        Self::for_each_chunk(addr, len as usize, page, |at, range| {
            self.write_page(at, &blank[..range.len()])
        })
    }

    fn sector_size(&self) -> u32 {
        self.config.page_size
    }
}
