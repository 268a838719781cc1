// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use embedded_hal::spi::{Operation, SpiDevice};

use super::{check_range, ExternalMemory, MemoryError, MemoryKind, SPI_FLASH_WAIT};
use crate::gpio_map::SpiPins;

const CMD_WRITE_ENABLE: u8 = 0x06;
const CMD_READ_STATUS: u8 = 0x05;
const CMD_READ_DATA: u8 = 0x03;
const CMD_PAGE_PROGRAM: u8 = 0x02;
const CMD_SECTOR_ERASE: u8 = 0x20;
const CMD_JEDEC_ID: u8 = 0x9F;
const CMD_RELEASE_POWER_DOWN: u8 = 0xAB;
const CMD_POWER_DOWN: u8 = 0xB9;

const STATUS_BUSY: u8 = 0x01;

#[derive(Debug, Clone, Copy)]
pub struct SpiFlashConfig {
    pub page_size: u32,
    pub sector_size: u32,
    pub capacity: u32,
    /// Status polls before a busy device is reported as timed out.
    pub wait_iterations: u32,
}

impl Default for SpiFlashConfig {
    fn default() -> Self {
        Self {
            page_size: 256,
            sector_size: 4096,
            capacity: 0x4_0000,
            wait_iterations: SPI_FLASH_WAIT,
        }
    }
}

/// 25-series SPI NOR flash.
pub struct SpiFlash<S> {
    spi: S,
    config: SpiFlashConfig,
    pins: Option<SpiPins>,
    jedec_id: Option<[u8; 3]>,
}

impl<S: SpiDevice> SpiFlash<S> {
    pub fn new(spi: S, config: SpiFlashConfig) -> Self {
        Self {
            spi,
            config,
            pins: None,
            jedec_id: None,
        }
    }

    pub fn config(&self) -> &SpiFlashConfig {
        &self.config
    }

    /// Pads from the last GPIO map, `None` until configured.
    pub fn pins(&self) -> Option<SpiPins> {
        self.pins
    }

    pub fn jedec_id(&self) -> Option<[u8; 3]> {
        self.jedec_id
    }

    pub fn into_inner(self) -> S {
        self.spi
    }

    fn command(&mut self, cmd: u8) -> Result<(), MemoryError> {
        self.spi.write(&[cmd]).map_err(|_| MemoryError::Bus)
    }

    pub fn read_jedec_id(&mut self) -> Result<[u8; 3], MemoryError> {
        let mut id = [0u8; 3];
        self.spi
            .transaction(&mut [Operation::Write(&[CMD_JEDEC_ID]), Operation::Read(&mut id)])
            .map_err(|_| MemoryError::Bus)?;
        Ok(id)
    }

    fn read_status(&mut self) -> Result<u8, MemoryError> {
        let mut status = [0u8; 1];
        self.spi
            .transaction(&mut [
                Operation::Write(&[CMD_READ_STATUS]),
                Operation::Read(&mut status),
            ])
            .map_err(|_| MemoryError::Bus)?;
        Ok(status[0])
    }

    fn wait_ready(&mut self) -> Result<(), MemoryError> {
        for _ in 0..self.config.wait_iterations {
            if self.read_status()? & STATUS_BUSY == 0 {
                return Ok(());
            }
        }
        #[cfg(feature = "defmt")]
        defmt::warn!("SPI flash busy timeout");
        Err(MemoryError::Timeout)
    }

    fn program_page(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        self.wait_ready()?;
        self.command(CMD_WRITE_ENABLE)?;
        let [_, a2, a1, a0] = addr.to_be_bytes();
        self.spi
            .transaction(&mut [
                Operation::Write(&[CMD_PAGE_PROGRAM, a2, a1, a0]),
                Operation::Write(data),
            ])
            .map_err(|_| MemoryError::Bus)?;
        self.wait_ready()
    }

    fn erase_sector(&mut self, addr: u32) -> Result<(), MemoryError> {
        self.wait_ready()?;
        self.command(CMD_WRITE_ENABLE)?;
        let [_, a2, a1, a0] = addr.to_be_bytes();
        self.spi
            .write(&[CMD_SECTOR_ERASE, a2, a1, a0])
            .map_err(|_| MemoryError::Bus)?;
        self.wait_ready()
    }
}

impl<S: SpiDevice> ExternalMemory for SpiFlash<S> {
    fn kind(&self) -> MemoryKind {
        MemoryKind::SpiFlash
    }

    fn configure(&mut self, gpio_map: u32) -> Result<(), MemoryError> {
        let pins = SpiPins::decode(gpio_map);
        if self.pins == Some(pins) && self.jedec_id.is_some() {
            return Ok(());
        }
        self.command(CMD_RELEASE_POWER_DOWN)?;
        let id = self.read_jedec_id()?;
        if id == [0xFF; 3] || id == [0x00; 3] {
            return Err(MemoryError::BadConfig);
        }
        #[cfg(feature = "defmt")]
        defmt::debug!("SPI flash {:?} on {:?}", id, pins);
        self.pins = Some(pins);
        self.jedec_id = Some(id);
        Ok(())
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        check_range(addr, buf.len(), self.config.capacity)?;
        if buf.is_empty() {
            return Ok(());
        }
        self.wait_ready()?;
        let [_, a2, a1, a0] = addr.to_be_bytes();
        self.spi
            .transaction(&mut [
                Operation::Write(&[CMD_READ_DATA, a2, a1, a0]),
                Operation::Read(buf),
            ])
            .map_err(|_| MemoryError::Bus)
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        check_range(addr, data.len(), self.config.capacity)?;
        let page = self.config.page_size;
        let mut addr = addr;
        let mut rest = data;
        while !rest.is_empty() {
            // A page program wraps at the page boundary, so never cross it.
            let room = (page - addr % page) as usize;
            let (chunk, tail) = rest.split_at(room.min(rest.len()));
            self.program_page(addr, chunk)?;
            addr += chunk.len() as u32;
            rest = tail;
        }
        Ok(())
    }

    fn erase_region(&mut self, addr: u32, len: u32) -> Result<(), MemoryError> {
        let sector = self.config.sector_size;
        if addr % sector != 0 {
            return Err(MemoryError::OutOfRange);
        }
        check_range(addr, len as usize, self.config.capacity)?;
        let mut sector_addr = addr;
        while sector_addr < addr + len {
            self.erase_sector(sector_addr)?;
            sector_addr += sector;
        }
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        self.config.sector_size
    }

    fn release(&mut self) {
        // Errors are ignored, configure() wakes the device again.
        let _ = self.command(CMD_POWER_DOWN);
        self.jedec_id = None;
    }
}
