// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use super::{check_range, ExternalMemory, MemoryError, MemoryKind};

/// External memory image held in a byte slice.
///
/// With [`MemoryKind::SpiFlash`] it behaves like NOR flash: programming can
/// only clear bits and erase works on whole sectors. With
/// [`MemoryKind::I2cEeprom`] writes overwrite bytes directly.
pub struct RamMemory<'a> {
    data: &'a mut [u8],
    kind: MemoryKind,
    sector_size: u32,
    bytes_written: usize,
    sectors_erased: usize,
}

impl<'a> RamMemory<'a> {
    pub fn new(data: &'a mut [u8], kind: MemoryKind, sector_size: u32) -> Self {
        Self {
            data,
            kind,
            sector_size,
            bytes_written: 0,
            sectors_erased: 0,
        }
    }

    pub fn spi_flash(data: &'a mut [u8]) -> Self {
        Self::new(data, MemoryKind::SpiFlash, 4096)
    }

    pub fn i2c_eeprom(data: &'a mut [u8]) -> Self {
        Self::new(data, MemoryKind::I2cEeprom, 256)
    }

    pub fn as_slice(&self) -> &[u8] {
        self.data
    }

    /// Total bytes programmed since creation.
    pub fn bytes_written(&self) -> usize {
        self.bytes_written
    }

    pub fn sectors_erased(&self) -> usize {
        self.sectors_erased
    }

    fn capacity(&self) -> u32 {
        u32::try_from(self.data.len()).unwrap_or(u32::MAX)
    }
}

impl ExternalMemory for RamMemory<'_> {
    fn kind(&self) -> MemoryKind {
        self.kind
    }

    fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), MemoryError> {
        check_range(addr, buf.len(), self.capacity())?;
        let start = addr as usize;
        buf.copy_from_slice(&self.data[start..start + buf.len()]);
        Ok(())
    }

    fn write(&mut self, addr: u32, data: &[u8]) -> Result<(), MemoryError> {
        check_range(addr, data.len(), self.capacity())?;
        let start = addr as usize;
        let target = &mut self.data[start..start + data.len()];
        match self.kind {
            MemoryKind::SpiFlash => target
                .iter_mut()
                .zip(data)
                .for_each(|(cell, byte)| *cell &= byte),
            MemoryKind::I2cEeprom => target.copy_from_slice(data),
        }
        self.bytes_written += data.len();
        Ok(())
    }

    fn erase_region(&mut self, addr: u32, len: u32) -> Result<(), MemoryError> {
        let sector = self.sector_size;
        if self.kind == MemoryKind::SpiFlash && addr % sector != 0 {
            return Err(MemoryError::OutOfRange);
        }
        check_range(addr, len as usize, self.capacity())?;
        let end = match self.kind {
            MemoryKind::SpiFlash => (addr + len).div_ceil(sector) * sector,
            MemoryKind::I2cEeprom => addr + len,
        };
        let end = end.min(self.capacity()) as usize;
        self.data[addr as usize..end].fill(0xFF);
        self.sectors_erased += (len.div_ceil(sector)) as usize;
        Ok(())
    }

    fn sector_size(&self) -> u32 {
        self.sector_size
    }
}
