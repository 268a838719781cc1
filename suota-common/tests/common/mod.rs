// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Shared fixtures: flash images, a recording notification sink, a fake link,
//! and byte-level fakes of an SPI NOR chip and an I2C EEPROM.

#![allow(dead_code)]

use embedded_hal::i2c::{self, I2c};
use embedded_hal::spi::{self, SpiDevice};

use suota_common::layout::{ImageHeader, ProductHeader, IMAGE_HEADER_SIGNATURE};
use suota_common::receiver::{mem_dev_word, Command, SUOTAR_IMG_END};
use suota_common::{
    checksum::{crc32_checksum, running_xor_checksum},
    ExternalMemory, NotificationSink, Platform, Receiver, Status, PRODUCT_HEADER_POSITION,
    STATUS_VALID_IMAGE,
};

pub const FLASH_SIZE: usize = 0x4_0000;
pub const BANK1: u32 = 0x1_0000;
pub const BANK2: u32 = 0x2_0000;
pub const SPI_GPIO_MAP: u32 = 0x0506_0300;
pub const I2C_GPIO_MAP: u32 = 0x0050_0203;

pub const EEPROM_SIZE: usize = 0x2_0000;
pub const EEPROM_PRODUCT_HEADER: u32 = 0x1_F000;
pub const EEPROM_BANK1: u32 = 0x100;
/// Close enough to 64 KiB that images cross into the next block.
pub const EEPROM_BANK2: u32 = 0xFF80;

// =============================================================================
// Flash images
// =============================================================================

/// Erased memory with a product header pointing at `BANK1` and `BANK2`.
pub fn blank_flash() -> Vec<u8> {
    let mut flash = vec![0xFF; FLASH_SIZE];
    let product = ProductHeader::new(BANK1, BANK2).to_bytes();
    let at = PRODUCT_HEADER_POSITION as usize;
    flash[at..at + product.len()].copy_from_slice(&product);
    flash
}

/// Deterministic code payload of `len` bytes.
pub fn code(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed))
        .collect()
}

/// Header as produced by the image tool for `code`.
pub fn image_header(code: &[u8], version: &str, timestamp: u32) -> ImageHeader {
    let mut header = ImageHeader::erased();
    header.signature = IMAGE_HEADER_SIGNATURE;
    header.validflag = STATUS_VALID_IMAGE;
    header.code_size = code.len() as u32;
    header.crc = crc32_checksum(code);
    header.set_version(version);
    header.timestamp = timestamp;
    header.encryption = 0;
    header
}

/// Header followed by code, the byte stream a peer sends.
pub fn image_file(code: &[u8], version: &str, timestamp: u32) -> Vec<u8> {
    let mut out = image_header(code, version, timestamp).to_bytes().to_vec();
    out.extend_from_slice(code);
    out
}

/// Write a bootable image with `imageid` straight into `flash` at `base`.
pub fn install(flash: &mut [u8], base: u32, code: &[u8], version: &str, timestamp: u32, id: u8) {
    let mut header = image_header(code, version, timestamp);
    header.imageid = id;
    let base = base as usize;
    flash[base..base + 64].copy_from_slice(&header.to_bytes());
    flash[base + 64..base + 64 + code.len()].copy_from_slice(code);
}

pub fn header_at(flash: &[u8], base: u32) -> ImageHeader {
    ImageHeader::parse(&flash[base as usize..]).unwrap()
}

/// EEPROM contents with a product header at `EEPROM_PRODUCT_HEADER`.
pub fn blank_eeprom() -> Vec<u8> {
    let mut eeprom = vec![0xFF; EEPROM_SIZE];
    let product = ProductHeader::new(EEPROM_BANK1, EEPROM_BANK2).to_bytes();
    let at = EEPROM_PRODUCT_HEADER as usize;
    eeprom[at..at + product.len()].copy_from_slice(&product);
    eeprom
}

// =============================================================================
// Receiver collaborators
// =============================================================================

#[derive(Default)]
pub struct RecordingSink {
    pub statuses: Vec<Status>,
    pub mem_infos: Vec<u32>,
}

impl NotificationSink for RecordingSink {
    fn notify_status(&mut self, status: Status) {
        self.statuses.push(status);
    }

    fn notify_mem_info(&mut self, offset: u32) {
        self.mem_infos.push(offset);
    }
}

impl RecordingSink {
    pub fn last_status(&self) -> Option<Status> {
        self.statuses.last().copied()
    }

    pub fn errors(&self) -> Vec<Status> {
        self.statuses.iter().copied().filter(|s| s.is_error()).collect()
    }
}

#[derive(Default)]
pub struct FakeLink {
    pub connected: bool,
    pub disconnects: usize,
    pub resets: usize,
    pub activity: Vec<bool>,
}

impl FakeLink {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }
}

impl Platform for FakeLink {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.disconnects += 1;
        self.connected = false;
    }

    fn reset(&mut self) {
        self.resets += 1;
    }

    fn on_status_change(&mut self, active: bool) {
        self.activity.push(active);
    }
}

/// Send `image` as a complete SUOTA session: device selection, GPIO map,
/// blocks of `block_size` bytes in characteristic-sized writes, the XOR
/// trailer and `IMG_END`.
pub fn push_image<M: ExternalMemory>(
    rx: &mut Receiver<M, RecordingSink, FakeLink>,
    mem_type: u8,
    bank: u32,
    gpio_map: u32,
    image: &[u8],
    block_size: usize,
) {
    rx.dispatch_command(Command::MemDev(mem_dev_word(mem_type, bank)));
    rx.dispatch_command(Command::GpioMap(gpio_map));

    let mut stream = image.to_vec();
    stream.push(running_xor_checksum(0, image));

    for block in stream.chunks(block_size) {
        rx.dispatch_command(Command::PatchLen(block.len() as u16));
        for write in block.chunks(suota_common::layout::SUOTA_PD_CHAR_SIZE) {
            rx.dispatch_command(Command::PatchData(write));
        }
    }
    rx.dispatch_command(Command::MemDev(mem_dev_word(SUOTAR_IMG_END, 0)));
}

// =============================================================================
// SPI NOR flash fake
// =============================================================================

/// Byte-level 25-series flash answering the commands the driver uses.
pub struct FakeSpiChip {
    pub memory: Vec<u8>,
    pub jedec_id: [u8; 3],
    pub write_enabled: bool,
    pub powered_down: bool,
    pub stuck_busy: bool,
    pub fail_bus: bool,
    pub page_programs: usize,
    pub sector_erases: usize,
}

impl FakeSpiChip {
    pub fn new(memory: Vec<u8>) -> Self {
        Self {
            memory,
            jedec_id: [0xC2, 0x20, 0x13],
            write_enabled: false,
            powered_down: false,
            stuck_busy: false,
            fail_bus: false,
            page_programs: 0,
            sector_erases: 0,
        }
    }

    fn address(cmd: &[u8]) -> usize {
        ((cmd[1] as usize) << 16) | ((cmd[2] as usize) << 8) | cmd[3] as usize
    }

    fn fill_read(&self, cmd: &[u8], offset: usize, buf: &mut [u8]) {
        match cmd[0] {
            0x05 => buf.fill(u8::from(self.stuck_busy)),
            0x9F => {
                for (i, b) in buf.iter_mut().enumerate() {
                    *b = self.jedec_id.get(offset + i).copied().unwrap_or(0);
                }
            }
            0x03 => {
                let start = Self::address(cmd) + offset;
                buf.copy_from_slice(&self.memory[start..start + buf.len()]);
            }
            _ => buf.fill(0xFF),
        }
    }

    fn execute(&mut self, out: &[u8]) {
        match out.first() {
            Some(0x06) => self.write_enabled = true,
            Some(0x02) if self.write_enabled => {
                let addr = Self::address(out);
                let page = addr & !0xFF;
                for (i, byte) in out[4..].iter().enumerate() {
                    // Page program wraps inside the page.
                    let at = page + ((addr + i) & 0xFF);
                    self.memory[at] &= byte;
                }
                self.page_programs += 1;
                self.write_enabled = false;
            }
            Some(0x20) if self.write_enabled => {
                let sector = Self::address(out) & !0xFFF;
                self.memory[sector..sector + 0x1000].fill(0xFF);
                self.sector_erases += 1;
                self.write_enabled = false;
            }
            Some(0xB9) => self.powered_down = true,
            Some(0xAB) => self.powered_down = false,
            _ => {}
        }
    }
}

impl spi::ErrorType for FakeSpiChip {
    type Error = spi::ErrorKind;
}

impl SpiDevice for FakeSpiChip {
    fn transaction(&mut self, operations: &mut [spi::Operation<'_, u8>]) -> Result<(), Self::Error> {
        if self.fail_bus {
            return Err(spi::ErrorKind::Other);
        }
        let mut out = Vec::new();
        let mut read_offset = 0;
        for op in operations.iter_mut() {
            match op {
                spi::Operation::Write(data) => out.extend_from_slice(&data[..]),
                spi::Operation::Read(buf) => {
                    self.fill_read(&out, read_offset, buf);
                    read_offset += buf.len();
                }
                _ => {}
            }
        }
        self.execute(&out);
        Ok(())
    }
}

// =============================================================================
// I2C EEPROM fake
// =============================================================================

/// 24-series EEPROM with two address bytes, block select in the device address
/// and a write cycle during which it does not acknowledge.
pub struct FakeEepromChip {
    pub memory: Vec<u8>,
    pub address: u8,
    pub page_size: usize,
    /// Transactions NACKed after each page write.
    pub write_cycle_polls: usize,
    pub busy: usize,
    pub page_writes: usize,
}

impl FakeEepromChip {
    pub fn new(memory: Vec<u8>, address: u8) -> Self {
        Self {
            memory,
            address,
            page_size: 256,
            write_cycle_polls: 2,
            busy: 0,
            page_writes: 0,
        }
    }
}

impl i2c::ErrorType for FakeEepromChip {
    type Error = i2c::ErrorKind;
}

impl I2c for FakeEepromChip {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let nack = i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address);
        if address & !0x07 != self.address {
            return Err(nack);
        }
        if self.busy > 0 {
            self.busy -= 1;
            return Err(nack);
        }

        let block = ((address & 0x07) as usize) << 16;
        let mut written = Vec::new();
        let mut pointer = None;
        for op in operations.iter_mut() {
            match op {
                i2c::Operation::Write(data) => written.extend_from_slice(&data[..]),
                i2c::Operation::Read(buf) => {
                    let start = block | ((written[0] as usize) << 8) | written[1] as usize;
                    let at = pointer.unwrap_or(start);
                    buf.copy_from_slice(&self.memory[at..at + buf.len()]);
                    pointer = Some(at + buf.len());
                }
            }
        }

        if pointer.is_none() && written.len() > 2 {
            let addr = block | ((written[0] as usize) << 8) | written[1] as usize;
            let page = addr - addr % self.page_size;
            for (i, byte) in written[2..].iter().enumerate() {
                let at = page + (addr + i) % self.page_size;
                self.memory[at] = *byte;
            }
            self.page_writes += 1;
            self.busy = self.write_cycle_polls;
        }
        Ok(())
    }
}
