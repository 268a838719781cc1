// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use crate::bank::{Bank, ImageBank};
use crate::memory::MemoryKind;

/// Memory device types of the memory-device word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MemDevice {
    PatchSysRam = 0x00,
    PatchRetRam = 0x01,
    PatchI2cEeprom = 0x02,
    PatchSpiFlash = 0x03,
    ImgSysRam = 0x10,
    ImgRetRam = 0x11,
    ImgI2cEeprom = 0x12,
    ImgSpiFlash = 0x13,
}

impl MemDevice {
    pub fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => Self::PatchSysRam,
            0x01 => Self::PatchRetRam,
            0x02 => Self::PatchI2cEeprom,
            0x03 => Self::PatchSpiFlash,
            0x10 => Self::ImgSysRam,
            0x11 => Self::ImgRetRam,
            0x12 => Self::ImgI2cEeprom,
            0x13 => Self::ImgSpiFlash,
            _ => return None,
        })
    }

    /// Bit 4 marks a whole-image transfer as opposed to a patch.
    pub fn is_image(self) -> bool {
        (self as u8) & 0x10 != 0
    }

    /// Backend of an external image transfer, `None` for RAM targets and patches.
    pub fn image_memory(self) -> Option<MemoryKind> {
        match self {
            Self::ImgI2cEeprom => Some(MemoryKind::I2cEeprom),
            Self::ImgSpiFlash => Some(MemoryKind::SpiFlash),
            _ => None,
        }
    }
}

/// Progress of one update session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionPhase {
    /// No transfer since the receiver was created.
    #[default]
    Idle,
    /// Memory device accepted, waiting for the header block.
    Started,
    /// Header accepted and the target bank prepared.
    Receiving,
    /// Image end received and the image marked valid.
    Ended,
    /// Session torn down before the image was marked valid.
    Aborted,
}

impl SessionPhase {
    pub fn is_active(self) -> bool {
        matches!(self, Self::Started | Self::Receiving)
    }
}

/// Everything the receiver remembers between two characteristic writes.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SessionState {
    pub phase: SessionPhase,
    /// `None` until a memory device is selected, and again after `stop`.
    pub mem_dev: Option<MemDevice>,
    /// Base address of the target bank once the header was accepted.
    pub mem_base_add: u32,
    pub target_bank: Option<Bank>,
    pub gpio_map: u32,
    /// Announced length of the block being received.
    pub patch_len: u16,
    /// Bytes of the image stored so far, header included.
    pub img_idx: u32,
    /// Header plus code size, from the received header.
    pub image_len: u32,
    pub image_bank: ImageBank,
    /// XOR of every byte received in this session.
    pub crc_calc: u8,
    pub reboot_requested: bool,
}
