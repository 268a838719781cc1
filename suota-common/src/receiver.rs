// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! SUOTA receiver: stores an image sent over BLE into the older bank.
//!
//! The peer drives the session through four characteristics:
//! - `MemDev`: select the memory device and bank, or send a control command
//! - `GpioMap`: pins (and EEPROM address) of the external memory
//! - `PatchLen`: size of the next block
//! - `PatchData`: block payload, accumulated in RAM until `PatchLen` bytes arrived
//!
//! The first block carries the image header. It selects and prepares the
//! target bank. Later blocks are appended until the declared image length is
//! reached, then `IMG_END` marks the image valid if the XOR of everything
//! received is zero.
mod commands;
mod state;
mod storage;

use heapless::Vec;

use crate::bank::ImageBank;
use crate::checksum::running_xor_checksum;
use crate::layout::{
    ADDITIONAL_CRC_SIZE, PRODUCT_HEADER_POSITION, STATUS_VALID_IMAGE, SUOTA_OVERALL_PD_SIZE,
    VALID_FLAG_OFFSET,
};
use crate::memory::ExternalMemory;
use crate::status::{NotificationSink, Platform, Status};

pub use commands::Command;
pub use state::{MemDevice, SessionPhase, SessionState};

/// Control values of the memory-device type byte.
pub const SUOTAR_REBOOT: u8 = 0xFD;
pub const SUOTAR_IMG_END: u8 = 0xFE;
pub const SUOTAR_MEM_SERVICE_EXIT: u8 = 0xFF;

const MEM_DEV_TYPE_SHIFT: u32 = 24;
const MEM_BASE_MASK: u32 = 0x00FF_FFFF;

/// Build a memory-device word from its type byte and 24-bit argument.
pub const fn mem_dev_word(mem_type: u8, arg: u32) -> u32 {
    ((mem_type as u32) << MEM_DEV_TYPE_SHIFT) | (arg & MEM_BASE_MASK)
}

#[derive(Debug, Clone, Copy)]
pub struct ReceiverConfig {
    pub product_header_addr: u32,
    /// Erase SPI flash sectors as the writes reach them instead of erasing
    /// the whole image range when the header arrives.
    pub delayed_sector_erase: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            product_header_addr: PRODUCT_HEADER_POSITION,
            delayed_sector_erase: true,
        }
    }
}

/// One receiver per link. Owns the memory and the session state.
pub struct Receiver<M, N, P> {
    memory: M,
    sink: N,
    platform: P,
    config: ReceiverConfig,
    state: SessionState,
    block: Vec<u8, SUOTA_OVERALL_PD_SIZE>,
}

impl<M, N, P> Receiver<M, N, P>
where
    M: ExternalMemory,
    N: NotificationSink,
    P: Platform,
{
    pub fn new(memory: M, sink: N, platform: P, config: ReceiverConfig) -> Self {
        Self {
            memory,
            sink,
            platform,
            config,
            state: SessionState::default(),
            block: Vec::new(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn memory(&self) -> &M {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    pub fn sink(&self) -> &N {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut N {
        &mut self.sink
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Bytes of the current block received so far.
    pub fn block_len(&self) -> usize {
        self.block.len()
    }

    pub fn into_parts(self) -> (M, N, P) {
        (self.memory, self.sink, self.platform)
    }

    /// Handle a write to the memory-device characteristic.
    pub fn read_mem(&mut self, word: u32) {
        let mem_type = (word >> MEM_DEV_TYPE_SHIFT) as u8;
        let arg = word & MEM_BASE_MASK;

        match mem_type {
            SUOTAR_MEM_SERVICE_EXIT => {
                self.stop();
                self.reset();
                self.sink.notify_status(Status::SrvExit);
            }
            SUOTAR_IMG_END => self.finish_image(),
            SUOTAR_REBOOT => self.request_reboot(),
            _ => match MemDevice::from_raw(mem_type) {
                Some(dev) if dev.image_memory().is_some() => self.select_image_device(dev, arg),
                // Only the external banks can be updated, RAM targets and
                // patches end up here with unknown types.
                _ => self.reject_device(),
            },
        }
    }

    /// Refuse a memory-device write, tearing down any running transfer.
    fn reject_device(&mut self) {
        if self.state.phase.is_active() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Invalid memory device during a transfer, aborting");
            self.stop();
            self.reset();
        }
        self.state.mem_dev = None;
        self.sink.notify_status(Status::InvalMemType);
    }

    fn select_image_device(&mut self, dev: MemDevice, arg: u32) {
        if self.state.phase.is_active() {
            #[cfg(feature = "defmt")]
            defmt::warn!("Memory device write while a transfer is running");
            self.sink.notify_status(Status::AppError);
            return;
        }

        if dev.image_memory() != Some(self.memory.kind()) {
            self.sink.notify_status(Status::InvalMemType);
            self.state.mem_dev = None;
            return;
        }

        let Some(bank) = ImageBank::from_raw(arg) else {
            self.sink.notify_status(Status::InvalImgBank);
            self.state.mem_dev = None;
            return;
        };

        self.state.mem_dev = Some(dev);
        self.state.mem_base_add = arg;
        self.state.image_bank = bank;
        self.start();
    }

    /// Begin a transfer on the selected memory device.
    pub fn start(&mut self) {
        self.platform.on_status_change(true);

        match self.state.mem_dev {
            Some(dev) if dev.is_image() => {
                #[cfg(feature = "defmt")]
                defmt::info!("SUOTA started: {:?}, {:?}", dev, self.state.image_bank);
                self.sink.notify_status(Status::ImgStarted);
                self.state.phase = SessionPhase::Started;
            }
            _ => self.sink.notify_status(Status::InvalMemType),
        }

        self.block.clear();
        self.state.img_idx = 0;
        self.state.patch_len = 0;
        self.state.crc_calc = 0;
        self.state.target_bank = None;
    }

    /// Release the memory and refuse further data until the next `start`.
    pub fn stop(&mut self) {
        if self.state.mem_dev.is_some() {
            self.memory.release();
        }
        self.state.mem_dev = None;
        if self.state.phase.is_active() {
            self.state.phase = SessionPhase::Aborted;
        }

        #[cfg(feature = "defmt")]
        defmt::info!("SUOTA stopped");
        self.platform.on_status_change(false);
    }

    /// Drop any partially received block.
    pub fn reset(&mut self) {
        self.block.clear();
        self.state.patch_len = 0;
    }

    fn finish_image(&mut self) {
        let status = if self.state.mem_dev.is_none() {
            Status::InvalMemType
        } else if self.state.crc_calc != 0 {
            #[cfg(feature = "defmt")]
            defmt::warn!("SUOTA checksum mismatch: 0x{:02x}", self.state.crc_calc);
            Status::CrcErr
        } else {
            self.set_image_valid_flag()
        };
        self.sink.notify_status(status);

        let completed = status == Status::CmpOk;
        self.stop();
        self.reset();
        if completed {
            self.state.phase = SessionPhase::Ended;
        }
    }

    /// Mark the target bank bootable.
    pub fn set_image_valid_flag(&mut self) -> Status {
        if self.state.target_bank.is_none() {
            return Status::ExtMemWriteErr;
        }
        if self.memory.configure(self.state.gpio_map).is_err() {
            return Status::ExtMemWriteErr;
        }
        let addr = self.state.mem_base_add + VALID_FLAG_OFFSET;
        match storage::write_data(
            &mut self.memory,
            addr,
            &[STATUS_VALID_IMAGE],
            self.config.delayed_sector_erase,
        ) {
            Ok(()) => Status::CmpOk,
            Err(_) => Status::ExtMemWriteErr,
        }
    }

    fn request_reboot(&mut self) {
        if self.platform.is_connected() {
            self.state.reboot_requested = true;
            self.platform.disconnect();
        } else {
            self.platform.reset();
        }
    }

    /// Link to the peer went down.
    pub fn on_disconnect(&mut self) {
        if self.state.phase.is_active() {
            self.stop();
            self.reset();
        }
        if self.state.reboot_requested {
            self.state.reboot_requested = false;
            self.platform.reset();
        }
    }

    /// Process the block buffered in RAM.
    pub fn img_hdlr(&mut self) {
        self.state.crc_calc = running_xor_checksum(self.state.crc_calc, &self.block);

        let status = match self.state.mem_dev.and_then(MemDevice::image_memory) {
            Some(_) => self.store_block(),
            None => {
                self.block.clear();
                Status::InvalMemType
            }
        };
        self.sink.notify_status(status);
    }

    fn store_block(&mut self) -> Status {
        let mut status = Status::CmpOk;
        let block_len = self.block.len() as u32;

        if self.memory.configure(self.state.gpio_map).is_err() {
            status = Status::ExtMemWriteErr;
        } else if block_len != 0 && self.state.img_idx == 0 {
            match storage::read_image_headers(
                &mut self.memory,
                &self.config,
                self.state.image_bank,
                &self.block,
            ) {
                Ok(accepted) => {
                    self.state.mem_base_add = accepted.base;
                    self.state.target_bank = Some(accepted.bank);
                    self.state.image_len = accepted.image_len;
                    self.state.img_idx += block_len;
                    self.state.phase = SessionPhase::Receiving;
                }
                Err(e) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("Image header rejected: {:?}", e);
                    status = e;
                }
            }
        } else {
            let img_idx = self.state.img_idx;
            let image_len = self.state.image_len;
            let end = img_idx + block_len;
            if image_len + ADDITIONAL_CRC_SIZE >= end {
                // The trailer byte only feeds the checksum.
                let len = if image_len < end {
                    image_len.saturating_sub(img_idx)
                } else {
                    block_len
                };
                match storage::write_data(
                    &mut self.memory,
                    self.state.mem_base_add + img_idx,
                    &self.block[..len as usize],
                    self.config.delayed_sector_erase,
                ) {
                    Ok(()) => self.state.img_idx += len,
                    Err(_) => status = Status::ExtMemWriteErr,
                }
            } else {
                #[cfg(feature = "defmt")]
                defmt::warn!("Block past image end: {} > {}", end, image_len);
                status = Status::ExtMemWriteErr;
            }
        }

        self.block.clear();
        self.sink.notify_mem_info(self.state.img_idx);
        status
    }
}
