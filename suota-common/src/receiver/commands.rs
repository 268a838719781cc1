// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use super::Receiver;
use crate::layout::SUOTA_OVERALL_PD_SIZE;
use crate::memory::ExternalMemory;
use crate::status::{NotificationSink, Platform, Status};

/// A write to one of the SUOTA service characteristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    MemDev(u32),
    GpioMap(u32),
    PatchLen(u16),
    PatchData(&'a [u8]),
}

impl<M, N, P> Receiver<M, N, P>
where
    M: ExternalMemory,
    N: NotificationSink,
    P: Platform,
{
    /// Dispatch a characteristic write to its handler.
    pub fn dispatch_command(&mut self, cmd: Command<'_>) {
        match cmd {
            Command::MemDev(word) => self.handle_mem_dev(word),
            Command::GpioMap(map) => self.handle_gpio_map(map),
            Command::PatchLen(len) => self.handle_patch_len(len),
            Command::PatchData(data) => self.handle_patch_data(data),
        }
    }

    fn reject_with(&mut self, status: Status) {
        self.sink.notify_status(status);
    }

    /// Handle `MemDev`: run the device selection, then reset the memory info.
    fn handle_mem_dev(&mut self, word: u32) {
        self.read_mem(word);
        self.sink.notify_mem_info(0);
    }

    /// Handle `GpioMap`: only meaningful for external memories.
    fn handle_gpio_map(&mut self, map: u32) {
        self.state.gpio_map = map;
        if self.state.mem_dev.and_then(|dev| dev.image_memory()).is_none() {
            self.reject_with(Status::InvalMemType);
        }
    }

    /// Handle `PatchLen`: size of the block that follows.
    fn handle_patch_len(&mut self, len: u16) {
        if len == 0 {
            return self.reject_with(Status::PatchLenErr);
        }
        let Some(dev) = self.state.mem_dev else {
            return;
        };
        if !dev.is_image() {
            return self.reject_with(Status::InvalMemType);
        }
        if usize::from(len) > SUOTA_OVERALL_PD_SIZE {
            return self.reject_with(Status::IntMemErr);
        }
        self.state.patch_len = len;
    }

    /// Handle `PatchData`: append to the RAM block, process it once complete.
    fn handle_patch_data(&mut self, data: &[u8]) {
        let Some(dev) = self.state.mem_dev else {
            return self.reject_with(Status::InvalMemType);
        };
        if self.state.patch_len == 0 {
            return self.reject_with(Status::PatchLenErr);
        }
        if !dev.is_image() {
            return self.reject_with(Status::InvalMemType);
        }
        if self.block.extend_from_slice(data).is_err() {
            return self.reject_with(Status::IntMemErr);
        }

        let patch_len = usize::from(self.state.patch_len);
        if self.block.len() == patch_len {
            self.img_hdlr();
        } else if self.block.len() > patch_len {
            #[cfg(feature = "defmt")]
            defmt::warn!("Block overran patch length {}", patch_len);
            self.block.clear();
            self.reject_with(Status::PatchLenErr);
        }
    }
}
