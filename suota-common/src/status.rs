// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Status codes sent to the peer, and the seams to the BLE stack and platform.

use core::fmt;

/// Status notification values of the SUOTA service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Status {
    Reserved = 0x00,
    /// Valid memory device selected, service started.
    SrvStarted = 0x01,
    /// Block or image processed successfully.
    CmpOk = 0x02,
    /// Service exited on request.
    SrvExit = 0x03,
    /// XOR checksum of the whole transfer was not zero.
    CrcErr = 0x04,
    /// Block larger than the announced patch length, or no length set.
    PatchLenErr = 0x05,
    ExtMemWriteErr = 0x06,
    /// Block does not fit the RAM buffer.
    IntMemErr = 0x07,
    InvalMemType = 0x08,
    AppError = 0x09,
    ImgStarted = 0x10,
    InvalImgBank = 0x11,
    InvalImgHdr = 0x12,
    InvalImgSize = 0x13,
    InvalProductHdr = 0x14,
    SameImgErr = 0x15,
    ExtMemReadErr = 0x16,
}

impl Status {
    pub fn from_u8(value: u8) -> Option<Self> {
        Some(match value {
            0x00 => Self::Reserved,
            0x01 => Self::SrvStarted,
            0x02 => Self::CmpOk,
            0x03 => Self::SrvExit,
            0x04 => Self::CrcErr,
            0x05 => Self::PatchLenErr,
            0x06 => Self::ExtMemWriteErr,
            0x07 => Self::IntMemErr,
            0x08 => Self::InvalMemType,
            0x09 => Self::AppError,
            0x10 => Self::ImgStarted,
            0x11 => Self::InvalImgBank,
            0x12 => Self::InvalImgHdr,
            0x13 => Self::InvalImgSize,
            0x14 => Self::InvalProductHdr,
            0x15 => Self::SameImgErr,
            0x16 => Self::ExtMemReadErr,
            _ => return None,
        })
    }

    pub fn is_error(self) -> bool {
        !matches!(
            self,
            Self::SrvStarted | Self::CmpOk | Self::SrvExit | Self::ImgStarted
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Reserved => "reserved",
            Self::SrvStarted => "service started",
            Self::CmpOk => "ok",
            Self::SrvExit => "service exit",
            Self::CrcErr => "checksum error",
            Self::PatchLenErr => "patch length error",
            Self::ExtMemWriteErr => "external memory write error",
            Self::IntMemErr => "internal memory error",
            Self::InvalMemType => "invalid memory type",
            Self::AppError => "application error",
            Self::ImgStarted => "image transfer started",
            Self::InvalImgBank => "invalid image bank",
            Self::InvalImgHdr => "invalid image header",
            Self::InvalImgSize => "invalid image size",
            Self::InvalProductHdr => "invalid product header",
            Self::SameImgErr => "same image already installed",
            Self::ExtMemReadErr => "external memory read error",
        };
        f.write_str(text)
    }
}

/// Outgoing notifications on the SUOTA status and memory-info characteristics.
pub trait NotificationSink {
    fn notify_status(&mut self, status: Status);

    /// Running byte offset of the transfer.
    fn notify_mem_info(&mut self, offset: u32);
}

/// Link and system control used by the receiver.
pub trait Platform {
    /// Whether a peer is still connected.
    fn is_connected(&self) -> bool;

    /// Drop the link to the peer. A reboot then happens in `Receiver::on_disconnect`.
    fn disconnect(&mut self);

    fn reset(&mut self);

    /// Called with `true` when a transfer starts and `false` when it ends, so
    /// the application can keep the device awake and stop other flash users.
    fn on_status_change(&mut self, _active: bool) {}
}
