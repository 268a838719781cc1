// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! On-flash layout: one product header pointing at two image banks.
//!
//! ```text
//! PRODUCT_HEADER_POSITION   sig 70 52 | ver[2] | offset1 | offset2
//! offset1                   image header (64 bytes) | code ...
//! offset2                   image header (64 bytes) | code ...
//! ```
//!
//! All multi-byte fields are little-endian.

use core::fmt;

use crate::bank::Bank;
use crate::memory::{ExternalMemory, MemoryError};

// =============================================================================
// Layout constants
// =============================================================================

/// Default location of the product header in external memory.
pub const PRODUCT_HEADER_POSITION: u32 = 0x38000;
pub const PRODUCT_HEADER_SIGNATURE: [u8; 2] = [0x70, 0x52];
pub const PRODUCT_HEADER_SIZE: usize = 12;

pub const IMAGE_HEADER_SIGNATURE: [u8; 2] = [0x70, 0x51];
pub const IMAGE_HEADER_SIZE: usize = 64;
/// Distance between a bank base and the first code byte.
pub const CODE_OFFSET: u32 = IMAGE_HEADER_SIZE as u32;

/// `validflag` value marking an image as bootable.
pub const STATUS_VALID_IMAGE: u8 = 0xAA;
/// Position of `validflag` inside the image header.
pub const VALID_FLAG_OFFSET: u32 = 2;
/// Image id of a bank that never received an id.
pub const IMAGE_ID_UNSET: u8 = 0xFF;
pub const VERSION_LEN: usize = 16;

/// RAM block buffer of the receiver.
pub const SUOTA_OVERALL_PD_SIZE: usize = 0x200;
/// Largest payload the patch data characteristic carries in one write.
pub const SUOTA_PD_CHAR_SIZE: usize = 244;
/// XOR trailer byte the peer appends after the image.
pub const ADDITIONAL_CRC_SIZE: u32 = 1;

// =============================================================================
// Product header
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ProductHeader {
    pub signature: [u8; 2],
    pub version: [u8; 2],
    pub offset1: u32,
    pub offset2: u32,
}

impl ProductHeader {
    pub const fn new(offset1: u32, offset2: u32) -> Self {
        Self {
            signature: PRODUCT_HEADER_SIGNATURE,
            version: [0, 0],
            offset1,
            offset2,
        }
    }

    pub fn from_bytes(bytes: &[u8; PRODUCT_HEADER_SIZE]) -> Self {
        Self {
            signature: [bytes[0], bytes[1]],
            version: [bytes[2], bytes[3]],
            offset1: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            offset2: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; PRODUCT_HEADER_SIZE] {
        let mut out = [0u8; PRODUCT_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.signature);
        out[2..4].copy_from_slice(&self.version);
        out[4..8].copy_from_slice(&self.offset1.to_le_bytes());
        out[8..12].copy_from_slice(&self.offset2.to_le_bytes());
        out
    }

    pub fn is_valid(&self) -> bool {
        self.signature == PRODUCT_HEADER_SIGNATURE
    }

    /// Base address of `bank`.
    pub fn bank_addr(&self, bank: Bank) -> u32 {
        match bank {
            Bank::First => self.offset1,
            Bank::Second => self.offset2,
        }
    }

    /// Largest code payload a bank can hold, `None` when the banks overlap.
    pub fn max_code_size(&self) -> Option<u32> {
        self.offset2
            .checked_sub(self.offset1)
            .and_then(|span| span.checked_sub(CODE_OFFSET))
    }
}

// =============================================================================
// Image header
// =============================================================================

/// Header stored at the base of each bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ImageHeader {
    pub signature: [u8; 2],
    pub validflag: u8,
    pub imageid: u8,
    pub code_size: u32,
    pub crc: u32,
    pub version: [u8; VERSION_LEN],
    pub timestamp: u32,
    pub encryption: u8,
    pub reserved: [u8; 31],
}

/// Classification of a bank header against the image being installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Validity {
    Ok,
    Invalid,
    /// Valid, and carries the same version string and timestamp as the candidate.
    SameVersion,
}

impl ImageHeader {
    /// Header of an erased bank: every byte `0xFF`.
    pub fn erased() -> Self {
        Self::from_bytes(&[0xFF; IMAGE_HEADER_SIZE])
    }

    pub fn from_bytes(bytes: &[u8; IMAGE_HEADER_SIZE]) -> Self {
        let mut version = [0u8; VERSION_LEN];
        version.copy_from_slice(&bytes[12..28]);
        let mut reserved = [0u8; 31];
        reserved.copy_from_slice(&bytes[33..64]);
        Self {
            signature: [bytes[0], bytes[1]],
            validflag: bytes[2],
            imageid: bytes[3],
            code_size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            crc: u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]),
            version,
            timestamp: u32::from_le_bytes([bytes[28], bytes[29], bytes[30], bytes[31]]),
            encryption: bytes[32],
            reserved,
        }
    }

    /// Parse the first 64 bytes of `data`, `None` when it is shorter.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let bytes: &[u8; IMAGE_HEADER_SIZE] = data.get(..IMAGE_HEADER_SIZE)?.try_into().ok()?;
        Some(Self::from_bytes(bytes))
    }

    pub fn to_bytes(&self) -> [u8; IMAGE_HEADER_SIZE] {
        let mut out = [0u8; IMAGE_HEADER_SIZE];
        out[0..2].copy_from_slice(&self.signature);
        out[2] = self.validflag;
        out[3] = self.imageid;
        out[4..8].copy_from_slice(&self.code_size.to_le_bytes());
        out[8..12].copy_from_slice(&self.crc.to_le_bytes());
        out[12..28].copy_from_slice(&self.version);
        out[28..32].copy_from_slice(&self.timestamp.to_le_bytes());
        out[32] = self.encryption;
        out[33..64].copy_from_slice(&self.reserved);
        out
    }

    pub fn has_signature(&self) -> bool {
        self.signature == IMAGE_HEADER_SIGNATURE
    }

    /// Signature matches and the image was marked bootable.
    pub fn is_valid(&self) -> bool {
        self.validflag == STATUS_VALID_IMAGE && self.has_signature()
    }

    pub fn same_version(&self, other: &ImageHeader) -> bool {
        self.version == other.version && self.timestamp == other.timestamp
    }

    /// Classify this (installed) header against `candidate`.
    pub fn validity(&self, candidate: &ImageHeader) -> Validity {
        if !self.is_valid() {
            Validity::Invalid
        } else if self.same_version(candidate) {
            Validity::SameVersion
        } else {
            Validity::Ok
        }
    }

    /// Image id used for recency decisions; an invalid header counts as 0.
    pub fn effective_id(&self) -> u8 {
        if self.is_valid() {
            self.imageid
        } else {
            0
        }
    }

    /// Header plus code, the number of bytes a transfer writes into the bank.
    pub fn image_len(&self) -> u32 {
        self.code_size.saturating_add(CODE_OFFSET)
    }

    /// Version string up to the first NUL, `None` when it is not UTF-8.
    pub fn version_str(&self) -> Option<&str> {
        let end = self
            .version
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(VERSION_LEN);
        core::str::from_utf8(&self.version[..end]).ok()
    }

    /// Store `version` NUL-terminated, truncated to 15 bytes.
    pub fn set_version(&mut self, version: &str) {
        self.version = [0u8; VERSION_LEN];
        let len = version.len().min(VERSION_LEN - 1);
        self.version[..len].copy_from_slice(&version.as_bytes()[..len]);
    }
}

// =============================================================================
// Reading from external memory
// =============================================================================

/// Errors from reading the headers out of external memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeaderError {
    InvalidProductHeader,
    Memory(MemoryError),
}

impl From<MemoryError> for HeaderError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProductHeader => f.write_str("product header signature mismatch"),
            Self::Memory(e) => write!(f, "external memory read failed: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for HeaderError {}

/// Read the product header at `addr` and check its signature.
pub fn read_product_header<M: ExternalMemory + ?Sized>(
    mem: &mut M,
    addr: u32,
) -> Result<ProductHeader, HeaderError> {
    let mut buf = [0u8; PRODUCT_HEADER_SIZE];
    mem.read(addr, &mut buf)?;
    let header = ProductHeader::from_bytes(&buf);
    if !header.is_valid() {
        #[cfg(feature = "defmt")]
        defmt::warn!("Product header at 0x{:x} has bad signature", addr);
        return Err(HeaderError::InvalidProductHeader);
    }
    Ok(header)
}

/// Read the image header at `bank_addr`.
pub fn read_image_header<M: ExternalMemory + ?Sized>(
    mem: &mut M,
    bank_addr: u32,
) -> Result<ImageHeader, MemoryError> {
    let mut buf = [0u8; IMAGE_HEADER_SIZE];
    mem.read(bank_addr, &mut buf)?;
    Ok(ImageHeader::from_bytes(&buf))
}

/// Read the image header at `bank_addr` and classify it against `candidate`.
pub fn read_and_validate_image_header<M: ExternalMemory + ?Sized>(
    mem: &mut M,
    bank_addr: u32,
    candidate: &ImageHeader,
) -> Result<(ImageHeader, Validity), MemoryError> {
    let header = read_image_header(mem, bank_addr)?;
    let validity = header.validity(candidate);
    Ok((header, validity))
}
