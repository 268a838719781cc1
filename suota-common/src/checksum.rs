// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! The two integrity checks used by the image format.
//!
//! The over-the-air path only keeps a byte-wise XOR of everything it
//! received, the peer appends one trailer byte that brings the total to zero.
//! The boot loader checks the CRC-32 stored in the image header. Images in the
//! field depend on both, so they stay separate.

use crc::{Crc, CRC_32_ISO_HDLC};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

/// Fold `data` into the running XOR accumulator `acc`.
pub fn running_xor_checksum(acc: u8, data: &[u8]) -> u8 {
    data.iter().fold(acc, |acc, byte| acc ^ byte)
}

/// CRC-32 (zlib polynomial) of `data`, as stored in the image header.
pub fn crc32_checksum(data: &[u8]) -> u32 {
    CRC32.checksum(data)
}
