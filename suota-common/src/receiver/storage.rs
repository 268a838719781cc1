// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

use super::ReceiverConfig;
use crate::bank::{next_image_id, select_target_bank, Bank, ImageBank};
use crate::layout::{
    read_and_validate_image_header, read_product_header, HeaderError, ImageHeader, CODE_OFFSET,
    IMAGE_HEADER_SIZE,
};
use crate::memory::{ExternalMemory, MemoryError, MemoryKind};
use crate::status::Status;

/// Target chosen for an incoming image.
#[derive(Debug, Clone, Copy)]
pub(super) struct AcceptedImage {
    pub bank: Bank,
    pub base: u32,
    pub image_len: u32,
}

/// Erase every sector touched by `[start, start + size)`, at least one.
pub(super) fn erase_sectors<M: ExternalMemory + ?Sized>(
    mem: &mut M,
    start: u32,
    size: u32,
) -> Result<(), MemoryError> {
    let sector = mem.sector_size();
    let first = (start / sector) * sector;
    let count = size.div_ceil(sector).max(1);
    mem.erase_region(first, count * sector)
}

/// Program `data` at `addr`.
///
/// With delayed erase on SPI flash, sectors are erased right before the first
/// write that reaches them: a write starting on a sector boundary erases its
/// own range, a write starting mid-sector erases only the sectors after the
/// current one.
pub(super) fn write_data<M: ExternalMemory + ?Sized>(
    mem: &mut M,
    addr: u32,
    data: &[u8],
    delayed_erase: bool,
) -> Result<(), MemoryError> {
    if delayed_erase && mem.kind() == MemoryKind::SpiFlash && !data.is_empty() {
        let sector = mem.sector_size();
        let size = data.len() as u32;
        let upper = addr + size;
        let starting_sector = (addr / sector) * sector;
        if starting_sector == addr {
            erase_sectors(mem, addr, size)?;
        } else if upper / sector != addr / sector {
            let next_sector = starting_sector + sector;
            erase_sectors(mem, next_sector, upper - next_sector)?;
        }
    }
    mem.write(addr, data)
}

/// Validate the header carried by the first block, pick and prepare the
/// target bank, then store the header and the rest of the block.
///
/// The stored header keeps `validflag` erased, the image only becomes
/// bootable once the whole transfer checked out.
pub(super) fn read_image_headers<M: ExternalMemory + ?Sized>(
    mem: &mut M,
    config: &ReceiverConfig,
    hint: ImageBank,
    data: &[u8],
) -> Result<AcceptedImage, Status> {
    let candidate = ImageHeader::parse(data).ok_or(Status::InvalImgHdr)?;
    if !candidate.has_signature() {
        return Err(Status::InvalImgHdr);
    }
    let code_size = candidate.code_size;
    let image_len = candidate.image_len();

    let product = read_product_header(mem, config.product_header_addr).map_err(|e| match e {
        HeaderError::InvalidProductHeader => Status::InvalProductHdr,
        HeaderError::Memory(_) => Status::ExtMemReadErr,
    })?;

    // The image must fit between the two bank bases.
    match product.max_code_size() {
        Some(max) if code_size != 0 && code_size <= max => {}
        _ => return Err(Status::InvalImgSize),
    }

    let (header1, validity1) = read_and_validate_image_header(mem, product.offset1, &candidate)
        .map_err(|_| Status::ExtMemReadErr)?;
    let (header2, validity2) = read_and_validate_image_header(mem, product.offset2, &candidate)
        .map_err(|_| Status::ExtMemReadErr)?;

    let bank = select_target_bank(
        hint,
        validity1,
        validity2,
        header1.effective_id(),
        header2.effective_id(),
    )
    .map_err(|_| {
        #[cfg(feature = "defmt")]
        defmt::warn!("Image already installed, rejecting");
        Status::SameImgErr
    })?;

    let base = product.bank_addr(bank);
    let other = match bank {
        Bank::First => header2,
        Bank::Second => header1,
    };
    let imageid = next_image_id(other.effective_id());

    #[cfg(feature = "defmt")]
    defmt::info!("Writing image id {} to {} at 0x{:x}", imageid, bank.number(), base);

    match mem.kind() {
        MemoryKind::SpiFlash => {
            let erase_len = if config.delayed_sector_erase {
                1
            } else {
                code_size + CODE_OFFSET
            };
            erase_sectors(mem, base, erase_len)
        }
        // Bytes are rewritable, invalidating the header is enough.
        MemoryKind::I2cEeprom => mem.write(base, &[0xFF; IMAGE_HEADER_SIZE]),
    }
    .map_err(|_| Status::ExtMemWriteErr)?;

    let mut header = ImageHeader::erased();
    header.signature = candidate.signature;
    header.imageid = imageid;
    header.code_size = candidate.code_size;
    header.crc = candidate.crc;
    header.version = candidate.version;
    header.timestamp = candidate.timestamp;
    header.encryption = candidate.encryption;

    let delayed = config.delayed_sector_erase;
    write_data(mem, base, &header.to_bytes(), delayed).map_err(|_| Status::ExtMemWriteErr)?;

    let payload_end = data.len().min(image_len as usize);
    write_data(mem, base + CODE_OFFSET, &data[IMAGE_HEADER_SIZE..payload_end], delayed)
        .map_err(|_| Status::ExtMemWriteErr)?;

    Ok(AcceptedImage {
        bank,
        base,
        image_len,
    })
}
