// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Boot-time selection and loading of the active image.
//!
//! The newest valid bank is copied into RAM and checked against the CRC-32
//! in its header. When both banks are valid and the first choice fails, the
//! other bank is tried.

use core::fmt;

use crate::bank::{select_active_bank, Bank, SelectError};
use crate::checksum::crc32_checksum;
use crate::layout::{
    read_image_header, read_product_header, HeaderError, ImageHeader, ProductHeader, CODE_OFFSET,
    PRODUCT_HEADER_POSITION,
};
use crate::memory::{ExternalMemory, MemoryError};

#[derive(Debug, Clone, Copy)]
pub struct LoaderConfig {
    pub product_header_addr: u32,
    /// GPIO map to configure the memory with before reading, if any.
    pub gpio_map: Option<u32>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            product_header_addr: PRODUCT_HEADER_POSITION,
            gpio_map: None,
        }
    }
}

/// In-place decryption of an image copied to RAM.
pub trait ImageDecryptor {
    /// Decrypt `image`. Returns `false` when it cannot be decrypted.
    fn decrypt(&mut self, image: &mut [u8]) -> bool;
}

/// Decryptor for builds without encrypted image support.
pub struct NoDecryption;

impl ImageDecryptor for NoDecryption {
    fn decrypt(&mut self, _image: &mut [u8]) -> bool {
        false
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    InvalidProductHeader,
    NoValidImage,
    /// The image does not fit the execution RAM.
    ImageTooLarge,
    /// CRC mismatch, or an encrypted image that could not be decrypted.
    VerificationFailed,
    Memory(MemoryError),
}

impl From<MemoryError> for LoadError {
    fn from(e: MemoryError) -> Self {
        Self::Memory(e)
    }
}

impl From<HeaderError> for LoadError {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::InvalidProductHeader => Self::InvalidProductHeader,
            HeaderError::Memory(e) => Self::Memory(e),
        }
    }
}

impl From<SelectError> for LoadError {
    fn from(_: SelectError) -> Self {
        Self::NoValidImage
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidProductHeader => f.write_str("invalid product header"),
            Self::NoValidImage => f.write_str("no valid image in either bank"),
            Self::ImageTooLarge => f.write_str("image larger than execution RAM"),
            Self::VerificationFailed => f.write_str("image verification failed"),
            Self::Memory(e) => write!(f, "external memory error: {e}"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LoadError {}

/// Image placed at the start of the RAM buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LoadedImage {
    pub bank: Bank,
    pub header: ImageHeader,
    /// `true` when the first choice failed and the other bank was loaded.
    pub fallback: bool,
}

impl LoadedImage {
    pub fn code_size(&self) -> usize {
        self.header.code_size as usize
    }
}

/// Load the active image from `mem` into `ram`.
pub fn load_active_image<M, D>(
    mem: &mut M,
    ram: &mut [u8],
    decryptor: &mut D,
    config: &LoaderConfig,
) -> Result<LoadedImage, LoadError>
where
    M: ExternalMemory + ?Sized,
    D: ImageDecryptor + ?Sized,
{
    let result = load(mem, ram, decryptor, config);
    mem.release();
    result
}

fn load<M, D>(
    mem: &mut M,
    ram: &mut [u8],
    decryptor: &mut D,
    config: &LoaderConfig,
) -> Result<LoadedImage, LoadError>
where
    M: ExternalMemory + ?Sized,
    D: ImageDecryptor + ?Sized,
{
    if let Some(map) = config.gpio_map {
        mem.configure(map)?;
    }

    let product = read_product_header(mem, config.product_header_addr)?;
    let header1 = read_image_header(mem, product.offset1)?;
    let header2 = read_image_header(mem, product.offset2)?;

    let both_valid = header1.is_valid() && header2.is_valid();
    let bank = select_active_bank(
        header1.is_valid(),
        header2.is_valid(),
        header1.imageid,
        header2.imageid,
    )?;

    let header_of = |bank: Bank| match bank {
        Bank::First => header1,
        Bank::Second => header2,
    };

    match load_bank(mem, ram, decryptor, &product, bank, &header_of(bank)) {
        Ok(image) => Ok(image),
        Err(_e) if both_valid => {
            #[cfg(feature = "defmt")]
            defmt::warn!("Bank {} failed ({}), trying the other bank", bank.number(), _e);
            let other = bank.other();
            load_bank(mem, ram, decryptor, &product, other, &header_of(other)).map(|image| {
                LoadedImage {
                    fallback: true,
                    ..image
                }
            })
        }
        Err(e) => Err(e),
    }
}

fn load_bank<M, D>(
    mem: &mut M,
    ram: &mut [u8],
    decryptor: &mut D,
    product: &ProductHeader,
    bank: Bank,
    header: &ImageHeader,
) -> Result<LoadedImage, LoadError>
where
    M: ExternalMemory + ?Sized,
    D: ImageDecryptor + ?Sized,
{
    let size = header.code_size as usize;
    let code = ram.get_mut(..size).ok_or(LoadError::ImageTooLarge)?;
    mem.read(product.bank_addr(bank) + CODE_OFFSET, code)?;

    if header.encryption != 0 && !decryptor.decrypt(code) {
        return Err(LoadError::VerificationFailed);
    }
    if crc32_checksum(code) != header.crc {
        return Err(LoadError::VerificationFailed);
    }

    #[cfg(feature = "defmt")]
    defmt::info!("Loaded {} bytes from bank {}", size, bank.number());
    Ok(LoadedImage {
        bank,
        header: *header,
        fallback: false,
    })
}

/// Try each boot source in order and return the index of the one that loaded.
pub fn boot_from_sources<D>(
    sources: &mut [&mut dyn ExternalMemory],
    ram: &mut [u8],
    decryptor: &mut D,
    config: &LoaderConfig,
) -> Result<(usize, LoadedImage), LoadError>
where
    D: ImageDecryptor + ?Sized,
{
    let mut last = LoadError::NoValidImage;
    for (index, source) in sources.iter_mut().enumerate() {
        match load_active_image(&mut **source, ram, decryptor, config) {
            Ok(image) => return Ok((index, image)),
            Err(e) => last = e,
        }
    }
    Err(last)
}
