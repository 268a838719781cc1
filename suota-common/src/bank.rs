// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Bank selection.
//!
//! Two policies share the same inputs but answer different questions. The
//! receiver picks the bank to overwrite (the older one), the boot loader picks
//! the bank to run (the newer one). Their `0xFF` sentinel handling is not
//! symmetric, so each keeps its own tie-break function.

use core::fmt;

use crate::layout::{Validity, IMAGE_ID_UNSET};

/// One of the two image banks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bank {
    First,
    Second,
}

impl Bank {
    pub fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    /// 1-based bank number as shown to users.
    pub fn number(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bank {}", self.number())
    }
}

/// Bank requested by the peer in the memory-device word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageBank {
    /// Let the receiver overwrite the older bank.
    #[default]
    Any,
    First,
    Second,
}

impl ImageBank {
    pub fn from_raw(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::Any),
            1 => Some(Self::First),
            2 => Some(Self::Second),
            _ => None,
        }
    }

    pub fn forced(self) -> Option<Bank> {
        match self {
            Self::Any => None,
            Self::First => Some(Bank::First),
            Self::Second => Some(Bank::Second),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SelectError {
    /// The target bank already holds this version.
    SameImage,
    /// Neither bank holds a bootable image.
    NoValidImage,
}

impl fmt::Display for SelectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SameImage => f.write_str("target bank already holds this image"),
            Self::NoValidImage => f.write_str("no valid image in either bank"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for SelectError {}

/// Bank holding the older image, given two valid image ids.
pub fn find_old_img(id1: u8, id2: u8) -> Bank {
    match (id1, id2) {
        (IMAGE_ID_UNSET, IMAGE_ID_UNSET) => Bank::Second,
        (IMAGE_ID_UNSET, 0) => Bank::First,
        (0, IMAGE_ID_UNSET) => Bank::Second,
        _ if id1 > id2 => Bank::Second,
        _ => Bank::First,
    }
}

/// Bank holding the newer image, given two valid image ids.
pub fn find_latest(id1: u8, id2: u8) -> Bank {
    match (id1, id2) {
        (IMAGE_ID_UNSET, IMAGE_ID_UNSET) => Bank::Second,
        (IMAGE_ID_UNSET, 0) => Bank::Second,
        (0, IMAGE_ID_UNSET) => Bank::First,
        _ if id1 >= id2 => Bank::First,
        _ => Bank::Second,
    }
}

/// Id for an image written next to a bank whose id is `other_id`.
pub fn next_image_id(other_id: u8) -> u8 {
    if other_id == IMAGE_ID_UNSET {
        0
    } else {
        other_id + 1
    }
}

/// Choose the bank an incoming image is written to.
///
/// An explicit `hint` wins, otherwise an invalid bank is preferred over
/// overwriting a valid one, and between two valid banks the older one goes.
pub fn select_target_bank(
    hint: ImageBank,
    validity1: Validity,
    validity2: Validity,
    id1: u8,
    id2: u8,
) -> Result<Bank, SelectError> {
    let bank = match hint.forced() {
        Some(bank) => bank,
        None if validity1 == Validity::Invalid => Bank::First,
        None if validity2 == Validity::Invalid => Bank::Second,
        None => find_old_img(id1, id2),
    };

    let validity = match bank {
        Bank::First => validity1,
        Bank::Second => validity2,
    };
    if validity == Validity::SameVersion {
        return Err(SelectError::SameImage);
    }
    Ok(bank)
}

/// Choose the bank to boot from.
pub fn select_active_bank(
    valid1: bool,
    valid2: bool,
    id1: u8,
    id2: u8,
) -> Result<Bank, SelectError> {
    match (valid1, valid2) {
        (true, true) => Ok(find_latest(id1, id2)),
        (true, false) => Ok(Bank::First),
        (false, true) => Ok(Bank::Second),
        (false, false) => Err(SelectError::NoValidImage),
    }
}
