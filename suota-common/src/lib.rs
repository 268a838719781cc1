// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Dual-bank firmware update for DA1453x/DA1458x devices.
//!
//! This crate supports both `no_std` (embedded) and `std` (host) environments:
//! - Default: `no_std` mode for the secondary boot loader and the SUOTA application
//! - `std` feature: Enables `std::error::Error` impls for host tools
//! - `defmt` feature: Derives `defmt::Format` and emits log statements
//!
//! The on-flash format (one product header pointing at two image banks) is
//! shared by the over-the-air receiver in [`receiver`] and the boot-time
//! loader in [`loader`].

#![cfg_attr(not(feature = "std"), no_std)]

pub mod bank;
pub mod checksum;
pub mod gpio_map;
pub mod layout;
pub mod loader;
pub mod memory;
pub mod receiver;
pub mod status;

// Re-export commonly used types
pub use bank::{Bank, ImageBank};
pub use layout::{ImageHeader, ProductHeader, Validity};
pub use layout::{CODE_OFFSET, IMAGE_HEADER_SIZE, PRODUCT_HEADER_POSITION, STATUS_VALID_IMAGE};
pub use loader::{load_active_image, LoadError, LoadedImage, LoaderConfig};
pub use memory::{ExternalMemory, MemoryError, MemoryKind};
pub use receiver::{Command, Receiver, ReceiverConfig};
pub use status::{NotificationSink, Platform, Status};
