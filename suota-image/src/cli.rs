// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command-line interface definitions.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};

use suota_common::layout::SUOTA_OVERALL_PD_SIZE;
use suota_common::PRODUCT_HEADER_POSITION;

use crate::commands;
use crate::version_file::{self, VersionInfo};

/// Command-line arguments.
#[derive(Parser)]
#[command(name = "suota-image")]
#[command(about = "Build and test SUOTA dual-bank firmware images")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// External memory the dump was read from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MemoryArg {
    /// SPI NOR flash (programming only clears bits, sector erase)
    Spi,
    /// I2C EEPROM (bytes are rewritable)
    Eeprom,
}

/// Available subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Prepend an image header to a raw firmware binary
    Single {
        /// Raw firmware binary
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Image file to write
        #[arg(value_name = "OUTPUT")]
        output: PathBuf,

        /// SDK version header with SDK_VERSION and SDK_VERSION_DATE
        #[arg(long, value_name = "FILE", conflicts_with_all = ["version", "timestamp"])]
        version_file: Option<PathBuf>,

        /// Version string (at most 15 bytes are kept)
        #[arg(long, requires = "timestamp")]
        version: Option<String>,

        /// Build time in seconds since the epoch
        #[arg(long, requires = "version")]
        timestamp: Option<u32>,
    },

    /// Lay out two images and a product header in one flash image
    Multi {
        /// Image file for bank 1
        #[arg(value_name = "IMG1")]
        img1: PathBuf,

        /// Offset of bank 1 (decimal or 0x-prefixed hex)
        #[arg(value_name = "OFF1", value_parser = parse_offset)]
        off1: u32,

        /// Image file for bank 2
        #[arg(value_name = "IMG2")]
        img2: PathBuf,

        /// Offset of bank 2
        #[arg(value_name = "OFF2", value_parser = parse_offset)]
        off2: u32,

        /// Offset of the product header
        #[arg(value_name = "OFF3", value_parser = parse_offset)]
        off3: u32,

        /// Flash image to write
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
    },

    /// Show the headers in a flash dump and the bank the boot loader would start
    Inspect {
        /// Flash or EEPROM dump
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /// Product header address in hex (default: 0x38000)
        #[arg(long, default_value = "0x38000", value_parser = parse_hex_u32)]
        product_header: u32,
    },

    /// Replay an over-the-air update of IMAGE into a flash dump
    Push {
        /// Flash or EEPROM dump, updated in place
        #[arg(value_name = "DUMP")]
        dump: PathBuf,

        /// Image file as built by `single`
        #[arg(value_name = "IMAGE")]
        image: PathBuf,

        /// Target bank (0 = older bank, 1, 2)
        #[arg(short, long, default_value = "0", value_parser = clap::value_parser!(u8).range(0..=2))]
        bank: u8,

        /// Bytes per block, at most 512
        #[arg(long, default_value = "512")]
        block_size: usize,

        /// Memory type of the dump
        #[arg(short, long, value_enum, default_value_t = MemoryArg::Spi)]
        memory: MemoryArg,

        /// Product header address in hex (default: 0x38000)
        #[arg(long, default_value = "0x38000", value_parser = parse_hex_u32)]
        product_header: u32,
    },
}

/// Parse a hex string (with or without 0x prefix) into a u32.
fn parse_hex_u32(s: &str) -> Result<u32, String> {
    let s = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u32::from_str_radix(s, 16).map_err(|e| format!("invalid hex value: {e}"))
}

/// Parse an offset: 0x-prefixed hex, otherwise decimal.
fn parse_offset(s: &str) -> Result<u32, String> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid offset '{s}': {e}"))
}

/// Execute the parsed CLI command.
pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Single {
            input,
            output,
            version_file,
            version,
            timestamp,
        } => {
            let info = match (version_file, version, timestamp) {
                (Some(path), _, _) => version_file::read(&path)?,
                (None, Some(version), Some(timestamp)) => VersionInfo { version, timestamp },
                _ => bail!("either --version-file or --version with --timestamp is required"),
            };
            commands::single(&input, &output, &info)
        }

        Commands::Multi {
            img1,
            off1,
            img2,
            off2,
            off3,
            output,
        } => commands::multi(&img1, off1, &img2, off2, off3, &output),

        Commands::Inspect {
            dump,
            product_header,
        } => commands::inspect(&dump, product_header),

        Commands::Push {
            dump,
            image,
            bank,
            block_size,
            memory,
            product_header,
        } => {
            if block_size == 0 || block_size > SUOTA_OVERALL_PD_SIZE {
                bail!("--block-size must be between 1 and {SUOTA_OVERALL_PD_SIZE}");
            }
            commands::push(&dump, &image, bank, block_size, memory, product_header)
        }
    }
}
