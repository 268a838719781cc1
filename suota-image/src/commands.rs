// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Command implementations.

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::DateTime;
use indicatif::{ProgressBar, ProgressStyle};

use suota_common::checksum::running_xor_checksum;
use suota_common::layout::{read_image_header, read_product_header, SUOTA_PD_CHAR_SIZE};
use suota_common::loader::NoDecryption;
use suota_common::memory::RamMemory;
use suota_common::receiver::{mem_dev_word, SUOTAR_IMG_END};
use suota_common::{
    load_active_image, Bank, Command, ImageHeader, LoaderConfig,
    NotificationSink, Platform, Receiver, ReceiverConfig, Status,
};

use crate::cli::MemoryArg;
use crate::image;
use crate::version_file::VersionInfo;

const MEM_DEV_IMG_I2C_EEPROM: u8 = 0x12;
const MEM_DEV_IMG_SPI_FLASH: u8 = 0x13;

/// Build a single image file from a raw binary.
pub fn single(input: &Path, output: &Path, info: &VersionInfo) -> Result<()> {
    let code = fs::read(input).with_context(|| format!("Failed to read {}", input.display()))?;
    let file = image::single_image(&code, info)?;
    fs::write(output, &file).with_context(|| format!("Failed to write {}", output.display()))?;

    let header = image::parse_image(&file)?;
    println!(
        "Image:    {} ({} bytes, CRC32: 0x{:08x})",
        output.display(),
        file.len(),
        header.crc
    );
    println!("Version:  {}", info.version);
    println!("Date:     {}", format_timestamp(info.timestamp));
    Ok(())
}

/// Build a two-bank flash image.
pub fn multi(img1: &Path, off1: u32, img2: &Path, off2: u32, off3: u32, output: &Path) -> Result<()> {
    let file1 = fs::read(img1).with_context(|| format!("Failed to read {}", img1.display()))?;
    let file2 = fs::read(img2).with_context(|| format!("Failed to read {}", img2.display()))?;
    let out = image::multi_image(&file1, off1, &file2, off2, off3)?;
    fs::write(output, &out).with_context(|| format!("Failed to write {}", output.display()))?;

    println!("[{off1:08x}] {}", img1.display());
    println!("[{off2:08x}] {}", img2.display());
    println!("[{off3:08x}] Product header");
    println!("Flash image: {} ({} bytes)", output.display(), out.len());
    Ok(())
}

/// Print the product header, both image headers and the boot decision.
pub fn inspect(dump_path: &Path, product_header: u32) -> Result<()> {
    let mut dump =
        fs::read(dump_path).with_context(|| format!("Failed to read {}", dump_path.display()))?;
    let dump_len = dump.len();
    let mut mem = RamMemory::spi_flash(&mut dump);

    let product = read_product_header(&mut mem, product_header)
        .with_context(|| format!("No product header at 0x{product_header:08x}"))?;
    println!("Product header at 0x{product_header:08x}:");
    println!("  Bank 1:      0x{:08x}", product.offset1);
    println!("  Bank 2:      0x{:08x}", product.offset2);
    match product.max_code_size() {
        Some(max) => println!("  Max code:    {max} bytes"),
        None => println!("  Max code:    none (banks overlap)"),
    }

    for bank in [Bank::First, Bank::Second] {
        let addr = product.bank_addr(bank);
        println!();
        match read_image_header(&mut mem, addr) {
            Ok(header) => print_header(bank, addr, &header),
            Err(e) => println!("Bank {} at 0x{addr:08x}: unreadable ({e})", bank.number()),
        }
    }

    println!();
    // Offsets come from the dump, no image can be larger than the dump itself.
    let max_code = product.max_code_size().unwrap_or(0) as usize;
    let mut ram = vec![0u8; max_code.min(dump_len)];
    let config = LoaderConfig {
        product_header_addr: product_header,
        gpio_map: None,
    };
    match load_active_image(&mut mem, &mut ram, &mut NoDecryption, &config) {
        Ok(loaded) if loaded.fallback => {
            println!("Boot:        {} (fallback, the newer bank failed)", loaded.bank)
        }
        Ok(loaded) => println!("Boot:        {}", loaded.bank),
        Err(e) => println!("Boot:        fails ({e})"),
    }
    Ok(())
}

fn print_header(bank: Bank, addr: u32, header: &ImageHeader) {
    println!("Bank {} at 0x{addr:08x}:", bank.number());
    if !header.has_signature() {
        println!("  Empty");
        return;
    }
    println!(
        "  State:       {}",
        if header.is_valid() { "valid" } else { "not valid" }
    );
    println!("  Image id:    {}", header.imageid);
    println!("  Code size:   {} bytes", header.code_size);
    println!("  CRC32:       0x{:08x}", header.crc);
    println!("  Version:     {}", header.version_str().unwrap_or("<not UTF-8>"));
    println!("  Date:        {}", format_timestamp(header.timestamp));
    if header.encryption != 0 {
        println!("  Encrypted");
    }
}

fn format_timestamp(timestamp: u32) -> String {
    match DateTime::from_timestamp(i64::from(timestamp), 0) {
        Some(date) => format!("{} ({timestamp})", date.format("%Y-%m-%d %H:%M UTC")),
        None => timestamp.to_string(),
    }
}

/// Status notifications collected between two steps of a session.
#[derive(Default)]
struct ConsoleSink {
    statuses: Vec<Status>,
    offset: u32,
}

impl NotificationSink for ConsoleSink {
    fn notify_status(&mut self, status: Status) {
        self.statuses.push(status);
    }

    fn notify_mem_info(&mut self, offset: u32) {
        self.offset = offset;
    }
}

/// No BLE link: reboot requests are ignored.
struct OfflineLink;

impl Platform for OfflineLink {
    fn is_connected(&self) -> bool {
        false
    }

    fn disconnect(&mut self) {}

    fn reset(&mut self) {}
}

type OfflineReceiver<'a> = Receiver<RamMemory<'a>, ConsoleSink, OfflineLink>;

/// Fail on the first error status reported since the last check, else
/// return the last status.
fn check_statuses(rx: &mut OfflineReceiver<'_>, step: &str) -> Result<Option<Status>> {
    let statuses = std::mem::take(&mut rx.sink_mut().statuses);
    if let Some(status) = statuses.iter().find(|s| s.is_error()) {
        bail!("{step} rejected: {status} (0x{:02x})", *status as u8);
    }
    Ok(statuses.last().copied())
}

fn status_text(status: Option<Status>) -> String {
    status.map_or_else(|| "no status".to_string(), |s| s.to_string())
}

/// Replay a SUOTA transfer of `image_path` into the dump.
pub fn push(
    dump_path: &Path,
    image_path: &Path,
    bank: u8,
    block_size: usize,
    memory: MemoryArg,
    product_header: u32,
) -> Result<()> {
    let mut dump =
        fs::read(dump_path).with_context(|| format!("Failed to read {}", dump_path.display()))?;
    let file =
        fs::read(image_path).with_context(|| format!("Failed to read {}", image_path.display()))?;
    let header = image::parse_image(&file)?;
    let image = &file[..header.image_len() as usize];

    println!(
        "Image:    {} ({} bytes, version {})",
        image_path.display(),
        image.len(),
        header.version_str().unwrap_or("?")
    );

    let (mem, mem_type) = match memory {
        MemoryArg::Spi => (RamMemory::spi_flash(&mut dump), MEM_DEV_IMG_SPI_FLASH),
        MemoryArg::Eeprom => (RamMemory::i2c_eeprom(&mut dump), MEM_DEV_IMG_I2C_EEPROM),
    };
    let config = ReceiverConfig {
        product_header_addr: product_header,
        ..ReceiverConfig::default()
    };
    let mut rx = Receiver::new(mem, ConsoleSink::default(), OfflineLink, config);

    print!("Starting session... ");
    std::io::stdout().flush()?;
    rx.dispatch_command(Command::MemDev(mem_dev_word(mem_type, u32::from(bank))));
    let status = check_statuses(&mut rx, "Memory device")?;
    println!("{}", status_text(status));

    let mut stream = image.to_vec();
    stream.push(running_xor_checksum(0, image));

    let pb = ProgressBar::new(image.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta}) {msg}",
            )?
            .progress_chars("#>-"),
    );

    for (i, block) in stream.chunks(block_size).enumerate() {
        rx.dispatch_command(Command::PatchLen(block.len() as u16));
        for write in block.chunks(SUOTA_PD_CHAR_SIZE) {
            rx.dispatch_command(Command::PatchData(write));
        }
        match check_statuses(&mut rx, &format!("Block {i}")) {
            Ok(status) => pb.set_message(status_text(status)),
            Err(e) => {
                pb.abandon();
                return Err(e);
            }
        }
        pb.set_position(u64::from(rx.sink().offset));
    }
    pb.finish_with_message("Transfer complete");
    println!();

    let target = rx.state().target_bank;
    print!("Finalizing... ");
    std::io::stdout().flush()?;
    rx.dispatch_command(Command::MemDev(mem_dev_word(SUOTAR_IMG_END, 0)));
    let status = check_statuses(&mut rx, "Image end")?;
    println!("{}", status_text(status));
    drop(rx);

    fs::write(dump_path, &dump)
        .with_context(|| format!("Failed to write {}", dump_path.display()))?;

    if let Some(bank) = target {
        println!("Image written to {bank}.");
    }
    println!("Run 'suota-image inspect {}' to check the result.", dump_path.display());
    Ok(())
}
