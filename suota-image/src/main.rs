// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Host tool for SUOTA dual-bank images: build single and multi-bank images,
//! inspect flash dumps, and replay an over-the-air update against a dump.

mod cli;
mod commands;
mod image;
mod version_file;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    cli::run(cli::Cli::parse())
}
