// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Version and build date from an SDK version header.
//!
//! ```text
//! #define SDK_VERSION "v_6.0.14.1114"
//! #define SDK_VERSION_DATE "2020-06-30 17:56 "
//! ```

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDateTime;

const VERSION_KEY: &str = "SDK_VERSION ";
const DATE_KEY: &str = "SDK_VERSION_DATE ";
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// What goes into the version and timestamp fields of an image header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    pub version: String,
    /// Seconds since the Unix epoch.
    pub timestamp: u32,
}

pub fn read(path: &Path) -> Result<VersionInfo> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    parse(&text).with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn parse(text: &str) -> Result<VersionInfo> {
    let mut version = None;
    let mut date = None;

    for line in text.lines() {
        if version.is_none() {
            version = line.find(VERSION_KEY).and_then(|at| quoted(&line[at..]));
        }
        if date.is_none() {
            date = line.find(DATE_KEY).and_then(|at| quoted(&line[at..]));
        }
    }

    let version = version.ok_or_else(|| anyhow!("no SDK_VERSION string"))?;
    let date = date.ok_or_else(|| anyhow!("no SDK_VERSION_DATE string"))?;
    Ok(VersionInfo {
        version: version.strip_prefix("v_").unwrap_or(version).to_string(),
        timestamp: parse_date(date)?,
    })
}

/// Seconds since the epoch for a `YYYY-MM-DD HH:MM` date, read as UTC.
pub fn parse_date(date: &str) -> Result<u32> {
    let parsed = NaiveDateTime::parse_from_str(date.trim(), DATE_FORMAT)
        .with_context(|| format!("invalid date '{date}', expected YYYY-MM-DD HH:MM"))?;
    u32::try_from(parsed.and_utc().timestamp())
        .with_context(|| format!("date '{date}' does not fit a 32-bit timestamp"))
}

/// Text between the first pair of double quotes.
fn quoted(s: &str) -> Option<&str> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    Some(&s[start..start + len])
}
