// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Decoding of the 32-bit GPIO map written by the peer.
//!
//! Each pad is one byte: port in the high nibble, pin in the low nibble.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GpioPad {
    pub port: u8,
    pub pin: u8,
}

impl GpioPad {
    pub const fn from_byte(byte: u8) -> Self {
        Self {
            port: byte >> 4,
            pin: byte & 0x0F,
        }
    }
}

fn pad_at(map: u32, byte: u32) -> GpioPad {
    GpioPad::from_byte((map >> (byte * 8)) as u8)
}

/// SPI flash pads, byte 0 to 3: clk, cs, mosi, miso.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SpiPins {
    pub clk: GpioPad,
    pub cs: GpioPad,
    pub mosi: GpioPad,
    pub miso: GpioPad,
}

impl SpiPins {
    pub fn decode(map: u32) -> Self {
        Self {
            clk: pad_at(map, 0),
            cs: pad_at(map, 1),
            mosi: pad_at(map, 2),
            miso: pad_at(map, 3),
        }
    }
}

/// I2C EEPROM pads and bus address: sda in byte 0, scl in byte 1, address in the upper half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct I2cPins {
    pub sda: GpioPad,
    pub scl: GpioPad,
    pub slave_addr: u16,
}

impl I2cPins {
    pub fn decode(map: u32) -> Self {
        Self {
            sda: pad_at(map, 0),
            scl: pad_at(map, 1),
            slave_addr: (map >> 16) as u16,
        }
    }
}
