// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Image file construction.

use anyhow::{bail, Context, Result};

use suota_common::checksum::crc32_checksum;
use suota_common::layout::{
    ImageHeader, ProductHeader, IMAGE_HEADER_SIGNATURE, IMAGE_ID_UNSET, PRODUCT_HEADER_SIZE,
};
use suota_common::{IMAGE_HEADER_SIZE, STATUS_VALID_IMAGE};

use crate::version_file::VersionInfo;

/// Highest end offset of a multi-bank image.
pub const MULTI_IMAGE_LIMIT: u32 = 0x10_0000;

/// Image id of the first bank in a multi-bank image, so that it boots first.
const MULTI_ID_FIRST: u8 = 1;
const MULTI_ID_SECOND: u8 = 0;

/// Header for `code`, marked valid, with the image id left unset.
pub fn header_for(code: &[u8], info: &VersionInfo) -> Result<ImageHeader> {
    let mut header = ImageHeader::erased();
    header.signature = IMAGE_HEADER_SIGNATURE;
    header.validflag = STATUS_VALID_IMAGE;
    header.imageid = IMAGE_ID_UNSET;
    header.code_size = u32::try_from(code.len()).context("code larger than 4 GiB")?;
    header.crc = crc32_checksum(code);
    header.set_version(&info.version);
    header.timestamp = info.timestamp;
    header.encryption = 0;
    Ok(header)
}

/// Header followed by `code`.
pub fn single_image(code: &[u8], info: &VersionInfo) -> Result<Vec<u8>> {
    let header = header_for(code, info)?;
    let mut out = Vec::with_capacity(IMAGE_HEADER_SIZE + code.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(code);
    Ok(out)
}

/// Parse and check the header of a single image file.
pub fn parse_image(file: &[u8]) -> Result<ImageHeader> {
    let header = ImageHeader::parse(file).context("file shorter than an image header")?;
    if !header.has_signature() {
        bail!("not an image file (signature {:02x?})", header.signature);
    }
    let expected = header.image_len() as usize;
    if file.len() < expected {
        bail!(
            "image truncated: header announces {} bytes, file has {}",
            expected,
            file.len()
        );
    }
    Ok(header)
}

/// Flash layout with two images and a product header pointing at them.
///
/// Gaps are filled with `0xFF`. The first image is given the higher id so
/// the boot loader starts it.
pub fn multi_image(img1: &[u8], off1: u32, img2: &[u8], off2: u32, off3: u32) -> Result<Vec<u8>> {
    if !(off1 < off2 && off2 < off3) {
        bail!("offsets must be increasing: off1=0x{off1:x}, off2=0x{off2:x}, off3=0x{off3:x}");
    }
    if off3 > MULTI_IMAGE_LIMIT {
        bail!("off3=0x{off3:x} is beyond the 0x{MULTI_IMAGE_LIMIT:x} limit");
    }

    let header1 = parse_image(img1).context("image 1")?;
    let header2 = parse_image(img2).context("image 2")?;
    let len1 = header1.image_len();
    let len2 = header2.image_len();
    if off1 + len1 > off2 {
        bail!("image 1 ({len1} bytes) does not fit before off2=0x{off2:x}");
    }
    if off2 + len2 > off3 {
        bail!("image 2 ({len2} bytes) does not fit before off3=0x{off3:x}");
    }

    let mut out = vec![0xFF; off3 as usize + PRODUCT_HEADER_SIZE];
    place(&mut out, off1, &img1[..len1 as usize], MULTI_ID_FIRST);
    place(&mut out, off2, &img2[..len2 as usize], MULTI_ID_SECOND);
    let product = ProductHeader::new(off1, off2).to_bytes();
    out[off3 as usize..].copy_from_slice(&product);
    Ok(out)
}

fn place(out: &mut [u8], offset: u32, image: &[u8], imageid: u8) {
    let at = offset as usize;
    out[at..at + image.len()].copy_from_slice(image);
    out[at + 3] = imageid;
}

#[cfg(test)]
mod tests {
    use super::*;
    use suota_common::CODE_OFFSET;

    fn info(version: &str) -> VersionInfo {
        VersionInfo {
            version: version.to_string(),
            timestamp: 1_593_539_760,
        }
    }

    #[test]
    fn test_single_image_header() {
        let code: Vec<u8> = (0..100u8).collect();
        let file = single_image(&code, &info("6.0.14.1114")).unwrap();

        assert_eq!(file.len(), 164);
        assert_eq!(&file[..4], &[0x70, 0x51, 0xAA, 0xFF]);
        assert_eq!(&file[4..8], &100u32.to_le_bytes());
        assert_eq!(&file[8..12], &crc32_checksum(&code).to_le_bytes());
        assert_eq!(&file[12..24], b"6.0.14.1114\0");
        assert_eq!(&file[28..32], &1_593_539_760u32.to_le_bytes());
        assert_eq!(file[32], 0);
        assert!(file[33..64].iter().all(|&b| b == 0xFF));
        assert_eq!(&file[64..], &code[..]);
    }

    #[test]
    fn test_long_version_truncated() {
        let header = header_for(&[1, 2, 3], &info("0123456789abcdefXYZ")).unwrap();
        assert_eq!(header.version_str(), Some("0123456789abcde"));
    }

    #[test]
    fn test_parse_image_rejects_truncated_file() {
        let file = single_image(&[0u8; 32], &info("1.0")).unwrap();
        assert!(parse_image(&file).is_ok());
        assert!(parse_image(&file[..80]).is_err());
        assert!(parse_image(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_multi_image_layout() {
        let img1 = single_image(&[0x11; 200], &info("1.0")).unwrap();
        let img2 = single_image(&[0x22; 300], &info("2.0")).unwrap();

        let out = multi_image(&img1, 0x1000, &img2, 0x2000, 0x3000).unwrap();

        assert_eq!(out.len(), 0x3000 + 12);
        assert!(out[..0x1000].iter().all(|&b| b == 0xFF));
        assert_eq!(out[0x1003], 1);
        assert_eq!(out[0x2003], 0);
        assert_eq!(&out[0x1000 + CODE_OFFSET as usize..0x1000 + 264], &[0x11; 200][..]);
        assert_eq!(out[0x1000 + 264], 0xFF);

        let product = ProductHeader::from_bytes(out[0x3000..].try_into().unwrap());
        assert!(product.is_valid());
        assert_eq!((product.offset1, product.offset2), (0x1000, 0x2000));
    }

    #[test]
    fn test_multi_image_offset_checks() {
        let img = single_image(&[0u8; 0x100], &info("1.0")).unwrap();

        assert!(multi_image(&img, 0x2000, &img, 0x1000, 0x3000).is_err());
        assert!(multi_image(&img, 0x1000, &img, 0x2000, 0x2000).is_err());
        assert!(multi_image(&img, 0x1000, &img, 0x2000, 0x10_0001).is_err());
        assert!(multi_image(&img, 0x1000, &img, 0x1100, 0x3000).is_err());
        assert!(multi_image(&img, 0x1000, &img, 0x1140, 0x1280).is_ok());
    }
}
