// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Tests for the update-time and boot-time bank selection policies.

use suota_common::bank::{
    find_latest, find_old_img, next_image_id, select_active_bank, select_target_bank, SelectError,
};
use suota_common::{Bank, ImageBank, Validity};

#[test]
fn test_single_invalid_header_always_selected_for_update() {
    for id1 in 0..=255u8 {
        for id2 in [0u8, 1, 0x7F, 0xFE, 0xFF] {
            assert_eq!(
                select_target_bank(ImageBank::Any, Validity::Invalid, Validity::Ok, id1, id2),
                Ok(Bank::First)
            );
            assert_eq!(
                select_target_bank(ImageBank::Any, Validity::Ok, Validity::Invalid, id1, id2),
                Ok(Bank::Second)
            );
        }
    }
}

#[test]
fn test_single_valid_header_always_selected_for_boot() {
    for id1 in 0..=255u8 {
        for id2 in 0..=255u8 {
            assert_eq!(select_active_bank(true, false, id1, id2), Ok(Bank::First));
            assert_eq!(select_active_bank(false, true, id1, id2), Ok(Bank::Second));
        }
    }
}

#[test]
fn test_no_valid_header_fails_boot() {
    assert_eq!(
        select_active_bank(false, false, 1, 2),
        Err(SelectError::NoValidImage)
    );
}

#[test]
fn test_boot_picks_larger_id() {
    for id1 in 0..=255u8 {
        for id2 in 0..=255u8 {
            let sentinel = matches!((id1, id2), (0xFF, 0xFF) | (0xFF, 0) | (0, 0xFF));
            if sentinel {
                continue;
            }
            let expected = if id1 >= id2 { Bank::First } else { Bank::Second };
            assert_eq!(select_active_bank(true, true, id1, id2), Ok(expected));
        }
    }
}

#[test]
fn test_find_latest_sentinels() {
    assert_eq!(find_latest(0xFF, 0xFF), Bank::Second);
    assert_eq!(find_latest(0xFF, 0), Bank::Second);
    assert_eq!(find_latest(0, 0xFF), Bank::First);
    assert_eq!(find_latest(0xFF, 1), Bank::First);
    assert_eq!(find_latest(3, 3), Bank::First);
}

#[test]
fn test_find_old_img_sentinels() {
    assert_eq!(find_old_img(0xFF, 0xFF), Bank::Second);
    assert_eq!(find_old_img(0xFF, 0), Bank::First);
    assert_eq!(find_old_img(0, 0xFF), Bank::Second);
    assert_eq!(find_old_img(5, 4), Bank::Second);
    assert_eq!(find_old_img(4, 5), Bank::First);
    assert_eq!(find_old_img(4, 4), Bank::First);
}

#[test]
fn test_old_is_other_than_latest_for_distinct_ids() {
    // For distinct ordinary ids, the bank to overwrite is the one not booted.
    for id1 in 0..0xFFu8 {
        for id2 in 0..0xFFu8 {
            if id1 != id2 {
                assert_eq!(find_old_img(id1, id2), find_latest(id1, id2).other());
            }
        }
    }
}

#[test]
fn test_update_replaces_older_bank() {
    assert_eq!(
        select_target_bank(ImageBank::Any, Validity::Ok, Validity::Ok, 7, 8),
        Ok(Bank::First)
    );
    assert_eq!(
        select_target_bank(ImageBank::Any, Validity::Ok, Validity::Ok, 8, 7),
        Ok(Bank::Second)
    );
}

#[test]
fn test_update_both_invalid_prefers_first() {
    assert_eq!(
        select_target_bank(ImageBank::Any, Validity::Invalid, Validity::Invalid, 0, 0),
        Ok(Bank::First)
    );
}

#[test]
fn test_forced_bank_is_honored() {
    assert_eq!(
        select_target_bank(ImageBank::Second, Validity::Invalid, Validity::Ok, 0, 9),
        Ok(Bank::Second)
    );
    assert_eq!(
        select_target_bank(ImageBank::First, Validity::Ok, Validity::Invalid, 9, 0),
        Ok(Bank::First)
    );
}

#[test]
fn test_same_version_rejected_even_when_forced() {
    assert_eq!(
        select_target_bank(ImageBank::First, Validity::SameVersion, Validity::Ok, 1, 2),
        Err(SelectError::SameImage)
    );
    assert_eq!(
        select_target_bank(ImageBank::Any, Validity::Ok, Validity::SameVersion, 2, 1),
        Err(SelectError::SameImage)
    );
}

#[test]
fn test_same_version_in_other_bank_is_not_a_conflict() {
    assert_eq!(
        select_target_bank(ImageBank::Any, Validity::Ok, Validity::SameVersion, 1, 2),
        Ok(Bank::First)
    );
}

#[test]
fn test_next_image_id_wraps() {
    assert_eq!(next_image_id(0), 1);
    assert_eq!(next_image_id(0xFE), 0xFF);
    assert_eq!(next_image_id(0xFF), 0);
}

#[test]
fn test_image_bank_from_raw() {
    assert_eq!(ImageBank::from_raw(0), Some(ImageBank::Any));
    assert_eq!(ImageBank::from_raw(2), Some(ImageBank::Second));
    assert_eq!(ImageBank::from_raw(3), None);
    assert_eq!(ImageBank::Any.forced(), None);
    assert_eq!(ImageBank::First.forced(), Some(Bank::First));
}
