//! Whole-pipeline integration tests: synthesize raw LBR bytes, drive them
//! through the classifier/decoder dispatch, assign on-disk names, and write
//! the result to a temporary directory — exercising `driver`, `naming`, and
//! `sink` together the way the unit tests next to each module, which stop at
//! the `Content` tree, don't.

use std::fs;

use mlbr::content::{Content, Kind};
use mlbr::crc::crc16;
use mlbr::driver::{process_file, DriverOptions};
use mlbr::naming::CollisionTable;
use mlbr::sink::mapping::{assign_names, finalize_info_file, new_info_file};
use mlbr::sink::tree::save_tree;

const SECTOR: usize = 128;
const REC: usize = 32;

// Mirrors the private `field` offsets in `src/lbr.rs` (`mlbr.h`'s directory
// record layout); duplicated here since integration tests only see the
// public API.
mod field {
    pub const NAME: usize = 1;
    pub const EXT: usize = 9;
    pub const INDEX: usize = 12;
    pub const LENGTH: usize = 14;
    pub const CRC: usize = 16;
}

fn default_opts() -> DriverOptions {
    DriverOptions {
        force: false,
        recurse: true,
        ignore_crc: false,
        ignore_corrupt: false,
    }
}

/// Builds a one-sector LBR directory with up to three member records (the
/// rest marked deleted), returning the raw directory bytes with a correct
/// whole-directory CRC.
fn build_directory(records: &[(&str, u16, u16, u16)]) -> Vec<u8> {
    let mut dir = vec![0u8; SECTOR];
    for i in field::NAME..field::INDEX {
        dir[i] = b' ';
    }
    dir[field::LENGTH] = 1;

    for (slot, (name, index, len_sectors, crc)) in records.iter().enumerate() {
        let off = REC * (slot + 1);
        let (stem, ext) = name.split_once('.').unwrap_or((name, ""));
        dir[off + field::NAME..off + field::EXT].copy_from_slice(format!("{stem:<8}").as_bytes());
        dir[off + field::EXT..off + field::EXT + 3].copy_from_slice(format!("{ext:<3}").as_bytes());
        dir[off + field::INDEX] = *index as u8;
        dir[off + field::LENGTH] = *len_sectors as u8;
        dir[off + field::CRC..off + field::CRC + 2].copy_from_slice(&crc.to_le_bytes());
    }
    for slot in records.len()..3 {
        dir[REC * (slot + 1)] = 0xE5;
    }

    let mut for_crc = dir.clone();
    for_crc[field::CRC] = 0;
    for_crc[field::CRC + 1] = 0;
    let dir_crc = crc16(&for_crc);
    dir[field::CRC..field::CRC + 2].copy_from_slice(&dir_crc.to_le_bytes());
    dir
}

#[test]
fn nested_lbr_extracted_with_recursion_flattens_siblings_under_one_directory() {
    let nested_body = vec![b'B'; SECTOR];
    let nested_dir = build_directory(&[("NESTED.TXT", 1, 1, crc16(&nested_body))]);
    let mut inner_bytes = nested_dir;
    inner_bytes.extend_from_slice(&nested_body);
    assert_eq!(inner_bytes.len(), 2 * SECTOR);

    let direct_body = vec![b'A'; SECTOR];
    let outer_dir = build_directory(&[
        ("DIRECT.TXT", 1, 1, crc16(&direct_body)),
        ("INNER.LBR", 2, 2, crc16(&inner_bytes)),
    ]);
    let mut outer_bytes = outer_dir;
    outer_bytes.extend_from_slice(&direct_body);
    outer_bytes.extend_from_slice(&inner_bytes);
    assert_eq!(outer_bytes.len(), 4 * SECTOR);

    let mut root = Content::new(Kind::Stored, &outer_bytes, "archive.lbr".into(), None);
    let valid = process_file(&mut root, 0, &default_opts());
    assert_eq!(valid, 2);
    assert_eq!(root.kind, Kind::Library);
    assert_eq!(root.children.len(), 2);
    assert_eq!(root.children[1].kind, Kind::Library);
    assert_eq!(root.children[1].children[0].output.fname.as_deref(), Some("nested.txt"));

    let dir = tempfile::tempdir().unwrap();
    let mut table = CollisionTable::new();
    let mut info = new_info_file("archive.lbr");
    // Flattening every level (`flatten = true`) is what plain `-x` extract
    // and `-d --no-expand` both want: nested library members land beside
    // the outer archive's own direct members instead of in a subdirectory
    // of their own.
    for child in &mut root.children {
        assign_names(child, dir.path(), &mut table, true, &mut info);
    }
    finalize_info_file(&mut info, dir.path(), &mut table);

    assert!(save_tree(&root.children[0]));
    assert!(save_tree(&root.children[1]));

    assert_eq!(fs::read(dir.path().join("direct.txt")).unwrap(), direct_body);
    assert_eq!(fs::read(dir.path().join("nested.txt")).unwrap(), nested_body);
    assert!(!dir.path().join("inner").exists());
}

#[test]
fn truncated_plain_member_is_still_stored_with_truncated_status() {
    // A member declaring 2 sectors (256 bytes) but with only 1 sector (128
    // bytes) actually present in the archive. Plain (non-compressed) stored
    // members are never dropped for truncation alone — only a failed
    // *decode* of a compressed member triggers the skip-unless-forced path
    // — so this stays `Stored` with the truncation recorded in `status`.
    let body = vec![b'X'; SECTOR];
    let dir = build_directory(&[("TRUNC.TXT", 1, 2, crc16(&body))]);
    let mut bytes = dir;
    bytes.extend_from_slice(&body);

    let mut root = Content::new(Kind::Stored, &bytes, "archive.lbr".into(), None);
    let valid = process_file(&mut root, 0, &default_opts());
    assert_eq!(valid, 1);
    assert_eq!(root.children[0].kind, Kind::Stored);
    assert!(root.children[0].status.contains(mlbr::content::Status::TRUNCATED));
    assert_eq!(root.children[0].input.buf.len(), SECTOR);
}
