//! LBR container directory parser, ported from `ulbr.c`'s `parseLbr`.
//!
//! Entered once the driver has classified a node as a `Library`: the node's
//! input view still covers the raw archive bytes untouched (unlike the three
//! compressed formats, LBR has no magic-consuming header parser of its own).

use crate::config::{LBRDIR_SIZE, LBR_SECTOR_SIZE};
use crate::content::{Content, Kind, Status, Timestamp};
use crate::crc::crc16;
use crate::timestamp::{cpm_to_os_time, unpack_dos_time};

/// Byte offsets within one 32-byte directory record, mirroring the `enum` in
/// `mlbr.h`.
mod field {
    pub const STATUS: usize = 0;
    pub const NAME: usize = 1;
    pub const EXT: usize = 9;
    pub const INDEX: usize = 12;
    pub const LENGTH: usize = 14;
    pub const CRC: usize = 16;
    pub const CREATE_DATE: usize = 18;
    pub const CHANGE_DATE: usize = 20;
    pub const CHANGE_TIME: usize = 24;
}

fn u16_at(buf: &[u8], offset: usize) -> u16 {
    buf[offset] as u16 | (buf[offset + 1] as u16) << 8
}

/// True iff `buf` opens with the reserved "entry 0" layout that identifies
/// an LBR directory: status byte 0, eleven space-padded name/ext bytes, and
/// a zero index word. The magic 16-bit word `0x2000` the driver checks first
/// is just this same status byte plus the first padding space read as one
/// little-endian word, so the two checks always agree by construction.
pub fn has_directory_signature(buf: &[u8]) -> bool {
    buf.len() >= LBR_SECTOR_SIZE
        && buf[field::STATUS] == 0
        && buf[field::NAME..field::INDEX].iter().all(|&b| b == b' ')
        && u16_at(buf, field::INDEX) == 0
}

/// Reconstructs the `NAME.EXT` filename from a directory record, stripping
/// the high bit CP/M sometimes sets on name bytes and dropping the extension
/// entirely when it is all spaces, mirroring `getLbrName`.
fn record_name(rec: &[u8]) -> String {
    let name_len = rec[field::NAME..field::EXT]
        .iter()
        .position(|&b| b & 0x7f == b' ')
        .unwrap_or(field::EXT - field::NAME);
    let mut raw: Vec<u8> = rec[field::NAME..field::NAME + name_len]
        .iter()
        .map(|&b| b & 0x7f)
        .collect();
    if rec[field::EXT] & 0x7f != b' ' {
        let ext_len = rec[field::EXT..field::EXT + 3]
            .iter()
            .position(|&b| b & 0x7f == b' ')
            .unwrap_or(3);
        raw.push(b'.');
        raw.extend(rec[field::EXT..field::EXT + ext_len].iter().map(|&b| b & 0x7f));
    }
    crate::naming::map_case(&raw.iter().map(|&b| b as char).collect::<String>())
}

/// The record's preferred timestamp: change date/time if the change date is
/// non-zero, else create date — but the time field is always `ChangeTime`
/// in both cases, faithfully reproducing `getLbrTime`'s apparent oversight
/// rather than silently correcting it.
fn record_time(rec: &[u8]) -> Option<Timestamp> {
    let change_day = u16_at(rec, field::CHANGE_DATE);
    let day = if change_day != 0 { change_day } else { u16_at(rec, field::CREATE_DATE) };
    if day == 0 {
        return None;
    }
    cpm_to_os_time(day as u32, unpack_dos_time(u16_at(rec, field::CHANGE_TIME)))
}

/// Parses the LBR directory embedded in `content.input.buf`, populating
/// `content.children` in original (forward) order — iterating the records
/// front-to-back and pushing already yields that order, so unlike the
/// original's back-to-front head-insert into a singly linked list, no
/// reversal step is needed. Returns `false` when the declared directory
/// size is unusable (bigger than the archive, or not even one record long),
/// in which case the caller leaves the node as an ordinary `Stored` file.
pub fn parse_lbr<'a>(content: &mut Content<'a>) -> bool {
    let buf = content.input.buf;
    let dir_size = u16_at(buf, field::LENGTH) as usize * LBR_SECTOR_SIZE;
    if dir_size < LBRDIR_SIZE || dir_size > buf.len() {
        return false;
    }

    let declared_crc = u16_at(buf, field::CRC);
    let mut dir_copy = buf[..dir_size].to_vec();
    dir_copy[field::CRC] = 0;
    dir_copy[field::CRC + 1] = 0;
    if crc16(&dir_copy) != declared_crc {
        content.status.insert(no_crc_or_bad(declared_crc));
    }

    let mut children = Vec::new();
    let mut off = LBRDIR_SIZE;
    while off < dir_size {
        let rec = &buf[off..off + LBRDIR_SIZE];
        if rec[field::STATUS] == 0 {
            children.push(make_member(buf, rec));
        }
        off += LBRDIR_SIZE;
    }

    content.children = children;
    true
}

fn no_crc_or_bad(declared: u16) -> Status {
    if declared != 0 && declared != 0xFFFF {
        Status::BAD_CRC
    } else {
        Status::NO_CRC
    }
}

fn make_member<'a>(archive: &'a [u8], rec: &[u8]) -> Content<'a> {
    let index = u16_at(rec, field::INDEX) as usize;
    let expected_len = u16_at(rec, field::LENGTH) as usize * LBR_SECTOR_SIZE;
    let start = index * LBR_SECTOR_SIZE;
    let name = record_name(rec);
    let fdate = record_time(rec);

    let available = archive.len().saturating_sub(start);
    let actual_len = available.min(expected_len);
    let slice = if start <= archive.len() {
        &archive[start..start + actual_len]
    } else {
        &archive[archive.len()..archive.len()]
    };

    let mut child = Content::new(Kind::Stored, slice, name, fdate);
    child.expected_length = expected_len;
    child.output.fdate = fdate;
    child.status.insert(Status::INCONTAINER);

    if actual_len < expected_len {
        child.status.insert(Status::TRUNCATED);
        if start >= archive.len() {
            let name = child.input.fname.clone();
            child.log_err(format!("!! {name} missing all data\n"));
        } else {
            let name = child.input.fname.clone();
            let missing = expected_len - actual_len;
            child.log_err(format!("!! {name} missing {missing} bytes of data\n"));
        }
    }

    let member_crc = u16_at(rec, field::CRC);
    if crc16(child.input.buf) != member_crc {
        child.status.insert(no_crc_or_bad(member_crc));
    }

    child
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a minimal one-member LBR: a one-sector directory (entry 0 plus
    /// one member record), CRC computed with entry 0's CRC bytes zeroed, and
    /// the member's own 128-byte body.
    fn one_member_lbr(member_crc: u16, body: &[u8; 128]) -> Vec<u8> {
        let mut dir = vec![0u8; LBR_SECTOR_SIZE];
        // entry 0: status 0, name/ext all spaces, index/length = 1 sector.
        for i in field::NAME..field::INDEX {
            dir[i] = b' ';
        }
        dir[field::LENGTH] = 1;
        // member record at offset 32: HELLO.TXT, index 1 (sector 1), length 1.
        let rec_off = LBRDIR_SIZE;
        dir[rec_off + field::STATUS] = 0;
        dir[rec_off + field::NAME..rec_off + field::EXT].copy_from_slice(b"HELLO   ");
        dir[rec_off + field::EXT..rec_off + field::EXT + 3].copy_from_slice(b"TXT");
        dir[rec_off + field::INDEX] = 1;
        dir[rec_off + field::LENGTH] = 1;
        dir[rec_off + field::CRC..rec_off + field::CRC + 2].copy_from_slice(&member_crc.to_le_bytes());

        let mut dir_for_crc = dir.clone();
        dir_for_crc[field::CRC] = 0;
        dir_for_crc[field::CRC + 1] = 0;
        let dir_crc = crc16(&dir_for_crc);
        dir[field::CRC..field::CRC + 2].copy_from_slice(&dir_crc.to_le_bytes());

        let mut buf = dir;
        buf.extend_from_slice(body);
        buf
    }

    #[test]
    fn single_member_parses_with_matching_crcs() {
        let body = [b'A'; 128];
        let bytes = one_member_lbr(crc16(&body), &body);
        let mut c = Content::new(Kind::Library, &bytes, "a.lbr".into(), None);
        assert!(parse_lbr(&mut c));
        assert!(!c.status.contains(Status::BAD_CRC));
        assert_eq!(c.children.len(), 1);
        assert_eq!(c.children[0].output.fname.as_deref(), Some("hello.txt"));
        assert_eq!(c.children[0].input.buf.len(), 128);
        assert!(!c.children[0].status.contains(Status::TRUNCATED));
    }

    #[test]
    fn wrong_member_crc_is_flagged() {
        let body = [b'A'; 128];
        let bytes = one_member_lbr(0x1234, &body);
        let mut c = Content::new(Kind::Library, &bytes, "a.lbr".into(), None);
        assert!(parse_lbr(&mut c));
        assert!(c.children[0].status.contains(Status::BAD_CRC));
    }

    #[test]
    fn zero_member_crc_is_no_crc_not_bad_crc() {
        let body = [b'A'; 128];
        let bytes = one_member_lbr(0, &body);
        let mut c = Content::new(Kind::Library, &bytes, "a.lbr".into(), None);
        assert!(parse_lbr(&mut c));
        assert!(c.children[0].status.contains(Status::NO_CRC));
        assert!(!c.children[0].status.contains(Status::BAD_CRC));
    }

    #[test]
    fn directory_larger_than_buffer_is_rejected() {
        let mut bytes = vec![0u8; LBR_SECTOR_SIZE];
        bytes[field::LENGTH] = 2; // declares 2 sectors but only 1 is present
        let mut c = Content::new(Kind::Library, &bytes, "a.lbr".into(), None);
        assert!(!parse_lbr(&mut c));
    }

    #[test]
    fn truncated_member_sets_truncated_status_and_actual_length() {
        // Declare a member needing 2 sectors (256 bytes) but only supply 1
        // sector (128 bytes) of archive body after the directory.
        let mut dir = vec![0u8; LBR_SECTOR_SIZE];
        for i in field::NAME..field::INDEX {
            dir[i] = b' ';
        }
        dir[field::LENGTH] = 1;
        let rec_off = LBRDIR_SIZE;
        dir[rec_off + field::NAME..rec_off + field::EXT].copy_from_slice(b"TRUNC   ");
        dir[rec_off + field::EXT..rec_off + field::EXT + 3].copy_from_slice(b"TXT");
        dir[rec_off + field::INDEX] = 1;
        dir[rec_off + field::LENGTH] = 2; // declares 2 sectors
        let mut dir_for_crc = dir.clone();
        dir_for_crc[field::CRC] = 0;
        dir_for_crc[field::CRC + 1] = 0;
        let dir_crc = crc16(&dir_for_crc);
        dir[field::CRC..field::CRC + 2].copy_from_slice(&dir_crc.to_le_bytes());

        let mut bytes = dir;
        bytes.extend_from_slice(&[b'X'; 128]); // only one sector present

        let mut c = Content::new(Kind::Library, &bytes, "a.lbr".into(), None);
        assert!(parse_lbr(&mut c));
        assert_eq!(c.children.len(), 1);
        assert!(c.children[0].status.contains(Status::TRUNCATED));
        assert_eq!(c.children[0].input.buf.len(), 128);
        assert_eq!(c.children[0].msg.as_deref(), Some("!! trunc.txt missing 128 bytes of data\n"));
    }
}
