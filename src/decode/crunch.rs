//! Crunch decoder: adaptive LZW in two dialects (V1, V2) sharing one table
//! shape, ported from `uncrunch.c`.
//!
//! Per spec.md §5 / §9, the original's file-static `table`/`xlatbl` arrays
//! become an owned `LzwTables` value threaded through by `&mut` instead of
//! process-global state — the "mechanical transformation" the design notes
//! call for.

use crate::content::{Content, Kind};
use crate::crc::{crc16, sum_crc};
use crate::error::DecodeStatus;
use crate::header::parse_header;

const TABLE_SIZE: usize = 4096;
const XLATBL_SIZE: usize = 5003;
const MAXSTR: usize = 4096;

const NOPRED: u16 = 0x6fff;
const EMPTY: u16 = 0x8000;
const REFERENCED: u16 = 0x2000;
const IMPRED: u16 = 0x7fff;

const EOFCOD: u16 = 0x100;
const RSTCOD: u16 = 0x101;
const NULCOD: u16 = 0x102;
const SPRCOD: u16 = 0x103;

#[derive(Clone, Copy)]
struct Entry {
    predecessor: u16,
    suffix: u16,
}

/// The LZW main table plus its auxiliary hash-chain table, owned per decode
/// rather than held as file statics (`table`/`xlatbl` in `uncrunch.c`).
struct LzwTables {
    table: Vec<Entry>,
    xlatbl: Vec<u16>,
    is_v2: bool,
    code_len: u8,
    fulflg: u8,
    entry: u16,
    finchar: u8,
    /// `entflg` in `uncrunch.c`: suppresses the caller's `enterx` once,
    /// immediately after the table is (re)initialized, since the first code
    /// of a table's lifetime has `lastpr == NOPRED` and nothing real to
    /// insert as its predecessor. `decode` also sets this when it performs
    /// its own KwKwK pre-insertion, so the caller doesn't insert twice.
    entflg: bool,
}

impl LzwTables {
    fn new(is_v2: bool) -> Self {
        let mut t = LzwTables {
            table: vec![
                Entry {
                    predecessor: EMPTY,
                    suffix: EMPTY,
                };
                TABLE_SIZE
            ],
            xlatbl: vec![EMPTY; XLATBL_SIZE],
            is_v2,
            code_len: if is_v2 { 9 } else { 12 },
            fulflg: 0,
            entry: if is_v2 { 0 } else { 1 },
            finchar: 0,
            entflg: true,
        };
        t.init();
        t
    }

    fn init(&mut self) {
        self.code_len = if self.is_v2 { 9 } else { 12 };
        self.fulflg = 0;
        self.entry = if self.is_v2 { 0 } else { 1 };
        self.entflg = true;
        for x in self.xlatbl.iter_mut() {
            *x = EMPTY;
        }
        for e in self.table.iter_mut() {
            e.suffix = EMPTY;
            e.predecessor = EMPTY;
        }
        if !self.is_v2 {
            self.table[0].predecessor = IMPRED;
            self.table[0].suffix = IMPRED;
        }
        for i in 0..0x100u16 {
            self.enterx(if self.is_v2 { NOPRED } else { IMPRED }, i as u8);
        }
        if self.is_v2 {
            for _ in 0..4 {
                self.enterx(IMPRED, 0);
            }
        }
    }

    fn end_code(&self) -> u16 {
        if self.is_v2 {
            EOFCOD
        } else {
            0
        }
    }

    fn hash_v2(pred: u16, suff: u16) -> u16 {
        let suff = if suff == IMPRED { 0 } else { suff };
        ((((pred >> 4) & 0xff) ^ suff) | ((pred & 0xf) << 8)).wrapping_add(1)
    }

    fn hash_v1(pred: u16, chr: u16) -> u16 {
        if pred == IMPRED && chr == 0 {
            0x800
        } else {
            let a: u32 = ((pred as u32 + chr as u32) | 0x800) & 0x1fff;
            let b: u32 = a >> 1;
            (((b * (b + (a & 1))) >> 4) & 0xfff) as u16
        }
    }

    fn get_insert_pt_v1(&mut self, pred: u16, chr: u8) -> u16 {
        let mut hashval = Self::hash_v1(pred, chr as u16);
        while self.table[hashval as usize].suffix != EMPTY && self.xlatbl[hashval as usize] != EMPTY {
            hashval = self.xlatbl[hashval as usize];
        }
        if self.table[hashval as usize].suffix != EMPTY {
            let initial_hash = hashval;
            hashval = ((hashval as usize + 101) % TABLE_SIZE) as u16;
            while self.table[hashval as usize].suffix != EMPTY {
                hashval = ((hashval as usize + 1) % TABLE_SIZE) as u16;
            }
            self.xlatbl[initial_hash as usize] = hashval;
        }
        hashval
    }

    fn get_insert_pt_v2(&mut self, pred: u16, suff: u8) -> u16 {
        let hashval = Self::hash_v2(pred, suff as u16);
        let mut rehash = hashval as usize % XLATBL_SIZE;
        while self.xlatbl[rehash] != EMPTY {
            rehash = (rehash + hashval as usize) % XLATBL_SIZE;
        }
        self.xlatbl[rehash] = self.entry;
        self.entry
    }

    fn enterx(&mut self, pred: u16, suff: u8) {
        let insert_pt = if self.is_v2 {
            self.get_insert_pt_v2(pred, suff)
        } else {
            self.get_insert_pt_v1(pred, suff)
        };
        self.table[insert_pt as usize].suffix = suff as u16;
        if self.is_v2 || pred < MAXSTR as u16 {
            self.table[insert_pt as usize].predecessor = pred;
        }
        self.entry = self.entry.wrapping_add(1);
        let limit: u16 = !(!0u16 << self.code_len);
        if self.entry >= limit {
            if self.code_len < 12 {
                self.code_len += 1;
            } else {
                self.fulflg += 1;
            }
        }
    }

    /// `decode` in `uncrunch.c`: emits the byte string for `code`, inserting
    /// the pending `(lastpr, finchar)` entry first if `code` is the
    /// about-to-be-defined KwKwK case. Returns `entflg` (see the field doc),
    /// set here whenever the KwKwK pre-insertion fires; the caller clears it
    /// after consuming it.
    fn decode(&mut self, code: u16, content: &mut Content, lastpr: u16) -> Result<bool, ()> {
        let mut code = code;
        if self.table[code as usize].suffix == EMPTY {
            self.entflg = true;
            self.enterx(lastpr, self.finchar);
        }
        if self.is_v2 {
            self.table[code as usize].predecessor |= REFERENCED;
        }

        let mut stack = [0u8; MAXSTR];
        let mut sp = 0usize;
        while (!self.is_v2 && self.table[code as usize].predecessor != EMPTY) || (self.is_v2 && code > 255) {
            stack[sp] = self.table[code as usize].suffix as u8;
            sp += 1;
            code = self.table[code as usize].predecessor % TABLE_SIZE as u16;
            if sp >= MAXSTR {
                return Err(());
            }
        }

        self.finchar = self.table[code as usize].suffix as u8;
        content.out_rle(self.finchar as i32);
        while sp > 0 {
            sp -= 1;
            content.out_rle(stack[sp] as i32);
        }
        Ok(self.entflg)
    }

    fn entfil(&mut self, pred: u16, suff: u8) {
        let hashval = Self::hash_v2(pred, suff as u16);
        let mut curhash = hashval as usize % XLATBL_SIZE;
        while self.xlatbl[curhash] != EMPTY {
            let idx = self.xlatbl[curhash] as usize;
            if self.table[idx].predecessor & REFERENCED == 0 {
                self.table[idx].predecessor = pred;
                self.table[idx].suffix = suff as u16;
                break;
            }
            curhash = (curhash + hashval as usize) % XLATBL_SIZE;
        }
    }

    fn get_code(&self, content: &mut Content) -> Option<u16> {
        loop {
            let code = content.in_bits(self.code_len)?;
            if self.is_v2 && (code == NULCOD || code == SPRCOD) {
                continue;
            }
            if code == self.end_code() {
                return None;
            }
            return Some(code);
        }
    }
}

fn uncrunch_data(content: &mut Content, is_v2: bool) -> Result<LzwTables, ()> {
    let mut tables = LzwTables::new(is_v2);
    content.out_rle(-1);

    let mut lastpr = NOPRED;
    loop {
        let code = match tables.get_code(content) {
            Some(c) => c,
            None => break,
        };
        if is_v2 && code == RSTCOD {
            tables = LzwTables::new(is_v2);
            lastpr = NOPRED;
            continue;
        } else if tables.fulflg != 2 {
            let entflg = tables.decode(code, content, lastpr)?;
            if !entflg {
                tables.enterx(lastpr, tables.finchar);
            }
            tables.entflg = false;
        } else {
            tables.decode(code, content, lastpr)?;
            if is_v2 {
                tables.entfil(lastpr, tables.finchar);
            }
        }
        lastpr = code;
    }
    Ok(tables)
}

pub fn uncrunch(content: &mut Content) -> DecodeStatus {
    if !parse_header(content, false) {
        return DecodeStatus::BadHeader;
    }

    let _ref_level = match content.in_u8() {
        Some(v) => v,
        None => return DecodeStatus::BadHeader,
    };
    let sig_level = match content.in_u8() {
        Some(v) => v,
        None => return DecodeStatus::BadHeader,
    };
    let err_mode = match content.in_u8() {
        Some(v) => v,
        None => return DecodeStatus::BadHeader,
    };
    if content.in_u8().is_none() {
        return DecodeStatus::BadHeader;
    }

    if !(0x10..=0x2f).contains(&sig_level) {
        return DecodeStatus::BadHeader;
    }
    let is_v2 = sig_level >= 0x20;
    content.kind = if is_v2 { Kind::CrunchV2 } else { Kind::CrunchV1 };

    if uncrunch_data(content, is_v2).is_err() {
        return DecodeStatus::Corrupt;
    }

    let file_crc = match content.in_u16() {
        Some(v) => v,
        None => return DecodeStatus::Corrupt,
    };
    let matches = if err_mode == 1 {
        crc16(&content.output.buf) == file_crc
    } else if err_mode == 0 {
        sum_crc(&content.output.buf) == file_crc
    } else {
        true
    };
    if matches {
        DecodeStatus::Good
    } else {
        DecodeStatus::BadCrc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Kind;

    /// Builds a minimal Crunch V2 stream: magic, name, four info bytes
    /// (`refLevel`, `sigLevel=0x20`, `errMode=2` so any trailer is accepted),
    /// then the atomic code for `'X'` (9 bits) followed by `EOFCOD` (9 bits),
    /// then two spare trailer bytes.
    fn crunch_v2_stream(body_bits: &[(u16, u8)]) -> Vec<u8> {
        let mut buf = vec![0x76, 0xFE];
        buf.extend_from_slice(b"a.txt\0");
        buf.push(0x00); // refLevel
        buf.push(0x20); // sigLevel -> V2
        buf.push(2); // errMode: accept unconditionally
        buf.push(0); // spare

        let mut bitbuf: u32 = 0;
        let mut nbits: u32 = 0;
        let mut bytes = Vec::new();
        for &(code, width) in body_bits {
            bitbuf = (bitbuf << width) | code as u32;
            nbits += width as u32;
            while nbits >= 8 {
                nbits -= 8;
                bytes.push(((bitbuf >> nbits) & 0xff) as u8);
            }
        }
        if nbits > 0 {
            bytes.push(((bitbuf << (8 - nbits)) & 0xff) as u8);
        }
        buf.extend_from_slice(&bytes);
        buf.extend_from_slice(&[0, 0]); // trailer CRC, unchecked (errMode=2)
        buf
    }

    #[test]
    fn v2_single_atomic_then_eof_decodes_one_byte() {
        // atomic code for 'X' (0x58) then EOFCOD (0x100), both 9 bits wide.
        let bytes = crunch_v2_stream(&[(b'X' as u16, 9), (EOFCOD, 9)]);
        let mut c = Content::new(Kind::Crunched, &bytes, "x.crl".into(), None);
        assert_eq!(uncrunch(&mut c), DecodeStatus::Good);
        assert_eq!(c.output.buf, b"X");
    }

    #[test]
    fn unsupported_siglevel_is_bad_header() {
        let mut buf = vec![0x76, 0xFE];
        buf.extend_from_slice(b"a.txt\0");
        buf.extend_from_slice(&[0, 0x05, 0, 0]); // sigLevel=5, outside [0x10,0x2f]
        let mut c = Content::new(Kind::Crunched, &buf, "a.crl".into(), None);
        assert_eq!(uncrunch(&mut c), DecodeStatus::BadHeader);
    }

    #[test]
    fn v2_reserved_err_mode_always_good() {
        let bytes = crunch_v2_stream(&[(b'Y' as u16, 9), (EOFCOD, 9)]);
        let mut c = Content::new(Kind::Crunched, &bytes, "y.crl".into(), None);
        assert_eq!(uncrunch(&mut c), DecodeStatus::Good);
    }

    #[test]
    fn v2_repeated_symbol_builds_and_reuses_table_entry() {
        // 'A' 'A' 'A': first two codes are atomic 'A' (9 bits each), LZW
        // will have inserted ('A'->'A') as code 0x104 after the first
        // decode, but since getcode always reads 9-bit atomic codes here
        // (we never reference the new code), this just exercises repeated
        // atomic decoding + table insertion bookkeeping without corrupting.
        let bytes = crunch_v2_stream(&[(b'A' as u16, 9), (b'A' as u16, 9), (b'A' as u16, 9), (EOFCOD, 9)]);
        let mut c = Content::new(Kind::Crunched, &bytes, "a.crl".into(), None);
        assert_eq!(uncrunch(&mut c), DecodeStatus::Good);
        assert_eq!(c.output.buf, b"AAA");
    }

    #[test]
    fn v2_back_reference_resolves_to_the_entry_built_from_the_second_code() {
        // 'A' (atomic), 'A' (atomic) -> inserts table[0x104] = (pred 'A', 'A'),
        // then the back-reference code 0x104 itself, then EOFCOD. If the
        // first atomic code's `enterx` isn't suppressed, that insert lands
        // one slot early and 0x104 resolves to the wrong string.
        let bytes = crunch_v2_stream(&[(b'A' as u16, 9), (b'A' as u16, 9), (0x104, 9), (EOFCOD, 9)]);
        let mut c = Content::new(Kind::Crunched, &bytes, "aa.crl".into(), None);
        assert_eq!(uncrunch(&mut c), DecodeStatus::Good);
        assert_eq!(c.output.buf, b"AAAA");
    }
}
