//! Cr-Lzh decoder: adaptive Huffman (Vitter-style, single-swap update) over
//! an LZSS 2048-byte sliding dictionary, ported from `lzhuf.c`.
//!
//! The adaptive-Huffman tree and the sliding window are owned locally
//! (`AdaptiveHuffman`, the `window` array) rather than as file statics, per
//! the same "process-global tables become owned context objects"
//! transformation `crunch.rs` applies.

use crate::content::{Content, Kind};
use crate::crc::{crc16, sum_crc};
use crate::error::DecodeStatus;
use crate::header::parse_header;

const LZ_N: usize = 2048;
const LZ_F: usize = 60;
const THRESHOLD: usize = 2;
const EOF_CODE: u32 = 256;

const N_CHAR: usize = 256 + 1 - THRESHOLD + LZ_F; // 315
const LZ_T: usize = N_CHAR * 2 - 1; // 629
const LZ_R: usize = LZ_T - 1; // 628
const MAX_FREQ: u32 = 0x8000;

#[rustfmt::skip]
const D_CODE: [u8; 256] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01, 0x01,
    0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02, 0x02,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x09, 0x09, 0x09, 0x09, 0x09, 0x09, 0x09, 0x09,
    0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B, 0x0B,
    0x0C, 0x0C, 0x0C, 0x0C, 0x0D, 0x0D, 0x0D, 0x0D, 0x0E, 0x0E, 0x0E, 0x0E, 0x0F, 0x0F, 0x0F, 0x0F,
    0x10, 0x10, 0x10, 0x10, 0x11, 0x11, 0x11, 0x11, 0x12, 0x12, 0x12, 0x12, 0x13, 0x13, 0x13, 0x13,
    0x14, 0x14, 0x14, 0x14, 0x15, 0x15, 0x15, 0x15, 0x16, 0x16, 0x16, 0x16, 0x17, 0x17, 0x17, 0x17,
    0x18, 0x18, 0x19, 0x19, 0x1A, 0x1A, 0x1B, 0x1B, 0x1C, 0x1C, 0x1D, 0x1D, 0x1E, 0x1E, 0x1F, 0x1F,
    0x20, 0x20, 0x21, 0x21, 0x22, 0x22, 0x23, 0x23, 0x24, 0x24, 0x25, 0x25, 0x26, 0x26, 0x27, 0x27,
    0x28, 0x28, 0x29, 0x29, 0x2A, 0x2A, 0x2B, 0x2B, 0x2C, 0x2C, 0x2D, 0x2D, 0x2E, 0x2E, 0x2F, 0x2F,
    0x30, 0x31, 0x32, 0x33, 0x34, 0x35, 0x36, 0x37, 0x38, 0x39, 0x3A, 0x3B, 0x3C, 0x3D, 0x3E, 0x3F,
];

#[rustfmt::skip]
const D_LEN: [u8; 256] = [
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03, 0x03,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04, 0x04,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05, 0x05,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06, 0x06,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07, 0x07,
    0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08, 0x08,
];

/// The adaptive Huffman frequency tree (`freq`/`prnt`/`son` in `lzhuf.c`),
/// owned per decode instead of as file statics.
struct AdaptiveHuffman {
    freq: [u32; LZ_T + 1],
    prnt: [i32; LZ_T + N_CHAR],
    son: [i32; LZ_T + 1],
}

impl AdaptiveHuffman {
    fn new() -> Self {
        let mut h = AdaptiveHuffman {
            freq: [0; LZ_T + 1],
            prnt: [0; LZ_T + N_CHAR],
            son: [0; LZ_T + 1],
        };
        h.start_huff();
        h
    }

    fn start_huff(&mut self) {
        for i in 0..N_CHAR {
            self.freq[i] = 1;
            self.son[i] = (i + LZ_T) as i32;
            self.prnt[i + LZ_T] = i as i32;
        }
        let mut i = 0usize;
        let mut j = N_CHAR;
        while j <= LZ_R {
            self.freq[j] = self.freq[i] + self.freq[i + 1];
            self.son[j] = i as i32;
            self.prnt[i] = j as i32;
            self.prnt[i + 1] = j as i32;
            i += 2;
            j += 1;
        }
        self.freq[LZ_T] = 0xffff;
        self.prnt[LZ_R] = 0;
    }

    fn reconst(&mut self) {
        let mut j = 0usize;
        for i in 0..LZ_T {
            if self.son[i] as usize >= LZ_T {
                self.freq[j] = (self.freq[i] + 1) / 2;
                self.son[j] = self.son[i];
                j += 1;
            }
        }
        let mut i = 0usize;
        let mut j = N_CHAR;
        while j < LZ_T {
            let f = self.freq[i] + self.freq[i + 1];
            let mut k = j;
            while f < self.freq[k - 1] {
                self.freq[k] = self.freq[k - 1];
                self.son[k] = self.son[k - 1];
                k -= 1;
            }
            self.freq[k] = f;
            self.son[k] = i as i32;
            i += 2;
            j += 1;
        }
        for i in 0..LZ_T {
            let k = self.son[i] as usize;
            if k >= LZ_T {
                self.prnt[k] = i as i32;
            } else {
                self.prnt[k] = i as i32;
                self.prnt[k + 1] = i as i32;
            }
        }
    }

    fn update(&mut self, c: u32) {
        if self.freq[LZ_R] == MAX_FREQ {
            self.reconst();
        }
        let mut c = self.prnt[c as usize + LZ_T] as usize;
        loop {
            self.freq[c] += 1;
            let k = self.freq[c];
            let mut l = c + 1;
            if k > self.freq[l] {
                while k > self.freq[l + 1] {
                    l += 1;
                }
                l -= 1;
                self.freq[c] = self.freq[l];
                self.freq[l] = k;

                let i = self.son[c];
                self.prnt[i as usize] = l as i32;
                if (i as usize) < LZ_T {
                    self.prnt[i as usize + 1] = l as i32;
                }

                let j = self.son[l];
                self.son[l] = i;

                self.prnt[j as usize] = c as i32;
                if (j as usize) < LZ_T {
                    self.prnt[j as usize + 1] = c as i32;
                }
                self.son[c] = j;

                c = l;
            }
            c = self.prnt[c] as usize;
            if c == 0 {
                break;
            }
        }
    }

    fn decode_char(&mut self, content: &mut Content) -> u32 {
        let mut c = self.son[LZ_R];
        while (c as usize) < LZ_T {
            let bit = content.in_bits(1).unwrap_or(0);
            c = self.son[c as usize + if bit > 0 { 1 } else { 0 }];
        }
        let c = c as u32 - LZ_T as u32;
        self.update(c);
        c
    }
}

fn decode_position(content: &mut Content, oldver: u8) -> u32 {
    let i = content.in_bits(8).unwrap_or(0) as u32;
    let c = (D_CODE[i as usize] as u32) << (5 + oldver as u32);
    let len = D_LEN[i as usize] as i32 - (3 - oldver as i32);
    let mut i = i;
    for _ in 0..len {
        let bit = content.in_bits(1).unwrap_or(0);
        i = (i << 1) + if bit > 0 { 1 } else { 0 };
    }
    let mask: u32 = if oldver != 0 { 0x3f } else { 0x1f };
    c | (i & mask)
}

pub fn uncr_lzh(content: &mut Content) -> DecodeStatus {
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
    let oldver: u8 = if sig_level < 0x20 { 1 } else { 0 };
    content.kind = if oldver != 0 { Kind::CrLzhV1 } else { Kind::CrLzhV2 };

    let mut huff = AdaptiveHuffman::new();
    let mut window = [b' '; LZ_N + LZ_F - 1];
    let mut r = LZ_N - LZ_F;

    loop {
        let c = huff.decode_char(content);
        if c == EOF_CODE || content.is_eof() {
            break;
        }
        if c < EOF_CODE {
            let b = c as u8;
            content.out_u8(b);
            window[r] = b;
            r = (r + 1) % LZ_N;
        } else {
            let pos = decode_position(content, oldver);
            let mut i = (r + LZ_N - pos as usize - 1) % LZ_N;
            let j = c as usize - EOF_CODE as usize + THRESHOLD;
            for _ in 0..j {
                let b = window[i];
                content.out_u8(b);
                window[r] = b;
                r = (r + 1) % LZ_N;
                i = (i + 1) % LZ_N;
            }
        }
    }

    let file_crc = match content.in_u16() {
        Some(v) => v,
        None => return DecodeStatus::Good, // mid-stream EOF: trailer unreadable
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
