//! Squeeze decoder: a static Huffman tree stored as a flat array, read with
//! the reversed-bit convention, followed by the shared RLE post-filter.
//! Ported from `huff.c`.

use crate::content::Content;
use crate::crc::sum_crc;
use crate::error::DecodeStatus;
use crate::header::parse_header;

/// `MAXNODE` in `huff.c`: also the EOF leaf symbol value.
const MAX_NODE: i32 = 256;

enum Symbol {
    Byte(u8),
    End,
    IoEof,
}

/// Walks the tree from the root for one symbol, mirroring `usqU8`: the loop
/// reads another bit only while still at a non-leaf (`i >= 0`) node, so an
/// EOF leaf reached without any further bit read is not mistaken for an I/O
/// error.
fn decode_symbol(content: &mut Content, nodes: &[[i32; 2]]) -> Symbol {
    let mut i: i32 = 0;
    loop {
        if i < 0 {
            break;
        }
        let cbit = match content.in_bit_rev() {
            Some(b) => b as usize,
            None => return Symbol::IoEof,
        };
        i = nodes[i as usize][cbit];
    }
    let sym = -(i + 1);
    if sym == MAX_NODE {
        Symbol::End
    } else {
        Symbol::Byte(sym as u8)
    }
}

pub fn unsqueeze(content: &mut Content) -> DecodeStatus {
    if !parse_header(content, true) {
        return DecodeStatus::BadHeader;
    }

    let node_count = match content.in_u16() {
        Some(n) => n as i32,
        None => return DecodeStatus::BadHeader,
    };
    if node_count < 0 || node_count > MAX_NODE {
        return DecodeStatus::BadHeader;
    }

    // node[0] doubles as the sentinel EOF leaf (-257) so an empty tree
    // still terminates cleanly.
    let mut nodes = vec![[0i32; 2]; MAX_NODE as usize + 1];
    nodes[0] = [-(MAX_NODE + 1), -(MAX_NODE + 1)];
    for i in 0..node_count as usize {
        let c0 = match content.in_i16() {
            Some(v) => v as i32,
            None => return DecodeStatus::BadHeader,
        };
        let c1 = match content.in_i16() {
            Some(v) => v as i32,
            None => return DecodeStatus::BadHeader,
        };
        nodes[i] = [c0, c1];
    }
    if content.is_eof() {
        return DecodeStatus::Corrupt;
    }

    content.out_rle(-1);
    loop {
        match decode_symbol(content, &nodes) {
            Symbol::Byte(b) => content.out_rle(b as i32),
            Symbol::End => break,
            Symbol::IoEof => return DecodeStatus::Corrupt,
        }
    }

    if !content.in_seek(2) {
        return DecodeStatus::Corrupt;
    }
    let stored_crc = match content.in_u16() {
        Some(v) => v,
        None => return DecodeStatus::Corrupt,
    };
    if sum_crc(&content.output.buf) == stored_crc {
        DecodeStatus::Good
    } else {
        DecodeStatus::BadCrc
    }
}
