//! Where a processed `Content` tree ends up: a real directory tree, a single
//! ZIP archive, or (always, alongside either) the `.info` mapping sidecar.
//!
//! Corresponds to `memio.c`'s `saveContent`, `support.c`'s `mkOsNames`
//! family, and `zipfile.c`/`zip.h` in the original source. The ZIP side
//! isn't ported from that file, though: the original's `zip.h` wraps
//! Info-Zip's C library, which has no Rust equivalent in this pack, so
//! `zipfile.rs` here is written directly against the `zip` crate's own API
//! (see `DESIGN.md`).

pub mod mapping;
pub mod tree;
pub mod zipfile;
